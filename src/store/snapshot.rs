//! JSON snapshot of every event record, used by the CLI and the demo generator.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::types::{
    FeedLogRecord, HarvestRecord, MedicalDiagnostic, MortalityRecord, SamplingRecord,
    StockingRecord, WaterQualitySample,
};

/// Serializable dump of an event store. Every list may be omitted in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    #[serde(default)]
    pub stockings: Vec<StockingRecord>,
    #[serde(default)]
    pub mortalities: Vec<MortalityRecord>,
    #[serde(default)]
    pub harvests: Vec<HarvestRecord>,
    #[serde(default)]
    pub samplings: Vec<SamplingRecord>,
    #[serde(default)]
    pub feed_logs: Vec<FeedLogRecord>,
    #[serde(default)]
    pub water_quality: Vec<WaterQualitySample>,
    #[serde(default)]
    pub diagnostics: Vec<MedicalDiagnostic>,
}

impl EventSnapshot {
    /// Highest record id across all id-carrying record kinds (0 when empty).
    pub fn max_record_id(&self) -> u64 {
        let ids = self
            .stockings
            .iter()
            .map(|r| r.id)
            .chain(self.mortalities.iter().map(|r| r.id))
            .chain(self.harvests.iter().map(|r| r.id))
            .chain(self.samplings.iter().map(|r| r.id))
            .chain(self.feed_logs.iter().map(|r| r.id))
            .chain(self.diagnostics.iter().map(|r| r.id));
        ids.max().unwrap_or(0)
    }

    pub fn record_count(&self) -> usize {
        self.stockings.len()
            + self.mortalities.len()
            + self.harvests.len()
            + self.samplings.len()
            + self.feed_logs.len()
            + self.water_quality.len()
            + self.diagnostics.len()
    }

    pub fn load_from_file(path: &Path) -> Result<Self, StoreError> {
        let content =
            fs::read_to_string(path).map_err(|e| StoreError::Io(path.to_path_buf(), e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write as pretty JSON, creating parent directories as needed.
    pub fn save_to_file(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| StoreError::Io(parent.to_path_buf(), e))?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| StoreError::Io(path.to_path_buf(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    #[test]
    fn test_missing_sections_default_to_empty() {
        let snap: EventSnapshot = serde_json::from_str(
            r#"{"stockings":[{"id":4,"pond":1,"species":2,"date":"2024-01-01","pcs":100,"total_weight_kg":1.0}]}"#,
        )
        .unwrap();
        assert_eq!(snap.stockings.len(), 1);
        assert!(snap.samplings.is_empty());
        assert_eq!(snap.max_record_id(), 4);
        assert_eq!(snap.record_count(), 1);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("events.json");
        let mut snap = EventSnapshot::default();
        snap.samplings.push(SamplingRecord::new(
            9,
            1,
            None,
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            20,
            0.4,
        ));
        snap.save_to_file(&path).unwrap();

        let loaded = EventSnapshot::load_from_file(&path).unwrap();
        assert_eq!(loaded, snap);
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = EventSnapshot::load_from_file(&path).unwrap_err();
        assert!(matches!(err, StoreError::Io(ref p, _) if p == &path));
    }
}
