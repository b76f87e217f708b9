//! In-memory event store
//!
//! Thread-safe via `RwLock`. Not durable on its own; the CLI round-trips it
//! through a JSON `EventSnapshot`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{EventSnapshot, EventStore, SamplingBatch, SamplingLedger, StoreError};
use crate::types::{
    DateRange, FeedLogRecord, HarvestRecord, MedicalDiagnostic, MortalityRecord, PondId,
    RecordId, SamplingRecord, Scope, StockingRecord, WaterQualitySample,
};

#[derive(Debug, Default)]
struct Records {
    stockings: Vec<StockingRecord>,
    mortalities: Vec<MortalityRecord>,
    harvests: Vec<HarvestRecord>,
    samplings: Vec<SamplingRecord>,
    feed_logs: Vec<FeedLogRecord>,
    water_quality: Vec<WaterQualitySample>,
    diagnostics: Vec<MedicalDiagnostic>,
}

/// In-memory implementation of `EventStore` + `SamplingLedger`.
#[derive(Debug)]
pub struct InMemoryEventStore {
    records: RwLock<Records>,
    next_id: AtomicU64,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Records::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Build a store from a snapshot. Ids issued afterwards start above the
    /// highest id found in the snapshot.
    pub fn from_snapshot(snapshot: EventSnapshot) -> Self {
        let max_id = snapshot.max_record_id();
        let EventSnapshot {
            stockings,
            mortalities,
            harvests,
            samplings,
            feed_logs,
            water_quality,
            diagnostics,
        } = snapshot;
        Self {
            records: RwLock::new(Records {
                stockings,
                mortalities,
                harvests,
                samplings,
                feed_logs,
                water_quality,
                diagnostics,
            }),
            next_id: AtomicU64::new(max_id + 1),
        }
    }

    /// Copy every record out into a serializable snapshot.
    pub fn snapshot(&self) -> Result<EventSnapshot, StoreError> {
        let r = self.read()?;
        Ok(EventSnapshot {
            stockings: r.stockings.clone(),
            mortalities: r.mortalities.clone(),
            harvests: r.harvests.clone(),
            samplings: r.samplings.clone(),
            feed_logs: r.feed_logs.clone(),
            water_quality: r.water_quality.clone(),
            diagnostics: r.diagnostics.clone(),
        })
    }

    /// Reserve a fresh record id.
    pub fn next_id(&self) -> RecordId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn add_stocking(&self, record: StockingRecord) -> Result<(), StoreError> {
        self.write()?.stockings.push(record);
        Ok(())
    }

    pub fn add_mortality(&self, record: MortalityRecord) -> Result<(), StoreError> {
        self.write()?.mortalities.push(record);
        Ok(())
    }

    pub fn add_harvest(&self, record: HarvestRecord) -> Result<(), StoreError> {
        self.write()?.harvests.push(record);
        Ok(())
    }

    pub fn add_feed_log(&self, record: FeedLogRecord) -> Result<(), StoreError> {
        self.write()?.feed_logs.push(record);
        Ok(())
    }

    pub fn add_water_quality(&self, sample: WaterQualitySample) -> Result<(), StoreError> {
        self.write()?.water_quality.push(sample);
        Ok(())
    }

    pub fn add_diagnostic(&self, diagnostic: MedicalDiagnostic) -> Result<(), StoreError> {
        self.write()?.diagnostics.push(diagnostic);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Records>, StoreError> {
        self.records
            .read()
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Records>, StoreError> {
        self.records
            .write()
            .map_err(|e| StoreError::Storage(e.to_string()))
    }
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Filter, clone and sort by (date, id).
fn select<T, K, F>(items: &[T], keep: F, key: K) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> bool,
    K: Fn(&T) -> (chrono::NaiveDate, RecordId),
{
    let mut out: Vec<T> = items.iter().filter(|i| keep(i)).cloned().collect();
    out.sort_by_key(key);
    out
}

impl EventStore for InMemoryEventStore {
    fn stockings(&self, pond: PondId, scope: Scope) -> Result<Vec<StockingRecord>, StoreError> {
        let r = self.read()?;
        Ok(select(
            &r.stockings,
            |s| s.pond == pond && scope.includes(Some(s.species)),
            |s| (s.date, s.id),
        ))
    }

    fn mortalities(
        &self,
        pond: PondId,
        scope: Scope,
        range: DateRange,
    ) -> Result<Vec<MortalityRecord>, StoreError> {
        let r = self.read()?;
        Ok(select(
            &r.mortalities,
            |m| m.pond == pond && scope.includes(m.species) && range.contains(m.date),
            |m| (m.date, m.id),
        ))
    }

    fn harvests(
        &self,
        pond: PondId,
        scope: Scope,
        range: DateRange,
    ) -> Result<Vec<HarvestRecord>, StoreError> {
        let r = self.read()?;
        Ok(select(
            &r.harvests,
            |h| h.pond == pond && scope.includes(h.species) && range.contains(h.date),
            |h| (h.date, h.id),
        ))
    }

    fn samplings(
        &self,
        pond: PondId,
        scope: Scope,
        range: DateRange,
    ) -> Result<Vec<SamplingRecord>, StoreError> {
        let r = self.read()?;
        Ok(select(
            &r.samplings,
            |s| s.pond == pond && scope.includes(s.species) && range.contains(s.date),
            |s| (s.date, s.id),
        ))
    }

    fn sampling(&self, id: RecordId) -> Result<Option<SamplingRecord>, StoreError> {
        let r = self.read()?;
        Ok(r.samplings.iter().find(|s| s.id == id).cloned())
    }

    fn feed_logs(&self, pond: PondId, range: DateRange) -> Result<Vec<FeedLogRecord>, StoreError> {
        let r = self.read()?;
        Ok(select(
            &r.feed_logs,
            |f| f.pond == pond && range.contains(f.date),
            |f| (f.date, f.id),
        ))
    }

    fn water_quality(
        &self,
        pond: PondId,
        range: DateRange,
    ) -> Result<Vec<WaterQualitySample>, StoreError> {
        let r = self.read()?;
        let mut out: Vec<WaterQualitySample> = r
            .water_quality
            .iter()
            .filter(|w| w.pond == pond && range.contains(w.date))
            .cloned()
            .collect();
        out.sort_by_key(|w| w.date);
        Ok(out)
    }

    fn medical_diagnostics(
        &self,
        pond: PondId,
        range: DateRange,
    ) -> Result<Vec<MedicalDiagnostic>, StoreError> {
        let r = self.read()?;
        Ok(select(
            &r.diagnostics,
            |d| d.pond == pond && range.contains(d.created_on()),
            |d| (d.created_on(), d.id),
        ))
    }

    fn ponds(&self) -> Result<Vec<PondId>, StoreError> {
        let r = self.read()?;
        let mut ponds: Vec<PondId> = r.stockings.iter().map(|s| s.pond).collect();
        ponds.sort_unstable();
        ponds.dedup();
        Ok(ponds)
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}

impl SamplingLedger for InMemoryEventStore {
    fn commit_samplings(&self, batch: SamplingBatch) -> Result<(), StoreError> {
        let mut r = self.write()?;

        // Validate the whole batch before touching anything
        for id in &batch.deletions {
            if !r.samplings.iter().any(|s| s.id == *id) {
                return Err(StoreError::Rejected(format!("sampling {id} does not exist")));
            }
        }
        if let Some(dup) = batch
            .upserts
            .iter()
            .find(|u| batch.deletions.contains(&u.id))
        {
            return Err(StoreError::Rejected(format!(
                "sampling {} is both updated and deleted",
                dup.id
            )));
        }

        r.samplings.retain(|s| !batch.deletions.contains(&s.id));
        for record in batch.upserts {
            match r.samplings.iter_mut().find(|s| s.id == record.id) {
                Some(existing) => *existing = record,
                None => r.samplings.push(record),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
    }

    #[test]
    fn test_samplings_ordered_by_date() {
        let store = InMemoryEventStore::new();
        let batch = SamplingBatch {
            upserts: vec![
                SamplingRecord::new(1, 1, Some(1), day(20), 10, 0.5),
                SamplingRecord::new(2, 1, Some(1), day(5), 10, 0.2),
                SamplingRecord::new(3, 2, Some(1), day(1), 10, 0.2),
            ],
            deletions: vec![],
        };
        store.commit_samplings(batch).unwrap();

        let list = store.samplings(1, Scope::Mixed, DateRange::ALL).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, 2);
        assert_eq!(list[1].id, 1);
    }

    #[test]
    fn test_commit_rejects_unknown_deletion_atomically() {
        let store = InMemoryEventStore::new();
        let batch = SamplingBatch {
            upserts: vec![SamplingRecord::new(1, 1, None, day(1), 10, 0.5)],
            deletions: vec![99],
        };
        assert!(matches!(
            store.commit_samplings(batch),
            Err(StoreError::Rejected(_))
        ));
        // Nothing from the rejected batch landed
        assert!(store.sampling(1).unwrap().is_none());
    }

    #[test]
    fn test_commit_updates_in_place() {
        let store = InMemoryEventStore::new();
        store
            .commit_samplings(SamplingBatch {
                upserts: vec![SamplingRecord::new(1, 1, None, day(1), 10, 0.5)],
                deletions: vec![],
            })
            .unwrap();
        let mut edited = store.sampling(1).unwrap().unwrap();
        edited.total_weight_kg = 0.8;
        store
            .commit_samplings(SamplingBatch {
                upserts: vec![edited],
                deletions: vec![],
            })
            .unwrap();
        let all = store.samplings(1, Scope::Mixed, DateRange::ALL).unwrap();
        assert_eq!(all.len(), 1);
        assert!((all[0].total_weight_kg - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_ponds_from_stockings() {
        let store = InMemoryEventStore::new();
        for (id, pond) in [(1, 3), (2, 1), (3, 3)] {
            store
                .add_stocking(StockingRecord {
                    id,
                    pond,
                    species: 1,
                    date: day(1),
                    pcs: 100,
                    total_weight_kg: 1.0,
                    notes: String::new(),
                })
                .unwrap();
        }
        assert_eq!(store.ponds().unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_trait_object() {
        let store: Box<dyn EventStore> = Box::new(InMemoryEventStore::new());
        assert_eq!(store.backend_name(), "InMemory");
        assert!(store.ponds().unwrap().is_empty());
    }
}
