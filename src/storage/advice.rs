//! Feeding Advice Storage
//!
//! Persists `FeedingAdvice` to Sled DB so operators can review what was
//! recommended and mark it as applied. Keys are sled-generated ids as u64
//! big-endian bytes, so iteration order is insertion order.
//!
//! Advice is never deleted automatically.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::types::{FeedingAdvice, PondId, RecordId};

#[derive(Debug, thiserror::Error)]
pub enum AdviceStorageError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("advice {0} not found")]
    NotFound(RecordId),
}

/// Sled-backed store of generated advice.
#[derive(Clone)]
pub struct AdviceStorage {
    db: Arc<sled::Db>,
}

impl AdviceStorage {
    /// Open or create the advice database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AdviceStorageError> {
        let path = path.as_ref();
        let db = sled::open(path)?;
        info!(path = %path.display(), records = db.len(), "Advice storage opened");
        Ok(Self { db: Arc::new(db) })
    }

    /// Assign an id to `advice`, persist it, and return the stored copy.
    pub fn store(&self, mut advice: FeedingAdvice) -> Result<FeedingAdvice, AdviceStorageError> {
        let id = self.db.generate_id()?;
        advice.id = Some(id);
        self.db.insert(id.to_be_bytes(), serde_json::to_vec(&advice)?)?;
        self.db.flush()?;
        debug!(
            id,
            pond = advice.pond,
            scope = %advice.scope,
            feed_kg = advice.recommended_feed_kg,
            "Advice stored"
        );
        Ok(advice)
    }

    pub fn get(&self, id: RecordId) -> Result<Option<FeedingAdvice>, AdviceStorageError> {
        match self.db.get(id.to_be_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Set the applied flag and timestamp. Returns the updated advice.
    pub fn mark_applied(
        &self,
        id: RecordId,
        at: DateTime<Utc>,
    ) -> Result<FeedingAdvice, AdviceStorageError> {
        let mut advice = self.get(id)?.ok_or(AdviceStorageError::NotFound(id))?;
        if advice.applied {
            debug!(id, "Advice already applied");
            return Ok(advice);
        }
        advice.mark_applied(at);
        self.db.insert(id.to_be_bytes(), serde_json::to_vec(&advice)?)?;
        self.db.flush()?;
        info!(id, pond = advice.pond, "Advice marked applied");
        Ok(advice)
    }

    /// Newest first. Entries that fail to decode are skipped.
    pub fn list_recent(&self, limit: usize) -> Vec<FeedingAdvice> {
        self.iter_newest_first().take(limit).collect()
    }

    /// Newest first, restricted to one pond.
    pub fn list_for_pond(&self, pond: PondId, limit: usize) -> Vec<FeedingAdvice> {
        self.iter_newest_first()
            .filter(|a| a.pond == pond)
            .take(limit)
            .collect()
    }

    fn iter_newest_first(&self) -> impl Iterator<Item = FeedingAdvice> + '_ {
        self.db.iter().rev().filter_map(|item| {
            let (key, value) = match item {
                Ok(kv) => kv,
                Err(e) => {
                    warn!(error = %e, "Advice storage read failed");
                    return None;
                }
            };
            match serde_json::from_slice::<FeedingAdvice>(&value) {
                Ok(advice) => Some(advice),
                Err(e) => {
                    warn!(key = ?key.as_ref(), error = %e, "Skipping undecodable advice");
                    None
                }
            }
        })
    }

    pub fn count(&self) -> usize {
        self.db.len()
    }

    pub fn size_bytes(&self) -> u64 {
        self.db.size_on_disk().unwrap_or(0)
    }

    pub fn flush(&self) -> Result<(), AdviceStorageError> {
        self.db.flush()?;
        Ok(())
    }

    pub fn stats(&self) -> AdviceStats {
        let mut stats = AdviceStats {
            size_bytes: self.size_bytes(),
            ..AdviceStats::default()
        };
        for advice in self.iter_newest_first() {
            stats.advice_count += 1;
            if advice.applied {
                stats.applied_count += 1;
            }
            stats.oldest_date = Some(stats.oldest_date.map_or(advice.date, |d| d.min(advice.date)));
            stats.newest_date = Some(stats.newest_date.map_or(advice.date, |d| d.max(advice.date)));
        }
        stats
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdviceStats {
    pub advice_count: usize,
    pub applied_count: usize,
    pub size_bytes: u64,
    pub oldest_date: Option<NaiveDate>,
    pub newest_date: Option<NaiveDate>,
}

impl AdviceStats {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}
