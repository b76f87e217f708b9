//! Event store access layer
//!
//! The engine never owns pond history; it reads it through the `EventStore`
//! trait so different backends can be swapped without touching engine code:
//! - `InMemoryEventStore`: RwLock-backed store for tests, the CLI and demo data
//! - `OverlayStore`: a read view with pending sampling edits layered on top,
//!   used to compute a growth cascade before anything is committed
//!
//! Every query returns records ordered by date ascending (ties by id).
//!
//! The only write path the engine needs is `SamplingLedger::commit_samplings`,
//! which must apply a whole cascade batch or nothing.

mod memory;
mod overlay;
mod snapshot;

pub use memory::InMemoryEventStore;
pub use overlay::OverlayStore;
pub use snapshot::EventSnapshot;

use std::path::PathBuf;

use crate::types::{
    DateRange, FeedLogRecord, HarvestRecord, MedicalDiagnostic, MortalityRecord, PondId,
    RecordId, SamplingRecord, Scope, StockingRecord, WaterQualitySample,
};

/// Read contract over the historical record kinds.
///
/// Implementations must be thread-safe (Send + Sync) so batch advice
/// generation can fan out across ponds.
pub trait EventStore: Send + Sync {
    fn stockings(&self, pond: PondId, scope: Scope) -> Result<Vec<StockingRecord>, StoreError>;

    fn mortalities(
        &self,
        pond: PondId,
        scope: Scope,
        range: DateRange,
    ) -> Result<Vec<MortalityRecord>, StoreError>;

    fn harvests(
        &self,
        pond: PondId,
        scope: Scope,
        range: DateRange,
    ) -> Result<Vec<HarvestRecord>, StoreError>;

    fn samplings(
        &self,
        pond: PondId,
        scope: Scope,
        range: DateRange,
    ) -> Result<Vec<SamplingRecord>, StoreError>;

    fn sampling(&self, id: RecordId) -> Result<Option<SamplingRecord>, StoreError>;

    fn feed_logs(&self, pond: PondId, range: DateRange) -> Result<Vec<FeedLogRecord>, StoreError>;

    fn water_quality(
        &self,
        pond: PondId,
        range: DateRange,
    ) -> Result<Vec<WaterQualitySample>, StoreError>;

    /// Diagnostics whose creation date falls inside `range`.
    fn medical_diagnostics(
        &self,
        pond: PondId,
        range: DateRange,
    ) -> Result<Vec<MedicalDiagnostic>, StoreError>;

    /// Every pond with at least one stocking record, ascending.
    fn ponds(&self) -> Result<Vec<PondId>, StoreError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// A set of sampling changes that must land together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SamplingBatch {
    pub upserts: Vec<SamplingRecord>,
    pub deletions: Vec<RecordId>,
}

impl SamplingBatch {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletions.is_empty()
    }
}

/// Transactional write path for sampling records.
pub trait SamplingLedger: EventStore {
    /// Apply every upsert and deletion in `batch`, or none of them.
    fn commit_samplings(&self, batch: SamplingBatch) -> Result<(), StoreError>;
}

/// Event store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("snapshot I/O error ({0}): {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("rejected batch: {0}")]
    Rejected(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
