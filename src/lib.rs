//! pondfeed: Fish-farm Growth & Feeding Recommendation Engine
//!
//! Turns a pond's event history (stockings, mortality, harvests, samplings,
//! feed logs, water quality, medical diagnostics) into daily feeding advice.
//!
//! ## Architecture
//!
//! - **Event store**: read contract over pond history plus an atomic sampling
//!   ledger (`store`)
//! - **Engine**: population, growth cascades, stage table, risk factors, FCR,
//!   advice composition and target-biomass projection (`engine`)
//! - **Advice storage**: persisted recommendations in Sled DB (`storage`)
//! - **Configuration**: every empirical threshold in `pondfeed.toml` (`config`)

pub mod config;
pub mod engine;
pub mod error;
pub mod storage;
pub mod store;
pub mod types;

// Re-export configuration
pub use config::EngineConfig;

// Re-export the engine facade and its outputs
pub use engine::{
    AdviceBatch, BiomassReport, FcrEstimate, FcrReport, FeedingEngine, PopulationEstimate,
    ProjectionResult,
};

// Re-export errors
pub use error::{EngineError, EngineResult};

// Re-export storage
pub use storage::{AdviceStats, AdviceStorage, AdviceStorageError};
pub use store::{EventSnapshot, EventStore, InMemoryEventStore, SamplingLedger, StoreError};

// Re-export commonly used types
pub use types::{
    DataSource, DateRange, FeedingAdvice, PondId, RecordId, SamplingRecord, Scope, SpeciesId,
};
