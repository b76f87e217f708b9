//! System-wide default constants.
//!
//! Values here are fixed by units or by CLI convenience, not by farm
//! practice; anything a farm might tune lives in `EngineConfig`.

// ============================================================================
// Units
// ============================================================================

pub const GRAMS_PER_KG: f64 = 1000.0;

// ============================================================================
// CLI
// ============================================================================

/// Event snapshot read by the CLI when `--events` is not given.
pub const DEFAULT_EVENTS_PATH: &str = "./data/events.json";

/// Number of stored advice records listed by `pondfeed history`.
pub const HISTORY_LIMIT: usize = 20;

// ============================================================================
// Demo Data
// ============================================================================

/// Ponds generated by `demo-data` when `--ponds` is not given.
pub const DEMO_PONDS: u32 = 4;

/// Days of history generated per pond.
pub const DEMO_DAYS: u32 = 120;

/// Days between fish samplings in generated data.
pub const DEMO_SAMPLING_INTERVAL_DAYS: u32 = 14;
