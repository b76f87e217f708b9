//! Engine error taxonomy
//!
//! Only conditions the caller must act on are errors. Missing water-quality,
//! diagnostic or feed data is never raised; the affected factor is reported as
//! unavailable in the advice breakdown instead.

use chrono::NaiveDate;
use thiserror::Error;

use crate::store::StoreError;
use crate::types::{PondId, RecordId, Scope};

#[derive(Debug, Error)]
pub enum EngineError {
    /// No stocking record exists for the requested pond/scope.
    #[error("insufficient data: pond {pond} ({scope}) has no stocking record")]
    InsufficientData { pond: PondId, scope: Scope },

    /// Projection target is not above the current biomass.
    #[error("invalid target: {target_kg:.2} kg is not above current biomass {current_kg:.2} kg")]
    InvalidTarget { target_kg: f64, current_kg: f64 },

    #[error("sampling {0} not found")]
    SamplingNotFound(RecordId),

    /// A growth cascade could not be applied. Nothing was written.
    #[error("growth recompute for pond {pond} from {from_date} failed: {}", .failures.join("; "))]
    CascadeFailed {
        pond: PondId,
        from_date: NaiveDate,
        failures: Vec<String>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cascade_failure_joins_messages() {
        let err = EngineError::CascadeFailed {
            pond: 2,
            from_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            failures: vec!["sampling 4: lock poisoned".into(), "commit rejected".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("pond 2"));
        assert!(msg.contains("2024-03-01"));
        assert!(msg.contains("lock poisoned; commit rejected"));
    }

    #[test]
    fn test_invalid_target_message() {
        let err = EngineError::InvalidTarget {
            target_kg: 80.0,
            current_kg: 80.0,
        };
        assert!(err.to_string().contains("80.00 kg is not above"));
    }
}
