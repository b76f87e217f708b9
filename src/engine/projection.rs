//! Target-biomass projection
//!
//! How long, and how much feed, until a pond reaches a target biomass at its
//! current growth rate. Targets at or below the current biomass are rejected
//! rather than answered with zero days.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::ProjectionConfig;
use crate::error::{EngineError, EngineResult};
use crate::types::{days_after, PondId, Scope};

/// Current state the projection starts from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionInputs {
    pub pond: PondId,
    pub scope: Scope,
    pub as_of: NaiveDate,
    pub live_count: u64,
    pub average_weight_kg: f64,
    /// Per-fish growth from the latest sampling that has one
    pub growth_rate_kg_per_day: Option<f64>,
    pub fcr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionResult {
    pub pond: PondId,
    pub scope: Scope,
    pub as_of: NaiveDate,
    pub target_kg: f64,
    pub current_biomass_kg: f64,
    pub gap_kg: f64,
    pub live_count: u64,
    pub growth_rate_kg_per_day: Option<f64>,
    /// Pond-level gain per day, `growth_rate * live_count`
    pub daily_gain_kg: Option<f64>,
    pub estimated_days: f64,
    /// No positive growth to divide by; days set to the configured cap
    pub capped: bool,
    /// Finite estimate longer than the configured horizon
    pub beyond_horizon: bool,
    pub estimated_date: NaiveDate,
    pub fcr: f64,
    pub estimated_feed_kg: f64,
}

pub fn project_target_biomass(
    inputs: &ProjectionInputs,
    target_kg: f64,
    cfg: &ProjectionConfig,
) -> EngineResult<ProjectionResult> {
    let current_kg = inputs.live_count as f64 * inputs.average_weight_kg;
    if !target_kg.is_finite() || target_kg <= current_kg {
        return Err(EngineError::InvalidTarget {
            target_kg,
            current_kg,
        });
    }

    let gap_kg = target_kg - current_kg;
    let daily_gain_kg = inputs
        .growth_rate_kg_per_day
        .map(|rate| rate * inputs.live_count as f64);
    let max_days = f64::from(cfg.max_days);

    let (estimated_days, capped) = match daily_gain_kg {
        Some(gain) if gain > 0.0 && gain.is_finite() => (gap_kg / gain, false),
        _ => (max_days, true),
    };
    let beyond_horizon = !capped && estimated_days > max_days;
    if capped {
        warn!(
            pond = inputs.pond,
            scope = %inputs.scope,
            daily_gain_kg,
            cap = cfg.max_days,
            "No positive growth, projection capped"
        );
    } else if beyond_horizon {
        warn!(
            pond = inputs.pond,
            scope = %inputs.scope,
            estimated_days,
            horizon = cfg.max_days,
            "Projection beyond planning horizon"
        );
    }

    let estimated_feed_kg = gap_kg * inputs.fcr;
    // `as` saturates, and the date saturates at the calendar's end
    let estimated_date = days_after(inputs.as_of, estimated_days.ceil() as i64);

    info!(
        pond = inputs.pond,
        scope = %inputs.scope,
        target_kg,
        gap_kg,
        estimated_days,
        estimated_feed_kg,
        "Target biomass projected"
    );

    Ok(ProjectionResult {
        pond: inputs.pond,
        scope: inputs.scope,
        as_of: inputs.as_of,
        target_kg,
        current_biomass_kg: current_kg,
        gap_kg,
        live_count: inputs.live_count,
        growth_rate_kg_per_day: inputs.growth_rate_kg_per_day,
        daily_gain_kg,
        estimated_days,
        capped,
        beyond_horizon,
        estimated_date,
        fcr: inputs.fcr,
        estimated_feed_kg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    fn inputs(rate: Option<f64>) -> ProjectionInputs {
        ProjectionInputs {
            pond: 1,
            scope: Scope::Species(1),
            as_of: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            live_count: 1000,
            average_weight_kg: 0.08,
            growth_rate_kg_per_day: rate,
            fcr: 1.5,
        }
    }

    #[test]
    fn test_target_equal_to_current_rejected() {
        let err = project_target_biomass(&inputs(Some(0.002)), 80.0, &ProjectionConfig::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidTarget { .. }));
    }

    #[test]
    fn test_target_below_current_and_nan_rejected() {
        let cfg = ProjectionConfig::default();
        assert!(project_target_biomass(&inputs(Some(0.002)), 50.0, &cfg).is_err());
        assert!(project_target_biomass(&inputs(Some(0.002)), f64::NAN, &cfg).is_err());
    }

    #[test]
    fn test_days_and_feed() {
        let result =
            project_target_biomass(&inputs(Some(0.002)), 100.0, &ProjectionConfig::default())
                .unwrap();
        assert!((result.gap_kg - 20.0).abs() < 1e-9);
        // 2 kg/day pond gain
        assert!((result.estimated_days - 10.0).abs() < 1e-9);
        assert!(!result.capped);
        assert!((result.estimated_feed_kg - 30.0).abs() < 1e-9);
        assert_eq!(result.estimated_date, NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
    }

    #[test]
    fn test_no_growth_caps_days() {
        let cfg = ProjectionConfig::default();
        for rate in [None, Some(0.0), Some(-0.001)] {
            let result = project_target_biomass(&inputs(rate), 100.0, &cfg).unwrap();
            assert!(result.capped);
            assert!(!result.beyond_horizon);
            assert_eq!(result.estimated_days, 365.0);
        }
    }

    #[test]
    fn test_slow_growth_keeps_real_figure() {
        let result =
            project_target_biomass(&inputs(Some(0.000_001)), 100.0, &ProjectionConfig::default())
                .unwrap();
        // 20 kg at 1 g/day across the pond
        assert!(!result.capped);
        assert!(result.beyond_horizon);
        assert!((result.estimated_days - 20_000.0).abs() < 1e-6);
        assert_eq!(result.estimated_date.year(), 2078);
    }

    #[test]
    fn test_vanishing_growth_saturates_date() {
        let result =
            project_target_biomass(&inputs(Some(1e-300)), 100.0, &ProjectionConfig::default())
                .unwrap();
        assert!(!result.capped);
        assert!(result.beyond_horizon);
        assert_eq!(result.estimated_date, NaiveDate::MAX);
    }
}
