//! FCR Estimator
//!
//! Feed conversion ratio = kg of feed per kg of biomass gained. Gains come
//! from the growth tracker's per-sampling `biomass_difference_kg`; feed comes
//! from the pond-wide feed log. A non-positive gain or an empty feed total
//! never reaches a division: that term is skipped and the estimate falls back
//! to the next method, ending at the configured default.
//!
//! Each interval pairs a sampling with the sampling its growth was measured
//! against, so in a mixed-species pond the feed window and the gain cover the
//! same days.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FcrConfig;
use crate::store::{EventStore, StoreError};
use crate::types::{DateRange, FeedLogRecord, PondId, SamplingRecord, Scope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FcrStatus {
    Excellent,
    Good,
    NeedsImprovement,
    Poor,
}

impl FcrStatus {
    pub fn classify(fcr: f64, cfg: &FcrConfig) -> Self {
        if fcr < cfg.excellent_below {
            Self::Excellent
        } else if fcr < cfg.good_below {
            Self::Good
        } else if fcr < cfg.needs_improvement_below {
            Self::NeedsImprovement
        } else {
            Self::Poor
        }
    }
}

impl fmt::Display for FcrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::NeedsImprovement => "Needs Improvement",
            Self::Poor => "Poor",
        };
        f.write_str(s)
    }
}

/// How the final ratio was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FcrMethod {
    /// Recent/overall blend of per-interval ratios
    Blended,
    /// Whole window: total feed over total gain
    Window,
    Default,
}

/// FCR between a sampling and the baseline sampling of its growth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcrInterval {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub feed_kg: f64,
    pub gain_kg: f64,
    pub fcr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcrEstimate {
    /// Clamped ratio used downstream
    pub fcr: f64,
    pub method: FcrMethod,
    pub status: FcrStatus,
    /// Feed logged between the first and last sampling
    pub feed_kg: f64,
    /// Summed biomass gain over the same window
    pub gain_kg: f64,
    /// Unclamped window ratio, when it could be computed
    pub window_fcr: Option<f64>,
    pub intervals: Vec<FcrInterval>,
}

/// Feed logged in the half-open window `(after, through]`.
fn feed_between(logs: &[FeedLogRecord], after: NaiveDate, through: NaiveDate) -> f64 {
    logs.iter()
        .filter(|l| l.date > after && l.date <= through && l.feed_kg.is_finite())
        .map(|l| l.feed_kg)
        .sum()
}

fn ratio(feed_kg: f64, gain_kg: f64) -> Option<f64> {
    (feed_kg > 0.0 && gain_kg > 0.0).then(|| feed_kg / gain_kg)
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// The sampling `valid[idx]` was measured against: the nearest strictly
/// earlier one of the same species, else the nearest strictly earlier one of
/// any species.
fn measured_against<'a>(valid: &[&'a SamplingRecord], idx: usize) -> Option<&'a SamplingRecord> {
    let sample = valid[idx];
    let earlier = || {
        valid[..idx]
            .iter()
            .rev()
            .copied()
            .filter(move |s| s.date < sample.date)
    };
    sample
        .species
        .and_then(|species| earlier().find(|s| s.species == Some(species)))
        .or_else(|| earlier().next())
}

/// Estimate FCR from date-ordered samplings and the pond's feed log.
pub fn compute_fcr(samplings: &[SamplingRecord], feed_logs: &[FeedLogRecord], cfg: &FcrConfig) -> FcrEstimate {
    let valid: Vec<&SamplingRecord> = samplings
        .iter()
        .filter(|s| s.average_weight_kg().is_some())
        .collect();

    let (feed_kg, gain_kg) = match (valid.first(), valid.last()) {
        (Some(first), Some(last)) if valid.len() >= 2 => {
            let gain = valid[1..]
                .iter()
                .filter_map(|s| s.biomass_difference_kg)
                .filter(|g| g.is_finite())
                .sum();
            (feed_between(feed_logs, first.date, last.date), gain)
        }
        _ => (0.0, 0.0),
    };
    let window_fcr = ratio(feed_kg, gain_kg);

    let intervals: Vec<FcrInterval> = (1..valid.len())
        .filter_map(|idx| {
            let b = valid[idx];
            let a = measured_against(&valid, idx)?;
            let gain = b.biomass_difference_kg?;
            let feed = feed_between(feed_logs, a.date, b.date);
            ratio(feed, gain).map(|fcr| FcrInterval {
                from: a.date,
                to: b.date,
                feed_kg: feed,
                gain_kg: gain,
                fcr,
            })
        })
        .collect();

    let (raw, method) = if intervals.len() >= 2 {
        let all: Vec<f64> = intervals.iter().map(|i| i.fcr).collect();
        let take = cfg.recent_intervals.clamp(1, all.len());
        let recent = mean(&all[all.len() - take..]);
        (
            cfg.recent_weight * recent + cfg.overall_weight * mean(&all),
            FcrMethod::Blended,
        )
    } else if let Some(w) = window_fcr {
        (w, FcrMethod::Window)
    } else {
        (cfg.default_fcr, FcrMethod::Default)
    };

    let fcr = raw.max(cfg.min_fcr).min(cfg.max_fcr);
    FcrEstimate {
        fcr,
        method,
        status: FcrStatus::classify(fcr, cfg),
        feed_kg,
        gain_kg,
        window_fcr,
        intervals,
    }
}

/// Estimate FCR for `pond`/`scope` from samplings on or before `as_of`.
pub fn estimate_fcr(
    store: &dyn EventStore,
    pond: PondId,
    scope: Scope,
    as_of: NaiveDate,
    cfg: &FcrConfig,
) -> Result<FcrEstimate, StoreError> {
    let through = DateRange::through(as_of);
    let samplings = store.samplings(pond, scope, through)?;
    let feed_logs = store.feed_logs(pond, through)?;
    let estimate = compute_fcr(&samplings, &feed_logs, cfg);
    debug!(
        pond,
        scope = %scope,
        fcr = estimate.fcr,
        method = ?estimate.method,
        intervals = estimate.intervals.len(),
        "FCR estimated"
    );
    Ok(estimate)
}
