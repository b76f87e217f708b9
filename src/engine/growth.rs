//! Growth Tracker
//!
//! Derives `growth_rate_kg_per_day` and `biomass_difference_kg` for a sampling
//! from its baseline, the nearest strictly-earlier observation:
//!
//! 1. latest sampling in the same pond and same species
//! 2. else latest sampling in the same pond of any species
//! 3. else latest stocking in the same pond (same species if known), using
//!    its implied average weight
//!
//! Records without a usable average weight are skipped during selection.
//! No baseline, or a baseline on the same day, leaves both fields `None`.
//! Negative growth is kept as measured.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::population::estimate_population;
use crate::error::{EngineError, EngineResult};
use crate::store::{EventStore, StoreError};
use crate::types::{DateRange, PondId, RecordId, SamplingRecord, Scope, StockingRecord};

// ============================================================================
// Baseline
// ============================================================================

/// The observation a sampling's growth is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Baseline {
    Sampling {
        id: RecordId,
        date: NaiveDate,
        average_weight_kg: f64,
        /// False when the match came from the any-species fallback
        same_species: bool,
    },
    Stocking {
        id: RecordId,
        date: NaiveDate,
        average_weight_kg: f64,
    },
}

impl Baseline {
    pub const fn date(&self) -> NaiveDate {
        match self {
            Self::Sampling { date, .. } | Self::Stocking { date, .. } => *date,
        }
    }

    pub const fn average_weight_kg(&self) -> f64 {
        match self {
            Self::Sampling {
                average_weight_kg, ..
            }
            | Self::Stocking {
                average_weight_kg, ..
            } => *average_weight_kg,
        }
    }
}

/// Pick the baseline for `sample` from the records visible in `store`.
pub fn select_baseline(
    store: &dyn EventStore,
    sample: &SamplingRecord,
) -> Result<Option<Baseline>, StoreError> {
    let earlier: Vec<SamplingRecord> = store
        .samplings(sample.pond, Scope::Mixed, DateRange::through(sample.date))?
        .into_iter()
        .filter(|s| s.date < sample.date && s.id != sample.id)
        .collect();

    let as_baseline = |s: &SamplingRecord, same_species: bool| {
        s.average_weight_kg().map(|w| Baseline::Sampling {
            id: s.id,
            date: s.date,
            average_weight_kg: w,
            same_species,
        })
    };

    if let Some(species) = sample.species {
        let same = earlier
            .iter()
            .rev()
            .filter(|s| s.species == Some(species))
            .find_map(|s| as_baseline(s, true));
        if same.is_some() {
            return Ok(same);
        }
    }

    let any = earlier.iter().rev().find_map(|s| as_baseline(s, false));
    if any.is_some() {
        return Ok(any);
    }

    let stocking = store
        .stockings(sample.pond, Scope::from_option(sample.species))?
        .iter()
        .rev()
        .filter(|s| s.date <= sample.date)
        .find_map(|s: &StockingRecord| {
            s.average_weight_kg().map(|w| Baseline::Stocking {
                id: s.id,
                date: s.date,
                average_weight_kg: w,
            })
        });
    Ok(stocking)
}

// ============================================================================
// Growth Computation
// ============================================================================

/// A sampling with freshly derived growth fields, plus how they were derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthComputation {
    pub record: SamplingRecord,
    pub baseline: Option<Baseline>,
    /// Whole days between baseline and sample
    pub days: Option<i64>,
    /// Live fish in the sample's scope on the sample date
    pub live_count: u64,
}

impl GrowthComputation {
    /// Biomass added per day over the interval: `growth_rate * live_count`.
    pub fn daily_biomass_gain_kg(&self) -> Option<f64> {
        self.record
            .growth_rate_kg_per_day
            .map(|rate| rate * self.live_count as f64)
    }
}

/// Recompute the growth fields of `sample` against the records in `store`.
pub fn compute_growth(
    store: &dyn EventStore,
    sample: &SamplingRecord,
) -> Result<GrowthComputation, StoreError> {
    let mut record = sample.clone();
    record.growth_rate_kg_per_day = None;
    record.biomass_difference_kg = None;

    let live_count =
        estimate_population(store, sample.pond, Scope::from_option(sample.species), sample.date)?
            .live_count;
    let baseline = select_baseline(store, sample)?;

    let mut out = GrowthComputation {
        record,
        baseline,
        days: None,
        live_count,
    };

    // A same-date duplicate of this pond/species has no measurable interval
    let duplicate = store
        .samplings(sample.pond, Scope::Mixed, DateRange::between(sample.date, sample.date))?
        .iter()
        .any(|s| s.id != sample.id && s.species == sample.species);
    if duplicate {
        out.days = Some(0);
        debug!(sampling = sample.id, pond = sample.pond, date = %sample.date, "Same-date duplicate, growth left empty");
        return Ok(out);
    }

    let (Some(current_kg), Some(base)) = (sample.average_weight_kg(), baseline) else {
        debug!(sampling = sample.id, pond = sample.pond, "No baseline or weight, growth left empty");
        return Ok(out);
    };

    let days = (sample.date - base.date()).num_days();
    out.days = Some(days);
    if days <= 0 {
        debug!(sampling = sample.id, days, "Baseline on the same day, growth left empty");
        return Ok(out);
    }

    let delta_kg = current_kg - base.average_weight_kg();
    out.record.growth_rate_kg_per_day = Some(delta_kg / days as f64);
    out.record.biomass_difference_kg = Some(delta_kg * live_count as f64);

    if delta_kg < 0.0 {
        info!(
            sampling = sample.id,
            pond = sample.pond,
            delta_kg,
            "Sampling lighter than its baseline"
        );
    }
    Ok(out)
}

/// Recompute every sampling in `pond` dated on or after `from_date`, in date
/// order, against the records in `store`.
///
/// Nothing is written. Any per-record failure aborts the whole cascade with a
/// single `CascadeFailed` listing every failure, so the caller can commit the
/// returned records as one batch or not at all.
pub fn cascade_recompute(
    store: &dyn EventStore,
    pond: PondId,
    from_date: NaiveDate,
) -> EngineResult<Vec<SamplingRecord>> {
    let affected = store
        .samplings(pond, Scope::Mixed, DateRange::since(from_date))
        .map_err(|e| EngineError::CascadeFailed {
            pond,
            from_date,
            failures: vec![format!("listing samplings: {e}")],
        })?;

    let mut updated = Vec::with_capacity(affected.len());
    let mut failures = Vec::new();
    for sample in &affected {
        match compute_growth(store, sample) {
            Ok(computed) => updated.push(computed.record),
            Err(e) => failures.push(format!("sampling {}: {e}", sample.id)),
        }
    }

    if !failures.is_empty() {
        warn!(pond, from = %from_date, failed = failures.len(), "Growth cascade failed");
        return Err(EngineError::CascadeFailed {
            pond,
            from_date,
            failures,
        });
    }

    debug!(pond, from = %from_date, recomputed = updated.len(), "Growth cascade computed");
    Ok(updated)
}
