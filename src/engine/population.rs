//! Population Estimator
//!
//! Live count is always recomputed from cumulative sums:
//! `max(0, stocked - mortality - harvested)` over every record in scope dated
//! on or before the cutoff. It is never derived back from biomass.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::store::{EventStore, StoreError};
use crate::types::{
    DateRange, HarvestRecord, MortalityRecord, PondId, SamplingRecord, Scope, StockingRecord,
};

/// Cumulative population figures for one pond/scope at a cutoff date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationEstimate {
    pub pond: PondId,
    pub scope: Scope,
    pub as_of: NaiveDate,
    pub stocked: u64,
    pub mortality: u64,
    pub harvested: u64,
    pub live_count: u64,
}

impl PopulationEstimate {
    /// Live fish as a percentage of all fish stocked. `None` before any stocking.
    pub fn survival_rate_percent(&self) -> Option<f64> {
        if self.stocked == 0 {
            return None;
        }
        Some(self.live_count as f64 / self.stocked as f64 * 100.0)
    }
}

/// Sum of piece counts, pinned at `u64::MAX` instead of wrapping.
pub fn saturating_total(counts: impl IntoIterator<Item = u64>) -> u64 {
    counts.into_iter().fold(0, u64::saturating_add)
}

/// Reduce the three record streams into an estimate. Records are assumed to be
/// pre-filtered to the pond, scope and cutoff.
pub fn tally(
    pond: PondId,
    scope: Scope,
    as_of: NaiveDate,
    stockings: &[StockingRecord],
    mortalities: &[MortalityRecord],
    harvests: &[HarvestRecord],
) -> PopulationEstimate {
    let stocked = saturating_total(stockings.iter().map(|s| s.pcs));
    let mortality = saturating_total(mortalities.iter().map(|m| m.count));
    let harvested = saturating_total(harvests.iter().map(HarvestRecord::pieces));
    let live_count = stocked.saturating_sub(mortality).saturating_sub(harvested);

    PopulationEstimate {
        pond,
        scope,
        as_of,
        stocked,
        mortality,
        harvested,
        live_count,
    }
}

/// Estimate the population of `pond` restricted to `scope` through `as_of`.
pub fn estimate_population(
    store: &dyn EventStore,
    pond: PondId,
    scope: Scope,
    as_of: NaiveDate,
) -> Result<PopulationEstimate, StoreError> {
    let through = DateRange::through(as_of);
    let stockings: Vec<StockingRecord> = store
        .stockings(pond, scope)?
        .into_iter()
        .filter(|s| s.date <= as_of)
        .collect();
    let mortalities = store.mortalities(pond, scope, through)?;
    let harvests = store.harvests(pond, scope, through)?;

    let estimate = tally(pond, scope, as_of, &stockings, &mortalities, &harvests);
    debug!(
        pond,
        scope = %scope,
        as_of = %as_of,
        stocked = estimate.stocked,
        mortality = estimate.mortality,
        harvested = estimate.harvested,
        live = estimate.live_count,
        "Population estimated"
    );
    Ok(estimate)
}

// ============================================================================
// Mortality Weight Auto-fill
// ============================================================================

/// Fill a missing average weight at death from the latest sampling in the
/// mortality's scope on or before its date, else from the latest stocking.
///
/// A record that already carries a weight is returned unchanged. If neither
/// source exists the weight stays `None`.
pub fn fill_mortality_weight(
    store: &dyn EventStore,
    mut record: MortalityRecord,
) -> Result<MortalityRecord, StoreError> {
    if record.avg_weight_kg.is_some() {
        return Ok(record);
    }
    let scope = Scope::from_option(record.species);

    let from_sampling = store
        .samplings(record.pond, scope, DateRange::through(record.date))?
        .iter()
        .rev()
        .find_map(SamplingRecord::average_weight_kg);

    let weight = match from_sampling {
        Some(w) => Some(w),
        None => store
            .stockings(record.pond, scope)?
            .iter()
            .rev()
            .filter(|s| s.date <= record.date)
            .find_map(StockingRecord::average_weight_kg),
    };

    if let Some(w) = weight {
        debug!(pond = record.pond, mortality = record.id, avg_weight_kg = w, "Filled mortality weight");
    }
    record.avg_weight_kg = weight;
    Ok(record)
}
