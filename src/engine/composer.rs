//! Recommendation Composer
//!
//! Combines population, average weight, stage and risk into one daily
//! feeding recommendation:
//!
//! ```text
//! biomass_kg      = live_count * average_weight_kg
//! base_feed_kg    = biomass_kg * stage.base_rate_percent / 100
//! final_rate      = stage.base_rate_percent * (1 + adjustment / 100)
//! final_feed_kg   = base_feed_kg * (1 + adjustment / 100)
//! ```
//!
//! The adjustment is the clamped sum from the risk analyzer, applied once.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::fcr::estimate_fcr;
use super::population::estimate_population;
use super::risk::{assess, gather_inputs};
use super::stages::lookup_stage;
use crate::config::defaults::GRAMS_PER_KG;
use crate::config::{EngineConfig, FallbackConfig};
use crate::error::{EngineError, EngineResult};
use crate::store::{EventStore, StoreError};
use crate::types::{
    AdjustmentBreakdown, DataSource, DateRange, FactorStatus, FeedingAdvice, PondId,
    SamplingRecord, Scope, Season, StockingRecord,
};

// ============================================================================
// Average Weight
// ============================================================================

/// Average fish weight for a pond/scope and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightEstimate {
    pub average_weight_kg: f64,
    pub source: DataSource,
    /// Date of the sampling or stocking the weight is based on
    pub observed_on: NaiveDate,
}

/// Latest sampled weight on or before `as_of`; without one, the latest
/// stocking weight aged forward at the fallback growth rate.
///
/// `None` when neither a sampling nor a stocking carries a usable weight.
pub fn estimate_average_weight(
    store: &dyn EventStore,
    pond: PondId,
    scope: Scope,
    as_of: NaiveDate,
    fallback: &FallbackConfig,
) -> Result<Option<WeightEstimate>, StoreError> {
    let sampled = store
        .samplings(pond, scope, DateRange::through(as_of))?
        .iter()
        .rev()
        .find_map(|s: &SamplingRecord| s.average_weight_kg().map(|w| (w, s.date)));
    if let Some((w, date)) = sampled {
        return Ok(Some(WeightEstimate {
            average_weight_kg: w,
            source: DataSource::Sampling,
            observed_on: date,
        }));
    }

    let stocked = store
        .stockings(pond, scope)?
        .iter()
        .rev()
        .filter(|s| s.date <= as_of)
        .find_map(|s: &StockingRecord| s.average_weight_kg().map(|w| (w, s.date)));
    Ok(stocked.map(|(w, date)| {
        let days = (as_of - date).num_days().max(0) as f64;
        let aged = w + days * fallback.default_growth_g_per_day / GRAMS_PER_KG;
        debug!(pond, scope = %scope, stocked_kg = w, aged_kg = aged, days, "Weight aged from stocking");
        WeightEstimate {
            average_weight_kg: aged,
            source: DataSource::StockingBased,
            observed_on: date,
        }
    }))
}

/// Ensure at least one stocking on or before `as_of` exists for `pond`/`scope`.
pub(crate) fn require_stocking(
    store: &dyn EventStore,
    pond: PondId,
    scope: Scope,
    as_of: NaiveDate,
) -> EngineResult<()> {
    let stocked = store.stockings(pond, scope)?.iter().any(|s| s.date <= as_of);
    if stocked {
        Ok(())
    } else {
        Err(EngineError::InsufficientData { pond, scope })
    }
}

// ============================================================================
// Composition
// ============================================================================

/// Average cost per kg over recent feed logs that record a cost.
fn feed_cost_per_kg(
    store: &dyn EventStore,
    pond: PondId,
    as_of: NaiveDate,
    lookback_days: u32,
) -> Result<Option<f64>, StoreError> {
    let logs = store.feed_logs(pond, DateRange::trailing_days(as_of, lookback_days))?;
    let (cost, kg) = logs
        .iter()
        .filter_map(|l| l.cost.map(|c| (c, l.feed_kg)))
        .filter(|(c, kg)| c.is_finite() && kg.is_finite() && *kg > 0.0)
        .fold((0.0, 0.0), |(tc, tk), (c, kg)| (tc + c, tk + kg));
    Ok((kg > 0.0).then(|| cost / kg))
}

#[allow(clippy::too_many_arguments)]
fn build_notes(
    stage_name: &str,
    weight_g: f64,
    base_rate: f64,
    source: DataSource,
    live_count: u64,
    season: Season,
    breakdown: &AdjustmentBreakdown,
    fallback: &FallbackConfig,
) -> Vec<String> {
    let mut notes = vec![format!(
        "Stage {stage_name} at {weight_g:.1} g average weight: base rate {base_rate:.1}% of biomass."
    )];

    if source == DataSource::StockingBased {
        notes.push(format!(
            "No sampling on record; weight estimated from stocking at {} g/day growth. Confidence is lower.",
            fallback.default_growth_g_per_day
        ));
    }
    if live_count == 0 {
        notes.push("No live fish on record; recommended feed is zero.".to_string());
    }

    for f in breakdown
        .factors
        .iter()
        .filter(|f| f.status == FactorStatus::Applied && f.adjustment_percent != 0.0)
    {
        notes.push(format!(
            "{} {:+.0}%: {}.",
            f.kind.label(),
            f.adjustment_percent,
            f.detail
        ));
    }

    let missing: Vec<&str> = breakdown.unavailable().map(|f| f.kind.label()).collect();
    if !missing.is_empty() {
        notes.push(format!("No data for {}; no adjustment applied.", missing.join(", ")));
    }

    if breakdown.clamped {
        notes.push(format!(
            "Total adjustment {:+.0}% limited to {:+.0}%.",
            breakdown.raw_total_percent, breakdown.total_percent
        ));
    } else {
        notes.push(format!(
            "Total adjustment {:+.0}% ({season}).",
            breakdown.total_percent
        ));
    }
    notes
}

/// Build the daily feeding recommendation for `pond`/`scope` as of `as_of`.
///
/// Reads only; the caller decides whether to persist the result.
pub fn compose_advice(
    store: &dyn EventStore,
    pond: PondId,
    scope: Scope,
    as_of: NaiveDate,
    config: &EngineConfig,
    created_at: DateTime<Utc>,
) -> EngineResult<FeedingAdvice> {
    require_stocking(store, pond, scope, as_of)?;

    let population = estimate_population(store, pond, scope, as_of)?;
    let weight = estimate_average_weight(store, pond, scope, as_of, &config.fallback)?
        .ok_or(EngineError::InsufficientData { pond, scope })?;

    let weight_g = weight.average_weight_kg * GRAMS_PER_KG;
    let stage = lookup_stage(weight_g);
    let biomass_kg = population.live_count as f64 * weight.average_weight_kg;
    let base_feed_kg = biomass_kg * stage.base_rate_percent / 100.0;

    let inputs = gather_inputs(store, pond, scope, as_of, population.live_count, config)?;
    let risk = assess(&inputs, config);
    let multiplier = risk.breakdown.multiplier();

    let recommended_feed_kg = base_feed_kg * multiplier;
    let frequency = stage.frequency();
    let fcr = estimate_fcr(store, pond, scope, as_of, &config.fcr)?;
    let cost_per_kg = feed_cost_per_kg(store, pond, as_of, config.farm.feed_cost_lookback_days)?;

    let notes = build_notes(
        stage.name,
        weight_g,
        stage.base_rate_percent,
        weight.source,
        population.live_count,
        inputs.season,
        &risk.breakdown,
        &config.fallback,
    );

    info!(
        pond,
        scope = %scope,
        stage = stage.name,
        live = population.live_count,
        biomass_kg,
        adjustment = risk.breakdown.total_percent,
        feed_kg = recommended_feed_kg,
        source = %weight.source,
        "Feeding advice composed"
    );

    Ok(FeedingAdvice {
        id: None,
        pond,
        scope,
        date: as_of,
        estimated_fish_count: population.live_count,
        average_weight_kg: weight.average_weight_kg,
        total_biomass_kg: biomass_kg,
        data_source: weight.source,
        stage_name: stage.name.to_string(),
        base_rate_percent: stage.base_rate_percent,
        protein_percent: stage.protein_percent,
        pellet_size: stage.pellet_size.to_string(),
        base_feed_kg,
        recommended_feed_kg,
        feeding_rate_percent: stage.base_rate_percent * multiplier,
        feeding_frequency: frequency,
        feed_per_session_kg: recommended_feed_kg / f64::from(frequency.max(1)),
        schedule: stage.sessions(recommended_feed_kg),
        season: inputs.season,
        breakdown: risk.breakdown,
        analysis: risk.analysis,
        fcr: Some(fcr.fcr),
        feed_cost_per_kg: cost_per_kg,
        daily_feed_cost: cost_per_kg.map(|c| c * recommended_feed_kg),
        notes,
        applied: false,
        applied_at: None,
        created_at,
    })
}
