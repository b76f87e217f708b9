//! Growth & feeding recommendation engine
//!
//! Components, leaf first:
//! - `population`: live count from cumulative stocking/mortality/harvest
//! - `growth`: per-sampling growth rate and biomass difference, cascades
//! - `stages`: weight-banded feeding stage table
//! - `risk`: seven environmental/health factors, summed and clamped
//! - `fcr`: feed conversion ratio with interval blending
//! - `composer`: the daily `FeedingAdvice`
//! - `projection`: days and feed to reach a target biomass
//! - `reports`: FCR and biomass analysis
//!
//! `FeedingEngine` ties them to an event store and a configuration. Every
//! computation is synchronous and reads the store fresh, so the same snapshot
//! and date always give the same answer.

pub mod composer;
pub mod fcr;
pub mod growth;
pub mod population;
pub mod projection;
pub mod reports;
pub mod risk;
pub mod stages;

pub use composer::{compose_advice, estimate_average_weight, WeightEstimate};
pub use fcr::{compute_fcr, estimate_fcr, FcrEstimate, FcrInterval, FcrMethod, FcrStatus};
pub use growth::{cascade_recompute, compute_growth, select_baseline, Baseline, GrowthComputation};
pub use population::{estimate_population, fill_mortality_weight, PopulationEstimate};
pub use projection::{project_target_biomass, ProjectionInputs, ProjectionResult};
pub use reports::{biomass_report, BiomassReport, BiomassSummary, FcrReport};
pub use risk::{assess, clamp_total, gather_inputs, RiskAssessment, RiskInputs};
pub use stages::{lookup_stage, FeedingSlot, FeedingStage, STAGE_TABLE};

use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::store::{EventStore, OverlayStore, SamplingLedger};
use crate::types::{
    DateRange, FeedingAdvice, MortalityRecord, PondId, RecordId, SamplingRecord, Scope,
};

// ============================================================================
// Batch Output
// ============================================================================

/// Result of generating advice for every stocked pond/species pair.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdviceBatch {
    pub advice: Vec<FeedingAdvice>,
    /// Pairs without enough data for a recommendation
    pub skipped: usize,
    /// Pairs that failed for any other reason
    pub failures: Vec<String>,
}

// ============================================================================
// Engine
// ============================================================================

pub struct FeedingEngine<'a, S: SamplingLedger> {
    store: &'a S,
    config: &'a EngineConfig,
}

impl<'a, S: SamplingLedger> FeedingEngine<'a, S> {
    pub const fn new(store: &'a S, config: &'a EngineConfig) -> Self {
        Self { store, config }
    }

    pub const fn config(&self) -> &EngineConfig {
        self.config
    }

    fn events(&self) -> &'a dyn EventStore {
        self.store
    }

    // ------------------------------------------------------------------------
    // Population & Growth
    // ------------------------------------------------------------------------

    pub fn compute_population(
        &self,
        pond: PondId,
        scope: Scope,
        as_of: NaiveDate,
    ) -> EngineResult<PopulationEstimate> {
        Ok(estimate_population(self.events(), pond, scope, as_of)?)
    }

    /// Fill a mortality record's missing average weight before it is stored.
    pub fn complete_mortality(&self, record: MortalityRecord) -> EngineResult<MortalityRecord> {
        Ok(fill_mortality_weight(self.events(), record)?)
    }

    /// Recompute sampling `id` and every later sampling in its pond.
    pub fn recompute_growth(&self, id: RecordId) -> EngineResult<Vec<SamplingRecord>> {
        let record = self
            .store
            .sampling(id)?
            .ok_or(EngineError::SamplingNotFound(id))?;
        self.apply_cascade(OverlayStore::new(self.events()), &[(record.pond, record.date)])
    }

    /// Insert or edit a sampling and cascade through every later sampling.
    ///
    /// An edit that moves the record to an earlier date, or to another pond,
    /// recomputes from whichever position is affected first. Returns the
    /// committed records with derived growth fields.
    pub fn record_sampling(&self, mut record: SamplingRecord) -> EngineResult<Vec<SamplingRecord>> {
        record.growth_rate_kg_per_day = None;
        record.biomass_difference_kg = None;

        let mut starts = vec![(record.pond, record.date)];
        if let Some(previous) = self.store.sampling(record.id)? {
            if previous.pond == record.pond {
                starts[0].1 = starts[0].1.min(previous.date);
            } else {
                starts.push((previous.pond, previous.date));
            }
        }

        let mut overlay = OverlayStore::new(self.events());
        overlay.upsert(record);
        self.apply_cascade(overlay, &starts)
    }

    /// Delete a sampling and recompute every later sampling in its pond.
    pub fn delete_sampling(&self, id: RecordId) -> EngineResult<Vec<SamplingRecord>> {
        let record = self
            .store
            .sampling(id)?
            .ok_or(EngineError::SamplingNotFound(id))?;
        let mut overlay = OverlayStore::new(self.events());
        overlay.delete(id);
        self.apply_cascade(overlay, &[(record.pond, record.date)])
    }

    /// Re-derive growth for every sampling of every stocked pond in one batch.
    pub fn recompute_all(&self) -> EngineResult<Vec<SamplingRecord>> {
        let mut starts = Vec::new();
        for pond in self.store.ponds()? {
            if let Some(first) = self.store.samplings(pond, Scope::Mixed, DateRange::ALL)?.first() {
                starts.push((pond, first.date));
            }
        }
        if starts.is_empty() {
            info!("No samplings to recompute");
            return Ok(Vec::new());
        }
        self.apply_cascade(OverlayStore::new(self.events()), &starts)
    }

    /// Cascade from each `(pond, date)` against `overlay`, then commit the
    /// staged edits and every recomputed record as one batch.
    fn apply_cascade(
        &self,
        mut overlay: OverlayStore<'_>,
        starts: &[(PondId, NaiveDate)],
    ) -> EngineResult<Vec<SamplingRecord>> {
        let mut updated = Vec::new();
        for &(pond, from_date) in starts {
            updated.extend(cascade_recompute(&overlay, pond, from_date)?);
        }
        for record in &updated {
            overlay.upsert(record.clone());
        }

        let batch = overlay.into_batch();
        let deletions = batch.deletions.len();
        if let Err(e) = self.store.commit_samplings(batch) {
            let (pond, from_date) = starts[0];
            warn!(pond, from = %from_date, error = %e, "Growth cascade commit rejected");
            return Err(EngineError::CascadeFailed {
                pond,
                from_date,
                failures: vec![format!("commit: {e}")],
            });
        }

        info!(
            ponds = starts.len(),
            recomputed = updated.len(),
            deletions,
            backend = self.store.backend_name(),
            "Growth cascade committed"
        );
        Ok(updated)
    }

    // ------------------------------------------------------------------------
    // Advice
    // ------------------------------------------------------------------------

    /// Daily recommendation for `pond`/`scope`. Nothing is persisted.
    pub fn generate_advice(
        &self,
        pond: PondId,
        scope: Scope,
        as_of: NaiveDate,
    ) -> EngineResult<FeedingAdvice> {
        compose_advice(self.events(), pond, scope, as_of, self.config, Utc::now())
    }

    /// Every (pond, species) pair stocked on or before `as_of`.
    pub fn stocked_pairs(&self, as_of: NaiveDate) -> EngineResult<Vec<(PondId, Scope)>> {
        let mut pairs = Vec::new();
        for pond in self.store.ponds()? {
            let species: BTreeSet<_> = self
                .store
                .stockings(pond, Scope::Mixed)?
                .iter()
                .filter(|s| s.date <= as_of)
                .map(|s| s.species)
                .collect();
            pairs.extend(species.into_iter().map(|id| (pond, Scope::Species(id))));
        }
        Ok(pairs)
    }

    /// Advice for every stocked pair, computed in parallel. Pairs without
    /// enough data are skipped and counted rather than failing the batch.
    pub fn generate_all(&self, as_of: NaiveDate) -> EngineResult<AdviceBatch> {
        let pairs = self.stocked_pairs(as_of)?;
        let results: Vec<_> = pairs
            .par_iter()
            .map(|&(pond, scope)| (pond, scope, self.generate_advice(pond, scope, as_of)))
            .collect();

        let mut batch = AdviceBatch::default();
        for (pond, scope, result) in results {
            match result {
                Ok(advice) => batch.advice.push(advice),
                Err(EngineError::InsufficientData { .. }) => batch.skipped += 1,
                Err(e) => {
                    warn!(pond, scope = %scope, error = %e, "Advice generation failed");
                    batch.failures.push(format!("pond {pond} ({scope}): {e}"));
                }
            }
        }

        info!(
            pairs = pairs.len(),
            generated = batch.advice.len(),
            skipped = batch.skipped,
            failed = batch.failures.len(),
            "Batch advice generated"
        );
        Ok(batch)
    }

    // ------------------------------------------------------------------------
    // Planning & Reports
    // ------------------------------------------------------------------------

    pub fn project_target_biomass(
        &self,
        pond: PondId,
        scope: Scope,
        target_kg: f64,
        as_of: NaiveDate,
    ) -> EngineResult<ProjectionResult> {
        composer::require_stocking(self.events(), pond, scope, as_of)?;

        let live_count = estimate_population(self.events(), pond, scope, as_of)?.live_count;
        let weight = estimate_average_weight(self.events(), pond, scope, as_of, &self.config.fallback)?
            .ok_or(EngineError::InsufficientData { pond, scope })?;
        let growth_rate_kg_per_day = self
            .store
            .samplings(pond, scope, DateRange::through(as_of))?
            .iter()
            .rev()
            .find_map(|s| s.growth_rate_kg_per_day);
        let fcr = estimate_fcr(self.events(), pond, scope, as_of, &self.config.fcr)?.fcr;

        let inputs = ProjectionInputs {
            pond,
            scope,
            as_of,
            live_count,
            average_weight_kg: weight.average_weight_kg,
            growth_rate_kg_per_day,
            fcr,
        };
        projection::project_target_biomass(&inputs, target_kg, &self.config.projection)
    }

    pub fn fcr_report(&self, pond: PondId, scope: Scope, as_of: NaiveDate) -> EngineResult<FcrReport> {
        let estimate = estimate_fcr(self.events(), pond, scope, as_of, &self.config.fcr)?;
        Ok(FcrReport {
            pond,
            scope,
            as_of,
            estimate,
        })
    }

    pub fn biomass_report(&self, pond: PondId, as_of: NaiveDate) -> EngineResult<BiomassReport> {
        Ok(reports::biomass_report(
            self.events(),
            pond,
            as_of,
            &self.config.fallback,
        )?)
    }
}
