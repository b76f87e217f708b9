//! Read-only pond reports: FCR analysis and biomass analysis.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::composer::estimate_average_weight;
use super::fcr::FcrEstimate;
use super::population::estimate_population;
use crate::config::FallbackConfig;
use crate::store::{EventStore, StoreError};
use crate::types::{DataSource, DateRange, PondId, Scope, SpeciesId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FcrReport {
    pub pond: PondId,
    pub scope: Scope,
    pub as_of: NaiveDate,
    #[serde(flatten)]
    pub estimate: FcrEstimate,
}

// ============================================================================
// Biomass
// ============================================================================

/// Biomass movement recorded by samplings, plus the standing biomass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomassSummary {
    pub scope: Scope,
    pub live_count: u64,
    pub average_weight_kg: Option<f64>,
    /// `None` for pond totals, which pool several weight sources
    pub data_source: Option<DataSource>,
    pub current_biomass_kg: f64,
    /// Sum of positive sampling biomass differences
    pub total_gain_kg: f64,
    /// Sum of negative sampling biomass differences, as a positive number
    pub total_loss_kg: f64,
    pub net_change_kg: f64,
    pub samplings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiomassReport {
    pub pond: PondId,
    pub as_of: NaiveDate,
    pub total: BiomassSummary,
    pub species: Vec<BiomassSummary>,
}

/// (gain, loss, sampling count) over samplings on or before `as_of`.
fn sampling_movement(
    store: &dyn EventStore,
    pond: PondId,
    scope: Scope,
    as_of: NaiveDate,
) -> Result<(f64, f64, usize), StoreError> {
    let samplings = store.samplings(pond, scope, DateRange::through(as_of))?;
    let (gain, loss) = samplings
        .iter()
        .filter_map(|s| s.biomass_difference_kg)
        .filter(|d| d.is_finite())
        .fold((0.0, 0.0), |(g, l), d| {
            if d >= 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });
    Ok((gain, loss, samplings.len()))
}

pub fn summarize_species(
    store: &dyn EventStore,
    pond: PondId,
    species: SpeciesId,
    as_of: NaiveDate,
    fallback: &FallbackConfig,
) -> Result<BiomassSummary, StoreError> {
    let scope = Scope::Species(species);
    let live_count = estimate_population(store, pond, scope, as_of)?.live_count;
    let weight = estimate_average_weight(store, pond, scope, as_of, fallback)?;
    let (total_gain_kg, total_loss_kg, samplings) = sampling_movement(store, pond, scope, as_of)?;
    let average_weight_kg = weight.map(|w| w.average_weight_kg);

    Ok(BiomassSummary {
        scope,
        live_count,
        average_weight_kg,
        data_source: weight.map(|w| w.source),
        current_biomass_kg: average_weight_kg.map_or(0.0, |w| w * live_count as f64),
        total_gain_kg,
        total_loss_kg,
        net_change_kg: total_gain_kg - total_loss_kg,
        samplings,
    })
}

/// Per-species summaries for every species stocked in `pond` by `as_of`, and
/// a pond total.
pub fn biomass_report(
    store: &dyn EventStore,
    pond: PondId,
    as_of: NaiveDate,
    fallback: &FallbackConfig,
) -> Result<BiomassReport, StoreError> {
    let stocked: BTreeSet<SpeciesId> = store
        .stockings(pond, Scope::Mixed)?
        .iter()
        .filter(|s| s.date <= as_of)
        .map(|s| s.species)
        .collect();

    let species = stocked
        .into_iter()
        .map(|id| summarize_species(store, pond, id, as_of, fallback))
        .collect::<Result<Vec<_>, _>>()?;

    // Pond-wide samplings include those with no species recorded
    let (total_gain_kg, total_loss_kg, samplings) =
        sampling_movement(store, pond, Scope::Mixed, as_of)?;
    let live_count = estimate_population(store, pond, Scope::Mixed, as_of)?.live_count;
    let current_biomass_kg: f64 = species.iter().map(|s| s.current_biomass_kg).sum();

    Ok(BiomassReport {
        pond,
        as_of,
        total: BiomassSummary {
            scope: Scope::Mixed,
            live_count,
            average_weight_kg: (live_count > 0).then(|| current_biomass_kg / live_count as f64),
            data_source: None,
            current_biomass_kg,
            total_gain_kg,
            total_loss_kg,
            net_change_kg: total_gain_kg - total_loss_kg,
            samplings,
        },
        species,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryEventStore, SamplingBatch, SamplingLedger};
    use crate::types::{SamplingRecord, StockingRecord};

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, n).unwrap()
    }

    fn stocking(id: u64, species: u32, pcs: u64, kg: f64) -> StockingRecord {
        StockingRecord {
            id,
            pond: 3,
            species,
            date: day(1),
            pcs,
            total_weight_kg: kg,
            notes: String::new(),
        }
    }

    fn sampling(id: u64, species: Option<u32>, date: NaiveDate, diff: f64) -> SamplingRecord {
        let mut s = SamplingRecord::new(id, 3, species, date, 10, 0.5);
        s.biomass_difference_kg = Some(diff);
        s
    }

    #[test]
    fn test_report_splits_species_and_totals() {
        let store = InMemoryEventStore::new();
        store.add_stocking(stocking(1, 1, 1000, 10.0)).unwrap();
        store.add_stocking(stocking(2, 2, 200, 20.0)).unwrap();
        store
            .commit_samplings(SamplingBatch {
                upserts: vec![
                    sampling(3, Some(1), day(10), 30.0),
                    sampling(4, Some(1), day(20), -5.0),
                    sampling(5, None, day(21), 2.0),
                ],
                deletions: vec![],
            })
            .unwrap();

        let report = biomass_report(&store, 3, day(25), &FallbackConfig::default()).unwrap();
        assert_eq!(report.species.len(), 2);

        let tilapia = &report.species[0];
        assert_eq!(tilapia.scope, Scope::Species(1));
        assert_eq!(tilapia.total_gain_kg, 30.0);
        assert_eq!(tilapia.total_loss_kg, 5.0);
        assert_eq!(tilapia.net_change_kg, 25.0);
        assert_eq!(tilapia.data_source, Some(DataSource::Sampling));
        assert!((tilapia.current_biomass_kg - 50.0).abs() < 1e-9);

        let catfish = &report.species[1];
        assert_eq!(catfish.samplings, 0);
        assert_eq!(catfish.data_source, Some(DataSource::StockingBased));

        assert_eq!(report.total.samplings, 3);
        assert_eq!(report.total.total_gain_kg, 32.0);
        assert_eq!(report.total.live_count, 1200);
        let summed = tilapia.current_biomass_kg + catfish.current_biomass_kg;
        assert!((report.total.current_biomass_kg - summed).abs() < 1e-9);
    }
}
