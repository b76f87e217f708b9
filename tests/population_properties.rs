//! Population estimator properties over randomized pond histories.

use chrono::{Duration, NaiveDate};
use rand::prelude::*;

use pondfeed::types::{HarvestCount, HarvestRecord, MortalityRecord, StockingRecord};
use pondfeed::{EngineConfig, FeedingEngine, InMemoryEventStore, Scope};

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(n)
}

/// One stocking per species on day 0, then 90 days of random removals,
/// some of them larger than what is left in the pond.
fn random_history(seed: u64) -> InMemoryEventStore {
    let mut rng = StdRng::seed_from_u64(seed);
    let store = InMemoryEventStore::new();
    for species in [1, 2] {
        store
            .add_stocking(StockingRecord {
                id: store.next_id(),
                pond: 1,
                species,
                date: day(0),
                pcs: rng.gen_range(200..2_000),
                total_weight_kg: 10.0,
                notes: String::new(),
            })
            .unwrap();
    }

    for n in 1..=90 {
        if rng.gen_bool(0.4) {
            let species = match rng.gen_range(0..3) {
                0 => None,
                s => Some(s),
            };
            store
                .add_mortality(MortalityRecord {
                    id: store.next_id(),
                    pond: 1,
                    species,
                    date: day(n),
                    count: rng.gen_range(1..60),
                    avg_weight_kg: None,
                    cause: String::new(),
                })
                .unwrap();
        }
        if rng.gen_bool(0.05) {
            let count = if rng.gen_bool(0.5) {
                HarvestCount::Pieces(rng.gen_range(50..800))
            } else {
                HarvestCount::PiecesPerKg(rng.gen_range(2.0..10.0))
            };
            store
                .add_harvest(HarvestRecord {
                    id: store.next_id(),
                    pond: 1,
                    species: Some(rng.gen_range(1..=2)),
                    date: day(n),
                    total_weight_kg: rng.gen_range(10.0..80.0),
                    count,
                })
                .unwrap();
        }
    }
    store
}

#[test]
fn live_count_matches_cumulative_sums_and_never_underflows() {
    let config = EngineConfig::default();
    for seed in 0..20 {
        let store = random_history(seed);
        let engine = FeedingEngine::new(&store, &config);
        for scope in [Scope::Species(1), Scope::Species(2), Scope::Mixed] {
            for n in (0..=90).step_by(7) {
                let p = engine.compute_population(1, scope, day(n)).unwrap();
                let removed = p.mortality + p.harvested;
                let expected = p.stocked.saturating_sub(removed);
                assert_eq!(p.live_count, expected, "seed {seed} {scope} day {n}");
                assert!(p.live_count <= p.stocked);
            }
        }
    }
}

#[test]
fn live_count_never_rises_without_new_stocking() {
    let config = EngineConfig::default();
    for seed in 0..20 {
        let store = random_history(seed);
        let engine = FeedingEngine::new(&store, &config);
        for scope in [Scope::Species(1), Scope::Mixed] {
            let mut previous = u64::MAX;
            for n in 0..=90 {
                let live = engine.compute_population(1, scope, day(n)).unwrap().live_count;
                assert!(live <= previous, "seed {seed} {scope} rose on day {n}");
                previous = live;
            }
        }
    }
}

#[test]
fn unidentified_mortality_only_counts_in_mixed_scope() {
    let store = InMemoryEventStore::new();
    store
        .add_stocking(StockingRecord {
            id: 1,
            pond: 1,
            species: 1,
            date: day(0),
            pcs: 100,
            total_weight_kg: 1.0,
            notes: String::new(),
        })
        .unwrap();
    store
        .add_mortality(MortalityRecord {
            id: 2,
            pond: 1,
            species: None,
            date: day(3),
            count: 10,
            avg_weight_kg: None,
            cause: String::new(),
        })
        .unwrap();

    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    assert_eq!(engine.compute_population(1, Scope::Species(1), day(5)).unwrap().live_count, 100);
    assert_eq!(engine.compute_population(1, Scope::Mixed, day(5)).unwrap().live_count, 90);
    // Before the death was logged
    assert_eq!(engine.compute_population(1, Scope::Mixed, day(2)).unwrap().live_count, 100);
}

#[test]
fn over_harvest_clamps_to_zero() {
    let store = InMemoryEventStore::new();
    store
        .add_stocking(StockingRecord {
            id: 1,
            pond: 1,
            species: 1,
            date: day(0),
            pcs: 100,
            total_weight_kg: 1.0,
            notes: String::new(),
        })
        .unwrap();
    store
        .add_harvest(HarvestRecord {
            id: 2,
            pond: 1,
            species: Some(1),
            date: day(60),
            total_weight_kg: 50.0,
            count: HarvestCount::PiecesPerKg(4.0),
        })
        .unwrap();

    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    let p = engine.compute_population(1, Scope::Species(1), day(60)).unwrap();
    assert_eq!(p.harvested, 200);
    assert_eq!(p.live_count, 0);
    assert_eq!(p.survival_rate_percent(), Some(0.0));
}

#[test]
fn oversized_counts_saturate_instead_of_overflowing() {
    let half = u64::MAX / 2 + 1;
    let store = InMemoryEventStore::new();
    for id in [1, 2] {
        store
            .add_stocking(StockingRecord {
                id,
                pond: 1,
                species: 1,
                date: day(0),
                pcs: half,
                total_weight_kg: 1.0,
                notes: String::new(),
            })
            .unwrap();
    }

    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    let p = engine.compute_population(1, Scope::Species(1), day(1)).unwrap();
    assert_eq!(p.stocked, u64::MAX);
    assert_eq!(p.live_count, u64::MAX);
    assert_eq!(p.survival_rate_percent(), Some(100.0));
}
