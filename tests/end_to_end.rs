//! End-to-end pond scenario
//!
//! One pond from stocking through two samplings to a stored, applied
//! recommendation, with the snapshot written to disk and read back.

use chrono::{Duration, NaiveDate, Utc};

use pondfeed::types::{FeedLogRecord, GrowthTrend, StockingRecord};
use pondfeed::{
    AdviceStorage, DataSource, EngineConfig, EventSnapshot, EventStore, FeedingEngine,
    InMemoryEventStore, SamplingRecord, Scope,
};

const POND: u32 = 7;
const SPECIES: u32 = 1;

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(n)
}

fn close(actual: f64, expected: f64, tolerance: f64) -> bool {
    (actual - expected).abs() < tolerance
}

/// 1000 fish at 5 g on day 0, one kilogram of feed a day at 1.20 per kg.
fn farm() -> InMemoryEventStore {
    let store = InMemoryEventStore::new();
    store
        .add_stocking(StockingRecord {
            id: 1,
            pond: POND,
            species: SPECIES,
            date: day(0),
            pcs: 1000,
            total_weight_kg: 5.0,
            notes: "spring intake".to_string(),
        })
        .unwrap();
    for n in 1..=60 {
        store
            .add_feed_log(FeedLogRecord {
                id: 100 + n as u64,
                pond: POND,
                date: day(n),
                feed_kg: 1.0,
                feed_type: Some("floating pellet".to_string()),
                protein_percent: Some(32.0),
                cost: Some(1.2),
            })
            .unwrap();
    }
    store
}

#[test]
fn stocking_to_applied_advice() {
    let store = farm();
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);

    // Day 30: 30 fish weigh 0.75 kg, so 25 g each
    engine
        .record_sampling(SamplingRecord::new(10, POND, Some(SPECIES), day(30), 30, 0.75))
        .unwrap();
    let first = store_sampling(&store, 10);
    let rate = first.growth_rate_kg_per_day.unwrap();
    assert!(close(rate, 0.000_667, 1e-6), "rate {rate}");
    assert!(close(first.biomass_difference_kg.unwrap(), 20.0, 1e-9));
    // Pond-level gain per day
    assert!(close(rate * 1000.0, 0.667, 1e-3));

    // Day 60: average weight 80 g
    engine
        .record_sampling(SamplingRecord::new(11, POND, Some(SPECIES), day(60), 10, 0.8))
        .unwrap();
    let second = store_sampling(&store, 11);
    assert!(close(second.growth_rate_kg_per_day.unwrap(), 0.001_833, 1e-6));
    assert!(close(second.biomass_difference_kg.unwrap(), 55.0, 1e-9));

    let advice = engine.generate_advice(POND, Scope::Species(SPECIES), day(60)).unwrap();
    assert_eq!(advice.stage_name, "Grower-4");
    assert_eq!(advice.data_source, DataSource::Sampling);
    assert_eq!(advice.estimated_fish_count, 1000);
    assert!(close(advice.total_biomass_kg, 80.0, 1e-9));
    assert!(close(advice.base_feed_kg, 2.56, 1e-9));

    let total = advice.breakdown.total_percent;
    assert!((-50.0..=30.0).contains(&total));
    assert!(close(advice.recommended_feed_kg, 2.56 * (1.0 + total / 100.0), 1e-9));
    assert!(close(
        advice.feed_per_session_kg * f64::from(advice.feeding_frequency),
        advice.recommended_feed_kg,
        1e-9
    ));

    // 30 kg fed over a 55 kg gain clamps to the 0.8 floor
    assert_eq!(advice.fcr, Some(0.8));
    assert!(close(advice.feed_cost_per_kg.unwrap(), 1.2, 1e-9));

    // Thirty days of the one pellet type in the feeding window
    let analysis = &advice.analysis;
    assert!(close(analysis.total_feed_kg, 30.0, 1e-9));
    assert!(close(analysis.avg_daily_feed_kg.unwrap(), 1.0, 1e-9));
    assert_eq!(analysis.feed_types.len(), 1);
    assert_eq!(analysis.feed_types[0].feed_type, "floating pellet");
    assert_eq!(analysis.feed_types[0].usage_count, 30);
    assert_eq!(analysis.feed_types[0].avg_protein_percent, Some(32.0));
    // 0.667 then 1.833 g/day
    assert_eq!(analysis.growth_trend, Some(GrowthTrend::Improving));
    assert_eq!(analysis.mortality_events, 0);
    assert!(analysis.avg_deaths_per_event.is_none());

    // Persist and apply
    let dir = tempfile::tempdir().unwrap();
    let storage = AdviceStorage::open(dir.path().join("advice.db")).unwrap();
    let stored = storage.store(advice).unwrap();
    let id = stored.id.unwrap();
    let applied = storage.mark_applied(id, Utc::now()).unwrap();
    assert!(applied.applied);
    assert_eq!(storage.list_for_pond(POND, 10).len(), 1);
}

#[test]
fn projection_from_latest_growth() {
    let store = farm();
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    engine
        .record_sampling(SamplingRecord::new(10, POND, Some(SPECIES), day(30), 30, 0.75))
        .unwrap();
    engine
        .record_sampling(SamplingRecord::new(11, POND, Some(SPECIES), day(60), 10, 0.8))
        .unwrap();

    let projection = engine
        .project_target_biomass(POND, Scope::Species(SPECIES), 200.0, day(60))
        .unwrap();
    assert!(close(projection.gap_kg, 120.0, 1e-9));
    // 120 kg at 1.833 kg/day
    assert!(close(projection.estimated_days, 120.0 / (0.055 / 30.0 * 1000.0), 1e-6));
    assert!(!projection.capped);
    assert_eq!(projection.estimated_date, day(126));
    assert!(close(projection.estimated_feed_kg, 96.0, 1e-9));
}

#[test]
fn snapshot_round_trip_gives_same_advice() {
    let store = farm();
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    engine
        .record_sampling(SamplingRecord::new(10, POND, Some(SPECIES), day(30), 30, 0.75))
        .unwrap();
    let before = engine.generate_advice(POND, Scope::Species(SPECIES), day(45)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.json");
    store.snapshot().unwrap().save_to_file(&path).unwrap();

    let reloaded = InMemoryEventStore::from_snapshot(EventSnapshot::load_from_file(&path).unwrap());
    let engine = FeedingEngine::new(&reloaded, &config);
    let after = engine.generate_advice(POND, Scope::Species(SPECIES), day(45)).unwrap();

    assert_eq!(after.stage_name, before.stage_name);
    assert_eq!(after.estimated_fish_count, before.estimated_fish_count);
    assert!(close(after.recommended_feed_kg, before.recommended_feed_kg, 1e-9));
    assert_eq!(after.breakdown.factors.len(), before.breakdown.factors.len());
    // New ids continue past everything in the snapshot
    assert!(reloaded.next_id() > 160);
}

#[test]
fn batch_skips_nothing_for_a_stocked_pond() {
    let store = farm();
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);

    let batch = engine.generate_all(day(10)).unwrap();
    assert_eq!(batch.advice.len(), 1);
    assert_eq!(batch.advice[0].data_source, DataSource::StockingBased);
    assert_eq!(batch.skipped, 0);

    // Nothing stocked yet
    let early = engine.generate_all(day(0) - Duration::days(1)).unwrap();
    assert!(early.advice.is_empty());
}

#[test]
fn oversized_windows_do_not_panic() {
    let store = farm();
    let mut config = EngineConfig::default();
    // Rejected by validate(), but the engine must still answer
    config.mortality.window_days = 1_000_000_000;
    config.mortality.trend_window_days = u32::MAX;
    config.water_quality.lookback_days = u32::MAX;
    config.feeding_consistency.window_days = u32::MAX;
    config.medical.active_window_days = u32::MAX;
    config.farm.feed_cost_lookback_days = u32::MAX;
    config.projection.max_days = u32::MAX;
    assert!(config.validate().is_err());

    let engine = FeedingEngine::new(&store, &config);
    engine
        .record_sampling(SamplingRecord::new(10, POND, Some(SPECIES), day(30), 30, 0.75))
        .unwrap();
    let advice = engine.generate_advice(POND, Scope::Species(SPECIES), day(40)).unwrap();
    assert_eq!(advice.estimated_fish_count, 1000);
    assert!(advice.recommended_feed_kg.is_finite());

    // A pond that never grew projects to the capped horizon, saturated at the calendar's end
    let flat = InMemoryEventStore::new();
    flat.add_stocking(StockingRecord {
        id: 1,
        pond: POND,
        species: SPECIES,
        date: day(0),
        pcs: 10,
        total_weight_kg: 1.0,
        notes: String::new(),
    })
    .unwrap();
    let engine = FeedingEngine::new(&flat, &config);
    let projection = engine
        .project_target_biomass(POND, Scope::Species(SPECIES), 50.0, day(5))
        .unwrap();
    assert!(projection.capped);
    assert_eq!(projection.estimated_date, NaiveDate::MAX);
}

fn store_sampling(store: &InMemoryEventStore, id: u64) -> SamplingRecord {
    store.sampling(id).unwrap().unwrap()
}
