//! Growth Cascade Tests
//!
//! Baseline selection, growth derivation and the cascade that keeps every
//! later sampling consistent after an insert, edit or delete. A ledger that
//! rejects its commit checks that a failed cascade leaves nothing behind.

use chrono::NaiveDate;

use pondfeed::engine::{select_baseline, Baseline};
use pondfeed::store::SamplingBatch;
use pondfeed::types::{
    DateRange, FeedLogRecord, HarvestRecord, MedicalDiagnostic, MortalityRecord, PondId, RecordId,
    SamplingRecord, Scope, StockingRecord, WaterQualitySample,
};
use pondfeed::{
    EngineConfig, EngineError, EventStore, FeedingEngine, InMemoryEventStore, SamplingLedger,
    StoreError,
};

fn day(n: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, n).unwrap()
}

fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("growth field should be derived");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

/// 1000 fish of 5 g stocked on day 1.
fn stocked_pond() -> InMemoryEventStore {
    let store = InMemoryEventStore::new();
    store
        .add_stocking(StockingRecord {
            id: 1,
            pond: 1,
            species: 1,
            date: day(1),
            pcs: 1000,
            total_weight_kg: 5.0,
            notes: String::new(),
        })
        .unwrap();
    store
}

/// Ten fish weighed, `grams` each on average.
fn sample(id: RecordId, date: NaiveDate, grams: f64) -> SamplingRecord {
    SamplingRecord::new(id, 1, Some(1), date, 10, grams * 10.0 / 1000.0)
}

/// Samplings at 10 g (day 11), 20 g (day 21) and 30 g (day 31).
fn with_three_samplings(engine: &FeedingEngine<'_, InMemoryEventStore>) {
    engine.record_sampling(sample(10, day(11), 10.0)).unwrap();
    engine.record_sampling(sample(11, day(21), 20.0)).unwrap();
    engine.record_sampling(sample(12, day(31), 30.0)).unwrap();
}

fn rate(store: &InMemoryEventStore, id: RecordId) -> Option<f64> {
    store.sampling(id).unwrap().unwrap().growth_rate_kg_per_day
}

// ============================================================================
// Baseline Selection
// ============================================================================

#[test]
fn first_sampling_measures_against_stocking() {
    let store = stocked_pond();
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    engine.record_sampling(sample(10, day(11), 10.0)).unwrap();

    let record = store.sampling(10).unwrap().unwrap();
    // (10 g - 5 g) over 10 days
    assert_close(record.growth_rate_kg_per_day, 0.0005);
    // 5 g gain across 1000 live fish
    assert_close(record.biomass_difference_kg, 5.0);
}

#[test]
fn baseline_is_nearest_strictly_earlier_sampling() {
    let store = stocked_pond();
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    with_three_samplings(&engine);

    let latest = store.sampling(12).unwrap().unwrap();
    let baseline = select_baseline(&store, &latest).unwrap().unwrap();
    assert!(matches!(
        baseline,
        Baseline::Sampling { id: 11, same_species: true, .. }
    ));
    assert_close(rate(&store, 11), 0.001);
    assert_close(rate(&store, 12), 0.001);
}

#[test]
fn other_species_sampling_is_used_when_none_match() {
    let store = stocked_pond();
    store
        .add_stocking(StockingRecord {
            id: 2,
            pond: 1,
            species: 2,
            date: day(1),
            pcs: 500,
            total_weight_kg: 10.0,
            notes: String::new(),
        })
        .unwrap();
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    engine.record_sampling(sample(10, day(11), 10.0)).unwrap();

    let other = SamplingRecord::new(20, 1, Some(2), day(21), 10, 0.3);
    let baseline = select_baseline(&store, &other).unwrap().unwrap();
    assert!(matches!(
        baseline,
        Baseline::Sampling { id: 10, same_species: false, .. }
    ));
}

#[test]
fn sampling_on_stocking_day_has_no_growth() {
    let store = stocked_pond();
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    engine.record_sampling(sample(10, day(1), 6.0)).unwrap();

    let record = store.sampling(10).unwrap().unwrap();
    assert!(record.growth_rate_kg_per_day.is_none());
    assert!(record.biomass_difference_kg.is_none());
}

#[test]
fn sampling_without_any_baseline_has_no_growth() {
    let store = InMemoryEventStore::new();
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    engine.record_sampling(sample(10, day(5), 6.0)).unwrap();
    assert!(rate(&store, 10).is_none());
}

// ============================================================================
// Cascade
// ============================================================================

#[test]
fn insert_recomputes_later_samplings() {
    let store = stocked_pond();
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    with_three_samplings(&engine);

    let updated = engine.record_sampling(sample(13, day(16), 16.0)).unwrap();
    let ids: Vec<RecordId> = updated.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![13, 11, 12]);

    // 10 g -> 16 g over 5 days, then 16 g -> 20 g over 5 days
    assert_close(rate(&store, 13), 0.0012);
    assert_close(rate(&store, 11), 0.0008);
    assert_close(rate(&store, 12), 0.001);
    // Earlier records are untouched
    assert_close(rate(&store, 10), 0.0005);
}

#[test]
fn delete_recomputes_later_samplings() {
    let store = stocked_pond();
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    with_three_samplings(&engine);
    engine.record_sampling(sample(13, day(16), 16.0)).unwrap();

    engine.delete_sampling(13).unwrap();
    assert!(store.sampling(13).unwrap().is_none());
    assert_close(rate(&store, 11), 0.001);
}

#[test]
fn moving_a_sampling_earlier_recomputes_from_the_new_date() {
    let store = stocked_pond();
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    with_three_samplings(&engine);

    // The 30 g weighing was really taken on day 6
    engine.record_sampling(sample(12, day(6), 30.0)).unwrap();

    assert_close(rate(&store, 12), 0.005);
    // 30 g -> 10 g: negative growth is kept as measured
    assert_close(rate(&store, 10), -0.004);
    assert_close(rate(&store, 11), 0.001);
}

#[test]
fn recompute_all_fills_imported_samplings() {
    let store = stocked_pond();
    store
        .commit_samplings(SamplingBatch {
            upserts: vec![sample(10, day(11), 10.0), sample(11, day(21), 20.0)],
            deletions: vec![],
        })
        .unwrap();
    assert!(rate(&store, 10).is_none());

    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    let updated = engine.recompute_all().unwrap();
    assert_eq!(updated.len(), 2);
    assert_close(rate(&store, 10), 0.0005);
    assert_close(rate(&store, 11), 0.001);
}

// ============================================================================
// Atomicity
// ============================================================================

/// Delegates reads to an in-memory store and rejects every commit.
struct RejectingLedger {
    inner: InMemoryEventStore,
}

impl EventStore for RejectingLedger {
    fn stockings(&self, pond: PondId, scope: Scope) -> Result<Vec<StockingRecord>, StoreError> {
        self.inner.stockings(pond, scope)
    }

    fn mortalities(
        &self,
        pond: PondId,
        scope: Scope,
        range: DateRange,
    ) -> Result<Vec<MortalityRecord>, StoreError> {
        self.inner.mortalities(pond, scope, range)
    }

    fn harvests(
        &self,
        pond: PondId,
        scope: Scope,
        range: DateRange,
    ) -> Result<Vec<HarvestRecord>, StoreError> {
        self.inner.harvests(pond, scope, range)
    }

    fn samplings(
        &self,
        pond: PondId,
        scope: Scope,
        range: DateRange,
    ) -> Result<Vec<SamplingRecord>, StoreError> {
        self.inner.samplings(pond, scope, range)
    }

    fn sampling(&self, id: RecordId) -> Result<Option<SamplingRecord>, StoreError> {
        self.inner.sampling(id)
    }

    fn feed_logs(&self, pond: PondId, range: DateRange) -> Result<Vec<FeedLogRecord>, StoreError> {
        self.inner.feed_logs(pond, range)
    }

    fn water_quality(
        &self,
        pond: PondId,
        range: DateRange,
    ) -> Result<Vec<WaterQualitySample>, StoreError> {
        self.inner.water_quality(pond, range)
    }

    fn medical_diagnostics(
        &self,
        pond: PondId,
        range: DateRange,
    ) -> Result<Vec<MedicalDiagnostic>, StoreError> {
        self.inner.medical_diagnostics(pond, range)
    }

    fn ponds(&self) -> Result<Vec<PondId>, StoreError> {
        self.inner.ponds()
    }

    fn backend_name(&self) -> &'static str {
        "Rejecting"
    }
}

impl SamplingLedger for RejectingLedger {
    fn commit_samplings(&self, _batch: SamplingBatch) -> Result<(), StoreError> {
        Err(StoreError::Rejected("read-only ledger".to_string()))
    }
}

#[test]
fn rejected_commit_leaves_history_unchanged() {
    let inner = stocked_pond();
    {
        let config = EngineConfig::default();
        let engine = FeedingEngine::new(&inner, &config);
        with_three_samplings(&engine);
    }
    let before = inner.samplings(1, Scope::Mixed, DateRange::ALL).unwrap();

    let ledger = RejectingLedger { inner };
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&ledger, &config);

    let err = engine.record_sampling(sample(13, day(16), 16.0)).unwrap_err();
    assert!(matches!(err, EngineError::CascadeFailed { pond: 1, .. }));
    assert!(matches!(
        engine.delete_sampling(11),
        Err(EngineError::CascadeFailed { .. })
    ));

    let after = ledger.samplings(1, Scope::Mixed, DateRange::ALL).unwrap();
    assert_eq!(before, after);
}

// ============================================================================
// Same-day Records
// ============================================================================

#[test]
fn same_species_baseline_wins_over_same_day_other_species() {
    let store = stocked_pond();
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    engine.record_sampling(sample(10, day(1), 6.0)).unwrap();
    engine
        .record_sampling(SamplingRecord::new(11, 1, Some(2), day(1), 10, 0.2))
        .unwrap();
    engine.record_sampling(sample(12, day(15), 13.0)).unwrap();

    let later = store.sampling(12).unwrap().unwrap();
    let baseline = select_baseline(&store, &later).unwrap().unwrap();
    assert!(matches!(
        baseline,
        Baseline::Sampling { id: 10, same_species: true, .. }
    ));
    // 6 g -> 13 g over 14 days
    assert_close(later.growth_rate_kg_per_day, 0.0005);
}

#[test]
fn two_samplings_on_one_day_have_no_growth_between_them() {
    let store = stocked_pond();
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    engine.record_sampling(sample(10, day(11), 10.0)).unwrap();
    engine.record_sampling(sample(11, day(11), 11.0)).unwrap();

    for id in [10, 11] {
        let record = store.sampling(id).unwrap().unwrap();
        assert!(record.growth_rate_kg_per_day.is_none());
        assert!(record.biomass_difference_kg.is_none());
    }
}

#[test]
fn lighter_sampling_keeps_negative_growth() {
    let store = stocked_pond();
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    engine.record_sampling(sample(10, day(11), 20.0)).unwrap();
    engine.record_sampling(sample(11, day(21), 15.0)).unwrap();

    let record = store.sampling(11).unwrap().unwrap();
    assert_close(record.growth_rate_kg_per_day, -0.0005);
    assert_close(record.biomass_difference_kg, -5.0);
}
