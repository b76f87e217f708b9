//! Demo Farm Generator
//!
//! Writes a realistic multi-pond event snapshot for trying out `pondfeed`.
//! Each pond follows a scenario so every adjustment factor shows up somewhere:
//! - Healthy growth
//! - Cold water stress
//! - Disease outbreak (rising mortality plus a diagnostic)
//! - Erratic feeding
//!
//! Growth fields on the generated samplings are derived by the engine itself
//! before the snapshot is written.
//!
//! # Usage
//! ```bash
//! demo-data --ponds 4 --days 120 --seed 7 --out ./data/events.json
//! pondfeed advise-all
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use tracing::info;

use pondfeed::config::defaults;
use pondfeed::types::{
    days_after, days_before, FeedLogRecord, MedicalDiagnostic, MortalityRecord, SamplingRecord,
    StockingRecord, WaterQualitySample,
};
use pondfeed::{EngineConfig, EventSnapshot, FeedingEngine, InMemoryEventStore, PondId};

// ============================================================================
// Farm Constants
// ============================================================================

/// Fish weighed per sampling
const SAMPLE_SIZE: u32 = 30;
/// Feed price per kg
const FEED_PRICE_PER_KG: f64 = 1.25;
/// Daily ration as a share of biomass
const FEEDING_RATE: f64 = 0.03;

const MORTALITY_CAUSES: [&str; 4] = ["handling stress", "low oxygen", "predation", "unknown"];

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "demo-data")]
#[command(about = "Synthetic fish-farm event snapshot for pondfeed")]
#[command(version)]
struct Args {
    /// Number of ponds (1-50)
    #[arg(long, default_value_t = defaults::DEMO_PONDS, value_parser = clap::value_parser!(u32).range(1..=50))]
    ponds: u32,

    /// Days of history per pond (14-730)
    #[arg(long, default_value_t = defaults::DEMO_DAYS, value_parser = clap::value_parser!(u32).range(14..=730))]
    days: u32,

    /// Days between samplings
    #[arg(long, default_value_t = defaults::DEMO_SAMPLING_INTERVAL_DAYS)]
    sampling_interval: u32,

    /// Last day of generated history; defaults to today
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Output snapshot path
    #[arg(long, default_value = defaults::DEFAULT_EVENTS_PATH)]
    out: PathBuf,
}

// ============================================================================
// Scenarios
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Scenario {
    Healthy,
    ColdStress,
    DiseaseOutbreak,
    ErraticFeeding,
}

impl Scenario {
    const fn for_pond(pond: PondId) -> Self {
        match pond % 4 {
            1 => Self::Healthy,
            2 => Self::ColdStress,
            3 => Self::DiseaseOutbreak,
            _ => Self::ErraticFeeding,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::ColdStress => "cold stress",
            Self::DiseaseOutbreak => "disease outbreak",
            Self::ErraticFeeding => "erratic feeding",
        }
    }

    const fn mean_temperature_c(self) -> f64 {
        match self {
            Self::ColdStress => 19.0,
            _ => 28.0,
        }
    }
}

// ============================================================================
// Generator
// ============================================================================

struct Generator {
    rng: StdRng,
    next_id: u64,
    snapshot: EventSnapshot,
    noise: Normal<f64>,
}

impl Generator {
    fn new(seed: Option<u64>) -> Result<Self> {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            rng,
            next_id: 1,
            snapshot: EventSnapshot::default(),
            noise: Normal::new(0.0, 1.0).context("standard normal")?,
        })
    }

    fn id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Normal sample with the given mean and standard deviation.
    fn gauss(&mut self, mean: f64, sd: f64) -> f64 {
        mean + sd * self.noise.sample(&mut self.rng)
    }

    fn pond(&mut self, pond: PondId, start: NaiveDate, days: u32, sampling_interval: u32) {
        let scenario = Scenario::for_pond(pond);
        let species = if pond % 3 == 0 { 2 } else { 1 };
        let mut live: u64 = self.rng.gen_range(2_000..6_000);
        let mut weight_g: f64 = self.rng.gen_range(2.0..12.0);

        let id = self.id();
        self.snapshot.stockings.push(StockingRecord {
            id,
            pond,
            species,
            date: start,
            pcs: live,
            total_weight_kg: live as f64 * weight_g / defaults::GRAMS_PER_KG,
            notes: format!("demo stocking ({})", scenario.name()),
        });

        for day in 1..=i64::from(days) {
            let date = days_after(start, day);
            let temp = self.gauss(scenario.mean_temperature_c(), 1.2);

            // Growth slows in cold water
            let temp_factor = if temp < 22.0 { 0.4 } else { 1.0 };
            let daily = self.gauss(0.022, 0.004).max(0.0) * temp_factor;
            weight_g *= 1.0 + daily;

            self.water(pond, date, temp, scenario);
            live = self.mortality(pond, species, date, live, scenario, day, days);
            self.feed(pond, date, live, weight_g, scenario);

            if day % i64::from(sampling_interval.max(1)) == 0 {
                let measured = (weight_g * self.gauss(1.0, 0.05)).max(0.1);
                let id = self.id();
                self.snapshot.samplings.push(SamplingRecord::new(
                    id,
                    pond,
                    Some(species),
                    date,
                    SAMPLE_SIZE,
                    measured * f64::from(SAMPLE_SIZE) / defaults::GRAMS_PER_KG,
                ));
            }
        }

        if scenario == Scenario::DiseaseOutbreak {
            let diagnosed = days_after(start, i64::from(days) - 3);
            let id = self.id();
            self.snapshot.diagnostics.push(MedicalDiagnostic {
                id,
                pond,
                disease: "Columnaris (bacterial)".to_string(),
                confidence_percent: 82.0,
                applied: false,
                created_at: Utc.from_utc_datetime(&diagnosed.and_time(NaiveTime::default())),
            });
        }
    }

    fn water(&mut self, pond: PondId, date: NaiveDate, temp: f64, scenario: Scenario) {
        let ammonia = if scenario == Scenario::DiseaseOutbreak { 0.8 } else { 0.2 };
        let sample = WaterQualitySample {
            pond,
            date,
            temperature_c: Some(temp),
            ph: Some(self.gauss(7.3, 0.3)),
            dissolved_oxygen: Some(self.gauss(6.0, 0.8).max(0.5)),
            ammonia: Some(self.gauss(ammonia, 0.1).max(0.0)),
            nitrite: Some(self.gauss(0.05, 0.02).max(0.0)),
            turbidity: Some(self.gauss(30.0, 5.0).max(0.0)),
        };
        self.snapshot.water_quality.push(sample);
    }

    #[allow(clippy::too_many_arguments)]
    fn mortality(
        &mut self,
        pond: PondId,
        species: u32,
        date: NaiveDate,
        live: u64,
        scenario: Scenario,
        day: i64,
        days: u32,
    ) -> u64 {
        let outbreak = scenario == Scenario::DiseaseOutbreak && day > i64::from(days) * 3 / 4;
        let chance = if outbreak { 0.8 } else { 0.12 };
        if live == 0 || !self.rng.gen_bool(chance) {
            return live;
        }

        let max = if outbreak { live / 50 + 2 } else { live / 400 + 2 };
        let count = self.rng.gen_range(1..max).min(live);
        let cause = if outbreak {
            "bacterial infection".to_string()
        } else {
            (*MORTALITY_CAUSES.choose(&mut self.rng).unwrap_or(&"unknown")).to_string()
        };
        let id = self.id();
        self.snapshot.mortalities.push(MortalityRecord {
            id,
            pond,
            species: Some(species),
            date,
            count,
            avg_weight_kg: None,
            cause,
        });
        live - count
    }

    fn feed(&mut self, pond: PondId, date: NaiveDate, live: u64, weight_g: f64, scenario: Scenario) {
        let biomass_kg = live as f64 * weight_g / defaults::GRAMS_PER_KG;
        let spread = if scenario == Scenario::ErraticFeeding { 0.6 } else { 0.08 };
        let feed_kg = (biomass_kg * FEEDING_RATE * self.gauss(1.0, spread)).max(0.0);
        if feed_kg <= 0.0 {
            return;
        }
        let id = self.id();
        self.snapshot.feed_logs.push(FeedLogRecord {
            id,
            pond,
            date,
            feed_kg,
            feed_type: Some("floating pellet".to_string()),
            protein_percent: Some(30.0),
            cost: Some(feed_kg * FEED_PRICE_PER_KG),
        });
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let end = args.end.unwrap_or_else(|| Utc::now().date_naive());
    let start = days_before(end, i64::from(args.days));

    let mut generator = Generator::new(args.seed)?;
    for pond in 1..=args.ponds {
        generator.pond(pond, start, args.days, args.sampling_interval);
        info!(pond, scenario = Scenario::for_pond(pond).name(), "Pond generated");
    }

    // Mortality weights and growth fields come from the engine
    let store = InMemoryEventStore::from_snapshot(generator.snapshot);
    let config = EngineConfig::default();
    let engine = FeedingEngine::new(&store, &config);
    let mut snapshot = store.snapshot()?;
    snapshot.mortalities = snapshot
        .mortalities
        .into_iter()
        .map(|m| engine.complete_mortality(m))
        .collect::<Result<_, _>>()?;
    let store = InMemoryEventStore::from_snapshot(snapshot);
    let engine = FeedingEngine::new(&store, &config);
    let recomputed = engine.recompute_all()?;

    let snapshot = store.snapshot()?;
    snapshot
        .save_to_file(&args.out)
        .with_context(|| format!("Failed to write {}", args.out.display()))?;

    info!(
        path = %args.out.display(),
        ponds = args.ponds,
        records = snapshot.record_count(),
        samplings = recomputed.len(),
        from = %start,
        to = %end,
        "Demo snapshot written"
    );
    Ok(())
}
