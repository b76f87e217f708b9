//! pondfeed - Growth & Feeding Recommendation CLI
//!
//! Reads pond history from a JSON event snapshot, runs the engine, and keeps
//! generated advice in a Sled database.
//!
//! # Usage
//!
//! ```bash
//! # Generate a demo farm, then advise every stocked pond
//! demo-data --out ./data/events.json
//! pondfeed advise-all
//!
//! # One pond/species, without persisting
//! pondfeed advise --pond 2 --species 1 --dry-run
//!
//! # Plan ahead
//! pondfeed project --pond 2 --species 1 --target 750
//! ```
//!
//! # Environment Variables
//!
//! - `PONDFEED_CONFIG`: Path to engine config TOML (default: ./pondfeed.toml)
//! - `PONDFEED_EVENTS`: Path to the event snapshot (default: ./data/events.json)
//! - `RUST_LOG`: Logging level (default: info)

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use serde::Serialize;
use tracing::{info, warn};

use pondfeed::config::{self, defaults, EngineConfig};
use pondfeed::{
    AdviceStorage, EventSnapshot, FeedingAdvice, FeedingEngine, InMemoryEventStore, PondId,
    RecordId, Scope, SpeciesId,
};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "pondfeed")]
#[command(about = "Fish-farm growth tracking and daily feeding recommendations")]
#[command(version)]
struct CliArgs {
    /// Event snapshot (JSON) to read pond history from
    #[arg(long, env = "PONDFEED_EVENTS", default_value = defaults::DEFAULT_EVENTS_PATH)]
    events: PathBuf,

    /// Override the advice database path from the config
    #[arg(long)]
    db: Option<PathBuf>,

    /// Print results as JSON instead of a text summary
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: SubCommand,
}

/// Pond, optional species and optional cutoff date shared by most commands.
#[derive(clap::Args, Debug, Clone, Copy)]
struct Target {
    #[arg(long)]
    pond: PondId,

    /// Species id; omit to pool every species in the pond
    #[arg(long)]
    species: Option<SpeciesId>,

    /// Evaluate as of this date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,
}

impl Target {
    fn scope(&self) -> Scope {
        Scope::from_option(self.species)
    }

    fn as_of(&self) -> NaiveDate {
        self.date.unwrap_or_else(today)
    }
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Generate today's feeding advice for one pond
    Advise {
        #[command(flatten)]
        target: Target,
        /// Print the advice without storing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Generate advice for every stocked pond/species pair
    AdviseAll {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        dry_run: bool,
    },

    /// Estimate the live fish count
    Population {
        #[command(flatten)]
        target: Target,
    },

    /// Re-derive sampling growth fields and write the snapshot back
    RecomputeGrowth {
        /// Start from this sampling; omit to recompute every pond
        #[arg(long)]
        sampling: Option<RecordId>,
    },

    /// Feed conversion ratio analysis
    Fcr {
        #[command(flatten)]
        target: Target,
    },

    /// Biomass gain/loss analysis per species
    Biomass {
        /// Limit to one pond; omit for every stocked pond
        #[arg(long)]
        pond: Option<PondId>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Days and feed needed to reach a target biomass
    Project {
        #[command(flatten)]
        target: Target,
        /// Target biomass in kg
        #[arg(long = "target")]
        target_kg: f64,
    },

    /// Mark stored advice as applied
    Apply {
        #[arg(long)]
        id: RecordId,
    },

    /// List stored advice, newest first
    History {
        #[arg(long)]
        pond: Option<PondId>,
        #[arg(long, default_value_t = defaults::HISTORY_LIMIT)]
        limit: usize,
    },
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// ============================================================================
// Helpers
// ============================================================================

fn load_store(path: &Path) -> Result<InMemoryEventStore> {
    let snapshot = EventSnapshot::load_from_file(path)
        .with_context(|| format!("Failed to load event snapshot {}", path.display()))?;
    info!(path = %path.display(), records = snapshot.record_count(), "Event snapshot loaded");
    Ok(InMemoryEventStore::from_snapshot(snapshot))
}

fn open_storage(args: &CliArgs) -> Result<AdviceStorage> {
    let path = args
        .db
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config::get().storage.advice_db_path));
    AdviceStorage::open(&path).with_context(|| format!("Failed to open advice database {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_advice(advice: &FeedingAdvice) {
    let id = advice.id.map_or_else(|| "-".to_string(), |id| id.to_string());
    println!(
        "[{id}] Pond {} ({}) on {}: {:.2} kg/day in {} meals ({:.2} kg each)",
        advice.pond,
        advice.scope,
        advice.date,
        advice.recommended_feed_kg,
        advice.feeding_frequency,
        advice.feed_per_session_kg
    );
    println!(
        "      {} fish x {:.1} g = {:.1} kg biomass [{}]",
        advice.estimated_fish_count,
        advice.average_weight_kg * defaults::GRAMS_PER_KG,
        advice.total_biomass_kg,
        advice.data_source
    );
    println!(
        "      Stage {}: {:.2}% of biomass, {:.0}% protein, {} pellets, adjustment {:+.0}%",
        advice.stage_name,
        advice.feeding_rate_percent,
        advice.protein_percent,
        advice.pellet_size,
        advice.breakdown.total_percent
    );
    for session in &advice.schedule {
        println!("        {}  {:>3}%  {:.2} kg", session.time, session.share_percent, session.feed_kg);
    }
    if let Some(cost) = advice.daily_feed_cost {
        println!("      Daily feed cost: {cost:.2}");
    }
    for note in &advice.notes {
        println!("      - {note}");
    }
    let analysis = &advice.analysis;
    if let Some(avg) = analysis.avg_daily_feed_kg {
        let types: Vec<&str> = analysis.feed_types.iter().map(|t| t.feed_type.as_str()).collect();
        println!(
            "      Fed {:.1} kg recently ({avg:.2} kg/day): {}",
            analysis.total_feed_kg,
            types.join(", ")
        );
    }
    for cause in &analysis.mortality_causes {
        println!(
            "      Deaths: {} x{} ({} events)",
            cause.cause, cause.total_deaths, cause.event_count
        );
    }
    for warning in &analysis.medical_warnings {
        println!("      ! {warning}");
    }
    if advice.applied {
        println!("      applied");
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    config::init(EngineConfig::load());
    let cfg = config::get();

    match &args.command {
        SubCommand::Advise { target, dry_run } => {
            let store = load_store(&args.events)?;
            let engine = FeedingEngine::new(&store, cfg);
            let mut advice = engine.generate_advice(target.pond, target.scope(), target.as_of())?;
            if !dry_run {
                advice = open_storage(&args)?.store(advice)?;
            }
            if args.json {
                print_json(&advice)?;
            } else {
                print_advice(&advice);
            }
        }

        SubCommand::AdviseAll { date, dry_run } => {
            let store = load_store(&args.events)?;
            let engine = FeedingEngine::new(&store, cfg);
            let mut batch = engine.generate_all(date.unwrap_or_else(today))?;
            if !dry_run {
                let storage = open_storage(&args)?;
                batch.advice = batch
                    .advice
                    .into_iter()
                    .map(|a| storage.store(a))
                    .collect::<Result<_, _>>()?;
            }
            if args.json {
                print_json(&batch)?;
            } else {
                for advice in &batch.advice {
                    print_advice(advice);
                }
                println!(
                    "{} generated, {} skipped (no data), {} failed",
                    batch.advice.len(),
                    batch.skipped,
                    batch.failures.len()
                );
                for failure in &batch.failures {
                    println!("  {failure}");
                }
            }
        }

        SubCommand::Population { target } => {
            let store = load_store(&args.events)?;
            let engine = FeedingEngine::new(&store, cfg);
            let estimate = engine.compute_population(target.pond, target.scope(), target.as_of())?;
            if args.json {
                print_json(&estimate)?;
            } else {
                let survival = estimate
                    .survival_rate_percent()
                    .map_or_else(|| "n/a".to_string(), |s| format!("{s:.1}%"));
                println!(
                    "Pond {} ({}) on {}: {} live = {} stocked - {} dead - {} harvested (survival {survival})",
                    estimate.pond,
                    estimate.scope,
                    estimate.as_of,
                    estimate.live_count,
                    estimate.stocked,
                    estimate.mortality,
                    estimate.harvested
                );
            }
        }

        SubCommand::RecomputeGrowth { sampling } => {
            let store = load_store(&args.events)?;
            let engine = FeedingEngine::new(&store, cfg);
            let updated = match sampling {
                Some(id) => engine.recompute_growth(*id)?,
                None => engine.recompute_all()?,
            };
            store
                .snapshot()?
                .save_to_file(&args.events)
                .with_context(|| format!("Failed to write {}", args.events.display()))?;
            if args.json {
                print_json(&updated)?;
            } else {
                for s in &updated {
                    let rate = s
                        .growth_rate_kg_per_day
                        .map_or_else(|| "-".to_string(), |r| format!("{:.3} g/day", r * defaults::GRAMS_PER_KG));
                    let diff = s
                        .biomass_difference_kg
                        .map_or_else(|| "-".to_string(), |d| format!("{d:+.2} kg"));
                    println!("  sampling {} pond {} {}: {rate}, biomass {diff}", s.id, s.pond, s.date);
                }
                println!("{} samplings recomputed", updated.len());
            }
        }

        SubCommand::Fcr { target } => {
            let store = load_store(&args.events)?;
            let engine = FeedingEngine::new(&store, cfg);
            let report = engine.fcr_report(target.pond, target.scope(), target.as_of())?;
            if args.json {
                print_json(&report)?;
            } else {
                let e = &report.estimate;
                println!(
                    "Pond {} ({}): FCR {:.2} ({}, {:?}); {:.1} kg feed over {:.1} kg gain",
                    report.pond, report.scope, e.fcr, e.status, e.method, e.feed_kg, e.gain_kg
                );
                for i in &e.intervals {
                    println!("  {} -> {}: {:.2} ({:.1} kg / {:.1} kg)", i.from, i.to, i.fcr, i.feed_kg, i.gain_kg);
                }
            }
        }

        SubCommand::Biomass { pond, date } => {
            let store = load_store(&args.events)?;
            let engine = FeedingEngine::new(&store, cfg);
            let as_of = date.unwrap_or_else(today);
            let ponds = match pond {
                Some(p) => vec![*p],
                None => pondfeed::EventStore::ponds(&store)?,
            };
            let reports = ponds
                .into_iter()
                .map(|p| engine.biomass_report(p, as_of))
                .collect::<Result<Vec<_>, _>>()?;
            if args.json {
                print_json(&reports)?;
            } else {
                for r in &reports {
                    println!(
                        "Pond {}: {:.1} kg standing, +{:.1} / -{:.1} kg (net {:+.1})",
                        r.pond,
                        r.total.current_biomass_kg,
                        r.total.total_gain_kg,
                        r.total.total_loss_kg,
                        r.total.net_change_kg
                    );
                    for s in &r.species {
                        println!(
                            "  {}: {} fish, {:.1} kg, net {:+.1} kg over {} samplings",
                            s.scope, s.live_count, s.current_biomass_kg, s.net_change_kg, s.samplings
                        );
                    }
                }
            }
        }

        SubCommand::Project { target, target_kg } => {
            let store = load_store(&args.events)?;
            let engine = FeedingEngine::new(&store, cfg);
            let result =
                engine.project_target_biomass(target.pond, target.scope(), *target_kg, target.as_of())?;
            if args.json {
                print_json(&result)?;
            } else {
                println!(
                    "Pond {} ({}): {:.1} -> {:.1} kg needs {:.0} days (around {}) and {:.1} kg feed at FCR {:.2}",
                    result.pond,
                    result.scope,
                    result.current_biomass_kg,
                    result.target_kg,
                    result.estimated_days,
                    result.estimated_date,
                    result.estimated_feed_kg,
                    result.fcr
                );
                if result.capped {
                    warn!("No usable growth rate; days capped at {}", cfg.projection.max_days);
                } else if result.beyond_horizon {
                    warn!("Estimate is beyond the {}-day planning horizon", cfg.projection.max_days);
                }
            }
        }

        SubCommand::Apply { id } => {
            let storage = open_storage(&args)?;
            let advice = storage.mark_applied(*id, Utc::now())?;
            if args.json {
                print_json(&advice)?;
            } else {
                print_advice(&advice);
            }
        }

        SubCommand::History { pond, limit } => {
            if *limit == 0 {
                bail!("--limit must be at least 1");
            }
            let storage = open_storage(&args)?;
            let list = match pond {
                Some(p) => storage.list_for_pond(*p, *limit),
                None => storage.list_recent(*limit),
            };
            if args.json {
                print_json(&list)?;
            } else {
                let stats = storage.stats();
                println!(
                    "{} stored ({} applied, {:.2} MB)",
                    stats.advice_count,
                    stats.applied_count,
                    stats.size_mb()
                );
                for advice in &list {
                    print_advice(advice);
                }
            }
        }
    }

    Ok(())
}
