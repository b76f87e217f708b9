//! Environmental / Risk Analyzer
//!
//! Seven independent factors each yield an adjustment in percentage points of
//! the base feeding rate. They are summed once, clamped to the configured
//! safety bounds, and applied by the composer as a single multiplier.
//!
//! Gathering (store reads) and assessment (pure arithmetic over the gathered
//! records) are split so each factor can be tested without a store. A factor
//! with no input data is reported as `Unavailable` and contributes 0.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use statrs::statistics::Statistics;
use tracing::{debug, info};

use crate::config::{
    AdjustmentConfig, EngineConfig, FeedingConsistencyConfig, GrowthConfig, MedicalConfig,
    MortalityConfig, SeasonConfig, TemperatureConfig, WaterQualityConfig,
};
use super::population::saturating_total;
use crate::store::{EventStore, StoreError};
use crate::types::{
    days_before, AdjustmentBreakdown, AnalysisSummary, DateRange, FactorAdjustment, FactorKind,
    FeedLogRecord, FeedTypeUsage, FeedingConsistency, GrowthQuality, GrowthTrend,
    MedicalDiagnostic, MortalityCause, MortalityRecord, MortalityTrend, PondId, Scope, Season,
    TemperatureTrend, WaterQualitySample, WaterQualityStatus,
};

// ============================================================================
// Inputs
// ============================================================================

/// Everything the factors look at, fetched once per recommendation.
#[derive(Debug, Clone)]
pub struct RiskInputs {
    pub as_of: NaiveDate,
    /// Readings inside the water-quality lookback
    pub water: Vec<WaterQualitySample>,
    /// Mortality covering both the rate window and the two trend halves
    pub mortalities: Vec<MortalityRecord>,
    pub live_count: u64,
    /// Growth rate of the latest sampling that has one
    pub latest_growth_rate: Option<f64>,
    /// Up to `growth.trend_samplings` latest growth rates, oldest first
    pub recent_growth_rates: Vec<f64>,
    pub feed_logs: Vec<FeedLogRecord>,
    /// Diagnostics created inside the active window
    pub diagnostics: Vec<MedicalDiagnostic>,
    pub season: Season,
}

/// Fetch the records every factor needs for `pond`/`scope` as of `as_of`.
pub fn gather_inputs(
    store: &dyn EventStore,
    pond: PondId,
    scope: Scope,
    as_of: NaiveDate,
    live_count: u64,
    config: &EngineConfig,
) -> Result<RiskInputs, StoreError> {
    let water = store.water_quality(
        pond,
        DateRange::trailing_days(as_of, config.water_quality.lookback_days),
    )?;

    let m = &config.mortality;
    let mortality_span = m.window_days.max(m.trend_window_days.saturating_mul(2));
    let mortalities =
        store.mortalities(pond, scope, DateRange::trailing_days(as_of, mortality_span))?;

    let samplings = store.samplings(pond, scope, DateRange::through(as_of))?;
    let latest_growth_rate = samplings.iter().rev().find_map(|s| s.growth_rate_kg_per_day);
    let mut recent_growth_rates: Vec<f64> = samplings
        .iter()
        .rev()
        .filter_map(|s| s.growth_rate_kg_per_day)
        .filter(|r| r.is_finite())
        .take(config.growth.trend_samplings)
        .collect();
    recent_growth_rates.reverse();

    let feed_logs = store.feed_logs(
        pond,
        DateRange::trailing_days(as_of, config.feeding_consistency.window_days),
    )?;
    let diagnostics = store.medical_diagnostics(
        pond,
        DateRange::trailing_days(as_of, config.medical.active_window_days),
    )?;

    debug!(
        pond,
        scope = %scope,
        water = water.len(),
        mortality = mortalities.len(),
        feed_logs = feed_logs.len(),
        diagnostics = diagnostics.len(),
        "Risk inputs gathered"
    );

    Ok(RiskInputs {
        as_of,
        water,
        mortalities,
        live_count,
        latest_growth_rate,
        recent_growth_rates,
        feed_logs,
        diagnostics,
        season: Season::for_date(as_of, config.farm.hemisphere),
    })
}

// ============================================================================
// Assessment
// ============================================================================

/// Clamped adjustment breakdown plus the qualitative read-outs behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub breakdown: AdjustmentBreakdown,
    pub analysis: AnalysisSummary,
}

/// Evaluate every factor over `inputs` and clamp the total.
pub fn assess(inputs: &RiskInputs, config: &EngineConfig) -> RiskAssessment {
    let mut analysis = AnalysisSummary::default();

    let (water, score) = water_quality_factor(&inputs.water, &config.water_quality);
    if let Some(score) = score {
        let status = water_quality_status(score, &config.water_quality);
        analysis.water_quality_score = Some(score);
        analysis.water_quality_status = Some(status);
        if status == WaterQualityStatus::Poor {
            analysis.risk_factors.push(format!("poor water quality (score {score:.0})"));
        }
    }

    let (temperature, temp_c) = temperature_factor(&inputs.water, &config.temperature);
    analysis.water_temp_c = temp_c;
    analysis.temperature_trend = temperature_trend(&inputs.water, &config.temperature);
    if temperature.adjustment_percent < 0.0 {
        analysis.risk_factors.push(temperature.detail.clone());
    }

    let mortality = mortality_factor(
        &inputs.mortalities,
        inputs.live_count,
        inputs.as_of,
        &config.mortality,
    );
    analysis.recent_deaths = mortality.deaths;
    analysis.mortality_events = mortality.events;
    analysis.avg_deaths_per_event =
        (mortality.events > 0).then(|| mortality.deaths as f64 / mortality.events as f64);
    analysis.mortality_causes = mortality.causes.clone();
    analysis.mortality_rate_percent = mortality.rate_percent;
    analysis.mortality_trend = Some(mortality.trend);
    if mortality.exceeds_threshold {
        analysis.risk_factors.push(format!(
            "high mortality ({} deaths in {} days)",
            mortality.deaths, config.mortality.window_days
        ));
    }
    if mortality.disease_related {
        analysis.risk_factors.push("disease-related deaths".to_string());
    }
    if mortality.trend == MortalityTrend::Increasing {
        analysis.risk_factors.push("mortality increasing".to_string());
    }

    let (growth, quality) = growth_factor(inputs.latest_growth_rate, &config.growth);
    analysis.growth_rate_kg_per_day = inputs.latest_growth_rate;
    analysis.growth_quality = quality;
    analysis.growth_trend = growth_trend(&inputs.recent_growth_rates, &config.growth);
    if quality == Some(GrowthQuality::Poor) {
        analysis.risk_factors.push("slow growth".to_string());
    }

    let season = season_factor(inputs.season, &config.season);

    let feeding = feeding_summary(&inputs.feed_logs, inputs.as_of, config.feeding_consistency.window_days);
    analysis.total_feed_kg = feeding.total_kg;
    analysis.avg_daily_feed_kg = feeding.avg_daily_kg;
    analysis.feed_types = feeding.feed_types;

    let (consistency, cv) =
        feeding_consistency_factor(&inputs.feed_logs, inputs.as_of, &config.feeding_consistency);
    if let Some(cv) = cv {
        let label = feeding_consistency_label(cv, &config.feeding_consistency);
        analysis.feeding_cv = Some(cv);
        analysis.feeding_consistency = Some(label);
        if label == FeedingConsistency::Inconsistent {
            analysis.risk_factors.push(format!("inconsistent feeding (CV {:.0}%)", cv * 100.0));
        }
    }

    let (medical, top) = medical_factor(&inputs.diagnostics, inputs.as_of, &config.medical);
    if let Some(ref diagnosis) = top {
        analysis.risk_factors.push(format!("active diagnosis: {diagnosis}"));
    }
    analysis.top_diagnosis = top;
    analysis.medical_warnings = active_diagnoses(&inputs.diagnostics, inputs.as_of, &config.medical)
        .into_iter()
        .map(describe_diagnosis)
        .collect();

    let breakdown = clamp_total(
        vec![
            water,
            temperature,
            mortality.adjustment,
            growth,
            season,
            consistency,
            medical,
        ],
        &config.adjustments,
    );

    RiskAssessment {
        breakdown,
        analysis,
    }
}

/// Sum factor adjustments and clamp the total to the configured bounds.
pub fn clamp_total(factors: Vec<FactorAdjustment>, bounds: &AdjustmentConfig) -> AdjustmentBreakdown {
    let raw: f64 = factors.iter().map(|f| f.adjustment_percent).sum();
    // max/min rather than clamp: never panics on a misordered config
    let total = raw.max(bounds.min_total_percent).min(bounds.max_total_percent);
    let clamped = (total - raw).abs() > f64::EPSILON;
    if clamped {
        info!(raw, total, "Total adjustment clamped");
    }
    AdjustmentBreakdown {
        factors,
        raw_total_percent: raw,
        total_percent: total,
        clamped,
    }
}

// ============================================================================
// Water Quality
// ============================================================================

/// 1.0 inside the optimal band, 0.5 inside the acceptable band, 0 outside.
fn band_score(value: f64, acceptable: (f64, f64), optimal: (f64, f64)) -> f64 {
    if value >= optimal.0 && value <= optimal.1 {
        1.0
    } else if value >= acceptable.0 && value <= acceptable.1 {
        0.5
    } else {
        0.0
    }
}

fn ceiling_score(value: f64, optimal_max: f64, acceptable_max: f64) -> f64 {
    if value < optimal_max {
        1.0
    } else if value <= acceptable_max {
        0.5
    } else {
        0.0
    }
}

fn mean_of(samples: &[WaterQualitySample], field: fn(&WaterQualitySample) -> Option<f64>) -> Option<f64> {
    let values: Vec<f64> = samples.iter().filter_map(field).filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Composite 0-100 score over the parameters present in `samples`.
pub fn water_quality_score(samples: &[WaterQualitySample], cfg: &WaterQualityConfig) -> Option<f64> {
    let mut components = Vec::with_capacity(5);

    if let Some(t) = mean_of(samples, |s| s.temperature_c) {
        components.push(band_score(
            t,
            (cfg.temp_acceptable_min_c, cfg.temp_acceptable_max_c),
            (cfg.temp_optimal_min_c, cfg.temp_optimal_max_c),
        ));
    }
    if let Some(ph) = mean_of(samples, |s| s.ph) {
        components.push(band_score(
            ph,
            (cfg.ph_acceptable_min, cfg.ph_acceptable_max),
            (cfg.ph_optimal_min, cfg.ph_optimal_max),
        ));
    }
    if let Some(o2) = mean_of(samples, |s| s.dissolved_oxygen) {
        components.push(if o2 >= cfg.do_optimal_min {
            1.0
        } else if o2 >= cfg.do_acceptable_min {
            0.5
        } else {
            0.0
        });
    }
    if let Some(nh3) = mean_of(samples, |s| s.ammonia) {
        components.push(ceiling_score(nh3, cfg.ammonia_optimal_max, cfg.ammonia_acceptable_max));
    }
    if let Some(no2) = mean_of(samples, |s| s.nitrite) {
        components.push(ceiling_score(no2, cfg.nitrite_optimal_max, cfg.nitrite_acceptable_max));
    }

    if components.is_empty() {
        return None;
    }
    Some(components.iter().sum::<f64>() / components.len() as f64 * 100.0)
}

pub fn water_quality_status(score: f64, cfg: &WaterQualityConfig) -> WaterQualityStatus {
    if score >= cfg.excellent_score_at {
        WaterQualityStatus::Excellent
    } else if score >= cfg.good_score_at {
        WaterQualityStatus::Good
    } else if score >= cfg.poor_score_below {
        WaterQualityStatus::Fair
    } else {
        WaterQualityStatus::Poor
    }
}

pub fn water_quality_factor(
    samples: &[WaterQualitySample],
    cfg: &WaterQualityConfig,
) -> (FactorAdjustment, Option<f64>) {
    let Some(score) = water_quality_score(samples, cfg) else {
        return (
            FactorAdjustment::unavailable(FactorKind::WaterQuality, "no water-quality readings"),
            None,
        );
    };
    let adjustment = if score < cfg.poor_score_below {
        cfg.poor_adjustment_percent
    } else if score >= cfg.excellent_score_at {
        cfg.excellent_adjustment_percent
    } else {
        0.0
    };
    (
        FactorAdjustment::applied(
            FactorKind::WaterQuality,
            adjustment,
            format!("water-quality score {score:.0}/100"),
        ),
        Some(score),
    )
}

// ============================================================================
// Temperature
// ============================================================================

/// Adjustment for the most recent temperature reading.
pub fn temperature_factor(
    samples: &[WaterQualitySample],
    cfg: &TemperatureConfig,
) -> (FactorAdjustment, Option<f64>) {
    let latest = samples
        .iter()
        .rev()
        .find_map(|s| s.temperature_c.filter(|t| t.is_finite()));
    let Some(t) = latest else {
        return (
            FactorAdjustment::unavailable(FactorKind::Temperature, "no temperature reading"),
            None,
        );
    };

    let (adjustment, label) = if t < cfg.severe_cold_below_c {
        (cfg.severe_cold_adjustment_percent, "very cold water")
    } else if t < cfg.cold_below_c {
        (cfg.cold_adjustment_percent, "cold water")
    } else if t < cfg.cool_below_c {
        (cfg.cool_adjustment_percent, "cool water")
    } else if t > cfg.hot_above_c {
        (cfg.hot_adjustment_percent, "very hot water")
    } else if t > cfg.warm_above_c {
        (cfg.warm_adjustment_percent, "warm water")
    } else {
        (0.0, "optimal temperature")
    };

    (
        FactorAdjustment::applied(FactorKind::Temperature, adjustment, format!("{label} ({t:.1} C)")),
        Some(t),
    )
}

/// Mean temperature of the later half of the readings against the earlier
/// half. `None` with fewer than two temperature readings.
pub fn temperature_trend(samples: &[WaterQualitySample], cfg: &TemperatureConfig) -> Option<TemperatureTrend> {
    let temps: Vec<f64> = samples
        .iter()
        .filter_map(|s| s.temperature_c)
        .filter(|t| t.is_finite())
        .collect();
    if temps.len() < 2 {
        return None;
    }
    let (earlier, recent) = temps.split_at(temps.len() / 2);
    let change = recent.iter().mean() - earlier.iter().mean();
    Some(if change > cfg.trend_tolerance_c {
        TemperatureTrend::Warming
    } else if change < -cfg.trend_tolerance_c {
        TemperatureTrend::Cooling
    } else {
        TemperatureTrend::Stable
    })
}

// ============================================================================
// Mortality
// ============================================================================

/// Mortality factor result with the figures behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct MortalityReading {
    pub adjustment: FactorAdjustment,
    pub deaths: u64,
    /// Records with at least one death inside the window
    pub events: usize,
    pub causes: Vec<MortalityCause>,
    /// `None` when there are no live fish to divide by
    pub rate_percent: Option<f64>,
    pub exceeds_threshold: bool,
    pub disease_related: bool,
    pub trend: MortalityTrend,
}

fn deaths_in(records: &[MortalityRecord], range: DateRange) -> u64 {
    saturating_total(
        records
            .iter()
            .filter(|m| range.contains(m.date))
            .map(|m| m.count),
    )
}

/// Deaths per cause inside `window`, heaviest first. A blank cause is
/// reported as "unspecified".
fn cause_breakdown(records: &[MortalityRecord], window: DateRange) -> Vec<MortalityCause> {
    let mut by_cause: BTreeMap<String, MortalityCause> = BTreeMap::new();
    for m in records.iter().filter(|m| window.contains(m.date) && m.count > 0) {
        let cause = match m.cause.trim() {
            "" => "unspecified".to_string(),
            c => c.to_string(),
        };
        let entry = by_cause.entry(cause.clone()).or_insert(MortalityCause {
            cause,
            total_deaths: 0,
            event_count: 0,
        });
        entry.total_deaths = entry.total_deaths.saturating_add(m.count);
        entry.event_count += 1;
    }
    let mut causes: Vec<MortalityCause> = by_cause.into_values().collect();
    causes.sort_by(|a, b| b.total_deaths.cmp(&a.total_deaths));
    causes
}

pub fn mortality_factor(
    records: &[MortalityRecord],
    live_count: u64,
    as_of: NaiveDate,
    cfg: &MortalityConfig,
) -> MortalityReading {
    let window = DateRange::trailing_days(as_of, cfg.window_days);
    let deaths = deaths_in(records, window);
    let causes = cause_breakdown(records, window);
    let events = causes.iter().map(|c| c.event_count).sum();

    let rate_percent = (live_count > 0).then(|| deaths as f64 / live_count as f64 * 100.0);
    let exceeds_threshold = match rate_percent {
        Some(rate) => rate > cfg.rate_threshold_percent,
        None => deaths > 0,
    };

    let keywords: Vec<String> = cfg.disease_keywords.iter().map(|k| k.to_lowercase()).collect();
    let disease_related = records
        .iter()
        .filter(|m| window.contains(m.date) && m.count > 0)
        .any(|m| {
            let cause = m.cause.to_lowercase();
            keywords.iter().any(|k| !k.is_empty() && cause.contains(k.as_str()))
        });

    let recent = deaths_in(records, DateRange::trailing_days(as_of, cfg.trend_window_days));
    let earlier_end = days_before(as_of, i64::from(cfg.trend_window_days.max(1)));
    let earlier = deaths_in(records, DateRange::trailing_days(earlier_end, cfg.trend_window_days));
    let trend = match recent.cmp(&earlier) {
        std::cmp::Ordering::Greater => MortalityTrend::Increasing,
        std::cmp::Ordering::Less => MortalityTrend::Decreasing,
        std::cmp::Ordering::Equal => MortalityTrend::Stable,
    };

    let mut adjustment = 0.0;
    let mut reasons = Vec::new();
    if exceeds_threshold {
        adjustment += cfg.high_mortality_adjustment_percent;
        reasons.push(match rate_percent {
            Some(rate) => format!("{rate:.1}% died in {} days", cfg.window_days),
            None => format!("{deaths} deaths with no live fish on record"),
        });
    }
    if disease_related {
        adjustment += cfg.disease_adjustment_percent;
        reasons.push("disease-related cause logged".to_string());
    }
    let detail = if reasons.is_empty() {
        format!("{deaths} deaths in {} days", cfg.window_days)
    } else {
        reasons.join(", ")
    };

    MortalityReading {
        adjustment: FactorAdjustment::applied(FactorKind::Mortality, adjustment, detail),
        deaths,
        events,
        causes,
        rate_percent,
        exceeds_threshold,
        disease_related,
        trend,
    }
}

// ============================================================================
// Growth / Season
// ============================================================================

pub fn growth_factor(
    latest_rate: Option<f64>,
    cfg: &GrowthConfig,
) -> (FactorAdjustment, Option<GrowthQuality>) {
    let Some(rate) = latest_rate.filter(|r| r.is_finite()) else {
        return (
            FactorAdjustment::unavailable(FactorKind::Growth, "no derived growth rate yet"),
            None,
        );
    };
    let (adjustment, quality) = if rate > cfg.excellent_rate_kg_per_day {
        (cfg.excellent_adjustment_percent, GrowthQuality::Excellent)
    } else if rate < cfg.poor_rate_kg_per_day {
        (cfg.poor_adjustment_percent, GrowthQuality::Poor)
    } else {
        (0.0, GrowthQuality::Normal)
    };
    (
        FactorAdjustment::applied(
            FactorKind::Growth,
            adjustment,
            format!("{:.2} g/fish/day", rate * 1000.0),
        ),
        Some(quality),
    )
}

/// Newest growth rate against the mean of the earlier ones in `rates`
/// (oldest first). `None` with fewer than two rates.
pub fn growth_trend(rates: &[f64], cfg: &GrowthConfig) -> Option<GrowthTrend> {
    let (latest, earlier) = rates.split_last()?;
    if earlier.is_empty() {
        return None;
    }
    let baseline = earlier.iter().mean();
    let tolerance = baseline.abs() * cfg.trend_tolerance_percent / 100.0;
    Some(if *latest > baseline + tolerance {
        GrowthTrend::Improving
    } else if *latest < baseline - tolerance {
        GrowthTrend::Declining
    } else {
        GrowthTrend::Stable
    })
}

pub fn season_factor(season: Season, cfg: &SeasonConfig) -> FactorAdjustment {
    let adjustment = match season {
        Season::Winter => cfg.winter_adjustment_percent,
        Season::Summer => cfg.summer_adjustment_percent,
        Season::Spring => cfg.spring_adjustment_percent,
        Season::Autumn => cfg.autumn_adjustment_percent,
    };
    FactorAdjustment::applied(FactorKind::Season, adjustment, season.to_string())
}

// ============================================================================
// Feeding Consistency
// ============================================================================

/// Feed totals over the trailing window.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedingSummary {
    pub total_kg: f64,
    /// `None` when nothing was logged
    pub avg_daily_kg: Option<f64>,
    pub feed_types: Vec<FeedTypeUsage>,
}

/// Total and per-type feed over the `window_days` days ending at `as_of`.
/// Logs without a feed type are grouped as "unspecified".
pub fn feeding_summary(logs: &[FeedLogRecord], as_of: NaiveDate, window_days: u32) -> FeedingSummary {
    let window = DateRange::trailing_days(as_of, window_days);
    let in_window: Vec<&FeedLogRecord> = logs
        .iter()
        .filter(|l| window.contains(l.date) && l.feed_kg.is_finite())
        .collect();

    let mut by_type: BTreeMap<String, (f64, usize, Vec<f64>)> = BTreeMap::new();
    for log in &in_window {
        let name = log
            .feed_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or("unspecified");
        let entry = by_type.entry(name.to_string()).or_default();
        entry.0 += log.feed_kg;
        entry.1 += 1;
        if let Some(p) = log.protein_percent.filter(|p| p.is_finite()) {
            entry.2.push(p);
        }
    }
    let mut feed_types: Vec<FeedTypeUsage> = by_type
        .into_iter()
        .map(|(feed_type, (total_kg, usage_count, proteins))| FeedTypeUsage {
            feed_type,
            total_kg,
            usage_count,
            avg_protein_percent: (!proteins.is_empty()).then(|| proteins.iter().mean()),
        })
        .collect();
    feed_types.sort_by(|a, b| b.total_kg.total_cmp(&a.total_kg));

    let total_kg: f64 = in_window.iter().map(|l| l.feed_kg).sum();
    FeedingSummary {
        total_kg,
        avg_daily_kg: (!in_window.is_empty()).then(|| total_kg / f64::from(window_days.max(1))),
        feed_types,
    }
}

/// Coefficient of variation of daily feed totals inside the window.
///
/// Every calendar day from the first to the last logged day counts, with
/// unlogged days as 0 kg. `None` with fewer than `min_days` logged days or a
/// non-positive mean.
pub fn feeding_cv(logs: &[FeedLogRecord], as_of: NaiveDate, cfg: &FeedingConsistencyConfig) -> Option<f64> {
    let window = DateRange::trailing_days(as_of, cfg.window_days);
    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for log in logs.iter().filter(|l| window.contains(l.date) && l.feed_kg.is_finite()) {
        *daily.entry(log.date).or_insert(0.0) += log.feed_kg;
    }
    if daily.len() < cfg.min_days.max(2) {
        return None;
    }

    let (&first, &last) = (daily.keys().next()?, daily.keys().next_back()?);
    let totals: Vec<f64> = first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|d| daily.get(&d).copied().unwrap_or(0.0))
        .collect();
    let mean = totals.iter().mean();
    if mean <= 0.0 {
        return None;
    }
    Some(totals.iter().std_dev() / mean)
}

pub fn feeding_consistency_label(cv: f64, cfg: &FeedingConsistencyConfig) -> FeedingConsistency {
    if cv < cfg.consistent_cv_below {
        FeedingConsistency::Consistent
    } else if cv > cfg.inconsistent_cv_above {
        FeedingConsistency::Inconsistent
    } else {
        FeedingConsistency::Moderate
    }
}

pub fn feeding_consistency_factor(
    logs: &[FeedLogRecord],
    as_of: NaiveDate,
    cfg: &FeedingConsistencyConfig,
) -> (FactorAdjustment, Option<f64>) {
    let Some(cv) = feeding_cv(logs, as_of, cfg) else {
        return (
            FactorAdjustment::unavailable(
                FactorKind::FeedingConsistency,
                "not enough feeding days logged",
            ),
            None,
        );
    };
    let adjustment = if cv > cfg.inconsistent_cv_above {
        cfg.inconsistent_adjustment_percent
    } else {
        0.0
    };
    (
        FactorAdjustment::applied(
            FactorKind::FeedingConsistency,
            adjustment,
            format!("daily feed CV {:.0}%", cv * 100.0),
        ),
        Some(cv),
    )
}

// ============================================================================
// Medical
// ============================================================================

/// Untreated diagnoses created inside the active window, most confident first.
pub fn active_diagnoses<'a>(
    diagnostics: &'a [MedicalDiagnostic],
    as_of: NaiveDate,
    cfg: &MedicalConfig,
) -> Vec<&'a MedicalDiagnostic> {
    let window = DateRange::trailing_days(as_of, cfg.active_window_days);
    let mut active: Vec<&MedicalDiagnostic> = diagnostics
        .iter()
        .filter(|d| !d.applied && window.contains(d.created_on()))
        .collect();
    active.sort_by(|a, b| b.confidence_percent.total_cmp(&a.confidence_percent));
    active
}

fn describe_diagnosis(d: &MedicalDiagnostic) -> String {
    format!("{} ({:.0}% confidence)", d.disease, d.confidence_percent)
}

/// Adjustment for the most confident active diagnosis. Returns the diagnosis
/// description alongside.
pub fn medical_factor(
    diagnostics: &[MedicalDiagnostic],
    as_of: NaiveDate,
    cfg: &MedicalConfig,
) -> (FactorAdjustment, Option<String>) {
    let Some(top) = active_diagnoses(diagnostics, as_of, cfg).into_iter().next() else {
        return (
            FactorAdjustment::unavailable(FactorKind::Medical, "no active diagnostics"),
            None,
        );
    };

    let confidence = top.confidence_percent;
    let adjustment = if confidence >= cfg.high_confidence_percent {
        cfg.high_adjustment_percent
    } else if confidence >= cfg.moderate_confidence_percent {
        cfg.moderate_adjustment_percent
    } else {
        cfg.low_adjustment_percent
    };
    let description = describe_diagnosis(top);
    (
        FactorAdjustment::applied(FactorKind::Medical, adjustment, description.clone()),
        Some(description),
    )
}
