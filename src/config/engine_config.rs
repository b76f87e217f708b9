//! Engine Configuration - every feeding threshold as a farm-tunable TOML value
//!
//! The adjustment table, FCR blend and projection cap are empirical and vary by
//! species and climate, so none of them are hardcoded. Each struct implements
//! `Default` with the reference values, so a missing file or section behaves
//! exactly like the stock engine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::types::Hemisphere;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a farm deployment.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$PONDFEED_CONFIG` env var
/// 2. `./pondfeed.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Farm identification and location
    #[serde(default)]
    pub farm: FarmConfig,

    /// Safety bounds on the summed adjustment
    #[serde(default)]
    pub adjustments: AdjustmentConfig,

    #[serde(default)]
    pub water_quality: WaterQualityConfig,

    #[serde(default)]
    pub temperature: TemperatureConfig,

    #[serde(default)]
    pub mortality: MortalityConfig,

    #[serde(default)]
    pub growth: GrowthConfig,

    #[serde(default)]
    pub season: SeasonConfig,

    #[serde(default)]
    pub feeding_consistency: FeedingConsistencyConfig,

    #[serde(default)]
    pub medical: MedicalConfig,

    /// Feed conversion ratio estimation
    #[serde(default)]
    pub fcr: FcrConfig,

    /// Target-biomass projection
    #[serde(default)]
    pub projection: ProjectionConfig,

    /// Stocking-based weight estimate used before the first sampling
    #[serde(default)]
    pub fallback: FallbackConfig,

    /// Advice database location
    #[serde(default)]
    pub storage: StorageConfig,
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$PONDFEED_CONFIG` environment variable
    /// 2. `./pondfeed.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("PONDFEED_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), farm = %config.farm.name, "Loaded engine config from PONDFEED_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from PONDFEED_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "PONDFEED_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("pondfeed.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(farm = %config.farm.name, "Loaded engine config from ./pondfeed.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./pondfeed.toml, using defaults");
                }
            }
        }

        info!("No pondfeed.toml found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    ///
    /// Unknown keys are logged as warnings (with a suggestion when one is
    /// close); invalid values fail the load.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        for w in &super::validation::validate_unknown_keys(&contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Engine config saved");
        Ok(())
    }

    /// Validate all thresholds for internal consistency.
    ///
    /// Rules:
    /// - Band edges must be ordered (optimal inside acceptable, cold below cool)
    /// - Divisors and window lengths must be positive
    /// - FCR blend weights must sum to approximately 1.0
    /// - No value may be NaN or infinite
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        // Total clamp: must straddle zero
        let a = &self.adjustments;
        if !(a.min_total_percent <= 0.0 && a.max_total_percent >= 0.0) {
            errors.push(format!(
                "adjustments: min_total_percent ({:.1}) must be <= 0 <= max_total_percent ({:.1})",
                a.min_total_percent, a.max_total_percent
            ));
        }
        if a.min_total_percent <= -100.0 {
            errors.push(format!(
                "adjustments.min_total_percent ({:.1}) must be > -100 or feed drops to zero",
                a.min_total_percent
            ));
        }

        // Water quality bands: optimal range sits inside the acceptable range
        let wq = &self.water_quality;
        if wq.lookback_days == 0 {
            errors.push("water_quality.lookback_days must be > 0".to_string());
        }
        Self::check_band(
            wq.temp_acceptable_min_c,
            wq.temp_optimal_min_c,
            wq.temp_optimal_max_c,
            wq.temp_acceptable_max_c,
            "water_quality.temp",
            &mut errors,
        );
        Self::check_band(
            wq.ph_acceptable_min,
            wq.ph_optimal_min,
            wq.ph_optimal_max,
            wq.ph_acceptable_max,
            "water_quality.ph",
            &mut errors,
        );
        Self::check_escalation(
            wq.do_acceptable_min,
            wq.do_optimal_min,
            "water_quality.dissolved_oxygen (acceptable_min, optimal_min)",
            &mut errors,
        );
        Self::check_escalation(
            wq.ammonia_optimal_max,
            wq.ammonia_acceptable_max,
            "water_quality.ammonia",
            &mut errors,
        );
        Self::check_escalation(
            wq.nitrite_optimal_max,
            wq.nitrite_acceptable_max,
            "water_quality.nitrite",
            &mut errors,
        );
        if !(wq.poor_score_below < wq.good_score_at && wq.good_score_at <= wq.excellent_score_at) {
            errors.push(format!(
                "water_quality: score bands must satisfy poor_score_below ({:.0}) < good_score_at ({:.0}) <= excellent_score_at ({:.0})",
                wq.poor_score_below, wq.good_score_at, wq.excellent_score_at
            ));
        }

        // Temperature: colder thresholds below warmer ones
        let t = &self.temperature;
        if !(t.severe_cold_below_c < t.cold_below_c && t.cold_below_c <= t.cool_below_c) {
            errors.push(format!(
                "temperature: severe_cold_below_c ({:.1}) < cold_below_c ({:.1}) <= cool_below_c ({:.1}) required",
                t.severe_cold_below_c, t.cold_below_c, t.cool_below_c
            ));
        }
        Self::check_escalation(t.warm_above_c, t.hot_above_c, "temperature.warm/hot", &mut errors);
        if t.cool_below_c > t.warm_above_c {
            errors.push(format!(
                "temperature.cool_below_c ({:.1}) must be <= warm_above_c ({:.1})",
                t.cool_below_c, t.warm_above_c
            ));
        }

        let m = &self.mortality;
        if m.window_days == 0 {
            errors.push("mortality.window_days must be > 0".to_string());
        }
        if m.trend_window_days == 0 {
            errors.push("mortality.trend_window_days must be > 0".to_string());
        }
        if m.rate_threshold_percent <= 0.0 {
            errors.push("mortality.rate_threshold_percent must be > 0".to_string());
        }

        let g = &self.growth;
        if g.poor_rate_kg_per_day >= g.excellent_rate_kg_per_day {
            errors.push(format!(
                "growth.poor_rate_kg_per_day ({}) must be < excellent_rate_kg_per_day ({})",
                g.poor_rate_kg_per_day, g.excellent_rate_kg_per_day
            ));
        }
        if g.trend_samplings < 2 {
            errors.push("growth.trend_samplings must be >= 2".to_string());
        }
        if g.trend_tolerance_percent < 0.0 {
            errors.push("growth.trend_tolerance_percent cannot be negative".to_string());
        }
        if t.trend_tolerance_c < 0.0 {
            errors.push("temperature.trend_tolerance_c cannot be negative".to_string());
        }

        let fc = &self.feeding_consistency;
        if fc.window_days == 0 {
            errors.push("feeding_consistency.window_days must be > 0".to_string());
        }
        if fc.min_days < 2 {
            errors.push("feeding_consistency.min_days must be >= 2".to_string());
        }
        Self::check_escalation(
            fc.consistent_cv_below,
            fc.inconsistent_cv_above,
            "feeding_consistency.cv",
            &mut errors,
        );

        let med = &self.medical;
        if med.active_window_days == 0 {
            errors.push("medical.active_window_days must be > 0".to_string());
        }
        Self::check_escalation(
            med.moderate_confidence_percent,
            med.high_confidence_percent,
            "medical.confidence",
            &mut errors,
        );

        // FCR: weights sum to ~1.0 (allow 0.95-1.05), default inside the clamp
        let f = &self.fcr;
        let weight_sum = f.recent_weight + f.overall_weight;
        if !(0.95..=1.05).contains(&weight_sum) {
            errors.push(format!(
                "fcr.recent_weight + fcr.overall_weight must sum to ~1.0, got {weight_sum:.2}"
            ));
        }
        if f.recent_intervals == 0 {
            errors.push("fcr.recent_intervals must be > 0".to_string());
        }
        if f.min_fcr <= 0.0 || f.min_fcr >= f.max_fcr {
            errors.push(format!(
                "fcr: 0 < min_fcr ({:.2}) < max_fcr ({:.2}) required",
                f.min_fcr, f.max_fcr
            ));
        } else if !(f.min_fcr..=f.max_fcr).contains(&f.default_fcr) {
            errors.push(format!(
                "fcr.default_fcr ({:.2}) must lie within [{:.2}, {:.2}]",
                f.default_fcr, f.min_fcr, f.max_fcr
            ));
        }
        if !(f.excellent_below < f.good_below && f.good_below < f.needs_improvement_below) {
            errors.push(
                "fcr: status bands must satisfy excellent_below < good_below < needs_improvement_below"
                    .to_string(),
            );
        }

        if self.projection.max_days == 0 {
            errors.push("projection.max_days must be > 0".to_string());
        }

        // Physical range validation
        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        // Reject NaN/Inf in any config value (sweep all f64 fields via serialization)
        if let Ok(value) = toml::Value::try_from(self) {
            for key in super::validation::non_finite_keys(&value, "") {
                errors.push(format!("{key} must be a finite number"));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// `lower` must not exceed `upper`.
    fn check_escalation(lower: f64, upper: f64, name: &str, errors: &mut Vec<String>) {
        // NaN/Inf comparisons silently pass, catch them explicitly
        if !lower.is_finite() || !upper.is_finite() {
            errors.push(format!(
                "{name}: values must be finite (got {lower}, {upper})"
            ));
            return;
        }
        if upper < lower {
            errors.push(format!("{name}: {upper:.3} must be >= {lower:.3}"));
        }
    }

    /// `acceptable_min <= optimal_min < optimal_max <= acceptable_max`
    fn check_band(
        acceptable_min: f64,
        optimal_min: f64,
        optimal_max: f64,
        acceptable_max: f64,
        name: &str,
        errors: &mut Vec<String>,
    ) {
        let ordered = acceptable_min <= optimal_min
            && optimal_min < optimal_max
            && optimal_max <= acceptable_max;
        if !ordered {
            errors.push(format!(
                "{name}: expected acceptable_min ({acceptable_min}) <= optimal_min ({optimal_min}) < optimal_max ({optimal_max}) <= acceptable_max ({acceptable_max})"
            ));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => write!(f, "Config parse error ({}): {}", path.display(), e),
            Self::Serialize(e) => write!(f, "Config serialization error: {e}"),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Farm
// ============================================================================

/// Identification metadata plus the hemisphere used for season lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmConfig {
    #[serde(default = "default_farm_name")]
    pub name: String,

    /// Season boundaries are flipped for southern-hemisphere farms.
    #[serde(default)]
    pub hemisphere: Hemisphere,

    /// Days of feed logs averaged for the feed cost per kg.
    #[serde(default = "default_cost_lookback_days")]
    pub feed_cost_lookback_days: u32,
}

fn default_farm_name() -> String {
    "DEFAULT".to_string()
}
fn default_cost_lookback_days() -> u32 { 30 }

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            name: default_farm_name(),
            hemisphere: Hemisphere::default(),
            feed_cost_lookback_days: default_cost_lookback_days(),
        }
    }
}

// ============================================================================
// Adjustment Clamp
// ============================================================================

/// Bounds on the summed factor adjustment (percentage points).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustmentConfig {
    #[serde(default = "default_min_total")]
    pub min_total_percent: f64,

    #[serde(default = "default_max_total")]
    pub max_total_percent: f64,
}

fn default_min_total() -> f64 { -50.0 }
fn default_max_total() -> f64 { 30.0 }

impl Default for AdjustmentConfig {
    fn default() -> Self {
        Self {
            min_total_percent: default_min_total(),
            max_total_percent: default_max_total(),
        }
    }
}

// ============================================================================
// Water Quality
// ============================================================================

/// Composite water-quality score. Each parameter scores 1.0 inside its optimal
/// band, 0.5 inside its acceptable band and 0 outside; the score is the mean
/// of available parameters scaled to 0-100.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaterQualityConfig {
    /// Days of readings averaged into the score.
    #[serde(default = "default_wq_lookback")]
    pub lookback_days: u32,

    #[serde(default = "default_temp_optimal_min")]
    pub temp_optimal_min_c: f64,
    #[serde(default = "default_temp_optimal_max")]
    pub temp_optimal_max_c: f64,
    #[serde(default = "default_temp_acceptable_min")]
    pub temp_acceptable_min_c: f64,
    #[serde(default = "default_temp_acceptable_max")]
    pub temp_acceptable_max_c: f64,

    #[serde(default = "default_ph_optimal_min")]
    pub ph_optimal_min: f64,
    #[serde(default = "default_ph_optimal_max")]
    pub ph_optimal_max: f64,
    #[serde(default = "default_ph_acceptable_min")]
    pub ph_acceptable_min: f64,
    #[serde(default = "default_ph_acceptable_max")]
    pub ph_acceptable_max: f64,

    /// Dissolved oxygen (mg/L); higher is better.
    #[serde(default = "default_do_optimal_min")]
    pub do_optimal_min: f64,
    #[serde(default = "default_do_acceptable_min")]
    pub do_acceptable_min: f64,

    /// Ammonia (mg/L); lower is better.
    #[serde(default = "default_ammonia_optimal_max")]
    pub ammonia_optimal_max: f64,
    #[serde(default = "default_ammonia_acceptable_max")]
    pub ammonia_acceptable_max: f64,

    /// Nitrite (mg/L); scored only when logged.
    #[serde(default = "default_nitrite_optimal_max")]
    pub nitrite_optimal_max: f64,
    #[serde(default = "default_nitrite_acceptable_max")]
    pub nitrite_acceptable_max: f64,

    #[serde(default = "default_poor_score")]
    pub poor_score_below: f64,
    #[serde(default = "default_good_score")]
    pub good_score_at: f64,
    #[serde(default = "default_excellent_score")]
    pub excellent_score_at: f64,

    #[serde(default = "default_wq_poor_adj")]
    pub poor_adjustment_percent: f64,
    #[serde(default = "default_wq_excellent_adj")]
    pub excellent_adjustment_percent: f64,
}

fn default_wq_lookback() -> u32 { 7 }
fn default_temp_optimal_min() -> f64 { 26.0 }
fn default_temp_optimal_max() -> f64 { 30.0 }
fn default_temp_acceptable_min() -> f64 { 20.0 }
fn default_temp_acceptable_max() -> f64 { 34.0 }
fn default_ph_optimal_min() -> f64 { 6.5 }
fn default_ph_optimal_max() -> f64 { 8.5 }
fn default_ph_acceptable_min() -> f64 { 6.0 }
fn default_ph_acceptable_max() -> f64 { 9.0 }
fn default_do_optimal_min() -> f64 { 5.0 }
fn default_do_acceptable_min() -> f64 { 3.0 }
fn default_ammonia_optimal_max() -> f64 { 0.5 }
fn default_ammonia_acceptable_max() -> f64 { 1.0 }
fn default_nitrite_optimal_max() -> f64 { 0.1 }
fn default_nitrite_acceptable_max() -> f64 { 0.5 }
fn default_poor_score() -> f64 { 40.0 }
fn default_good_score() -> f64 { 60.0 }
fn default_excellent_score() -> f64 { 80.0 }
fn default_wq_poor_adj() -> f64 { -20.0 }
fn default_wq_excellent_adj() -> f64 { 5.0 }

impl Default for WaterQualityConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_wq_lookback(),
            temp_optimal_min_c: default_temp_optimal_min(),
            temp_optimal_max_c: default_temp_optimal_max(),
            temp_acceptable_min_c: default_temp_acceptable_min(),
            temp_acceptable_max_c: default_temp_acceptable_max(),
            ph_optimal_min: default_ph_optimal_min(),
            ph_optimal_max: default_ph_optimal_max(),
            ph_acceptable_min: default_ph_acceptable_min(),
            ph_acceptable_max: default_ph_acceptable_max(),
            do_optimal_min: default_do_optimal_min(),
            do_acceptable_min: default_do_acceptable_min(),
            ammonia_optimal_max: default_ammonia_optimal_max(),
            ammonia_acceptable_max: default_ammonia_acceptable_max(),
            nitrite_optimal_max: default_nitrite_optimal_max(),
            nitrite_acceptable_max: default_nitrite_acceptable_max(),
            poor_score_below: default_poor_score(),
            good_score_at: default_good_score(),
            excellent_score_at: default_excellent_score(),
            poor_adjustment_percent: default_wq_poor_adj(),
            excellent_adjustment_percent: default_wq_excellent_adj(),
        }
    }
}

// ============================================================================
// Temperature
// ============================================================================

/// Temperature adjustment, keyed on the latest water temperature.
///
/// Checked coldest first, then hottest first; the first rule that fires wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureConfig {
    #[serde(default = "default_severe_cold")]
    pub severe_cold_below_c: f64,
    #[serde(default = "default_severe_cold_adj")]
    pub severe_cold_adjustment_percent: f64,

    #[serde(default = "default_cold")]
    pub cold_below_c: f64,
    #[serde(default = "default_cold_adj")]
    pub cold_adjustment_percent: f64,

    #[serde(default = "default_cool")]
    pub cool_below_c: f64,
    #[serde(default = "default_cool_adj")]
    pub cool_adjustment_percent: f64,

    #[serde(default = "default_warm")]
    pub warm_above_c: f64,
    #[serde(default = "default_warm_adj")]
    pub warm_adjustment_percent: f64,

    #[serde(default = "default_hot")]
    pub hot_above_c: f64,
    #[serde(default = "default_hot_adj")]
    pub hot_adjustment_percent: f64,

    /// Recent-half vs earlier-half mean temperature change reported as a trend.
    #[serde(default = "default_temp_trend_tolerance")]
    pub trend_tolerance_c: f64,
}

fn default_severe_cold() -> f64 { 15.0 }
fn default_severe_cold_adj() -> f64 { -50.0 }
fn default_cold() -> f64 { 20.0 }
fn default_cold_adj() -> f64 { -20.0 }
fn default_cool() -> f64 { 26.0 }
fn default_cool_adj() -> f64 { -10.0 }
fn default_warm() -> f64 { 30.0 }
fn default_warm_adj() -> f64 { -20.0 }
fn default_hot() -> f64 { 35.0 }
fn default_hot_adj() -> f64 { -40.0 }
fn default_temp_trend_tolerance() -> f64 { 1.0 }

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            severe_cold_below_c: default_severe_cold(),
            severe_cold_adjustment_percent: default_severe_cold_adj(),
            cold_below_c: default_cold(),
            cold_adjustment_percent: default_cold_adj(),
            cool_below_c: default_cool(),
            cool_adjustment_percent: default_cool_adj(),
            warm_above_c: default_warm(),
            warm_adjustment_percent: default_warm_adj(),
            hot_above_c: default_hot(),
            hot_adjustment_percent: default_hot_adj(),
            trend_tolerance_c: default_temp_trend_tolerance(),
        }
    }
}

// ============================================================================
// Mortality
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MortalityConfig {
    /// Days of mortality counted towards the recent death rate.
    #[serde(default = "default_mortality_window")]
    pub window_days: u32,

    /// Recent deaths above this share of the live population trigger the penalty.
    #[serde(default = "default_mortality_rate_threshold")]
    pub rate_threshold_percent: f64,

    #[serde(default = "default_high_mortality_adj")]
    pub high_mortality_adjustment_percent: f64,

    /// Extra penalty when any recent cause mentions a disease keyword.
    #[serde(default = "default_disease_adj")]
    pub disease_adjustment_percent: f64,

    /// Case-insensitive substrings marking a cause as disease-related.
    #[serde(default = "default_disease_keywords")]
    pub disease_keywords: Vec<String>,

    /// Length of each half when comparing recent vs earlier deaths for the trend.
    #[serde(default = "default_trend_window")]
    pub trend_window_days: u32,
}

fn default_mortality_window() -> u32 { 30 }
fn default_mortality_rate_threshold() -> f64 { 5.0 }
fn default_high_mortality_adj() -> f64 { -20.0 }
fn default_disease_adj() -> f64 { -30.0 }
fn default_disease_keywords() -> Vec<String> {
    ["disease", "infection", "bacterial", "fungal", "parasite", "virus", "viral"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}
fn default_trend_window() -> u32 { 15 }

impl Default for MortalityConfig {
    fn default() -> Self {
        Self {
            window_days: default_mortality_window(),
            rate_threshold_percent: default_mortality_rate_threshold(),
            high_mortality_adjustment_percent: default_high_mortality_adj(),
            disease_adjustment_percent: default_disease_adj(),
            disease_keywords: default_disease_keywords(),
            trend_window_days: default_trend_window(),
        }
    }
}

// ============================================================================
// Growth
// ============================================================================

/// Growth quality, judged on the latest sampling's per-fish growth rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthConfig {
    #[serde(default = "default_growth_excellent")]
    pub excellent_rate_kg_per_day: f64,
    #[serde(default = "default_growth_poor")]
    pub poor_rate_kg_per_day: f64,
    #[serde(default = "default_growth_excellent_adj")]
    pub excellent_adjustment_percent: f64,
    #[serde(default = "default_growth_poor_adj")]
    pub poor_adjustment_percent: f64,

    /// Latest growth rates compared for the trend (newest against the rest).
    #[serde(default = "default_growth_trend_samplings")]
    pub trend_samplings: usize,

    /// Change relative to the earlier mean that counts as a trend.
    #[serde(default = "default_growth_trend_tolerance")]
    pub trend_tolerance_percent: f64,
}

fn default_growth_excellent() -> f64 { 0.02 }
fn default_growth_poor() -> f64 { 0.002 }
fn default_growth_excellent_adj() -> f64 { 10.0 }
fn default_growth_poor_adj() -> f64 { -10.0 }
fn default_growth_trend_samplings() -> usize { 3 }
fn default_growth_trend_tolerance() -> f64 { 10.0 }

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            excellent_rate_kg_per_day: default_growth_excellent(),
            poor_rate_kg_per_day: default_growth_poor(),
            excellent_adjustment_percent: default_growth_excellent_adj(),
            poor_adjustment_percent: default_growth_poor_adj(),
            trend_samplings: default_growth_trend_samplings(),
            trend_tolerance_percent: default_growth_trend_tolerance(),
        }
    }
}

// ============================================================================
// Season
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonConfig {
    #[serde(default = "default_winter_adj")]
    pub winter_adjustment_percent: f64,
    #[serde(default = "default_summer_adj")]
    pub summer_adjustment_percent: f64,
    #[serde(default)]
    pub spring_adjustment_percent: f64,
    #[serde(default)]
    pub autumn_adjustment_percent: f64,
}

fn default_winter_adj() -> f64 { -40.0 }
fn default_summer_adj() -> f64 { 10.0 }

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            winter_adjustment_percent: default_winter_adj(),
            summer_adjustment_percent: default_summer_adj(),
            spring_adjustment_percent: 0.0,
            autumn_adjustment_percent: 0.0,
        }
    }
}

// ============================================================================
// Feeding Consistency
// ============================================================================

/// Day-to-day variation of the feed actually given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedingConsistencyConfig {
    #[serde(default = "default_fc_window")]
    pub window_days: u32,

    /// Fewer logged days than this and the factor is unavailable.
    #[serde(default = "default_fc_min_days")]
    pub min_days: usize,

    #[serde(default = "default_fc_consistent")]
    pub consistent_cv_below: f64,

    #[serde(default = "default_fc_inconsistent")]
    pub inconsistent_cv_above: f64,

    #[serde(default = "default_fc_adj")]
    pub inconsistent_adjustment_percent: f64,
}

fn default_fc_window() -> u32 { 30 }
fn default_fc_min_days() -> usize { 2 }
fn default_fc_consistent() -> f64 { 0.2 }
fn default_fc_inconsistent() -> f64 { 0.4 }
fn default_fc_adj() -> f64 { -10.0 }

impl Default for FeedingConsistencyConfig {
    fn default() -> Self {
        Self {
            window_days: default_fc_window(),
            min_days: default_fc_min_days(),
            consistent_cv_below: default_fc_consistent(),
            inconsistent_cv_above: default_fc_inconsistent(),
            inconsistent_adjustment_percent: default_fc_adj(),
        }
    }
}

// ============================================================================
// Medical
// ============================================================================

/// Severity of the most confident active (untreated, recent) diagnosis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalConfig {
    /// A diagnosis older than this is no longer considered active.
    #[serde(default = "default_med_window")]
    pub active_window_days: u32,

    #[serde(default = "default_med_high")]
    pub high_confidence_percent: f64,
    #[serde(default = "default_med_moderate")]
    pub moderate_confidence_percent: f64,

    #[serde(default = "default_med_high_adj")]
    pub high_adjustment_percent: f64,
    #[serde(default = "default_med_moderate_adj")]
    pub moderate_adjustment_percent: f64,
    #[serde(default = "default_med_low_adj")]
    pub low_adjustment_percent: f64,
}

fn default_med_window() -> u32 { 30 }
fn default_med_high() -> f64 { 80.0 }
fn default_med_moderate() -> f64 { 60.0 }
fn default_med_high_adj() -> f64 { -50.0 }
fn default_med_moderate_adj() -> f64 { -30.0 }
fn default_med_low_adj() -> f64 { -10.0 }

impl Default for MedicalConfig {
    fn default() -> Self {
        Self {
            active_window_days: default_med_window(),
            high_confidence_percent: default_med_high(),
            moderate_confidence_percent: default_med_moderate(),
            high_adjustment_percent: default_med_high_adj(),
            moderate_adjustment_percent: default_med_moderate_adj(),
            low_adjustment_percent: default_med_low_adj(),
        }
    }
}

// ============================================================================
// FCR
// ============================================================================

/// Feed conversion ratio blending and bounds.
///
/// `fcr = recent_weight * avg(last recent_intervals) + overall_weight * avg(all)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcrConfig {
    #[serde(default = "default_fcr_recent_weight")]
    pub recent_weight: f64,
    #[serde(default = "default_fcr_overall_weight")]
    pub overall_weight: f64,
    #[serde(default = "default_fcr_recent_intervals")]
    pub recent_intervals: usize,

    /// Used when no interval or window yields a ratio.
    #[serde(default = "default_fcr_default")]
    pub default_fcr: f64,
    #[serde(default = "default_fcr_min")]
    pub min_fcr: f64,
    #[serde(default = "default_fcr_max")]
    pub max_fcr: f64,

    #[serde(default = "default_fcr_excellent")]
    pub excellent_below: f64,
    #[serde(default = "default_fcr_good")]
    pub good_below: f64,
    #[serde(default = "default_fcr_needs_improvement")]
    pub needs_improvement_below: f64,
}

fn default_fcr_recent_weight() -> f64 { 0.7 }
fn default_fcr_overall_weight() -> f64 { 0.3 }
fn default_fcr_recent_intervals() -> usize { 2 }
fn default_fcr_default() -> f64 { 1.5 }
fn default_fcr_min() -> f64 { 0.8 }
fn default_fcr_max() -> f64 { 3.0 }
fn default_fcr_excellent() -> f64 { 1.2 }
fn default_fcr_good() -> f64 { 1.5 }
fn default_fcr_needs_improvement() -> f64 { 2.0 }

impl Default for FcrConfig {
    fn default() -> Self {
        Self {
            recent_weight: default_fcr_recent_weight(),
            overall_weight: default_fcr_overall_weight(),
            recent_intervals: default_fcr_recent_intervals(),
            default_fcr: default_fcr_default(),
            min_fcr: default_fcr_min(),
            max_fcr: default_fcr_max(),
            excellent_below: default_fcr_excellent(),
            good_below: default_fcr_good(),
            needs_improvement_below: default_fcr_needs_improvement(),
        }
    }
}

// ============================================================================
// Projection / Fallback / Storage
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Upper bound on projected days; also used when growth is zero or unknown.
    #[serde(default = "default_projection_max_days")]
    pub max_days: u32,
}

fn default_projection_max_days() -> u32 { 365 }

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            max_days: default_projection_max_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Assumed per-fish growth (g/day) when aging a stocking weight forward.
    #[serde(default = "default_fallback_growth")]
    pub default_growth_g_per_day: f64,
}

fn default_fallback_growth() -> f64 { 0.1 }

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            default_growth_g_per_day: default_fallback_growth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_advice_db_path")]
    pub advice_db_path: String,
}

fn default_advice_db_path() -> String {
    "./data/advice".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            advice_db_path: default_advice_db_path(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok(), "Default config must always validate");
    }

    #[test]
    fn test_empty_toml_produces_defaults() {
        let config: EngineConfig = toml::from_str("").expect("empty TOML should parse");
        assert_eq!(config.adjustments.min_total_percent, -50.0);
        assert_eq!(config.adjustments.max_total_percent, 30.0);
        assert_eq!(config.fcr.default_fcr, 1.5);
        assert_eq!(config.projection.max_days, 365);
        assert_eq!(config.farm.hemisphere, Hemisphere::Northern);
        assert_eq!(config.mortality.disease_keywords.len(), 7);
    }

    #[test]
    fn test_partial_toml_override() {
        let toml_str = r#"
[farm]
name = "Riverside"
hemisphere = "southern"

[season]
winter_adjustment_percent = -25.0
"#;
        let config: EngineConfig = toml::from_str(toml_str).expect("partial TOML should parse");
        assert_eq!(config.farm.name, "Riverside");
        assert_eq!(config.farm.hemisphere, Hemisphere::Southern);
        assert_eq!(config.season.winter_adjustment_percent, -25.0);
        // Untouched values keep defaults
        assert_eq!(config.season.summer_adjustment_percent, 10.0);
        assert_eq!(config.temperature.hot_above_c, 35.0);
    }

    #[test]
    fn test_validation_catches_inverted_clamp() {
        let mut config = EngineConfig::default();
        config.adjustments.min_total_percent = 10.0;
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Validation(ref e)) if e.iter().any(|m| m.contains("adjustments"))));
    }

    #[test]
    fn test_validation_catches_bad_fcr_weights() {
        let mut config = EngineConfig::default();
        config.fcr.recent_weight = 0.9;
        config.fcr.overall_weight = 0.9;
        assert!(config.validate().is_err(), "Weights summing to 1.8 should fail");
    }

    #[test]
    fn test_validation_catches_default_fcr_outside_clamp() {
        let mut config = EngineConfig::default();
        config.fcr.default_fcr = 4.0;
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Validation(ref e)) if e.iter().any(|m| m.contains("default_fcr"))));
    }

    #[test]
    fn test_validation_catches_overlapping_ph_band() {
        let mut config = EngineConfig::default();
        config.water_quality.ph_acceptable_min = 7.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_catches_nan() {
        let mut config = EngineConfig::default();
        config.growth.excellent_rate_kg_per_day = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_roundtrip_toml() {
        let original = EngineConfig::default();
        let toml_str = original.to_toml().expect("serialization should work");
        let back: EngineConfig = toml::from_str(&toml_str).expect("deserialization should work");
        assert_eq!(back.fcr.recent_weight, original.fcr.recent_weight);
        assert_eq!(back.storage.advice_db_path, original.storage.advice_db_path);
    }

    #[test]
    fn test_all_sections_serialize() {
        let toml_str = EngineConfig::default().to_toml().unwrap();
        for section in [
            "[farm]",
            "[adjustments]",
            "[water_quality]",
            "[temperature]",
            "[mortality]",
            "[growth]",
            "[season]",
            "[feeding_consistency]",
            "[medical]",
            "[fcr]",
            "[projection]",
            "[fallback]",
            "[storage]",
        ] {
            assert!(toml_str.contains(section), "Missing {section} section");
        }
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pondfeed.toml");
        let mut config = EngineConfig::default();
        config.farm.name = "Hillside".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.farm.name, "Hillside");
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[projection]\nmax_days = 0\n").unwrap();
        assert!(matches!(
            EngineConfig::load_from_file(&path),
            Err(ConfigError::Validation(_))
        ));
    }
}
