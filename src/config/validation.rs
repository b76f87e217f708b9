//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for `EngineConfig`.
///
/// Maintained by hand to match the struct hierarchy in engine_config.rs.
/// Any new field added there must be added here too.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [farm]
        "farm",
        "farm.name",
        "farm.hemisphere",
        "farm.feed_cost_lookback_days",
        // [adjustments]
        "adjustments",
        "adjustments.min_total_percent",
        "adjustments.max_total_percent",
        // [water_quality]
        "water_quality",
        "water_quality.lookback_days",
        "water_quality.temp_optimal_min_c",
        "water_quality.temp_optimal_max_c",
        "water_quality.temp_acceptable_min_c",
        "water_quality.temp_acceptable_max_c",
        "water_quality.ph_optimal_min",
        "water_quality.ph_optimal_max",
        "water_quality.ph_acceptable_min",
        "water_quality.ph_acceptable_max",
        "water_quality.do_optimal_min",
        "water_quality.do_acceptable_min",
        "water_quality.ammonia_optimal_max",
        "water_quality.ammonia_acceptable_max",
        "water_quality.nitrite_optimal_max",
        "water_quality.nitrite_acceptable_max",
        "water_quality.poor_score_below",
        "water_quality.good_score_at",
        "water_quality.excellent_score_at",
        "water_quality.poor_adjustment_percent",
        "water_quality.excellent_adjustment_percent",
        // [temperature]
        "temperature",
        "temperature.severe_cold_below_c",
        "temperature.severe_cold_adjustment_percent",
        "temperature.cold_below_c",
        "temperature.cold_adjustment_percent",
        "temperature.cool_below_c",
        "temperature.cool_adjustment_percent",
        "temperature.warm_above_c",
        "temperature.warm_adjustment_percent",
        "temperature.hot_above_c",
        "temperature.hot_adjustment_percent",
        "temperature.trend_tolerance_c",
        // [mortality]
        "mortality",
        "mortality.window_days",
        "mortality.rate_threshold_percent",
        "mortality.high_mortality_adjustment_percent",
        "mortality.disease_adjustment_percent",
        "mortality.disease_keywords",
        "mortality.trend_window_days",
        // [growth]
        "growth",
        "growth.excellent_rate_kg_per_day",
        "growth.poor_rate_kg_per_day",
        "growth.excellent_adjustment_percent",
        "growth.poor_adjustment_percent",
        "growth.trend_samplings",
        "growth.trend_tolerance_percent",
        // [season]
        "season",
        "season.winter_adjustment_percent",
        "season.summer_adjustment_percent",
        "season.spring_adjustment_percent",
        "season.autumn_adjustment_percent",
        // [feeding_consistency]
        "feeding_consistency",
        "feeding_consistency.window_days",
        "feeding_consistency.min_days",
        "feeding_consistency.consistent_cv_below",
        "feeding_consistency.inconsistent_cv_above",
        "feeding_consistency.inconsistent_adjustment_percent",
        // [medical]
        "medical",
        "medical.active_window_days",
        "medical.high_confidence_percent",
        "medical.moderate_confidence_percent",
        "medical.high_adjustment_percent",
        "medical.moderate_adjustment_percent",
        "medical.low_adjustment_percent",
        // [fcr]
        "fcr",
        "fcr.recent_weight",
        "fcr.overall_weight",
        "fcr.recent_intervals",
        "fcr.default_fcr",
        "fcr.min_fcr",
        "fcr.max_fcr",
        "fcr.excellent_below",
        "fcr.good_below",
        "fcr.needs_improvement_below",
        // [projection]
        "projection",
        "projection.max_days",
        // [fallback]
        "fallback",
        "fallback.default_growth_g_per_day",
        // [storage]
        "storage",
        "storage.advice_db_path",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = join_key(prefix, k);
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

/// Dotted paths of every float in the tree that is NaN or infinite.
pub fn non_finite_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = join_key(prefix, k);
            match v {
                toml::Value::Float(f) if !f.is_finite() => keys.push(path),
                toml::Value::Table(_) => keys.extend(non_finite_keys(v, &path)),
                _ => {}
            }
        }
    }
    keys
}

fn join_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (*k, levenshtein(unknown, k)))
        .filter(|(_, dist)| *dist <= 3)
        // Tie-break on the key itself so the suggestion is deterministic
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys; it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new(); // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Longest accepted lookback window (ten years).
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// Longest accepted projection horizon (one hundred years).
pub const MAX_PROJECTION_DAYS: u32 = 36_500;

/// Validate physical ranges on a parsed `EngineConfig`.
///
/// Returns (errors, warnings): errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_physical_ranges(
    config: &super::EngineConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let wq = &config.water_quality;

    // Lookback windows longer than this are a units mistake and reach past
    // any farm record
    for (field, days) in [
        ("farm.feed_cost_lookback_days", config.farm.feed_cost_lookback_days),
        ("water_quality.lookback_days", wq.lookback_days),
        ("mortality.window_days", config.mortality.window_days),
        ("mortality.trend_window_days", config.mortality.trend_window_days),
        ("feeding_consistency.window_days", config.feeding_consistency.window_days),
        ("medical.active_window_days", config.medical.active_window_days),
    ] {
        if days > MAX_WINDOW_DAYS {
            errors.push(format!("{field} = {days} exceeds {MAX_WINDOW_DAYS} days"));
        }
    }
    if config.projection.max_days > MAX_PROJECTION_DAYS {
        errors.push(format!(
            "projection.max_days = {} exceeds {MAX_PROJECTION_DAYS} days",
            config.projection.max_days
        ));
    }

    // pH is a 0-14 scale
    for (name, v) in [
        ("ph_acceptable_min", wq.ph_acceptable_min),
        ("ph_acceptable_max", wq.ph_acceptable_max),
    ] {
        if !(0.0..=14.0).contains(&v) {
            errors.push(format!(
                "water_quality.{name} = {v:.2} is outside the pH scale (0-14)"
            ));
        }
    }

    // Concentrations cannot be negative
    for (name, v) in [
        ("do_acceptable_min", wq.do_acceptable_min),
        ("ammonia_optimal_max", wq.ammonia_optimal_max),
        ("nitrite_optimal_max", wq.nitrite_optimal_max),
    ] {
        if v < 0.0 {
            errors.push(format!("water_quality.{name} = {v:.2} cannot be negative"));
        }
    }

    // Confidence is a percentage
    let med = &config.medical;
    if !(0.0..=100.0).contains(&med.high_confidence_percent) {
        errors.push(format!(
            "medical.high_confidence_percent = {:.1} must be within 0-100",
            med.high_confidence_percent
        ));
    }

    if config.fallback.default_growth_g_per_day < 0.0 {
        errors.push(format!(
            "fallback.default_growth_g_per_day = {:.3} cannot be negative",
            config.fallback.default_growth_g_per_day
        ));
    }

    // Individual factors beyond +/-100 % are almost certainly a units mistake
    let factor_values = [
        ("temperature.severe_cold_adjustment_percent", config.temperature.severe_cold_adjustment_percent),
        ("temperature.hot_adjustment_percent", config.temperature.hot_adjustment_percent),
        ("season.winter_adjustment_percent", config.season.winter_adjustment_percent),
        ("season.summer_adjustment_percent", config.season.summer_adjustment_percent),
        ("medical.high_adjustment_percent", med.high_adjustment_percent),
        ("mortality.disease_adjustment_percent", config.mortality.disease_adjustment_percent),
    ];
    for (field, v) in factor_values {
        if v.abs() > 100.0 {
            warnings.push(ValidationWarning {
                field: field.to_string(),
                message: format!("{field} = {v:.1} is outside the typical range (-100 to +100)"),
                suggestion: None,
            });
        }
    }

    // Pond water above 40 C is lethal to warm-water species
    if wq.temp_acceptable_max_c > 40.0 {
        warnings.push(ValidationWarning {
            field: "water_quality.temp_acceptable_max_c".to_string(),
            message: format!(
                "temp_acceptable_max_c = {:.1} is above typical pond temperatures (<= 40 C)",
                wq.temp_acceptable_max_c
            ),
            suggestion: None,
        });
    }

    if config.projection.max_days > 3650 {
        warnings.push(ValidationWarning {
            field: "projection.max_days".to_string(),
            message: format!(
                "projection.max_days = {} is longer than ten years",
                config.projection.max_days
            ),
            suggestion: None,
        });
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================
