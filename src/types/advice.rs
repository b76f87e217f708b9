//! Advice types: Season, FactorAdjustment, AdjustmentBreakdown, analysis labels,
//! FeedingAdvice

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{PondId, RecordId, Scope};

// ============================================================================
// Season
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hemisphere {
    #[default]
    Northern,
    Southern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl Season {
    /// Meteorological season for a calendar date.
    pub fn for_date(date: NaiveDate, hemisphere: Hemisphere) -> Self {
        let northern = match date.month() {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Autumn,
            _ => Self::Winter,
        };
        match hemisphere {
            Hemisphere::Northern => northern,
            Hemisphere::Southern => northern.opposite(),
        }
    }

    const fn opposite(self) -> Self {
        match self {
            Self::Spring => Self::Autumn,
            Self::Summer => Self::Winter,
            Self::Autumn => Self::Spring,
            Self::Winter => Self::Summer,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
            Self::Winter => "winter",
        };
        f.write_str(s)
    }
}

// ============================================================================
// Adjustment Breakdown
// ============================================================================

/// One of the factors that move the base feeding rate up or down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorKind {
    WaterQuality,
    Temperature,
    Mortality,
    Growth,
    Season,
    FeedingConsistency,
    Medical,
}

impl FactorKind {
    pub const ALL: [Self; 7] = [
        Self::WaterQuality,
        Self::Temperature,
        Self::Mortality,
        Self::Growth,
        Self::Season,
        Self::FeedingConsistency,
        Self::Medical,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::WaterQuality => "water quality",
            Self::Temperature => "temperature",
            Self::Mortality => "mortality",
            Self::Growth => "growth",
            Self::Season => "season",
            Self::FeedingConsistency => "feeding consistency",
            Self::Medical => "medical",
        }
    }
}

/// Whether a factor had data to work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorStatus {
    Applied,
    /// No input data; contributes 0
    Unavailable,
}

/// A single factor's contribution, in percentage points of the base rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorAdjustment {
    pub kind: FactorKind,
    pub adjustment_percent: f64,
    pub status: FactorStatus,
    /// Short human-readable reason
    pub detail: String,
}

impl FactorAdjustment {
    pub fn applied(kind: FactorKind, adjustment_percent: f64, detail: impl Into<String>) -> Self {
        Self {
            kind,
            adjustment_percent,
            status: FactorStatus::Applied,
            detail: detail.into(),
        }
    }

    pub fn unavailable(kind: FactorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            adjustment_percent: 0.0,
            status: FactorStatus::Unavailable,
            detail: detail.into(),
        }
    }
}

/// Every factor's adjustment plus the clamped total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentBreakdown {
    pub factors: Vec<FactorAdjustment>,
    /// Plain sum of all factor adjustments
    pub raw_total_percent: f64,
    /// Sum after clamping to the configured safety bounds
    pub total_percent: f64,
    pub clamped: bool,
}

impl AdjustmentBreakdown {
    pub fn factor(&self, kind: FactorKind) -> Option<&FactorAdjustment> {
        self.factors.iter().find(|f| f.kind == kind)
    }

    pub fn unavailable(&self) -> impl Iterator<Item = &FactorAdjustment> {
        self.factors
            .iter()
            .filter(|f| f.status == FactorStatus::Unavailable)
    }

    /// Multiplier applied to the base rate: `1 + total/100`.
    pub fn multiplier(&self) -> f64 {
        1.0 + self.total_percent / 100.0
    }
}

// ============================================================================
// Analysis Labels
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterQualityStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MortalityTrend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedingConsistency {
    Consistent,
    Moderate,
    Inconsistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthQuality {
    Excellent,
    Normal,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthTrend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureTrend {
    Warming,
    Cooling,
    Stable,
}

/// Deaths logged under one cause inside the mortality window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortalityCause {
    pub cause: String,
    pub total_deaths: u64,
    pub event_count: usize,
}

/// Feed given under one feed type inside the feeding window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedTypeUsage {
    pub feed_type: String,
    pub total_kg: f64,
    pub usage_count: usize,
    /// Mean over the logs that record a protein content
    pub avg_protein_percent: Option<f64>,
}

/// Qualitative read-outs that accompany the numeric breakdown.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSummary {
    pub water_quality_score: Option<f64>,
    pub water_quality_status: Option<WaterQualityStatus>,
    pub water_temp_c: Option<f64>,
    pub temperature_trend: Option<TemperatureTrend>,

    pub recent_deaths: u64,
    pub mortality_events: usize,
    pub avg_deaths_per_event: Option<f64>,
    /// Heaviest cause first
    pub mortality_causes: Vec<MortalityCause>,
    pub mortality_rate_percent: Option<f64>,
    pub mortality_trend: Option<MortalityTrend>,
    pub risk_factors: Vec<String>,

    pub total_feed_kg: f64,
    /// Window total spread over every calendar day of the window
    pub avg_daily_feed_kg: Option<f64>,
    /// Largest total first
    pub feed_types: Vec<FeedTypeUsage>,
    pub feeding_cv: Option<f64>,
    pub feeding_consistency: Option<FeedingConsistency>,

    pub growth_rate_kg_per_day: Option<f64>,
    pub growth_quality: Option<GrowthQuality>,
    pub growth_trend: Option<GrowthTrend>,

    pub top_diagnosis: Option<String>,
    /// Every active diagnosis, most confident first
    pub medical_warnings: Vec<String>,
}

// ============================================================================
// Feeding Advice
// ============================================================================

/// Where the average weight behind an advice came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    /// Latest fish sampling
    Sampling,
    /// No sampling yet; weight aged forward from stocking. Lower confidence.
    StockingBased,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sampling => f.write_str("sampling"),
            Self::StockingBased => f.write_str("stocking_based"),
        }
    }
}

/// One feeding slot with its share of the daily ration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedingSession {
    pub time: String,
    pub share_percent: u8,
    pub feed_kg: f64,
}

/// A daily feeding recommendation for one pond/scope.
///
/// Produced by the recommendation composer; only `applied`/`applied_at` ever
/// change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedingAdvice {
    /// Assigned when persisted
    #[serde(default)]
    pub id: Option<RecordId>,
    pub pond: PondId,
    pub scope: Scope,
    pub date: NaiveDate,

    // Fish data
    pub estimated_fish_count: u64,
    pub average_weight_kg: f64,
    pub total_biomass_kg: f64,
    pub data_source: DataSource,

    // Stage
    pub stage_name: String,
    pub base_rate_percent: f64,
    pub protein_percent: f64,
    pub pellet_size: String,

    // Recommendation
    pub base_feed_kg: f64,
    pub recommended_feed_kg: f64,
    pub feeding_rate_percent: f64,
    pub feeding_frequency: u8,
    pub feed_per_session_kg: f64,
    pub schedule: Vec<FeedingSession>,

    // Context
    pub season: Season,
    pub breakdown: AdjustmentBreakdown,
    pub analysis: AnalysisSummary,
    pub fcr: Option<f64>,
    pub feed_cost_per_kg: Option<f64>,
    pub daily_feed_cost: Option<f64>,
    pub notes: Vec<String>,

    // Status
    #[serde(default)]
    pub applied: bool,
    #[serde(default)]
    pub applied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl FeedingAdvice {
    pub fn mark_applied(&mut self, at: DateTime<Utc>) {
        self.applied = true;
        self.applied_at = Some(at);
    }

    /// Notes joined into a single paragraph.
    pub fn notes_text(&self) -> String {
        self.notes.join(" ")
    }
}
