//! Historical pond records supplied by the operations ledger.
//!
//! Derived values (average weight, pieces per kg, harvest piece counts) are
//! methods rather than stored fields, so they can never drift from the raw
//! measurements. The two growth fields on `SamplingRecord` are the exception:
//! they depend on *other* records and are maintained by the growth cascade.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{PondId, RecordId, SpeciesId};

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

// ============================================================================
// Stocking
// ============================================================================

/// A batch of fish introduced into a pond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockingRecord {
    pub id: RecordId,
    pub pond: PondId,
    pub species: SpeciesId,
    pub date: NaiveDate,
    /// Pieces stocked
    pub pcs: u64,
    /// Total weight of the batch at stocking (kg)
    pub total_weight_kg: f64,
    #[serde(default)]
    pub notes: String,
}

impl StockingRecord {
    /// Implied initial average weight per fish (kg). `None` when the batch is empty.
    pub fn average_weight_kg(&self) -> Option<f64> {
        if self.pcs == 0 || !is_positive(self.total_weight_kg) {
            return None;
        }
        Some(self.total_weight_kg / self.pcs as f64)
    }

    /// Pieces per kg at stocking. `None` when the batch weight is not positive.
    pub fn pieces_per_kg(&self) -> Option<f64> {
        if self.pcs == 0 || !is_positive(self.total_weight_kg) {
            return None;
        }
        Some(self.pcs as f64 / self.total_weight_kg)
    }
}

// ============================================================================
// Mortality
// ============================================================================

/// Fish found dead on a given day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortalityRecord {
    pub id: RecordId,
    pub pond: PondId,
    /// `None` for mixed-species ponds where the dead fish were not identified
    #[serde(default)]
    pub species: Option<SpeciesId>,
    pub date: NaiveDate,
    pub count: u64,
    /// Average weight at death (kg), if weighed
    #[serde(default)]
    pub avg_weight_kg: Option<f64>,
    /// Free-text cause as logged by the farm hand
    #[serde(default)]
    pub cause: String,
}

impl MortalityRecord {
    pub fn total_weight_kg(&self) -> Option<f64> {
        self.avg_weight_kg.map(|w| w * self.count as f64)
    }
}

// ============================================================================
// Harvest
// ============================================================================

/// How the number of harvested fish was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarvestCount {
    /// Counted explicitly
    Pieces(u64),
    /// Derived from a pieces-per-kg grading of the harvest
    PiecesPerKg(f64),
}

/// Fish removed from a pond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestRecord {
    pub id: RecordId,
    pub pond: PondId,
    #[serde(default)]
    pub species: Option<SpeciesId>,
    pub date: NaiveDate,
    pub total_weight_kg: f64,
    pub count: HarvestCount,
}

impl HarvestRecord {
    /// Number of fish removed, rounding a pieces-per-kg derivation to whole fish.
    pub fn pieces(&self) -> u64 {
        match self.count {
            HarvestCount::Pieces(n) => n,
            HarvestCount::PiecesPerKg(ppk) => {
                let n = (self.total_weight_kg * ppk).round();
                if n.is_finite() && n > 0.0 {
                    n as u64
                } else {
                    0
                }
            }
        }
    }
}

// ============================================================================
// Sampling
// ============================================================================

/// A periodic weighing of a small subset of fish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingRecord {
    pub id: RecordId,
    pub pond: PondId,
    /// `None` when a mixed catch was weighed
    #[serde(default)]
    pub species: Option<SpeciesId>,
    pub date: NaiveDate,
    /// Number of fish weighed
    pub sample_size: u32,
    /// Combined weight of the weighed fish (kg)
    pub total_weight_kg: f64,
    /// Per-fish growth since the baseline record (kg/day). Maintained by the growth cascade.
    #[serde(default)]
    pub growth_rate_kg_per_day: Option<f64>,
    /// Pond biomass change since the baseline record (kg). Maintained by the growth cascade.
    #[serde(default)]
    pub biomass_difference_kg: Option<f64>,
    #[serde(default)]
    pub notes: String,
}

impl SamplingRecord {
    /// Create a sampling with growth fields not yet derived.
    pub fn new(
        id: RecordId,
        pond: PondId,
        species: Option<SpeciesId>,
        date: NaiveDate,
        sample_size: u32,
        total_weight_kg: f64,
    ) -> Self {
        Self {
            id,
            pond,
            species,
            date,
            sample_size,
            total_weight_kg,
            growth_rate_kg_per_day: None,
            biomass_difference_kg: None,
            notes: String::new(),
        }
    }

    /// Average weight per fish (kg). `None` for an empty or weightless sample.
    pub fn average_weight_kg(&self) -> Option<f64> {
        if self.sample_size == 0 || !is_positive(self.total_weight_kg) {
            return None;
        }
        Some(self.total_weight_kg / f64::from(self.sample_size))
    }

    pub fn average_weight_g(&self) -> Option<f64> {
        self.average_weight_kg().map(|kg| kg * 1000.0)
    }

    pub fn fish_per_kg(&self) -> Option<f64> {
        if self.sample_size == 0 || !is_positive(self.total_weight_kg) {
            return None;
        }
        Some(f64::from(self.sample_size) / self.total_weight_kg)
    }
}

// ============================================================================
// Feed Log
// ============================================================================

/// Feed actually given to a pond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedLogRecord {
    pub id: RecordId,
    pub pond: PondId,
    pub date: NaiveDate,
    pub feed_kg: f64,
    #[serde(default)]
    pub feed_type: Option<String>,
    #[serde(default)]
    pub protein_percent: Option<f64>,
    /// Total cost of this feeding, in farm currency
    #[serde(default)]
    pub cost: Option<f64>,
}

// ============================================================================
// Water Quality
// ============================================================================

/// One water-quality reading. Any subset of parameters may be present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterQualitySample {
    pub pond: PondId,
    pub date: NaiveDate,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub ph: Option<f64>,
    /// Dissolved oxygen (mg/L)
    #[serde(default)]
    pub dissolved_oxygen: Option<f64>,
    /// Total ammonia (mg/L)
    #[serde(default)]
    pub ammonia: Option<f64>,
    /// Nitrite (mg/L)
    #[serde(default)]
    pub nitrite: Option<f64>,
    /// Secchi disk transparency (cm)
    #[serde(default)]
    pub turbidity: Option<f64>,
}

// ============================================================================
// Medical Diagnostic
// ============================================================================

/// A disease diagnosis raised against a pond.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalDiagnostic {
    pub id: RecordId,
    pub pond: PondId,
    pub disease: String,
    /// Diagnostic confidence, 0-100
    pub confidence_percent: f64,
    /// Whether the prescribed treatment has been applied
    #[serde(default)]
    pub applied: bool,
    pub created_at: DateTime<Utc>,
}

impl MedicalDiagnostic {
    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
    }

    #[test]
    fn test_sampling_derived_fields() {
        let s = SamplingRecord::new(1, 1, Some(1), day(1), 30, 0.75);
        assert!((s.average_weight_kg().unwrap() - 0.025).abs() < 1e-12);
        assert!((s.average_weight_g().unwrap() - 25.0).abs() < 1e-9);
        assert!((s.fish_per_kg().unwrap() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_sampling_guards_empty_sample() {
        let s = SamplingRecord::new(1, 1, None, day(1), 0, 0.75);
        assert!(s.average_weight_kg().is_none());
        let s = SamplingRecord::new(1, 1, None, day(1), 10, 0.0);
        assert!(s.average_weight_kg().is_none());
        assert!(s.fish_per_kg().is_none());
    }

    #[test]
    fn test_stocking_guards() {
        let mut st = StockingRecord {
            id: 1,
            pond: 1,
            species: 1,
            date: day(1),
            pcs: 1000,
            total_weight_kg: 5.0,
            notes: String::new(),
        };
        assert!((st.average_weight_kg().unwrap() - 0.005).abs() < 1e-12);
        assert!((st.pieces_per_kg().unwrap() - 200.0).abs() < 1e-9);
        st.pcs = 0;
        assert!(st.average_weight_kg().is_none());
        assert!(st.pieces_per_kg().is_none());
    }

    #[test]
    fn test_harvest_pieces_from_pieces_per_kg() {
        let h = HarvestRecord {
            id: 1,
            pond: 1,
            species: None,
            date: day(1),
            total_weight_kg: 12.5,
            count: HarvestCount::PiecesPerKg(4.0),
        };
        assert_eq!(h.pieces(), 50);

        let h = HarvestRecord {
            count: HarvestCount::Pieces(17),
            ..h
        };
        assert_eq!(h.pieces(), 17);
    }

    #[test]
    fn test_mortality_total_weight() {
        let m = MortalityRecord {
            id: 1,
            pond: 1,
            species: Some(1),
            date: day(2),
            count: 10,
            avg_weight_kg: Some(0.05),
            cause: String::new(),
        };
        assert!((m.total_weight_kg().unwrap() - 0.5).abs() < 1e-12);
    }
}
