//! Identifiers, species scope and date windows shared by every record kind.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pond identifier as issued by the operations ledger.
pub type PondId = u32;

/// Species identifier as issued by the operations ledger.
pub type SpeciesId = u32;

/// Identifier of a single historical record (stocking, sampling, ...).
pub type RecordId = u64;

// ============================================================================
// Scope
// ============================================================================

/// Which fish in a pond a query or computation covers.
///
/// `Mixed` pools every species stocked in the pond. A record whose species is
/// unknown (`None`) only ever contributes to `Mixed` queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Species(SpeciesId),
    Mixed,
}

impl Scope {
    pub const fn from_option(species: Option<SpeciesId>) -> Self {
        match species {
            Some(id) => Self::Species(id),
            None => Self::Mixed,
        }
    }

    pub const fn species(self) -> Option<SpeciesId> {
        match self {
            Self::Species(id) => Some(id),
            Self::Mixed => None,
        }
    }

    /// Whether a record tagged with `record_species` belongs to this scope.
    pub fn includes(self, record_species: Option<SpeciesId>) -> bool {
        match self {
            Self::Mixed => true,
            Self::Species(id) => record_species == Some(id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Species(id) => write!(f, "species {id}"),
            Self::Mixed => write!(f, "mixed"),
        }
    }
}

// ============================================================================
// Date Range
// ============================================================================

/// `date` moved back `days` days, saturating at `NaiveDate::MIN`.
pub fn days_before(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|d| date.checked_sub_signed(d))
        .unwrap_or(NaiveDate::MIN)
}

/// `date` moved forward `days` days, saturating at `NaiveDate::MAX`.
pub fn days_after(date: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|d| date.checked_add_signed(d))
        .unwrap_or(NaiveDate::MAX)
}

/// Inclusive date window. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Unbounded on both sides.
    pub const ALL: Self = Self {
        start: None,
        end: None,
    };

    pub const fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Everything on or before `end`.
    pub const fn through(end: NaiveDate) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// Everything on or after `start`.
    pub const fn since(start: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// The `days` calendar days ending at (and including) `as_of`.
    ///
    /// A window reaching past the earliest representable date starts there.
    pub fn trailing_days(as_of: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self::between(days_before(as_of, span), as_of)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_species_scope_excludes_unknown_species() {
        let scope = Scope::Species(3);
        assert!(scope.includes(Some(3)));
        assert!(!scope.includes(Some(4)));
        assert!(!scope.includes(None));
    }

    #[test]
    fn test_mixed_scope_includes_everything() {
        assert!(Scope::Mixed.includes(None));
        assert!(Scope::Mixed.includes(Some(7)));
    }

    #[test]
    fn test_trailing_days_is_inclusive() {
        let range = DateRange::trailing_days(d(2024, 3, 31), 30);
        assert_eq!(range.start, Some(d(2024, 3, 2)));
        assert!(range.contains(d(2024, 3, 2)));
        assert!(range.contains(d(2024, 3, 31)));
        assert!(!range.contains(d(2024, 3, 1)));
        assert!(!range.contains(d(2024, 4, 1)));
    }

    #[test]
    fn test_huge_trailing_window_saturates() {
        let range = DateRange::trailing_days(d(2024, 6, 1), u32::MAX);
        assert_eq!(range.start, Some(NaiveDate::MIN));
        assert!(range.contains(d(1900, 1, 1)));
        assert!(range.contains(d(2024, 6, 1)));
    }

    #[test]
    fn test_day_shift_saturates_at_calendar_edges() {
        assert_eq!(days_after(d(2024, 1, 1), i64::MAX), NaiveDate::MAX);
        assert_eq!(days_before(d(2024, 1, 1), i64::MAX), NaiveDate::MIN);
        assert_eq!(days_after(d(2024, 1, 30), 2), d(2024, 2, 1));
        assert_eq!(days_before(d(2024, 3, 1), 1), d(2024, 2, 29));
    }

    #[test]
    fn test_open_range_contains_all() {
        assert!(DateRange::ALL.contains(d(1999, 1, 1)));
        assert!(DateRange::through(d(2024, 1, 1)).contains(d(2023, 12, 31)));
        assert!(!DateRange::since(d(2024, 1, 1)).contains(d(2023, 12, 31)));
    }
}
