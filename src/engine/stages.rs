//! Feeding Stage Table
//!
//! Static reference data: 27 weight bands from first-feeding fry to
//! broodstock. Bands are half-open `[min, max)` so neighbours share an edge
//! without overlapping; the last band is open-ended. Base rates decrease
//! strictly with weight and every band's feeding schedule shares sum to 100.

use serde::Serialize;

use crate::types::FeedingSession;

/// One feeding time and its share of the daily ration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeedingSlot {
    pub time: &'static str,
    pub share_percent: u8,
}

const fn slot(time: &'static str, share_percent: u8) -> FeedingSlot {
    FeedingSlot {
        time,
        share_percent,
    }
}

const SIX_MEALS: &[FeedingSlot] = &[
    slot("06:00", 20),
    slot("09:00", 15),
    slot("12:00", 20),
    slot("15:00", 15),
    slot("18:00", 15),
    slot("21:00", 15),
];
const FIVE_MEALS: &[FeedingSlot] = &[
    slot("06:00", 20),
    slot("09:30", 20),
    slot("13:00", 20),
    slot("16:30", 20),
    slot("20:00", 20),
];
const FOUR_MEALS: &[FeedingSlot] = &[
    slot("07:00", 30),
    slot("11:00", 20),
    slot("15:00", 25),
    slot("19:00", 25),
];
const THREE_MEALS: &[FeedingSlot] = &[slot("07:00", 40), slot("12:00", 25), slot("17:00", 35)];
const TWO_MEALS: &[FeedingSlot] = &[slot("08:00", 55), slot("17:00", 45)];

/// Feeding regime for one weight band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeedingStage {
    pub name: &'static str,
    /// Inclusive lower bound (g)
    pub min_weight_g: f64,
    /// Exclusive upper bound (g); infinite for the last band
    pub max_weight_g: f64,
    /// Daily ration as % of biomass
    pub base_rate_percent: f64,
    pub protein_percent: f64,
    pub pellet_size: &'static str,
    pub schedule: &'static [FeedingSlot],
}

#[allow(clippy::too_many_arguments)]
const fn stage(
    name: &'static str,
    min_weight_g: f64,
    max_weight_g: f64,
    base_rate_percent: f64,
    protein_percent: f64,
    pellet_size: &'static str,
    schedule: &'static [FeedingSlot],
) -> FeedingStage {
    FeedingStage {
        name,
        min_weight_g,
        max_weight_g,
        base_rate_percent,
        protein_percent,
        pellet_size,
        schedule,
    }
}

pub static STAGE_TABLE: [FeedingStage; 27] = [
    stage("Fry-1", 0.0, 0.2, 20.0, 45.0, "powder", SIX_MEALS),
    stage("Fry-2", 0.2, 0.5, 18.0, 45.0, "powder", SIX_MEALS),
    stage("Fry-3", 0.5, 1.0, 15.0, 42.0, "crumble 0.3 mm", FIVE_MEALS),
    stage("Fingerling-1", 1.0, 2.0, 12.0, 40.0, "crumble 0.5 mm", FIVE_MEALS),
    stage("Fingerling-2", 2.0, 3.0, 10.0, 40.0, "crumble 0.8 mm", FIVE_MEALS),
    stage("Nursery-1", 3.0, 5.0, 8.0, 38.0, "crumble 1.0 mm", FOUR_MEALS),
    stage("Nursery-2, 100 pcs/kg", 5.0, 10.0, 7.0, 36.0, "1.2 mm", FOUR_MEALS),
    stage("Juvenile-1", 10.0, 15.0, 6.0, 35.0, "1.5 mm", FOUR_MEALS),
    stage("Juvenile-2", 15.0, 20.0, 5.5, 35.0, "1.5 mm", FOUR_MEALS),
    stage("Juvenile-3", 20.0, 30.0, 5.0, 32.0, "2 mm", THREE_MEALS),
    stage("Juvenile-4", 30.0, 40.0, 4.5, 32.0, "2 mm", THREE_MEALS),
    stage("Grower-1", 40.0, 50.0, 4.0, 30.0, "2.5 mm", THREE_MEALS),
    stage("Grower-2", 50.0, 65.0, 3.8, 30.0, "2.5 mm", THREE_MEALS),
    stage("Grower-3", 65.0, 80.0, 3.5, 30.0, "3 mm", THREE_MEALS),
    stage("Grower-4", 80.0, 100.0, 3.2, 28.0, "3 mm", THREE_MEALS),
    stage("Grower-5", 100.0, 125.0, 3.0, 28.0, "3 mm", THREE_MEALS),
    stage("Grower-6", 125.0, 150.0, 2.8, 28.0, "4 mm", THREE_MEALS),
    stage("Grower-7", 150.0, 200.0, 2.5, 28.0, "4 mm", TWO_MEALS),
    stage("Finisher-1", 200.0, 250.0, 2.3, 26.0, "4 mm", TWO_MEALS),
    stage("Finisher-2", 250.0, 300.0, 2.1, 26.0, "5 mm", TWO_MEALS),
    stage("Finisher-3", 300.0, 400.0, 2.0, 25.0, "5 mm", TWO_MEALS),
    stage("Finisher-4", 400.0, 500.0, 1.8, 25.0, "6 mm", TWO_MEALS),
    stage("Finisher-5", 500.0, 650.0, 1.6, 25.0, "6 mm", TWO_MEALS),
    stage("Finisher-6", 650.0, 800.0, 1.5, 24.0, "6 mm", TWO_MEALS),
    stage("Market-1", 800.0, 1000.0, 1.3, 24.0, "8 mm", TWO_MEALS),
    stage("Market-2", 1000.0, 1500.0, 1.2, 24.0, "8 mm", TWO_MEALS),
    stage("Broodstock", 1500.0, f64::INFINITY, 1.0, 28.0, "8 mm", TWO_MEALS),
];

impl FeedingStage {
    /// Meals per day.
    pub fn frequency(&self) -> u8 {
        u8::try_from(self.schedule.len()).unwrap_or(u8::MAX)
    }

    pub fn contains(&self, weight_g: f64) -> bool {
        weight_g >= self.min_weight_g && weight_g < self.max_weight_g
    }

    /// Split a daily ration across this stage's feeding times.
    pub fn sessions(&self, daily_feed_kg: f64) -> Vec<FeedingSession> {
        self.schedule
            .iter()
            .map(|s| FeedingSession {
                time: s.time.to_string(),
                share_percent: s.share_percent,
                feed_kg: daily_feed_kg * f64::from(s.share_percent) / 100.0,
            })
            .collect()
    }
}

/// Band for an average fish weight in grams.
///
/// Negative or NaN weights map to the first band; anything past the last
/// band's lower edge maps to the last band.
pub fn lookup_stage(weight_g: f64) -> &'static FeedingStage {
    let idx = STAGE_TABLE.partition_point(|s| s.max_weight_g <= weight_g);
    &STAGE_TABLE[idx.min(STAGE_TABLE.len() - 1)]
}
