//! Every non-negative weight falls in exactly one feeding stage.

use pondfeed::engine::{lookup_stage, STAGE_TABLE};

#[test]
fn every_gram_up_to_two_tonnes_has_one_stage() {
    for grams in 0..=2_000_000_u32 {
        let w = f64::from(grams);
        let matching = STAGE_TABLE.iter().filter(|s| s.contains(w)).count();
        assert_eq!(matching, 1, "{w} g matches {matching} stages");
        assert!(lookup_stage(w).contains(w), "lookup disagrees at {w} g");
    }
}

#[test]
fn fractional_weights_near_band_edges() {
    for stage in STAGE_TABLE.iter().skip(1) {
        let edge = stage.min_weight_g;
        assert_eq!(lookup_stage(edge).name, stage.name);
        let below = edge - 1e-6;
        assert_ne!(lookup_stage(below).name, stage.name);
        assert!(lookup_stage(below).contains(below));
    }
}

#[test]
fn rations_shrink_as_fish_grow() {
    let small = lookup_stage(5.0);
    let large = lookup_stage(900.0);
    assert!(small.base_rate_percent > large.base_rate_percent);
    assert!(small.frequency() >= large.frequency());

    let sessions = large.sessions(10.0);
    let total: f64 = sessions.iter().map(|s| s.feed_kg).sum();
    assert!((total - 10.0).abs() < 1e-9);
}
