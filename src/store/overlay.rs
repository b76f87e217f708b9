//! Read view with pending sampling edits layered over a base store.
//!
//! A growth cascade has to see the edited sampling *before* it is committed,
//! because later records pick their baseline from it. The overlay makes that
//! possible without writing anything: the engine computes the cascade against
//! the overlay and commits the resulting batch in one step.

use super::{EventStore, SamplingBatch, StoreError};
use crate::types::{
    DateRange, FeedLogRecord, HarvestRecord, MedicalDiagnostic, MortalityRecord, PondId,
    RecordId, SamplingRecord, Scope, StockingRecord, WaterQualitySample,
};

pub struct OverlayStore<'a> {
    base: &'a dyn EventStore,
    upserts: Vec<SamplingRecord>,
    deletions: Vec<RecordId>,
}

impl<'a> OverlayStore<'a> {
    pub fn new(base: &'a dyn EventStore) -> Self {
        Self {
            base,
            upserts: Vec::new(),
            deletions: Vec::new(),
        }
    }

    /// Stage an insert or edit. Replaces any earlier staged version of the same id.
    pub fn upsert(&mut self, record: SamplingRecord) {
        self.deletions.retain(|id| *id != record.id);
        match self.upserts.iter_mut().find(|s| s.id == record.id) {
            Some(existing) => *existing = record,
            None => self.upserts.push(record),
        }
    }

    pub fn delete(&mut self, id: RecordId) {
        self.upserts.retain(|s| s.id != id);
        if !self.deletions.contains(&id) {
            self.deletions.push(id);
        }
    }

    /// Everything staged so far, ready to commit.
    pub fn into_batch(self) -> SamplingBatch {
        SamplingBatch {
            upserts: self.upserts,
            deletions: self.deletions,
        }
    }

    fn shadowed(&self, id: RecordId) -> bool {
        self.deletions.contains(&id) || self.upserts.iter().any(|s| s.id == id)
    }
}

impl EventStore for OverlayStore<'_> {
    fn stockings(&self, pond: PondId, scope: Scope) -> Result<Vec<StockingRecord>, StoreError> {
        self.base.stockings(pond, scope)
    }

    fn mortalities(
        &self,
        pond: PondId,
        scope: Scope,
        range: DateRange,
    ) -> Result<Vec<MortalityRecord>, StoreError> {
        self.base.mortalities(pond, scope, range)
    }

    fn harvests(
        &self,
        pond: PondId,
        scope: Scope,
        range: DateRange,
    ) -> Result<Vec<HarvestRecord>, StoreError> {
        self.base.harvests(pond, scope, range)
    }

    fn samplings(
        &self,
        pond: PondId,
        scope: Scope,
        range: DateRange,
    ) -> Result<Vec<SamplingRecord>, StoreError> {
        let mut out: Vec<SamplingRecord> = self
            .base
            .samplings(pond, scope, range)?
            .into_iter()
            .filter(|s| !self.shadowed(s.id))
            .collect();
        out.extend(
            self.upserts
                .iter()
                .filter(|s| s.pond == pond && scope.includes(s.species) && range.contains(s.date))
                .cloned(),
        );
        out.sort_by_key(|s| (s.date, s.id));
        Ok(out)
    }

    fn sampling(&self, id: RecordId) -> Result<Option<SamplingRecord>, StoreError> {
        if self.deletions.contains(&id) {
            return Ok(None);
        }
        if let Some(staged) = self.upserts.iter().find(|s| s.id == id) {
            return Ok(Some(staged.clone()));
        }
        self.base.sampling(id)
    }

    fn feed_logs(&self, pond: PondId, range: DateRange) -> Result<Vec<FeedLogRecord>, StoreError> {
        self.base.feed_logs(pond, range)
    }

    fn water_quality(
        &self,
        pond: PondId,
        range: DateRange,
    ) -> Result<Vec<WaterQualitySample>, StoreError> {
        self.base.water_quality(pond, range)
    }

    fn medical_diagnostics(
        &self,
        pond: PondId,
        range: DateRange,
    ) -> Result<Vec<MedicalDiagnostic>, StoreError> {
        self.base.medical_diagnostics(pond, range)
    }

    fn ponds(&self) -> Result<Vec<PondId>, StoreError> {
        self.base.ponds()
    }

    fn backend_name(&self) -> &'static str {
        "Overlay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryEventStore, SamplingLedger};
    use chrono::NaiveDate;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
    }

    fn seeded() -> InMemoryEventStore {
        let store = InMemoryEventStore::new();
        store
            .commit_samplings(SamplingBatch {
                upserts: vec![
                    SamplingRecord::new(1, 1, Some(1), day(1), 10, 0.1),
                    SamplingRecord::new(2, 1, Some(1), day(10), 10, 0.2),
                ],
                deletions: vec![],
            })
            .unwrap();
        store
    }

    #[test]
    fn test_overlay_shows_staged_insert_without_writing() {
        let base = seeded();
        let mut overlay = OverlayStore::new(&base);
        overlay.upsert(SamplingRecord::new(3, 1, Some(1), day(5), 10, 0.15));

        let seen = overlay.samplings(1, Scope::Mixed, DateRange::ALL).unwrap();
        let ids: Vec<_> = seen.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
        assert_eq!(base.samplings(1, Scope::Mixed, DateRange::ALL).unwrap().len(), 2);
    }

    #[test]
    fn test_overlay_hides_staged_deletion() {
        let base = seeded();
        let mut overlay = OverlayStore::new(&base);
        overlay.delete(1);

        assert!(overlay.sampling(1).unwrap().is_none());
        let seen = overlay.samplings(1, Scope::Mixed, DateRange::ALL).unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(overlay.into_batch().deletions, vec![1]);
    }

    #[test]
    fn test_overlay_edit_replaces_base_version() {
        let base = seeded();
        let mut overlay = OverlayStore::new(&base);
        let mut edited = SamplingRecord::new(2, 1, Some(1), day(12), 10, 0.3);
        edited.notes = "re-weighed".to_string();
        overlay.upsert(edited);

        let seen = overlay.samplings(1, Scope::Species(1), DateRange::ALL).unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].date, day(12));
        assert_eq!(seen[1].notes, "re-weighed");
    }
}
