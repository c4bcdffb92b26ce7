use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::{bounded, ServiceSettings};
use crate::clock::Clock;
use crate::crop::{CreateCrop, CropRecord, RecordHarvest, MAX_NOTES_LENGTH};
use crate::error::CoreError;
use crate::farmer::FarmerSummary;
use crate::lifecycle::{is_backward, HarvestOutcome, StatusChange};
use crate::query::{harvest_window_cutoff, CropFilter, CropStatistics, DEFAULT_UPCOMING_WINDOW_DAYS};
use crate::status::CropStatus;
use crate::store::{CropStore, FarmerDirectory};
use crate::types::{CoreResult, DbId, Timestamp};
use crate::validation::{optional_text, validate_new_crop};

/// Growth timing for one record at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrowthReport {
    pub crop_id: DbId,
    pub status: CropStatus,
    pub planting_date: Timestamp,
    pub expected_harvest: Timestamp,
    pub growth_progress: u8,
    pub days_to_harvest: i64,
    pub as_of: Timestamp,
}

/// A crop record with its owner's directory summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CropListing {
    #[serde(flatten)]
    pub crop: CropRecord,
    pub farmer: Option<FarmerSummary>,
}

/// Crop record lifecycle and queries.
pub struct CropService {
    crops: Arc<dyn CropStore>,
    farmers: Arc<dyn FarmerDirectory>,
    clock: Arc<dyn Clock>,
    settings: ServiceSettings,
}

impl CropService {
    pub fn new(
        crops: Arc<dyn CropStore>,
        farmers: Arc<dyn FarmerDirectory>,
        clock: Arc<dyn Clock>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            crops,
            farmers,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    // -- lifecycle ----------------------------------------------------------

    /// Record a new planting for an active farmer.
    pub async fn create(&self, input: &CreateCrop) -> CoreResult<CropRecord> {
        let now = self.clock.now();
        let new_crop = validate_new_crop(input, &self.settings.taxonomy, now)?;

        let farmer = bounded(
            self.settings.store_timeout,
            "find_farmer",
            self.farmers.find_by_id(new_crop.farmer_id),
        )
        .await?;
        if !farmer.is_some_and(|f| f.is_active) {
            return Err(CoreError::NotFound {
                entity: "Farmer",
                id: new_crop.farmer_id,
            });
        }

        let crop = bounded(
            self.settings.store_timeout,
            "insert_crop",
            self.crops.insert(&new_crop),
        )
        .await?;

        tracing::info!(
            crop_id = crop.id,
            farmer_id = crop.farmer_id,
            crop_type = %crop.crop_type,
            "Crop recorded",
        );
        Ok(crop)
    }

    /// Active record by id.
    pub async fn get(&self, id: DbId) -> CoreResult<CropRecord> {
        bounded(
            self.settings.store_timeout,
            "find_crop",
            self.crops.find_by_id(id),
        )
        .await?
        .filter(|c| c.is_active)
        .ok_or(CoreError::NotFound { entity: "Crop", id })
    }

    /// Set a new status and append its audit entry.
    pub async fn update_status(
        &self,
        id: DbId,
        status: &str,
        notes: Option<&str>,
        actor: DbId,
    ) -> CoreResult<CropRecord> {
        let status = CropStatus::parse(status)?;
        let notes = optional_text(notes);
        if notes
            .as_ref()
            .is_some_and(|n| n.chars().count() > MAX_NOTES_LENGTH)
        {
            return Err(CoreError::Validation(format!(
                "notes cannot exceed {MAX_NOTES_LENGTH} characters"
            )));
        }

        let change = StatusChange::transition(status, self.clock.now(), notes, actor);
        let crop = self.apply(id, change).await?;

        tracing::info!(crop_id = id, status = %crop.status, actor, "Crop status updated");
        Ok(crop)
    }

    /// Record a harvest outcome, forcing the status to `harvested`.
    ///
    /// `actual_harvest` is only set the first time; later calls update the
    /// outcome and append another audit entry.
    pub async fn record_harvest(
        &self,
        id: DbId,
        input: &RecordHarvest,
        actor: DbId,
    ) -> CoreResult<CropRecord> {
        let outcome = HarvestOutcome::parse(input)?;
        let change = StatusChange::harvest(outcome, self.clock.now(), actor);
        let crop = self.apply(id, change).await?;

        tracing::info!(
            crop_id = id,
            quantity = outcome.quantity,
            unit = outcome.unit.as_str(),
            actor,
            "Harvest recorded",
        );
        Ok(crop)
    }

    async fn apply(&self, id: DbId, change: StatusChange) -> CoreResult<CropRecord> {
        let current = self.get(id).await?;
        self.settings
            .transition_policy
            .check(current.status, change.status)?;
        if is_backward(current.status, change.status) {
            tracing::warn!(
                crop_id = id,
                from = %current.status,
                to = %change.status,
                "Backward status move accepted",
            );
        }
        change.validate_against(&current)?;

        bounded(
            self.settings.store_timeout,
            "apply_status_change",
            self.crops
                .apply_status_change(id, &change, self.settings.transition_policy),
        )
        .await?
        .ok_or(CoreError::NotFound { entity: "Crop", id })
    }

    /// Soft-delete a record on behalf of its owner. Stored data is kept.
    pub async fn deactivate(&self, id: DbId, actor: DbId) -> CoreResult<()> {
        self.owned(id, actor).await?;
        let changed = bounded(
            self.settings.store_timeout,
            "deactivate_crop",
            self.crops.set_active(id, false, self.clock.now()),
        )
        .await?;
        if !changed {
            return Err(CoreError::NotFound { entity: "Crop", id });
        }
        tracing::info!(crop_id = id, actor, "Crop deactivated");
        Ok(())
    }

    /// Undo a soft delete on behalf of the record's owner.
    pub async fn restore(&self, id: DbId, actor: DbId) -> CoreResult<CropRecord> {
        self.owned(id, actor).await?;
        let changed = bounded(
            self.settings.store_timeout,
            "restore_crop",
            self.crops.set_active(id, true, self.clock.now()),
        )
        .await?;
        if !changed {
            return Err(CoreError::NotFound { entity: "Crop", id });
        }
        tracing::info!(crop_id = id, actor, "Crop restored");
        self.get(id).await
    }

    /// Stored record by id, active or not, provided `actor` owns it.
    async fn owned(&self, id: DbId, actor: DbId) -> CoreResult<CropRecord> {
        let crop = bounded(
            self.settings.store_timeout,
            "find_crop",
            self.crops.find_by_id(id),
        )
        .await?
        .ok_or(CoreError::NotFound { entity: "Crop", id })?;
        if crop.farmer_id != actor {
            tracing::warn!(crop_id = id, owner = crop.farmer_id, actor, "Crop ownership check failed");
            return Err(CoreError::Forbidden(
                "Only the owning farmer can change this crop's visibility".to_string(),
            ));
        }
        Ok(crop)
    }

    // -- derived ------------------------------------------------------------

    pub async fn progress(&self, id: DbId) -> CoreResult<GrowthReport> {
        let crop = self.get(id).await?;
        let now = self.clock.now();
        Ok(GrowthReport {
            crop_id: crop.id,
            status: crop.status,
            planting_date: crop.planting_date,
            expected_harvest: crop.expected_harvest,
            growth_progress: crop.growth_progress(now),
            days_to_harvest: crop.days_to_harvest(now),
            as_of: now,
        })
    }

    // -- queries ------------------------------------------------------------

    /// Active records matching the text and filter, in insertion order.
    pub async fn search(&self, text: Option<&str>, filter: &CropFilter) -> CoreResult<Vec<CropRecord>> {
        let text = text.map(str::trim).filter(|t| !t.is_empty());
        bounded(
            self.settings.store_timeout,
            "search_crops",
            self.crops.search(text, filter),
        )
        .await
    }

    pub async fn search_listings(
        &self,
        text: Option<&str>,
        filter: &CropFilter,
    ) -> CoreResult<Vec<CropListing>> {
        let crops = self.search(text, filter).await?;
        self.attach_farmers(crops).await
    }

    pub async fn statistics(&self) -> CoreResult<CropStatistics> {
        bounded(
            self.settings.store_timeout,
            "crop_statistics",
            self.crops.statistics(),
        )
        .await
    }

    /// Growing or mature records expected within `within_days` (default 30).
    pub async fn upcoming_harvests(&self, within_days: Option<i64>) -> CoreResult<Vec<CropRecord>> {
        let days = within_days.unwrap_or(DEFAULT_UPCOMING_WINDOW_DAYS);
        let cutoff = harvest_window_cutoff(self.clock.now(), days)?;
        bounded(
            self.settings.store_timeout,
            "upcoming_harvests",
            self.crops
                .find_harvest_window(CropStatus::HARVEST_WINDOW, cutoff),
        )
        .await
    }

    pub async fn upcoming_harvest_listings(
        &self,
        within_days: Option<i64>,
    ) -> CoreResult<Vec<CropListing>> {
        let crops = self.upcoming_harvests(within_days).await?;
        self.attach_farmers(crops).await
    }

    pub async fn list_by_farmer(&self, farmer_id: DbId) -> CoreResult<Vec<CropRecord>> {
        self.search(None, &CropFilter::for_farmer(farmer_id)).await
    }

    pub async fn list_by_status(&self, status: &str) -> CoreResult<Vec<CropRecord>> {
        let status = CropStatus::parse(status)?;
        self.search(None, &CropFilter::for_status(status)).await
    }

    pub async fn list_by_crop_type(&self, crop_type: &str) -> CoreResult<Vec<CropRecord>> {
        self.settings.taxonomy.validate_crop_type(crop_type)?;
        self.search(None, &CropFilter::for_crop_type(crop_type)).await
    }

    pub async fn list_by_location(
        &self,
        state: &str,
        lga: Option<&str>,
    ) -> CoreResult<Vec<CropRecord>> {
        let filter = CropFilter::for_location(state, optional_text(lga));
        self.search(None, &filter).await
    }

    /// Resolve each distinct owner once and pair it with its records.
    async fn attach_farmers(&self, crops: Vec<CropRecord>) -> CoreResult<Vec<CropListing>> {
        let mut ids: Vec<DbId> = crops.iter().map(|c| c.farmer_id).collect();
        ids.sort_unstable();
        ids.dedup();

        let summaries: HashMap<DbId, FarmerSummary> = if ids.is_empty() {
            HashMap::new()
        } else {
            bounded(
                self.settings.store_timeout,
                "find_farmer_summaries",
                self.farmers.find_summaries(&ids),
            )
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect()
        };

        Ok(crops
            .into_iter()
            .map(|crop| {
                let farmer = summaries.get(&crop.farmer_id).cloned();
                CropListing { crop, farmer }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::crop::{Coordinates, FarmLocation, QualityGrade};
    use crate::farmer::{Farmer, NewFarmer};
    use crate::lifecycle::TransitionPolicy;
    use crate::store::memory::{MemoryCropStore, MemoryFarmerDirectory};
    use crate::taxonomy::Taxonomy;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};

    fn ts(y: i32, m: u32, d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    struct Harness {
        service: CropService,
        crops: MemoryCropStore,
        farmers: MemoryFarmerDirectory,
        clock: Arc<FixedClock>,
        farmer: Farmer,
    }

    fn colombian_settings(policy: TransitionPolicy) -> ServiceSettings {
        ServiceSettings {
            transition_policy: policy,
            taxonomy: Taxonomy::new(
                vec!["Coffee".into(), "Cacao".into(), "Banana".into()],
                vec!["Antioquia".into(), "Huila".into()],
            )
            .unwrap(),
            ..ServiceSettings::default()
        }
    }

    async fn harness_with(policy: TransitionPolicy) -> Harness {
        let crops = MemoryCropStore::new();
        let farmers = MemoryFarmerDirectory::new();
        let clock = Arc::new(FixedClock::new(ts(2025, 7, 1)));
        let farmer = farmers
            .insert(&NewFarmer {
                wallet_address: "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".into(),
                phone_number: "+2348011111111".into(),
                name: "Lucía Restrepo".into(),
                email: None,
                location: location("Antioquia"),
                farm_size: 10.0,
                crops: vec![],
                joined_at: ts(2025, 1, 1),
            })
            .await
            .unwrap();

        let service = CropService::new(
            Arc::new(crops.clone()),
            Arc::new(farmers.clone()),
            clock.clone(),
            colombian_settings(policy),
        );
        Harness {
            service,
            crops,
            farmers,
            clock,
            farmer,
        }
    }

    async fn harness() -> Harness {
        harness_with(TransitionPolicy::Permissive).await
    }

    fn location(state: &str) -> FarmLocation {
        FarmLocation {
            state: state.into(),
            lga: "Jardín".into(),
            coordinates: Coordinates {
                longitude: -75.8,
                latitude: 5.6,
            },
            address: None,
        }
    }

    fn draft(farmer_id: DbId, crop_type: &str, variety: &str, state: &str, size: f64) -> CreateCrop {
        CreateCrop {
            farmer_id,
            crop_type: crop_type.into(),
            variety: variety.into(),
            planting_date: ts(2025, 6, 15),
            expected_harvest: ts(2025, 12, 15),
            farm_size: size,
            farm_location: location(state),
            notes: None,
            blockchain_tx_hash: None,
        }
    }

    fn harvest(quantity: f64, grade: Option<&str>) -> RecordHarvest {
        RecordHarvest {
            quantity,
            unit: "bags".into(),
            quality_grade: grade.map(str::to_string),
        }
    }

    // -- create --

    #[tokio::test]
    async fn coffee_scenario() {
        let h = harness().await;
        let crop = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5))
            .await
            .unwrap();
        assert_eq!(crop.status, CropStatus::Planned);
        assert!(crop.is_active);
        assert!(crop.status_updates.is_empty());

        let updated = h
            .service
            .update_status(crop.id, "growing", None, h.farmer.id)
            .await
            .unwrap();
        assert_eq!(updated.status, CropStatus::Growing);
        assert_eq!(updated.status_updates.len(), 1);

        h.clock.set(ts(2025, 11, 15));
        let report = h.service.progress(crop.id).await.unwrap();
        assert_eq!(report.days_to_harvest, 30);
    }

    #[tokio::test]
    async fn create_rejects_harvest_not_after_planting() {
        let h = harness().await;
        let mut input = draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5);
        input.expected_harvest = input.planting_date;
        assert_matches!(h.service.create(&input).await, Err(CoreError::Validation(_)));
        assert!(h.crops.is_empty().await);
    }

    #[tokio::test]
    async fn create_requires_active_farmer() {
        let h = harness().await;
        let missing = draft(999, "Coffee", "Castillo", "Antioquia", 2.5);
        assert_matches!(
            h.service.create(&missing).await,
            Err(CoreError::NotFound { entity: "Farmer", id: 999 })
        );

        h.farmers.deactivate(h.farmer.id).await;
        let inactive = draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5);
        assert_matches!(
            h.service.create(&inactive).await,
            Err(CoreError::NotFound { entity: "Farmer", .. })
        );
    }

    // -- status --

    #[tokio::test]
    async fn audit_trail_counts_every_change() {
        let h = harness().await;
        let crop = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5))
            .await
            .unwrap();

        for status in ["planted", "growing", "mature"] {
            h.service
                .update_status(crop.id, status, Some("field visit"), h.farmer.id)
                .await
                .unwrap();
        }
        h.clock.set(ts(2025, 12, 10));
        let harvested = h
            .service
            .record_harvest(crop.id, &harvest(40.0, Some("premium")), h.farmer.id)
            .await
            .unwrap();

        assert_eq!(harvested.status_updates.len(), 4);
        let last = harvested.status_updates.last().unwrap();
        assert_eq!(last.status, harvested.status);
        assert_eq!(last.notes.as_deref(), Some("Harvested 40 bags"));
    }

    #[tokio::test]
    async fn unknown_status_is_validation_error() {
        let h = harness().await;
        let crop = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5))
            .await
            .unwrap();
        assert_matches!(
            h.service.update_status(crop.id, "rotten", None, 1).await,
            Err(CoreError::Validation(_))
        );
        let stored = h.service.get(crop.id).await.unwrap();
        assert!(stored.status_updates.is_empty());
    }

    #[tokio::test]
    async fn update_missing_or_inactive_is_not_found() {
        let h = harness().await;
        assert_matches!(
            h.service.update_status(404, "growing", None, 1).await,
            Err(CoreError::NotFound { entity: "Crop", id: 404 })
        );

        let crop = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5))
            .await
            .unwrap();
        h.service.deactivate(crop.id, h.farmer.id).await.unwrap();
        assert_matches!(
            h.service.update_status(crop.id, "growing", None, 1).await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn harvested_status_sets_actual_harvest() {
        let h = harness().await;
        let crop = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5))
            .await
            .unwrap();
        h.clock.set(ts(2025, 12, 1));
        let updated = h
            .service
            .update_status(crop.id, "harvested", None, h.farmer.id)
            .await
            .unwrap();
        assert_eq!(updated.actual_harvest, Some(ts(2025, 12, 1)));
    }

    #[tokio::test]
    async fn permissive_policy_allows_sold_to_planned() {
        let h = harness().await;
        let crop = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5))
            .await
            .unwrap();
        h.service.update_status(crop.id, "sold", None, 1).await.unwrap();
        let back = h
            .service
            .update_status(crop.id, "planned", Some("data entry fix"), 1)
            .await
            .unwrap();
        assert_eq!(back.status, CropStatus::Planned);
        assert_eq!(back.status_updates.len(), 2);
    }

    #[tokio::test]
    async fn forward_only_policy_rejects_backward_moves() {
        let h = harness_with(TransitionPolicy::ForwardOnly).await;
        let crop = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5))
            .await
            .unwrap();
        h.service.update_status(crop.id, "sold", None, 1).await.unwrap();
        assert_matches!(
            h.service.update_status(crop.id, "planned", None, 1).await,
            Err(CoreError::Conflict(_))
        );
        assert_matches!(
            h.service.record_harvest(crop.id, &harvest(1.0, None), 1).await,
            Err(CoreError::Conflict(_))
        );
        let stored = h.service.get(crop.id).await.unwrap();
        assert_eq!(stored.status, CropStatus::Sold);
        assert_eq!(stored.status_updates.len(), 1);
    }

    #[tokio::test]
    async fn only_owner_can_deactivate_or_restore() {
        let h = harness().await;
        let crop = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5))
            .await
            .unwrap();
        let stranger = h.farmer.id + 1;

        assert_matches!(
            h.service.deactivate(crop.id, stranger).await,
            Err(CoreError::Forbidden(_))
        );
        assert!(h.service.get(crop.id).await.unwrap().is_active);

        h.service.deactivate(crop.id, h.farmer.id).await.unwrap();
        assert_matches!(
            h.service.restore(crop.id, stranger).await,
            Err(CoreError::Forbidden(_))
        );
        assert_matches!(h.service.get(crop.id).await, Err(CoreError::NotFound { .. }));
        assert_matches!(
            h.service.restore(404, h.farmer.id).await,
            Err(CoreError::NotFound { entity: "Crop", id: 404 })
        );
    }

    /// Holds every read until two callers have read, so both act on the
    /// same snapshot.
    struct LockstepReads {
        inner: MemoryCropStore,
        barrier: tokio::sync::Barrier,
    }

    #[async_trait]
    impl CropStore for LockstepReads {
        async fn insert(&self, crop: &crate::crop::NewCrop) -> CoreResult<CropRecord> {
            self.inner.insert(crop).await
        }
        async fn find_by_id(&self, id: DbId) -> CoreResult<Option<CropRecord>> {
            let found = self.inner.find_by_id(id).await;
            self.barrier.wait().await;
            found
        }
        async fn search(&self, text: Option<&str>, filter: &CropFilter) -> CoreResult<Vec<CropRecord>> {
            self.inner.search(text, filter).await
        }
        async fn find_harvest_window(
            &self,
            statuses: &[CropStatus],
            cutoff: Timestamp,
        ) -> CoreResult<Vec<CropRecord>> {
            self.inner.find_harvest_window(statuses, cutoff).await
        }
        async fn apply_status_change(
            &self,
            id: DbId,
            change: &StatusChange,
            policy: TransitionPolicy,
        ) -> CoreResult<Option<CropRecord>> {
            self.inner.apply_status_change(id, change, policy).await
        }
        async fn set_active(&self, id: DbId, active: bool, at: Timestamp) -> CoreResult<bool> {
            self.inner.set_active(id, active, at).await
        }
        async fn statistics(&self) -> CoreResult<CropStatistics> {
            self.inner.statistics().await
        }
    }

    #[tokio::test]
    async fn concurrent_updates_cannot_move_backward_under_forward_only() {
        let h = harness_with(TransitionPolicy::ForwardOnly).await;
        let crop = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5))
            .await
            .unwrap();
        h.service.update_status(crop.id, "growing", None, 1).await.unwrap();

        let service = CropService::new(
            Arc::new(LockstepReads {
                inner: h.crops.clone(),
                barrier: tokio::sync::Barrier::new(2),
            }),
            Arc::new(h.farmers.clone()),
            h.clock.clone(),
            colombian_settings(TransitionPolicy::ForwardOnly),
        );

        let (to_mature, to_sold) = tokio::join!(
            service.update_status(crop.id, "mature", None, 1),
            service.update_status(crop.id, "sold", None, 1),
        );
        assert!(to_sold.is_ok());
        if let Err(err) = to_mature {
            assert_matches!(err, CoreError::Conflict(_));
        }

        let stored = h.crops.find_by_id(crop.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CropStatus::Sold);
        let trail: Vec<CropStatus> = stored.status_updates.iter().map(|u| u.status).collect();
        assert!(trail.windows(2).all(|w| w[0] <= w[1]), "trail went backward: {trail:?}");
    }

    // -- harvest --

    #[tokio::test]
    async fn harvest_date_is_idempotent() {
        let h = harness().await;
        let crop = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5))
            .await
            .unwrap();

        h.clock.set(ts(2025, 12, 10));
        let first = h
            .service
            .record_harvest(crop.id, &harvest(40.0, Some("grade-a")), 1)
            .await
            .unwrap();
        h.clock.advance(Duration::days(3));
        let second = h
            .service
            .record_harvest(crop.id, &harvest(42.0, None), 1)
            .await
            .unwrap();

        assert_eq!(first.actual_harvest, Some(ts(2025, 12, 10)));
        assert_eq!(second.actual_harvest, first.actual_harvest);
        assert_eq!(second.quantity, Some(42.0));
        assert_eq!(second.quality_grade, Some(QualityGrade::GradeA));
        assert_eq!(second.status_updates.len(), 2);
    }

    #[tokio::test]
    async fn harvest_validates_outcome() {
        let h = harness().await;
        let crop = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5))
            .await
            .unwrap();
        assert_matches!(
            h.service.record_harvest(crop.id, &harvest(-1.0, None), 1).await,
            Err(CoreError::Validation(_))
        );
        let bad_unit = RecordHarvest {
            quantity: 3.0,
            unit: "sacks".into(),
            quality_grade: None,
        };
        assert_matches!(
            h.service.record_harvest(crop.id, &bad_unit, 1).await,
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            h.service.record_harvest(77, &harvest(1.0, None), 1).await,
            Err(CoreError::NotFound { .. })
        );
    }

    // -- queries --

    #[tokio::test]
    async fn statistics_over_three_records() {
        let h = harness().await;
        for (variety, size) in [("Castillo", 2.5), ("Caturra", 1.8), ("Geisha", 3.0)] {
            h.service
                .create(&draft(h.farmer.id, "Coffee", variety, "Antioquia", size))
                .await
                .unwrap();
        }
        let stats = h.service.statistics().await.unwrap();
        assert_eq!(stats.total_count, 3);
        assert!((stats.total_farm_size - 7.3).abs() < 1e-9);
    }

    #[tokio::test]
    async fn search_coffee_in_antioquia() {
        let h = harness().await;
        let hit = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5))
            .await
            .unwrap();
        h.service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Huila", 2.5))
            .await
            .unwrap();
        h.service
            .create(&draft(h.farmer.id, "Cacao", "CCN-51", "Antioquia", 2.5))
            .await
            .unwrap();
        let hidden = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Geisha", "Antioquia", 2.5))
            .await
            .unwrap();
        h.service.deactivate(hidden.id, h.farmer.id).await.unwrap();

        let filter = CropFilter {
            state: Some("Antioquia".into()),
            ..CropFilter::default()
        };
        let found = h.service.search(Some("coffee"), &filter).await.unwrap();
        assert_eq!(found.iter().map(|c| c.id).collect::<Vec<_>>(), vec![hit.id]);
    }

    #[tokio::test]
    async fn listings_carry_farmer_summary() {
        let h = harness().await;
        h.service
            .create(&draft(h.farmer.id, "Banana", "Gros Michel", "Antioquia", 1.0))
            .await
            .unwrap();
        let listings = h
            .service
            .search_listings(Some("  "), &CropFilter::default())
            .await
            .unwrap();
        assert_eq!(listings.len(), 1);
        let farmer = listings[0].farmer.as_ref().unwrap();
        assert_eq!(farmer.name, "Lucía Restrepo");
        assert_eq!(farmer.state, "Antioquia");

        let json = serde_json::to_value(&listings[0]).unwrap();
        assert_eq!(json["crop_type"], "Banana");
        assert_eq!(json["farmer"]["id"], h.farmer.id);
    }

    #[tokio::test]
    async fn deactivation_hides_record_everywhere() {
        let h = harness().await;
        let crop = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5))
            .await
            .unwrap();
        h.service.update_status(crop.id, "mature", None, 1).await.unwrap();
        h.clock.set(ts(2025, 12, 1));
        assert_eq!(h.service.upcoming_harvests(None).await.unwrap().len(), 1);

        h.service.deactivate(crop.id, h.farmer.id).await.unwrap();
        assert!(h
            .service
            .search(None, &CropFilter::default())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(h.service.statistics().await.unwrap().total_count, 0);
        assert!(h.service.upcoming_harvests(None).await.unwrap().is_empty());
        assert_matches!(h.service.get(crop.id).await, Err(CoreError::NotFound { .. }));

        let stored = h.crops.find_by_id(crop.id).await.unwrap().unwrap();
        assert_eq!(stored.variety, "Castillo");
        assert!(!stored.is_active);

        assert_matches!(
            h.service.deactivate(crop.id, h.farmer.id).await,
            Err(CoreError::NotFound { .. })
        );
        let restored = h.service.restore(crop.id, h.farmer.id).await.unwrap();
        assert!(restored.is_active);
    }

    #[tokio::test]
    async fn upcoming_harvests_window() {
        let h = harness().await;
        let soon = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5))
            .await
            .unwrap();
        let planned = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Caturra", "Antioquia", 2.5))
            .await
            .unwrap();
        h.service.update_status(soon.id, "growing", None, 1).await.unwrap();

        h.clock.set(ts(2025, 11, 10));
        assert!(h.service.upcoming_harvests(None).await.unwrap().is_empty());
        let wide = h.service.upcoming_harvests(Some(40)).await.unwrap();
        assert_eq!(wide.iter().map(|c| c.id).collect::<Vec<_>>(), vec![soon.id]);
        assert!(!wide.iter().any(|c| c.id == planned.id));

        assert_matches!(
            h.service.upcoming_harvests(Some(-1)).await,
            Err(CoreError::Validation(_))
        );
    }

    #[tokio::test]
    async fn convenience_finders() {
        let h = harness().await;
        let crop = h
            .service
            .create(&draft(h.farmer.id, "Cacao", "CCN-51", "Huila", 2.5))
            .await
            .unwrap();
        assert_eq!(h.service.list_by_farmer(h.farmer.id).await.unwrap().len(), 1);
        assert_eq!(h.service.list_by_status("planned").await.unwrap().len(), 1);
        assert!(h.service.list_by_status("growing").await.unwrap().is_empty());
        assert_eq!(h.service.list_by_crop_type("Cacao").await.unwrap()[0].id, crop.id);
        assert!(h.service.list_by_crop_type("Maize").await.is_err());
        assert_eq!(
            h.service
                .list_by_location("Huila", Some("Jardín"))
                .await
                .unwrap()
                .len(),
            1
        );
        assert!(h
            .service
            .list_by_location("Huila", Some("Pitalito"))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn progress_clamps_before_and_after() {
        let h = harness().await;
        let crop = h
            .service
            .create(&draft(h.farmer.id, "Coffee", "Castillo", "Antioquia", 2.5))
            .await
            .unwrap();
        h.clock.set(ts(2025, 6, 15));
        assert_eq!(h.service.progress(crop.id).await.unwrap().growth_progress, 0);
        h.clock.set(ts(2026, 1, 15));
        let late = h.service.progress(crop.id).await.unwrap();
        assert_eq!(late.growth_progress, 100);
        assert_eq!(late.days_to_harvest, -31);
    }

    // -- timeouts --

    struct SlowStore;

    #[async_trait]
    impl CropStore for SlowStore {
        async fn insert(&self, _: &crate::crop::NewCrop) -> CoreResult<CropRecord> {
            unreachable!()
        }
        async fn find_by_id(&self, _: DbId) -> CoreResult<Option<CropRecord>> {
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
            Ok(None)
        }
        async fn search(&self, _: Option<&str>, _: &CropFilter) -> CoreResult<Vec<CropRecord>> {
            unreachable!()
        }
        async fn find_harvest_window(
            &self,
            _: &[CropStatus],
            _: Timestamp,
        ) -> CoreResult<Vec<CropRecord>> {
            unreachable!()
        }
        async fn apply_status_change(
            &self,
            _: DbId,
            _: &StatusChange,
            _: TransitionPolicy,
        ) -> CoreResult<Option<CropRecord>> {
            unreachable!()
        }
        async fn set_active(&self, _: DbId, _: bool, _: Timestamp) -> CoreResult<bool> {
            unreachable!()
        }
        async fn statistics(&self) -> CoreResult<CropStatistics> {
            unreachable!()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_store_surfaces_transient_timeout() {
        let service = CropService::new(
            Arc::new(SlowStore),
            Arc::new(MemoryFarmerDirectory::new()),
            Arc::new(FixedClock::new(ts(2025, 7, 1))),
            ServiceSettings {
                store_timeout: std::time::Duration::from_millis(50),
                ..ServiceSettings::default()
            },
        );
        let err = service.get(1).await.unwrap_err();
        assert_matches!(err, CoreError::Timeout { operation: "find_crop", timeout_ms: 50 });
        assert!(err.is_transient());
    }
}
