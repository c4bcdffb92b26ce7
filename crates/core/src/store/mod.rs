//! Persistence traits consumed by the services.
//!
//! `farmchain-db` implements these over PostgreSQL; [`memory`] provides
//! in-process implementations for tests and local development.

pub mod memory;

use async_trait::async_trait;

use crate::crop::{CropRecord, NewCrop};
use crate::farmer::{Farmer, FarmerChanges, FarmerFilter, FarmerStatistics, FarmerSummary, NewFarmer};
use crate::lifecycle::{StatusChange, TransitionPolicy};
use crate::query::{CropFilter, CropStatistics};
use crate::status::CropStatus;
use crate::types::{CoreResult, DbId, Timestamp};

/// Crop record persistence.
#[async_trait]
pub trait CropStore: Send + Sync {
    /// Insert a validated planting in status `planned`, active, with no history.
    async fn insert(&self, crop: &NewCrop) -> CoreResult<CropRecord>;

    /// Fetch a record by id, active or not.
    async fn find_by_id(&self, id: DbId) -> CoreResult<Option<CropRecord>>;

    /// Active records matching `text` (if any) and `filter`, in insertion order.
    async fn search(&self, text: Option<&str>, filter: &CropFilter) -> CoreResult<Vec<CropRecord>>;

    /// Active records in one of `statuses` expected on or before `cutoff`.
    async fn find_harvest_window(
        &self,
        statuses: &[CropStatus],
        cutoff: Timestamp,
    ) -> CoreResult<Vec<CropRecord>>;

    /// Apply a status change and its audit entry as one atomic write.
    ///
    /// `policy` is checked against the status current at write time, so a
    /// concurrent writer cannot slip a backward move past it. Returns `None`
    /// when the record is unknown or inactive.
    async fn apply_status_change(
        &self,
        id: DbId,
        change: &StatusChange,
        policy: TransitionPolicy,
    ) -> CoreResult<Option<CropRecord>>;

    /// Set the soft-delete flag. Returns `false` when no row changed.
    async fn set_active(&self, id: DbId, active: bool, at: Timestamp) -> CoreResult<bool>;

    /// Aggregate statistics over active records.
    async fn statistics(&self) -> CoreResult<CropStatistics>;
}

/// Farmer directory persistence.
#[async_trait]
pub trait FarmerDirectory: Send + Sync {
    /// Insert a farmer. Duplicate wallet or phone yields `CoreError::Conflict`.
    async fn insert(&self, farmer: &NewFarmer) -> CoreResult<Farmer>;

    async fn find_by_id(&self, id: DbId) -> CoreResult<Option<Farmer>>;

    /// Lookup by an already-lowercased wallet address.
    async fn find_by_wallet(&self, wallet_address: &str) -> CoreResult<Option<Farmer>>;

    /// Active farmers matching `text` (if any) and `filter`, in id order.
    async fn search(&self, text: Option<&str>, filter: &FarmerFilter) -> CoreResult<Vec<Farmer>>;

    /// Aggregate statistics over active farmers.
    async fn statistics(&self) -> CoreResult<FarmerStatistics>;

    /// Summaries for the given ids. Unknown ids are skipped.
    async fn find_summaries(&self, ids: &[DbId]) -> CoreResult<Vec<FarmerSummary>>;

    /// Count one sale and add `amount` to earnings.
    async fn record_sale(&self, id: DbId, amount: f64, at: Timestamp) -> CoreResult<Option<Farmer>>;

    /// Apply a validated profile update to an active farmer. A phone number
    /// already used by another farmer yields `CoreError::Conflict`.
    async fn update_profile(
        &self,
        id: DbId,
        changes: &FarmerChanges,
        at: Timestamp,
    ) -> CoreResult<Option<Farmer>>;

    /// Stamp `last_login_at` on an active farmer.
    async fn record_login(&self, id: DbId, at: Timestamp) -> CoreResult<Option<Farmer>>;

    /// Add `delta` to the reputation score, clamped to its bounds.
    async fn adjust_reputation(
        &self,
        id: DbId,
        delta: i32,
        at: Timestamp,
    ) -> CoreResult<Option<Farmer>>;
}
