//! `farmchain-core` store traits backed by PostgreSQL.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use farmchain_core::crop::{CropRecord, NewCrop};
use farmchain_core::error::CoreError;
use farmchain_core::farmer::{
    Farmer, FarmerChanges, FarmerFilter, FarmerStatistics, FarmerSummary, NewFarmer,
};
use farmchain_core::lifecycle::{StatusChange, TransitionPolicy};
use farmchain_core::query::{CropFilter, CropStatistics};
use farmchain_core::status::{CropStatus, StatusId};
use farmchain_core::store::{CropStore, FarmerDirectory};
use farmchain_core::types::{CoreResult, DbId, Timestamp};

use crate::models::corrupt;
use crate::models::crop::{CropRow, StatusUpdateRow};
use crate::repositories::{CropRepo, FarmerRepo, StatusUpdateRepo, StatusWrite};
use crate::DbPool;

/// Map a sqlx error into the domain error.
///
/// Unique violations become `Conflict`; everything else is logged and
/// reported as an opaque infrastructure failure.
pub fn map_db_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique constraint");
            return CoreError::Conflict(format!("Duplicate value violates {constraint}"));
        }
    }
    tracing::error!(error = %err, "Database error");
    CoreError::Infrastructure(err.to_string())
}

// ---------------------------------------------------------------------------
// Crops
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgCropStore {
    pool: DbPool,
}

impl PgCropStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Load audit trails for `rows` and assemble records, keeping row order.
    async fn hydrate(&self, rows: Vec<CropRow>) -> CoreResult<Vec<CropRecord>> {
        let ids: Vec<DbId> = rows.iter().map(|r| r.id).collect();
        let mut updates: HashMap<DbId, Vec<StatusUpdateRow>> = HashMap::new();
        for update in StatusUpdateRepo::list_for_crops(&self.pool, &ids)
            .await
            .map_err(map_db_error)?
        {
            updates.entry(update.crop_id).or_default().push(update);
        }

        rows.into_iter()
            .map(|row| {
                let trail = updates.remove(&row.id).unwrap_or_default();
                row.into_record(trail)
            })
            .collect()
    }

    async fn hydrate_one(&self, row: CropRow) -> CoreResult<CropRecord> {
        let mut records = self.hydrate(vec![row]).await?;
        records
            .pop()
            .ok_or_else(|| CoreError::Infrastructure("crop row vanished during load".into()))
    }
}

#[async_trait]
impl CropStore for PgCropStore {
    async fn insert(&self, crop: &NewCrop) -> CoreResult<CropRecord> {
        let row = CropRepo::create(&self.pool, crop)
            .await
            .map_err(map_db_error)?;
        row.into_record(Vec::new())
    }

    async fn find_by_id(&self, id: DbId) -> CoreResult<Option<CropRecord>> {
        match CropRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?
        {
            Some(row) => self.hydrate_one(row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn search(&self, text: Option<&str>, filter: &CropFilter) -> CoreResult<Vec<CropRecord>> {
        let rows = CropRepo::search(&self.pool, text, filter)
            .await
            .map_err(map_db_error)?;
        self.hydrate(rows).await
    }

    async fn find_harvest_window(
        &self,
        statuses: &[CropStatus],
        cutoff: Timestamp,
    ) -> CoreResult<Vec<CropRecord>> {
        let ids: Vec<StatusId> = statuses.iter().map(|s| s.id()).collect();
        let rows = CropRepo::find_harvest_window(&self.pool, &ids, cutoff)
            .await
            .map_err(map_db_error)?;
        self.hydrate(rows).await
    }

    async fn apply_status_change(
        &self,
        id: DbId,
        change: &StatusChange,
        policy: TransitionPolicy,
    ) -> CoreResult<Option<CropRecord>> {
        let forward_only = policy == TransitionPolicy::ForwardOnly;
        match CropRepo::apply_status_change(&self.pool, id, change, forward_only)
            .await
            .map_err(map_db_error)?
        {
            StatusWrite::Applied(row) => self.hydrate_one(row).await.map(Some),
            StatusWrite::Missing => Ok(None),
            StatusWrite::Rejected { current } => {
                let current =
                    CropStatus::from_id(current).ok_or_else(|| corrupt("status_id", current))?;
                policy.check(current, change.status).map(|()| None)
            }
        }
    }

    async fn set_active(&self, id: DbId, active: bool, at: Timestamp) -> CoreResult<bool> {
        CropRepo::set_active(&self.pool, id, active, at)
            .await
            .map_err(map_db_error)
    }

    async fn statistics(&self) -> CoreResult<CropStatistics> {
        let rows = CropRepo::statistics(&self.pool)
            .await
            .map_err(map_db_error)?;
        let totals = rows.totals;

        let mut status_breakdown = BTreeMap::new();
        for (status_id, count) in rows.by_status {
            let status =
                CropStatus::from_id(status_id).ok_or_else(|| corrupt("status_id", status_id))?;
            status_breakdown.insert(status.as_str().to_string(), count as u64);
        }

        Ok(CropStatistics {
            total_count: totals.total_count as u64,
            total_farm_size: totals.total_farm_size,
            status_breakdown,
            crop_type_breakdown: rows
                .by_crop_type
                .into_iter()
                .map(|(crop_type, count)| (crop_type, count as u64))
                .collect(),
            average_growth_duration_days: totals.average_growth_duration_days,
        })
    }
}

// ---------------------------------------------------------------------------
// Farmers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgFarmerDirectory {
    pool: DbPool,
}

impl PgFarmerDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FarmerDirectory for PgFarmerDirectory {
    async fn insert(&self, farmer: &NewFarmer) -> CoreResult<Farmer> {
        FarmerRepo::create(&self.pool, farmer)
            .await
            .map_err(map_db_error)?
            .try_into()
    }

    async fn find_by_id(&self, id: DbId) -> CoreResult<Option<Farmer>> {
        FarmerRepo::find_by_id(&self.pool, id)
            .await
            .map_err(map_db_error)?
            .map(Farmer::try_from)
            .transpose()
    }

    async fn find_by_wallet(&self, wallet_address: &str) -> CoreResult<Option<Farmer>> {
        FarmerRepo::find_by_wallet(&self.pool, wallet_address)
            .await
            .map_err(map_db_error)?
            .map(Farmer::try_from)
            .transpose()
    }

    async fn search(&self, text: Option<&str>, filter: &FarmerFilter) -> CoreResult<Vec<Farmer>> {
        FarmerRepo::search(&self.pool, text, filter)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(Farmer::try_from)
            .collect()
    }

    async fn statistics(&self) -> CoreResult<FarmerStatistics> {
        FarmerRepo::statistics(&self.pool)
            .await
            .map(FarmerStatistics::from)
            .map_err(map_db_error)
    }

    async fn find_summaries(&self, ids: &[DbId]) -> CoreResult<Vec<FarmerSummary>> {
        FarmerRepo::find_summaries(&self.pool, ids)
            .await
            .map_err(map_db_error)?
            .into_iter()
            .map(FarmerSummary::try_from)
            .collect()
    }

    async fn record_sale(&self, id: DbId, amount: f64, at: Timestamp) -> CoreResult<Option<Farmer>> {
        FarmerRepo::record_sale(&self.pool, id, amount, at)
            .await
            .map_err(map_db_error)?
            .map(Farmer::try_from)
            .transpose()
    }

    async fn update_profile(
        &self,
        id: DbId,
        changes: &FarmerChanges,
        at: Timestamp,
    ) -> CoreResult<Option<Farmer>> {
        FarmerRepo::update_profile(&self.pool, id, changes, at)
            .await
            .map_err(map_db_error)?
            .map(Farmer::try_from)
            .transpose()
    }

    async fn record_login(&self, id: DbId, at: Timestamp) -> CoreResult<Option<Farmer>> {
        FarmerRepo::record_login(&self.pool, id, at)
            .await
            .map_err(map_db_error)?
            .map(Farmer::try_from)
            .transpose()
    }

    async fn adjust_reputation(
        &self,
        id: DbId,
        delta: i32,
        at: Timestamp,
    ) -> CoreResult<Option<Farmer>> {
        FarmerRepo::adjust_reputation(&self.pool, id, delta, at)
            .await
            .map_err(map_db_error)?
            .map(Farmer::try_from)
            .transpose()
    }
}
