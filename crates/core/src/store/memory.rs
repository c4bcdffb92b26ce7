//! In-memory store implementations.
//!
//! Records live in `BTreeMap`s keyed by sequential ids, so iteration order is
//! insertion order. Each mutation holds a single write lock for its duration.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CropStore, FarmerDirectory};
use crate::crop::{CropRecord, NewCrop};
use crate::error::CoreError;
use crate::farmer::{
    clamp_reputation, farmer_matches_text, Farmer, FarmerChanges, FarmerFilter, FarmerStatistics,
    FarmerSummary, NewFarmer, DEFAULT_REPUTATION,
};
use crate::lifecycle::{StatusChange, TransitionPolicy};
use crate::query::{in_harvest_window, matches_text, CropFilter, CropStatistics};
use crate::status::{CropStatus, VerificationStatus};
use crate::types::{CoreResult, DbId, Timestamp};

// ---------------------------------------------------------------------------
// Crops
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct CropTable {
    next_id: DbId,
    rows: BTreeMap<DbId, CropRecord>,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryCropStore {
    inner: Arc<RwLock<CropTable>>,
}

impl MemoryCropStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, including inactive ones.
    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.rows.is_empty()
    }
}

#[async_trait]
impl CropStore for MemoryCropStore {
    async fn insert(&self, crop: &NewCrop) -> CoreResult<CropRecord> {
        let mut table = self.inner.write().await;
        table.next_id += 1;
        let record = CropRecord {
            id: table.next_id,
            farmer_id: crop.farmer_id,
            blockchain_tx_hash: crop.blockchain_tx_hash.clone(),
            crop_type: crop.crop_type.clone(),
            variety: crop.variety.clone(),
            planting_date: crop.planting_date,
            expected_harvest: crop.expected_harvest,
            actual_harvest: None,
            farm_location: crop.farm_location.clone(),
            farm_size: crop.farm_size,
            status: CropStatus::Planned,
            quality_grade: None,
            quantity: None,
            unit: None,
            notes: crop.notes.clone(),
            is_active: true,
            status_updates: Vec::new(),
            created_at: crop.recorded_at,
            updated_at: crop.recorded_at,
        };
        table.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: DbId) -> CoreResult<Option<CropRecord>> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn search(&self, text: Option<&str>, filter: &CropFilter) -> CoreResult<Vec<CropRecord>> {
        let table = self.inner.read().await;
        Ok(table
            .rows
            .values()
            .filter(|c| c.is_active)
            .filter(|c| text.map_or(true, |t| matches_text(c, t)))
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }

    async fn find_harvest_window(
        &self,
        statuses: &[CropStatus],
        cutoff: Timestamp,
    ) -> CoreResult<Vec<CropRecord>> {
        let table = self.inner.read().await;
        Ok(table
            .rows
            .values()
            .filter(|c| c.is_active && in_harvest_window(c, statuses, cutoff))
            .cloned()
            .collect())
    }

    async fn apply_status_change(
        &self,
        id: DbId,
        change: &StatusChange,
        policy: TransitionPolicy,
    ) -> CoreResult<Option<CropRecord>> {
        let mut table = self.inner.write().await;
        match table.rows.get_mut(&id) {
            Some(crop) if crop.is_active => {
                policy.check(crop.status, change.status)?;
                change.validate_against(crop)?;
                change.apply_to(crop);
                Ok(Some(crop.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set_active(&self, id: DbId, active: bool, at: Timestamp) -> CoreResult<bool> {
        let mut table = self.inner.write().await;
        match table.rows.get_mut(&id) {
            Some(crop) if crop.is_active != active => {
                crop.is_active = active;
                crop.updated_at = at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn statistics(&self) -> CoreResult<CropStatistics> {
        let table = self.inner.read().await;
        Ok(CropStatistics::from_records(table.rows.values()))
    }
}

// ---------------------------------------------------------------------------
// Farmers
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct FarmerTable {
    next_id: DbId,
    rows: BTreeMap<DbId, Farmer>,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryFarmerDirectory {
    inner: Arc<RwLock<FarmerTable>>,
}

impl MemoryFarmerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a farmer inactive. Test helper for the directory's soft delete.
    pub async fn deactivate(&self, id: DbId) -> bool {
        let mut table = self.inner.write().await;
        match table.rows.get_mut(&id) {
            Some(farmer) if farmer.is_active => {
                farmer.is_active = false;
                true
            }
            _ => false,
        }
    }

    /// Set a farmer's verification outcome. Test helper; verification
    /// decisions are made outside the directory.
    pub async fn set_verification_status(&self, id: DbId, status: VerificationStatus) -> bool {
        let mut table = self.inner.write().await;
        match table.rows.get_mut(&id) {
            Some(farmer) => {
                farmer.verification_status = status;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl FarmerDirectory for MemoryFarmerDirectory {
    async fn insert(&self, farmer: &NewFarmer) -> CoreResult<Farmer> {
        let mut table = self.inner.write().await;
        if table
            .rows
            .values()
            .any(|f| f.wallet_address == farmer.wallet_address)
        {
            return Err(CoreError::Conflict(format!(
                "Farmer with wallet address '{}' already exists",
                farmer.wallet_address
            )));
        }
        if table
            .rows
            .values()
            .any(|f| f.phone_number == farmer.phone_number)
        {
            return Err(CoreError::Conflict(format!(
                "Farmer with phone number '{}' already exists",
                farmer.phone_number
            )));
        }

        table.next_id += 1;
        let record = Farmer {
            id: table.next_id,
            wallet_address: farmer.wallet_address.clone(),
            phone_number: farmer.phone_number.clone(),
            name: farmer.name.clone(),
            email: farmer.email.clone(),
            location: farmer.location.clone(),
            farm_size: farmer.farm_size,
            crops: farmer.crops.clone(),
            verification_status: VerificationStatus::Pending,
            reputation_score: DEFAULT_REPUTATION,
            total_sales: 0,
            total_earnings: 0.0,
            is_active: true,
            joined_at: farmer.joined_at,
            last_login_at: None,
            created_at: farmer.joined_at,
            updated_at: farmer.joined_at,
        };
        table.rows.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: DbId) -> CoreResult<Option<Farmer>> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn find_by_wallet(&self, wallet_address: &str) -> CoreResult<Option<Farmer>> {
        let table = self.inner.read().await;
        Ok(table
            .rows
            .values()
            .find(|f| f.wallet_address == wallet_address)
            .cloned())
    }

    async fn search(&self, text: Option<&str>, filter: &FarmerFilter) -> CoreResult<Vec<Farmer>> {
        let table = self.inner.read().await;
        Ok(table
            .rows
            .values()
            .filter(|f| f.is_active)
            .filter(|f| text.map_or(true, |t| farmer_matches_text(f, t)))
            .filter(|f| filter.matches(f))
            .cloned()
            .collect())
    }

    async fn statistics(&self) -> CoreResult<FarmerStatistics> {
        let table = self.inner.read().await;
        Ok(FarmerStatistics::from_farmers(table.rows.values()))
    }

    async fn find_summaries(&self, ids: &[DbId]) -> CoreResult<Vec<FarmerSummary>> {
        let table = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| table.rows.get(id))
            .map(Farmer::summary)
            .collect())
    }

    async fn record_sale(&self, id: DbId, amount: f64, at: Timestamp) -> CoreResult<Option<Farmer>> {
        let mut table = self.inner.write().await;
        Ok(table.rows.get_mut(&id).filter(|f| f.is_active).map(|farmer| {
            farmer.total_sales += 1;
            farmer.total_earnings += amount;
            farmer.updated_at = at;
            farmer.clone()
        }))
    }

    async fn update_profile(
        &self,
        id: DbId,
        changes: &FarmerChanges,
        at: Timestamp,
    ) -> CoreResult<Option<Farmer>> {
        let mut table = self.inner.write().await;
        if let Some(phone) = &changes.phone_number {
            if table
                .rows
                .values()
                .any(|f| f.id != id && f.phone_number == *phone)
            {
                return Err(CoreError::Conflict(format!(
                    "Farmer with phone number '{phone}' already exists"
                )));
            }
        }
        Ok(table.rows.get_mut(&id).filter(|f| f.is_active).map(|farmer| {
            changes.apply_to(farmer, at);
            farmer.clone()
        }))
    }

    async fn record_login(&self, id: DbId, at: Timestamp) -> CoreResult<Option<Farmer>> {
        let mut table = self.inner.write().await;
        Ok(table.rows.get_mut(&id).filter(|f| f.is_active).map(|farmer| {
            farmer.last_login_at = Some(at);
            farmer.clone()
        }))
    }

    async fn adjust_reputation(
        &self,
        id: DbId,
        delta: i32,
        at: Timestamp,
    ) -> CoreResult<Option<Farmer>> {
        let mut table = self.inner.write().await;
        Ok(table.rows.get_mut(&id).filter(|f| f.is_active).map(|farmer| {
            farmer.reputation_score = clamp_reputation(farmer.reputation_score, delta);
            farmer.updated_at = at;
            farmer.clone()
        }))
    }
}
