//! Rows for the `crops` and `crop_status_updates` tables.

use farmchain_core::crop::{
    Coordinates, CropRecord, FarmLocation, HarvestUnit, QualityGrade, StatusUpdate,
};
use farmchain_core::error::CoreError;
use farmchain_core::status::{CropStatus, StatusId};
use farmchain_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::corrupt;

/// A row from the `crops` table. Location is stored flat.
#[derive(Debug, Clone, FromRow)]
pub struct CropRow {
    pub id: DbId,
    pub farmer_id: DbId,
    pub blockchain_tx_hash: Option<String>,
    pub crop_type: String,
    pub variety: String,
    pub planting_date: Timestamp,
    pub expected_harvest: Timestamp,
    pub actual_harvest: Option<Timestamp>,
    pub state: String,
    pub lga: String,
    pub longitude: f64,
    pub latitude: f64,
    pub address: Option<String>,
    pub farm_size: f64,
    pub status_id: StatusId,
    pub quality_grade: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the append-only `crop_status_updates` table.
#[derive(Debug, Clone, FromRow)]
pub struct StatusUpdateRow {
    pub id: DbId,
    pub crop_id: DbId,
    pub status_id: StatusId,
    pub notes: Option<String>,
    pub updated_by: DbId,
    pub created_at: Timestamp,
}

impl StatusUpdateRow {
    pub fn into_update(self) -> Result<StatusUpdate, CoreError> {
        Ok(StatusUpdate {
            status: crop_status(self.status_id)?,
            date: self.created_at,
            notes: self.notes,
            updated_by: self.updated_by,
        })
    }
}

/// Aggregate row for crop statistics.
#[derive(Debug, Clone, FromRow)]
pub struct CropTotalsRow {
    pub total_count: i64,
    pub total_farm_size: f64,
    pub average_growth_duration_days: Option<f64>,
}

impl CropRow {
    /// Combine the row with its audit entries, which must be in id order.
    pub fn into_record(self, updates: Vec<StatusUpdateRow>) -> Result<CropRecord, CoreError> {
        let status_updates = updates
            .into_iter()
            .map(StatusUpdateRow::into_update)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CropRecord {
            id: self.id,
            farmer_id: self.farmer_id,
            blockchain_tx_hash: self.blockchain_tx_hash,
            crop_type: self.crop_type,
            variety: self.variety,
            planting_date: self.planting_date,
            expected_harvest: self.expected_harvest,
            actual_harvest: self.actual_harvest,
            farm_location: FarmLocation {
                state: self.state,
                lga: self.lga,
                coordinates: Coordinates {
                    longitude: self.longitude,
                    latitude: self.latitude,
                },
                address: self.address,
            },
            farm_size: self.farm_size,
            status: crop_status(self.status_id)?,
            quality_grade: self
                .quality_grade
                .as_deref()
                .map(|g| QualityGrade::parse(g).map_err(|e| corrupt("crops.quality_grade", e)))
                .transpose()?,
            quantity: self.quantity,
            unit: self
                .unit
                .as_deref()
                .map(|u| HarvestUnit::parse(u).map_err(|e| corrupt("crops.unit", e)))
                .transpose()?,
            notes: self.notes,
            is_active: self.is_active,
            status_updates,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn crop_status(id: StatusId) -> Result<CropStatus, CoreError> {
    CropStatus::from_id(id).ok_or_else(|| corrupt("status_id", id))
}
