//! Rows for the `farmers` table.

use farmchain_core::crop::{Coordinates, FarmLocation};
use farmchain_core::error::CoreError;
use farmchain_core::farmer::{Farmer, FarmerStatistics, FarmerSummary};
use farmchain_core::status::{StatusId, VerificationStatus};
use farmchain_core::types::{DbId, Timestamp};
use sqlx::FromRow;

use super::corrupt;

#[derive(Debug, Clone, FromRow)]
pub struct FarmerRow {
    pub id: DbId,
    pub wallet_address: String,
    pub phone_number: String,
    pub name: String,
    pub email: Option<String>,
    pub state: String,
    pub lga: String,
    pub longitude: f64,
    pub latitude: f64,
    pub address: Option<String>,
    pub farm_size: f64,
    pub crops: Vec<String>,
    pub verification_status_id: StatusId,
    pub reputation_score: i32,
    pub total_sales: i64,
    pub total_earnings: f64,
    pub is_active: bool,
    pub joined_at: Timestamp,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// The directory columns attached to crop listings.
#[derive(Debug, Clone, FromRow)]
pub struct FarmerSummaryRow {
    pub id: DbId,
    pub name: String,
    pub state: String,
    pub wallet_address: String,
    pub verification_status_id: StatusId,
}

/// Directory aggregates over active farmers.
#[derive(Debug, Clone, FromRow)]
pub struct FarmerStatsRow {
    pub total_farmers: i64,
    pub verified_farmers: i64,
    pub pending_verification: i64,
    pub total_farm_size: f64,
    pub total_earnings: f64,
    pub average_reputation_score: Option<f64>,
}

impl From<FarmerStatsRow> for FarmerStatistics {
    fn from(row: FarmerStatsRow) -> Self {
        FarmerStatistics {
            total_farmers: row.total_farmers as u64,
            verified_farmers: row.verified_farmers as u64,
            pending_verification: row.pending_verification as u64,
            total_farm_size: row.total_farm_size,
            total_earnings: row.total_earnings,
            average_reputation_score: row.average_reputation_score,
        }
    }
}

impl TryFrom<FarmerRow> for Farmer {
    type Error = CoreError;

    fn try_from(row: FarmerRow) -> Result<Self, Self::Error> {
        Ok(Farmer {
            id: row.id,
            wallet_address: row.wallet_address,
            phone_number: row.phone_number,
            name: row.name,
            email: row.email,
            location: FarmLocation {
                state: row.state,
                lga: row.lga,
                coordinates: Coordinates {
                    longitude: row.longitude,
                    latitude: row.latitude,
                },
                address: row.address,
            },
            farm_size: row.farm_size,
            crops: row.crops,
            verification_status: verification_status(row.verification_status_id)?,
            reputation_score: row.reputation_score,
            total_sales: row.total_sales,
            total_earnings: row.total_earnings,
            is_active: row.is_active,
            joined_at: row.joined_at,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl TryFrom<FarmerSummaryRow> for FarmerSummary {
    type Error = CoreError;

    fn try_from(row: FarmerSummaryRow) -> Result<Self, Self::Error> {
        Ok(FarmerSummary {
            id: row.id,
            name: row.name,
            state: row.state,
            wallet_address: row.wallet_address,
            verification_status: verification_status(row.verification_status_id)?,
        })
    }
}

fn verification_status(id: StatusId) -> Result<VerificationStatus, CoreError> {
    VerificationStatus::from_id(id).ok_or_else(|| corrupt("verification_status_id", id))
}
