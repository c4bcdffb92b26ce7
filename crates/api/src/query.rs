//! Query-string parameter types for the crop and farmer handlers.

use farmchain_core::error::CoreError;
use farmchain_core::farmer::FarmerFilter;
use farmchain_core::query::CropFilter;
use farmchain_core::status::{CropStatus, VerificationStatus};
use farmchain_core::taxonomy::parse_list;
use farmchain_core::types::{DbId, Timestamp};
use serde::Deserialize;

/// `GET /crops` parameters: free text `q` plus the explicit filter fields.
///
/// Kept flat rather than flattening [`CropFilter`] because the urlencoded
/// deserializer cannot parse numbers through `#[serde(flatten)]`.
#[derive(Debug, Default, Deserialize)]
pub struct CropSearchParams {
    pub q: Option<String>,
    pub farmer_id: Option<DbId>,
    pub crop_type: Option<String>,
    pub status: Option<String>,
    pub state: Option<String>,
    pub lga: Option<String>,
    pub min_farm_size: Option<f64>,
    pub planting_date_from: Option<Timestamp>,
    pub planting_date_to: Option<Timestamp>,
}

impl CropSearchParams {
    /// Split into the text query and a typed filter. Unknown statuses are
    /// a validation error rather than an empty result.
    pub fn into_filter(self) -> Result<(Option<String>, CropFilter), CoreError> {
        let status = self.status.as_deref().map(CropStatus::parse).transpose()?;
        let filter = CropFilter {
            farmer_id: self.farmer_id,
            crop_type: self.crop_type,
            status,
            state: self.state,
            lga: self.lga,
            min_farm_size: self.min_farm_size,
            planting_date_from: self.planting_date_from,
            planting_date_to: self.planting_date_to,
        };
        Ok((self.q, filter))
    }
}

/// `GET /crops/upcoming-harvests` parameters.
#[derive(Debug, Deserialize)]
pub struct UpcomingHarvestParams {
    pub within_days: Option<i64>,
}

/// `GET /farmers` parameters. `crops` is a comma-separated list.
#[derive(Debug, Default, Deserialize)]
pub struct FarmerSearchParams {
    pub q: Option<String>,
    pub state: Option<String>,
    pub verification_status: Option<String>,
    pub crops: Option<String>,
    pub min_reputation_score: Option<i32>,
}

impl FarmerSearchParams {
    pub fn into_filter(self) -> Result<(Option<String>, FarmerFilter), CoreError> {
        let verification_status = self
            .verification_status
            .as_deref()
            .map(VerificationStatus::parse)
            .transpose()?;
        let filter = FarmerFilter {
            state: self.state,
            verification_status,
            crops: self.crops.as_deref().map(parse_list).unwrap_or_default(),
            min_reputation_score: self.min_reputation_score,
        };
        Ok((self.q, filter))
    }
}

/// `GET /farmers/verified` parameters.
#[derive(Debug, Deserialize)]
pub struct VerifiedFarmerParams {
    pub state: Option<String>,
}
