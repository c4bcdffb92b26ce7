//! Crop record entity, its value types, and input DTOs.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::lifecycle;
use crate::status::CropStatus;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Smallest farm size (hectares) a crop record may declare.
pub const MIN_FARM_SIZE: f64 = 0.01;

/// Largest farm size (hectares) a crop record may declare.
pub const MAX_FARM_SIZE: f64 = 1000.0;

/// Maximum length of free-text crop notes in characters.
pub const MAX_NOTES_LENGTH: usize = 1000;

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A longitude/latitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    /// Longitude must lie in [-180, 180] and latitude in [-90, 90].
    pub fn validate(&self, field: &str) -> Result<(), CoreError> {
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(CoreError::Validation(format!(
                "{field}.longitude must be between -180 and 180, got {}",
                self.longitude
            )));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(CoreError::Validation(format!(
                "{field}.latitude must be between -90 and 90, got {}",
                self.latitude
            )));
        }
        Ok(())
    }
}

/// Where a farm is: region from the taxonomy, free-text local government
/// area (or equivalent sub-region), and coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmLocation {
    pub state: String,
    pub lga: String,
    pub coordinates: Coordinates,
    #[serde(default)]
    pub address: Option<String>,
}

// ---------------------------------------------------------------------------
// Harvest outcome enums
// ---------------------------------------------------------------------------

/// Unit a harvested quantity is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HarvestUnit {
    Bags,
    Tonnes,
    Kg,
    Tubers,
    Bunches,
    Pieces,
}

impl HarvestUnit {
    pub const ALL: &'static [HarvestUnit] = &[
        Self::Bags,
        Self::Tonnes,
        Self::Kg,
        Self::Tubers,
        Self::Bunches,
        Self::Pieces,
    ];

    /// Stable string representation matching serde's `rename_all = "lowercase"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bags => "bags",
            Self::Tonnes => "tonnes",
            Self::Kg => "kg",
            Self::Tubers => "tubers",
            Self::Bunches => "bunches",
            Self::Pieces => "pieces",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Self::ALL
            .iter()
            .copied()
            .find(|u| u.as_str() == value)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|u| u.as_str()).collect();
                CoreError::Validation(format!(
                    "Invalid unit '{value}'. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

/// Quality grade assigned at harvest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityGrade {
    Premium,
    GradeA,
    GradeB,
    GradeC,
}

impl QualityGrade {
    pub const ALL: &'static [QualityGrade] =
        &[Self::Premium, Self::GradeA, Self::GradeB, Self::GradeC];

    /// Stable string representation matching serde's `rename_all = "kebab-case"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Premium => "premium",
            Self::GradeA => "grade-a",
            Self::GradeB => "grade-b",
            Self::GradeC => "grade-c",
        }
    }

    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Self::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == value)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|g| g.as_str()).collect();
                CoreError::Validation(format!(
                    "Invalid quality_grade '{value}'. Must be one of: {}",
                    valid.join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// One entry of a crop's append-only status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: CropStatus,
    pub date: Timestamp,
    pub notes: Option<String>,
    pub updated_by: DbId,
}

/// A planted or harvested crop batch owned by one farmer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropRecord {
    pub id: DbId,
    pub farmer_id: DbId,
    pub blockchain_tx_hash: Option<String>,
    pub crop_type: String,
    pub variety: String,
    pub planting_date: Timestamp,
    pub expected_harvest: Timestamp,
    pub actual_harvest: Option<Timestamp>,
    pub farm_location: FarmLocation,
    pub farm_size: f64,
    pub status: CropStatus,
    pub quality_grade: Option<QualityGrade>,
    pub quantity: Option<f64>,
    pub unit: Option<HarvestUnit>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub status_updates: Vec<StatusUpdate>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CropRecord {
    /// Percentage of the planned growing period elapsed at `now`, 0..=100.
    pub fn growth_progress(&self, now: Timestamp) -> u8 {
        lifecycle::growth_progress(self.planting_date, self.expected_harvest, now)
    }

    /// Whole days until the expected harvest, rounded up; negative when overdue.
    pub fn days_to_harvest(&self, now: Timestamp) -> i64 {
        lifecycle::days_to_harvest(self.expected_harvest, now)
    }
}

// ---------------------------------------------------------------------------
// Input DTOs
// ---------------------------------------------------------------------------

/// Request to record a new planting.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCrop {
    pub farmer_id: DbId,
    pub crop_type: String,
    pub variety: String,
    pub planting_date: Timestamp,
    pub expected_harvest: Timestamp,
    pub farm_size: f64,
    pub farm_location: FarmLocation,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub blockchain_tx_hash: Option<String>,
}

/// A validated, normalised planting ready to be inserted.
///
/// Produced by [`crate::validation::validate_new_crop`]; stores insert it with
/// status `planned`, active, and an empty status history.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCrop {
    pub farmer_id: DbId,
    pub crop_type: String,
    pub variety: String,
    pub planting_date: Timestamp,
    pub expected_harvest: Timestamp,
    pub farm_size: f64,
    pub farm_location: FarmLocation,
    pub notes: Option<String>,
    pub blockchain_tx_hash: Option<String>,
    pub recorded_at: Timestamp,
}

/// Request to record a harvest outcome.
#[derive(Debug, Clone, Deserialize)]
pub struct RecordHarvest {
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub quality_grade: Option<String>,
}
