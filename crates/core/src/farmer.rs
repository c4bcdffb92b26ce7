//! Farmer directory entity and registration rules.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::crop::FarmLocation;
use crate::error::CoreError;
use crate::status::VerificationStatus;
use crate::taxonomy::Taxonomy;
use crate::types::{DbId, Timestamp};
use crate::validation::{optional_text, require_text, validate_location};

pub const MIN_REPUTATION: i32 = 0;
pub const MAX_REPUTATION: i32 = 1000;
pub const DEFAULT_REPUTATION: i32 = 100;

pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 100;

pub const MIN_FARMER_FARM_SIZE: f64 = 0.1;
pub const MAX_FARMER_FARM_SIZE: f64 = 10_000.0;

static WALLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").expect("valid regex"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+234[0-9]{10}$").expect("valid regex"));

/// A registered farmer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farmer {
    pub id: DbId,
    pub wallet_address: String,
    pub phone_number: String,
    pub name: String,
    pub email: Option<String>,
    pub location: FarmLocation,
    pub farm_size: f64,
    pub crops: Vec<String>,
    pub verification_status: VerificationStatus,
    pub reputation_score: i32,
    pub total_sales: i64,
    pub total_earnings: f64,
    pub is_active: bool,
    pub joined_at: Timestamp,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Farmer {
    pub fn profile(&self) -> FarmerProfile {
        FarmerProfile {
            id: self.id,
            wallet_address: self.wallet_address.clone(),
            name: self.name.clone(),
            location: self.location.clone(),
            farm_size: self.farm_size,
            crops: self.crops.clone(),
            verification_status: self.verification_status,
            reputation_score: self.reputation_score,
            total_sales: self.total_sales,
            total_earnings: self.total_earnings,
            joined_at: self.joined_at,
            last_login_at: self.last_login_at,
        }
    }

    pub fn summary(&self) -> FarmerSummary {
        FarmerSummary {
            id: self.id,
            name: self.name.clone(),
            state: self.location.state.clone(),
            wallet_address: self.wallet_address.clone(),
            verification_status: self.verification_status,
        }
    }
}

/// Public view of a farmer. Omits contact details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerProfile {
    pub id: DbId,
    pub wallet_address: String,
    pub name: String,
    pub location: FarmLocation,
    pub farm_size: f64,
    pub crops: Vec<String>,
    pub verification_status: VerificationStatus,
    pub reputation_score: i32,
    pub total_sales: i64,
    pub total_earnings: f64,
    pub joined_at: Timestamp,
    pub last_login_at: Option<Timestamp>,
}

/// Directory fields attached to crop listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmerSummary {
    pub id: DbId,
    pub name: String,
    pub state: String,
    pub wallet_address: String,
    pub verification_status: VerificationStatus,
}

/// Registration request.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFarmer {
    pub wallet_address: String,
    pub phone_number: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub location: FarmLocation,
    pub farm_size: f64,
    #[serde(default)]
    pub crops: Vec<String>,
}

/// A validated registration ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFarmer {
    pub wallet_address: String,
    pub phone_number: String,
    pub name: String,
    pub email: Option<String>,
    pub location: FarmLocation,
    pub farm_size: f64,
    pub crops: Vec<String>,
    pub joined_at: Timestamp,
}

/// Self-service profile update. Absent fields are left unchanged.
///
/// The wallet address, verification status and counters are not editable
/// here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFarmer {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub location: Option<FarmLocation>,
    pub farm_size: Option<f64>,
    pub crops: Option<Vec<String>>,
}

/// A validated profile update ready to apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FarmerChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub location: Option<FarmLocation>,
    pub farm_size: Option<f64>,
    pub crops: Option<Vec<String>>,
}

impl FarmerChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.phone_number.is_none()
            && self.location.is_none()
            && self.farm_size.is_none()
            && self.crops.is_none()
    }

    /// Apply in place. Callers hold whatever lock makes this atomic.
    pub fn apply_to(&self, farmer: &mut Farmer, at: Timestamp) {
        if let Some(name) = &self.name {
            farmer.name = name.clone();
        }
        if let Some(email) = &self.email {
            farmer.email = Some(email.clone());
        }
        if let Some(phone) = &self.phone_number {
            farmer.phone_number = phone.clone();
        }
        if let Some(location) = &self.location {
            farmer.location = location.clone();
        }
        if let Some(size) = self.farm_size {
            farmer.farm_size = size;
        }
        if let Some(crops) = &self.crops {
            farmer.crops = crops.clone();
        }
        farmer.updated_at = at;
    }
}

/// Directory search filters. Every set field narrows the result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FarmerFilter {
    pub state: Option<String>,
    pub verification_status: Option<VerificationStatus>,
    /// Farmers growing at least one of these.
    pub crops: Vec<String>,
    pub min_reputation_score: Option<i32>,
}

impl FarmerFilter {
    /// Verified farmers, optionally limited to one state.
    pub fn verified_in(state: Option<String>) -> Self {
        Self {
            state,
            verification_status: Some(VerificationStatus::Verified),
            ..Self::default()
        }
    }

    /// Equality and range checks. Does not look at `is_active`.
    pub fn matches(&self, farmer: &Farmer) -> bool {
        if self
            .state
            .as_ref()
            .is_some_and(|s| *s != farmer.location.state)
        {
            return false;
        }
        if self
            .verification_status
            .is_some_and(|v| v != farmer.verification_status)
        {
            return false;
        }
        if !self.crops.is_empty() && !farmer.crops.iter().any(|c| self.crops.contains(c)) {
            return false;
        }
        if self
            .min_reputation_score
            .is_some_and(|min| farmer.reputation_score < min)
        {
            return false;
        }
        true
    }
}

/// Case-insensitive substring match over name, crops and state.
///
/// Blank text matches every farmer.
pub fn farmer_matches_text(farmer: &Farmer, text: &str) -> bool {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    std::iter::once(farmer.name.as_str())
        .chain(farmer.crops.iter().map(String::as_str))
        .chain(std::iter::once(farmer.location.state.as_str()))
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Directory-wide aggregates over active farmers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FarmerStatistics {
    pub total_farmers: u64,
    pub verified_farmers: u64,
    pub pending_verification: u64,
    pub total_farm_size: f64,
    pub total_earnings: f64,
    /// `None` when there are no farmers.
    pub average_reputation_score: Option<f64>,
}

impl FarmerStatistics {
    /// Aggregate the active farmers among `farmers`.
    pub fn from_farmers<'a>(farmers: impl IntoIterator<Item = &'a Farmer>) -> Self {
        let mut stats = Self::default();
        let mut reputation_sum = 0i64;
        for farmer in farmers.into_iter().filter(|f| f.is_active) {
            stats.total_farmers += 1;
            match farmer.verification_status {
                VerificationStatus::Verified => stats.verified_farmers += 1,
                VerificationStatus::Pending => stats.pending_verification += 1,
                VerificationStatus::Rejected => {}
            }
            stats.total_farm_size += farmer.farm_size;
            stats.total_earnings += farmer.total_earnings;
            reputation_sum += i64::from(farmer.reputation_score);
        }
        if stats.total_farmers > 0 {
            stats.average_reputation_score =
                Some(reputation_sum as f64 / stats.total_farmers as f64);
        }
        stats
    }
}

/// Validate and normalise a registration.
///
/// The wallet address and email are lowercased so uniqueness is
/// case-insensitive.
pub fn validate_new_farmer(
    input: &CreateFarmer,
    taxonomy: &Taxonomy,
    now: Timestamp,
) -> Result<NewFarmer, CoreError> {
    let wallet_address = normalize_wallet(&input.wallet_address)?;
    let phone_number = validate_phone(&input.phone_number)?;
    let name = validate_name(&input.name)?;
    let email = validate_email(input.email.as_deref())?;
    let location = validate_location(&input.location, taxonomy)?;
    validate_farmer_farm_size(input.farm_size)?;
    validate_crops(&input.crops, taxonomy)?;

    Ok(NewFarmer {
        wallet_address,
        phone_number,
        name,
        email,
        location,
        farm_size: input.farm_size,
        crops: input.crops.clone(),
        joined_at: now,
    })
}

/// Validate a profile update. At least one field must be present.
pub fn validate_farmer_update(
    input: &UpdateFarmer,
    taxonomy: &Taxonomy,
) -> Result<FarmerChanges, CoreError> {
    let changes = FarmerChanges {
        name: input.name.as_deref().map(validate_name).transpose()?,
        email: match input.email.as_deref() {
            Some(raw) => validate_email(Some(raw))?,
            None => None,
        },
        phone_number: input.phone_number.as_deref().map(validate_phone).transpose()?,
        location: input
            .location
            .as_ref()
            .map(|l| validate_location(l, taxonomy))
            .transpose()?,
        farm_size: input
            .farm_size
            .map(|size| validate_farmer_farm_size(size).map(|()| size))
            .transpose()?,
        crops: input
            .crops
            .as_ref()
            .map(|crops| validate_crops(crops, taxonomy).map(|()| crops.clone()))
            .transpose()?,
    };
    if changes.is_empty() {
        return Err(CoreError::Validation(
            "at least one profile field must be provided".to_string(),
        ));
    }
    Ok(changes)
}

fn validate_phone(raw: &str) -> Result<String, CoreError> {
    let phone_number = raw.trim().to_string();
    if !PHONE_RE.is_match(&phone_number) {
        return Err(CoreError::Validation(
            "phone_number must be +234 followed by 10 digits".to_string(),
        ));
    }
    Ok(phone_number)
}

fn validate_name(raw: &str) -> Result<String, CoreError> {
    let name = require_text("name", raw)?;
    let name_len = name.chars().count();
    if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&name_len) {
        return Err(CoreError::Validation(format!(
            "name must be between {MIN_NAME_LENGTH} and {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(name)
}

fn validate_email(raw: Option<&str>) -> Result<Option<String>, CoreError> {
    let email = optional_text(raw).map(|e| e.to_lowercase());
    if let Some(e) = &email {
        if !e.validate_email() {
            return Err(CoreError::Validation(format!("email '{e}' is not valid")));
        }
    }
    Ok(email)
}

fn validate_farmer_farm_size(farm_size: f64) -> Result<(), CoreError> {
    if !(MIN_FARMER_FARM_SIZE..=MAX_FARMER_FARM_SIZE).contains(&farm_size) {
        return Err(CoreError::Validation(format!(
            "farm_size must be between {MIN_FARMER_FARM_SIZE} and {MAX_FARMER_FARM_SIZE} hectares"
        )));
    }
    Ok(())
}

fn validate_crops(crops: &[String], taxonomy: &Taxonomy) -> Result<(), CoreError> {
    for crop in crops {
        taxonomy.validate_crop_type(crop)?;
    }
    Ok(())
}

/// Trim, check and lowercase a wallet address.
pub fn normalize_wallet(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    if !WALLET_RE.is_match(trimmed) {
        return Err(CoreError::Validation(
            "wallet_address must be 0x followed by 40 hex digits".to_string(),
        ));
    }
    Ok(trimmed.to_lowercase())
}

/// Apply a reputation delta, keeping the score within bounds.
pub fn clamp_reputation(current: i32, delta: i32) -> i32 {
    current
        .saturating_add(delta)
        .clamp(MIN_REPUTATION, MAX_REPUTATION)
}

pub fn validate_sale_amount(amount: f64) -> Result<(), CoreError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(CoreError::Validation(format!(
            "sale amount must be a non-negative number, got {amount}"
        )));
    }
    Ok(())
}
