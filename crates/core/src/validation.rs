//! Input validation for new crop records.
//!
//! Checks run in a fixed order and the first violation is reported, so a
//! caller fixing errors one at a time always sees the same sequence.

use std::sync::LazyLock;

use regex::Regex;

use crate::crop::{CreateCrop, FarmLocation, NewCrop, MAX_FARM_SIZE, MAX_NOTES_LENGTH, MIN_FARM_SIZE};
use crate::error::CoreError;
use crate::taxonomy::Taxonomy;
use crate::types::Timestamp;

static TX_HASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[a-fA-F0-9]{64}$").expect("valid regex"));

/// Validate a planting request against the taxonomy and the current time.
///
/// Text fields are trimmed; blank optional text becomes `None`.
pub fn validate_new_crop(
    input: &CreateCrop,
    taxonomy: &Taxonomy,
    now: Timestamp,
) -> Result<NewCrop, CoreError> {
    taxonomy.validate_crop_type(&input.crop_type)?;
    let variety = require_text("variety", &input.variety)?;

    if input.planting_date > now {
        return Err(CoreError::Validation(
            "planting_date cannot be in the future".to_string(),
        ));
    }
    if input.expected_harvest <= input.planting_date {
        return Err(CoreError::Validation(
            "expected_harvest must be after planting_date".to_string(),
        ));
    }

    validate_farm_size(input.farm_size)?;
    let farm_location = validate_location(&input.farm_location, taxonomy)?;

    let notes = optional_text(input.notes.as_deref());
    if let Some(n) = &notes {
        if n.chars().count() > MAX_NOTES_LENGTH {
            return Err(CoreError::Validation(format!(
                "notes cannot exceed {MAX_NOTES_LENGTH} characters"
            )));
        }
    }

    let blockchain_tx_hash = optional_text(input.blockchain_tx_hash.as_deref());
    if let Some(hash) = &blockchain_tx_hash {
        validate_tx_hash(hash)?;
    }

    Ok(NewCrop {
        farmer_id: input.farmer_id,
        crop_type: input.crop_type.clone(),
        variety,
        planting_date: input.planting_date,
        expected_harvest: input.expected_harvest,
        farm_size: input.farm_size,
        farm_location,
        notes,
        blockchain_tx_hash,
        recorded_at: now,
    })
}

/// Farm size must be finite and within [`MIN_FARM_SIZE`, `MAX_FARM_SIZE`].
pub fn validate_farm_size(farm_size: f64) -> Result<(), CoreError> {
    if !(MIN_FARM_SIZE..=MAX_FARM_SIZE).contains(&farm_size) {
        return Err(CoreError::Validation(format!(
            "farm_size must be between {MIN_FARM_SIZE} and {MAX_FARM_SIZE} hectares, got {farm_size}"
        )));
    }
    Ok(())
}

/// Validate and normalise a farm location. Shared with farmer registration.
pub fn validate_location(
    location: &FarmLocation,
    taxonomy: &Taxonomy,
) -> Result<FarmLocation, CoreError> {
    taxonomy.validate_region("farm_location.state", &location.state)?;
    let lga = require_text("farm_location.lga", &location.lga)?;
    location.coordinates.validate("farm_location.coordinates")?;

    Ok(FarmLocation {
        state: location.state.clone(),
        lga,
        coordinates: location.coordinates,
        address: optional_text(location.address.as_deref()),
    })
}

pub fn validate_tx_hash(hash: &str) -> Result<(), CoreError> {
    if TX_HASH_RE.is_match(hash) {
        Ok(())
    } else {
        Err(CoreError::Validation(
            "blockchain_tx_hash must be 0x followed by 64 hex digits".to_string(),
        ))
    }
}

/// Trim a required text field, rejecting blank values.
pub fn require_text(field: &str, value: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

/// Trim optional text; blank becomes `None`.
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
