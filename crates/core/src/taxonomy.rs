//! Crop taxonomy and region list a deployment accepts.
//!
//! Both lists are fixed for the lifetime of a service. The defaults are the
//! platform's Nigerian crop types and states; deployments can replace either
//! list through configuration.

use crate::error::CoreError;

/// Default crop taxonomy.
pub const DEFAULT_CROP_TYPES: &[&str] = &[
    "Maize",
    "Cassava",
    "Rice",
    "Yam",
    "Millet",
    "Sorghum",
    "Cocoa",
    "Oil Palm",
    "Plantain",
    "Banana",
    "Tomatoes",
    "Pepper",
    "Onions",
    "Okra",
    "Groundnut",
    "Cowpea",
    "Sweet Potato",
    "Irish Potato",
    "Cotton",
    "Sugarcane",
];

/// Default farm regions (the 36 states plus the FCT).
pub const DEFAULT_REGIONS: &[&str] = &[
    "Abia",
    "Adamawa",
    "Akwa Ibom",
    "Anambra",
    "Bauchi",
    "Bayelsa",
    "Benue",
    "Borno",
    "Cross River",
    "Delta",
    "Ebonyi",
    "Edo",
    "Ekiti",
    "Enugu",
    "Gombe",
    "Imo",
    "Jigawa",
    "Kaduna",
    "Kano",
    "Katsina",
    "Kebbi",
    "Kogi",
    "Kwara",
    "Lagos",
    "Nasarawa",
    "Niger",
    "Ogun",
    "Ondo",
    "Osun",
    "Oyo",
    "Plateau",
    "Rivers",
    "Sokoto",
    "Taraba",
    "Yobe",
    "Zamfara",
    "FCT",
];

/// The accepted crop types and farm regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    crop_types: Vec<String>,
    regions: Vec<String>,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            crop_types: DEFAULT_CROP_TYPES.iter().map(|s| s.to_string()).collect(),
            regions: DEFAULT_REGIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Taxonomy {
    /// Build a taxonomy from explicit lists. Both lists must be non-empty.
    pub fn new(crop_types: Vec<String>, regions: Vec<String>) -> Result<Self, CoreError> {
        if crop_types.is_empty() {
            return Err(CoreError::Validation(
                "Crop taxonomy must contain at least one crop type".to_string(),
            ));
        }
        if regions.is_empty() {
            return Err(CoreError::Validation(
                "Region list must contain at least one region".to_string(),
            ));
        }
        Ok(Self {
            crop_types,
            regions,
        })
    }

    pub fn crop_types(&self) -> &[String] {
        &self.crop_types
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    /// Validate that a crop type belongs to the taxonomy (exact match).
    pub fn validate_crop_type(&self, crop_type: &str) -> Result<(), CoreError> {
        if self.crop_types.iter().any(|c| c == crop_type) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "crop_type '{crop_type}' is not in the crop taxonomy. Must be one of: {}",
                self.crop_types.join(", ")
            )))
        }
    }

    /// Validate that a state/region belongs to the region list (exact match).
    pub fn validate_region(&self, field: &str, region: &str) -> Result<(), CoreError> {
        if self.regions.iter().any(|r| r == region) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "{field} '{region}' is not a recognised region"
            )))
        }
    }
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
///
/// Used for the `CROP_TYPES` / `FARM_REGIONS` configuration overrides.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
