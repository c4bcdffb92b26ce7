//! Search filters and aggregate statistics over crop records.
//!
//! These are pure helpers. The in-memory store evaluates them directly and
//! the PostgreSQL store mirrors the same semantics in SQL.

use std::collections::BTreeMap;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::crop::CropRecord;
use crate::error::CoreError;
use crate::status::CropStatus;
use crate::types::{DbId, Timestamp, MILLIS_PER_DAY};

/// Default look-ahead for upcoming harvests.
pub const DEFAULT_UPCOMING_WINDOW_DAYS: i64 = 30;

/// Explicit search filters. Every `Some` field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CropFilter {
    pub farmer_id: Option<DbId>,
    pub crop_type: Option<String>,
    pub status: Option<CropStatus>,
    pub state: Option<String>,
    pub lga: Option<String>,
    pub min_farm_size: Option<f64>,
    pub planting_date_from: Option<Timestamp>,
    pub planting_date_to: Option<Timestamp>,
}

impl CropFilter {
    pub fn for_farmer(farmer_id: DbId) -> Self {
        Self {
            farmer_id: Some(farmer_id),
            ..Self::default()
        }
    }

    pub fn for_status(status: CropStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn for_crop_type(crop_type: impl Into<String>) -> Self {
        Self {
            crop_type: Some(crop_type.into()),
            ..Self::default()
        }
    }

    pub fn for_location(state: impl Into<String>, lga: Option<String>) -> Self {
        Self {
            state: Some(state.into()),
            lga,
            ..Self::default()
        }
    }

    /// Equality and range checks. Does not look at `is_active`.
    pub fn matches(&self, crop: &CropRecord) -> bool {
        if self.farmer_id.is_some_and(|id| id != crop.farmer_id) {
            return false;
        }
        if self.crop_type.as_ref().is_some_and(|t| *t != crop.crop_type) {
            return false;
        }
        if self.status.is_some_and(|s| s != crop.status) {
            return false;
        }
        if self
            .state
            .as_ref()
            .is_some_and(|s| *s != crop.farm_location.state)
        {
            return false;
        }
        if self.lga.as_ref().is_some_and(|l| *l != crop.farm_location.lga) {
            return false;
        }
        if self.min_farm_size.is_some_and(|min| crop.farm_size < min) {
            return false;
        }
        if self
            .planting_date_from
            .is_some_and(|from| crop.planting_date < from)
        {
            return false;
        }
        if self
            .planting_date_to
            .is_some_and(|to| crop.planting_date > to)
        {
            return false;
        }
        true
    }
}

/// Case-insensitive substring match over crop type, variety, state and notes.
///
/// Blank text matches every record.
pub fn matches_text(crop: &CropRecord, text: &str) -> bool {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    [
        Some(crop.crop_type.as_str()),
        Some(crop.variety.as_str()),
        Some(crop.farm_location.state.as_str()),
        crop.notes.as_deref(),
    ]
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(&needle))
}

/// Latest expected harvest date that still counts as upcoming.
pub fn harvest_window_cutoff(now: Timestamp, within_days: i64) -> Result<Timestamp, CoreError> {
    if within_days < 0 {
        return Err(CoreError::Validation(format!(
            "within_days must not be negative, got {within_days}"
        )));
    }
    Duration::try_days(within_days)
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| {
            CoreError::Validation(format!("within_days {within_days} is out of range"))
        })
}

/// Whether a record in one of `statuses` is expected on or before `cutoff`.
pub fn in_harvest_window(crop: &CropRecord, statuses: &[CropStatus], cutoff: Timestamp) -> bool {
    statuses.contains(&crop.status) && crop.expected_harvest <= cutoff
}

/// Planned growing period in fractional days.
pub fn growth_duration_days(crop: &CropRecord) -> f64 {
    (crop.expected_harvest - crop.planting_date).num_milliseconds() as f64 / MILLIS_PER_DAY as f64
}

/// Aggregate figures over active crop records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CropStatistics {
    pub total_count: u64,
    pub total_farm_size: f64,
    pub status_breakdown: BTreeMap<String, u64>,
    pub crop_type_breakdown: BTreeMap<String, u64>,
    /// `None` when there are no active records.
    pub average_growth_duration_days: Option<f64>,
}

impl CropStatistics {
    /// Fold records into statistics, skipping inactive ones.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a CropRecord>) -> Self {
        let mut stats = Self::default();
        let mut duration_sum = 0.0;

        for crop in records.into_iter().filter(|c| c.is_active) {
            stats.total_count += 1;
            stats.total_farm_size += crop.farm_size;
            *stats
                .status_breakdown
                .entry(crop.status.as_str().to_string())
                .or_default() += 1;
            *stats
                .crop_type_breakdown
                .entry(crop.crop_type.clone())
                .or_default() += 1;
            duration_sum += growth_duration_days(crop);
        }

        if stats.total_count > 0 {
            stats.average_growth_duration_days = Some(duration_sum / stats.total_count as f64);
        }
        stats
    }
}
