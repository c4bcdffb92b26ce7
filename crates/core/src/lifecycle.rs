//! Crop lifecycle: status transitions, harvest outcomes and growth timing.
//!
//! A [`StatusChange`] is the unit every store applies atomically: the status
//! write, the optional harvest outcome, and exactly one appended
//! [`StatusUpdate`] audit entry.

use crate::crop::{CropRecord, HarvestUnit, QualityGrade, RecordHarvest, StatusUpdate};
use crate::error::CoreError;
use crate::status::CropStatus;
use crate::types::{DbId, Timestamp, MILLIS_PER_DAY};

// ---------------------------------------------------------------------------
// Transition policy
// ---------------------------------------------------------------------------

/// Which status moves `update_status` and `record_harvest` accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any status may follow any other. Backward moves are allowed for
    /// corrections.
    #[default]
    Permissive,
    /// Moves to an earlier status in the lifecycle are rejected.
    ForwardOnly,
}

impl TransitionPolicy {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "permissive" => Ok(Self::Permissive),
            "forward_only" => Ok(Self::ForwardOnly),
            other => Err(CoreError::Validation(format!(
                "Invalid transition policy '{other}'. Must be one of: permissive, forward_only"
            ))),
        }
    }

    /// Check a move from `from` to `to`. Staying in place is always allowed.
    pub fn check(self, from: CropStatus, to: CropStatus) -> Result<(), CoreError> {
        if self == Self::ForwardOnly && is_backward(from, to) {
            return Err(CoreError::Conflict(format!(
                "Cannot move crop from '{from}' back to '{to}'"
            )));
        }
        Ok(())
    }
}

/// Whether `to` comes before `from` in the nominal lifecycle order.
pub fn is_backward(from: CropStatus, to: CropStatus) -> bool {
    to < from
}

// ---------------------------------------------------------------------------
// Harvest outcome
// ---------------------------------------------------------------------------

/// A validated harvest result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarvestOutcome {
    pub quantity: f64,
    pub unit: HarvestUnit,
    /// `None` leaves any previously recorded grade in place.
    pub quality_grade: Option<QualityGrade>,
}

impl HarvestOutcome {
    pub fn parse(input: &RecordHarvest) -> Result<Self, CoreError> {
        if !input.quantity.is_finite() || input.quantity < 0.0 {
            return Err(CoreError::Validation(format!(
                "quantity must be a non-negative number, got {}",
                input.quantity
            )));
        }
        let unit = HarvestUnit::parse(&input.unit)?;
        let quality_grade = input
            .quality_grade
            .as_deref()
            .map(QualityGrade::parse)
            .transpose()?;

        Ok(Self {
            quantity: input.quantity,
            unit,
            quality_grade,
        })
    }

    /// Audit note recorded with the harvest entry.
    pub fn note(&self) -> String {
        format!("Harvested {} {}", self.quantity, self.unit.as_str())
    }
}

// ---------------------------------------------------------------------------
// Status change
// ---------------------------------------------------------------------------

/// One status mutation plus its audit entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: CropStatus,
    pub at: Timestamp,
    pub notes: Option<String>,
    pub actor: DbId,
    pub outcome: Option<HarvestOutcome>,
}

impl StatusChange {
    pub fn transition(
        status: CropStatus,
        at: Timestamp,
        notes: Option<String>,
        actor: DbId,
    ) -> Self {
        Self {
            status,
            at,
            notes,
            actor,
            outcome: None,
        }
    }

    pub fn harvest(outcome: HarvestOutcome, at: Timestamp, actor: DbId) -> Self {
        Self {
            status: CropStatus::Harvested,
            at,
            notes: Some(outcome.note()),
            actor,
            outcome: Some(outcome),
        }
    }

    /// Whether applying this change sets `actual_harvest`.
    pub fn stamps_harvest(&self, current: Option<Timestamp>) -> bool {
        self.status == CropStatus::Harvested && current.is_none()
    }

    /// Reject changes that would set an actual harvest before planting.
    pub fn validate_against(&self, crop: &CropRecord) -> Result<(), CoreError> {
        if self.stamps_harvest(crop.actual_harvest) && self.at < crop.planting_date {
            return Err(CoreError::Validation(
                "actual_harvest cannot be before planting_date".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply the change in place. Callers hold whatever lock makes this atomic.
    pub fn apply_to(&self, crop: &mut CropRecord) {
        if self.stamps_harvest(crop.actual_harvest) {
            crop.actual_harvest = Some(self.at);
        }
        crop.status = self.status;

        if let Some(outcome) = &self.outcome {
            crop.quantity = Some(outcome.quantity);
            crop.unit = Some(outcome.unit);
            if let Some(grade) = outcome.quality_grade {
                crop.quality_grade = Some(grade);
            }
        }

        crop.status_updates.push(self.audit_entry());
        crop.updated_at = self.at;
    }

    pub fn audit_entry(&self) -> StatusUpdate {
        StatusUpdate {
            status: self.status,
            date: self.at,
            notes: self.notes.clone(),
            updated_by: self.actor,
        }
    }
}

// ---------------------------------------------------------------------------
// Growth timing
// ---------------------------------------------------------------------------

/// Elapsed share of the planned growing period as a rounded percentage.
///
/// Exactly 0 at planting and 100 from the expected harvest onward. A
/// non-positive growing period counts as complete.
pub fn growth_progress(planting: Timestamp, expected: Timestamp, now: Timestamp) -> u8 {
    let total = (expected - planting).num_milliseconds();
    if total <= 0 {
        return 100;
    }
    let elapsed = (now - planting).num_milliseconds();
    let pct = (elapsed as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// Days until `expected`, rounded up. Negative when overdue.
pub fn days_to_harvest(expected: Timestamp, now: Timestamp) -> i64 {
    let millis = (expected - now).num_milliseconds();
    (millis as f64 / MILLIS_PER_DAY as f64).ceil() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crop::{Coordinates, FarmLocation};
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    fn ts(y: i32, m: u32, d: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn crop() -> CropRecord {
        let planted = ts(2025, 6, 15);
        CropRecord {
            id: 1,
            farmer_id: 9,
            blockchain_tx_hash: None,
            crop_type: "Maize".into(),
            variety: "Oba Super 2".into(),
            planting_date: planted,
            expected_harvest: ts(2025, 12, 15),
            actual_harvest: None,
            farm_location: FarmLocation {
                state: "Kaduna".into(),
                lga: "Zaria".into(),
                coordinates: Coordinates {
                    longitude: 7.7,
                    latitude: 11.1,
                },
                address: None,
            },
            farm_size: 2.5,
            status: CropStatus::Planned,
            quality_grade: None,
            quantity: None,
            unit: None,
            notes: None,
            is_active: true,
            status_updates: Vec::new(),
            created_at: planted,
            updated_at: planted,
        }
    }

    // -- policy --

    #[test]
    fn permissive_allows_backward() {
        assert!(TransitionPolicy::Permissive
            .check(CropStatus::Sold, CropStatus::Planned)
            .is_ok());
    }

    #[test]
    fn forward_only_rejects_backward_with_conflict() {
        assert_matches!(
            TransitionPolicy::ForwardOnly.check(CropStatus::Sold, CropStatus::Planned),
            Err(CoreError::Conflict(_))
        );
        assert!(TransitionPolicy::ForwardOnly
            .check(CropStatus::Planted, CropStatus::Mature)
            .is_ok());
        assert!(TransitionPolicy::ForwardOnly
            .check(CropStatus::Growing, CropStatus::Growing)
            .is_ok());
    }

    #[test]
    fn policy_parse() {
        assert_eq!(
            TransitionPolicy::parse("forward_only").unwrap(),
            TransitionPolicy::ForwardOnly
        );
        assert_eq!(TransitionPolicy::default(), TransitionPolicy::Permissive);
        assert!(TransitionPolicy::parse("strict").is_err());
    }

    // -- harvest outcome --

    #[test]
    fn outcome_rejects_negative_and_nan_quantity() {
        for quantity in [-1.0, f64::NAN, f64::INFINITY] {
            let input = RecordHarvest {
                quantity,
                unit: "bags".into(),
                quality_grade: None,
            };
            assert_matches!(HarvestOutcome::parse(&input), Err(CoreError::Validation(_)));
        }
    }

    #[test]
    fn outcome_rejects_unknown_unit_and_grade() {
        let bad_unit = RecordHarvest {
            quantity: 3.0,
            unit: "crates".into(),
            quality_grade: None,
        };
        assert!(HarvestOutcome::parse(&bad_unit).is_err());

        let bad_grade = RecordHarvest {
            quantity: 3.0,
            unit: "kg".into(),
            quality_grade: Some("gold".into()),
        };
        assert!(HarvestOutcome::parse(&bad_grade).is_err());
    }

    #[test]
    fn outcome_note_formats_quantity() {
        let outcome = HarvestOutcome::parse(&RecordHarvest {
            quantity: 50.0,
            unit: "bags".into(),
            quality_grade: Some("grade-a".into()),
        })
        .unwrap();
        assert_eq!(outcome.note(), "Harvested 50 bags");

        let fractional = HarvestOutcome {
            quantity: 2.5,
            unit: HarvestUnit::Tonnes,
            quality_grade: None,
        };
        assert_eq!(fractional.note(), "Harvested 2.5 tonnes");
    }

    // -- apply --

    #[test]
    fn transition_appends_one_entry_matching_status() {
        let mut record = crop();
        let change = StatusChange::transition(
            CropStatus::Growing,
            ts(2025, 7, 1),
            Some("sprouted".into()),
            9,
        );
        change.apply_to(&mut record);

        assert_eq!(record.status, CropStatus::Growing);
        assert_eq!(record.status_updates.len(), 1);
        assert_eq!(record.status_updates[0].status, record.status);
        assert_eq!(record.status_updates[0].updated_by, 9);
        assert_eq!(record.actual_harvest, None);
        assert_eq!(record.updated_at, ts(2025, 7, 1));
    }

    #[test]
    fn harvested_transition_stamps_date_once() {
        let mut record = crop();
        StatusChange::transition(CropStatus::Harvested, ts(2025, 12, 1), None, 9)
            .apply_to(&mut record);
        assert_eq!(record.actual_harvest, Some(ts(2025, 12, 1)));

        StatusChange::transition(CropStatus::Harvested, ts(2025, 12, 20), None, 9)
            .apply_to(&mut record);
        assert_eq!(record.actual_harvest, Some(ts(2025, 12, 1)));
        assert_eq!(record.status_updates.len(), 2);
    }

    #[test]
    fn harvest_keeps_grade_when_omitted() {
        let mut record = crop();
        let first = HarvestOutcome {
            quantity: 40.0,
            unit: HarvestUnit::Bags,
            quality_grade: Some(QualityGrade::Premium),
        };
        StatusChange::harvest(first, ts(2025, 12, 10), 9).apply_to(&mut record);

        let second = HarvestOutcome {
            quantity: 42.0,
            unit: HarvestUnit::Bags,
            quality_grade: None,
        };
        StatusChange::harvest(second, ts(2025, 12, 12), 9).apply_to(&mut record);

        assert_eq!(record.quantity, Some(42.0));
        assert_eq!(record.quality_grade, Some(QualityGrade::Premium));
        assert_eq!(record.actual_harvest, Some(ts(2025, 12, 10)));
        assert_eq!(
            record.status_updates[1].notes.as_deref(),
            Some("Harvested 42 bags")
        );
    }

    #[test]
    fn harvest_before_planting_rejected() {
        let record = crop();
        let change = StatusChange::transition(
            CropStatus::Harvested,
            record.planting_date - Duration::days(1),
            None,
            9,
        );
        assert!(change.validate_against(&record).is_err());

        let later = StatusChange::transition(CropStatus::Harvested, ts(2025, 12, 1), None, 9);
        assert!(later.validate_against(&record).is_ok());
    }

    // -- growth timing --

    #[test]
    fn progress_endpoints() {
        let planted = ts(2025, 6, 15);
        let expected = ts(2025, 12, 15);
        assert_eq!(growth_progress(planted, expected, planted), 0);
        assert_eq!(growth_progress(planted, expected, expected), 100);
        assert_eq!(
            growth_progress(planted, expected, expected + Duration::days(40)),
            100
        );
        assert_eq!(
            growth_progress(planted, expected, planted - Duration::days(3)),
            0
        );
    }

    #[test]
    fn progress_midpoint_and_monotonic() {
        let planted = ts(2025, 1, 1);
        let expected = planted + Duration::days(100);
        assert_eq!(growth_progress(planted, expected, planted + Duration::days(50)), 50);

        let mut last = 0;
        for day in 0..=110 {
            let p = growth_progress(planted, expected, planted + Duration::days(day));
            assert!(p >= last);
            last = p;
        }
    }

    #[test]
    fn progress_zero_length_period_is_complete() {
        let t = ts(2025, 1, 1);
        assert_eq!(growth_progress(t, t, t), 100);
    }

    #[test]
    fn days_to_harvest_scenario() {
        assert_eq!(days_to_harvest(ts(2025, 12, 15), ts(2025, 11, 15)), 30);
    }

    #[test]
    fn days_to_harvest_rounds_up_and_goes_negative() {
        let expected = ts(2025, 12, 15);
        assert_eq!(days_to_harvest(expected, expected - Duration::hours(1)), 1);
        assert_eq!(days_to_harvest(expected, expected), 0);
        assert_eq!(days_to_harvest(expected, expected + Duration::hours(1)), 0);
        assert_eq!(days_to_harvest(expected, expected + Duration::days(3)), -3);
    }
}
