//! Status transitions of a violation after one recognition pass.

use crate::models::violation::{Violation, ViolationStatus};
use crate::services::matcher::PlateMatch;

/// Classification assigned to every matched violation.
pub const MATCHED_VIOLATION_TYPE: &str = "Speeding";

/// Flat fine for a matched violation.
pub const MATCHED_FINE_AMOUNT: f64 = 2000.0;

/// Confidence recorded for a registry-confirmed plate.
pub const MATCHED_CONFIDENCE: f64 = 0.95;

pub const UNIDENTIFIED_VIOLATION_TYPE: &str = "Unidentified";

/// What one localization, extraction and matching pass produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    Resolved {
        plate: PlateMatch,
        cropped_plate_path: Option<String>,
    },
    /// The pass raised an error; nothing it produced is trusted.
    Failed,
}

impl ViolationStatus {
    /// Next status for a record in `self` after a pass with `outcome`.
    ///
    /// Terminal statuses map to themselves.
    pub fn transition(self, outcome: &PassOutcome) -> ViolationStatus {
        match (self, outcome) {
            (ViolationStatus::Pending, PassOutcome::Resolved { plate, .. }) if plate.matched => {
                ViolationStatus::Processed
            }
            (ViolationStatus::Pending, PassOutcome::Resolved { .. }) => {
                ViolationStatus::NeedsReview
            }
            (ViolationStatus::Pending, PassOutcome::Failed) => ViolationStatus::Error,
            (
                terminal @ (ViolationStatus::Processed
                | ViolationStatus::NeedsReview
                | ViolationStatus::Error),
                _,
            ) => terminal,
        }
    }
}

/// Apply `outcome` to `violation`, setting the fields its transition implies.
///
/// Returns the resulting status. A terminal record is left untouched.
pub fn apply_outcome(violation: &mut Violation, outcome: PassOutcome) -> ViolationStatus {
    if violation.status.is_terminal() {
        return violation.status;
    }

    let next = violation.status.transition(&outcome);
    match outcome {
        PassOutcome::Resolved {
            plate,
            cropped_plate_path,
        } => {
            if plate.matched {
                violation.violation_type = MATCHED_VIOLATION_TYPE.to_string();
                violation.fine_amount = MATCHED_FINE_AMOUNT;
                violation.confidence_score = MATCHED_CONFIDENCE;
            } else {
                violation.violation_type = UNIDENTIFIED_VIOLATION_TYPE.to_string();
                violation.fine_amount = 0.0;
            }
            violation.vehicle_number = Some(plate.plate);
            if cropped_plate_path.is_some() {
                violation.cropped_plate_path = cropped_plate_path;
            }
        }
        PassOutcome::Failed => {}
    }
    violation.status = next;
    next
}
