use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Violation type written by the upload API while a record awaits the worker.
pub const PLACEHOLDER_VIOLATION_TYPE: &str = "Processing...";

/// Lifecycle status of a violation record.
///
/// `Pending` is the only state the worker picks up; the other three are
/// terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ViolationStatus {
    Pending,
    Processed,
    NeedsReview,
    Error,
}

impl ViolationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ViolationStatus::Pending)
    }
}

/// A traffic violation captured at a checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub id: Uuid,
    pub vehicle_number: Option<String>,
    pub violation_type: String,
    pub location: String,
    pub status: ViolationStatus,
    pub fine_amount: f64,
    pub confidence_score: f64,
    pub image_path: String,
    pub video_path: Option<String>,
    pub cropped_plate_path: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Violation {
    /// A fresh record as the upload API creates it.
    pub fn new_pending(image_path: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            vehicle_number: None,
            violation_type: PLACEHOLDER_VIOLATION_TYPE.to_string(),
            location: location.into(),
            status: ViolationStatus::Pending,
            fine_amount: 0.0,
            confidence_score: 0.0,
            image_path: image_path.into(),
            video_path: None,
            cropped_plate_path: None,
            timestamp: Utc::now(),
        }
    }

    /// Whether the worker should pick this record up.
    ///
    /// A placeholder violation type marks a record as awaiting processing,
    /// but never re-opens one that already reached a terminal status.
    pub fn is_eligible(&self) -> bool {
        !self.status.is_terminal()
    }
}
