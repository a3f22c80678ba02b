use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Registered vehicle, keyed by its plate string.
///
/// Only the key takes part in matching; the remaining columns are carried
/// for the dashboards that read the same table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vehicle {
    pub vehicle_number: String,
    pub owner_name: String,
    pub vehicle_model: String,
    pub vehicle_type: String,
    pub contact_number: String,
    pub registration_date: NaiveDate,
}
