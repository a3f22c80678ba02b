use std::str::FromStr;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::vehicle::Vehicle;
use crate::models::violation::{Violation, ViolationStatus, PLACEHOLDER_VIOLATION_TYPE};

const VIOLATION_COLUMNS: &str = "id, vehicle_number, violation_type, location, timestamp, status, \
     fine_amount, confidence_score, image_path, video_path, cropped_plate_path";

fn violation_from_row(row: &PgRow) -> Result<Violation, sqlx::Error> {
    let status_str: String = row.try_get("status")?;
    let status = ViolationStatus::from_str(&status_str).map_err(|e| sqlx::Error::ColumnDecode {
        index: "status".to_string(),
        source: Box::new(e),
    })?;

    Ok(Violation {
        id: row.try_get("id")?,
        vehicle_number: row.try_get("vehicle_number")?,
        violation_type: row.try_get("violation_type")?,
        location: row.try_get("location")?,
        status,
        fine_amount: row.try_get("fine_amount")?,
        confidence_score: row.try_get("confidence_score")?,
        image_path: row.try_get("image_path")?,
        video_path: row.try_get("video_path")?,
        cropped_plate_path: row.try_get("cropped_plate_path")?,
        timestamp: row.try_get("timestamp")?,
    })
}

/// Insert a new pending violation (the upload API's side of the contract)
pub async fn create_violation(
    pool: &PgPool,
    image_path: &str,
    location: &str,
) -> Result<Violation, sqlx::Error> {
    let sql = format!(
        "INSERT INTO violations (image_path, location, violation_type, status) \
         VALUES ($1, $2, $3, 'pending') \
         RETURNING {VIOLATION_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(image_path)
        .bind(location)
        .bind(PLACEHOLDER_VIOLATION_TYPE)
        .fetch_one(pool)
        .await?;

    violation_from_row(&row)
}

/// Get a violation by ID
pub async fn get_violation(pool: &PgPool, id: Uuid) -> Result<Option<Violation>, sqlx::Error> {
    let sql = format!("SELECT {VIOLATION_COLUMNS} FROM violations WHERE id = $1");
    let row = sqlx::query(&sql).bind(id).fetch_optional(pool).await?;

    row.as_ref().map(violation_from_row).transpose()
}

/// Get every violation eligible for worker pickup, oldest first
pub async fn fetch_eligible_violations(pool: &PgPool) -> Result<Vec<Violation>, sqlx::Error> {
    let sql = format!(
        "SELECT {VIOLATION_COLUMNS} FROM violations \
         WHERE status = 'pending' \
            OR (violation_type = $1 AND status NOT IN ('processed', 'needs_review', 'error')) \
         ORDER BY timestamp ASC, id ASC"
    );
    let rows = sqlx::query(&sql)
        .bind(PLACEHOLDER_VIOLATION_TYPE)
        .fetch_all(pool)
        .await?;

    rows.iter().map(violation_from_row).collect()
}

/// Write back every field the worker may change
pub async fn update_violation(pool: &PgPool, violation: &Violation) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE violations
        SET vehicle_number = $1,
            violation_type = $2,
            status = $3,
            fine_amount = $4,
            confidence_score = $5,
            cropped_plate_path = $6
        WHERE id = $7
        "#,
    )
    .bind(&violation.vehicle_number)
    .bind(&violation.violation_type)
    .bind(violation.status.as_ref())
    .bind(violation.fine_amount)
    .bind(violation.confidence_score)
    .bind(&violation.cropped_plate_path)
    .bind(violation.id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Mark a violation as failed, leaving every other column alone
pub async fn mark_violation_error(pool: &PgPool, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE violations SET status = $1 WHERE id = $2")
        .bind(ViolationStatus::Error.as_ref())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Check whether a plate is registered (exact match)
pub async fn vehicle_exists(pool: &PgPool, vehicle_number: &str) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        "SELECT EXISTS (SELECT 1 FROM vehicles WHERE vehicle_number = $1) AS found",
    )
    .bind(vehicle_number)
    .fetch_one(pool)
    .await?;

    row.try_get("found")
}

/// Insert or refresh a registry entry
pub async fn upsert_vehicle(pool: &PgPool, vehicle: &Vehicle) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO vehicles
            (vehicle_number, owner_name, vehicle_model, vehicle_type,
             contact_number, registration_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (vehicle_number) DO UPDATE
        SET owner_name = EXCLUDED.owner_name,
            vehicle_model = EXCLUDED.vehicle_model,
            vehicle_type = EXCLUDED.vehicle_type,
            contact_number = EXCLUDED.contact_number,
            registration_date = EXCLUDED.registration_date
        "#,
    )
    .bind(&vehicle.vehicle_number)
    .bind(&vehicle.owner_name)
    .bind(&vehicle.vehicle_model)
    .bind(&vehicle.vehicle_type)
    .bind(&vehicle.contact_number)
    .bind(vehicle.registration_date)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a registry entry by plate
pub async fn get_vehicle(
    pool: &PgPool,
    vehicle_number: &str,
) -> Result<Option<Vehicle>, sqlx::Error> {
    sqlx::query_as::<_, Vehicle>(
        r#"
        SELECT vehicle_number, owner_name, vehicle_model, vehicle_type, contact_number,
               registration_date
        FROM vehicles
        WHERE vehicle_number = $1
        "#,
    )
    .bind(vehicle_number)
    .fetch_optional(pool)
    .await
}
