use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde_json::{json, Value};
use sqlx::PgPool;

use crate::auth::policy::{self, ROLE_STAFF};
use crate::database::{self, models::{Appointment, AppointmentRequest}};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

const DEFAULT_STATUS: &str = "scheduled";

/// POST /api/appointments - schedule an appointment for a pet
///
/// Ownership is transitive: the caller must own the pet (or be staff). A
/// nonexistent pet is 404 before any ownership decision.
pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<AppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let pet_id = payload.pet_id.unwrap_or(0);
    let date = match payload.date {
        Some(date) if pet_id > 0 => date,
        _ => return Err(ApiError::validation_error("Pet ID and date are required")),
    };

    let owner_id = database::pet_owner(&state.pool, pet_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Pet not found"))?;
    policy::ensure_can_access(&caller, owner_id)?;

    let status = requested_status(payload.status.as_deref()).unwrap_or(DEFAULT_STATUS);

    let appointment = sqlx::query_as::<_, Appointment>(
        "INSERT INTO appointments (pet_id, date, reason, status) VALUES ($1, $2, $3, $4) \
         RETURNING id, pet_id, date, reason, status",
    )
    .bind(pet_id)
    .bind(date)
    .bind(&payload.reason)
    .bind(status)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!("Appointment created: ID={}, Pet={}", appointment.id, pet_id);
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// GET /api/appointments - list appointments, query-filtered by role
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let appointments = if caller.role == ROLE_STAFF {
        sqlx::query_as::<_, Appointment>(
            "SELECT id, pet_id, date, reason, status FROM appointments ORDER BY date DESC",
        )
        .fetch_all(&state.pool)
        .await?
    } else {
        sqlx::query_as::<_, Appointment>(
            "SELECT a.id, a.pet_id, a.date, a.reason, a.status \
             FROM appointments a JOIN pets p ON a.pet_id = p.id \
             WHERE p.owner_id = $1 ORDER BY a.date DESC",
        )
        .bind(caller.user_id)
        .fetch_all(&state.pool)
        .await?
    };

    Ok(Json(appointments))
}

/// GET /api/appointments/:id - fetch a single appointment
pub async fn get_appointment_by_id(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(appointment_id): Path<i32>,
) -> Result<Json<Appointment>, ApiError> {
    #[derive(sqlx::FromRow)]
    struct Row {
        id: i32,
        pet_id: i32,
        date: chrono::DateTime<chrono::Utc>,
        reason: Option<String>,
        status: String,
        owner_id: i32,
    }

    let row = sqlx::query_as::<_, Row>(
        "SELECT a.id, a.pet_id, a.date, a.reason, a.status, p.owner_id \
         FROM appointments a JOIN pets p ON a.pet_id = p.id \
         WHERE a.id = $1",
    )
    .bind(appointment_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Appointment not found"))?;

    policy::ensure_can_access(&caller, row.owner_id)?;

    Ok(Json(Appointment {
        id: row.id,
        pet_id: row.pet_id,
        date: row.date,
        reason: row.reason,
        status: row.status,
    }))
}

/// PUT /api/appointments/:id - update date, reason, and status
///
/// An absent or empty status leaves the stored value unchanged, so a PUT
/// that only moves the date cannot reset e.g. "completed" to "scheduled".
pub async fn update_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(appointment_id): Path<i32>,
    Json(payload): Json<AppointmentRequest>,
) -> Result<Json<Value>, ApiError> {
    let date = payload
        .date
        .ok_or_else(|| ApiError::validation_error("Date is required"))?;

    let owner_id = appointment_owner(&state.pool, appointment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Appointment not found"))?;
    policy::ensure_can_access(&caller, owner_id)?;

    let result = sqlx::query(
        "UPDATE appointments SET date = $1, reason = $2, status = COALESCE($3, status) WHERE id = $4",
    )
    .bind(date)
    .bind(&payload.reason)
    .bind(requested_status(payload.status.as_deref()))
    .bind(appointment_id)
    .execute(&state.pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Appointment not found"));
    }

    tracing::info!("Appointment updated: ID={}", appointment_id);
    Ok(Json(json!({ "message": "Appointment updated successfully" })))
}

/// DELETE /api/appointments/:id
pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(appointment_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let owner_id = appointment_owner(&state.pool, appointment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Appointment not found"))?;
    policy::ensure_can_access(&caller, owner_id)?;

    let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
        .bind(appointment_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Appointment not found"));
    }

    tracing::info!("Appointment deleted: ID={}", appointment_id);
    Ok(Json(json!({ "message": "Appointment deleted successfully" })))
}

/// Resolve an appointment's transitive owner through its pet.
async fn appointment_owner(pool: &PgPool, appointment_id: i32) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, i32>(
        "SELECT p.owner_id FROM appointments a JOIN pets p ON a.pet_id = p.id WHERE a.id = $1",
    )
    .bind(appointment_id)
    .fetch_optional(pool)
    .await
}

/// Treat absent and empty status the same way: no status requested. Creates
/// fall back to the default, updates keep the stored value via COALESCE.
fn requested_status(status: Option<&str>) -> Option<&str> {
    match status {
        None | Some("") => None,
        some => some,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_and_empty_status_request_nothing() {
        assert_eq!(requested_status(None), None);
        assert_eq!(requested_status(Some("")), None);
    }

    #[test]
    fn test_explicit_status_passes_through() {
        assert_eq!(requested_status(Some("completed")), Some("completed"));
    }

    #[test]
    fn test_create_falls_back_to_default() {
        assert_eq!(requested_status(None).unwrap_or(DEFAULT_STATUS), "scheduled");
        assert_eq!(
            requested_status(Some("cancelled")).unwrap_or(DEFAULT_STATUS),
            "cancelled"
        );
    }
}
