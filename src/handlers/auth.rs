use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use axum::{extract::State, http::StatusCode, response::Json};
use rand::rngs::OsRng;
use serde_json::{json, Value};

use crate::auth::{self, policy, Claims};
use crate::database::models::{LoginRequest, RegisterRequest};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /api/register - create a new user account
///
/// Role defaults to "owner"; only "owner" and "staff" are accepted.
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();
    let name = payload.name.unwrap_or_default();

    if email.is_empty() || password.is_empty() || name.is_empty() {
        return Err(ApiError::validation_error(
            "Email, password, and name are required",
        ));
    }

    let role = match payload.role.as_deref() {
        None | Some("") => policy::ROLE_OWNER.to_string(),
        Some(r) if r == policy::ROLE_OWNER || r == policy::ROLE_STAFF => r.to_string(),
        Some(_) => {
            return Err(ApiError::validation_error(
                "Invalid role. Must be 'owner' or 'staff'",
            ))
        }
    };

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| {
            tracing::error!("Password hashing failed: {}", e);
            ApiError::internal_server_error("Registration failed")
        })?
        .to_string();

    let user_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO owners (name, contact, email, password, role) VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(&name)
    .bind(&payload.contact)
    .bind(&email)
    .bind(&password_hash)
    .bind(&role)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::validation_error("Email already registered")
        } else {
            e.into()
        }
    })?;

    tracing::info!("User registered: {} ({})", email, role);
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered successfully",
            "user_id": user_id,
            "role": role,
        })),
    ))
}

/// POST /api/login - authenticate and receive a bearer token
///
/// Absent email and password mismatch are indistinguishable to the client,
/// so accounts cannot be enumerated.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();

    if email.is_empty() || password.is_empty() {
        return Err(ApiError::validation_error("Email and password are required"));
    }

    let row = sqlx::query_as::<_, (i32, String, String, String)>(
        "SELECT id, password, role, name FROM owners WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(&state.pool)
    .await?;

    let (user_id, stored_hash, role, name) = row.ok_or_else(|| {
        tracing::warn!("Login failed for: {}", email);
        ApiError::unauthorized("Invalid credentials")
    })?;

    let parsed_hash = PasswordHash::new(&stored_hash).map_err(|e| {
        tracing::error!("Stored password hash unreadable for {}: {}", email, e);
        ApiError::internal_server_error("Login failed")
    })?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        tracing::warn!("Invalid password for: {}", email);
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let claims = Claims::new(
        user_id,
        email.clone(),
        role.clone(),
        state.config.jwt_expiry_hours,
    );
    let token = auth::issue(&claims, &state.config.jwt_secret).map_err(|e| {
        tracing::error!("Token generation failed: {}", e);
        ApiError::internal_server_error("Token generation failed")
    })?;

    tracing::info!("User logged in: {} ({})", email, role);
    Ok(Json(json!({
        "token": token,
        "role": role,
        "name": name,
        "user_id": user_id,
    })))
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == "23505")
        .unwrap_or(false)
}
