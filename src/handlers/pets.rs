use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde_json::{json, Value};

use crate::auth::policy::{self, ROLE_STAFF};
use crate::database::{self, models::{Pet, PetRequest}};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// POST /api/pets - create a pet
///
/// Owners always create pets under their own id; any owner_id they supply is
/// ignored. Staff create on behalf of an owner and must name one.
pub async fn create_pet(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Json(payload): Json<PetRequest>,
) -> Result<(StatusCode, Json<Pet>), ApiError> {
    let name = payload.name.unwrap_or_default();
    let species = payload.species.unwrap_or_default();

    if name.is_empty() || species.is_empty() {
        return Err(ApiError::validation_error("Name and species are required"));
    }

    let owner_id = policy::resolve_create_owner(&caller, payload.owner_id)?;

    let pet = sqlx::query_as::<_, Pet>(
        "INSERT INTO pets (name, species, breed, owner_id, medical_history) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, name, species, breed, owner_id, medical_history",
    )
    .bind(&name)
    .bind(&species)
    .bind(&payload.breed)
    .bind(owner_id)
    .bind(&payload.medical_history)
    .fetch_one(&state.pool)
    .await?;

    tracing::info!("Pet created: ID={}, Name={}, Owner={}", pet.id, pet.name, pet.owner_id);
    Ok((StatusCode::CREATED, Json(pet)))
}

/// GET /api/pets - list pets
///
/// Filtering happens in the query: staff see every row, owners only theirs.
pub async fn list_pets(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
) -> Result<Json<Vec<Pet>>, ApiError> {
    let pets = if caller.role == ROLE_STAFF {
        sqlx::query_as::<_, Pet>(
            "SELECT id, name, species, breed, owner_id, medical_history FROM pets ORDER BY id",
        )
        .fetch_all(&state.pool)
        .await?
    } else {
        sqlx::query_as::<_, Pet>(
            "SELECT id, name, species, breed, owner_id, medical_history \
             FROM pets WHERE owner_id = $1 ORDER BY id",
        )
        .bind(caller.user_id)
        .fetch_all(&state.pool)
        .await?
    };

    Ok(Json(pets))
}

/// GET /api/pets/:id - fetch a single pet
pub async fn get_pet_by_id(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(pet_id): Path<i32>,
) -> Result<Json<Pet>, ApiError> {
    let pet = sqlx::query_as::<_, Pet>(
        "SELECT id, name, species, breed, owner_id, medical_history FROM pets WHERE id = $1",
    )
    .bind(pet_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Pet not found"))?;

    policy::ensure_can_access(&caller, pet.owner_id)?;

    Ok(Json(pet))
}

/// PUT /api/pets/:id - update a pet
///
/// owner_id is immutable here: the update statement never touches it.
pub async fn update_pet(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(pet_id): Path<i32>,
    Json(payload): Json<PetRequest>,
) -> Result<Json<Value>, ApiError> {
    let name = payload.name.unwrap_or_default();
    let species = payload.species.unwrap_or_default();

    if name.is_empty() || species.is_empty() {
        return Err(ApiError::validation_error("Name and species are required"));
    }

    let owner_id = database::pet_owner(&state.pool, pet_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Pet not found"))?;
    policy::ensure_can_access(&caller, owner_id)?;

    let result = sqlx::query(
        "UPDATE pets SET name = $1, species = $2, breed = $3, medical_history = $4 WHERE id = $5",
    )
    .bind(&name)
    .bind(&species)
    .bind(&payload.breed)
    .bind(&payload.medical_history)
    .bind(pet_id)
    .execute(&state.pool)
    .await?;

    // Row can disappear between the ownership check and the mutation
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Pet not found"));
    }

    tracing::info!("Pet updated: ID={}", pet_id);
    Ok(Json(json!({ "message": "Pet updated successfully" })))
}

/// DELETE /api/pets/:id - delete a pet (appointments and records cascade)
pub async fn delete_pet(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(pet_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let owner_id = database::pet_owner(&state.pool, pet_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Pet not found"))?;
    policy::ensure_can_access(&caller, owner_id)?;

    let result = sqlx::query("DELETE FROM pets WHERE id = $1")
        .bind(pet_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Pet not found"));
    }

    tracing::info!("Pet deleted: ID={}", pet_id);
    Ok(Json(json!({ "message": "Pet deleted successfully" })))
}
