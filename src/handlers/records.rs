use std::path::{Path as FsPath, PathBuf};

use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::auth::policy;
use crate::database::{self, models::MedicalRecord};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// POST /api/medical-records - upload a file for a pet (multipart: pet_id, file)
///
/// Two side effects happen here with no transaction spanning them: the file
/// write and the metadata insert. If the insert fails, the just-written file
/// is deleted as a single compensating action.
pub async fn upload_medical_record(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let mut pet_id: Option<i32> = None;
    let mut file: Option<(String, Option<String>, Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(map_multipart_error)? {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "pet_id" => {
                let text = field.text().await.map_err(map_multipart_error)?;
                pet_id = text.trim().parse().ok();
            }
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(|ct| ct.to_string());
                let bytes = field.bytes().await.map_err(map_multipart_error)?;
                file = Some((file_name, content_type, bytes));
            }
            _ => {}
        }
    }

    let pet_id = match pet_id {
        Some(id) if id > 0 => id,
        _ => return Err(ApiError::validation_error("Valid pet_id is required")),
    };
    let (file_name, content_type, bytes) = match file {
        Some((name, ct, bytes)) if !name.is_empty() => (name, ct, bytes),
        _ => return Err(ApiError::validation_error("File is required")),
    };

    let owner_id = database::pet_owner(&state.pool, pet_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Pet not found"))?;
    policy::ensure_can_access(&caller, owner_id)?;

    // Idempotent; the directory may already exist
    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create upload directory: {}", e);
            ApiError::internal_server_error("Failed to create upload directory")
        })?;

    let stored_name = upload_filename(pet_id, Utc::now().timestamp(), &file_name);
    let file_path: PathBuf = FsPath::new(&state.config.upload_dir).join(&stored_name);

    let record_id = persist_upload(&file_path, &bytes, || async {
        sqlx::query_scalar::<_, i32>(
            "INSERT INTO medical_records (pet_id, file_name, file_path, file_type) \
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(pet_id)
        .bind(&file_name)
        .bind(file_path.to_string_lossy().as_ref())
        .bind(&content_type)
        .fetch_one(&state.pool)
        .await
    })
    .await?;

    tracing::info!(
        "Medical record uploaded: ID={}, Pet={}, File={}",
        record_id,
        pet_id,
        file_name
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "File uploaded successfully",
            "id": record_id,
            "file_name": file_name,
        })),
    ))
}

/// GET /api/medical-records/pet/:pet_id - list a pet's records
pub async fn list_medical_records(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(pet_id): Path<i32>,
) -> Result<Json<Vec<MedicalRecord>>, ApiError> {
    let owner_id = database::pet_owner(&state.pool, pet_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Pet not found"))?;
    policy::ensure_can_access(&caller, owner_id)?;

    let records = sqlx::query_as::<_, MedicalRecord>(
        "SELECT id, pet_id, file_name, file_path, file_type \
         FROM medical_records WHERE pet_id = $1 ORDER BY uploaded_at DESC",
    )
    .bind(pet_id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(records))
}

/// GET /api/medical-records/:id/download - stream the stored file
pub async fn download_medical_record(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(record_id): Path<i32>,
) -> Result<Response, ApiError> {
    let row = sqlx::query_as::<_, (String, String, i32)>(
        "SELECT mr.file_path, mr.file_name, p.owner_id \
         FROM medical_records mr JOIN pets p ON mr.pet_id = p.id \
         WHERE mr.id = $1",
    )
    .bind(record_id)
    .fetch_optional(&state.pool)
    .await?;

    let (file_path, file_name, owner_id) =
        row.ok_or_else(|| ApiError::not_found("Record not found"))?;
    policy::ensure_can_access(&caller, owner_id)?;

    let bytes = tokio::fs::read(&file_path).await.map_err(|e| {
        tracing::error!("File not found on disk: {}: {}", file_path, e);
        ApiError::not_found("File not found")
    })?;

    tracing::info!("Medical record downloaded: ID={}, User={}", record_id, caller.user_id);
    Ok((
        [
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", file_name),
            ),
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        ],
        bytes,
    )
        .into_response())
}

/// DELETE /api/medical-records/:id
///
/// The row deletion is the source of truth; removing the on-disk file is
/// best-effort and a failure there is only logged.
pub async fn delete_medical_record(
    State(state): State<AppState>,
    Extension(caller): Extension<AuthUser>,
    Path(record_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let row = sqlx::query_as::<_, (String, i32)>(
        "SELECT mr.file_path, p.owner_id \
         FROM medical_records mr JOIN pets p ON mr.pet_id = p.id \
         WHERE mr.id = $1",
    )
    .bind(record_id)
    .fetch_optional(&state.pool)
    .await?;

    let (file_path, owner_id) = row.ok_or_else(|| ApiError::not_found("Record not found"))?;
    policy::ensure_can_access(&caller, owner_id)?;

    let result = sqlx::query("DELETE FROM medical_records WHERE id = $1")
        .bind(record_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Record not found"));
    }

    if let Err(e) = tokio::fs::remove_file(&file_path).await {
        tracing::warn!("Failed to delete file from disk: {}", e);
    }

    tracing::info!("Medical record deleted: ID={}", record_id);
    Ok(Json(json!({ "message": "Medical record deleted successfully" })))
}

/// Collision-resistant stored filename: pet id, upload second, original name.
/// Same-second duplicates of the same name for the same pet still collide.
fn upload_filename(pet_id: i32, timestamp: i64, original: &str) -> String {
    format!("{}_{}_{}", pet_id, timestamp, original)
}

/// Write the file, then run the metadata insert. No transaction spans the
/// filesystem and the store, so a failed insert triggers exactly one
/// compensating delete of the just-written file; if that delete also fails
/// the orphan is logged and accepted.
async fn persist_upload<F, Fut>(
    file_path: &FsPath,
    bytes: &[u8],
    insert: F,
) -> Result<i32, ApiError>
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<i32, sqlx::Error>>,
{
    tokio::fs::write(file_path, bytes).await.map_err(|e| {
        tracing::error!("Failed to save file: {}", e);
        ApiError::internal_server_error("Failed to save file")
    })?;

    match insert().await {
        Ok(id) => Ok(id),
        Err(e) => {
            tracing::error!("Failed to save record metadata: {}", e);
            if let Err(rm_err) = tokio::fs::remove_file(file_path).await {
                tracing::warn!(
                    "Failed to remove orphaned upload {}: {}",
                    file_path.display(),
                    rm_err
                );
            }
            Err(ApiError::internal_server_error("Failed to save record"))
        }
    }
}

fn map_multipart_error(err: axum::extract::multipart::MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("File too large")
    } else {
        ApiError::validation_error("Invalid multipart form data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_filename_shape() {
        let name = upload_filename(3, 1_700_000_000, "xray.png");
        assert_eq!(name, "3_1700000000_xray.png");
    }

    #[test]
    fn test_upload_filename_keeps_extension() {
        let name = upload_filename(12, 42, "blood panel.pdf");
        assert!(name.ends_with(".pdf"));
        assert!(name.starts_with("12_42_"));
    }

    fn temp_upload_path(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("petclinic-upload-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name)
    }

    #[tokio::test]
    async fn test_failed_metadata_insert_leaves_no_file_on_disk() {
        let path = temp_upload_path("1_1_failed.txt");

        let result = persist_upload(&path, b"scan bytes", || async {
            Err(sqlx::Error::PoolTimedOut)
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        // Compensating delete ran: the written file must be gone
        assert!(!path.exists(), "orphaned file left at {}", path.display());
    }

    #[tokio::test]
    async fn test_successful_insert_keeps_the_file() {
        let path = temp_upload_path("1_2_kept.txt");

        let id = persist_upload(&path, b"scan bytes", || async { Ok(42) })
            .await
            .unwrap();

        assert_eq!(id, 42);
        assert!(path.exists());
        assert_eq!(std::fs::read(&path).unwrap(), b"scan bytes");
        std::fs::remove_file(&path).ok();
    }
}
