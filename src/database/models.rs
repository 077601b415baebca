use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Pet {
    pub id: i32,
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub owner_id: i32,
    pub medical_history: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Appointment {
    pub id: i32,
    pub pet_id: i32,
    pub date: DateTime<Utc>,
    pub reason: Option<String>,
    pub status: String,
}

/// Stored file metadata; the bytes live on disk at file_path.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MedicalRecord {
    pub id: i32,
    pub pet_id: i32,
    pub file_name: String,
    pub file_path: String,
    pub file_type: Option<String>,
}

// Request bodies

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub contact: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PetRequest {
    pub name: Option<String>,
    pub species: Option<String>,
    pub breed: Option<String>,
    pub owner_id: Option<i32>,
    pub medical_history: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentRequest {
    pub pet_id: Option<i32>,
    pub date: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub status: Option<String>,
}
