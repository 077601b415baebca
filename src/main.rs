use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Json},
    routing::{delete, get, post},
    Router,
};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use petclinic_api::config::AppConfig;
use petclinic_api::database;
use petclinic_api::handlers;
use petclinic_api::middleware::jwt_auth_middleware;
use petclinic_api::state::AppState;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env();

    let pool = database::connect_lazy(&config.database_url)
        .unwrap_or_else(|e| panic!("invalid DATABASE_URL: {}", e));

    // Pool is lazy; bootstrap is best-effort so the process can come up
    // before the store does. Health reports degraded until it succeeds.
    if let Err(e) = database::init_schema(&pool).await {
        tracing::warn!("Schema bootstrap failed, store may be unreachable: {}", e);
    }

    let state = AppState::new(pool, config);
    let port = state.config.server_port;
    let app = app(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("Pet Clinic API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app(state: AppState) -> Router {
    // Every protected route sits behind the bearer-token gate
    let protected = Router::new()
        .merge(pet_routes())
        .merge(appointment_routes())
        .merge(medical_record_routes())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_middleware,
        ));

    Router::new()
        // Public
        .route("/api/register", post(handlers::auth::register))
        .route("/api/login", post(handlers::auth::login))
        .route("/api/health", get(health))
        .merge(protected)
        // Global middleware
        .layer(DefaultBodyLimit::max(state.config.max_upload_size))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn pet_routes() -> Router<AppState> {
    use handlers::pets;

    Router::new()
        .route("/api/pets", post(pets::create_pet).get(pets::list_pets))
        .route(
            "/api/pets/:id",
            get(pets::get_pet_by_id)
                .put(pets::update_pet)
                .delete(pets::delete_pet),
        )
}

fn appointment_routes() -> Router<AppState> {
    use handlers::appointments;

    Router::new()
        .route(
            "/api/appointments",
            post(appointments::create_appointment).get(appointments::list_appointments),
        )
        .route(
            "/api/appointments/:id",
            get(appointments::get_appointment_by_id)
                .put(appointments::update_appointment)
                .delete(appointments::delete_appointment),
        )
}

fn medical_record_routes() -> Router<AppState> {
    use handlers::records;

    Router::new()
        .route("/api/medical-records", post(records::upload_medical_record))
        .route(
            "/api/medical-records/pet/:pet_id",
            get(records::list_medical_records),
        )
        .route(
            "/api/medical-records/:id/download",
            get(records::download_medical_record),
        )
        .route(
            "/api/medical-records/:id",
            delete(records::delete_medical_record),
        )
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match database::health_check(&state.pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "service": "Pet Clinic API",
                "database": "ok",
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "service": "Pet Clinic API",
                    "database": "unreachable",
                })),
            )
        }
    }
}
