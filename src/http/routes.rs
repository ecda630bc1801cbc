//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::RoundPhase;
use crate::util::time::{started_at, uptime_secs};
use crate::ws::handler::ws_handler;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origin);

    Router::new()
        .route("/health", get(health_handler))
        .route("/rooms/:code", get(room_status_handler))
        .route("/ws", get(ws_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(10)))
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

/// CORS from CLIENT_ORIGIN: "*" allows any origin, otherwise a comma-separated list
fn cors_layer(client_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return cors.allow_origin(Any);
    }

    let allowed_origins: Vec<HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
        .collect();
    cors.allow_origin(allowed_origins)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    started_at: Option<DateTime<Utc>>,
    active_rooms: usize,
    connected_players: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        started_at: started_at(),
        active_rooms: state.registry.active_rooms(),
        connected_players: state.registry.connected_players(),
    })
}

// ============================================================================
// Room lookup
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoomStatusResponse {
    room_code: String,
    host: Uuid,
    phase: RoundPhase,
    round: u32,
    players: Vec<Uuid>,
}

/// Lobby lookup before joining over the socket
async fn room_status_handler(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<RoomStatusResponse>, AppError> {
    let code = code.to_ascii_uppercase();
    let handle = state
        .registry
        .room_handle(&code)
        .ok_or_else(|| AppError::NotFound(format!("Room {}", code)))?;

    let status = {
        let room = handle.lock();
        RoomStatusResponse {
            room_code: room.code().to_string(),
            host: room.host(),
            phase: room.phase(),
            round: room.round(),
            players: room.player_ids(),
        }
    };
    Ok(Json(status))
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, format!("{} not found", msg)),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
