//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes
//! - Request validation
//! - Response formatting
//! - Live update channels (SSE, WebSocket)

mod chat_routes;
mod routes;

pub use chat_routes::chat_routes;
pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_sec: state.started_at.elapsed().as_secs(),
        ai_model: state.config.ai_model.clone(),
        patrol_armed: state.patrol.is_armed(),
        scanning: state.station.gate().is_scanning(),
        events: state.station.events().len().await,
        subscribers: state.station.hub().connection_count(),
    };

    Json(response)
}
