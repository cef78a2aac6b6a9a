//! Chat API Routes
//!
//! Operator messages share the conversation session used for situational
//! scans, so earlier briefings are part of the context.

use axum::{extract::State, routing::post, Json, Router};

use crate::error::Result;
use crate::models::{ApiResponse, ChatRequest, ChatResponse};
use crate::state::AppState;

/// Create chat routes
pub fn chat_routes() -> Router<AppState> {
    Router::new().route("/chat", post(send_message))
}

/// POST /api/chat - One conversational turn
async fn send_message(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ApiResponse<ChatResponse>>> {
    let reply = state.station.chat(&req.message).await?;
    Ok(Json(ApiResponse::success(ChatResponse { reply })))
}
