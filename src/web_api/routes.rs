//! API Routes

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use futures::{SinkExt, Stream, StreamExt};
use std::convert::Infallible;

use crate::camera_registry::{Camera, ReconfigureRequest};
use crate::error::Result;
use crate::models::{ApiResponse, CameraListResponse, EnabledRequest, EventQuery, ScanResponse};
use crate::patrol_scheduler::PatrolStatus;
use crate::realtime_hub::LogLine;
use crate::scan_gate::ScanControls;
use crate::state::AppState;
use crate::timeline::TimelineEntry;
use crate::toggle_store::Toggles;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(super::health_check))
        // Cameras
        .route("/api/cameras", get(list_cameras))
        .route("/api/cameras/:id", get(get_camera))
        .route("/api/cameras/:id", put(update_camera))
        .route("/api/cameras/:id/activate", post(activate_camera))
        // Scanning
        .route("/api/scan/controls", get(get_scan_controls))
        .route("/api/scan", post(trigger_scan))
        .route("/api/scan/location", post(trigger_location_scan))
        // Patrol
        .route("/api/patrol", get(get_patrol))
        .route("/api/patrol", put(set_patrol))
        // Settings
        .route("/api/settings/toggles", get(get_toggles))
        .route("/api/settings/lookout", put(set_lookout))
        // Events
        .route("/api/events", get(list_events))
        .route("/api/events/export", get(export_events))
        .route("/api/events/:id/snapshot", get(get_event_snapshot))
        // Activity log & live updates
        .route("/api/logs", get(list_logs))
        .route("/api/stream", get(sse_handler))
        .route("/api/ws", get(ws_handler))
        .nest("/api", super::chat_routes())
        .with_state(state)
}

// ========================================
// Camera Handlers
// ========================================

async fn list_cameras(State(state): State<AppState>) -> impl IntoResponse {
    let registry = state.station.registry();
    Json(ApiResponse::success(CameraListResponse {
        active_id: registry.active_id().await,
        cameras: registry.list().await,
    }))
}

async fn get_camera(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Camera>>> {
    let camera = state.station.camera(&id).await?;
    Ok(Json(ApiResponse::success(camera)))
}

/// PUT /api/cameras/:id - Add-camera flow (retargets the slot)
async fn update_camera(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReconfigureRequest>,
) -> Result<Json<ApiResponse<Camera>>> {
    let camera = state.station.reconfigure_camera(&id, req).await?;
    Ok(Json(ApiResponse::success(camera)))
}

async fn activate_camera(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Camera>>> {
    let camera = state.station.set_active(&id).await?;
    Ok(Json(ApiResponse::success(camera)))
}

// ========================================
// Scan Handlers
// ========================================

async fn get_scan_controls(State(state): State<AppState>) -> Json<ApiResponse<ScanControls>> {
    Json(ApiResponse::success(state.station.controls()))
}

fn scan_response(
    event: Option<crate::event_log_service::Event>,
) -> Json<ApiResponse<ScanResponse>> {
    Json(ApiResponse::success(ScanResponse {
        recorded: event.is_some(),
        event: event.as_ref().map(TimelineEntry::from),
    }))
}

/// POST /api/scan - Scan the active camera
async fn trigger_scan(State(state): State<AppState>) -> Result<Json<ApiResponse<ScanResponse>>> {
    let event = state.station.scan_active().await?;
    Ok(scan_response(event))
}

/// POST /api/scan/location - Situational scan of the station position
async fn trigger_location_scan(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ScanResponse>>> {
    let event = state.station.scan_current_location().await?;
    Ok(scan_response(event))
}

// ========================================
// Patrol & Settings Handlers
// ========================================

async fn get_patrol(State(state): State<AppState>) -> Json<ApiResponse<PatrolStatus>> {
    Json(ApiResponse::success(state.patrol.status()))
}

async fn set_patrol(
    State(state): State<AppState>,
    Json(req): Json<EnabledRequest>,
) -> Result<Json<ApiResponse<PatrolStatus>>> {
    let status = state.patrol.set_enabled(req.enabled).await?;
    Ok(Json(ApiResponse::success(status)))
}

async fn get_toggles(State(state): State<AppState>) -> Json<ApiResponse<Toggles>> {
    Json(ApiResponse::success(state.station.toggles().await))
}

async fn set_lookout(
    State(state): State<AppState>,
    Json(req): Json<EnabledRequest>,
) -> Result<Json<ApiResponse<Toggles>>> {
    let toggles = state.station.set_lookout(req.enabled).await?;
    Ok(Json(ApiResponse::success(toggles)))
}

// ========================================
// Event Handlers
// ========================================

/// GET /api/events - Timeline, newest first
async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventQuery>,
) -> Json<ApiResponse<Vec<TimelineEntry>>> {
    let mut entries = state.station.timeline().await;
    if let Some(limit) = query.limit {
        entries.truncate(limit);
    }
    Json(ApiResponse::success(entries))
}

/// GET /api/events/export - Self-contained HTML report
async fn export_events(State(state): State<AppState>) -> Response {
    let html = state.station.export_html().await;
    let filename = format!(
        "attachment; filename=\"patrol-report-{}.html\"",
        Utc::now().format("%Y%m%d-%H%M%S")
    );
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        html,
    )
        .into_response()
}

async fn get_event_snapshot(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Response> {
    let snapshot = state.station.event_snapshot(id).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, snapshot.mime_type)],
        snapshot.data,
    )
        .into_response())
}

// ========================================
// Activity Log & Live Updates
// ========================================

async fn list_logs(State(state): State<AppState>) -> Json<ApiResponse<Vec<LogLine>>> {
    Json(ApiResponse::success(state.station.hub().recent_logs().await))
}

/// GET /api/stream - Server-Sent Events feed of hub messages
async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<SseEvent, Infallible>>> {
    let hub = state.station.hub().clone();
    let (conn_id, rx) = hub.register().await;
    tracing::debug!(connection_id = %conn_id, "SSE client subscribed");

    // Initial controls so a fresh client can render immediately
    let initial = serde_json::to_string(&crate::realtime_hub::HubMessage::ScanControls(
        state.station.controls(),
    ))
    .ok();

    let stream = futures::stream::iter(initial)
        .chain(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|msg| (msg, rx))
        }))
        .map(|msg| Ok(SseEvent::default().data(msg)));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /api/ws - WebSocket feed of hub messages
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let hub = state.station.hub().clone();
    let (conn_id, mut rx) = hub.register().await;

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    hub.unregister(&conn_id).await;
}
