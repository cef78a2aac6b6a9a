//! Shared API models
//!
//! Request and response bodies used by the web layer.

use crate::timeline::TimelineEntry;
use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
    pub ai_model: String,
    pub patrol_armed: bool,
    pub scanning: bool,
    pub events: usize,
    pub subscribers: u64,
}

/// `{ "enabled": bool }`
#[derive(Debug, Clone, Deserialize)]
pub struct EnabledRequest {
    pub enabled: bool,
}

/// Scan trigger result
#[derive(Debug, Clone, Serialize)]
pub struct ScanResponse {
    /// Whether the scan produced a timeline entry
    pub recorded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<TimelineEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventQuery {
    pub limit: Option<usize>,
}

/// Camera slots with the current scan target
#[derive(Debug, Clone, Serialize)]
pub struct CameraListResponse {
    pub active_id: String,
    pub cameras: Vec<crate::camera_registry::Camera>,
}
