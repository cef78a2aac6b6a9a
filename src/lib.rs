//! Patrol Station Library
//!
//! Multi-camera monitoring station engine
//!
//! ## Architecture
//!
//! 1. CameraRegistry - Camera slots, active camera, connectivity
//! 2. ScanGate - Single-flight scan admission
//! 3. SnapshotService - Still frame capture from local cameras
//! 4. AIClient - Analysis and conversation capabilities (Gemini)
//! 5. AnalysisDispatcher - Request building and reply normalization
//! 6. EventLogService - Bounded newest-first event log
//! 7. Timeline - Display list and static HTML export
//! 8. PatrolScheduler - Timer-driven camera cycling
//! 9. Station - Scan orchestration context
//! 10. RealtimeHub - SSE/WebSocket distribution and activity log
//! 11. WebAPI - REST API endpoints
//!
//! Supporting modules: ReportRenderer, ToggleStore, Geolocation.

pub mod ai_client;
pub mod analysis_dispatcher;
pub mod camera_registry;
pub mod error;
pub mod event_log_service;
pub mod geolocation;
pub mod models;
pub mod patrol_scheduler;
pub mod realtime_hub;
pub mod report_renderer;
pub mod scan_gate;
pub mod snapshot_service;
pub mod state;
pub mod station;
pub mod timeline;
pub mod toggle_store;
pub mod web_api;

pub use error::{Error, Result};
pub use state::AppState;
