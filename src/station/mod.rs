//! Station - Scan Orchestration Context
//!
//! ## Responsibilities
//!
//! - Own the orchestration state (registry, gate, event log, toggles)
//! - Run scans as explicit steps: admit, dispatch, record, release
//! - Surface every failure as an activity log line
//! - Relay gate and camera changes to live subscribers
//!
//! A scan holds a [`ScanPermit`] from admission until its event (if any) is
//! recorded, so event order always matches completion order. Admitted scans
//! run on their own task, so an in-flight analysis is never cancelled by a
//! dropped request.

use crate::ai_client::ConversationSession;
use crate::analysis_dispatcher::{prompts, AnalysisDispatcher, ScanMode, ScanOutcome};
use crate::camera_registry::{
    Camera, CameraKind, CameraRegistry, ConnectivityTransition, ReconfigureRequest,
};
use crate::error::{Error, Result};
use crate::event_log_service::{Event, EventKind, EventLogService, EventOrigin};
use crate::geolocation::GeolocationProvider;
use crate::realtime_hub::{
    CameraChangedMessage, EventRecordedMessage, HubMessage, LogLevel, RealtimeHub,
};
use crate::scan_gate::{ScanControls, ScanGate, ScanPermit};
use crate::snapshot_service::ImagePayload;
use crate::timeline::{self, TimelineEntry};
use crate::toggle_store::{ToggleStore, Toggles};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Collaborators the station is assembled from
pub struct StationParts {
    pub registry: Arc<CameraRegistry>,
    pub gate: Arc<ScanGate>,
    pub dispatcher: AnalysisDispatcher,
    pub events: EventLogService,
    pub toggles: ToggleStore,
    pub geolocation: Arc<dyn GeolocationProvider>,
    pub hub: Arc<RealtimeHub>,
}

/// Station instance
pub struct Station {
    registry: Arc<CameraRegistry>,
    gate: Arc<ScanGate>,
    dispatcher: AnalysisDispatcher,
    events: EventLogService,
    toggles: ToggleStore,
    geolocation: Arc<dyn GeolocationProvider>,
    hub: Arc<RealtimeHub>,
}

impl Station {
    /// Create new station
    pub fn new(parts: StationParts) -> Self {
        Self {
            registry: parts.registry,
            gate: parts.gate,
            dispatcher: parts.dispatcher,
            events: parts.events,
            toggles: parts.toggles,
            geolocation: parts.geolocation,
            hub: parts.hub,
        }
    }

    pub fn registry(&self) -> &Arc<CameraRegistry> {
        &self.registry
    }

    pub fn gate(&self) -> &Arc<ScanGate> {
        &self.gate
    }

    pub fn hub(&self) -> &Arc<RealtimeHub> {
        &self.hub
    }

    pub fn events(&self) -> &EventLogService {
        &self.events
    }

    pub fn session(&self) -> &Arc<dyn ConversationSession> {
        self.dispatcher.session()
    }

    pub fn controls(&self) -> ScanControls {
        self.gate.controls()
    }

    // ========================================
    // Scanning
    // ========================================

    /// Operator-triggered scan of the active camera
    ///
    /// Rejected with `AlreadyScanning` while another scan is in flight and
    /// with `ScanIneligible` for an offline active camera. Analysis failures
    /// do not error: they produce the degraded result.
    pub async fn scan_active(self: &Arc<Self>) -> Result<Option<Event>> {
        let camera = self.registry.active().await;
        let permit = match self.gate.begin_scan(camera.as_ref()) {
            Ok(permit) => permit,
            Err(Error::AlreadyScanning) => return Err(Error::AlreadyScanning),
            Err(e) => {
                self.hub.log(LogLevel::Warn, e.to_string()).await;
                return Err(e);
            }
        };

        let camera = camera
            .ok_or_else(|| Error::Internal("gate admitted a scan without camera".to_string()))?;
        let station = Arc::clone(self);
        self.detach(async move { station.run_scan(camera, permit).await }).await
    }

    /// Run an admitted scan on its own task; it completes even if the caller is dropped
    async fn detach<F>(&self, scan: F) -> Result<Option<Event>>
    where
        F: std::future::Future<Output = Option<Event>> + Send + 'static,
    {
        match tokio::spawn(scan).await {
            Ok(event) => Ok(event),
            Err(e) => {
                tracing::error!(error = %e, "Scan task failed");
                self.hub
                    .log(LogLevel::Error, format!("Scan task failed: {}", e))
                    .await;
                Err(Error::Internal(format!("scan task failed: {}", e)))
            }
        }
    }

    /// Wait for the gate to go idle, then scan the active camera
    ///
    /// Used by the patrol: a manual scan in flight delays this one.
    pub async fn scan_when_idle(&self) -> Option<Event> {
        let permit = self.gate.acquire_when_idle().await;

        let camera = match self.registry.active().await {
            Some(camera) if camera.is_scannable() => camera,
            other => {
                let label = other.map(|c| c.id).unwrap_or_else(|| "none".to_string());
                self.hub
                    .log(
                        LogLevel::Info,
                        format!("Patrol scan skipped: active camera {} is not scannable", label),
                    )
                    .await;
                return None;
            }
        };

        self.run_scan(camera, permit).await
    }

    /// Dispatch, record and report; the permit is released on return
    async fn run_scan(&self, camera: Camera, permit: ScanPermit) -> Option<Event> {
        let lookout = self.toggles.elevated_lookout().await;
        let mode = ScanMode::for_camera(&camera, lookout);
        let kind = match mode {
            ScanMode::Situational { .. } => EventKind::Situational,
            _ => EventKind::Visual,
        };

        tracing::info!(
            camera_id = %camera.id,
            kind = camera.kind().as_str(),
            lookout,
            "Scan started"
        );
        let outcome = self.dispatcher.dispatch(&camera, &mode).await;

        self.track_connectivity(&camera, &outcome).await;

        if let Some(err) = &outcome.failure {
            self.hub
                .log(
                    LogLevel::Error,
                    format!("Scan of {} ({}) failed: {}", camera.id, camera.location, err),
                )
                .await;
        }

        let event = self.events.record(kind, &outcome, &camera).await;
        match &event {
            Some(event) => self.announce(event).await,
            None if !outcome.is_degraded() => {
                self.hub
                    .log(
                        LogLevel::Info,
                        format!("{} ({}): nothing to report", camera.id, camera.location),
                    )
                    .await;
            }
            None => {}
        }

        drop(permit);
        event
    }

    async fn track_connectivity(&self, camera: &Camera, outcome: &ScanOutcome) {
        if camera.kind() != CameraKind::Local {
            return;
        }
        let online = match &outcome.failure {
            Some(Error::CaptureUnavailable(_)) => false,
            _ => outcome.frame.is_some(),
        };

        let transition = self.registry.update_connectivity(&camera.id, online).await;
        let message = match transition {
            Some(ConnectivityTransition::Lost) => {
                (LogLevel::Warn, format!("{} connection lost", camera.id))
            }
            Some(ConnectivityTransition::Recovered) => {
                (LogLevel::Info, format!("{} connection recovered", camera.id))
            }
            None => return,
        };
        self.hub.log(message.0, message.1).await;

        if let Some(updated) = self.registry.get(&camera.id).await {
            let active = self.registry.active_id().await == updated.id;
            self.hub
                .broadcast(HubMessage::CameraChanged(CameraChangedMessage {
                    camera: updated,
                    active,
                }))
                .await;
        }
    }

    async fn announce(&self, event: &Event) {
        self.hub
            .broadcast(HubMessage::EventRecorded(EventRecordedMessage::from(event)))
            .await;
    }

    /// Situational scan of the station's own position
    ///
    /// Shares the gate with camera scans. A denied position is logged and
    /// yields no event.
    pub async fn scan_current_location(self: &Arc<Self>) -> Result<Option<Event>> {
        let permit = self.gate.try_begin()?;
        let station = Arc::clone(self);
        self.detach(async move { station.run_location_scan(permit).await }).await
    }

    async fn run_location_scan(&self, permit: ScanPermit) -> Option<Event> {
        let coordinates = match self.geolocation.locate().await {
            Ok(c) => c,
            Err(e) => {
                self.hub.log(LogLevel::Warn, e.to_string()).await;
                return None;
            }
        };

        let location = coordinates.label();
        tracing::info!(location = %location, "Location scan started");
        let outcome = self
            .dispatcher
            .situational(&prompts::coordinates_prompt(
                coordinates.latitude,
                coordinates.longitude,
            ))
            .await;

        if let Some(err) = &outcome.failure {
            self.hub
                .log(
                    LogLevel::Error,
                    format!("Location scan at {} failed: {}", location, err),
                )
                .await;
        }

        let event = self
            .events
            .record_at(
                EventKind::Situational,
                &outcome,
                EventOrigin {
                    camera_id: None,
                    location,
                },
            )
            .await;
        if let Some(event) = &event {
            self.announce(event).await;
        }

        drop(permit);
        event
    }

    // ========================================
    // Cameras
    // ========================================

    pub async fn cameras(&self) -> Vec<Camera> {
        self.registry.list().await
    }

    pub async fn camera(&self, id: &str) -> Result<Camera> {
        self.registry
            .get(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("camera {}", id)))
    }

    /// Make a camera the scan target
    pub async fn set_active(&self, id: &str) -> Result<Camera> {
        let camera = self
            .registry
            .set_active(id)
            .await
            .ok_or_else(|| Error::NotFound(format!("camera {}", id)))?;

        self.hub
            .broadcast(HubMessage::CameraChanged(CameraChangedMessage {
                camera: camera.clone(),
                active: true,
            }))
            .await;
        Ok(camera)
    }

    /// Add-camera flow: retarget an existing slot
    pub async fn reconfigure_camera(&self, id: &str, req: ReconfigureRequest) -> Result<Camera> {
        let camera = match self.registry.reconfigure(id, req).await {
            Ok(camera) => camera,
            Err(e) => {
                self.hub.log(LogLevel::Error, e.to_string()).await;
                return Err(e);
            }
        };

        self.hub
            .log(
                LogLevel::Info,
                format!(
                    "{} now watches {} ({})",
                    camera.id,
                    camera.location,
                    camera.kind().as_str()
                ),
            )
            .await;

        let active = self.registry.active_id().await == camera.id;
        self.hub
            .broadcast(HubMessage::CameraChanged(CameraChangedMessage {
                camera: camera.clone(),
                active,
            }))
            .await;
        Ok(camera)
    }

    // ========================================
    // Chat, toggles, views
    // ========================================

    /// Free-text turn through the shared conversation session
    pub async fn chat(&self, message: &str) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::Validation("message must not be empty".to_string()));
        }

        match self.dispatcher.session().send(message).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                self.hub
                    .log(LogLevel::Error, format!("Chat failed: {}", e))
                    .await;
                Err(e)
            }
        }
    }

    pub async fn toggles(&self) -> Toggles {
        self.toggles.get().await
    }

    pub async fn set_lookout(&self, enabled: bool) -> Result<Toggles> {
        let toggles = self.toggles.set_lookout(enabled).await?;
        self.hub
            .log(
                LogLevel::Info,
                if enabled {
                    "Elevated lookout enabled"
                } else {
                    "Elevated lookout disabled"
                },
            )
            .await;
        Ok(toggles)
    }

    /// Persist the patrol flag (the scheduler owns arming)
    pub async fn persist_patrol(&self, enabled: bool) -> Result<Toggles> {
        self.toggles.set_patrol(enabled).await
    }

    pub async fn timeline(&self) -> Vec<TimelineEntry> {
        timeline::timeline(&self.events.list().await)
    }

    /// Static HTML report of the current log
    pub async fn export_html(&self) -> String {
        let count = self.events.len().await;
        tracing::info!(events = count, "Exporting event report");
        self.events.export().await
    }

    /// Latest snapshot of an event
    pub async fn event_snapshot(&self, id: u64) -> Result<ImagePayload> {
        self.events
            .list()
            .await
            .into_iter()
            .find(|e| e.id == id)
            .and_then(|e| e.snapshot)
            .ok_or_else(|| Error::NotFound(format!("snapshot for event {}", id)))
    }

    /// Relay gate enablement changes to live subscribers
    pub fn spawn_controls_relay(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.gate.subscribe();
        let hub = Arc::clone(&self.hub);
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let controls = rx.borrow_and_update().clone();
                hub.broadcast(HubMessage::ScanControls(controls)).await;
            }
        })
    }
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests;
