//! EventLogService - Bounded Scan Event Log
//!
//! ## Responsibilities
//!
//! - Turn scan outcomes into events (Visual / Situational)
//! - Keep the most recent events, newest first, bounded by capacity
//! - Attach a snapshot to every recorded event
//!
//! ## Recording rules
//!
//! - Visual scans with no detected objects record nothing
//! - Situational scans always record, with the text as the report and a
//!   synthesized report image as the snapshot

use crate::analysis_dispatcher::{DetectedObject, ScanOutcome};
use crate::camera_registry::Camera;
use crate::report_renderer::{self, ReportCard};
use crate::snapshot_service::ImagePayload;
use crate::timeline;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Default event capacity
pub const DEFAULT_CAPACITY: usize = 50;

/// Event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Local capture with detected objects
    Visual,
    /// Free-text report for a location
    Situational,
}

impl EventKind {
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Visual => "Visual",
            EventKind::Situational => "Situational",
        }
    }
}

/// Recorded scan event
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Time-derived, strictly increasing
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    /// `None` for scans of the station's own coordinates
    pub camera_id: Option<String>,
    pub location: String,
    pub assessment: String,
    pub recommended_action: String,
    pub objects: Vec<DetectedObject>,
    #[serde(skip)]
    pub snapshot: Option<ImagePayload>,
    /// Full text report (situational only)
    pub report: Option<String>,
}

/// Where a scan looked
#[derive(Debug, Clone)]
pub struct EventOrigin {
    pub camera_id: Option<String>,
    pub location: String,
}

impl From<&Camera> for EventOrigin {
    fn from(camera: &Camera) -> Self {
        Self {
            camera_id: Some(camera.id.clone()),
            location: camera.location.clone(),
        }
    }
}

/// Newest-first bounded buffer
struct EventRingBuffer {
    events: VecDeque<Event>,
    capacity: usize,
    last_id: u64,
}

impl EventRingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
            last_id: 0,
        }
    }

    fn next_id(&mut self, at: DateTime<Utc>) -> u64 {
        let millis = at.timestamp_millis().max(0) as u64;
        self.last_id = millis.max(self.last_id + 1);
        self.last_id
    }

    fn push(&mut self, event: Event) {
        self.events.push_front(event);
        while self.events.len() > self.capacity {
            self.events.pop_back();
        }
    }
}

/// EventLogService instance
pub struct EventLogService {
    buffer: RwLock<EventRingBuffer>,
}

impl EventLogService {
    /// Create new EventLogService
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: RwLock::new(EventRingBuffer::new(capacity.max(1))),
        }
    }

    /// Record a camera scan; returns the event if one was recorded
    pub async fn record(
        &self,
        kind: EventKind,
        outcome: &ScanOutcome,
        camera: &Camera,
    ) -> Option<Event> {
        self.record_at(kind, outcome, EventOrigin::from(camera)).await
    }

    /// Record a scan for an arbitrary origin
    pub async fn record_at(
        &self,
        kind: EventKind,
        outcome: &ScanOutcome,
        origin: EventOrigin,
    ) -> Option<Event> {
        let result = &outcome.result;
        if kind == EventKind::Visual && result.objects.is_empty() {
            tracing::debug!(
                camera_id = ?origin.camera_id,
                "Nothing detected, no event recorded"
            );
            return None;
        }

        let timestamp = Utc::now();
        let (snapshot, report) = match kind {
            EventKind::Visual => (visual_snapshot(outcome), None),
            EventKind::Situational => {
                let card = report_renderer::render_report_card(&ReportCard {
                    title: "Situational Report",
                    location: &origin.location,
                    timestamp,
                    body: &result.assessment,
                });
                (Some(card), Some(result.assessment.clone()))
            }
        };

        let mut buffer = self.buffer.write().await;
        let event = Event {
            id: buffer.next_id(timestamp),
            timestamp,
            kind,
            camera_id: origin.camera_id,
            location: origin.location,
            assessment: result.assessment.clone(),
            recommended_action: result.recommended_action.clone(),
            objects: result.objects.clone(),
            snapshot,
            report,
        };
        buffer.push(event.clone());

        tracing::debug!(
            event_id = event.id,
            kind = event.kind.label(),
            total = buffer.events.len(),
            "Event recorded"
        );
        Some(event)
    }

    /// All events, newest first
    pub async fn list(&self) -> Vec<Event> {
        let buffer = self.buffer.read().await;
        buffer.events.iter().cloned().collect()
    }

    /// Latest `count` events, newest first
    pub async fn latest(&self, count: usize) -> Vec<Event> {
        let buffer = self.buffer.read().await;
        buffer.events.iter().take(count).cloned().collect()
    }

    /// Get event count
    pub async fn len(&self) -> usize {
        self.buffer.read().await.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn capacity(&self) -> usize {
        self.buffer.read().await.capacity
    }

    /// Static HTML report of the current log, in log order
    pub async fn export(&self) -> String {
        let buffer = self.buffer.read().await;
        let events: Vec<&Event> = buffer.events.iter().collect();
        timeline::export_html(&events, Utc::now())
    }
}

impl Default for EventLogService {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Annotated frame, falling back to the raw frame if it cannot be decoded
fn visual_snapshot(outcome: &ScanOutcome) -> Option<ImagePayload> {
    let frame = outcome.frame.as_ref()?;
    match report_renderer::annotate_frame(frame, &outcome.result.objects) {
        Ok(annotated) => Some(annotated),
        Err(e) => {
            tracing::warn!(error = %e, "Snapshot annotation failed, keeping raw frame");
            Some(frame.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis_dispatcher::{AnalysisResult, BoundingBox};
    use crate::camera_registry::{CameraSource, Connectivity};
    use crate::error::Error;

    fn camera() -> Camera {
        Camera {
            id: "CAM-01".to_string(),
            location: "Main Entrance".to_string(),
            source: CameraSource::Local {
                device: "/dev/video0".to_string(),
            },
            connectivity: Connectivity::Online,
        }
    }

    fn person() -> DetectedObject {
        DetectedObject {
            name: "person".to_string(),
            confidence: 0.8,
            bounding_box: BoundingBox {
                y_min: 0.1,
                x_min: 0.1,
                y_max: 0.5,
                x_max: 0.5,
            },
        }
    }

    fn visual(objects: Vec<DetectedObject>) -> ScanOutcome {
        ScanOutcome::completed(
            AnalysisResult {
                assessment: "Someone at the door".to_string(),
                recommended_action: "Observe".to_string(),
                objects,
            },
            Some(ImagePayload::jpeg(vec![0xff, 0xd8, 0x00])),
        )
    }

    #[tokio::test]
    async fn test_visual_without_objects_not_recorded() {
        let log = EventLogService::default();
        let recorded = log.record(EventKind::Visual, &visual(vec![]), &camera()).await;
        assert!(recorded.is_none());
        assert!(log.is_empty().await);
    }

    #[tokio::test]
    async fn test_visual_with_objects_keeps_frame() {
        let log = EventLogService::default();
        let event = log
            .record(EventKind::Visual, &visual(vec![person()]), &camera())
            .await
            .unwrap();

        assert_eq!(event.camera_id.as_deref(), Some("CAM-01"));
        assert_eq!(event.objects.len(), 1);
        assert!(event.report.is_none());
        // Undecodable frame falls back to the raw bytes
        assert_eq!(event.snapshot.unwrap().data, vec![0xff, 0xd8, 0x00]);
    }

    #[tokio::test]
    async fn test_situational_always_recorded_with_report() {
        let log = EventLogService::default();
        let outcome = ScanOutcome::completed(AnalysisResult::situational("Quiet street."), None);
        let event = log
            .record(EventKind::Situational, &outcome, &camera())
            .await
            .unwrap();

        assert_eq!(event.report.as_deref(), Some("Quiet street."));
        assert_eq!(event.recommended_action, "Monitor");
        assert_eq!(event.snapshot.unwrap().mime_type, "image/svg+xml");
    }

    #[tokio::test]
    async fn test_degraded_situational_recorded() {
        let log = EventLogService::default();
        let outcome = ScanOutcome::failed(Error::AnalysisTransport("down".to_string()), None);
        let event = log
            .record(EventKind::Situational, &outcome, &camera())
            .await
            .unwrap();
        assert_eq!(event.assessment, "Scan failed.");
        assert_eq!(event.recommended_action, "Retry");
    }

    #[tokio::test]
    async fn test_bounded_newest_first() {
        let log = EventLogService::new(50);
        for i in 0..51 {
            let outcome =
                ScanOutcome::completed(AnalysisResult::situational(&format!("report {}", i)), None);
            log.record(EventKind::Situational, &outcome, &camera()).await;
        }

        let events = log.list().await;
        assert_eq!(events.len(), 50);
        assert_eq!(events[0].assessment, "report 50");
        assert_eq!(events[49].assessment, "report 1");
        assert!(events.windows(2).all(|w| w[0].id > w[1].id));
    }

    #[tokio::test]
    async fn test_export_does_not_mutate() {
        let log = EventLogService::default();
        log.record(EventKind::Visual, &visual(vec![person()]), &camera())
            .await;
        let html = log.export().await;
        assert!(html.contains("Someone at the door"));
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn test_origin_without_camera() {
        let log = EventLogService::default();
        let outcome = ScanOutcome::completed(AnalysisResult::situational("Clear"), None);
        let event = log
            .record_at(
                EventKind::Situational,
                &outcome,
                EventOrigin {
                    camera_id: None,
                    location: "51.50, -0.12".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(event.camera_id.is_none());
        assert_eq!(log.latest(1).await[0].location, "51.50, -0.12");
    }
}
