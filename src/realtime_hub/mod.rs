//! RealtimeHub - Live Update Distribution and Activity Log
//!
//! ## Responsibilities
//!
//! - Subscriber connection management (SSE clients)
//! - Broadcasting scan controls, recorded events, patrol and camera changes
//! - Keeping the operator-facing activity log (bounded, newest last)
//!
//! Every error the station surfaces to the operator goes through
//! [`RealtimeHub::log`], so it lands both in the activity log and on the wire.

use crate::camera_registry::Camera;
use crate::event_log_service::{Event, EventKind};
use crate::scan_gate::ScanControls;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Default activity log capacity
pub const DEFAULT_LOG_CAPACITY: usize = 200;

/// Hub message types
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum HubMessage {
    ScanControls(ScanControls),
    EventRecorded(EventRecordedMessage),
    LogLine(LogLine),
    PatrolStatus(PatrolStatusMessage),
    CameraChanged(CameraChangedMessage),
}

impl HubMessage {
    fn type_name(&self) -> &'static str {
        match self {
            HubMessage::ScanControls(_) => "scan_controls",
            HubMessage::EventRecorded(_) => "event_recorded",
            HubMessage::LogLine(_) => "log_line",
            HubMessage::PatrolStatus(_) => "patrol_status",
            HubMessage::CameraChanged(_) => "camera_changed",
        }
    }
}

/// Recorded event notification; clients fetch the timeline for images
#[derive(Debug, Clone, Serialize)]
pub struct EventRecordedMessage {
    pub event_id: u64,
    pub kind: EventKind,
    pub camera_id: Option<String>,
    pub location: String,
    pub assessment: String,
    pub object_count: usize,
    pub timestamp: String,
}

impl From<&Event> for EventRecordedMessage {
    fn from(event: &Event) -> Self {
        Self {
            event_id: event.id,
            kind: event.kind,
            camera_id: event.camera_id.clone(),
            location: event.location.clone(),
            assessment: event.assessment.clone(),
            object_count: event.objects.len(),
            timestamp: event.timestamp.to_rfc3339(),
        }
    }
}

/// Patrol armed/disarmed
#[derive(Debug, Clone, Serialize)]
pub struct PatrolStatusMessage {
    pub armed: bool,
    pub interval_sec: u64,
}

/// Camera slot changed or became active
#[derive(Debug, Clone, Serialize)]
pub struct CameraChangedMessage {
    pub camera: Camera,
    pub active: bool,
}

/// Activity log severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One human-readable activity log line
#[derive(Debug, Clone, Serialize)]
pub struct LogLine {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

/// Client connection
struct ClientConnection {
    id: Uuid,
    tx: mpsc::UnboundedSender<String>,
}

/// RealtimeHub instance
pub struct RealtimeHub {
    connections: RwLock<HashMap<Uuid, ClientConnection>>,
    connection_count: AtomicU64,
    activity: RwLock<VecDeque<LogLine>>,
    log_capacity: usize,
}

impl RealtimeHub {
    /// Create new RealtimeHub
    pub fn new(log_capacity: usize) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            connection_count: AtomicU64::new(0),
            activity: RwLock::new(VecDeque::with_capacity(log_capacity)),
            log_capacity: log_capacity.max(1),
        }
    }

    /// Register a new client
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, ClientConnection { id, tx });
        }
        self.connection_count.fetch_add(1, Ordering::Relaxed);

        tracing::info!(connection_id = %id, "Client connected");
        (id, rx)
    }

    /// Unregister a client
    pub async fn unregister(&self, id: &Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            self.connection_count.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(connection_id = %id, "Client disconnected");
        }
    }

    /// Broadcast message to all clients, dropping closed ones
    pub async fn broadcast(&self, message: HubMessage) {
        let json = match serde_json::to_string(&message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize message");
                return;
            }
        };
        tracing::debug!(message_type = message.type_name(), "Broadcasting message to clients");

        let closed: Vec<Uuid> = {
            let connections = self.connections.read().await;
            connections
                .values()
                .filter(|conn| conn.tx.send(json.clone()).is_err())
                .map(|conn| conn.id)
                .collect()
        };

        for id in closed {
            self.unregister(&id).await;
        }
    }

    /// Append to the activity log and push it to clients
    pub async fn log(&self, level: LogLevel, message: impl Into<String>) {
        let line = LogLine {
            at: Utc::now(),
            level,
            message: message.into(),
        };

        {
            let mut activity = self.activity.write().await;
            activity.push_back(line.clone());
            while activity.len() > self.log_capacity {
                activity.pop_front();
            }
        }

        self.broadcast(HubMessage::LogLine(line)).await;
    }

    /// Activity log, oldest first
    pub async fn recent_logs(&self) -> Vec<LogLine> {
        self.activity.read().await.iter().cloned().collect()
    }

    /// Get connection count
    pub fn connection_count(&self) -> u64 {
        self.connection_count.load(Ordering::Relaxed)
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_clients() {
        let hub = RealtimeHub::default();
        let (_id, mut rx) = hub.register().await;

        hub.broadcast(HubMessage::PatrolStatus(PatrolStatusMessage {
            armed: true,
            interval_sec: 30,
        }))
        .await;

        let json: serde_json::Value = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
        assert_eq!(json["type"], "patrol_status");
        assert_eq!(json["data"]["armed"], true);
    }

    #[tokio::test]
    async fn test_closed_clients_pruned() {
        let hub = RealtimeHub::default();
        let (_id, rx) = hub.register().await;
        drop(rx);
        assert_eq!(hub.connection_count(), 1);

        hub.log(LogLevel::Info, "hello").await;
        assert_eq!(hub.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_activity_log_bounded() {
        let hub = RealtimeHub::new(3);
        for i in 0..5 {
            hub.log(LogLevel::Warn, format!("line {}", i)).await;
        }
        let lines = hub.recent_logs().await;
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].message, "line 2");
        assert_eq!(lines[2].message, "line 4");
    }
}
