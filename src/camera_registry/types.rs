//! CameraRegistry Type Definitions

use serde::{Deserialize, Serialize};

/// Where a camera's picture comes from
///
/// Each variant carries only what that source needs: a capture device for
/// local cameras, a stream reference for remote feeds, nothing when offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CameraSource {
    /// Locally attached capture device (e.g. `/dev/video0`)
    Local { device: String },
    /// Remote feed, analysed situationally by location
    Stream { stream_ref: String },
    /// No signal
    Offline,
}

impl CameraSource {
    /// Kind tag without payload
    pub fn kind(&self) -> CameraKind {
        match self {
            CameraSource::Local { .. } => CameraKind::Local,
            CameraSource::Stream { .. } => CameraKind::Stream,
            CameraSource::Offline => CameraKind::Offline,
        }
    }
}

/// Camera kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraKind {
    Local,
    Stream,
    Offline,
}

impl CameraKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CameraKind::Local => "local",
            CameraKind::Stream => "stream",
            CameraKind::Offline => "offline",
        }
    }
}

/// Last observed connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    /// Never checked
    Unknown,
    Online,
    Offline,
}

/// Connectivity transition worth reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityTransition {
    Lost,
    Recovered,
}

/// A camera slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub id: String,
    pub location: String,
    pub source: CameraSource,
    pub connectivity: Connectivity,
}

impl Camera {
    pub fn kind(&self) -> CameraKind {
        self.source.kind()
    }

    /// Offline cameras are never scannable
    pub fn is_scannable(&self) -> bool {
        self.kind() != CameraKind::Offline
    }
}

/// Static camera configuration entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSeed {
    pub id: String,
    pub location: String,
    #[serde(flatten)]
    pub source: CameraSource,
}

impl CameraSeed {
    pub fn new(id: &str, location: &str, source: CameraSource) -> Self {
        Self {
            id: id.to_string(),
            location: location.to_string(),
            source,
        }
    }
}

/// Request body for the add-camera flow (retargets an existing slot)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconfigureRequest {
    pub location: String,
    pub kind: CameraKind,
    /// Device path for local cameras, stream URL for stream cameras
    #[serde(default)]
    pub stream_ref: Option<String>,
}

/// Default slots used when no seed file is configured
pub fn default_seeds() -> Vec<CameraSeed> {
    vec![
        CameraSeed::new(
            "CAM-01",
            "Main Entrance",
            CameraSource::Local {
                device: "/dev/video0".to_string(),
            },
        ),
        CameraSeed::new("CAM-02", "Parking Lot", CameraSource::Offline),
        CameraSeed::new("CAM-03", "Loading Dock", CameraSource::Offline),
        CameraSeed::new("CAM-04", "Rear Perimeter", CameraSource::Offline),
    ]
}
