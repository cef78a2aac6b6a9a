//! ScanGate types

use crate::camera_registry::CameraKind;
use serde::{Deserialize, Serialize};

/// UI enablement derived from the gate and the active camera
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanControls {
    /// An analysis is in flight
    pub scanning: bool,
    /// The scan trigger may be offered to the operator
    pub scan_enabled: bool,
    pub active_camera_id: Option<String>,
    pub active_kind: Option<CameraKind>,
}
