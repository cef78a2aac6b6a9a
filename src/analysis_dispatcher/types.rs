//! AnalysisDispatcher types

use crate::error::Error;
use crate::snapshot_service::ImagePayload;
use serde::{Deserialize, Serialize};

/// Assessment used when a scan could not be completed
pub const FAILED_ASSESSMENT: &str = "Scan failed.";
/// Action used when a scan could not be completed
pub const FAILED_ACTION: &str = "Retry";
/// Action attached to free-text situational reports
pub const SITUATIONAL_ACTION: &str = "Monitor";

/// Normalized box, all coordinates in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub y_min: f64,
    pub x_min: f64,
    pub y_max: f64,
    pub x_max: f64,
}

/// One detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub name: String,
    /// In [0, 1]
    pub confidence: f64,
    pub bounding_box: BoundingBox,
}

/// Normalized analysis record, immutable once produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub assessment: String,
    pub recommended_action: String,
    pub objects: Vec<DetectedObject>,
}

impl AnalysisResult {
    /// Substitute for any failed scan
    pub fn degraded() -> Self {
        Self {
            assessment: FAILED_ASSESSMENT.to_string(),
            recommended_action: FAILED_ACTION.to_string(),
            objects: Vec::new(),
        }
    }

    /// Wrap free text into the common shape
    pub fn situational(text: &str) -> Self {
        Self {
            assessment: text.trim().to_string(),
            recommended_action: SITUATIONAL_ACTION.to_string(),
            objects: Vec::new(),
        }
    }
}

/// How a scan is carried out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanMode {
    /// Capture a frame from the local camera and analyse it
    LocalCapture { lookout: bool },
    /// Send a situational prompt through the conversation session
    Situational { location: String, prompt: String },
    /// Never dispatched; present so the mapping from camera kind is total
    Offline,
}

/// Result of one dispatch
#[derive(Debug)]
pub struct ScanOutcome {
    pub result: AnalysisResult,
    /// Frame the analysis ran on (local capture only)
    pub frame: Option<ImagePayload>,
    /// Why the result is degraded, if it is
    pub failure: Option<Error>,
}

impl ScanOutcome {
    pub fn completed(result: AnalysisResult, frame: Option<ImagePayload>) -> Self {
        Self {
            result,
            frame,
            failure: None,
        }
    }

    pub fn failed(error: Error, frame: Option<ImagePayload>) -> Self {
        Self {
            result: AnalysisResult::degraded(),
            frame,
            failure: Some(error),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }
}
