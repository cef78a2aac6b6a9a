//! AnalysisDispatcher - Request Building and Reply Normalization
//!
//! ## Responsibilities
//!
//! - Pick the request shape for the active camera (capture vs. situational)
//! - Send it to the analysis capability or the conversation session
//! - Normalize the reply into an [`AnalysisResult`]
//!
//! Capture, transport and schema failures never escape `dispatch`: they are
//! logged and replaced by the degraded "Scan failed." result.

pub mod prompts;
mod types;

pub use types::*;

use crate::ai_client::{AiReply, AnalysisCapability, AnalysisRequest, ConversationSession};
use crate::camera_registry::{Camera, CameraSource};
use crate::error::{Error, Result};
use crate::snapshot_service::FrameSource;
use serde::Deserialize;
use std::sync::Arc;

impl ScanMode {
    /// Mode for a camera's source
    pub fn for_camera(camera: &Camera, lookout: bool) -> Self {
        match &camera.source {
            CameraSource::Local { .. } => ScanMode::LocalCapture { lookout },
            CameraSource::Stream { .. } => ScanMode::Situational {
                location: camera.location.clone(),
                prompt: prompts::location_prompt(&camera.location),
            },
            CameraSource::Offline => ScanMode::Offline,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawAnalysis {
    assessment: String,
    action: String,
    objects: Vec<RawObject>,
}

#[derive(Debug, Deserialize)]
struct RawObject {
    name: String,
    confidence: f64,
    #[serde(rename = "box")]
    bbox: Vec<f64>,
}

/// Validate a structured reply against the analysis schema
pub fn parse_analysis(value: serde_json::Value) -> Result<AnalysisResult> {
    let raw: RawAnalysis = serde_json::from_value(value)
        .map_err(|e| Error::MalformedAnalysisResponse(e.to_string()))?;

    let in_unit = |v: f64| (0.0..=1.0).contains(&v);
    let mut objects = Vec::with_capacity(raw.objects.len());

    for obj in raw.objects {
        if !in_unit(obj.confidence) {
            return Err(Error::MalformedAnalysisResponse(format!(
                "confidence {} for {} outside [0, 1]",
                obj.confidence, obj.name
            )));
        }
        let [y_min, x_min, y_max, x_max] = <[f64; 4]>::try_from(obj.bbox.as_slice())
            .map_err(|_| {
                Error::MalformedAnalysisResponse(format!(
                    "box for {} must have 4 values, got {}",
                    obj.name,
                    obj.bbox.len()
                ))
            })?;
        if ![y_min, x_min, y_max, x_max].into_iter().all(in_unit)
            || y_min > y_max
            || x_min > x_max
        {
            return Err(Error::MalformedAnalysisResponse(format!(
                "box for {} is not a normalized rectangle",
                obj.name
            )));
        }

        objects.push(DetectedObject {
            name: obj.name,
            confidence: obj.confidence,
            bounding_box: BoundingBox {
                y_min,
                x_min,
                y_max,
                x_max,
            },
        });
    }

    Ok(AnalysisResult {
        assessment: raw.assessment,
        recommended_action: raw.action,
        objects,
    })
}

/// AnalysisDispatcher instance
pub struct AnalysisDispatcher {
    frames: Arc<dyn FrameSource>,
    analysis: Arc<dyn AnalysisCapability>,
    session: Arc<dyn ConversationSession>,
}

impl AnalysisDispatcher {
    /// Create new dispatcher
    pub fn new(
        frames: Arc<dyn FrameSource>,
        analysis: Arc<dyn AnalysisCapability>,
        session: Arc<dyn ConversationSession>,
    ) -> Self {
        Self {
            frames,
            analysis,
            session,
        }
    }

    /// The process-wide conversation session
    pub fn session(&self) -> &Arc<dyn ConversationSession> {
        &self.session
    }

    /// Run one analysis for a camera
    pub async fn dispatch(&self, camera: &Camera, mode: &ScanMode) -> ScanOutcome {
        let outcome = match mode {
            ScanMode::LocalCapture { lookout } => self.local_capture(camera, *lookout).await,
            ScanMode::Situational { prompt, .. } => self.situational(prompt).await,
            ScanMode::Offline => {
                tracing::error!(
                    camera_id = %camera.id,
                    "Dispatch reached for offline camera, ignoring"
                );
                ScanOutcome::failed(
                    Error::ScanIneligible(format!("camera {} is offline", camera.id)),
                    None,
                )
            }
        };

        if let Some(err) = &outcome.failure {
            tracing::warn!(
                camera_id = %camera.id,
                error = %err,
                "Scan degraded"
            );
        } else {
            tracing::info!(
                camera_id = %camera.id,
                objects = outcome.result.objects.len(),
                "Scan completed"
            );
        }
        outcome
    }

    /// Situational analysis for an arbitrary prompt (no camera involved)
    pub async fn situational(&self, prompt: &str) -> ScanOutcome {
        match self.session.send(prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                ScanOutcome::completed(AnalysisResult::situational(&text), None)
            }
            Ok(_) => ScanOutcome::failed(
                Error::MalformedAnalysisResponse("empty situational reply".to_string()),
                None,
            ),
            Err(e) => ScanOutcome::failed(e, None),
        }
    }

    async fn local_capture(&self, camera: &Camera, lookout: bool) -> ScanOutcome {
        let frame = match self.frames.capture(camera).await {
            Ok(frame) => frame,
            Err(e) => return ScanOutcome::failed(as_capture_error(e), None),
        };

        let request = AnalysisRequest::text(prompts::capture_prompt(lookout))
            .with_image(frame.clone())
            .with_schema(prompts::analysis_schema());

        let parsed = match self.analysis.analyze(request).await {
            Ok(AiReply::Structured(value)) => parse_analysis(value),
            Ok(AiReply::Text(text)) => serde_json::from_str(&text)
                .map_err(|e| Error::MalformedAnalysisResponse(e.to_string()))
                .and_then(parse_analysis),
            Err(e) => Err(e),
        };

        match parsed {
            Ok(result) => ScanOutcome::completed(result, Some(frame)),
            Err(e) => ScanOutcome::failed(e, Some(frame)),
        }
    }
}

fn as_capture_error(err: Error) -> Error {
    match err {
        Error::CaptureUnavailable(_) => err,
        other => Error::CaptureUnavailable(other.to_string()),
    }
}
