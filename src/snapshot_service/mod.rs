//! SnapshotService - Still Frame Capture from Local Cameras
//!
//! ## Responsibilities
//!
//! - Produce a fresh still frame of a local camera on demand
//! - Report `CaptureUnavailable` when no live feed is attached
//!
//! The production source runs ffmpeg against the capture device and reads a
//! single MJPEG frame from stdout.

use crate::camera_registry::{Camera, CameraSource};
use crate::error::{Error, Result};
use async_trait::async_trait;
use base64::Engine;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Encoded image bytes with their MIME type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImagePayload {
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            data,
        }
    }

    pub fn new(mime_type: &str, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data,
        }
    }

    /// Standard base64 of the raw bytes
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// `data:` URI suitable for inlining into HTML
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.to_base64())
    }
}

/// Media capture surface
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Capture one still frame from the camera's live feed
    async fn capture(&self, camera: &Camera) -> Result<ImagePayload>;
}

/// ffmpeg-backed capture from a V4L2 device
pub struct FfmpegFrameSource {
    timeout: Duration,
}

impl FfmpegFrameSource {
    /// Create new source
    ///
    /// # Arguments
    /// * `timeout_sec` - Upper bound for one capture, the process is killed after it
    pub fn new(timeout_sec: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_sec),
        }
    }

    async fn capture_device(&self, device: &str) -> Result<Vec<u8>> {
        // kill_on_drop: a timed-out capture must not leave ffmpeg holding the device
        let child = Command::new("ffmpeg")
            .args([
                "-f",
                "v4l2",
                "-i",
                device,
                "-frames:v",
                "1",
                "-f",
                "image2pipe",
                "-vcodec",
                "mjpeg",
                "-loglevel",
                "error",
                "-y",
                "-",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::CaptureUnavailable(format!("ffmpeg spawn failed: {}", e)))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(Error::CaptureUnavailable(format!(
                        "ffmpeg failed: {}",
                        stderr.trim()
                    )));
                }
                if output.stdout.is_empty() {
                    return Err(Error::CaptureUnavailable(
                        "ffmpeg returned empty output".to_string(),
                    ));
                }
                Ok(output.stdout)
            }
            Ok(Err(e)) => Err(Error::CaptureUnavailable(format!(
                "ffmpeg execution failed: {}",
                e
            ))),
            Err(_) => {
                tracing::warn!(
                    timeout_sec = self.timeout.as_secs(),
                    device = %device,
                    "ffmpeg capture timeout, process killed"
                );
                Err(Error::CaptureUnavailable(format!(
                    "ffmpeg timeout ({}s)",
                    self.timeout.as_secs()
                )))
            }
        }
    }
}

#[async_trait]
impl FrameSource for FfmpegFrameSource {
    async fn capture(&self, camera: &Camera) -> Result<ImagePayload> {
        let device = match &camera.source {
            CameraSource::Local { device } => device,
            _ => {
                return Err(Error::CaptureUnavailable(format!(
                    "camera {} has no local capture device",
                    camera.id
                )))
            }
        };

        let data = self.capture_device(device).await?;
        tracing::debug!(
            camera_id = %camera.id,
            size = data.len(),
            "Frame captured via ffmpeg"
        );
        Ok(ImagePayload::jpeg(data))
    }
}
