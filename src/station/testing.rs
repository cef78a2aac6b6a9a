//! Test doubles for the station's external capabilities

use super::{Station, StationParts};
use crate::ai_client::{AiReply, AnalysisCapability, AnalysisRequest, ConversationSession};
use crate::analysis_dispatcher::AnalysisDispatcher;
use crate::camera_registry::{Camera, CameraRegistry, CameraSeed, CameraSource};
use crate::error::{Error, Result};
use crate::event_log_service::EventLogService;
use crate::geolocation::{ConfiguredGeolocation, Coordinates};
use crate::realtime_hub::RealtimeHub;
use crate::scan_gate::ScanGate;
use crate::snapshot_service::{FrameSource, ImagePayload};
use crate::toggle_store::{ToggleStore, Toggles};
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Small valid JPEG
pub(crate) fn blank_jpeg() -> ImagePayload {
    let img = RgbImage::from_pixel(32, 24, Rgb([20, 20, 20]));
    let mut out = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut out, 90)
        .encode(img.as_raw(), 32, 24, image::ColorType::Rgb8.into())
        .unwrap();
    ImagePayload::jpeg(out)
}

/// Frame source with a switchable feed
pub(crate) struct StubFrames {
    pub attached: Mutex<bool>,
}

#[async_trait]
impl FrameSource for StubFrames {
    async fn capture(&self, _camera: &Camera) -> Result<ImagePayload> {
        if *self.attached.lock().unwrap() {
            Ok(blank_jpeg())
        } else {
            Err(Error::CaptureUnavailable("no live feed".to_string()))
        }
    }
}

/// Analysis returning a configurable reply, optionally held until released
pub(crate) struct ScriptedAnalysis {
    pub reply: Mutex<Result<serde_json::Value>>,
    /// When set, each call waits for one permit
    pub hold: Option<Arc<Semaphore>>,
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl ScriptedAnalysis {
    pub fn set_reply(&self, reply: Result<serde_json::Value>) {
        *self.reply.lock().unwrap() = reply;
    }
}

#[async_trait]
impl AnalysisCapability for ScriptedAnalysis {
    async fn analyze(&self, _request: AnalysisRequest) -> Result<AiReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(hold) = &self.hold {
            hold.acquire().await.unwrap().forget();
        }

        let reply = match &*self.reply.lock().unwrap() {
            Ok(value) => Ok(AiReply::Structured(value.clone())),
            Err(e) => Err(Error::AnalysisTransport(e.to_string())),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

/// Session answering every prompt with a fixed report
pub(crate) struct RecordingSession {
    pub reply: String,
    pub prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ConversationSession for RecordingSession {
    async fn send(&self, message: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(message.to_string());
        Ok(self.reply.clone())
    }
}

pub(crate) fn person_reply() -> serde_json::Value {
    json!({
        "assessment": "One person at the door",
        "action": "Observe",
        "objects": [{"name": "person", "confidence": 0.9, "box": [0.1, 0.1, 0.6, 0.4]}]
    })
}

pub(crate) fn empty_reply() -> serde_json::Value {
    json!({"assessment": "All clear", "action": "None", "objects": []})
}

pub(crate) fn local(id: &str) -> CameraSeed {
    CameraSeed::new(
        id,
        &format!("{} location", id),
        CameraSource::Local {
            device: "/dev/video0".to_string(),
        },
    )
}

pub(crate) fn stream(id: &str, location: &str) -> CameraSeed {
    CameraSeed::new(
        id,
        location,
        CameraSource::Stream {
            stream_ref: format!("rtsp://{}.local/live", id.to_lowercase()),
        },
    )
}

pub(crate) fn offline(id: &str) -> CameraSeed {
    CameraSeed::new(id, &format!("{} location", id), CameraSource::Offline)
}

pub(crate) struct Harness {
    pub station: Arc<Station>,
    pub frames: Arc<StubFrames>,
    pub analysis: Arc<ScriptedAnalysis>,
    pub session: Arc<RecordingSession>,
}

pub(crate) struct HarnessOptions {
    pub reply: serde_json::Value,
    pub hold: Option<Arc<Semaphore>>,
    pub coordinates: Option<Coordinates>,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            reply: person_reply(),
            hold: None,
            coordinates: None,
        }
    }
}

pub(crate) fn harness(seeds: Vec<CameraSeed>) -> Harness {
    harness_with(seeds, HarnessOptions::default())
}

pub(crate) fn harness_with(seeds: Vec<CameraSeed>, options: HarnessOptions) -> Harness {
    let gate = Arc::new(ScanGate::new());
    let registry = Arc::new(CameraRegistry::new(seeds, gate.clone()).unwrap());
    let frames = Arc::new(StubFrames {
        attached: Mutex::new(true),
    });
    let analysis = Arc::new(ScriptedAnalysis {
        reply: Mutex::new(Ok(options.reply)),
        hold: options.hold,
        calls: AtomicUsize::new(0),
        in_flight: AtomicUsize::new(0),
        max_in_flight: AtomicUsize::new(0),
    });
    let session = Arc::new(RecordingSession {
        reply: "Light traffic, nothing unusual.".to_string(),
        prompts: Mutex::new(Vec::new()),
    });

    let station = Arc::new(Station::new(StationParts {
        registry,
        gate,
        dispatcher: AnalysisDispatcher::new(frames.clone(), analysis.clone(), session.clone()),
        events: EventLogService::default(),
        toggles: ToggleStore::in_memory(Toggles::default()),
        geolocation: Arc::new(ConfiguredGeolocation::new(options.coordinates)),
        hub: Arc::new(RealtimeHub::default()),
    }));

    Harness {
        station,
        frames,
        analysis,
        session,
    }
}
