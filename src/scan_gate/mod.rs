//! ScanGate - Single-Flight Scan Admission
//!
//! ## Responsibilities
//!
//! - Admit at most one analysis at a time, whatever triggered it
//! - Derive scan enablement for the active camera
//! - Publish enablement changes to watchers
//!
//! ## Design
//!
//! - `begin_scan` hands out a [`ScanPermit`]; dropping the permit is the
//!   only way to end a scan, so the flag is cleared on every exit path
//!   (success, failure, early return, panic or task cancellation).
//! - Enablement is recomputed on every begin/end and on every active camera
//!   change, and published through a `watch` channel.

mod types;

pub use types::*;

use crate::camera_registry::{Camera, CameraKind};
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

#[derive(Debug, Clone, Default)]
struct ActiveSlot {
    id: Option<String>,
    kind: Option<CameraKind>,
}

/// ScanGate instance
pub struct ScanGate {
    scanning: AtomicBool,
    active: Mutex<ActiveSlot>,
    controls_tx: watch::Sender<ScanControls>,
}

impl ScanGate {
    /// Create new gate (idle, no active camera)
    pub fn new() -> Self {
        let (controls_tx, _) = watch::channel(ScanControls::default());
        Self {
            scanning: AtomicBool::new(false),
            active: Mutex::new(ActiveSlot::default()),
            controls_tx,
        }
    }

    /// Whether an analysis is in flight
    pub fn is_scanning(&self) -> bool {
        self.scanning.load(Ordering::SeqCst)
    }

    /// `camera exists ∧ camera is not Offline ∧ no scan in flight`
    pub fn can_scan(&self, camera: Option<&Camera>) -> bool {
        camera.map(Camera::is_scannable).unwrap_or(false) && !self.is_scanning()
    }

    /// Begin a scan on a camera
    ///
    /// Rejects unknown or offline cameras with `ScanIneligible` and
    /// re-entrant triggers with `AlreadyScanning`.
    pub fn begin_scan(self: &Arc<Self>, camera: Option<&Camera>) -> Result<ScanPermit> {
        match camera {
            None => Err(Error::ScanIneligible("no active camera".to_string())),
            Some(c) if !c.is_scannable() => Err(Error::ScanIneligible(format!(
                "camera {} is offline",
                c.id
            ))),
            Some(_) => self.try_begin(),
        }
    }

    /// Begin a scan that is not tied to a camera slot
    pub fn try_begin(self: &Arc<Self>) -> Result<ScanPermit> {
        if self
            .scanning
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Scan rejected: already scanning");
            return Err(Error::AlreadyScanning);
        }

        self.publish();
        tracing::debug!("Scan gate acquired");
        Ok(ScanPermit {
            gate: Arc::clone(self),
        })
    }

    /// Wait until the gate is idle, then acquire it
    ///
    /// Used by the patrol so that a manual scan delays the next patrol scan
    /// instead of racing it.
    pub async fn acquire_when_idle(self: &Arc<Self>) -> ScanPermit {
        let mut rx = self.controls_tx.subscribe();
        loop {
            if let Ok(permit) = self.try_begin() {
                return permit;
            }
            // Sender lives as long as self, so this only errors if the gate is gone
            if rx.wait_for(|c| !c.scanning).await.is_err() {
                tokio::task::yield_now().await;
            }
        }
    }

    /// Clear the scanning flag and recompute enablement
    fn end_scan(&self) {
        self.scanning.store(false, Ordering::SeqCst);
        self.publish();
        tracing::debug!("Scan gate released");
    }

    /// Recompute enablement for a (new) active camera
    pub fn refresh_eligibility(&self, camera: Option<&Camera>) {
        {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            *active = ActiveSlot {
                id: camera.map(|c| c.id.clone()),
                kind: camera.map(Camera::kind),
            };
        }
        self.publish();
    }

    /// Current enablement snapshot
    pub fn controls(&self) -> ScanControls {
        self.controls_tx.borrow().clone()
    }

    /// Watch enablement changes
    pub fn subscribe(&self) -> watch::Receiver<ScanControls> {
        self.controls_tx.subscribe()
    }

    fn publish(&self) {
        let active = self
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        self.controls_tx.send_modify(|controls| {
            let scanning = self.scanning.load(Ordering::SeqCst);
            let eligible = matches!(active.kind, Some(k) if k != CameraKind::Offline);
            *controls = ScanControls {
                scanning,
                scan_enabled: eligible && !scanning,
                active_camera_id: active.id.clone(),
                active_kind: active.kind,
            };
        });
    }
}

impl Default for ScanGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Proof of an admitted scan; releases the gate when dropped
#[must_use = "dropping the permit immediately ends the scan"]
pub struct ScanPermit {
    gate: Arc<ScanGate>,
}

impl Drop for ScanPermit {
    fn drop(&mut self) {
        self.gate.end_scan();
    }
}
