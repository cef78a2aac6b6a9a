//! CameraRegistry - Camera Slots and Active Selection
//!
//! ## Responsibilities
//!
//! - Hold identity, location, source and connectivity of every camera slot
//! - Track the single active camera
//! - Retarget a slot (add-camera flow) atomically
//!
//! Slots are created once from static configuration and never removed.
//! Every change to the active camera is pushed to the [`ScanGate`] so scan
//! enablement always reflects the camera that is actually selected.

mod types;

pub use types::*;

use crate::error::{Error, Result};
use crate::scan_gate::ScanGate;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Stream reference schemes accepted by the add-camera flow
const STREAM_SCHEMES: [&str; 4] = ["http", "https", "rtsp", "rtsps"];

struct RegistryInner {
    cameras: Vec<Camera>,
    active_id: String,
}

impl RegistryInner {
    fn find(&self, id: &str) -> Option<&Camera> {
        self.cameras.iter().find(|c| c.id == id)
    }

    fn active(&self) -> Option<&Camera> {
        self.find(&self.active_id)
    }
}

/// CameraRegistry instance
pub struct CameraRegistry {
    inner: RwLock<RegistryInner>,
    gate: Arc<ScanGate>,
}

impl CameraRegistry {
    /// Create registry from seeds; the first seed becomes active
    pub fn new(seeds: Vec<CameraSeed>, gate: Arc<ScanGate>) -> Result<Self> {
        let first = seeds
            .first()
            .map(|s| s.id.clone())
            .ok_or_else(|| Error::Config("at least one camera slot is required".to_string()))?;

        let mut cameras: Vec<Camera> = Vec::with_capacity(seeds.len());
        for seed in seeds {
            if cameras.iter().any(|c| c.id == seed.id) {
                return Err(Error::Config(format!("duplicate camera id {}", seed.id)));
            }
            let connectivity = initial_connectivity(&seed.source);
            cameras.push(Camera {
                id: seed.id,
                location: seed.location,
                source: seed.source,
                connectivity,
            });
        }

        let inner = RegistryInner {
            cameras,
            active_id: first,
        };
        gate.refresh_eligibility(inner.active());

        Ok(Self {
            inner: RwLock::new(inner),
            gate,
        })
    }

    /// Get camera by ID
    pub async fn get(&self, id: &str) -> Option<Camera> {
        self.inner.read().await.find(id).cloned()
    }

    /// All slots in configuration order
    pub async fn list(&self) -> Vec<Camera> {
        self.inner.read().await.cameras.clone()
    }

    /// Cameras eligible for scanning (excludes Offline), configuration order
    pub async fn list_scannable(&self) -> Vec<Camera> {
        self.inner
            .read()
            .await
            .cameras
            .iter()
            .filter(|c| c.is_scannable())
            .cloned()
            .collect()
    }

    /// Currently active camera
    pub async fn active(&self) -> Option<Camera> {
        self.inner.read().await.active().cloned()
    }

    pub async fn active_id(&self) -> String {
        self.inner.read().await.active_id.clone()
    }

    /// Select the active camera
    ///
    /// Unknown IDs are ignored and return `None`.
    pub async fn set_active(&self, id: &str) -> Option<Camera> {
        let mut inner = self.inner.write().await;
        let camera = inner.find(id).cloned()?;
        inner.active_id = camera.id.clone();
        self.gate.refresh_eligibility(Some(&camera));

        tracing::debug!(
            camera_id = %camera.id,
            kind = camera.kind().as_str(),
            "Active camera switched"
        );
        Some(camera)
    }

    /// Retarget a slot to a new location and source
    ///
    /// Validation happens before any mutation, so a failed request leaves the
    /// slot untouched.
    pub async fn reconfigure(&self, id: &str, req: ReconfigureRequest) -> Result<Camera> {
        let location = req.location.trim();
        if location.is_empty() {
            return Err(Error::CameraReconfiguration(
                "location must not be empty".to_string(),
            ));
        }
        let source = build_source(req.kind, req.stream_ref.as_deref())?;

        let mut inner = self.inner.write().await;
        let is_active = inner.active_id == id;
        let camera = inner
            .cameras
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| Error::CameraReconfiguration(format!("no camera slot {}", id)))?;

        camera.location = location.to_string();
        camera.connectivity = initial_connectivity(&source);
        camera.source = source;
        let updated = camera.clone();

        if is_active {
            self.gate.refresh_eligibility(Some(&updated));
        }

        tracing::info!(
            camera_id = %updated.id,
            location = %updated.location,
            kind = updated.kind().as_str(),
            "Camera slot reconfigured"
        );
        Ok(updated)
    }

    /// Record a connectivity observation, returning the transition if any
    pub async fn update_connectivity(
        &self,
        id: &str,
        online: bool,
    ) -> Option<ConnectivityTransition> {
        let mut inner = self.inner.write().await;
        let camera = inner.cameras.iter_mut().find(|c| c.id == id)?;
        if camera.kind() == CameraKind::Offline {
            return None;
        }

        let prev = camera.connectivity;
        camera.connectivity = if online {
            Connectivity::Online
        } else {
            Connectivity::Offline
        };

        match (prev, camera.connectivity) {
            (Connectivity::Online, Connectivity::Offline)
            | (Connectivity::Unknown, Connectivity::Offline) => {
                tracing::warn!(camera_id = %id, "Camera connection lost");
                Some(ConnectivityTransition::Lost)
            }
            (Connectivity::Offline, Connectivity::Online) => {
                tracing::info!(camera_id = %id, "Camera connection recovered");
                Some(ConnectivityTransition::Recovered)
            }
            _ => None,
        }
    }
}

fn initial_connectivity(source: &CameraSource) -> Connectivity {
    match source {
        CameraSource::Offline => Connectivity::Offline,
        _ => Connectivity::Unknown,
    }
}

fn build_source(kind: CameraKind, stream_ref: Option<&str>) -> Result<CameraSource> {
    let reference = stream_ref.map(str::trim).filter(|s| !s.is_empty());

    match kind {
        CameraKind::Offline => Ok(CameraSource::Offline),
        CameraKind::Local => {
            let device = reference.ok_or_else(|| {
                Error::CameraReconfiguration("local camera requires a device path".to_string())
            })?;
            Ok(CameraSource::Local {
                device: device.to_string(),
            })
        }
        CameraKind::Stream => {
            let raw = reference.ok_or_else(|| {
                Error::CameraReconfiguration(
                    "stream camera requires a stream reference".to_string(),
                )
            })?;
            let parsed = url::Url::parse(raw).map_err(|e| {
                Error::CameraReconfiguration(format!("invalid stream reference {}: {}", raw, e))
            })?;
            if !STREAM_SCHEMES.contains(&parsed.scheme()) || parsed.host_str().is_none() {
                return Err(Error::CameraReconfiguration(format!(
                    "unsupported stream reference {}",
                    raw
                )));
            }
            Ok(CameraSource::Stream {
                stream_ref: parsed.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (CameraRegistry, Arc<ScanGate>) {
        let gate = Arc::new(ScanGate::new());
        let registry = CameraRegistry::new(default_seeds(), gate.clone()).unwrap();
        (registry, gate)
    }

    #[tokio::test]
    async fn test_first_seed_is_active() {
        let (registry, gate) = registry();
        assert_eq!(registry.active_id().await, "CAM-01");
        assert!(gate.controls().scan_enabled);
    }

    #[tokio::test]
    async fn test_set_active_unknown_is_noop() {
        let (registry, _) = registry();
        assert!(registry.set_active("CAM-99").await.is_none());
        assert_eq!(registry.active_id().await, "CAM-01");
    }

    #[tokio::test]
    async fn test_set_active_offline_disables_scan() {
        let (registry, gate) = registry();
        registry.set_active("CAM-02").await.unwrap();
        let controls = gate.controls();
        assert_eq!(controls.active_camera_id.as_deref(), Some("CAM-02"));
        assert!(!controls.scan_enabled);
    }

    #[tokio::test]
    async fn test_list_scannable_excludes_offline() {
        let (registry, _) = registry();
        let ids: Vec<_> = registry
            .list_scannable()
            .await
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec!["CAM-01"]);
    }

    #[tokio::test]
    async fn test_reconfigure_to_stream() {
        let (registry, _) = registry();
        let camera = registry
            .reconfigure(
                "CAM-03",
                ReconfigureRequest {
                    location: " 5th & Main ".to_string(),
                    kind: CameraKind::Stream,
                    stream_ref: Some("rtsp://10.0.0.8/live".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(camera.location, "5th & Main");
        assert_eq!(camera.kind(), CameraKind::Stream);
        assert_eq!(camera.connectivity, Connectivity::Unknown);
        assert_eq!(registry.list_scannable().await.len(), 2);
    }

    #[tokio::test]
    async fn test_reconfigure_active_refreshes_gate() {
        let (registry, gate) = registry();
        registry.set_active("CAM-02").await;
        assert!(!gate.controls().scan_enabled);

        registry
            .reconfigure(
                "CAM-02",
                ReconfigureRequest {
                    location: "Parking Lot".to_string(),
                    kind: CameraKind::Stream,
                    stream_ref: Some("https://cams.example.net/lot".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(gate.controls().scan_enabled);
    }

    #[tokio::test]
    async fn test_reconfigure_missing_slot() {
        let (registry, _) = registry();
        let err = registry
            .reconfigure(
                "CAM-09",
                ReconfigureRequest {
                    location: "Roof".to_string(),
                    kind: CameraKind::Offline,
                    stream_ref: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CameraReconfiguration(_)));
    }

    #[tokio::test]
    async fn test_reconfigure_invalid_stream_leaves_slot_untouched() {
        let (registry, _) = registry();
        let before = registry.get("CAM-04").await.unwrap();

        for bad in [None, Some("not a url"), Some("ftp://host/feed")] {
            let err = registry
                .reconfigure(
                    "CAM-04",
                    ReconfigureRequest {
                        location: "Gate".to_string(),
                        kind: CameraKind::Stream,
                        stream_ref: bad.map(str::to_string),
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, Error::CameraReconfiguration(_)));
        }

        assert_eq!(registry.get("CAM-04").await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_connectivity_transitions() {
        let (registry, _) = registry();
        assert_eq!(
            registry.update_connectivity("CAM-01", false).await,
            Some(ConnectivityTransition::Lost)
        );
        assert_eq!(registry.update_connectivity("CAM-01", false).await, None);
        assert_eq!(
            registry.update_connectivity("CAM-01", true).await,
            Some(ConnectivityTransition::Recovered)
        );
        // offline slots are not tracked
        assert_eq!(registry.update_connectivity("CAM-02", true).await, None);
    }

    #[test]
    fn test_duplicate_seed_rejected() {
        let gate = Arc::new(ScanGate::new());
        let seeds = vec![
            CameraSeed::new("A", "x", CameraSource::Offline),
            CameraSeed::new("A", "y", CameraSource::Offline),
        ];
        assert!(matches!(
            CameraRegistry::new(seeds, gate),
            Err(Error::Config(_))
        ));
    }
}
