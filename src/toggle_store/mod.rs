//! ToggleStore - Persisted Operator Toggles
//!
//! ## Responsibilities
//!
//! - Hold the elevated-lookout and patrol-enabled flags
//! - Read them once at startup, write the file on every change
//!
//! A missing file means defaults (both off). A corrupt file is logged and
//! replaced with defaults on the next write.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Persisted flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toggles {
    #[serde(default)]
    pub elevated_lookout: bool,
    #[serde(default)]
    pub patrol_enabled: bool,
}

/// ToggleStore instance
pub struct ToggleStore {
    path: Option<PathBuf>,
    toggles: RwLock<Toggles>,
}

impl ToggleStore {
    /// Load from file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let toggles = match tokio::fs::read_to_string(&path).await {
            Ok(data) => match serde_json::from_str::<Toggles>(&data) {
                Ok(toggles) => toggles,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Toggle file unreadable, using defaults"
                    );
                    Toggles::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Toggles::default(),
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            path = %path.display(),
            elevated_lookout = toggles.elevated_lookout,
            patrol_enabled = toggles.patrol_enabled,
            "Toggles loaded"
        );

        Ok(Self {
            path: Some(path),
            toggles: RwLock::new(toggles),
        })
    }

    /// Store that never touches disk
    pub fn in_memory(toggles: Toggles) -> Self {
        Self {
            path: None,
            toggles: RwLock::new(toggles),
        }
    }

    pub async fn get(&self) -> Toggles {
        *self.toggles.read().await
    }

    pub async fn elevated_lookout(&self) -> bool {
        self.toggles.read().await.elevated_lookout
    }

    pub async fn set_lookout(&self, enabled: bool) -> Result<Toggles> {
        self.update(|t| t.elevated_lookout = enabled).await
    }

    pub async fn set_patrol(&self, enabled: bool) -> Result<Toggles> {
        self.update(|t| t.patrol_enabled = enabled).await
    }

    async fn update(&self, apply: impl FnOnce(&mut Toggles)) -> Result<Toggles> {
        let mut toggles = self.toggles.write().await;
        let mut next = *toggles;
        apply(&mut next);

        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            let data = serde_json::to_string_pretty(&next)?;
            tokio::fs::write(path, data).await?;
        }

        *toggles = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ToggleStore::load(dir.path().join("toggles.json")).await.unwrap();
        assert_eq!(store.get().await, Toggles::default());
    }

    #[tokio::test]
    async fn test_toggles_persist_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("toggles.json");

        let store = ToggleStore::load(&path).await.unwrap();
        store.set_lookout(true).await.unwrap();
        store.set_patrol(true).await.unwrap();

        let reloaded = ToggleStore::load(&path).await.unwrap();
        assert_eq!(
            reloaded.get().await,
            Toggles {
                elevated_lookout: true,
                patrol_enabled: true
            }
        );
    }

    #[tokio::test]
    async fn test_corrupt_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toggles.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let store = ToggleStore::load(&path).await.unwrap();
        assert!(!store.elevated_lookout().await);
    }

    #[tokio::test]
    async fn test_in_memory_store() {
        let store = ToggleStore::in_memory(Toggles::default());
        let toggles = store.set_patrol(true).await.unwrap();
        assert!(toggles.patrol_enabled);
        assert!(!toggles.elevated_lookout);
    }
}
