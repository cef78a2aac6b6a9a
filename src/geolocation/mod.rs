//! Geolocation - Station Position Capability

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// WGS84 position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// `"51.50740, -0.12780"`
    pub fn label(&self) -> String {
        format!("{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// Single-shot position lookup
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn locate(&self) -> Result<Coordinates>;
}

/// Position from configuration; absent means permission denied
pub struct ConfiguredGeolocation {
    coordinates: Option<Coordinates>,
}

impl ConfiguredGeolocation {
    pub fn new(coordinates: Option<Coordinates>) -> Self {
        Self { coordinates }
    }
}

#[async_trait]
impl GeolocationProvider for ConfiguredGeolocation {
    async fn locate(&self) -> Result<Coordinates> {
        self.coordinates.ok_or_else(|| {
            Error::GeolocationDenied("station position not configured".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_configured_position() {
        let geo = ConfiguredGeolocation::new(Some(Coordinates {
            latitude: 51.5074,
            longitude: -0.1278,
        }));
        let pos = geo.locate().await.unwrap();
        assert_eq!(pos.label(), "51.50740, -0.12780");
    }

    #[tokio::test]
    async fn test_missing_position_denied() {
        let err = ConfiguredGeolocation::new(None).locate().await.unwrap_err();
        assert!(matches!(err, Error::GeolocationDenied(_)));
    }
}
