//! Application state
//!
//! Holds all shared components and state

use crate::geolocation::Coordinates;
use crate::patrol_scheduler::{PatrolConfig, PatrolScheduler};
use crate::station::Station;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Analysis service base URL
    pub ai_base_url: String,
    pub ai_api_key: String,
    pub ai_model: String,
    /// 0 = no client timeout
    pub ai_timeout_sec: u64,
    /// Chat/situational exchanges the conversation session retains
    pub ai_session_exchanges: usize,
    pub patrol_interval_sec: u64,
    pub patrol_settle_ms: u64,
    pub event_log_capacity: usize,
    pub activity_log_capacity: usize,
    /// Persisted toggles file
    pub toggles_path: PathBuf,
    /// Optional JSON camera seed list
    pub cameras_path: Option<PathBuf>,
    /// Station position; `None` means geolocation is denied
    pub station_position: Option<Coordinates>,
    pub ffmpeg_capture_timeout_sec: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        let latitude = std::env::var("STATION_LATITUDE").ok().and_then(|v| v.parse().ok());
        let longitude = std::env::var("STATION_LONGITUDE").ok().and_then(|v| v.parse().ok());

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", 8080),
            ai_base_url: std::env::var("AI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
            ai_api_key: std::env::var("AI_API_KEY").unwrap_or_default(),
            ai_model: std::env::var("AI_MODEL").unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            ai_timeout_sec: env_or("AI_TIMEOUT_SEC", 0),
            ai_session_exchanges: env_or("AI_SESSION_EXCHANGES", 20),
            patrol_interval_sec: env_or("PATROL_INTERVAL_SEC", 30),
            patrol_settle_ms: env_or("PATROL_SETTLE_MS", 1500),
            event_log_capacity: env_or("EVENT_LOG_CAPACITY", 50),
            activity_log_capacity: env_or("ACTIVITY_LOG_CAPACITY", 200),
            toggles_path: std::env::var("TOGGLES_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/toggles.json")),
            cameras_path: std::env::var("CAMERAS_PATH").ok().map(PathBuf::from),
            station_position: match (latitude, longitude) {
                (Some(latitude), Some(longitude)) => Some(Coordinates {
                    latitude,
                    longitude,
                }),
                _ => None,
            },
            ffmpeg_capture_timeout_sec: env_or("FFMPEG_CAPTURE_TIMEOUT_SEC", 10),
        }
    }
}

impl AppConfig {
    pub fn ai_timeout(&self) -> Option<Duration> {
        (self.ai_timeout_sec > 0).then(|| Duration::from_secs(self.ai_timeout_sec))
    }

    pub fn patrol(&self) -> PatrolConfig {
        PatrolConfig {
            interval: Duration::from_secs(self.patrol_interval_sec.max(1)),
            settle_delay: Duration::from_millis(self.patrol_settle_ms),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Scan orchestration context
    pub station: Arc<Station>,
    /// Patrol loop
    pub patrol: Arc<PatrolScheduler>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, station: Arc<Station>, patrol: Arc<PatrolScheduler>) -> Self {
        Self {
            config,
            station,
            patrol,
            started_at: Instant::now(),
        }
    }
}
