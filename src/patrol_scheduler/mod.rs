//! PatrolScheduler - Timer-Driven Camera Cycling
//!
//! ## Responsibilities
//!
//! - Arm/disarm the patrol loop (idempotent)
//! - Each cycle: advance to the next eligible camera, let the capture
//!   surface settle, then scan it
//! - Persist the patrol toggle and announce status changes
//!
//! ## Design
//!
//! - Armed iff a loop task handle is held; disarming aborts the loop
//!   synchronously.
//! - The loop task owns an `Arc` of the scheduler, so dropping other handles
//!   leaves it running. Only `disarm` stops it.
//! - The first cycle runs immediately on arming, then every interval.
//! - Each scan runs in its own task so disarming never cancels a scan that
//!   is already underway. The scan waits for the gate, so a manual scan in
//!   flight delays it rather than racing it.

use crate::error::Result;
use crate::event_log_service::Event;
use crate::realtime_hub::{HubMessage, LogLevel, PatrolStatusMessage};
use crate::station::Station;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Patrol timing
#[derive(Debug, Clone, Copy)]
pub struct PatrolConfig {
    /// Time between cycles
    pub interval: Duration,
    /// Pause between switching camera and scanning
    pub settle_delay: Duration,
}

impl Default for PatrolConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            settle_delay: Duration::from_millis(1500),
        }
    }
}

/// Patrol status snapshot
#[derive(Debug, Clone, Serialize)]
pub struct PatrolStatus {
    pub armed: bool,
    pub interval_sec: u64,
    pub settle_ms: u64,
    /// Cursor into the eligible camera list
    pub index: usize,
}

struct PatrolState {
    index: usize,
    handle: Option<JoinHandle<()>>,
}

/// PatrolScheduler instance
pub struct PatrolScheduler {
    station: Arc<Station>,
    config: PatrolConfig,
    state: Mutex<PatrolState>,
}

impl PatrolScheduler {
    /// Create new scheduler (idle)
    pub fn new(station: Arc<Station>, config: PatrolConfig) -> Self {
        Self {
            station,
            config,
            state: Mutex::new(PatrolState {
                index: 0,
                handle: None,
            }),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PatrolState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_armed(&self) -> bool {
        self.lock_state().handle.is_some()
    }

    pub fn status(&self) -> PatrolStatus {
        let state = self.lock_state();
        PatrolStatus {
            armed: state.handle.is_some(),
            interval_sec: self.config.interval.as_secs(),
            settle_ms: self.config.settle_delay.as_millis() as u64,
            index: state.index,
        }
    }

    /// Start the loop; returns false if it was already armed
    ///
    /// The loop keeps the scheduler alive until [`disarm`](Self::disarm).
    pub fn arm(self: &Arc<Self>) -> bool {
        let mut state = self.lock_state();
        if state.handle.is_some() {
            tracing::debug!("Patrol already armed");
            return false;
        }

        let this = Arc::clone(self);
        let period = self.config.interval;
        state.handle = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // First tick completes immediately
                ticker.tick().await;
                this.run_cycle().await;
            }
        }));

        tracing::info!(
            interval_sec = self.config.interval.as_secs(),
            "Patrol armed"
        );
        true
    }

    /// Stop the loop; returns false if it was not armed
    pub fn disarm(&self) -> bool {
        let handle = self.lock_state().handle.take();
        match handle {
            Some(handle) => {
                handle.abort();
                tracing::info!("Patrol disarmed");
                true
            }
            None => false,
        }
    }

    /// Arm or disarm, persist the toggle and notify subscribers
    pub async fn set_enabled(self: &Arc<Self>, enabled: bool) -> Result<PatrolStatus> {
        let changed = if enabled { self.arm() } else { self.disarm() };
        self.station.persist_patrol(enabled).await?;

        let status = self.status();
        if changed {
            let hub = self.station.hub();
            hub.log(
                LogLevel::Info,
                if enabled {
                    format!("Patrol armed, every {}s", status.interval_sec)
                } else {
                    "Patrol disarmed".to_string()
                },
            )
            .await;
            hub.broadcast(HubMessage::PatrolStatus(PatrolStatusMessage {
                armed: status.armed,
                interval_sec: status.interval_sec,
            }))
            .await;
        }
        Ok(status)
    }

    /// One patrol cycle: switch camera, settle, scan
    pub async fn run_cycle(&self) -> Option<Event> {
        let eligible = self.station.registry().list_scannable().await;
        if eligible.is_empty() {
            tracing::debug!("Patrol cycle skipped, no eligible cameras");
            self.station
                .hub()
                .log(LogLevel::Info, "Patrol cycle skipped: no eligible cameras")
                .await;
            return None;
        }

        let camera = {
            let mut state = self.lock_state();
            state.index = (state.index + 1) % eligible.len();
            eligible[state.index].clone()
        };

        if let Err(e) = self.station.set_active(&camera.id).await {
            self.station.hub().log(LogLevel::Warn, e.to_string()).await;
            return None;
        }
        self.station
            .hub()
            .log(
                LogLevel::Info,
                format!("Patrol: {} ({})", camera.id, camera.location),
            )
            .await;

        tokio::time::sleep(self.config.settle_delay).await;

        let station = Arc::clone(&self.station);
        let scan = tokio::spawn(async move { station.scan_when_idle().await });
        match scan.await {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = %e, "Patrol scan task failed");
                None
            }
        }
    }
}
