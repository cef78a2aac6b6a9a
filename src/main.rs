//! Patrol Station - Multi-Camera Monitoring Engine
//!
//! Main entry point for the patrol station server.

use patrol_station::{
    ai_client::{GeminiClient, GeminiConfig},
    analysis_dispatcher::{prompts, AnalysisDispatcher},
    camera_registry::{default_seeds, CameraRegistry, CameraSeed},
    event_log_service::EventLogService,
    geolocation::ConfiguredGeolocation,
    patrol_scheduler::PatrolScheduler,
    realtime_hub::{LogLevel, RealtimeHub},
    scan_gate::ScanGate,
    snapshot_service::FfmpegFrameSource,
    state::{AppConfig, AppState},
    station::{Station, StationParts},
    toggle_store::ToggleStore,
    web_api,
};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Camera slots from the seed file, or the built-in defaults
async fn load_camera_seeds(path: Option<&Path>) -> anyhow::Result<Vec<CameraSeed>> {
    let Some(path) = path else {
        return Ok(default_seeds());
    };

    let data = tokio::fs::read_to_string(path).await?;
    let seeds: Vec<CameraSeed> = serde_json::from_str(&data)?;
    tracing::info!(
        path = %path.display(),
        cameras = seeds.len(),
        "Camera seeds loaded"
    );
    Ok(seeds)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "patrol_station=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Patrol Station v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        ai_base_url = %config.ai_base_url,
        ai_model = %config.ai_model,
        patrol_interval_sec = config.patrol_interval_sec,
        patrol_settle_ms = config.patrol_settle_ms,
        "Configuration loaded"
    );
    if config.ai_api_key.is_empty() {
        tracing::warn!("AI_API_KEY is not set, analysis requests will be rejected upstream");
    }

    // Cameras & gate
    let gate = Arc::new(ScanGate::new());
    let seeds = load_camera_seeds(config.cameras_path.as_deref()).await?;
    let registry = Arc::new(CameraRegistry::new(seeds, gate.clone())?);

    // External capabilities
    let gemini = Arc::new(GeminiClient::new(GeminiConfig {
        base_url: config.ai_base_url.clone(),
        api_key: config.ai_api_key.clone(),
        model: config.ai_model.clone(),
        timeout: config.ai_timeout(),
        session_exchanges: config.ai_session_exchanges,
    })?);
    let session = Arc::new(gemini.start_session(prompts::SESSION_INSTRUCTION));
    let frames = Arc::new(FfmpegFrameSource::new(config.ffmpeg_capture_timeout_sec));
    let dispatcher = AnalysisDispatcher::new(frames, gemini, session);

    // Persisted toggles
    let toggles = ToggleStore::load(&config.toggles_path).await?;
    let patrol_enabled = toggles.get().await.patrol_enabled;

    let hub = Arc::new(RealtimeHub::new(config.activity_log_capacity));
    let station = Arc::new(Station::new(StationParts {
        registry,
        gate,
        dispatcher,
        events: EventLogService::new(config.event_log_capacity),
        toggles,
        geolocation: Arc::new(ConfiguredGeolocation::new(config.station_position)),
        hub: hub.clone(),
    }));
    station.spawn_controls_relay();

    let patrol = Arc::new(PatrolScheduler::new(station.clone(), config.patrol()));
    if patrol_enabled {
        patrol.arm();
        tracing::info!("Patrol armed from persisted toggle");
    }

    hub.log(LogLevel::Info, "Station online").await;

    let state = AppState::new(config, station, patrol);

    let app = web_api::create_router(state.clone())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
