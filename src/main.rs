// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::{net::SocketAddr, sync::Arc};

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::scheduler::StreamingScheduler;
use crate::application::snapshot_service::SnapshotService;
use crate::infrastructure::broadcast::GroupBroadcaster;
use crate::infrastructure::config::load_monitor_config;
use crate::infrastructure::gateway_repository::GatewayRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    add_line, calculate_takt, health_check, line_snapshot, remove_line, replace_lines,
    scheduler_status, set_interval, stream_line,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration; bad or missing config falls back to defaults
    let config = load_monitor_config();

    // Create repository (infrastructure layer)
    let repository = Arc::new(GatewayRepository::new(&config.gateway));

    // Create services (application layer)
    let broadcaster = Arc::new(GroupBroadcaster::new());
    let snapshot_service = SnapshotService::new(repository, config.line_thresholds());
    let scheduler = Arc::new(StreamingScheduler::new(
        snapshot_service.clone(),
        broadcaster.clone(),
        config.scheduler_config(),
    ));

    // One background task owns the monitoring loop
    let loop_handle = tokio::spawn(scheduler.clone().run());

    // Create application state
    let state = Arc::new(AppState {
        scheduler: scheduler.clone(),
        broadcaster,
        snapshot_service,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/status", get(scheduler_status))
        .route("/lines/:id/stream", get(stream_line))
        .route("/lines/:id/snapshot", get(line_snapshot))
        .route("/monitor/lines", put(replace_lines).post(add_line))
        .route("/monitor/lines/:id", delete(remove_line))
        .route("/monitor/interval", put(set_interval))
        .route("/plans/takt", post(calculate_takt))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server with graceful shutdown tied to the scheduler's signal
    let addr: SocketAddr = "0.0.0.0:8080".parse()?;
    tracing::info!("Starting line-monitor service on {}", addr);

    let shutdown_scheduler = scheduler.clone();
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            shutdown_scheduler.shutdown();
        })
        .await?;

    loop_handle.await?;
    Ok(())
}
