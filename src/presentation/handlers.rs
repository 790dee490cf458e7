// HTTP request handlers
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::scheduler::MonitoredLine;
use crate::domain::oee::HealthBand;
use crate::domain::takt::ProductionPlan;
use crate::domain::update::StreamMessage;
use crate::infrastructure::ndjson_stream::stream_from_group;
use crate::presentation::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct LineBody {
    pub line_id: i64,
    #[serde(default)]
    pub post_ids: Vec<i64>,
}

#[derive(Debug, Deserialize)]
pub struct IntervalBody {
    pub interval_ms: u64,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Scheduler diagnostics: running flag, interval, monitored lines, cache size
pub async fn scheduler_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.scheduler.status().await)
}

/// Subscribe to a line's update stream. The response opens with a fresh
/// full snapshot, then carries every broadcast message for the line.
pub async fn stream_line(
    Path(line_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let post_ids = state
        .scheduler
        .post_ids_for(line_id)
        .await
        .unwrap_or_default();

    // Join the group before capturing the snapshot so no update published
    // in between is lost.
    let rx = state.broadcaster.subscribe(line_id);
    tracing::info!(
        "Subscriber joined line {} ({} subscribers)",
        line_id,
        state.broadcaster.subscriber_count(line_id)
    );
    let snapshot = state
        .snapshot_service
        .generate_line_snapshot(line_id, &post_ids)
        .await;

    stream_from_group(StreamMessage::InitialSnapshot(snapshot), rx).into_response()
}

#[derive(Debug, Serialize)]
pub struct OeeBands {
    pub oee: HealthBand,
    pub availability: HealthBand,
    pub performance: HealthBand,
    pub quality: HealthBand,
}

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    #[serde(flatten)]
    pub snapshot: crate::domain::snapshot::LineSnapshot,
    pub oee_bands: OeeBands,
}

/// One-shot snapshot for ad-hoc queries, annotated with the OEE health bands
pub async fn line_snapshot(
    Path(line_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let post_ids = state
        .scheduler
        .post_ids_for(line_id)
        .await
        .unwrap_or_default();

    let snapshot = state
        .snapshot_service
        .generate_line_snapshot(line_id, &post_ids)
        .await;
    let oee_bands = OeeBands {
        oee: snapshot.oee.oee_band(),
        availability: snapshot.oee.availability_band(),
        performance: snapshot.oee.performance_band(),
        quality: snapshot.oee.quality_band(),
    };
    Json(SnapshotResponse {
        snapshot,
        oee_bands,
    })
}

#[derive(Debug, Deserialize)]
pub struct TaktRequest {
    pub quantity_to_produce: i64,
    #[serde(default)]
    pub quantity_produced: i64,
    pub available_hours: f64,
    pub target_deadline: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TaktResponse {
    #[serde(flatten)]
    pub plan: ProductionPlan,
    pub progress_percent: f64,
    pub deadline_exceeded: bool,
}

/// Compute takt time, required cadence and progress for a production order
pub async fn calculate_takt(Json(request): Json<TaktRequest>) -> impl IntoResponse {
    let mut plan = ProductionPlan::new(
        request.quantity_to_produce,
        request.available_hours,
        request.target_deadline,
    );
    plan.quantity_produced = request.quantity_produced;

    let progress_percent = plan.progress_percent();
    let deadline_exceeded = plan.is_deadline_exceeded(Utc::now());
    Json(TaktResponse {
        plan,
        progress_percent,
        deadline_exceeded,
    })
}

/// Replace the monitored-line set; every line re-sends a full snapshot on
/// the next cycle
pub async fn replace_lines(
    State(state): State<Arc<AppState>>,
    Json(lines): Json<Vec<LineBody>>,
) -> impl IntoResponse {
    let lines = lines
        .into_iter()
        .map(|body| MonitoredLine {
            line_id: body.line_id,
            post_ids: body.post_ids,
        })
        .collect();
    state.scheduler.replace_monitored_lines(lines).await;
    StatusCode::NO_CONTENT
}

pub async fn add_line(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LineBody>,
) -> impl IntoResponse {
    state.scheduler.add_line(body.line_id, body.post_ids).await;
    StatusCode::NO_CONTENT
}

pub async fn remove_line(
    Path(line_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    state.scheduler.remove_line(line_id).await;
    StatusCode::NO_CONTENT
}

pub async fn set_interval(
    State(state): State<Arc<AppState>>,
    Json(body): Json<IntervalBody>,
) -> impl IntoResponse {
    if body.interval_ms == 0 {
        return StatusCode::UNPROCESSABLE_ENTITY;
    }
    state.scheduler.set_interval(body.interval_ms).await;
    StatusCode::NO_CONTENT
}
