// Snapshot generation - assembles the full observable state of one line
use std::sync::Arc;

use chrono::Utc;

use crate::application::alert_evaluator::evaluate_alerts;
use crate::application::change_detector::diff_snapshots;
use crate::application::line_data_repository::{LineDataRepository, PostStateRecord};
use crate::domain::alert::LineThresholds;
use crate::domain::oee::{OeeInput, OeeMetrics};
use crate::domain::snapshot::{LineSnapshot, PostSnapshot, SensorSnapshot};
use crate::domain::update::DashboardUpdate;

#[derive(Clone)]
pub struct SnapshotService {
    repository: Arc<dyn LineDataRepository>,
    thresholds: LineThresholds,
}

impl SnapshotService {
    pub fn new(repository: Arc<dyn LineDataRepository>, thresholds: LineThresholds) -> Self {
        Self {
            repository,
            thresholds,
        }
    }

    /// Build a point-in-time snapshot for one line. Read-only: never mutates
    /// external state. Each failed fetch degrades that portion to empty or
    /// default with a warning, so a partial snapshot is still produced.
    pub async fn generate_line_snapshot(&self, line_id: i64, post_ids: &[i64]) -> LineSnapshot {
        let captured_at = Utc::now();

        let posts = match self.repository.fetch_post_states(line_id, post_ids).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::warn!("Failed to fetch post states for line {}: {:#}", line_id, e);
                Vec::new()
            }
        };

        let sensors = match self.repository.fetch_sensor_readings(line_id).await {
            Ok(readings) => readings,
            Err(e) => {
                tracing::warn!("Failed to fetch sensor readings for line {}: {:#}", line_id, e);
                Vec::new()
            }
        };

        let counters = match self.repository.fetch_production_counters(line_id).await {
            Ok(counters) => counters,
            Err(e) => {
                tracing::warn!(
                    "Failed to fetch production counters for line {}: {:#}",
                    line_id,
                    e
                );
                OeeInput::default()
            }
        };

        let material_level = match self.repository.fetch_material_level(line_id).await {
            Ok(level) => level,
            Err(e) => {
                tracing::warn!("Failed to fetch material level for line {}: {:#}", line_id, e);
                None
            }
        };

        let oee = OeeMetrics::compute(&counters);
        tracing::debug!(
            "Line {} OEE {:.1}% ({:?}), {} min idle",
            line_id,
            oee.oee,
            oee.oee_band(),
            counters.idle_minutes
        );
        let health_score = mean_health(&posts);
        let active_alerts = evaluate_alerts(
            line_id,
            &self.thresholds,
            &oee,
            &posts,
            material_level,
            captured_at,
        );
        let status = line_status(&posts);

        LineSnapshot {
            line_id,
            captured_at,
            sensors: sensors
                .into_iter()
                .map(|r| SensorSnapshot {
                    sensor_id: r.sensor_id,
                    name: r.name,
                    value: r.value,
                    unit: r.unit,
                    is_anomalous: r.is_anomalous,
                    read_at: r.read_at,
                })
                .collect(),
            posts: posts
                .into_iter()
                .map(|r| PostSnapshot {
                    post_id: r.post_id,
                    name: r.name,
                    units_produced: r.units_produced,
                    defective_units: r.defective_units,
                    efficiency: r.efficiency,
                    status: r.status,
                    updated_at: r.updated_at,
                })
                .collect(),
            health_score,
            status,
            active_alerts,
            oee,
        }
    }

    /// Fresh snapshot plus its delta against the cached previous one
    pub async fn generate_dashboard_update(
        &self,
        line_id: i64,
        post_ids: &[i64],
        previous: &LineSnapshot,
    ) -> (LineSnapshot, DashboardUpdate) {
        let current = self.generate_line_snapshot(line_id, post_ids).await;
        let update = diff_snapshots(previous, &current);
        (current, update)
    }
}

fn mean_health(posts: &[PostStateRecord]) -> f64 {
    if posts.is_empty() {
        return 0.0;
    }
    posts.iter().map(|p| p.health_score).sum::<f64>() / posts.len() as f64
}

/// A line runs as long as any post does; otherwise it reports the most
/// common post status, or Idle with no posts at all.
fn line_status(posts: &[PostStateRecord]) -> String {
    if posts.is_empty() {
        return "Idle".to_string();
    }
    if posts.iter().any(|p| p.status == "Running") {
        return "Running".to_string();
    }
    posts[0].status.clone()
}
