// Dashboard update (delta) models and the published stream message
use super::alert::Alert;
use super::snapshot::LineSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sensor whose value moved beyond epsilon or whose anomaly flag flipped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorDelta {
    pub sensor_id: i64,
    pub value: f64,
    pub is_anomalous: bool,
    pub read_at: DateTime<Utc>,
}

/// A post whose status, counters, or rounded efficiency changed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDelta {
    pub post_id: i64,
    pub status: String,
    pub units_produced: i64,
    pub defective_units: i64,
    pub efficiency: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OeeDelta {
    pub availability: f64,
    pub performance: f64,
    pub quality: f64,
    pub oee: f64,
}

/// Line-level aggregates that moved: health score or operational status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineDelta {
    pub health_score: f64,
    pub status: String,
}

/// Alerts that became active or cleared since the previous snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertDelta {
    pub raised: Vec<Alert>,
    pub cleared: Vec<Alert>,
}

impl AlertDelta {
    pub fn is_empty(&self) -> bool {
        self.raised.is_empty() && self.cleared.is_empty()
    }
}

/// The subset of a line snapshot that changed since the previous cycle.
/// Sensors and posts that vanished since the previous cycle are reported
/// by id so subscribers can drop them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardUpdate {
    pub line_id: i64,
    pub generated_at: DateTime<Utc>,
    pub sensors: Vec<SensorDelta>,
    pub removed_sensor_ids: Vec<i64>,
    pub posts: Vec<PostDelta>,
    pub removed_post_ids: Vec<i64>,
    pub line: Option<LineDelta>,
    pub oee: Option<OeeDelta>,
    pub alerts: AlertDelta,
    pub has_any_changes: bool,
}

/// Message published to a line's subscriber group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum StreamMessage {
    InitialSnapshot(LineSnapshot),
    Update(DashboardUpdate),
}

impl StreamMessage {
    pub fn line_id(&self) -> i64 {
        match self {
            Self::InitialSnapshot(snapshot) => snapshot.line_id,
            Self::Update(update) => update.line_id,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::InitialSnapshot(snapshot) => snapshot.captured_at,
            Self::Update(update) => update.generated_at,
        }
    }
}
