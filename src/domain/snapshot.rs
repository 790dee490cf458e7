// Line snapshot domain models
use super::alert::Alert;
use super::oee::OeeMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sensor reading as captured at snapshot time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub sensor_id: i64,
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub is_anomalous: bool,
    pub read_at: DateTime<Utc>,
}

/// One post (workstation) state as captured at snapshot time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostSnapshot {
    pub post_id: i64,
    pub name: String,
    pub units_produced: i64,
    pub defective_units: i64,
    /// Percent, 0-100
    pub efficiency: f64,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

/// Point-in-time capture of a line's full observable state. Immutable once
/// built; the scheduler caches the previous one per line for diffing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineSnapshot {
    pub line_id: i64,
    pub captured_at: DateTime<Utc>,
    pub sensors: Vec<SensorSnapshot>,
    pub posts: Vec<PostSnapshot>,
    /// Mean of per-post health scores, 0 when the line has no posts
    pub health_score: f64,
    pub status: String,
    pub active_alerts: Vec<Alert>,
    pub oee: OeeMetrics,
}
