// Repository trait for shop-floor data access
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::oee::OeeInput;

/// Current state of one post as reported by the shop floor
#[derive(Debug, Clone)]
pub struct PostStateRecord {
    pub post_id: i64,
    pub name: String,
    pub units_produced: i64,
    pub defective_units: i64,
    pub efficiency: f64,
    pub status: String,
    /// Maintenance health score 0-100
    pub health_score: f64,
    pub updated_at: DateTime<Utc>,
}

/// One raw sensor reading
#[derive(Debug, Clone)]
pub struct SensorReadingRecord {
    pub sensor_id: i64,
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub is_anomalous: bool,
    pub read_at: DateTime<Utc>,
}

#[async_trait]
pub trait LineDataRepository: Send + Sync {
    /// Current state of the given posts on a line
    async fn fetch_post_states(
        &self,
        line_id: i64,
        post_ids: &[i64],
    ) -> anyhow::Result<Vec<PostStateRecord>>;

    /// All current sensor readings for a line
    async fn fetch_sensor_readings(&self, line_id: i64)
        -> anyhow::Result<Vec<SensorReadingRecord>>;

    /// The line's currently accumulating production counters
    async fn fetch_production_counters(&self, line_id: i64) -> anyhow::Result<OeeInput>;

    /// Current material level for the line, if the line reports one
    async fn fetch_material_level(&self, line_id: i64) -> anyhow::Result<Option<f64>>;
}
