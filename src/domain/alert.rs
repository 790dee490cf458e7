// Alert domain model and per-line alerting thresholds
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSeverity {
    Critical,
    Warning,
    Alert,
    Info,
}

/// An active condition on a line, optionally scoped to one post. Alerts are
/// only ever flagged acknowledged by an external actor, never deleted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub line_id: i64,
    pub post_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub alert_type: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub recommended_action: Option<String>,
    pub acknowledged: bool,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(
        line_id: i64,
        post_id: Option<i64>,
        alert_type: impl Into<String>,
        severity: AlertSeverity,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            line_id,
            post_id,
            created_at,
            alert_type: alert_type.into(),
            severity,
            message: message.into(),
            recommended_action: None,
            acknowledged: false,
            acknowledged_at: None,
        }
    }

    pub fn with_recommended_action(mut self, action: impl Into<String>) -> Self {
        self.recommended_action = Some(action.into());
        self
    }

    pub fn acknowledge(&mut self, now: DateTime<Utc>) {
        self.acknowledged = true;
        self.acknowledged_at = Some(now);
    }

    /// Identity used when diffing active-alert sets across cycles
    pub fn key(&self) -> (String, Option<i64>) {
        (self.alert_type.clone(), self.post_id)
    }
}

/// Alerting thresholds configured per line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineThresholds {
    pub min_availability: f64,
    pub min_performance: f64,
    pub min_quality: f64,
    /// Post health score below this is a Critical maintenance alert
    pub maintenance_critical_below: f64,
    /// Post health score below this (but at or above the critical bound)
    /// is a Warning maintenance alert
    pub maintenance_warning_below: f64,
    /// Material level below this floor raises a stock alert
    pub material_floor: f64,
    /// Fraction of the floor below which the stock alert escalates to Critical
    pub material_critical_ratio: f64,
}

impl Default for LineThresholds {
    fn default() -> Self {
        Self {
            min_availability: 85.0,
            min_performance: 90.0,
            min_quality: 95.0,
            maintenance_critical_below: 50.0,
            maintenance_warning_below: 80.0,
            material_floor: 100.0,
            material_critical_ratio: 0.5,
        }
    }
}

impl LineThresholds {
    /// The line's minimum acceptable OEE, derived from the component minimums
    pub fn min_oee(&self) -> f64 {
        self.min_availability * self.min_performance * self.min_quality / 10_000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_oee_derivation() {
        let thresholds = LineThresholds {
            min_availability: 85.0,
            min_performance: 90.0,
            min_quality: 98.0,
            ..LineThresholds::default()
        };
        assert!((thresholds.min_oee() - 74.97).abs() < 1e-9);
    }

    #[test]
    fn test_acknowledge_sets_flag_and_timestamp() {
        let now = Utc::now();
        let mut alert = Alert::new(1, Some(2), "MAINT_CRITICAL", AlertSeverity::Critical, "worn bearing", now);
        assert!(!alert.acknowledged);
        alert.acknowledge(now);
        assert!(alert.acknowledged);
        assert_eq!(alert.acknowledged_at, Some(now));
    }
}
