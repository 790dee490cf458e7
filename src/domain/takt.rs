// Takt-time planning for a production order
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Production plan for one order on one line. Takt time is the maximum
/// allowable time per unit to meet demand within the available hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionPlan {
    pub quantity_to_produce: i64,
    pub quantity_produced: i64,
    pub available_hours: f64,
    /// Seconds per unit; refreshed by `calculate_takt_time`
    pub takt_time_seconds: f64,
    /// Units per hour; refreshed by `calculate_takt_time`
    pub required_cadence_per_hour: f64,
    pub target_deadline: DateTime<Utc>,
}

impl ProductionPlan {
    pub fn new(quantity_to_produce: i64, available_hours: f64, target_deadline: DateTime<Utc>) -> Self {
        let mut plan = Self {
            quantity_to_produce,
            quantity_produced: 0,
            available_hours,
            takt_time_seconds: 0.0,
            required_cadence_per_hour: 0.0,
            target_deadline,
        };
        plan.calculate_takt_time();
        plan
    }

    /// Recompute takt time and cadence. Callers must invoke this after
    /// changing the quantity or the available hours; the fields are not
    /// recomputed on every mutation.
    pub fn calculate_takt_time(&mut self) {
        if self.quantity_to_produce <= 0 {
            self.takt_time_seconds = 0.0;
            self.required_cadence_per_hour = 0.0;
            return;
        }

        self.takt_time_seconds = self.available_hours * 3600.0 / self.quantity_to_produce as f64;
        self.required_cadence_per_hour = if self.takt_time_seconds <= 0.0 {
            0.0
        } else {
            3600.0 / self.takt_time_seconds
        };
    }

    pub fn progress_percent(&self) -> f64 {
        if self.quantity_to_produce <= 0 {
            return 0.0;
        }
        self.quantity_produced as f64 / self.quantity_to_produce as f64 * 100.0
    }

    pub fn is_deadline_exceeded(&self, now: DateTime<Utc>) -> bool {
        now > self.target_deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn deadline() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap()
    }

    #[test]
    fn test_takt_time_for_shift() {
        let plan = ProductionPlan::new(960, 8.0, deadline());
        assert!((plan.takt_time_seconds - 30.0).abs() < 1e-9);
        assert!((plan.required_cadence_per_hour - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_quantity_guard() {
        let plan = ProductionPlan::new(0, 8.0, deadline());
        assert_eq!(plan.takt_time_seconds, 0.0);
        assert_eq!(plan.required_cadence_per_hour, 0.0);
        assert_eq!(plan.progress_percent(), 0.0);
    }

    #[test]
    fn test_recalculate_after_quantity_change() {
        let mut plan = ProductionPlan::new(960, 8.0, deadline());
        plan.quantity_to_produce = 480;
        // Stale until explicitly recomputed
        assert!((plan.takt_time_seconds - 30.0).abs() < 1e-9);
        plan.calculate_takt_time();
        assert!((plan.takt_time_seconds - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_progress_and_deadline() {
        let mut plan = ProductionPlan::new(960, 8.0, deadline());
        plan.quantity_produced = 240;
        assert!((plan.progress_percent() - 25.0).abs() < 1e-9);
        assert!(!plan.is_deadline_exceeded(deadline()));
        assert!(plan.is_deadline_exceeded(deadline() + chrono::Duration::seconds(1)));
    }
}
