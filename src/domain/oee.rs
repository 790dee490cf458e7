// OEE (Overall Equipment Effectiveness) calculation
use serde::{Deserialize, Serialize};

/// Raw production counters for one line over the current accumulation window
#[derive(Debug, Clone, Copy, Default)]
pub struct OeeInput {
    pub planned_minutes: i64,
    pub actual_run_minutes: i64,
    pub idle_minutes: i64,
    pub produced_units: i64,
    pub expected_units: i64,
    pub defective_units: i64,
}

/// The OEE triad plus the composite score, all in percent [0, 100]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OeeMetrics {
    pub availability: f64,
    pub performance: f64,
    pub quality: f64,
    pub oee: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthBand {
    Good,
    Warning,
    Critical,
}

impl OeeMetrics {
    /// Compute OEE from raw counters. Never panics: a zero or negative
    /// denominator yields 0 for the affected component.
    pub fn compute(input: &OeeInput) -> Self {
        let availability = ratio_percent(input.actual_run_minutes, input.planned_minutes);
        let performance = ratio_percent(input.produced_units, input.expected_units);
        let quality = ratio_percent(
            input.produced_units - input.defective_units,
            input.produced_units,
        );
        let oee = availability * performance * quality / 10_000.0;

        Self {
            availability,
            performance,
            quality,
            oee,
        }
    }

    /// Overall band: OEE >= 85 Good, >= 70 Warning, below Critical
    pub fn oee_band(&self) -> HealthBand {
        band(self.oee, 85.0, 70.0)
    }

    pub fn availability_band(&self) -> HealthBand {
        band(self.availability, 95.0, 85.0)
    }

    pub fn performance_band(&self) -> HealthBand {
        band(self.performance, 95.0, 85.0)
    }

    pub fn quality_band(&self) -> HealthBand {
        band(self.quality, 98.0, 95.0)
    }
}

fn ratio_percent(numerator: i64, denominator: i64) -> f64 {
    if denominator <= 0 {
        return 0.0;
    }
    (numerator as f64 / denominator as f64 * 100.0).clamp(0.0, 100.0)
}

fn band(value: f64, good_at: f64, warning_at: f64) -> HealthBand {
    if value >= good_at {
        HealthBand::Good
    } else if value >= warning_at {
        HealthBand::Warning
    } else {
        HealthBand::Critical
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift() -> OeeInput {
        OeeInput {
            planned_minutes: 480,
            actual_run_minutes: 432,
            idle_minutes: 48,
            produced_units: 950,
            expected_units: 1000,
            defective_units: 19,
        }
    }

    #[test]
    fn test_reference_shift() {
        let metrics = OeeMetrics::compute(&shift());
        assert!((metrics.availability - 90.0).abs() < 1e-9);
        assert!((metrics.performance - 95.0).abs() < 1e-9);
        assert!((metrics.quality - 98.0).abs() < 1e-9);
        assert!((metrics.oee - 83.79).abs() < 1e-9);
    }

    #[test]
    fn test_zero_denominators() {
        let metrics = OeeMetrics::compute(&OeeInput {
            planned_minutes: 0,
            expected_units: 0,
            produced_units: 0,
            ..Default::default()
        });
        assert_eq!(metrics.availability, 0.0);
        assert_eq!(metrics.performance, 0.0);
        assert_eq!(metrics.quality, 0.0);
        assert_eq!(metrics.oee, 0.0);

        let negative = OeeMetrics::compute(&OeeInput {
            planned_minutes: -10,
            actual_run_minutes: 5,
            ..Default::default()
        });
        assert_eq!(negative.availability, 0.0);
    }

    #[test]
    fn test_components_clamped() {
        let metrics = OeeMetrics::compute(&OeeInput {
            planned_minutes: 60,
            actual_run_minutes: 90,
            produced_units: 120,
            expected_units: 100,
            defective_units: 0,
            idle_minutes: 0,
        });
        assert_eq!(metrics.availability, 100.0);
        assert_eq!(metrics.performance, 100.0);
    }

    #[test]
    fn test_bands() {
        let metrics = OeeMetrics::compute(&shift());
        assert_eq!(metrics.oee_band(), HealthBand::Warning);
        assert_eq!(metrics.availability_band(), HealthBand::Warning);
        // Cut points are inclusive: performance of exactly 95 is Good
        assert_eq!(metrics.performance_band(), HealthBand::Good);
        assert_eq!(metrics.quality_band(), HealthBand::Good);
    }

    #[test]
    fn test_band_cut_points_inclusive() {
        let metrics = OeeMetrics {
            availability: 95.0,
            performance: 85.0,
            quality: 95.0,
            oee: 70.0,
        };
        assert_eq!(metrics.availability_band(), HealthBand::Good);
        assert_eq!(metrics.performance_band(), HealthBand::Warning);
        assert_eq!(metrics.quality_band(), HealthBand::Warning);
        assert_eq!(metrics.oee_band(), HealthBand::Warning);
    }
}
