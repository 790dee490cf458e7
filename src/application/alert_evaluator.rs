// Threshold-based alert evaluation
use chrono::{DateTime, Utc};

use crate::application::line_data_repository::PostStateRecord;
use crate::domain::alert::{Alert, AlertSeverity, LineThresholds};
use crate::domain::oee::OeeMetrics;

/// Decide which alerts should be active right now for one line.
///
/// Stateless per call: this does not track newly-active vs still-active;
/// the change detector diffs the active set across cycles so duplicate
/// notifications are not re-sent every tick.
pub fn evaluate_alerts(
    line_id: i64,
    thresholds: &LineThresholds,
    oee: &OeeMetrics,
    posts: &[PostStateRecord],
    material_level: Option<f64>,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let mut alerts = Vec::new();

    if oee.oee < thresholds.min_oee() {
        alerts.push(
            Alert::new(
                line_id,
                None,
                "OEE_CRITICAL",
                AlertSeverity::Critical,
                format!(
                    "OEE {:.1}% is below the line minimum {:.1}%",
                    oee.oee,
                    thresholds.min_oee()
                ),
                now,
            )
            .with_recommended_action("Review availability, performance and quality losses"),
        );
    }

    for post in posts {
        if post.health_score < thresholds.maintenance_critical_below {
            alerts.push(
                Alert::new(
                    line_id,
                    Some(post.post_id),
                    "MAINT_CRITICAL",
                    AlertSeverity::Critical,
                    format!(
                        "Post {} health score {:.0} requires immediate maintenance",
                        post.name, post.health_score
                    ),
                    now,
                )
                .with_recommended_action("Schedule corrective maintenance now"),
            );
        } else if post.health_score < thresholds.maintenance_warning_below {
            alerts.push(Alert::new(
                line_id,
                Some(post.post_id),
                "MAINT_WARNING",
                AlertSeverity::Warning,
                format!(
                    "Post {} health score {:.0} is degrading",
                    post.name, post.health_score
                ),
                now,
            ));
        }
    }

    if let Some(level) = material_level {
        if level < thresholds.material_floor {
            let critical = level < thresholds.material_floor * thresholds.material_critical_ratio;
            let severity = if critical {
                AlertSeverity::Critical
            } else {
                AlertSeverity::Warning
            };
            alerts.push(
                Alert::new(
                    line_id,
                    None,
                    "MATERIAL_LOW",
                    severity,
                    format!(
                        "Material level {:.0} is below the floor {:.0}",
                        level, thresholds.material_floor
                    ),
                    now,
                )
                .with_recommended_action("Trigger replenishment"),
            );
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(post_id: i64, health_score: f64) -> PostStateRecord {
        PostStateRecord {
            post_id,
            name: format!("Post {}", post_id),
            units_produced: 0,
            defective_units: 0,
            efficiency: 100.0,
            status: "Running".to_string(),
            health_score,
            updated_at: Utc::now(),
        }
    }

    fn oee(score: f64) -> OeeMetrics {
        OeeMetrics {
            availability: 90.0,
            performance: 90.0,
            quality: 95.0,
            oee: score,
        }
    }

    fn thresholds() -> LineThresholds {
        LineThresholds {
            min_availability: 85.0,
            min_performance: 90.0,
            min_quality: 98.0,
            ..LineThresholds::default()
        }
    }

    #[test]
    fn test_oee_below_minimum_raises_critical() {
        // min OEE = 85 * 90 * 98 / 10000 = 74.97
        let alerts = evaluate_alerts(1, &thresholds(), &oee(70.0), &[], None, Utc::now());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, "OEE_CRITICAL");
        assert_eq!(alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(alerts[0].post_id, None);
    }

    #[test]
    fn test_oee_recovered_raises_nothing() {
        let alerts = evaluate_alerts(1, &thresholds(), &oee(80.0), &[], None, Utc::now());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_post_health_bands() {
        let posts = vec![post(1, 40.0), post(2, 65.0), post(3, 90.0)];
        let alerts = evaluate_alerts(1, &thresholds(), &oee(80.0), &posts, None, Utc::now());
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].alert_type, "MAINT_CRITICAL");
        assert_eq!(alerts[0].post_id, Some(1));
        assert_eq!(alerts[1].alert_type, "MAINT_WARNING");
        assert_eq!(alerts[1].post_id, Some(2));
    }

    #[test]
    fn test_material_low_escalation() {
        // Floor 100, critical below 50
        let warning = evaluate_alerts(1, &thresholds(), &oee(80.0), &[], Some(75.0), Utc::now());
        assert_eq!(warning.len(), 1);
        assert_eq!(warning[0].alert_type, "MATERIAL_LOW");
        assert_eq!(warning[0].severity, AlertSeverity::Warning);

        let critical = evaluate_alerts(1, &thresholds(), &oee(80.0), &[], Some(30.0), Utc::now());
        assert_eq!(critical[0].severity, AlertSeverity::Critical);

        let ok = evaluate_alerts(1, &thresholds(), &oee(80.0), &[], Some(150.0), Utc::now());
        assert!(ok.is_empty());
    }
}
