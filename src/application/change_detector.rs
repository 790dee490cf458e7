// Snapshot change detection - field-by-field diff between cycles
use std::collections::{HashMap, HashSet};

use crate::domain::snapshot::LineSnapshot;
use crate::domain::update::{
    AlertDelta, DashboardUpdate, LineDelta, OeeDelta, PostDelta, SensorDelta,
};

/// Value changes at or below this are treated as noise
pub const VALUE_EPSILON: f64 = 1e-6;

/// Compare two snapshots of the same line and keep only what changed.
///
/// Every snapshot field falls in exactly one delta category: sensor values
/// and anomaly flags -> sensor deltas; post status, counters and rounded
/// efficiency -> post deltas; aggregate health score and line status -> the
/// line delta; the OEE triad -> the OEE delta; active alerts ->
/// raised/cleared. A sensor or post appearing counts as a delta; one
/// disappearing lands in the removed-id lists.
pub fn diff_snapshots(previous: &LineSnapshot, current: &LineSnapshot) -> DashboardUpdate {
    let sensors = diff_sensors(previous, current);
    let removed_sensor_ids = removed_ids(
        previous.sensors.iter().map(|s| s.sensor_id),
        current.sensors.iter().map(|s| s.sensor_id),
    );
    let posts = diff_posts(previous, current);
    let removed_post_ids = removed_ids(
        previous.posts.iter().map(|p| p.post_id),
        current.posts.iter().map(|p| p.post_id),
    );
    let line = diff_line(previous, current);
    let oee = diff_oee(previous, current);
    let alerts = diff_alerts(previous, current);

    let has_any_changes = !sensors.is_empty()
        || !removed_sensor_ids.is_empty()
        || !posts.is_empty()
        || !removed_post_ids.is_empty()
        || line.is_some()
        || oee.is_some()
        || !alerts.is_empty();

    DashboardUpdate {
        line_id: current.line_id,
        generated_at: current.captured_at,
        sensors,
        removed_sensor_ids,
        posts,
        removed_post_ids,
        line,
        oee,
        alerts,
        has_any_changes,
    }
}

fn removed_ids(
    previous: impl Iterator<Item = i64>,
    current: impl Iterator<Item = i64>,
) -> Vec<i64> {
    let current_ids: HashSet<i64> = current.collect();
    previous.filter(|id| !current_ids.contains(id)).collect()
}

fn diff_line(previous: &LineSnapshot, current: &LineSnapshot) -> Option<LineDelta> {
    let changed = (current.health_score - previous.health_score).abs() > VALUE_EPSILON
        || current.status != previous.status;

    changed.then(|| LineDelta {
        health_score: current.health_score,
        status: current.status.clone(),
    })
}

fn diff_sensors(previous: &LineSnapshot, current: &LineSnapshot) -> Vec<SensorDelta> {
    let prior: HashMap<i64, _> = previous.sensors.iter().map(|s| (s.sensor_id, s)).collect();

    current
        .sensors
        .iter()
        .filter(|sensor| match prior.get(&sensor.sensor_id) {
            Some(old) => {
                (sensor.value - old.value).abs() > VALUE_EPSILON
                    || sensor.is_anomalous != old.is_anomalous
            }
            None => true,
        })
        .map(|sensor| SensorDelta {
            sensor_id: sensor.sensor_id,
            value: sensor.value,
            is_anomalous: sensor.is_anomalous,
            read_at: sensor.read_at,
        })
        .collect()
}

fn diff_posts(previous: &LineSnapshot, current: &LineSnapshot) -> Vec<PostDelta> {
    let prior: HashMap<i64, _> = previous.posts.iter().map(|p| (p.post_id, p)).collect();

    current
        .posts
        .iter()
        .filter(|post| match prior.get(&post.post_id) {
            Some(old) => {
                post.status != old.status
                    || post.units_produced != old.units_produced
                    || post.defective_units != old.defective_units
                    || round2(post.efficiency) != round2(old.efficiency)
            }
            None => true,
        })
        .map(|post| PostDelta {
            post_id: post.post_id,
            status: post.status.clone(),
            units_produced: post.units_produced,
            defective_units: post.defective_units,
            efficiency: post.efficiency,
            updated_at: post.updated_at,
        })
        .collect()
}

fn diff_oee(previous: &LineSnapshot, current: &LineSnapshot) -> Option<OeeDelta> {
    let old = &previous.oee;
    let new = &current.oee;

    let changed = (new.availability - old.availability).abs() > VALUE_EPSILON
        || (new.performance - old.performance).abs() > VALUE_EPSILON
        || (new.quality - old.quality).abs() > VALUE_EPSILON;

    changed.then(|| OeeDelta {
        availability: new.availability,
        performance: new.performance,
        quality: new.quality,
        oee: new.oee,
    })
}

fn diff_alerts(previous: &LineSnapshot, current: &LineSnapshot) -> AlertDelta {
    let raised = current
        .active_alerts
        .iter()
        .filter(|alert| !previous.active_alerts.iter().any(|p| p.key() == alert.key()))
        .cloned()
        .collect();

    let cleared = previous
        .active_alerts
        .iter()
        .filter(|alert| !current.active_alerts.iter().any(|c| c.key() == alert.key()))
        .cloned()
        .collect();

    AlertDelta { raised, cleared }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
