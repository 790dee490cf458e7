// Monitoring service configuration
use serde::Deserialize;

use crate::application::scheduler::{MonitoredLine, SchedulerConfig};
use crate::domain::alert::LineThresholds;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MonitorConfig {
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub thresholds: ThresholdSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewaySettings {
    pub base_url: String,
    #[serde(default)]
    pub api_token: String,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9090".to_string(),
            api_token: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_keepalive_after_ms")]
    pub keepalive_after_ms: u64,
    #[serde(default)]
    pub lines: Vec<LineEntry>,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            keepalive_after_ms: default_keepalive_after_ms(),
            lines: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LineEntry {
    pub line_id: i64,
    #[serde(default)]
    pub post_ids: Vec<i64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ThresholdSettings {
    #[serde(default = "default_min_availability")]
    pub min_availability: f64,
    #[serde(default = "default_min_performance")]
    pub min_performance: f64,
    #[serde(default = "default_min_quality")]
    pub min_quality: f64,
    #[serde(default = "default_maintenance_critical_below")]
    pub maintenance_critical_below: f64,
    #[serde(default = "default_maintenance_warning_below")]
    pub maintenance_warning_below: f64,
    #[serde(default = "default_material_floor")]
    pub material_floor: f64,
    #[serde(default = "default_material_critical_ratio")]
    pub material_critical_ratio: f64,
}

impl Default for ThresholdSettings {
    fn default() -> Self {
        Self {
            min_availability: default_min_availability(),
            min_performance: default_min_performance(),
            min_quality: default_min_quality(),
            maintenance_critical_below: default_maintenance_critical_below(),
            maintenance_warning_below: default_maintenance_warning_below(),
            material_floor: default_material_floor(),
            material_critical_ratio: default_material_critical_ratio(),
        }
    }
}

fn default_interval_ms() -> u64 {
    500
}

fn default_keepalive_after_ms() -> u64 {
    1000
}

fn default_min_availability() -> f64 {
    85.0
}

fn default_min_performance() -> f64 {
    90.0
}

fn default_min_quality() -> f64 {
    95.0
}

fn default_maintenance_critical_below() -> f64 {
    50.0
}

fn default_maintenance_warning_below() -> f64 {
    80.0
}

fn default_material_floor() -> f64 {
    100.0
}

fn default_material_critical_ratio() -> f64 {
    0.5
}

/// Load `config/monitor.{toml,yaml,json}`. A missing or malformed file is
/// not fatal: the documented defaults are used instead.
pub fn load_monitor_config() -> MonitorConfig {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/monitor").required(false))
        .add_source(config::Environment::with_prefix("MONITOR").separator("__"))
        .build();

    match settings.and_then(|s| s.try_deserialize::<MonitorConfig>()) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Failed to load monitor config, using defaults: {}", e);
            MonitorConfig::default()
        }
    }
}

impl MonitorConfig {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval_ms: self.scheduler.interval_ms,
            keepalive_after_ms: self.scheduler.keepalive_after_ms,
            lines: self
                .scheduler
                .lines
                .iter()
                .map(|entry| MonitoredLine {
                    line_id: entry.line_id,
                    post_ids: entry.post_ids.clone(),
                })
                .collect(),
        }
    }

    pub fn line_thresholds(&self) -> LineThresholds {
        LineThresholds {
            min_availability: self.thresholds.min_availability,
            min_performance: self.thresholds.min_performance,
            min_quality: self.thresholds.min_quality,
            maintenance_critical_below: self.thresholds.maintenance_critical_below,
            maintenance_warning_below: self.thresholds.maintenance_warning_below,
            material_floor: self.thresholds.material_floor,
            material_critical_ratio: self.thresholds.material_critical_ratio,
        }
    }
}
