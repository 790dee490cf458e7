// Shop-floor gateway repository implementation
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::application::line_data_repository::{
    LineDataRepository, PostStateRecord, SensorReadingRecord,
};
use crate::domain::oee::OeeInput;
use crate::infrastructure::config::GatewaySettings;

/// Failures talking to the shop-floor gateway
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request to gateway failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("gateway returned status {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Read-only client for the shop-floor data gateway's REST API
#[derive(Debug, Clone)]
pub struct GatewayRepository {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
}

#[derive(Debug, Deserialize)]
struct PostStateDto {
    post_id: i64,
    name: String,
    units_produced: i64,
    defective_units: i64,
    efficiency: f64,
    status: String,
    health_score: f64,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct SensorReadingDto {
    sensor_id: i64,
    name: String,
    value: f64,
    unit: String,
    #[serde(default)]
    is_anomalous: bool,
    read_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct CountersDto {
    planned_minutes: i64,
    actual_run_minutes: i64,
    #[serde(default)]
    idle_minutes: i64,
    produced_units: i64,
    expected_units: i64,
    defective_units: i64,
}

#[derive(Debug, Deserialize)]
struct MaterialDto {
    level: Option<f64>,
}

impl GatewayRepository {
    pub fn new(settings: &GatewaySettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_token: settings.api_token.clone(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(GatewayError::Request)
            .with_context(|| format!("Failed to reach gateway at {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status { status, body }.into());
        }

        response
            .json::<T>()
            .await
            .map_err(GatewayError::Request)
            .with_context(|| format!("Failed to decode gateway response from {}", url))
    }
}

#[async_trait]
impl LineDataRepository for GatewayRepository {
    async fn fetch_post_states(
        &self,
        line_id: i64,
        post_ids: &[i64],
    ) -> Result<Vec<PostStateRecord>> {
        let ids = post_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("/lines/{}/posts?ids={}", line_id, ids);
        let dtos: Vec<PostStateDto> = self.get_json(&path).await?;

        Ok(dtos
            .into_iter()
            .map(|dto| PostStateRecord {
                post_id: dto.post_id,
                name: dto.name,
                units_produced: dto.units_produced,
                defective_units: dto.defective_units,
                efficiency: dto.efficiency,
                status: dto.status,
                health_score: dto.health_score,
                updated_at: dto.updated_at,
            })
            .collect())
    }

    async fn fetch_sensor_readings(&self, line_id: i64) -> Result<Vec<SensorReadingRecord>> {
        let path = format!("/lines/{}/sensors", line_id);
        let dtos: Vec<SensorReadingDto> = self.get_json(&path).await?;

        Ok(dtos
            .into_iter()
            .map(|dto| SensorReadingRecord {
                sensor_id: dto.sensor_id,
                name: dto.name,
                value: dto.value,
                unit: dto.unit,
                is_anomalous: dto.is_anomalous,
                read_at: dto.read_at,
            })
            .collect())
    }

    async fn fetch_production_counters(&self, line_id: i64) -> Result<OeeInput> {
        let path = format!("/lines/{}/counters", line_id);
        let dto: CountersDto = self.get_json(&path).await?;

        Ok(OeeInput {
            planned_minutes: dto.planned_minutes,
            actual_run_minutes: dto.actual_run_minutes,
            idle_minutes: dto.idle_minutes,
            produced_units: dto.produced_units,
            expected_units: dto.expected_units,
            defective_units: dto.defective_units,
        })
    }

    async fn fetch_material_level(&self, line_id: i64) -> Result<Option<f64>> {
        let path = format!("/lines/{}/material", line_id);
        let dto: MaterialDto = self.get_json(&path).await?;
        Ok(dto.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let repo = GatewayRepository::new(&GatewaySettings {
            base_url: "http://gateway:9090/".to_string(),
            api_token: String::new(),
        });
        assert_eq!(repo.base_url, "http://gateway:9090");
    }
}
