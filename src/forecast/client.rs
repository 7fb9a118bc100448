// src/forecast/client.rs
//
// HTTP backend for the forecasting service.
//
//   GET  {server}/models    → { "models": [ModelHandle] }
//   POST {server}/training  → { "job_name": "..." }
//   POST {server}/predict   → ForecastResponse

use super::dataset::ForecastRow;
use super::{ForecastBackend, ForecastResponse, ModelHandle, TrainingRequest};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct ModelListResponse {
    #[serde(default)]
    models: Vec<ModelHandle>,
}

#[derive(Debug, Deserialize)]
struct TrainingResponse {
    job_name: String,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    request_id: String,
    model: &'a str,
    instances: &'a [ForecastRow],
}

pub struct HttpForecastClient {
    http_client: reqwest::Client,
    server_url: String,
}

impl HttpForecastClient {
    pub fn new(server_url: &str, timeout_ms: u64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            server_url: server_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.server_url, path)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        what: &str,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            bail!("{} returned {}: {}", what, status, body);
        }
        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse {} response", what))
    }
}

#[async_trait]
impl ForecastBackend for HttpForecastClient {
    async fn list_models(&self) -> Result<Vec<ModelHandle>> {
        let url = self.endpoint("models");
        debug!("🔍 Listing forecasting models at {}", url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Model listing request to {} failed", url))?;
        let list: ModelListResponse = Self::read_json(response, "model listing").await?;
        Ok(list.models)
    }

    async fn start_training(&self, request: &TrainingRequest) -> Result<String> {
        let url = self.endpoint("training");
        info!(
            "🎯 Requesting training {} ({} rows) at {}",
            request.display_name,
            request.rows.len(),
            url
        );

        let response = self
            .http_client
            .post(&url)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Training request to {} failed", url))?;
        let started: TrainingResponse = Self::read_json(response, "training").await?;
        Ok(started.job_name)
    }

    async fn predict(&self, model: &ModelHandle, rows: &[ForecastRow]) -> Result<ForecastResponse> {
        let url = self.endpoint("predict");
        let request = PredictRequest {
            request_id: uuid::Uuid::new_v4().to_string(),
            model: &model.resource_name,
            instances: rows,
        };
        debug!(
            "🔮 Forecast request {} ({} rows) → {}",
            request.request_id,
            rows.len(),
            model.resource_name
        );

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Forecast request to {} failed", url))?;
        Self::read_json(response, "forecast").await
    }
}
