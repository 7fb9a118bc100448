// src/forecast/mod.rs
//
// Optional external forecasting collaborator.
//
// The arbiter only talks to `ForecastContext`, which owns the backend, the
// once-initialised model handle and the single-flight training guard. Every
// backend error stays inside this module's callers as "forecast unavailable".

pub mod client;
pub mod context;
pub mod dataset;

use crate::scoring::PredictionResult;
use crate::types::ClassificationThresholds;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use client::HttpForecastClient;
pub use context::{ForecastContext, ModelStatus};
pub use dataset::{
    forecast_rows, incident_risk_score, prediction_from_series, training_rows, ForecastRow,
    TrainingRow,
};

/// Display-name fragments that mark a model as a flow forecaster.
const FORECAST_MODEL_MARKERS: [&str; 3] = ["forecast", "flow-incident", "time-series"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelState {
    Succeeded,
    Running,
    Pending,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelHandle {
    pub resource_name: String,
    pub display_name: String,
    pub state: ModelState,
    pub created_at: DateTime<Utc>,
}

impl ModelHandle {
    pub fn is_flow_forecaster(&self) -> bool {
        let name = self.display_name.to_lowercase();
        self.state == ModelState::Succeeded
            && FORECAST_MODEL_MARKERS.iter().any(|m| name.contains(m))
    }
}

/// Keep usable forecasting models, newest first.
pub fn select_forecasting_models(models: Vec<ModelHandle>) -> Vec<ModelHandle> {
    let mut usable: Vec<ModelHandle> = models
        .into_iter()
        .filter(ModelHandle::is_flow_forecaster)
        .collect();
    usable.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    usable
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingRequest {
    pub request_id: String,
    pub display_name: String,
    pub target_column: String,
    pub time_column: String,
    pub series_column: String,
    pub rows: Vec<TrainingRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesPoint {
    pub value: f64,
}

/// A forecast reply: either a ready-made assessment or a raw risk series.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ForecastResponse {
    Assessment(PredictionResult),
    Series { predictions: Vec<SeriesPoint> },
}

impl ForecastResponse {
    /// None for an empty series, or for an assessment whose probability or
    /// confidence is not a finite value in [0, 1]. Accepted assessments are
    /// relabelled from `thresholds` so type, action and level match the
    /// probability.
    pub fn into_prediction(self, thresholds: &ClassificationThresholds) -> Option<PredictionResult> {
        match self {
            Self::Assessment(result) => {
                let p = result.incident_probability;
                if !(0.0..=1.0).contains(&p) || !(0.0..=1.0).contains(&result.prediction_confidence) {
                    return None;
                }
                Some(PredictionResult {
                    predicted_incident_type: thresholds.incident_type(p),
                    recommended_action: thresholds.action(p),
                    alert_level: thresholds.alert_level(p),
                    ..result
                })
            }
            Self::Series { predictions } => {
                let values: Vec<f64> = predictions.into_iter().map(|p| p.value).collect();
                prediction_from_series(&values, thresholds)
            }
        }
    }
}

#[async_trait]
pub trait ForecastBackend: Send + Sync {
    async fn list_models(&self) -> Result<Vec<ModelHandle>>;

    /// Kick off training and return the job name. Must not wait for the
    /// model itself.
    async fn start_training(&self, request: &TrainingRequest) -> Result<String>;

    async fn predict(&self, model: &ModelHandle, rows: &[ForecastRow]) -> Result<ForecastResponse>;
}
