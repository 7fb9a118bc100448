// src/forecast/context.rs
//
// Caller-owned forecasting context shared by every camera worker.
//
// - The discovered model list and the selected model handle are each filled
//   at most once per context (tokio OnceCell); later readers never lock.
// - Training is fire-and-forget on a spawned task, with at most one request
//   in flight. Once a job has been accepted no further training is requested.
// - Model listing and forecast calls are bounded by `timeout_ms`.

use super::dataset::{forecast_rows, training_rows, TrainingRow};
use super::{select_forecasting_models, ForecastBackend, ModelHandle, TrainingRequest};
use crate::flow::FlowSnapshot;
use crate::scoring::PredictionResult;
use crate::types::{ClassificationThresholds, ForecastConfig};
use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum ModelStatus {
    Ready(ModelHandle),
    InsufficientHistory { have: usize, need: usize },
    /// A training request was spawned by this call.
    TrainingStarted,
    /// Training already in flight or accepted earlier.
    TrainingPending,
}

#[derive(Debug, Default)]
struct TrainingGuard {
    in_flight: AtomicBool,
    job: OnceLock<String>,
}

pub struct ForecastContext {
    backend: Arc<dyn ForecastBackend>,
    config: ForecastConfig,
    thresholds: ClassificationThresholds,
    discovered: OnceCell<Vec<ModelHandle>>,
    model: OnceCell<ModelHandle>,
    training: Arc<TrainingGuard>,
}

impl ForecastContext {
    pub fn new(
        backend: Arc<dyn ForecastBackend>,
        config: ForecastConfig,
        thresholds: ClassificationThresholds,
    ) -> Self {
        Self {
            backend,
            config,
            thresholds,
            discovered: OnceCell::new(),
            model: OnceCell::new(),
            training: Arc::new(TrainingGuard::default()),
        }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn cached_model(&self) -> Option<&ModelHandle> {
        self.model.get()
    }

    pub fn training_job(&self) -> Option<&str> {
        self.training.job.get().map(String::as_str)
    }

    pub fn training_in_flight(&self) -> bool {
        self.training.in_flight.load(Ordering::Acquire)
    }

    /// Usable models, listed from the backend on first call only. A failed
    /// or timed-out listing is cached as empty.
    pub async fn discovered_models(&self) -> &[ModelHandle] {
        self.discovered
            .get_or_init(|| async {
                let limit = Duration::from_millis(self.config.timeout_ms);
                let listed = tokio::time::timeout(limit, self.backend.list_models())
                    .await
                    .with_context(|| {
                        format!("Model listing timed out after {}ms", self.config.timeout_ms)
                    })
                    .and_then(|listed| listed);
                match listed {
                    Ok(models) => {
                        let usable = select_forecasting_models(models);
                        if usable.is_empty() {
                            info!("🎯 No trained forecasting models found");
                        } else {
                            info!("📊 Discovered {} forecasting model(s)", usable.len());
                        }
                        usable
                    }
                    Err(e) => {
                        warn!("⚠️  Model discovery failed, continuing without: {:#}", e);
                        Vec::new()
                    }
                }
            })
            .await
    }

    /// Return the cached model handle, or try to obtain one.
    ///
    /// Below `min_snapshots` nothing is attempted. Otherwise the newest
    /// discovered model is cached; with none available a background training
    /// request is started and this call proceeds without a model.
    pub async fn resolve_model(
        &self,
        camera_id: &str,
        started_at: DateTime<Utc>,
        snapshots: &[FlowSnapshot],
    ) -> ModelStatus {
        if let Some(model) = self.model.get() {
            return ModelStatus::Ready(model.clone());
        }
        if snapshots.len() < self.config.min_snapshots {
            return ModelStatus::InsufficientHistory {
                have: snapshots.len(),
                need: self.config.min_snapshots,
            };
        }

        if let Some(newest) = self.discovered_models().await.first() {
            let model = self.model.get_or_init(|| async { newest.clone() }).await;
            info!("✅ Using forecasting model {}", model.display_name);
            return ModelStatus::Ready(model.clone());
        }

        let rows = training_rows(camera_id, started_at, snapshots);
        match self.spawn_training(rows) {
            Some(_) => ModelStatus::TrainingStarted,
            None => ModelStatus::TrainingPending,
        }
    }

    /// Spawn a training request unless one is in flight or already accepted.
    pub fn spawn_training(&self, rows: Vec<TrainingRow>) -> Option<JoinHandle<()>> {
        if self.training.job.get().is_some() {
            return None;
        }
        if self
            .training
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let request = TrainingRequest {
            request_id: uuid::Uuid::new_v4().to_string(),
            display_name: format!("flow-incident-forecasting-{}", Utc::now().timestamp()),
            target_column: "incident_risk_score".to_string(),
            time_column: "timestamp".to_string(),
            series_column: "cctv_id".to_string(),
            rows,
        };
        let backend = Arc::clone(&self.backend);
        let guard = Arc::clone(&self.training);

        Some(tokio::spawn(async move {
            match backend.start_training(&request).await {
                Ok(job) => {
                    info!("📋 Training job started: {} (rule-based until ready)", job);
                    let _ = guard.job.set(job);
                }
                Err(e) => warn!("⚠️  Training request failed: {:#}", e),
            }
            guard.in_flight.store(false, Ordering::Release);
        }))
    }

    /// Ask the model for a forecast over the trailing request window.
    pub async fn forecast(
        &self,
        model: &ModelHandle,
        camera_id: &str,
        started_at: DateTime<Utc>,
        snapshots: &[FlowSnapshot],
    ) -> Result<PredictionResult> {
        let rows = forecast_rows(camera_id, started_at, snapshots, self.config.request_window);
        if rows.is_empty() {
            bail!("No snapshot in the request window has a representable time");
        }
        let limit = Duration::from_millis(self.config.timeout_ms);

        let response = tokio::time::timeout(limit, self.backend.predict(model, &rows))
            .await
            .with_context(|| format!("Forecast timed out after {}ms", self.config.timeout_ms))??;

        response
            .into_prediction(&self.thresholds)
            .ok_or_else(|| anyhow!("Forecast returned no usable assessment"))
    }
}
