// src/pipeline/metrics.rs
//
// Process-wide counters shared by every camera worker. Cloning shares the
// underlying atomics.

use crate::arbiter::{ArbiterState, Arbitration, ForecastOutcome, PredictionSource};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub frames_ingested: Arc<AtomicU64>,
    pub malformed_frames: Arc<AtomicU64>,
    pub dropped_frames: Arc<AtomicU64>,
    pub snapshots: Arc<AtomicU64>,
    pub cameras_processed: Arc<AtomicU64>,
    pub cameras_failed: Arc<AtomicU64>,
    pub immediate_threats: Arc<AtomicU64>,
    pub forecast_attempts: Arc<AtomicU64>,
    pub forecast_failures: Arc<AtomicU64>,
    pub forecast_selections: Arc<AtomicU64>,
    pub training_requests: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            frames_ingested: Arc::new(AtomicU64::new(0)),
            malformed_frames: Arc::new(AtomicU64::new(0)),
            dropped_frames: Arc::new(AtomicU64::new(0)),
            snapshots: Arc::new(AtomicU64::new(0)),
            cameras_processed: Arc::new(AtomicU64::new(0)),
            cameras_failed: Arc::new(AtomicU64::new(0)),
            immediate_threats: Arc::new(AtomicU64::new(0)),
            forecast_attempts: Arc::new(AtomicU64::new(0)),
            forecast_failures: Arc::new(AtomicU64::new(0)),
            forecast_selections: Arc::new(AtomicU64::new(0)),
            training_requests: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_arbitration(&self, arbitration: &Arbitration) {
        if arbitration.state == ArbiterState::Immediate {
            self.inc(&self.immediate_threats);
        }
        match arbitration.forecast_outcome {
            ForecastOutcome::Failed => {
                self.inc(&self.forecast_attempts);
                self.inc(&self.forecast_failures);
            }
            ForecastOutcome::LowConfidence
            | ForecastOutcome::RuleBasedKept
            | ForecastOutcome::Selected => self.inc(&self.forecast_attempts),
            ForecastOutcome::TrainingStarted => self.inc(&self.training_requests),
            ForecastOutcome::Skipped
            | ForecastOutcome::InsufficientHistory
            | ForecastOutcome::TrainingPending => {}
        }
        if arbitration.source == PredictionSource::Forecast {
            self.inc(&self.forecast_selections);
        }
    }

    pub fn frames_per_sec(&self) -> f64 {
        let frames = self.frames_ingested.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            frames_ingested: self.frames_ingested.load(Ordering::Relaxed),
            frames_per_sec: self.frames_per_sec(),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
            snapshots: self.snapshots.load(Ordering::Relaxed),
            cameras_processed: self.cameras_processed.load(Ordering::Relaxed),
            cameras_failed: self.cameras_failed.load(Ordering::Relaxed),
            immediate_threats: self.immediate_threats.load(Ordering::Relaxed),
            forecast_attempts: self.forecast_attempts.load(Ordering::Relaxed),
            forecast_failures: self.forecast_failures.load(Ordering::Relaxed),
            forecast_selections: self.forecast_selections.load(Ordering::Relaxed),
            training_requests: self.training_requests.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub frames_ingested: u64,
    pub frames_per_sec: f64,
    pub malformed_frames: u64,
    pub dropped_frames: u64,
    pub snapshots: u64,
    pub cameras_processed: u64,
    pub cameras_failed: u64,
    pub immediate_threats: u64,
    pub forecast_attempts: u64,
    pub forecast_failures: u64,
    pub forecast_selections: u64,
    pub training_requests: u64,
    pub elapsed_secs: f64,
}
