// src/pipeline/session.rs
//
// One camera's analysis session: perception records in, per-timestamp
// rolling predictions out, one arbitrated forecast at the end.

use super::metrics::PipelineMetrics;
use crate::arbiter::{Arbitration, HybridArbiter};
use crate::flow::{FlowSnapshot, FrameInput, SnapshotHistory, TrackAggregator};
use crate::scoring::{PredictionResult, RiskScorer, RollingScorer};
use crate::types::Config;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct TimestampRecord {
    pub flow_metrics: FlowSnapshot,
    pub prediction: PredictionResult,
}

pub struct CameraSession {
    camera_id: String,
    started_at: DateTime<Utc>,
    aggregator: TrackAggregator,
    history: SnapshotHistory,
    rolling: RollingScorer,
    timeline: Vec<TimestampRecord>,
    dropped_frames: u64,
    metrics: PipelineMetrics,
}

impl CameraSession {
    pub fn new(camera_id: impl Into<String>, config: &Config, metrics: PipelineMetrics) -> Self {
        Self {
            camera_id: camera_id.into(),
            started_at: Utc::now(),
            aggregator: TrackAggregator::new(config.flow.clone()),
            history: SnapshotHistory::new(),
            rolling: RollingScorer::new(
                config.scoring.classification.clone(),
                config.scoring.rolling.clone(),
            ),
            timeline: Vec::new(),
            dropped_frames: 0,
            metrics,
        }
    }

    /// Parse and ingest one JSON line of a camera feed.
    pub fn ingest_line(&mut self, line: &str) -> Option<&TimestampRecord> {
        let input = FrameInput::parse_line(line)?;
        self.ingest(input)
    }

    /// Aggregate one frame and score the short window ending at it.
    ///
    /// Frames at or before the last accepted timestamp are dropped before
    /// they touch track state.
    pub fn ingest(&mut self, input: FrameInput) -> Option<&TimestampRecord> {
        self.metrics.inc(&self.metrics.frames_ingested);

        if let Some(last) = self.history.last() {
            if input.timestamp() <= last.timestamp {
                warn!(
                    "⚠️  [{}] Out-of-order frame t={}s after t={}s dropped",
                    self.camera_id,
                    input.timestamp(),
                    last.timestamp
                );
                self.dropped_frames += 1;
                self.metrics.inc(&self.metrics.dropped_frames);
                return None;
            }
        }

        if matches!(input, FrameInput::Malformed { .. }) {
            self.metrics.inc(&self.metrics.malformed_frames);
        }

        let snapshot = self.aggregator.aggregate(&input);
        if let Err(e) = self.history.push(snapshot.clone()) {
            warn!("⚠️  [{}] Snapshot rejected: {:#}", self.camera_id, e);
            self.dropped_frames += 1;
            self.metrics.inc(&self.metrics.dropped_frames);
            return None;
        }
        self.metrics.inc(&self.metrics.snapshots);

        let prediction = self.rolling.score(&self.history);
        debug!(
            "[{}] t={}s people={} in={} out={} p={:.2} {}",
            self.camera_id,
            snapshot.timestamp,
            snapshot.total_people,
            snapshot.inflow_count,
            snapshot.outflow_count,
            prediction.incident_probability,
            prediction.alert_level.as_str()
        );

        self.timeline.push(TimestampRecord {
            flow_metrics: snapshot,
            prediction,
        });
        self.timeline.last()
    }

    /// Authoritative assessment over everything ingested so far.
    pub async fn assess(&self, arbiter: &HybridArbiter) -> Arbitration {
        let arbitration = arbiter
            .arbitrate(&self.camera_id, self.started_at, &self.history)
            .await;
        self.metrics.record_arbitration(&arbitration);
        arbitration
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    pub fn timeline(&self) -> &[TimestampRecord] {
        &self.timeline
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    pub fn malformed_frames(&self) -> u64 {
        self.aggregator.malformed_frames()
    }

    pub fn active_tracks(&self) -> usize {
        self.aggregator.active_tracks()
    }
}
