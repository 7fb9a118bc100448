// src/scoring/rolling.rs
//
// Short-window scorer for per-timestamp monitoring. Looks only at snapshots
// within `window_seconds` of the latest one.

use super::prediction::{
    AlertLevel, IncidentType, PredictionResult, RecommendedAction, RiskFactors,
};
use super::RiskScorer;
use crate::flow::{FlowSnapshot, SnapshotHistory};
use crate::types::{ClassificationThresholds, RollingConfig};

const CRITICAL_DENSITY_WEIGHT: f64 = 0.30;
const RAPID_MOVEMENT_WEIGHT: f64 = 0.20;
const FLOW_IMBALANCE_WEIGHT: f64 = 0.15;
const CONGESTION_WEIGHT: f64 = 0.25;

const BASE_HORIZON_SECONDS: i64 = 20;
const MIN_HORIZON_SECONDS: i64 = 2;

#[derive(Debug, Clone, Default)]
pub struct RollingScorer {
    thresholds: ClassificationThresholds,
    config: RollingConfig,
}

impl RollingScorer {
    pub fn new(thresholds: ClassificationThresholds, config: RollingConfig) -> Self {
        Self { thresholds, config }
    }

    /// Trailing snapshots with timestamp in `[latest - window, latest]`.
    pub fn window<'a>(&self, snapshots: &'a [FlowSnapshot]) -> &'a [FlowSnapshot] {
        let Some(latest) = snapshots.last() else {
            return snapshots;
        };
        let cutoff = latest.timestamp - self.config.window_seconds;
        let start = snapshots.partition_point(|s| s.timestamp < cutoff);
        &snapshots[start..]
    }

    pub fn score_window(&self, window: &[FlowSnapshot]) -> PredictionResult {
        if window.len() < self.config.min_snapshots {
            return low_risk_default();
        }
        let (Some(latest), Some(previous)) =
            (window.last(), window.len().checked_sub(2).map(|i| &window[i]))
        else {
            return low_risk_default();
        };

        let mut factors = RiskFactors::new();
        let mut score: f64 = 0.0;

        if latest.density_level.numeric() > 3 {
            score += CRITICAL_DENSITY_WEIGHT;
            factors.add("critical_density");
        }

        if latest.average_velocity - previous.average_velocity > 0.1 {
            score += RAPID_MOVEMENT_WEIGHT;
            factors.add("rapid_movement");
        }

        if window.iter().any(|s| s.net_flow.abs() > 10) {
            score += FLOW_IMBALANCE_WEIGHT;
            factors.add("flow_imbalance");
        }

        if latest.congestion_count() > 2 {
            score += CONGESTION_WEIGHT;
            factors.add("multiple_congestion_points");
        }

        let score = score.min(1.0);
        let confidence = (factors.len() as f64 * 0.2 + 0.3).min(0.95);
        let time_to_incident = short_horizon_seconds(score, &factors);

        PredictionResult {
            incident_probability: score,
            prediction_confidence: confidence,
            predicted_incident_type: self.thresholds.incident_type(score),
            time_to_incident_seconds: time_to_incident,
            risk_factors: factors.into_vec(),
            recommended_action: self.thresholds.action(score),
            alert_level: self.thresholds.alert_level(score),
        }
    }
}

impl RiskScorer for RollingScorer {
    fn name(&self) -> &'static str {
        "rolling"
    }

    fn score(&self, history: &SnapshotHistory) -> PredictionResult {
        self.score_window(self.window(history.snapshots()))
    }
}

fn short_horizon_seconds(score: f64, factors: &RiskFactors) -> u32 {
    let mut seconds = BASE_HORIZON_SECONDS;
    if factors.contains("critical_density") {
        seconds -= 8;
    }
    if factors.contains("rapid_movement") {
        seconds -= 5;
    }
    if factors.contains("multiple_congestion_points") {
        seconds -= 6;
    }
    if score > 0.7 {
        seconds -= 5;
    } else if score > 0.5 {
        seconds -= 3;
    }
    seconds.max(MIN_HORIZON_SECONDS) as u32
}

fn low_risk_default() -> PredictionResult {
    PredictionResult {
        incident_probability: 0.1,
        prediction_confidence: 0.6,
        predicted_incident_type: IncidentType::None,
        time_to_incident_seconds: BASE_HORIZON_SECONDS as u32,
        risk_factors: Vec::new(),
        recommended_action: RecommendedAction::NoAction,
        alert_level: AlertLevel::Green,
    }
}
