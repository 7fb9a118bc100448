// src/scoring/stable.rs
//
// Full-history rule-based scorer.
//
// Seven categories, each contributing at most one tier (highest first):
//   fire/smoke          20%
//   weapon/violence     20%
//   evacuation/suspect  20%
//   density             15%
//   flow imbalance      10%
//   congestion          10%
//   people trend         5%
//
// The sum is capped at 1.0 and bucketed through ClassificationThresholds.

use super::prediction::{
    AlertLevel, IncidentType, PredictionResult, RecommendedAction, RiskFactors,
};
use super::RiskScorer;
use crate::flow::{HistoryStats, SnapshotHistory};
use crate::types::ClassificationThresholds;

const TRIGGER_WEIGHT: f64 = 0.20;
const DENSITY_WEIGHT: f64 = 0.15;
const FLOW_WEIGHT: f64 = 0.10;
const CONGESTION_WEIGHT: f64 = 0.10;
const TREND_WEIGHT: f64 = 0.05;

/// Snapshot count at which confidence reaches 1.0.
const CONFIDENCE_RAMP: f64 = 20.0;

#[derive(Debug, Clone, Default)]
pub struct StableScorer {
    thresholds: ClassificationThresholds,
}

impl StableScorer {
    pub fn new(thresholds: ClassificationThresholds) -> Self {
        Self { thresholds }
    }

    /// Score precomputed whole-history aggregates.
    pub fn score_stats(&self, stats: &HistoryStats) -> PredictionResult {
        if stats.snapshot_count == 0 {
            return empty_history_default(self.thresholds.baseline_seconds);
        }

        let mut factors = RiskFactors::new();
        let mut score: f64 = 0.0;
        let triggers = &stats.triggers;

        // Fire / smoke
        if triggers.fire_detected {
            score += TRIGGER_WEIGHT * 1.0;
            factors.add("fire_detected");
            factors.add("immediate_evacuation_needed");
        } else if triggers.smoke_detected {
            score += TRIGGER_WEIGHT * 0.9;
            factors.add("smoke_detected");
            factors.add("potential_fire");
        }

        // Weapon / violence
        if triggers.weapon_detected {
            score += TRIGGER_WEIGHT * 1.0;
            factors.add("weapons_detected");
            factors.add("immediate_security_response");
            for weapon in &triggers.weapon_types {
                factors.add(format!("weapon_{}", weapon));
            }
        } else if triggers.violence_detected {
            score += TRIGGER_WEIGHT * 0.9;
            factors.add("violence_detected");
            factors.add("crowd_agitation");
        }

        // Evacuation / suspicious behaviour
        if triggers.emergency_evacuation {
            score += TRIGGER_WEIGHT * 0.95;
            factors.add("emergency_evacuation");
            factors.add("mass_panic_risk");
        } else if triggers.suspicious_behavior {
            score += TRIGGER_WEIGHT * 0.7;
            factors.add("suspicious_behavior");
        }

        if stats.avg_people > 150.0 {
            score += DENSITY_WEIGHT * 0.9;
            factors.add("critical_density");
        } else if stats.avg_people > 100.0 {
            score += DENSITY_WEIGHT * 0.7;
            factors.add("high_density");
        } else if stats.avg_people > 50.0 {
            score += DENSITY_WEIGHT * 0.4;
            factors.add("moderate_density");
        }

        let imbalance = stats.net_flow.unsigned_abs();
        if imbalance > 50 {
            score += FLOW_WEIGHT * 0.8;
            factors.add("severe_flow_imbalance");
        } else if imbalance > 20 {
            score += FLOW_WEIGHT * 0.5;
            factors.add("flow_imbalance");
        }

        if stats.total_congestion_points > 10 {
            score += CONGESTION_WEIGHT * 0.9;
            factors.add("multiple_congestion_points");
        } else if stats.total_congestion_points > 5 {
            score += CONGESTION_WEIGHT * 0.6;
            factors.add("moderate_congestion");
        }

        if stats.people_trend > 0.5 {
            score += TREND_WEIGHT * 0.8;
            factors.add("rapid_crowd_growth");
        } else if stats.people_trend > 0.2 {
            score += TREND_WEIGHT * 0.4;
            factors.add("crowd_growth");
        }

        let score = score.min(1.0);
        let confidence =
            (0.7 + (stats.snapshot_count as f64 / CONFIDENCE_RAMP) * 0.3).min(1.0);

        PredictionResult {
            incident_probability: score,
            prediction_confidence: confidence,
            predicted_incident_type: self.thresholds.incident_type(score),
            time_to_incident_seconds: self.thresholds.time_to_incident(score),
            risk_factors: factors.into_vec(),
            recommended_action: self.thresholds.action(score),
            alert_level: self.thresholds.alert_level(score),
        }
    }
}

impl RiskScorer for StableScorer {
    fn name(&self) -> &'static str {
        "stable"
    }

    fn score(&self, history: &SnapshotHistory) -> PredictionResult {
        self.score_stats(&history.stats())
    }
}

/// Returned before any snapshot has been observed.
fn empty_history_default(baseline_seconds: u32) -> PredictionResult {
    PredictionResult {
        incident_probability: 0.1,
        prediction_confidence: 0.5,
        predicted_incident_type: IncidentType::None,
        time_to_incident_seconds: baseline_seconds,
        risk_factors: Vec::new(),
        recommended_action: RecommendedAction::NoAction,
        alert_level: AlertLevel::Green,
    }
}
