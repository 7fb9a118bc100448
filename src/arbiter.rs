// src/arbiter.rs
//
// Hybrid arbiter: picks between the stable rule-based score and an optional
// external forecast.
//
//   IMMEDIATE  any fire/smoke/weapon/violence/evacuation in the history
//              → rule-based result, confidence forced, forecaster untouched
//   NORMAL     rule-based result unless a forecast is available, clears
//              `min_confidence`, and beats the rule-based confidence
//              (ties keep rule-based)
//
// Forecast errors are logged and treated as "unavailable"; arbitration
// always returns a PredictionResult.

use crate::flow::SnapshotHistory;
use crate::forecast::{ForecastContext, ModelStatus};
use crate::scoring::{PredictionResult, RiskScorer, StableScorer};
use crate::threat::{detect_immediate_threats, ThreatReport};
use crate::types::{ClassificationThresholds, ForecastConfig};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArbiterState {
    Immediate,
    Normal,
}

impl ArbiterState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Normal => "normal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionSource {
    RuleBased,
    Forecast,
}

impl PredictionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RuleBased => "rule_based",
            Self::Forecast => "forecast",
        }
    }
}

/// What happened on the forecasting side of one arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastOutcome {
    /// Immediate threat or no forecasting context configured.
    Skipped,
    InsufficientHistory,
    TrainingStarted,
    TrainingPending,
    Failed,
    LowConfidence,
    RuleBasedKept,
    Selected,
}

#[derive(Debug, Clone, Serialize)]
pub struct Arbitration {
    pub state: ArbiterState,
    pub source: PredictionSource,
    pub forecast_outcome: ForecastOutcome,
    pub threats: ThreatReport,
    pub prediction: PredictionResult,
}

pub struct HybridArbiter {
    scorer: StableScorer,
    config: ForecastConfig,
    forecast: Option<Arc<ForecastContext>>,
}

impl HybridArbiter {
    pub fn new(
        thresholds: ClassificationThresholds,
        config: ForecastConfig,
        forecast: Option<Arc<ForecastContext>>,
    ) -> Self {
        Self {
            scorer: StableScorer::new(thresholds),
            config,
            forecast,
        }
    }

    pub fn has_forecaster(&self) -> bool {
        self.forecast.is_some()
    }

    pub async fn arbitrate(
        &self,
        camera_id: &str,
        started_at: DateTime<Utc>,
        history: &SnapshotHistory,
    ) -> Arbitration {
        let rule_based = self.scorer.score(history);
        let threats = detect_immediate_threats(history.snapshots());

        if threats.has_immediate_threat {
            info!(
                "🚨 [{}] Immediate threat {:?}, rule-based result at fixed confidence",
                camera_id, threats.threat_types
            );
            let prediction = rule_based.with_confidence(self.config.immediate_threat_confidence);
            return Arbitration {
                state: ArbiterState::Immediate,
                source: PredictionSource::RuleBased,
                forecast_outcome: ForecastOutcome::Skipped,
                threats,
                prediction,
            };
        }

        let (source, forecast_outcome, prediction) = match &self.forecast {
            None => (PredictionSource::RuleBased, ForecastOutcome::Skipped, rule_based),
            Some(ctx) => self.consult(ctx, camera_id, started_at, history, rule_based).await,
        };

        debug!(
            "🔮 [{}] source={} outcome={:?} p={:.3} conf={:.2}",
            camera_id,
            source.as_str(),
            forecast_outcome,
            prediction.incident_probability,
            prediction.prediction_confidence
        );

        Arbitration {
            state: ArbiterState::Normal,
            source,
            forecast_outcome,
            threats,
            prediction,
        }
    }

    async fn consult(
        &self,
        ctx: &ForecastContext,
        camera_id: &str,
        started_at: DateTime<Utc>,
        history: &SnapshotHistory,
        rule_based: PredictionResult,
    ) -> (PredictionSource, ForecastOutcome, PredictionResult) {
        let snapshots = history.snapshots();
        let model = match ctx.resolve_model(camera_id, started_at, snapshots).await {
            ModelStatus::Ready(model) => model,
            ModelStatus::InsufficientHistory { have, need } => {
                debug!("[{}] {}/{} snapshots, rule-based only", camera_id, have, need);
                return (
                    PredictionSource::RuleBased,
                    ForecastOutcome::InsufficientHistory,
                    rule_based,
                );
            }
            ModelStatus::TrainingStarted => {
                return (
                    PredictionSource::RuleBased,
                    ForecastOutcome::TrainingStarted,
                    rule_based,
                );
            }
            ModelStatus::TrainingPending => {
                return (
                    PredictionSource::RuleBased,
                    ForecastOutcome::TrainingPending,
                    rule_based,
                );
            }
        };

        let forecast = match ctx.forecast(&model, camera_id, started_at, snapshots).await {
            Ok(forecast) => forecast,
            Err(e) => {
                warn!("⚠️  [{}] Forecast unavailable: {:#}", camera_id, e);
                return (PredictionSource::RuleBased, ForecastOutcome::Failed, rule_based);
            }
        };

        if forecast.prediction_confidence <= self.config.min_confidence {
            return (
                PredictionSource::RuleBased,
                ForecastOutcome::LowConfidence,
                rule_based,
            );
        }

        if forecast.prediction_confidence > rule_based.prediction_confidence {
            info!(
                "🤖 [{}] Forecast selected ({:.2} > {:.2})",
                camera_id, forecast.prediction_confidence, rule_based.prediction_confidence
            );
            (PredictionSource::Forecast, ForecastOutcome::Selected, forecast)
        } else {
            (
                PredictionSource::RuleBased,
                ForecastOutcome::RuleBasedKept,
                rule_based,
            )
        }
    }
}
