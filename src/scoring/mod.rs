// src/scoring/mod.rs
//
// Rule-based risk scoring over a camera's snapshot history.
//
// Two strategies share one interface and the same threshold tables:
//   StableScorer  - whole history, authoritative input to the arbiter
//   RollingScorer - last few seconds, per-timestamp monitoring

pub mod classify;
pub mod prediction;
pub mod rolling;
pub mod stable;

use crate::flow::SnapshotHistory;

pub use prediction::{AlertLevel, IncidentType, PredictionResult, RecommendedAction, RiskFactors};
pub use rolling::RollingScorer;
pub use stable::StableScorer;

/// A pure function from snapshot history to a risk assessment.
pub trait RiskScorer: Send + Sync {
    fn name(&self) -> &'static str;
    fn score(&self, history: &SnapshotHistory) -> PredictionResult;
}
