// src/lib.rs
//
// Crowd flow-metrics aggregation and hybrid incident-risk scoring.
//
//   perception records ─► flow::TrackAggregator ─► FlowSnapshot
//                                                     │
//                     flow::SnapshotHistory ◄─────────┘
//                        │            │
//        scoring::RollingScorer   arbiter::HybridArbiter
//        (per timestamp)            ├─ threat::detect_immediate_threats
//                                   ├─ scoring::StableScorer
//                                   └─ forecast::ForecastContext (optional)

pub mod arbiter;
pub mod config;
pub mod flow;
pub mod forecast;
pub mod pipeline;
pub mod scoring;
pub mod threat;
pub mod types;

pub use arbiter::{ArbiterState, Arbitration, ForecastOutcome, HybridArbiter, PredictionSource};
pub use flow::{FlowSnapshot, FrameInput, SnapshotHistory, TrackAggregator};
pub use scoring::{PredictionResult, RiskScorer, RollingScorer, StableScorer};
pub use threat::{detect_immediate_threats, ThreatReport};
pub use types::Config;
