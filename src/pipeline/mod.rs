// src/pipeline/mod.rs

pub mod metrics;
pub mod report;
pub mod runner;
pub mod session;

pub use metrics::{MetricsSummary, PipelineMetrics};
pub use report::{CameraReport, FlowStatistics, HighRiskPeriod};
pub use runner::{build_arbiter, find_camera_feeds, process_camera, run, CameraOutcome, FleetSummary};
pub use session::{CameraSession, TimestampRecord};
