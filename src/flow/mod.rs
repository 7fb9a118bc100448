// src/flow/mod.rs
//
// Flow stage: perception records → per-timestamp FlowSnapshot → per-camera
// SnapshotHistory.

pub mod aggregator;
pub mod history;
pub mod observation;
pub mod snapshot;
pub mod track_history;

pub use aggregator::{axis_crossing, congestion_points, AxisCrossing, TrackAggregator};
pub use history::{trend_slope, HistoryStats, SnapshotHistory};
pub use observation::{FrameInput, FrameObservation, PersonObservation, TrackId};
pub use snapshot::{DensityLevel, FlowSnapshot, TriggerFlags};
pub use track_history::{TrackHistory, TrackPoint};
