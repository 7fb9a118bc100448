// src/flow/aggregator.rs
//
// Track Aggregator: turns one timestamp's person positions into a FlowSnapshot.
//
// Per call:
//   1. Record each position in the TrackHistory, giving a displacement for
//      every track seen at the previous step too
//   2. Edge-band crossings per axis → inflow / outflow
//   3. Density bucket from head count
//   4. Mean displacement magnitude → average velocity
//   5. Fixed grid occupancy → congestion points
//
// Trigger flags are copied from the perception record as-is.

use super::observation::{FrameInput, FrameObservation};
use super::snapshot::{DensityLevel, FlowSnapshot};
use super::track_history::{TrackHistory, TrackPoint};
use crate::types::FlowConfig;
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisCrossing {
    None,
    Inflow,
    Outflow,
}

/// Classify one axis of a step against the low and high edge bands.
///
/// Leaving a band towards the interior is inflow, entering one from the
/// interior is outflow. The first matching rule wins.
pub fn axis_crossing(prev: f64, curr: f64, band: f64) -> AxisCrossing {
    let high = 1.0 - band;
    if prev < band && curr > band {
        AxisCrossing::Inflow
    } else if prev > high && curr < high {
        AxisCrossing::Inflow
    } else if prev > band && curr < band {
        AxisCrossing::Outflow
    } else if prev < high && curr > high {
        AxisCrossing::Outflow
    } else {
        AxisCrossing::None
    }
}

/// Centers of grid cells holding at least `min_people` positions, in cell order.
/// When `cell_size` does not divide 1 the last cell is partial and its
/// center is capped at the frame edge.
pub fn congestion_points(
    positions: &[(f64, f64)],
    cell_size: f64,
    min_people: usize,
) -> Vec<(f64, f64)> {
    if positions.len() < min_people {
        return Vec::new();
    }

    let last_cell = ((1.0 / cell_size).ceil() as i64 - 1).max(0);
    let cell_of = |v: f64| ((v / cell_size) as i64).clamp(0, last_cell);

    let mut occupancy: BTreeMap<(i64, i64), usize> = BTreeMap::new();
    for &(x, y) in positions {
        *occupancy.entry((cell_of(x), cell_of(y))).or_default() += 1;
    }

    occupancy
        .into_iter()
        .filter(|(_, count)| *count >= min_people)
        .map(|((gx, gy), _)| {
            (
                ((gx as f64 + 0.5) * cell_size).min(1.0),
                ((gy as f64 + 0.5) * cell_size).min(1.0),
            )
        })
        .collect()
}

pub struct TrackAggregator {
    config: FlowConfig,
    history: TrackHistory,
    frames_seen: u64,
    malformed_frames: u64,
}

impl TrackAggregator {
    pub fn new(config: FlowConfig) -> Self {
        Self {
            config,
            history: TrackHistory::new(),
            frames_seen: 0,
            malformed_frames: 0,
        }
    }

    pub fn aggregate(&mut self, input: &FrameInput) -> FlowSnapshot {
        self.frames_seen += 1;
        match input {
            FrameInput::Observed(frame) => self.aggregate_frame(frame),
            FrameInput::Malformed { timestamp, reason } => {
                self.malformed_frames += 1;
                warn!(
                    "⚠️  Malformed frame at t={}s, emitting empty snapshot: {}",
                    timestamp, reason
                );
                FlowSnapshot::empty(*timestamp)
            }
        }
    }

    fn aggregate_frame(&mut self, frame: &FrameObservation) -> FlowSnapshot {
        let ts = frame.timestamp;
        let band = self.config.boundary_band;

        let mut inflow = 0u32;
        let mut outflow = 0u32;
        let mut movement_vectors = Vec::new();

        for person in &frame.people {
            // A track reported twice in one frame only moves once
            let seen_now = self
                .history
                .get(&person.track_id)
                .and_then(|e| e.latest())
                .map_or(false, |p| p.timestamp == ts);
            if seen_now {
                continue;
            }

            let point = TrackPoint {
                x: person.x,
                y: person.y,
                timestamp: ts,
            };
            let Some((prev, curr)) = self.history.record(&person.track_id, point) else {
                continue;
            };

            movement_vectors.push((curr.x - prev.x, curr.y - prev.y));

            for crossing in [
                axis_crossing(prev.x, curr.x, band),
                axis_crossing(prev.y, curr.y, band),
            ] {
                match crossing {
                    AxisCrossing::Inflow => inflow += 1,
                    AxisCrossing::Outflow => outflow += 1,
                    AxisCrossing::None => continue,
                }
                debug!(
                    "t={}s track {} {:?}: ({:.3},{:.3}) → ({:.3},{:.3})",
                    ts, person.track_id, crossing, prev.x, prev.y, curr.x, curr.y
                );
            }
        }

        let average_velocity = if movement_vectors.is_empty() {
            0.0
        } else {
            movement_vectors
                .iter()
                .map(|(dx, dy)| (dx * dx + dy * dy).sqrt())
                .sum::<f64>()
                / movement_vectors.len() as f64
        };

        let positions: Vec<(f64, f64)> = frame.people.iter().map(|p| (p.x, p.y)).collect();
        let total_people = frame.people.len() as u32;

        let evicted = self
            .history
            .evict_idle(ts, self.config.max_track_idle_seconds);
        if evicted > 0 {
            debug!("t={}s dropped {} idle track(s)", ts, evicted);
        }

        FlowSnapshot {
            timestamp: ts,
            inflow_count: inflow,
            outflow_count: outflow,
            net_flow: inflow as i64 - outflow as i64,
            total_people,
            density_level: DensityLevel::from_count(total_people, &self.config.density),
            average_velocity,
            movement_vectors,
            congestion_points: congestion_points(
                &positions,
                self.config.grid_cell_size,
                self.config.congestion_min_people,
            ),
            triggers: frame.triggers.clone(),
        }
    }

    pub fn active_tracks(&self) -> usize {
        self.history.len()
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    pub fn malformed_frames(&self) -> u64 {
        self.malformed_frames
    }

    pub fn reset(&mut self) {
        self.history.reset();
        self.frames_seen = 0;
        self.malformed_frames = 0;
    }
}
