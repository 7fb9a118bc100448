// src/flow/history.rs
//
// Append-only snapshot sequence for one camera, plus running totals so the
// full-history scorer does not rescan every snapshot on every call.
//
// The least-squares trend of a series y against its index i only needs
// Σi, Σi², Σy and Σi·y, all of which extend exactly on append.

use super::snapshot::{FlowSnapshot, TriggerFlags};
use anyhow::{bail, Result};

/// Running sums for an OLS slope of a series against its index.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrendAccumulator {
    n: f64,
    sum_x: f64,
    sum_x2: f64,
    sum_y: f64,
    sum_xy: f64,
}

impl TrendAccumulator {
    pub fn push(&mut self, y: f64) {
        let x = self.n;
        self.n += 1.0;
        self.sum_x += x;
        self.sum_x2 += x * x;
        self.sum_y += y;
        self.sum_xy += x * y;
    }

    pub fn slope(&self) -> f64 {
        if self.n < 2.0 {
            return 0.0;
        }
        let denom = self.n * self.sum_x2 - self.sum_x * self.sum_x;
        if denom == 0.0 {
            return 0.0;
        }
        (self.n * self.sum_xy - self.sum_x * self.sum_y) / denom
    }
}

/// OLS slope of `values` against their index; 0 for fewer than two values.
pub fn trend_slope(values: &[f64]) -> f64 {
    let mut acc = TrendAccumulator::default();
    for &v in values {
        acc.push(v);
    }
    acc.slope()
}

/// Whole-history aggregates consumed by the stable scorer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryStats {
    pub snapshot_count: usize,
    pub avg_people: f64,
    pub total_inflow: u64,
    pub total_outflow: u64,
    pub net_flow: i64,
    pub avg_velocity: f64,
    pub total_congestion_points: usize,
    pub people_trend: f64,
    pub velocity_trend: f64,
    pub triggers: TriggerFlags,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotHistory {
    snapshots: Vec<FlowSnapshot>,
    sum_people: u64,
    sum_inflow: u64,
    sum_outflow: u64,
    sum_velocity: f64,
    sum_congestion: usize,
    people_trend: TrendAccumulator,
    velocity_trend: TrendAccumulator,
    triggers: TriggerFlags,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot. Timestamps must strictly increase.
    pub fn push(&mut self, snapshot: FlowSnapshot) -> Result<()> {
        if let Some(last) = self.snapshots.last() {
            if snapshot.timestamp <= last.timestamp {
                bail!(
                    "snapshot t={} is not after last t={}",
                    snapshot.timestamp,
                    last.timestamp
                );
            }
        }

        self.sum_people += snapshot.total_people as u64;
        self.sum_inflow += snapshot.inflow_count as u64;
        self.sum_outflow += snapshot.outflow_count as u64;
        self.sum_velocity += snapshot.average_velocity;
        self.sum_congestion += snapshot.congestion_points.len();
        self.people_trend.push(snapshot.total_people as f64);
        self.velocity_trend.push(snapshot.average_velocity);
        self.triggers.absorb(&snapshot.triggers);

        self.snapshots.push(snapshot);
        Ok(())
    }

    pub fn from_snapshots(snapshots: impl IntoIterator<Item = FlowSnapshot>) -> Result<Self> {
        let mut history = Self::new();
        for snapshot in snapshots {
            history.push(snapshot)?;
        }
        Ok(history)
    }

    pub fn stats(&self) -> HistoryStats {
        let n = self.snapshots.len();
        let (avg_people, avg_velocity) = if n == 0 {
            (0.0, 0.0)
        } else {
            (
                self.sum_people as f64 / n as f64,
                self.sum_velocity / n as f64,
            )
        };

        HistoryStats {
            snapshot_count: n,
            avg_people,
            total_inflow: self.sum_inflow,
            total_outflow: self.sum_outflow,
            net_flow: self.sum_inflow as i64 - self.sum_outflow as i64,
            avg_velocity,
            total_congestion_points: self.sum_congestion,
            people_trend: self.people_trend.slope(),
            velocity_trend: self.velocity_trend.slope(),
            triggers: self.triggers.clone(),
        }
    }

    pub fn snapshots(&self) -> &[FlowSnapshot] {
        &self.snapshots
    }

    /// The trailing `n` snapshots (fewer if the history is shorter).
    pub fn tail(&self, n: usize) -> &[FlowSnapshot] {
        let start = self.snapshots.len().saturating_sub(n);
        &self.snapshots[start..]
    }

    pub fn last(&self) -> Option<&FlowSnapshot> {
        self.snapshots.last()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
