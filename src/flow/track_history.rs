// src/flow/track_history.rs
//
// Last-known normalized positions per perception track. Only the two most
// recent positions matter: the pair yields this step's displacement and any
// edge-band crossing.

use super::observation::TrackId;
use std::collections::{HashMap, VecDeque};

const POSITIONS_KEPT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub x: f64,
    pub y: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct TrackEntry {
    positions: VecDeque<TrackPoint>,
}

impl TrackEntry {
    fn new() -> Self {
        Self {
            positions: VecDeque::with_capacity(POSITIONS_KEPT),
        }
    }

    fn push(&mut self, point: TrackPoint) {
        self.positions.push_back(point);
        if self.positions.len() > POSITIONS_KEPT {
            self.positions.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&TrackPoint> {
        self.positions.back()
    }

    /// (previous, current) once the track has been seen twice.
    pub fn last_step(&self) -> Option<(TrackPoint, TrackPoint)> {
        if self.positions.len() < 2 {
            return None;
        }
        let n = self.positions.len();
        Some((self.positions[n - 2], self.positions[n - 1]))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrackHistory {
    tracks: HashMap<TrackId, TrackEntry>,
}

impl TrackHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a position and return the step it completes, if any.
    pub fn record(&mut self, track_id: &TrackId, point: TrackPoint) -> Option<(TrackPoint, TrackPoint)> {
        let entry = self
            .tracks
            .entry(track_id.clone())
            .or_insert_with(TrackEntry::new);
        entry.push(point);
        entry.last_step()
    }

    pub fn get(&self, track_id: &TrackId) -> Option<&TrackEntry> {
        self.tracks.get(track_id)
    }

    /// Drop tracks whose newest position is older than `max_idle` seconds
    /// relative to `now`. Returns the number removed.
    pub fn evict_idle(&mut self, now: i64, max_idle: i64) -> usize {
        let before = self.tracks.len();
        self.tracks.retain(|_, entry| {
            entry
                .latest()
                .map_or(false, |p| now - p.timestamp <= max_idle)
        });
        before - self.tracks.len()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64, timestamp: i64) -> TrackPoint {
        TrackPoint { x, y, timestamp }
    }

    #[test]
    fn test_first_sighting_has_no_step() {
        let mut history = TrackHistory::new();
        assert!(history.record(&TrackId::Number(1), pt(0.5, 0.5, 0)).is_none());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_keeps_only_two_positions() {
        let mut history = TrackHistory::new();
        let id = TrackId::Number(1);
        history.record(&id, pt(0.1, 0.1, 0));
        history.record(&id, pt(0.2, 0.2, 1));
        let step = history.record(&id, pt(0.3, 0.3, 2)).unwrap();

        assert_eq!(step.0, pt(0.2, 0.2, 1));
        assert_eq!(step.1, pt(0.3, 0.3, 2));
        assert_eq!(history.get(&id).unwrap().len(), 2);
    }

    #[test]
    fn test_evict_idle_tracks() {
        let mut history = TrackHistory::new();
        history.record(&TrackId::Number(1), pt(0.5, 0.5, 0));
        history.record(&TrackId::Number(2), pt(0.5, 0.5, 25));

        let removed = history.evict_idle(40, 30);

        assert_eq!(removed, 1);
        assert!(history.get(&TrackId::Number(1)).is_none());
        assert!(history.get(&TrackId::Number(2)).is_some());
    }
}
