// src/flow/observation.rs
//
// Input contract from the perception service: one record per timestamp per
// camera, usually delivered as one JSON object per line.
//
// A record that cannot be trusted is not an error for the caller. It becomes
// FrameInput::Malformed and the aggregator emits an all-zero snapshot for
// that timestamp.

use super::snapshot::TriggerFlags;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Perception track identifiers arrive as integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TrackId {
    Number(u64),
    Text(String),
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonObservation {
    pub track_id: TrackId,
    pub x: f64,
    pub y: f64,
}

impl PersonObservation {
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && (0.0..=1.0).contains(&self.x)
            && (0.0..=1.0).contains(&self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameObservation {
    pub timestamp: i64,
    #[serde(default)]
    pub people: Vec<PersonObservation>,
    #[serde(flatten)]
    pub triggers: TriggerFlags,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameInput {
    Observed(FrameObservation),
    Malformed { timestamp: i64, reason: String },
}

impl FrameInput {
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::Observed(frame) => frame.timestamp,
            Self::Malformed { timestamp, .. } => *timestamp,
        }
    }

    /// Validate an already-decoded record.
    pub fn from_observation(frame: FrameObservation) -> Self {
        if let Some(bad) = frame.people.iter().find(|p| !p.is_valid()) {
            return Self::Malformed {
                timestamp: frame.timestamp,
                reason: format!(
                    "track {} has out-of-frame position ({}, {})",
                    bad.track_id, bad.x, bad.y
                ),
            };
        }
        Self::Observed(frame)
    }

    /// Decode one JSON line. Returns None only when not even a timestamp can
    /// be recovered, since a snapshot cannot be keyed without one.
    pub fn parse_line(line: &str) -> Option<Self> {
        let value: serde_json::Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!("⚠️  Unreadable observation line skipped: {}", e);
                return None;
            }
        };

        let timestamp = match value.get("timestamp").and_then(timestamp_of) {
            Some(ts) => ts,
            None => {
                warn!("⚠️  Observation without a usable timestamp skipped");
                return None;
            }
        };

        match serde_json::from_value::<FrameObservation>(value) {
            Ok(frame) => Some(Self::from_observation(frame)),
            Err(e) => Some(Self::Malformed {
                timestamp,
                reason: e.to_string(),
            }),
        }
    }
}

fn timestamp_of(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
