// src/flow/snapshot.rs
//
// One derived flow record per timestamp. Safety triggers arrive from the
// perception service and are carried through untouched.

use crate::types::DensityThresholds;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl DensityLevel {
    pub fn from_count(total_people: u32, thresholds: &DensityThresholds) -> Self {
        if total_people < thresholds.medium {
            Self::Low
        } else if total_people < thresholds.high {
            Self::Medium
        } else if total_people < thresholds.critical {
            Self::High
        } else {
            Self::Critical
        }
    }

    /// 1-4 encoding used by the forecasting collaborator
    pub fn numeric(&self) -> u8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

/// Safety-trigger labels for one timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerFlags {
    pub fire_detected: bool,
    pub smoke_detected: bool,
    pub violence_detected: bool,
    pub weapon_detected: bool,
    pub weapon_types: BTreeSet<String>,
    pub suspicious_behavior: bool,
    pub emergency_evacuation: bool,
}

impl TriggerFlags {
    /// Any of the flags that short-circuit arbitration.
    pub fn has_immediate_threat(&self) -> bool {
        self.fire_detected
            || self.smoke_detected
            || self.weapon_detected
            || self.violence_detected
            || self.emergency_evacuation
    }

    /// Fold another record's triggers into this one (boolean OR, set union).
    pub fn absorb(&mut self, other: &TriggerFlags) {
        self.fire_detected |= other.fire_detected;
        self.smoke_detected |= other.smoke_detected;
        self.violence_detected |= other.violence_detected;
        self.weapon_detected |= other.weapon_detected;
        self.suspicious_behavior |= other.suspicious_behavior;
        self.emergency_evacuation |= other.emergency_evacuation;
        self.weapon_types.extend(other.weapon_types.iter().cloned());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowSnapshot {
    pub timestamp: i64,
    pub inflow_count: u32,
    pub outflow_count: u32,
    pub net_flow: i64,
    pub total_people: u32,
    pub density_level: DensityLevel,
    pub average_velocity: f64,
    pub movement_vectors: Vec<(f64, f64)>,
    pub congestion_points: Vec<(f64, f64)>,
    #[serde(flatten)]
    pub triggers: TriggerFlags,
}

impl FlowSnapshot {
    /// All counts zero, all flags false.
    pub fn empty(timestamp: i64) -> Self {
        Self {
            timestamp,
            inflow_count: 0,
            outflow_count: 0,
            net_flow: 0,
            total_people: 0,
            density_level: DensityLevel::Low,
            average_velocity: 0.0,
            movement_vectors: Vec::new(),
            congestion_points: Vec::new(),
            triggers: TriggerFlags::default(),
        }
    }

    pub fn congestion_count(&self) -> usize {
        self.congestion_points.len()
    }
}
