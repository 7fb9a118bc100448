// src/scoring/classify.rs
//
// Score → bucket tables shared by every scorer and by forecast conversion.
// Thresholds are evaluated highest first with strict `>`.

use super::prediction::{AlertLevel, IncidentType, RecommendedAction};
use crate::types::ClassificationThresholds;

impl ClassificationThresholds {
    pub fn incident_type(&self, score: f64) -> IncidentType {
        if score > self.crowd_crush {
            IncidentType::CrowdCrush
        } else if score > self.panic {
            IncidentType::Panic
        } else if score > self.crowd_surge {
            IncidentType::CrowdSurge
        } else if score > self.congestion {
            IncidentType::Congestion
        } else {
            IncidentType::None
        }
    }

    pub fn action(&self, score: f64) -> RecommendedAction {
        if score > self.immediate_evacuation {
            RecommendedAction::ImmediateEvacuation
        } else if score > self.crowd_control {
            RecommendedAction::CrowdControl
        } else if score > self.security_dispatch {
            RecommendedAction::SecurityDispatch
        } else if score > self.monitor_closely {
            RecommendedAction::MonitorClosely
        } else {
            RecommendedAction::NoAction
        }
    }

    pub fn alert_level(&self, score: f64) -> AlertLevel {
        if score > self.red {
            AlertLevel::Red
        } else if score > self.orange {
            AlertLevel::Orange
        } else if score > self.yellow {
            AlertLevel::Yellow
        } else {
            AlertLevel::Green
        }
    }

    pub fn time_to_incident(&self, score: f64) -> u32 {
        if score > self.imminent_above {
            self.imminent_seconds
        } else if score > self.elevated_above {
            self.elevated_seconds
        } else {
            self.baseline_seconds
        }
    }
}
