// src/scoring/prediction.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentType {
    None,
    Congestion,
    CrowdSurge,
    Panic,
    CrowdCrush,
}

impl IncidentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Congestion => "congestion",
            Self::CrowdSurge => "crowd_surge",
            Self::Panic => "panic",
            Self::CrowdCrush => "crowd_crush",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    NoAction,
    MonitorClosely,
    SecurityDispatch,
    CrowdControl,
    ImmediateEvacuation,
}

impl RecommendedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoAction => "no_action",
            Self::MonitorClosely => "monitor_closely",
            Self::SecurityDispatch => "security_dispatch",
            Self::CrowdControl => "crowd_control",
            Self::ImmediateEvacuation => "immediate_evacuation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Green,
    Yellow,
    Orange,
    Red,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
            Self::Red => "red",
        }
    }

    pub fn all() -> [AlertLevel; 4] {
        [Self::Green, Self::Yellow, Self::Orange, Self::Red]
    }
}

/// The authoritative risk assessment handed to alerting and dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub incident_probability: f64,
    pub prediction_confidence: f64,
    pub predicted_incident_type: IncidentType,
    pub time_to_incident_seconds: u32,
    pub risk_factors: Vec<String>,
    pub recommended_action: RecommendedAction,
    pub alert_level: AlertLevel,
}

impl PredictionResult {
    /// Copy with a different confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.prediction_confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn has_factor(&self, tag: &str) -> bool {
        self.risk_factors.iter().any(|f| f == tag)
    }
}

/// Ordered, duplicate-free list of risk factor tags.
#[derive(Debug, Clone, Default)]
pub struct RiskFactors(Vec<String>);

impl RiskFactors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.0.contains(&tag) {
            self.0.push(tag);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t == tag)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enums_serialize_as_contract_strings() {
        assert_eq!(
            serde_json::to_value(IncidentType::CrowdCrush).unwrap(),
            serde_json::json!("crowd_crush")
        );
        assert_eq!(
            serde_json::to_value(RecommendedAction::NoAction).unwrap(),
            serde_json::json!("no_action")
        );
        assert_eq!(
            serde_json::to_value(AlertLevel::Orange).unwrap(),
            serde_json::json!("orange")
        );
        let parsed: IncidentType = serde_json::from_str("\"crowd_surge\"").unwrap();
        assert_eq!(parsed, IncidentType::CrowdSurge);
        assert_eq!(parsed.as_str(), "crowd_surge");
    }

    #[test]
    fn test_risk_factors_dedupe_in_order() {
        let mut factors = RiskFactors::new();
        factors.add("fire_detected");
        factors.add("critical_density");
        factors.add("fire_detected");
        assert_eq!(factors.len(), 2);
        assert_eq!(factors.into_vec(), vec!["fire_detected", "critical_density"]);
    }

    #[test]
    fn test_with_confidence_clamps() {
        let result = PredictionResult {
            incident_probability: 0.2,
            prediction_confidence: 0.7,
            predicted_incident_type: IncidentType::None,
            time_to_incident_seconds: 600,
            risk_factors: vec![],
            recommended_action: RecommendedAction::NoAction,
            alert_level: AlertLevel::Green,
        };
        assert_eq!(result.clone().with_confidence(1.4).prediction_confidence, 1.0);
        assert_eq!(result.with_confidence(0.95).prediction_confidence, 0.95);
    }
}
