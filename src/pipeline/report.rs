// src/pipeline/report.rs
//
// Per-camera analysis report written as `<camera>_flow_analysis.json`.

use super::session::{CameraSession, TimestampRecord};
use crate::arbiter::Arbitration;
use crate::scoring::{AlertLevel, IncidentType};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Per-timestamp predictions above this probability are high-risk periods.
const HIGH_RISK_PROBABILITY: f64 = 0.5;
const MAX_HIGH_RISK_PERIODS: usize = 5;
const FORECAST_HORIZON_MINUTES: u32 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct HighRiskPeriod {
    pub timestamp: i64,
    pub incident_probability: f64,
    pub alert_level: AlertLevel,
    pub predicted_incident_type: IncidentType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlowStatistics {
    pub total_inflow: u64,
    pub total_outflow: u64,
    pub net_flow: i64,
    pub average_people_count: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CameraReport {
    pub camera_id: String,
    pub generated_at: String,
    pub total_timestamps: usize,
    pub malformed_frames: u64,
    pub dropped_frames: u64,
    pub analysis_complete: bool,
    pub forecast_horizon_minutes: u32,
    pub future_forecast: Arbitration,
    pub alert_distribution: BTreeMap<&'static str, usize>,
    pub high_risk_periods: Vec<HighRiskPeriod>,
    pub flow_statistics: FlowStatistics,
    pub timeline: Vec<TimestampRecord>,
}

impl CameraReport {
    pub fn build(session: &CameraSession, future_forecast: Arbitration) -> Self {
        let timeline = session.timeline();
        let stats = session.history().stats();

        Self {
            camera_id: session.camera_id().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            total_timestamps: timeline.len(),
            malformed_frames: session.malformed_frames(),
            dropped_frames: session.dropped_frames(),
            analysis_complete: true,
            forecast_horizon_minutes: FORECAST_HORIZON_MINUTES,
            future_forecast,
            alert_distribution: alert_distribution(timeline),
            high_risk_periods: high_risk_periods(timeline),
            flow_statistics: FlowStatistics {
                total_inflow: stats.total_inflow,
                total_outflow: stats.total_outflow,
                net_flow: stats.net_flow,
                average_people_count: stats.avg_people,
            },
            timeline: timeline.to_vec(),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}_flow_analysis.json", self.camera_id)
    }

    pub fn write_to(&self, output_dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("Failed to create {}", output_dir.display()))?;
        let path = output_dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

/// Count of per-timestamp predictions per alert level; every level present.
pub fn alert_distribution(timeline: &[TimestampRecord]) -> BTreeMap<&'static str, usize> {
    let mut counts: BTreeMap<&'static str, usize> =
        AlertLevel::all().iter().map(|l| (l.as_str(), 0)).collect();
    for record in timeline {
        *counts.entry(record.prediction.alert_level.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Highest-probability timestamps above the high-risk cut, at most five.
pub fn high_risk_periods(timeline: &[TimestampRecord]) -> Vec<HighRiskPeriod> {
    let mut periods: Vec<HighRiskPeriod> = timeline
        .iter()
        .filter(|r| r.prediction.incident_probability > HIGH_RISK_PROBABILITY)
        .map(|r| HighRiskPeriod {
            timestamp: r.flow_metrics.timestamp,
            incident_probability: r.prediction.incident_probability,
            alert_level: r.prediction.alert_level,
            predicted_incident_type: r.prediction.predicted_incident_type,
        })
        .collect();
    periods.sort_by(|a, b| {
        b.incident_probability
            .total_cmp(&a.incident_probability)
            .then(a.timestamp.cmp(&b.timestamp))
    });
    periods.truncate(MAX_HIGH_RISK_PERIODS);
    periods
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowSnapshot;
    use crate::scoring::{PredictionResult, RecommendedAction};

    fn record(timestamp: i64, probability: f64, alert_level: AlertLevel) -> TimestampRecord {
        TimestampRecord {
            flow_metrics: FlowSnapshot::empty(timestamp),
            prediction: PredictionResult {
                incident_probability: probability,
                prediction_confidence: 0.7,
                predicted_incident_type: IncidentType::None,
                time_to_incident_seconds: 20,
                risk_factors: Vec::new(),
                recommended_action: RecommendedAction::NoAction,
                alert_level,
            },
        }
    }

    #[test]
    fn test_alert_distribution_includes_all_levels() {
        let timeline = vec![
            record(0, 0.1, AlertLevel::Green),
            record(1, 0.1, AlertLevel::Green),
            record(2, 0.9, AlertLevel::Red),
        ];
        let counts = alert_distribution(&timeline);
        assert_eq!(counts["green"], 2);
        assert_eq!(counts["yellow"], 0);
        assert_eq!(counts["orange"], 0);
        assert_eq!(counts["red"], 1);
    }

    #[test]
    fn test_high_risk_periods_top_five() {
        let timeline: Vec<_> = [0.2, 0.55, 0.9, 0.6, 0.51, 0.75, 0.9, 0.5, 0.65]
            .iter()
            .enumerate()
            .map(|(t, p)| record(t as i64, *p, AlertLevel::Orange))
            .collect();
        let periods = high_risk_periods(&timeline);
        let picked: Vec<(i64, f64)> = periods
            .iter()
            .map(|p| (p.timestamp, p.incident_probability))
            .collect();
        assert_eq!(
            picked,
            vec![(2, 0.9), (6, 0.9), (5, 0.75), (8, 0.65), (3, 0.6)]
        );
    }
}
