// src/forecast/dataset.rs
//
// Shapes snapshots into forecasting rows and turns a forecast risk series
// back into a PredictionResult.

use crate::flow::{DensityLevel, FlowSnapshot};
use crate::scoring::{PredictionResult, RiskFactors};
use crate::types::ClassificationThresholds;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::debug;

/// Confidence reported for any series-derived forecast.
const SERIES_CONFIDENCE: f64 = 0.9;

/// One request instance sent to the forecasting model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub timestamp: String,
    pub cctv_id: String,
    pub people_count: f64,
    pub density_numeric: f64,
    pub average_velocity: f64,
    pub net_flow: f64,
    pub congestion_points: f64,
}

/// A training row: the request features plus flow counts and the target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingRow {
    #[serde(flatten)]
    pub features: ForecastRow,
    pub inflow_count: u32,
    pub outflow_count: u32,
    pub incident_risk_score: f64,
}

/// Per-snapshot composite risk used as the training target.
pub fn incident_risk_score(snapshot: &FlowSnapshot) -> f64 {
    let mut score = match snapshot.density_level {
        DensityLevel::Low => 0.1,
        DensityLevel::Medium => 0.2,
        DensityLevel::High => 0.3,
        DensityLevel::Critical => 0.4,
    };

    score += if snapshot.average_velocity > 0.2 {
        0.3
    } else if snapshot.average_velocity > 0.1 {
        0.2
    } else {
        0.1
    };

    let imbalance = snapshot.net_flow.unsigned_abs();
    if imbalance > 10 {
        score += 0.2;
    } else if imbalance > 5 {
        score += 0.1;
    }

    score += (snapshot.congestion_count() as f64 * 0.02).min(0.1);
    score.min(1.0)
}

/// None when the snapshot offset does not land on a representable instant.
fn feature_row(
    camera_id: &str,
    started_at: DateTime<Utc>,
    snapshot: &FlowSnapshot,
) -> Option<ForecastRow> {
    let at = Duration::try_seconds(snapshot.timestamp)
        .and_then(|offset| started_at.checked_add_signed(offset));
    let Some(at) = at else {
        debug!(
            "Snapshot t={}s is outside the representable time range, row skipped",
            snapshot.timestamp
        );
        return None;
    };
    Some(ForecastRow {
        timestamp: at.to_rfc3339(),
        cctv_id: camera_id.to_string(),
        people_count: snapshot.total_people as f64,
        density_numeric: snapshot.density_level.numeric() as f64,
        average_velocity: snapshot.average_velocity,
        net_flow: snapshot.net_flow as f64,
        congestion_points: snapshot.congestion_count() as f64,
    })
}

/// Request rows for the trailing `window` snapshots. Snapshots whose time
/// cannot be represented are left out.
pub fn forecast_rows(
    camera_id: &str,
    started_at: DateTime<Utc>,
    snapshots: &[FlowSnapshot],
    window: usize,
) -> Vec<ForecastRow> {
    let start = snapshots.len().saturating_sub(window);
    snapshots[start..]
        .iter()
        .filter_map(|s| feature_row(camera_id, started_at, s))
        .collect()
}

pub fn training_rows(
    camera_id: &str,
    started_at: DateTime<Utc>,
    snapshots: &[FlowSnapshot],
) -> Vec<TrainingRow> {
    snapshots
        .iter()
        .filter_map(|s| {
            Some(TrainingRow {
                features: feature_row(camera_id, started_at, s)?,
                inflow_count: s.inflow_count,
                outflow_count: s.outflow_count,
                incident_risk_score: incident_risk_score(s),
            })
        })
        .collect()
}

/// Convert a forecast risk series (one value per second) into an assessment.
///
/// Probability is the peak value and time to incident is the 1-based index of
/// the first peak. Risk factors come from the series mean. Returns None when
/// the series has no finite values.
pub fn prediction_from_series(
    values: &[f64],
    thresholds: &ClassificationThresholds,
) -> Option<PredictionResult> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }

    let (peak_idx, peak) = finite
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::MIN), |best, (i, v)| if v > best.1 { (i, v) } else { best });
    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    let probability = peak.clamp(0.0, 1.0);

    let mut factors = RiskFactors::new();
    if mean > 0.7 {
        factors.add("critical_density");
        factors.add("rapid_movement");
        factors.add("multiple_congestion_points");
    } else if mean > 0.5 {
        factors.add("high_density");
        factors.add("flow_imbalance");
    } else if mean > 0.3 {
        factors.add("moderate_congestion");
    }

    Some(PredictionResult {
        incident_probability: probability,
        prediction_confidence: SERIES_CONFIDENCE,
        predicted_incident_type: thresholds.incident_type(probability),
        time_to_incident_seconds: (peak_idx + 1) as u32,
        risk_factors: factors.into_vec(),
        recommended_action: thresholds.action(probability),
        alert_level: thresholds.alert_level(probability),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{AlertLevel, IncidentType};
    use chrono::TimeZone;

    fn snapshot(timestamp: i64) -> FlowSnapshot {
        FlowSnapshot::empty(timestamp)
    }

    #[test]
    fn test_risk_score_components() {
        let quiet = snapshot(0);
        assert!((incident_risk_score(&quiet) - 0.2).abs() < 1e-12);

        let mut busy = snapshot(1);
        busy.density_level = DensityLevel::Critical;
        busy.average_velocity = 0.25;
        busy.net_flow = -11;
        busy.congestion_points = vec![(0.15, 0.15); 7];
        // 0.4 + 0.3 + 0.2 + 0.1
        assert!((incident_risk_score(&busy) - 1.0).abs() < 1e-12);

        let mut mid = snapshot(2);
        mid.density_level = DensityLevel::Medium;
        mid.average_velocity = 0.15;
        mid.net_flow = 6;
        mid.congestion_points = vec![(0.15, 0.15), (0.55, 0.55)];
        // 0.2 + 0.2 + 0.1 + 0.04
        assert!((incident_risk_score(&mid) - 0.54).abs() < 1e-12);
    }

    #[test]
    fn test_forecast_rows_use_trailing_window() {
        let started = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut snapshots: Vec<_> = (0..15).map(snapshot).collect();
        snapshots[14].total_people = 42;
        snapshots[14].density_level = DensityLevel::High;

        let rows = forecast_rows("cam-7", started, &snapshots, 10);
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].timestamp, "2025-06-01T12:00:05+00:00");
        let last = rows.last().unwrap();
        assert_eq!(last.cctv_id, "cam-7");
        assert_eq!(last.people_count, 42.0);
        assert_eq!(last.density_numeric, 3.0);
    }

    #[test]
    fn test_unrepresentable_timestamps_skipped() {
        let started = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let snapshots = vec![
            snapshot(1),
            snapshot(10_000_000_000_000),
            snapshot(i64::MAX),
            snapshot(2),
        ];

        let rows = forecast_rows("cam", started, &snapshots, 10);
        let stamps: Vec<_> = rows.iter().map(|r| r.timestamp.as_str()).collect();
        assert_eq!(stamps, vec!["2025-06-01T12:00:01+00:00", "2025-06-01T12:00:02+00:00"]);

        assert_eq!(training_rows("cam", started, &snapshots).len(), 2);
    }

    #[test]
    fn test_training_rows_flatten_features() {
        let started = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut s = snapshot(3);
        s.inflow_count = 4;
        s.outflow_count = 1;
        s.net_flow = 3;
        let rows = training_rows("cam-1", started, &[s]);
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["cctv_id"], "cam-1");
        assert_eq!(json["inflow_count"], 4);
        assert_eq!(json["net_flow"], 3.0);
        assert!(json["incident_risk_score"].as_f64().is_some());
    }

    #[test]
    fn test_series_conversion() {
        let thresholds = ClassificationThresholds::default();
        let result = prediction_from_series(&[0.6, 0.85, 0.85, 0.7], &thresholds).unwrap();
        assert_eq!(result.incident_probability, 0.85);
        assert_eq!(result.prediction_confidence, 0.9);
        assert_eq!(result.time_to_incident_seconds, 2);
        assert_eq!(result.predicted_incident_type, IncidentType::CrowdCrush);
        assert_eq!(result.alert_level, AlertLevel::Red);
        // mean 0.75
        assert_eq!(
            result.risk_factors,
            vec!["critical_density", "rapid_movement", "multiple_congestion_points"]
        );

        let low = prediction_from_series(&[0.1, 0.2], &thresholds).unwrap();
        assert!(low.risk_factors.is_empty());
        assert_eq!(low.predicted_incident_type, IncidentType::None);

        assert!(prediction_from_series(&[], &thresholds).is_none());
        assert!(prediction_from_series(&[f64::NAN], &thresholds).is_none());
    }
}
