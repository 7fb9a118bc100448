// tests/scenarios.rs
//
// End-to-end scenarios through the public API.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use crowd_risk::flow::{
    DensityLevel, FrameInput, FrameObservation, PersonObservation, TrackId, TriggerFlags,
};
use crowd_risk::forecast::{
    ForecastBackend, ForecastContext, ForecastResponse, ForecastRow, ModelHandle, ModelState,
    TrainingRequest,
};
use crowd_risk::scoring::{AlertLevel, IncidentType, RecommendedAction};
use crowd_risk::types::{ClassificationThresholds, DensityThresholds, FlowConfig, ForecastConfig};
use crowd_risk::{
    ArbiterState, FlowSnapshot, HybridArbiter, RiskScorer, SnapshotHistory, StableScorer,
    TrackAggregator,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct CountingBackend {
    calls: AtomicUsize,
}

#[async_trait]
impl ForecastBackend for CountingBackend {
    async fn list_models(&self) -> Result<Vec<ModelHandle>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ModelHandle {
            resource_name: "models/1".to_string(),
            display_name: "flow-incident-forecasting".to_string(),
            state: ModelState::Succeeded,
            created_at: Utc::now(),
        }])
    }

    async fn start_training(&self, _request: &TrainingRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("not expected"))
    }

    async fn predict(&self, _model: &ModelHandle, _rows: &[ForecastRow]) -> Result<ForecastResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("not expected"))
    }
}

fn rule_based_arbiter() -> HybridArbiter {
    HybridArbiter::new(
        ClassificationThresholds::default(),
        ForecastConfig::default(),
        None,
    )
}

fn counting_arbiter(backend: Arc<CountingBackend>) -> HybridArbiter {
    let ctx = ForecastContext::new(
        backend,
        ForecastConfig::default(),
        ClassificationThresholds::default(),
    );
    HybridArbiter::new(
        ClassificationThresholds::default(),
        ForecastConfig::default(),
        Some(Arc::new(ctx)),
    )
}

fn frame(timestamp: i64, people: &[(u64, f64, f64)], triggers: TriggerFlags) -> FrameInput {
    FrameInput::from_observation(FrameObservation {
        timestamp,
        people: people
            .iter()
            .map(|&(id, x, y)| PersonObservation {
                track_id: TrackId::Number(id),
                x,
                y,
            })
            .collect(),
        triggers,
    })
}

#[tokio::test]
async fn test_quiet_crowd_stays_green() {
    // Five stationary people over ten seconds
    let mut aggregator = TrackAggregator::new(FlowConfig::default());
    let mut history = SnapshotHistory::new();
    let people: Vec<(u64, f64, f64)> = (0..5).map(|i| (i, 0.15 + i as f64 * 0.15, 0.5)).collect();
    for t in 0..10 {
        let snapshot = aggregator.aggregate(&frame(t, &people, TriggerFlags::default()));
        history.push(snapshot).unwrap();
    }

    let stats = history.stats();
    assert!((stats.avg_people - 5.0).abs() < 1e-12);
    assert_eq!(stats.net_flow, 0);

    let arbitration = rule_based_arbiter().arbitrate("cam-a", Utc::now(), &history).await;
    let p = &arbitration.prediction;
    assert_eq!(arbitration.state, ArbiterState::Normal);
    assert_eq!(p.incident_probability, 0.0);
    assert_eq!(p.alert_level, AlertLevel::Green);
    assert_eq!(p.predicted_incident_type, IncidentType::None);
    assert_eq!(p.recommended_action, RecommendedAction::NoAction);
    assert_eq!(p.time_to_incident_seconds, 600);
    assert!((p.prediction_confidence - 0.85).abs() < 1e-12);
}

#[tokio::test]
async fn test_lone_fire_is_green_with_forced_confidence() {
    let mut snapshot = FlowSnapshot::empty(0);
    snapshot.triggers.fire_detected = true;
    let history = SnapshotHistory::from_snapshots([snapshot]).unwrap();

    let arbitration = rule_based_arbiter().arbitrate("cam-b", Utc::now(), &history).await;
    let p = &arbitration.prediction;
    assert_eq!(arbitration.state, ArbiterState::Immediate);
    assert!((p.incident_probability - 0.2).abs() < 1e-12);
    assert_eq!(p.alert_level, AlertLevel::Green);
    assert_eq!(p.predicted_incident_type, IncidentType::None);
    assert_eq!(p.recommended_action, RecommendedAction::NoAction);
    assert_eq!(p.time_to_incident_seconds, 600);
    assert_eq!(p.prediction_confidence, 0.95);
}

#[tokio::test]
async fn test_armed_fire_in_dense_crowd_is_red() {
    // avg people 200, people trend 2/s, 60 net inflow, 12 congestion points
    let mut snapshots: Vec<FlowSnapshot> = (0..6)
        .map(|t| {
            let mut s = FlowSnapshot::empty(t);
            s.total_people = 195 + 2 * t as u32;
            s.density_level = DensityLevel::Critical;
            s.inflow_count = 10;
            s.net_flow = 10;
            s.congestion_points = vec![(0.15, 0.15), (0.55, 0.55)];
            s
        })
        .collect();
    snapshots[1].triggers.fire_detected = true;
    snapshots[4].triggers.weapon_detected = true;
    snapshots[4].triggers.weapon_types.insert("gun".to_string());
    let history = SnapshotHistory::from_snapshots(snapshots).unwrap();

    let stats = history.stats();
    assert!((stats.avg_people - 200.0).abs() < 1e-9);
    assert_eq!(stats.net_flow, 60);
    assert_eq!(stats.total_congestion_points, 12);
    assert!(stats.people_trend > 0.5);

    let arbitration = rule_based_arbiter().arbitrate("cam-c", Utc::now(), &history).await;
    let p = &arbitration.prediction;
    assert!((p.incident_probability - 0.745).abs() < 1e-9);
    assert_eq!(p.alert_level, AlertLevel::Red);
    assert_eq!(p.predicted_incident_type, IncidentType::Panic);
    assert_eq!(p.recommended_action, RecommendedAction::CrowdControl);
    assert_eq!(p.time_to_incident_seconds, 120);
    assert_eq!(p.prediction_confidence, 0.95);
    assert!(arbitration.threats.threat_types.contains("fire"));
    assert!(arbitration.threats.threat_types.contains("gun"));
    assert!(p.risk_factors.iter().any(|f| f == "weapon_gun"));
}

#[tokio::test]
async fn test_immediate_threat_never_consults_forecaster() {
    let flags: [fn(&mut TriggerFlags); 5] = [
        |t| t.fire_detected = true,
        |t| t.smoke_detected = true,
        |t| t.weapon_detected = true,
        |t| t.violence_detected = true,
        |t| t.emergency_evacuation = true,
    ];

    for set_flag in flags {
        let backend = Arc::new(CountingBackend {
            calls: AtomicUsize::new(0),
        });
        let arbiter = counting_arbiter(backend.clone());

        let mut snapshots: Vec<FlowSnapshot> = (0..40).map(FlowSnapshot::empty).collect();
        set_flag(&mut snapshots[7].triggers);
        let history = SnapshotHistory::from_snapshots(snapshots).unwrap();

        let arbitration = arbiter.arbitrate("cam-d", Utc::now(), &history).await;
        assert_eq!(arbitration.state, ArbiterState::Immediate);
        assert_eq!(arbitration.prediction.prediction_confidence, 0.95);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_forecaster_error_falls_back_to_rule_based() {
    let backend = Arc::new(CountingBackend {
        calls: AtomicUsize::new(0),
    });
    let arbiter = counting_arbiter(backend.clone());
    let history = SnapshotHistory::from_snapshots((0..20).map(FlowSnapshot::empty)).unwrap();

    let arbitration = arbiter.arbitrate("cam-e", Utc::now(), &history).await;
    let expected = StableScorer::default().score(&history);
    assert_eq!(arbitration.prediction, expected);
    // list_models + predict
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_density_is_pure_function_of_count() {
    let thresholds = DensityThresholds::default();
    let mut aggregator = TrackAggregator::new(FlowConfig::default());
    for (t, count) in [0u32, 9, 10, 29, 30, 59, 60, 200].into_iter().enumerate() {
        let people: Vec<(u64, f64, f64)> = (0..count as u64)
            .map(|i| (i, 0.1 + (i % 80) as f64 * 0.01, 0.5))
            .collect();
        let snapshot = aggregator.aggregate(&frame(t as i64, &people, TriggerFlags::default()));
        assert_eq!(snapshot.total_people, count);
        assert_eq!(snapshot.density_level, DensityLevel::from_count(count, &thresholds));
    }
}

#[test]
fn test_interior_movement_never_counts_as_flow() {
    let mut aggregator = TrackAggregator::new(FlowConfig::default());
    let path = [(0.1, 0.9), (0.9, 0.1), (0.5, 0.5), (0.06, 0.94), (0.94, 0.06)];
    for (t, &(x, y)) in path.iter().enumerate() {
        let snapshot = aggregator.aggregate(&frame(t as i64, &[(1, x, y)], TriggerFlags::default()));
        assert_eq!(snapshot.inflow_count, 0);
        assert_eq!(snapshot.outflow_count, 0);
    }
}

#[test]
fn test_congestion_ignores_input_order() {
    let mut cluster: Vec<(u64, f64, f64)> = (0..6).map(|i| (i, 0.42, 0.47)).collect();
    cluster.extend((6..11).map(|i| (i, 0.73, 0.18)));
    cluster.push((11, 0.05, 0.95));
    let mut reversed = cluster.clone();
    reversed.reverse();

    let as_set = |points: &[(f64, f64)]| -> HashSet<(u64, u64)> {
        points.iter().map(|(x, y)| (x.to_bits(), y.to_bits())).collect()
    };

    let a = TrackAggregator::new(FlowConfig::default())
        .aggregate(&frame(0, &cluster, TriggerFlags::default()));
    let b = TrackAggregator::new(FlowConfig::default())
        .aggregate(&frame(0, &reversed, TriggerFlags::default()));
    assert_eq!(a.congestion_points.len(), 2);
    assert_eq!(as_set(&a.congestion_points), as_set(&b.congestion_points));
}

#[test]
fn test_score_monotone_in_each_category() {
    let scorer = StableScorer::default();
    let score = |history: &SnapshotHistory| scorer.score(history).incident_probability;

    let build = |people: u32, inflow: u32, congestion: usize| {
        SnapshotHistory::from_snapshots((0..5).map(|t| {
            let mut s = FlowSnapshot::empty(t);
            s.total_people = people;
            s.inflow_count = inflow;
            s.net_flow = inflow as i64;
            s.congestion_points = vec![(0.55, 0.55); congestion];
            s
        }))
        .unwrap()
    };

    let base = score(&build(40, 0, 0));
    let mut last = base;
    for people in [51, 101, 151] {
        let p = score(&build(people, 0, 0));
        assert!(p >= last);
        last = p;
    }
    let mut last = base;
    for inflow in [5, 11] {
        let p = score(&build(40, inflow, 0));
        assert!(p >= last);
        last = p;
    }
    let mut last = base;
    for congestion in [2, 3] {
        let p = score(&build(40, 0, congestion));
        assert!(p >= last);
        assert!(p <= 1.0);
        last = p;
    }
}
