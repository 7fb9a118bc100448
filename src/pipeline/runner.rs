// src/pipeline/runner.rs
//
// Multi-camera batch runner.
//
// Each `*.jsonl` file under `runner.input_dir` is one camera feed (camera id =
// file stem, one perception record per line). Up to `max_concurrent_cameras`
// feeds are processed at once; a failing camera is logged and counted, never
// fatal to the others.

use super::metrics::{MetricsSummary, PipelineMetrics};
use super::report::CameraReport;
use super::session::CameraSession;
use crate::arbiter::HybridArbiter;
use crate::forecast::{ForecastContext, HttpForecastClient};
use crate::types::Config;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use walkdir::WalkDir;

const FEED_EXTENSION: &str = "jsonl";

#[derive(Debug, Clone, Serialize)]
pub struct CameraOutcome {
    pub camera_id: String,
    pub report_path: Option<PathBuf>,
    pub alert_level: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FleetSummary {
    pub cameras: Vec<CameraOutcome>,
    pub metrics: MetricsSummary,
}

impl FleetSummary {
    pub fn failed(&self) -> usize {
        self.cameras.iter().filter(|c| c.error.is_some()).count()
    }
}

/// Build the arbiter, wiring in the HTTP forecaster when enabled.
pub fn build_arbiter(config: &Config) -> Result<HybridArbiter> {
    let forecast = if config.forecast.enabled {
        let client = HttpForecastClient::new(&config.forecast.server_url, config.forecast.timeout_ms)?;
        info!("🤖 Forecasting collaborator at {}", client.server_url());
        Some(Arc::new(ForecastContext::new(
            Arc::new(client),
            config.forecast.clone(),
            config.scoring.classification.clone(),
        )))
    } else {
        info!("🛡️  Forecasting disabled, rule-based scoring only");
        None
    };

    Ok(HybridArbiter::new(
        config.scoring.classification.clone(),
        config.forecast.clone(),
        forecast,
    ))
}

pub fn find_camera_feeds(input_dir: &Path) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        anyhow::bail!("Input directory {} does not exist", input_dir.display());
    }

    let mut feeds: Vec<PathBuf> = WalkDir::new(input_dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(FEED_EXTENSION))
        .collect();
    feeds.sort();

    info!("Found {} camera feed(s)", feeds.len());
    Ok(feeds)
}

pub fn camera_id_for(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

/// Ingest one feed end to end and write its report.
pub async fn process_camera(
    path: &Path,
    config: &Config,
    arbiter: &HybridArbiter,
    metrics: PipelineMetrics,
) -> Result<CameraReport> {
    let camera_id = camera_id_for(path);
    info!("📹 [{}] Processing {}", camera_id, path.display());

    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read feed {}", path.display()))?;

    let mut session = CameraSession::new(camera_id.clone(), config, metrics);
    for line in contents.lines().map(str::trim).filter(|l| !l.is_empty()) {
        session.ingest_line(line);
    }

    if session.history().is_empty() {
        warn!("⚠️  [{}] No usable records in feed", camera_id);
    }

    let arbitration = session.assess(arbiter).await;
    let report = CameraReport::build(&session, arbitration);

    let prediction = &report.future_forecast.prediction;
    info!(
        "✅ [{}] {} timestamps | forecast {:.1}% {} ({}) | in={} out={}",
        camera_id,
        report.total_timestamps,
        prediction.incident_probability * 100.0,
        prediction.alert_level.as_str(),
        report.future_forecast.source.as_str(),
        report.flow_statistics.total_inflow,
        report.flow_statistics.total_outflow,
    );

    Ok(report)
}

/// Process every feed under the configured input directory.
pub async fn run(config: Arc<Config>, arbiter: Arc<HybridArbiter>) -> Result<FleetSummary> {
    let metrics = PipelineMetrics::new();
    let feeds = find_camera_feeds(Path::new(&config.runner.input_dir))?;
    let output_dir = PathBuf::from(&config.runner.output_dir);
    let semaphore = Arc::new(Semaphore::new(config.runner.max_concurrent_cameras));

    let mut tasks = JoinSet::new();
    for path in feeds {
        let config = Arc::clone(&config);
        let arbiter = Arc::clone(&arbiter);
        let semaphore = Arc::clone(&semaphore);
        let metrics = metrics.clone();
        let output_dir = output_dir.clone();

        tasks.spawn(async move {
            let camera_id = camera_id_for(&path);
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => {
                    match process_camera(&path, &config, &arbiter, metrics.clone()).await {
                        Ok(report) => report.write_to(&output_dir).map(|p| (report, p)),
                        Err(e) => Err(e),
                    }
                }
                Err(e) => Err(anyhow::Error::new(e).context("Worker pool closed")),
            };

            match result {
                Ok((report, report_path)) => {
                    metrics.inc(&metrics.cameras_processed);
                    info!("💾 [{}] Report saved to {}", camera_id, report_path.display());
                    CameraOutcome {
                        camera_id,
                        report_path: Some(report_path),
                        alert_level: Some(
                            report.future_forecast.prediction.alert_level.as_str().to_string(),
                        ),
                        error: None,
                    }
                }
                Err(e) => {
                    metrics.inc(&metrics.cameras_failed);
                    error!("❌ [{}] Camera failed: {:#}", camera_id, e);
                    CameraOutcome {
                        camera_id,
                        report_path: None,
                        alert_level: None,
                        error: Some(format!("{:#}", e)),
                    }
                }
            }
        });
    }

    let mut cameras = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => cameras.push(outcome),
            Err(e) => {
                metrics.inc(&metrics.cameras_failed);
                error!("❌ Camera worker panicked: {}", e);
            }
        }
    }
    cameras.sort_by(|a, b| a.camera_id.cmp(&b.camera_id));

    Ok(FleetSummary {
        cameras,
        metrics: metrics.summary(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn feed_line(timestamp: i64, fire: bool) -> String {
        format!(
            r#"{{"timestamp": {}, "people": [{{"track_id": 1, "x": 0.5, "y": 0.5}}], "fire_detected": {}}}"#,
            timestamp, fire
        )
    }

    #[test]
    fn test_find_camera_feeds_filters_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("cam-b.jsonl"), "").unwrap();
        fs::create_dir(dir.path().join("north")).unwrap();
        fs::write(dir.path().join("north").join("cam-a.jsonl"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let feeds = find_camera_feeds(dir.path()).unwrap();
        let ids: Vec<_> = feeds.iter().map(|p| camera_id_for(p)).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"cam-a".to_string()));
        assert!(ids.contains(&"cam-b".to_string()));
    }

    #[test]
    fn test_missing_input_dir_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_camera_feeds(&dir.path().join("absent")).is_err());
    }

    #[tokio::test]
    async fn test_run_writes_reports_and_isolates_failures() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();

        let quiet: Vec<String> = (0..5).map(|t| feed_line(t, false)).collect();
        fs::write(input.path().join("lobby.jsonl"), quiet.join("\n")).unwrap();
        let hot: Vec<String> = (0..5).map(|t| feed_line(t, t == 2)).collect();
        fs::write(input.path().join("gate.jsonl"), hot.join("\n")).unwrap();
        // Not valid UTF-8: reading the feed fails
        fs::write(input.path().join("broken.jsonl"), [0xff, 0xfe, 0x00]).unwrap();

        let mut config = Config::default();
        config.runner.input_dir = input.path().to_string_lossy().to_string();
        config.runner.output_dir = output.path().to_string_lossy().to_string();
        config.runner.max_concurrent_cameras = 2;
        let config = Arc::new(config);
        let arbiter = Arc::new(build_arbiter(&config).unwrap());

        let summary = run(config, arbiter).await.unwrap();
        assert_eq!(summary.cameras.len(), 3);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.metrics.cameras_processed, 2);
        assert_eq!(summary.metrics.immediate_threats, 1);

        let gate: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(output.path().join("gate_flow_analysis.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(gate["future_forecast"]["state"], "immediate");
        assert_eq!(gate["future_forecast"]["prediction"]["prediction_confidence"], 0.95);
        assert_eq!(gate["total_timestamps"], 5);
        assert_eq!(gate["timeline"].as_array().unwrap().len(), 5);

        assert!(output.path().join("lobby_flow_analysis.json").exists());
        assert!(!output.path().join("broken_flow_analysis.json").exists());
    }
}
