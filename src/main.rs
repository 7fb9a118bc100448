// src/main.rs

use anyhow::{Context, Result};
use crowd_risk::pipeline::{self, FleetSummary};
use crowd_risk::Config;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path =
        std::env::var("CROWD_RISK_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
    let mut config = Config::load(&config_path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("crowd_risk={}", config.logging.level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("👥 Crowd Risk Engine Starting");
    info!("✓ Configuration loaded from {}", config_path);

    if let Ok(url) = std::env::var("FORECAST_SERVER_URL") {
        config.forecast.server_url = url;
        config.forecast.enabled = true;
    }

    info!(
        "Flow: grid={:.2}, band={:.2}, density={}/{}/{}, congestion>={} people",
        config.flow.grid_cell_size,
        config.flow.boundary_band,
        config.flow.density.medium,
        config.flow.density.high,
        config.flow.density.critical,
        config.flow.congestion_min_people,
    );

    let arbiter = Arc::new(pipeline::build_arbiter(&config)?);
    let config = Arc::new(config);

    let summary = pipeline::run(Arc::clone(&config), arbiter).await?;
    log_summary(&summary);

    let summary_path = Path::new(&config.runner.output_dir).join("fleet_summary.json");
    std::fs::create_dir_all(&config.runner.output_dir)?;
    let json = serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?;
    std::fs::write(&summary_path, json)
        .with_context(|| format!("Failed to write {}", summary_path.display()))?;
    info!("💾 Fleet summary saved to {}", summary_path.display());

    Ok(())
}

fn log_summary(summary: &FleetSummary) {
    let m = &summary.metrics;

    info!("\n========================================");
    info!("Processed {} camera(s)", summary.cameras.len());
    info!("========================================");
    for camera in &summary.cameras {
        match (&camera.alert_level, &camera.error) {
            (Some(level), _) => info!("  📹 {}: {}", camera.camera_id, level),
            (None, Some(e)) => error!("  ❌ {}: {}", camera.camera_id, e),
            (None, None) => {}
        }
    }

    info!("  Frames ingested: {} ({:.0}/s)", m.frames_ingested, m.frames_per_sec);
    info!("  Snapshots: {}", m.snapshots);
    if m.malformed_frames > 0 || m.dropped_frames > 0 {
        warn!(
            "  ⚠️  Malformed frames: {} | out-of-order dropped: {}",
            m.malformed_frames, m.dropped_frames
        );
    }
    if m.immediate_threats > 0 {
        warn!("  🚨 Cameras with immediate threats: {}", m.immediate_threats);
    }
    info!(
        "  🤖 Forecasts: {} attempted, {} failed, {} selected | training requests: {}",
        m.forecast_attempts, m.forecast_failures, m.forecast_selections, m.training_requests
    );
    if summary.failed() > 0 {
        warn!("  ❌ Failed cameras: {}", summary.failed());
    }
}
