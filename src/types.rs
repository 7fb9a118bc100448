// src/types.rs
//
// Configuration model. Every section and field has a default so a partial
// config.yaml (or none at all) still yields a runnable engine.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub flow: FlowConfig,
    pub scoring: ScoringConfig,
    pub forecast: ForecastConfig,
    pub runner: RunnerConfig,
    pub logging: LoggingConfig,
}

// ============================================================================
// FLOW AGGREGATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Side length of a congestion grid cell in normalized frame units
    pub grid_cell_size: f64,
    /// Width of the edge band used for inflow/outflow crossings
    pub boundary_band: f64,
    /// Occupants a grid cell needs before it counts as a congestion point
    pub congestion_min_people: usize,
    pub density: DensityThresholds,
    /// Tracks unseen for longer than this are dropped from the history
    pub max_track_idle_seconds: i64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            grid_cell_size: 0.1,
            boundary_band: 0.05,
            congestion_min_people: 5,
            density: DensityThresholds::default(),
            max_track_idle_seconds: 30,
        }
    }
}

/// Lower bounds (inclusive) of the medium / high / critical density buckets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityThresholds {
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

impl Default for DensityThresholds {
    fn default() -> Self {
        Self {
            medium: 10,
            high: 30,
            critical: 60,
        }
    }
}

// ============================================================================
// SCORING
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub classification: ClassificationThresholds,
    pub rolling: RollingConfig,
}

/// Score cut-offs shared by every scorer. All comparisons are strict `>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationThresholds {
    pub crowd_crush: f64,
    pub panic: f64,
    pub crowd_surge: f64,
    pub congestion: f64,

    pub immediate_evacuation: f64,
    pub crowd_control: f64,
    pub security_dispatch: f64,
    pub monitor_closely: f64,

    pub red: f64,
    pub orange: f64,
    pub yellow: f64,

    pub imminent_above: f64,
    pub imminent_seconds: u32,
    pub elevated_above: f64,
    pub elevated_seconds: u32,
    pub baseline_seconds: u32,
}

impl Default for ClassificationThresholds {
    fn default() -> Self {
        Self {
            crowd_crush: 0.8,
            panic: 0.6,
            crowd_surge: 0.4,
            congestion: 0.3,
            immediate_evacuation: 0.8,
            crowd_control: 0.6,
            security_dispatch: 0.4,
            monitor_closely: 0.2,
            red: 0.7,
            orange: 0.5,
            yellow: 0.3,
            imminent_above: 0.7,
            imminent_seconds: 120,
            elevated_above: 0.5,
            elevated_seconds: 300,
            baseline_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingConfig {
    /// Look-back from the latest snapshot timestamp (inclusive)
    pub window_seconds: i64,
    pub min_snapshots: usize,
}

impl Default for RollingConfig {
    fn default() -> Self {
        Self {
            window_seconds: 10,
            min_snapshots: 3,
        }
    }
}

// ============================================================================
// FORECASTING COLLABORATOR
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub enabled: bool,
    pub server_url: String,
    pub timeout_ms: u64,
    /// History length required before a model is loaded or trained
    pub min_snapshots: usize,
    /// Forecasts at or below this confidence are ignored
    pub min_confidence: f64,
    /// Number of trailing snapshots sent with a forecast request
    pub request_window: usize,
    pub immediate_threat_confidence: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: "http://localhost:8085".to_string(),
            timeout_ms: 5000,
            min_snapshots: 15,
            min_confidence: 0.7,
            request_window: 10,
            immediate_threat_confidence: 0.95,
        }
    }
}

// ============================================================================
// RUNNER / LOGGING
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub input_dir: String,
    pub output_dir: String,
    pub max_concurrent_cameras: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            input_dir: "feeds".to_string(),
            output_dir: "output".to_string(),
            max_concurrent_cameras: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
