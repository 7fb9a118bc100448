use crate::types::Config;
use anyhow::{bail, Context, Result};
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents).context("Invalid config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let flow = &self.flow;
        if !(flow.grid_cell_size > 0.0 && flow.grid_cell_size <= 1.0) {
            bail!("flow.grid_cell_size must be in (0, 1], got {}", flow.grid_cell_size);
        }
        if !(flow.boundary_band > 0.0 && flow.boundary_band < 0.5) {
            bail!("flow.boundary_band must be in (0, 0.5), got {}", flow.boundary_band);
        }
        let d = flow.density;
        if !(d.medium < d.high && d.high < d.critical) {
            bail!(
                "flow.density thresholds must ascend, got {}/{}/{}",
                d.medium,
                d.high,
                d.critical
            );
        }
        if self.scoring.rolling.min_snapshots < 2 {
            bail!("scoring.rolling.min_snapshots must be at least 2");
        }
        if self.forecast.request_window == 0 {
            bail!("forecast.request_window must be positive");
        }
        if self.runner.max_concurrent_cameras == 0 {
            bail!("runner.max_concurrent_cameras must be positive");
        }
        Ok(())
    }
}
