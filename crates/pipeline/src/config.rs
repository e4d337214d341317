//! Run configuration
//!
//! Loaded from JSON (every field optional, falling back to [`Default`]) and
//! validated once before a run starts.

use crate::error::{PipelineError, Result};
use nestshed_algorithms::hydrology::FlowRoutingParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Flow-routing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Minimum upstream cells for a stream cell
    pub threshold: f64,
    /// MFD convergence factor, 1 (most divergent) to 10
    pub convergence: u32,
    /// Memory ceiling for routing and concurrent basin extraction, in MB
    pub memory_mb: usize,
    /// Elevation increment imposed while filling depressions
    pub fill_epsilon: f64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            threshold: 1000.0,
            convergence: 5,
            memory_mb: 300,
            fill_epsilon: 1e-5,
        }
    }
}

impl RoutingConfig {
    pub fn params(&self) -> FlowRoutingParams {
        FlowRoutingParams {
            threshold: self.threshold,
            convergence: self.convergence,
            memory_mb: self.memory_mb,
            fill_epsilon: self.fill_epsilon,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub routing: RoutingConfig,
    /// Snap outlets to the strongest stream cell within this many cells (0 = off)
    pub snap_radius: usize,
    /// GeoJSON property holding the collection-point label
    pub label_field: String,
    /// Worker limit; `None` uses every core the memory ceiling allows
    pub workers: Option<usize>,
    /// Persist per-label basin mask rasters
    pub keep_masks: bool,
    /// Intermediate artifacts
    pub scratch_dir: PathBuf,
    /// Final exclusive-area artifacts
    pub output_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            routing: RoutingConfig::default(),
            snap_radius: 0,
            label_field: "Points".to_string(),
            workers: None,
            keep_masks: false,
            scratch_dir: PathBuf::from("scratch"),
            output_dir: PathBuf::from("output"),
        }
    }
}

fn invalid(msg: impl Into<String>) -> PipelineError {
    PipelineError::InvalidConfig(msg.into())
}

impl PipelineConfig {
    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Reject settings no run can succeed with
    pub fn validate(&self) -> Result<()> {
        let routing = &self.routing;
        if !(routing.threshold.is_finite() && routing.threshold > 0.0) {
            return Err(invalid(format!("threshold must be positive, got {}", routing.threshold)));
        }
        if !(1..=10).contains(&routing.convergence) {
            return Err(invalid(format!(
                "convergence must be between 1 and 10, got {}",
                routing.convergence
            )));
        }
        if routing.memory_mb == 0 {
            return Err(invalid("memory_mb must be greater than zero"));
        }
        if !(routing.fill_epsilon.is_finite() && routing.fill_epsilon >= 0.0) {
            return Err(invalid(format!(
                "fill_epsilon must be a non-negative number, got {}",
                routing.fill_epsilon
            )));
        }
        if self.label_field.trim().is_empty() {
            return Err(invalid("label_field must not be empty"));
        }
        if self.workers == Some(0) {
            return Err(invalid("workers must be at least 1"));
        }
        if self.scratch_dir.as_os_str().is_empty() || self.output_dir.as_os_str().is_empty() {
            return Err(invalid("scratch and output directories must be set"));
        }
        if same_location(&self.scratch_dir, &self.output_dir) {
            return Err(invalid(format!(
                "scratch and output directories must differ ({})",
                self.output_dir.display()
            )));
        }
        Ok(())
    }
}

fn same_location(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.components().eq(b.components()),
    }
}
