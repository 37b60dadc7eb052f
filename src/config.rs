use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::extract::{ExtractOptions, DEFAULT_VDS_TOLERANCE};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "gmid-viewer.json";

// ---------------------------------------------------------------------------
// ViewerConfig
// ---------------------------------------------------------------------------

/// Viewer defaults, read from a JSON file. Every field is optional in the
/// file.
///
/// ```json
/// { "vds": 0.6, "vds_tolerance": 1e-3, "vgs_interval": [0.0, 1.2] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ViewerConfig {
    /// Drain-source bias selected after loading, if present in the file.
    pub vds: Option<f64>,
    pub vds_tolerance: f64,
    pub vgs_interval: Option<(f64, f64)>,
    /// Initial x / y series names.
    pub x_series: Option<String>,
    pub y_series: Option<String>,
    pub window_size: [f32; 2],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            vds: None,
            vds_tolerance: DEFAULT_VDS_TOLERANCE,
            vgs_interval: None,
            x_series: None,
            y_series: None,
            window_size: [1200.0, 800.0],
        }
    }
}

impl ViewerConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parsing viewer config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Load `explicit` if given (it must exist), otherwise
    /// [`DEFAULT_CONFIG_FILE`] when present, otherwise defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
        if fallback.is_file() {
            log::info!("Using config {}", fallback.display());
            return Self::load(&fallback);
        }
        Ok(Self::default())
    }

    pub fn extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            vgs_interval: self.vgs_interval,
            vds_tolerance: self.vds_tolerance,
        }
    }
}
