//! Analysis options and scan configuration.
//!
//! `AnalysisOptions` carries the per-run switches (normally straight from CLI
//! flags). `ScanConfig` carries the slower-moving knobs that can live in a
//! JSON file next to the build output.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, SpyResult};

/// Per-run switches.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Report every dependency, not just the ones with more than one version.
    #[serde(default)]
    pub include_all: bool,
    /// Drop dependencies whose name starts with a system prefix.
    #[serde(default)]
    pub skip_system: bool,
    /// Recurse into subdirectories of the scan root.
    #[serde(default)]
    pub recurse: bool,
    /// Worker thread cap for extraction. `None` uses the global rayon pool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

/// File-level configuration for the scanner and classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// File extensions (without the dot) treated as candidate modules.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Dependency name prefixes considered platform-reserved.
    #[serde(default = "default_system_prefixes")]
    pub system_prefixes: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    vec!["dll".to_string(), "exe".to_string()]
}

fn default_system_prefixes() -> Vec<String> {
    vec!["System".to_string(), "mscorlib".to_string()]
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { extensions: default_extensions(), system_prefixes: default_system_prefixes() }
    }
}

impl ScanConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> SpyResult<Self> {
        let path = path.as_ref();
        let body = fs::read_to_string(path).map_err(|e| AnalysisError::Config {
            path: path.to_path_buf(),
            message: format!("Failed to read config: {e}"),
        })?;
        let config: ScanConfig = serde_json::from_str(&body).map_err(|e| AnalysisError::Config {
            path: path.to_path_buf(),
            message: format!("Failed to parse config JSON: {e}"),
        })?;
        if config.extensions.is_empty() {
            return Err(AnalysisError::Config {
                path: path.to_path_buf(),
                message: "At least one extension is required".to_string(),
            });
        }
        Ok(config)
    }

    /// True when `name` starts with any configured system prefix.
    pub fn is_system_name(&self, name: &str) -> bool {
        self.system_prefixes.iter().any(|p| name.starts_with(p.as_str()))
    }

    /// Case-insensitive extension check.
    pub fn matches_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions.iter().any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}
