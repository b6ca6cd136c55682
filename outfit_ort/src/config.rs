use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use ort_common::{LocatorConfig, SegmenterConfig};
use outfit_common::AnalyzerConfig;
use serde::{Deserialize, Serialize};

/// Settings file layout. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analyzer: AnalyzerConfig,
    pub locator: LocatorConfig,
    pub segmenter: SegmenterConfig,
}

impl AppConfig {
    /// Reads a JSON settings file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {path:?}"))?;
        serde_json::from_str(&json).with_context(|| format!("Failed to parse config file {path:?}"))
    }
}
