use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

pub type Rgb = [u8; 3];

/// Scroll steps as fractions of the displayed page height.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub arrow: f64,
    pub page: f64,
    pub mouse: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            arrow: 0.01,
            page: 0.30,
            mouse: 0.02,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub background: Rgb,
    pub status_background: Rgb,
    pub status_foreground: Rgb,
    pub scroll: ScrollConfig,
    /// Extra pixels repainted around a stale highlight.
    pub selection_padding: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            background: [127, 127, 127],
            status_background: [0, 0, 0],
            status_foreground: [255, 255, 255],
            scroll: ScrollConfig::default(),
            selection_padding: 5,
        }
    }
}

impl Config {
    /// Reads `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(?path, "no config file, using defaults");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {:?}", path))?;
        Self::parse(&raw).with_context(|| format!("failed to parse config file {:?}", path))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)?;
        Ok(config)
    }
}
