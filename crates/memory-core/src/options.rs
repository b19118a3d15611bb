use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::history::DEFAULT_PATTERN;
use crate::session::DEFAULT_START_OFFSET_MS;

fn default_history_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

fn default_start_offset_ms() -> u64 {
    DEFAULT_START_OFFSET_MS
}

fn default_max_width() -> u32 {
    1400
}

fn default_max_height() -> u32 {
    900
}

/// Settings for one run. Every field has a default so a config file only
/// needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOptions {
    /// Directory holding `Streams*.json` exports
    #[serde(default)]
    pub history_dir: Option<PathBuf>,
    /// Directory holding JPEG photos
    #[serde(default)]
    pub photo_dir: Option<PathBuf>,
    #[serde(default = "default_history_pattern")]
    pub history_pattern: String,
    #[serde(default = "default_start_offset_ms")]
    pub start_offset_ms: u64,
    #[serde(default = "default_max_width")]
    pub max_width: u32,
    #[serde(default = "default_max_height")]
    pub max_height: u32,
    /// Fixed RNG seed for reproducible draws
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            history_dir: None,
            photo_dir: None,
            history_pattern: default_history_pattern(),
            start_offset_ms: default_start_offset_ms(),
            max_width: default_max_width(),
            max_height: default_max_height(),
            seed: None,
        }
    }
}

impl SessionOptions {
    /// Load options from a JSON file. Relative directories are resolved
    /// against the file's own directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        let mut options: SessionOptions = serde_json::from_slice(&bytes)
            .with_context(|| format!("invalid config {}", path.display()))?;

        if let Some(base) = path.parent() {
            for dir in [&mut options.history_dir, &mut options.photo_dir] {
                if let Some(d) = dir.as_mut() {
                    if d.is_relative() {
                        *d = base.join(&*d);
                    }
                }
            }
        }
        Ok(options)
    }
}
