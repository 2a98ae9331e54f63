use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};
use tracing::error;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Detections at or below this confidence are discarded.
    pub min_confidence: f32,
    pub width: u32,
    pub height: u32,
    /// Run detection on every Nth frame.
    pub detect_interval: u64,
    /// Print aggregate statistics every Nth frame.
    pub stats_interval: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            width: 640,
            height: 480,
            detect_interval: 3,
            stats_interval: 100,
        }
    }
}

impl Config {
    /// Zero intervals would stall the modulo cadence; clamp them to 1.
    fn sanitized(mut self) -> Self {
        self.detect_interval = self.detect_interval.max(1);
        self.stats_interval = self.stats_interval.max(1);
        self
    }
}

fn config_path() -> PathBuf {
    env::var_os("FACEWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

pub fn load_config() -> Config {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Config {
    if let Ok(data) = fs::read(path) {
        if let Ok(cfg) = serde_json::from_slice::<Config>(&data) {
            return cfg.sanitized();
        }
        error!("ignoring malformed config at {}", path.display());
    }
    Config::default()
}
