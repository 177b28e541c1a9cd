use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::haptics::DEFAULT_COOLDOWN_MS;
use crate::motion::{DEFAULT_DEBOUNCE_MS, DEFAULT_THRESHOLD, MAX_SENSITIVITY, MIN_SENSITIVITY};
use crate::selector::DEFAULT_PREVIEW_CHARS;

pub const APP_NAME: &str = "driftbottle";

/// Most slots a single round will float up
pub const MAX_SLOTS: usize = 9;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Shake threshold in m/s² of per-axis change
    pub sensitivity: f64,
    pub shake_debounce_ms: u64,
    pub vibration_cooldown_ms: u64,
    pub slot_count: usize,
    pub preview_chars: usize,
    pub dev_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_THRESHOLD,
            shake_debounce_ms: DEFAULT_DEBOUNCE_MS,
            vibration_cooldown_ms: DEFAULT_COOLDOWN_MS,
            slot_count: 3,
            preview_chars: DEFAULT_PREVIEW_CHARS,
            dev_mode: false,
        }
    }
}

impl Config {
    /// Pulls hand-edited values back into range
    pub fn clamped(mut self) -> Self {
        self.sensitivity = if self.sensitivity.is_finite() {
            self.sensitivity.clamp(MIN_SENSITIVITY, MAX_SENSITIVITY)
        } else {
            DEFAULT_THRESHOLD
        };
        self.slot_count = self.slot_count.clamp(1, MAX_SLOTS);
        self.preview_chars = self.preview_chars.max(1);
        self
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", APP_NAME) {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("driftbottle_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing or unreadable files fall back to defaults
    fn load(&self) -> Config {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return Config::default(),
        };
        match serde_json::from_slice::<Config>(&bytes) {
            Ok(cfg) => cfg.clamped(),
            Err(e) => {
                log::warn!("ignoring malformed config {}: {e}", self.path.display());
                Config::default()
            }
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
