//! Engine configuration, persisted as JSON.
//!
//! Missing fields fall back to defaults so old config files keep loading.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "midroll_config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Cue tolerance in seconds when comparing the clock to an offset.
    #[serde(default = "default_eps_secs")]
    pub eps_secs: f64,
    /// How long the companion creative stays up after a break start.
    #[serde(default = "default_companion_hold_secs")]
    pub companion_hold_secs: f64,
    /// Directory for the break play log. None = platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

fn default_eps_secs() -> f64 {
    crate::break_scheduler::DEFAULT_EPS_SECS
}

fn default_companion_hold_secs() -> f64 {
    crate::companion::DEFAULT_HOLD.as_secs_f64()
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            eps_secs: default_eps_secs(),
            companion_hold_secs: default_companion_hold_secs(),
            log_dir: None,
        }
    }
}

impl EngineConfig {
    /// Default config file location (platform data dir, cwd as fallback).
    pub fn default_path() -> PathBuf {
        match dirs::data_dir() {
            Some(dir) => dir.join("midroll").join(CONFIG_FILE),
            None => PathBuf::from(CONFIG_FILE),
        }
    }

    /// Directory where the break play log lives.
    pub fn resolved_log_dir(&self) -> PathBuf {
        match &self.log_dir {
            Some(dir) => dir.clone(),
            None => match dirs::data_dir() {
                Some(dir) => dir.join("midroll"),
                None => PathBuf::from("."),
            },
        }
    }

    /// Load config from a path, or return defaults if missing or corrupt.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(data) => match serde_json::from_str(&data) {
                    Ok(config) => return config,
                    Err(e) => eprintln!("Warning: corrupt config, using defaults: {}", e),
                },
                Err(e) => eprintln!("Warning: could not read config: {}", e),
            }
        }
        EngineConfig::default()
    }

    /// Persist to a path, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Cannot create '{}': {}", parent.display(), e))?;
        }
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Serialize error: {}", e))?;
        fs::write(path, json).map_err(|e| format!("Write error: {}", e))?;
        Ok(())
    }
}
