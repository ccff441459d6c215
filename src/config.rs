//! Configuration for serialmon.
//!
//! Settings are read from `~/.serialmon/config.toml`. Every key is optional
//! and a missing or unreadable file means defaults:
//!
//! ```toml
//! # Directory for session logs (default: current directory)
//! log_dir = "/home/me/serial-logs"
//!
//! # Pause after an idle poll, in milliseconds (0 = busy loop)
//! poll_interval_ms = 2
//!
//! # Diagnostic log level; RUST_LOG takes precedence
//! trace_level = "info"
//!
//! [markers]
//! rx = ">>>"
//! tx = "<<<"
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory session logs are written to
    pub log_dir: Option<PathBuf>,
    /// Sleep after an iteration with no traffic
    pub poll_interval_ms: u64,
    /// Default filter for the diagnostic log
    pub trace_level: String,
    /// Pane marker settings
    pub markers: MarkerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: None,
            poll_interval_ms: 2,
            trace_level: "info".to_string(),
            markers: MarkerConfig::default(),
        }
    }
}

/// Pane marker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub rx: String,
    pub tx: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            rx: ">>>".to_string(),
            tx: "<<<".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing file gives the defaults. A broken one is an error naming the
    /// file; callers fall back to the defaults and report it once logging is up.
    pub fn load() -> Result<Self, String> {
        match Self::get_config_path() {
            Some(path) => Self::load_or_default(&path),
            None => Ok(Self::default()),
        }
    }

    fn load_or_default(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(path).map_err(|e| format!("Ignoring {}: {}", path.display(), e))
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, String> {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config: {}", e))?;
        Self::parse(&content)
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        app_dir().map(|dir| dir.join("config.toml"))
    }

    /// Directory for session logs
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// `~/.serialmon`, created on first use
pub fn app_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(".serialmon");
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
