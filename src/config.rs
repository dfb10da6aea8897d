//! Configuration management
//!
//! Loads a small JSON configuration with environment variable overrides for
//! the data directory. Everything has a usable default so the CLI works with
//! no config file present.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite database and log files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default tracing filter when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file name inside the data directory.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
            file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_dir: default_data_dir(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.apply_env();
        Ok(config)
    }

    /// Load from an optional path, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let mut config = Config::default();
                config.apply_env();
                Ok(config)
            }
        }
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("GRID_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("grid_trading.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.db_path(), PathBuf::from("data/grid_trading.db"));
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"data_dir": "/tmp/grids"}"#).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/grids"));
        assert_eq!(config.log.level, "info");
    }
}
