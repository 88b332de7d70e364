//! Application configuration management.
//!
//! This module handles loading and saving the console configuration,
//! which includes the API base URL and the last used username.
//!
//! Configuration is stored at `~/.config/opspanel/config.json`; the
//! `OPSPANEL_API_BASE_URL` environment variable overrides the stored
//! base URL.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for the config directory path
const APP_NAME: &str = "opspanel";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Base URL used when nothing is configured
const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Environment override for the API base URL
const API_BASE_URL_ENV: &str = "OPSPANEL_API_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub last_username: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            last_username: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Ok(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)?;
                serde_json::from_str(&contents)?
            }
            _ => Self::default(),
        };

        if let Ok(base_url) = std::env::var(API_BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                config.api_base_url = base_url.trim().to_string();
            }
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}
