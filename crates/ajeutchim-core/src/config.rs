//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the auth API key and base URL plus the last signed-in
//! email (for prefilling the sign-in form).
//!
//! Configuration is stored at `~/.config/ajeutchim/config.json`. The API
//! key and URL can also come from the environment or a `.env` file.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Application name used for config directory paths
const APP_NAME: &str = "ajeutchim";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment override for the auth API key
const API_KEY_ENV: &str = "AJEUTCHIM_API_KEY";

/// Environment override for the auth API base URL
const API_URL_ENV: &str = "AJEUTCHIM_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base_url: Option<String>,
    pub last_email: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Pick up a .env file if present (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
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

    /// Auth API key, with the environment taking precedence over the file
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV).ok().or_else(|| self.api_key.clone())
    }

    /// Auth API base URL override, environment first
    pub fn api_base_url(&self) -> Option<String> {
        std::env::var(API_URL_ENV).ok().or_else(|| self.api_base_url.clone())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}
