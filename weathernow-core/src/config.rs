use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::{Path, PathBuf}, time::Duration};

use crate::{error::FetchError, model::Units};

/// Environment variable that overrides the API key from the config file.
pub const API_KEY_ENV: &str = "OWM_API_KEY";

/// Values that mean "the user never set a key".
const PLACEHOLDER_KEYS: &[&str] = &["OWM_API_KEY", "YOUR_API_KEY_HERE"];

/// Everything the fetch pipeline needs to know about its endpoints.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// weather_url = "https://api.openweathermap.org/data/2.5/weather"
/// icon_url = "https://openweathermap.org/img/wn/{icon}@2x.png"
/// timeout_secs = 10
/// default_units = "metric"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub weather_url: String,
    /// `{icon}` is replaced with the condition's icon code.
    pub icon_url: String,
    pub timeout_secs: u64,
    pub default_units: Units,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            weather_url: "https://api.openweathermap.org/data/2.5/weather".to_string(),
            icon_url: "https://openweathermap.org/img/wn/{icon}@2x.png".to_string(),
            timeout_secs: 10,
            default_units: Units::Metric,
        }
    }
}

impl Config {
    /// The configured key, or `FetchError::Config` if it is missing or a placeholder.
    pub fn api_key(&self) -> Result<&str, FetchError> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() && !PLACEHOLDER_KEYS.contains(&key) => Ok(key),
            _ => Err(FetchError::Config),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn icon_url_for(&self, code: &str) -> String {
        self.icon_url.replace("{icon}", code)
    }

    /// Load config from disk (or defaults on first run), then apply `OWM_API_KEY`.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        let mut cfg = Self::load_from(&path)?;
        cfg.apply_env_key(std::env::var(API_KEY_ENV).ok());
        Ok(cfg)
    }

    /// Load config from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weathernow", "weathernow")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// A non-empty environment value wins over the file.
    fn apply_env_key(&mut self, value: Option<String>) {
        if let Some(key) = value.filter(|k| !k.trim().is_empty()) {
            self.api_key = Some(key);
        }
    }
}
