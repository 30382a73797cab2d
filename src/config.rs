use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Path to database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User id to act as when none is given on the command line (default: "local")
    #[serde(default = "default_user")]
    pub default_user: String,

    /// Log filter used when RUST_LOG is not set (default: "warn")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// How long to wait on a locked database before giving up (default: 5000)
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("ripen").join("ripen.db"))
        .unwrap_or_else(|| PathBuf::from("ripen.db"))
}

fn default_user() -> String {
    "local".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_busy_timeout() -> u64 {
    5000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            default_user: default_user(),
            log_level: default_log_level(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(suffix) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(suffix);
    }
    path.to_path_buf()
}

impl Config {
    /// Load config from the default location or return defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load config from `path`; a missing file yields defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.db_path = expand_tilde(&config.db_path);
        Ok(config)
    }

    /// Path to config file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("ripen").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Ensure the database directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        Ok(())
    }
}
