use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::{AppError, Result};

pub const DEFAULT_FEED_URL: &str = "https://rss.nodeseek.com";

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux i686; rv:95.0) Gecko/20100101 Firefox/95.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Seconds between scheduled ingestion runs.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// IANA zone that query bounds are interpreted in.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("feed-archive");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("posts.db").to_string_lossy().to_string()
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_sync_interval() -> u64 {
    600
}

fn default_timezone() -> String {
    "Asia/Shanghai".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            feed_url: default_feed_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout(),
            sync_interval_secs: default_sync_interval(),
            timezone: default_timezone(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config = Self::from_toml_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sync_interval_secs == 0 {
            return Err(AppError::Config(
                "sync_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        url::Url::parse(&self.feed_url)
            .map_err(|e| AppError::Config(format!("invalid feed_url {:?}: {}", self.feed_url, e)))?;
        self.tz()?;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("feed-archive")
            .join("config.toml")
    }

    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| AppError::Config(format!("unknown timezone {:?}", self.timezone)))
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
