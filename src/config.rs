use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::version::VERSION;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("failed to write default config file {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to serialize default config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level monitor configuration, read from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

/// SMTP settings for downtime notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "default_smtp_server")]
    pub smtp_server: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub from_email: String,
    #[serde(default)]
    pub to_emails: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,
}

fn default_smtp_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_user_agent() -> String {
    format!("uptime-monitor/{VERSION}")
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    60
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_server: default_smtp_server(),
            smtp_port: default_smtp_port(),
            username: String::new(),
            password: String::new(),
            from_email: String::new(),
            to_emails: Vec::new(),
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            email: EmailConfig::default(),
            general: GeneralConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Loads the configuration from `path`. When the file does not exist, a
    /// default file is written there so the operator has something to edit,
    /// and the defaults are returned.
    ///
    /// A file that exists but cannot be read or parsed is a fatal startup
    /// error, not something to silently fall back from.
    pub fn load_or_create(path: &str) -> Result<Self, ConfigError> {
        let config_path = Path::new(path);

        if config_path.exists() {
            let contents = fs::read_to_string(config_path).map_err(|e| ConfigError::Read {
                path: path.to_string(),
                source: e,
            })?;
            return toml::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.to_string(),
                source: e,
            });
        }

        let config = Self::default();
        let rendered = toml::to_string_pretty(&config)?;
        fs::write(config_path, rendered).map_err(|e| ConfigError::Write {
            path: path.to_string(),
            source: e,
        })?;
        info!(path, "created default config file, update it with your SMTP settings");
        Ok(config)
    }
}
