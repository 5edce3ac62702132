use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Online,
    Idle,
    Dnd,
    Invisible,
    Offline,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Online => write!(f, "online"),
            Status::Idle => write!(f, "idle"),
            Status::Dnd => write!(f, "dnd"),
            Status::Invisible => write!(f, "invisible"),
            Status::Offline => write!(f, "offline"),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub token: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub mirrors: Vec<MirrorConfig>,
    /// Guild id -> ordered rewrite pairs.
    #[serde(default)]
    pub mentions: HashMap<String, Vec<MentionPair>>,
}

/// Binds a set of source channels to a set of destination webhooks.
#[derive(Debug, Deserialize, Clone)]
pub struct MirrorConfig {
    pub channel_ids: Vec<String>,
    pub webhook_urls: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct MentionPair {
    pub original: String,
    pub replaced: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    #[serde(default = "default_min_webhook_delay")]
    pub min_webhook_delay_ms: u64,
    #[serde(default = "default_max_webhook_delay")]
    pub max_webhook_delay_ms: u64,
    #[serde(default = "default_min_batch_delay")]
    pub min_batch_delay_ms: u64,
    #[serde(default = "default_max_batch_delay")]
    pub max_batch_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_webhook_delay_ms: default_min_webhook_delay(),
            max_webhook_delay_ms: default_max_webhook_delay(),
            min_batch_delay_ms: default_min_batch_delay(),
            max_batch_delay_ms: default_max_batch_delay(),
        }
    }
}

fn default_min_webhook_delay() -> u64 {
    1000
}

fn default_max_webhook_delay() -> u64 {
    3000
}

fn default_min_batch_delay() -> u64 {
    5000
}

fn default_max_batch_delay() -> u64 {
    10000
}

impl PacingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_webhook_delay_ms > self.max_webhook_delay_ms {
            return Err(ConfigError::InvalidDelayRange {
                name: "webhook delay",
                min: self.min_webhook_delay_ms,
                max: self.max_webhook_delay_ms,
            });
        }
        if self.min_batch_delay_ms > self.max_batch_delay_ms {
            return Err(ConfigError::InvalidDelayRange {
                name: "batch delay",
                min: self.min_batch_delay_ms,
                max: self.max_batch_delay_ms,
            });
        }
        Ok(())
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        self.pacing.validate()
    }

    /// Number of distinct source channels across all mirror rules.
    pub fn source_channel_count(&self) -> usize {
        self.mirrors.iter().map(|m| m.channel_ids.len()).sum()
    }

    pub fn webhook_count(&self) -> usize {
        self.mirrors.iter().map(|m| m.webhook_urls.len()).sum()
    }
}
