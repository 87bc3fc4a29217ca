use crate::dispatcher::{DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "unsubscriber.yaml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Only messages the user tagged with the source label
    Marked,
    /// Everything in the inbox that mentions unsubscribing
    Nuke,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: Mode,
    pub marked_query: String,
    pub nuke_query: String,
    pub source_label: String,
    pub processed_label: String,
    pub failed_label: String,
    pub max_messages_per_run: usize,
    pub http: HttpConfig,
    pub gmail: GmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GmailConfig {
    pub api_base: String,
    /// Environment variable holding the OAuth access token
    pub access_token_env: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    EmptyLabel(&'static str),
    #[error("max_messages_per_run must be at least 1")]
    ZeroMessageLimit,
    #[error("http.timeout_seconds must be greater than 0")]
    ZeroTimeout,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Mode::Marked,
            marked_query: "label:unsubscribe".to_string(),
            nuke_query: "label:inbox \"unsubscribe\"".to_string(),
            source_label: "unsubscribe".to_string(),
            processed_label: "Unsubscribed".to_string(),
            failed_label: "unsubscribe-failed".to_string(),
            max_messages_per_run: 5,
            http: HttpConfig::default(),
            gmail: GmailConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            api_base: "https://gmail.googleapis.com/gmail/v1/users/me".to_string(),
            access_token_env: "GMAIL_ACCESS_TOKEN".to_string(),
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn is_nuke(&self) -> bool {
        self.mode == Mode::Nuke
    }

    pub fn active_query(&self) -> &str {
        match self.mode {
            Mode::Nuke => &self.nuke_query,
            Mode::Marked => &self.marked_query,
        }
    }

    /// The staging label to strip after processing. Only marked mode has one.
    pub fn source_label_in_effect(&self) -> Option<&str> {
        match self.mode {
            Mode::Marked if !self.source_label.trim().is_empty() => Some(&self.source_label),
            _ => None,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processed_label.trim().is_empty() {
            return Err(ConfigError::EmptyLabel("processed_label"));
        }
        if self.failed_label.trim().is_empty() {
            return Err(ConfigError::EmptyLabel("failed_label"));
        }
        if self.max_messages_per_run == 0 {
            return Err(ConfigError::ZeroMessageLimit);
        }
        if self.http.timeout_seconds == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
