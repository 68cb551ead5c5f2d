use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::providers::workers_ai::DEFAULT_API_BASE_URL;

/// Which key-value backend holds session history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// No store; client-supplied history is trusted
    None,
    /// In-process map, lost on restart
    #[default]
    Memory,
    /// One JSON file per session under `dir`
    File { dir: PathBuf },
}

impl StoreConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreConfig::None => "none",
            StoreConfig::Memory => "memory",
            StoreConfig::File { .. } => "file",
        }
    }

    /// Parses `none`, `memory` or `file`; `file` uses `dir` or the default
    /// store directory.
    pub fn parse(kind: &str, dir: Option<PathBuf>) -> Option<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "none" => Some(StoreConfig::None),
            "memory" => Some(StoreConfig::Memory),
            "file" => dir
                .or_else(default_store_dir)
                .map(|dir| StoreConfig::File { dir }),
            _ => None,
        }
    }
}

pub fn default_store_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".relaychat").join("store"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Account identifier for the REST fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    /// API token for the REST fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Base URL of the local inference binding, if one is running
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding_url: Option<String>,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP client timeout for model calls
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account_id: None,
            api_token: None,
            binding_url: None,
            api_base_url: default_api_base_url(),
            store: StoreConfig::default(),
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Loggable view of a [`Config`]; secrets are reduced to presence flags.
#[derive(Debug, Clone, PartialEq)]
pub struct SafeSummary {
    pub account_configured: bool,
    pub api_token_configured: bool,
    pub binding_configured: bool,
    pub store: &'static str,
    pub listen_addr: String,
}

impl Config {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn rest_fallback_configured(&self) -> bool {
        self.account_id.is_some() && self.api_token.is_some()
    }

    pub fn get_safe_summary(&self) -> SafeSummary {
        SafeSummary {
            account_configured: self.account_id.is_some(),
            api_token_configured: self.api_token.is_some(),
            binding_configured: self.binding_url.is_some(),
            store: self.store.kind(),
            listen_addr: self.listen_addr(),
        }
    }
}
