//! Service configuration
//!
//! The file location comes from `--config`, then `CONFIG_PATH`, then
//! `auth-selector.toml`. Values in the file fall back to defaults;
//! `SELECTOR_STRATEGY` overrides `selector.strategy` when set.

use auth_selector::Strategy;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub selector: SelectorConfig,
    pub credentials: CredentialsConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Selection strategy settings
#[derive(Debug, Deserialize)]
pub struct SelectorConfig {
    #[serde(default)]
    pub strategy: Strategy,
    /// Per-credential in-flight cap, concurrency-aware only. `<= 0` means default.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: i64,
}

/// Credential snapshot location
#[derive(Debug, Deserialize)]
pub struct CredentialsConfig {
    pub path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            max_connections: default_max_connections(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8317))
}

fn default_max_connections() -> usize {
    1000
}

fn default_max_concurrent() -> i64 {
    2
}

impl Config {
    /// Parse and validate the TOML file at `path`, then apply env overrides.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if config.credentials.path.as_os_str().is_empty() {
            return Err(common::Error::Config(
                "credentials.path must not be empty".into(),
            ));
        }

        if let Ok(strategy) = std::env::var("SELECTOR_STRATEGY") {
            config.selector.strategy = strategy
                .parse()
                .map_err(|e| common::Error::Config(format!("SELECTOR_STRATEGY: {e}")))?;
        }

        Ok(config)
    }

    /// Pick the config file location.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("auth-selector.toml")
    }
}
