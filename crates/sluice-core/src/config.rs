//! Configuration system for Sluice.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $SLUICE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/sluice/config.toml
//!   3. ~/.config/sluice/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SluiceConfig {
    pub network: NetworkConfig,
    pub relay: RelayConfig,
    pub storage: StorageConfig,
    pub services: ServicesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// HTTP API port, bound on 127.0.0.1.
    pub api_port: u16,
    /// TCP echo relay port. 0 = OS-assigned.
    pub echo_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Largest chunk a reader source hands out.
    pub read_buffer_bytes: usize,
    /// Chunks buffered between a relay and an HTTP response body.
    pub channel_capacity: usize,
    /// Upper bound on a single uploaded body.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory served by /files.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub tcp_echo: bool,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

pub const DEFAULT_API_PORT: u16 = 9101;

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            api_port: DEFAULT_API_PORT,
            echo_port: 9102,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            read_buffer_bytes: 64 * 1024,
            channel_capacity: 8,
            max_upload_bytes: 256 * 1024 * 1024,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("files"),
        }
    }
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self { tcp_echo: false }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("sluice")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("sluice")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("relay.{0} must be greater than zero")]
    ZeroSetting(&'static str),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl SluiceConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            Self::parse(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            SluiceConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("SLUICE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&SluiceConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Reject settings the relay cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relay.read_buffer_bytes == 0 {
            return Err(ConfigError::ZeroSetting("read_buffer_bytes"));
        }
        if self.relay.channel_capacity == 0 {
            return Err(ConfigError::ZeroSetting("channel_capacity"));
        }
        Ok(())
    }

    /// Apply SLUICE_* overrides. `lookup` is `std::env::var` outside tests.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(p) = lookup("SLUICE_NETWORK__API_PORT").and_then(|v| v.parse().ok()) {
            self.network.api_port = p;
        }
        if let Some(p) = lookup("SLUICE_NETWORK__ECHO_PORT").and_then(|v| v.parse().ok()) {
            self.network.echo_port = p;
        }
        if let Some(n) = lookup("SLUICE_RELAY__READ_BUFFER_BYTES").and_then(|v| v.parse().ok()) {
            self.relay.read_buffer_bytes = n;
        }
        if let Some(v) = lookup("SLUICE_STORAGE__PATH") {
            self.storage.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("SLUICE_SERVICES__TCP_ECHO") {
            self.services.tcp_echo = v == "true" || v == "1";
        }
    }
}
