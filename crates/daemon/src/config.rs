//! Configuration management for the Filedir daemon.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/filedir/config.toml`.
//!
//! The configuration is read once at startup and never mutated afterwards;
//! handlers receive it through the shared application state.

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("port must be between 1 and 65535, got {0}")]
    InvalidPort(u16),

    #[error("host must not be empty")]
    EmptyHost,

    #[error("max_upload_size must be greater than 0, got {0}")]
    InvalidMaxUploadSize(u64),

    #[error("root_dir must not be empty")]
    EmptyRootDir,

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),

    #[error("listen address is invalid: {0}")]
    InvalidListenAddress(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Default upload size limit (100MB).
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 3000;

/// Extensions accepted by the upload allow-list.
const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "txt", "pdf", "png", "jpg", "jpeg", "gif", "doc", "docx", "xls", "xlsx", "zip", "rar", "mp3",
    "mp4", "avi", "mov", "webp", "js", "html", "css", "json", "py", "cpp", "java",
];

/// Main configuration structure for the Filedir daemon.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// General daemon configuration.
    pub daemon: DaemonConfig,

    /// HTTP listener configuration.
    pub server: ServerConfig,

    /// Storage directory configuration.
    pub storage: StorageConfig,
}

/// General daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,

    /// TCP port to bind.
    pub port: u16,

    /// Answer cross-origin requests from any origin.
    pub cors: bool,

    /// Directory holding `index.html` and the other frontend assets.
    pub frontend_dir: PathBuf,
}

/// Storage directory configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// The single directory backing every entry. Created at startup.
    pub root_dir: PathBuf,

    /// Maximum request body size for uploads in bytes (default: 100MB).
    pub max_upload_size: u64,

    /// Extensions (without the dot) the upload allow-list knows about.
    pub allowed_extensions: Vec<String>,

    /// Reject uploads whose extension is not in `allowed_extensions`.
    ///
    /// Off by default: the allow-list is consulted and misses are logged, but
    /// every file is stored.
    pub enforce_allowed_extensions: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            cors: true,
            frontend_dir: PathBuf::from("static"),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("uploads"),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            enforce_allowed_extensions: false,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("filedir")
        .join("config.toml")
}

impl ServerConfig {
    /// The socket address to listen on.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let host = if self.host == "localhost" {
            "127.0.0.1"
        } else {
            self.host.as_str()
        };
        format!("{}:{}", host, self.port)
            .parse()
            .or_else(|_| format!("[{}]:{}", host, self.port).parse())
            .map_err(|_| ConfigError::InvalidListenAddress(format!("{}:{}", self.host, self.port)))
    }
}

impl StorageConfig {
    /// Whether the allow-list contains the extension of `name`.
    ///
    /// Names without an extension never match.
    pub fn is_extension_allowed(&self, name: &str) -> bool {
        match protocol::kind::extension(name) {
            Some(ext) => self
                .allowed_extensions
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(&ext)),
            None => false,
        }
    }
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - FILEDIR_ROOT: Override the storage root directory
    /// - FILEDIR_HOST: Override the listen host
    /// - FILEDIR_PORT: Override the listen port
    /// - FILEDIR_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Some(root) = non_empty_env("FILEDIR_ROOT") {
            tracing::info!("Overriding root_dir from environment: {}", root);
            self.storage.root_dir = PathBuf::from(root);
        }

        if let Some(host) = non_empty_env("FILEDIR_HOST") {
            tracing::info!("Overriding host from environment: {}", host);
            self.server.host = host;
        }

        if let Some(port) = non_empty_env("FILEDIR_PORT") {
            match port.parse() {
                Ok(port) => {
                    tracing::info!("Overriding port from environment: {}", port);
                    self.server.port = port;
                }
                Err(_) => {
                    tracing::warn!("Ignoring invalid FILEDIR_PORT value: {}", port);
                }
            }
        }

        if let Some(level) = non_empty_env("FILEDIR_LOG_LEVEL") {
            tracing::info!("Overriding log_level from environment: {}", level);
            self.daemon.log_level = level;
        }
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort(self.server.port));
        }

        self.server.listen_addr()?;

        if self.storage.max_upload_size == 0 {
            return Err(ConfigError::InvalidMaxUploadSize(self.storage.max_upload_size));
        }

        if self.storage.root_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyRootDir);
        }

        let level = self.daemon.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.daemon.log_level.clone()));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
