//! Configuration management for SFin services.
//!
//! All SFin services share a unified configuration file at `~/.sfin/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Explicit config file values
//! 2. Environment variables (SFIN_* prefix, plus upstream credentials)
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `SFIN_DATA_PORT` → data.port
//! - `SFIN_BIND_ADDRESS` → network.bind
//! - `SFIN_LOG_LEVEL` → observability.log_level
//! - `SFIN_UPSTREAM_URL` → upstream.base_url
//! - `SFIN_CACHE_TTL_SECS` → cache.default_ttl_secs
//! - `SCREENER_EMAIL` → credentials.email
//! - `SCREENER_PASSWORD` → credentials.password

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".sfin"),
        |dirs| dirs.home_dir().join(".sfin"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Network Configuration
// ============================================================================

/// Global network configuration.
///
/// Controls the bind address for the service. Default is `127.0.0.1`
/// (local only). Set to `0.0.0.0` to allow remote access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address for the service.
    #[serde(default = "default_bind_address")]
    pub bind: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

// ============================================================================
// Data Service Configuration
// ============================================================================

/// Data service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataServiceConfig {
    /// Port for the data service
    #[serde(default = "default_data_port")]
    pub port: u16,

    /// Per-request timeout applied at the HTTP layer, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for DataServiceConfig {
    fn default() -> Self {
        Self {
            port: default_data_port(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_data_port() -> u16 {
    4460
}

fn default_request_timeout_secs() -> u64 {
    120
}

// ============================================================================
// Upstream Provider Configuration
// ============================================================================

/// Upstream data provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the upstream website
    #[serde(default = "default_upstream_url")]
    pub base_url: String,

    /// Timeout for a single upstream call, in seconds
    #[serde(default = "default_upstream_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with upstream requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_upstream_url(),
            timeout_secs: default_upstream_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_upstream_url() -> String {
    "https://www.screener.in".into()
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("sfin-data/{}", env!("CARGO_PKG_VERSION"))
}

// ============================================================================
// Upstream Credentials
// ============================================================================

/// Credentials for the upstream website account.
///
/// Usually supplied via `SCREENER_EMAIL` / `SCREENER_PASSWORD` rather than
/// the config file, so the file can be committed to dotfiles safely.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Account email
    #[serde(default)]
    pub email: Option<String>,

    /// Account password
    #[serde(default)]
    pub password: Option<String>,
}

impl CredentialsConfig {
    /// Whether both credential fields are present.
    pub fn is_complete(&self) -> bool {
        self.email.is_some() && self.password.is_some()
    }
}

// ============================================================================
// Cache Configuration
// ============================================================================

/// Result cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Default TTL for cached statements, in seconds.
    /// Fundamentals refresh daily at most, so 24 hours is the default.
    #[serde(default = "default_cache_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Per-statement-kind TTL overrides, keyed by kind slug
    /// (e.g. `"quarterly": 21600`).
    #[serde(default)]
    pub ttl_overrides: HashMap<String, u64>,

    /// Maximum number of cached entries. Unbounded when absent.
    #[serde(default)]
    pub max_entries: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_cache_ttl_secs(),
            ttl_overrides: HashMap::new(),
            max_entries: None,
        }
    }
}

impl CacheConfig {
    /// TTL in seconds for the given kind slug.
    pub fn ttl_secs_for(&self, kind_slug: &str) -> u64 {
        self.ttl_overrides
            .get(kind_slug)
            .copied()
            .unwrap_or(self.default_ttl_secs)
    }
}

fn default_cache_ttl_secs() -> u64 {
    86_400
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Unified configuration for SFin services.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Network configuration
    #[serde(default)]
    pub network: NetworkConfig,

    /// Data service configuration
    #[serde(default)]
    pub data: DataServiceConfig,

    /// Upstream provider configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Upstream account credentials
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Result cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            let mut config = Self::default();
            config.apply_env_overrides();
            return Ok(config);
        }

        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific path, without env overrides.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("SFIN_DATA_PORT") {
            if let Ok(p) = port.parse() {
                self.data.port = p;
            }
        }

        if let Ok(bind) = std::env::var("SFIN_BIND_ADDRESS") {
            self.network.bind = bind;
        }

        if let Ok(level) = std::env::var("SFIN_LOG_LEVEL") {
            self.observability.log_level = level;
        }

        if let Ok(url) = std::env::var("SFIN_UPSTREAM_URL") {
            self.upstream.base_url = url;
        }

        if let Ok(ttl) = std::env::var("SFIN_CACHE_TTL_SECS") {
            if let Ok(secs) = ttl.parse() {
                self.cache.default_ttl_secs = secs;
            }
        }

        if let Ok(email) = std::env::var("SCREENER_EMAIL") {
            self.credentials.email = Some(email);
        }
        if let Ok(password) = std::env::var("SCREENER_PASSWORD") {
            self.credentials.password = Some(password);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
