//! Configuration types
//!
//! Settings are read from a YAML file and/or environment variables once at
//! startup. A `.env` file, when present, feeds the environment first. The
//! pagination core only ever sees the resulting values.

use crate::error::{Error, Result};
use crate::observe::DEFAULT_EXCLUDED_OPERATIONS;
use crate::types::{BackoffType, DEFAULT_ID_FIELD};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Dotenv
// ============================================================================

/// Load a `.env` file into the process environment
///
/// With no path, searches the current directory and its parents. Variables
/// already set in the environment are left alone. Returns the loaded file,
/// or `None` when there is no file to load.
pub fn load_dotenv(path: Option<&Path>) -> Result<Option<PathBuf>> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };

    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(Error::config(format!("Failed to load .env file: {e}"))),
    }
}

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete pager configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PagerConfig {
    /// Store connection
    #[serde(default)]
    pub store: StoreConfig,

    /// Page size and key settings
    #[serde(default)]
    pub pagination: PaginationSettings,

    /// Query logging
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Retry policy around each fetch
    #[serde(default)]
    pub retry: RetryConfig,

    /// Optional fetch rate limit
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

impl PagerConfig {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Defaults overlaid with the process environment
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from an environment lookup
    ///
    /// Recognized variables: `MONGODB_URI`, `MONGODB_DATABASE`,
    /// `MONGODB_COLLECTION`, `MONGODB_APP_NAME`, `PAGER_PAGE_SIZE`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(uri) = get("MONGODB_URI") {
            self.store.uri = uri;
        }
        if let Some(database) = get("MONGODB_DATABASE") {
            self.store.database = database;
        }
        if let Some(collection) = get("MONGODB_COLLECTION") {
            self.store.collection = collection;
        }
        if let Some(app_name) = get("MONGODB_APP_NAME") {
            self.store.app_name = app_name;
        }
        if let Some(page_size) = get("PAGER_PAGE_SIZE") {
            self.pagination.page_size = page_size.parse().map_err(|e| {
                Error::invalid_value("PAGER_PAGE_SIZE", format!("'{page_size}': {e}"))
            })?;
        }

        Ok(())
    }

    /// Check all sections
    pub fn validate(&self) -> Result<()> {
        self.store.validate()?;
        self.pagination.validate()?;

        if let Some(rate_limit) = &self.rate_limit {
            if rate_limit.requests_per_second == 0 {
                return Err(Error::invalid_value(
                    "rate_limit.requests_per_second",
                    "must be positive",
                ));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Store Config
// ============================================================================

/// Store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection URI (`mongodb://` or `mongodb+srv://`)
    #[serde(default)]
    pub uri: String,

    /// Database name
    #[serde(default)]
    pub database: String,

    /// Collection name
    #[serde(default)]
    pub collection: String,

    /// Application identifier reported to the server
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Connect and server selection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Server-side time limit per query in milliseconds
    #[serde(default)]
    pub max_time_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: String::new(),
            database: String::new(),
            collection: String::new(),
            app_name: default_app_name(),
            connect_timeout_seconds: default_connect_timeout(),
            max_time_ms: None,
        }
    }
}

fn default_app_name() -> String {
    crate::NAME.to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

impl StoreConfig {
    /// `database.collection`
    pub fn namespace(&self) -> String {
        format!("{}.{}", self.database, self.collection)
    }

    /// Connection URI with the password masked (for logging)
    pub fn masked_uri(&self) -> String {
        if let Ok(mut url) = url::Url::parse(&self.uri) {
            if url.password().is_some() && url.set_password(Some("****")).is_ok() {
                return url.to_string();
            }
            return self.uri.clone();
        }

        // Multi-host URIs are not valid URLs; mask by hand
        if let Some(at_pos) = self.uri.rfind('@') {
            let scheme_end = self.uri.find("://").map_or(0, |p| p + 3);
            if let Some(colon_pos) = self.uri[scheme_end..at_pos].find(':') {
                let before_pass = &self.uri[..=scheme_end + colon_pos];
                let after_at = &self.uri[at_pos..];
                return format!("{before_pass}****{after_at}");
            }
        }
        self.uri.clone()
    }

    /// Check required fields
    pub fn validate(&self) -> Result<()> {
        if self.uri.is_empty() {
            return Err(Error::missing_field("store.uri"));
        }
        let scheme = self.uri.split_once("://").map(|(scheme, _)| scheme);
        if !matches!(scheme, Some("mongodb" | "mongodb+srv")) {
            return Err(Error::invalid_value(
                "store.uri",
                "expected a mongodb:// or mongodb+srv:// URI",
            ));
        }
        if self.database.is_empty() {
            return Err(Error::missing_field("store.database"));
        }
        if self.collection.is_empty() {
            return Err(Error::missing_field("store.collection"));
        }
        Ok(())
    }
}

// ============================================================================
// Pagination Settings
// ============================================================================

/// Page size and key settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationSettings {
    /// Documents per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Identifying key field
    #[serde(default = "default_id_field")]
    pub id_field: String,

    /// Deadline for a single page fetch in seconds
    #[serde(default = "default_fetch_timeout")]
    pub timeout_seconds: u64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            id_field: default_id_field(),
            timeout_seconds: default_fetch_timeout(),
        }
    }
}

fn default_page_size() -> u32 {
    10
}

fn default_id_field() -> String {
    DEFAULT_ID_FIELD.to_string()
}

fn default_fetch_timeout() -> u64 {
    30
}

impl PaginationSettings {
    /// Per-fetch deadline
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Check values
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::invalid_value(
                "pagination.page_size",
                "must be positive",
            ));
        }
        if self.id_field.is_empty() {
            return Err(Error::missing_field("pagination.id_field"));
        }
        if self.timeout_seconds == 0 {
            return Err(Error::invalid_value(
                "pagination.timeout_seconds",
                "must be positive",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Observability Config
// ============================================================================

/// Query logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Install the logging hook
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Operation names never logged
    #[serde(default = "default_excluded_operations")]
    pub excluded_operations: Vec<String>,

    /// Also log driver-level wire commands
    #[serde(default)]
    pub wire_events: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            excluded_operations: default_excluded_operations(),
            wire_events: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_excluded_operations() -> Vec<String> {
    DEFAULT_EXCLUDED_OPERATIONS
        .iter()
        .map(ToString::to_string)
        .collect()
}

// ============================================================================
// Retry Config
// ============================================================================

/// Retry policy for retryable fetch failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries (0 disables retrying)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff between attempts
    #[serde(default)]
    pub backoff: BackoffConfig,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff: BackoffConfig::default(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

/// Backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    10_000
}

// ============================================================================
// Rate Limit Config
// ============================================================================

/// Fetch rate limit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum fetches per second
    pub requests_per_second: u32,

    /// Burst size
    #[serde(default = "default_burst")]
    pub burst_size: u32,
}

fn default_burst() -> u32 {
    1
}
