// Configuration types module
// Defines all configuration-related data structures

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads, runtime default when unset
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    #[serde(default)]
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    #[serde(default)]
    pub error_log_file: Option<String>,
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// Performance configuration, durations in seconds
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PerformanceConfig {
    pub keep_alive_timeout: u64,
    /// Time allowed for reading a request head and body
    pub read_timeout: u64,
    #[serde(default)]
    pub max_connections: Option<u64>,
}

/// HTTP configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    /// Sent as the `Server` header
    pub server_name: String,
    /// Largest accepted request body in bytes
    pub max_body_size: u64,
    /// Media types offered by negotiation, in preference order
    #[serde(default = "default_representations")]
    pub representations: Vec<String>,
    #[serde(default)]
    pub compression: CompressionConfig,
}

fn default_representations() -> Vec<String> {
    vec!["application/json".to_string(), "application/toml".to_string()]
}

/// Response compression settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct CompressionConfig {
    #[serde(default = "default_compression_enabled")]
    pub enabled: bool,
    /// Bodies smaller than this are sent unencoded
    #[serde(default = "default_compression_min_size")]
    pub min_size: usize,
}

#[allow(clippy::missing_const_for_fn)]
fn default_compression_enabled() -> bool {
    true
}

#[allow(clippy::missing_const_for_fn)]
fn default_compression_min_size() -> usize {
    1024
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: default_compression_enabled(),
            min_size: default_compression_min_size(),
        }
    }
}
