// Configuration module entry point
// Layers defaults, an optional TOML file and YAREST_ environment variables

mod types;

use std::net::SocketAddr;
use std::time::Duration;

pub use types::{
    CompressionConfig, Config, HttpConfig, LoggingConfig, PerformanceConfig, ServerConfig,
};

/// Configuration file read when no path is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Environment variable prefix, e.g. `YAREST_SERVER__PORT=9000`
const ENV_PREFIX: &str = "YAREST";

impl Config {
    /// Load configuration from specified file path (extension optional)
    ///
    /// A missing file is not an error; defaults and environment still apply.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("http.server_name", concat!("yarest/", env!("CARGO_PKG_VERSION")))?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

impl PerformanceConfig {
    pub const fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_timeout)
    }

    pub const fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }
}
