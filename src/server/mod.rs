// Server module entry point
// Accept loop, connection serving and shutdown handling

pub mod connection;
pub mod listener;
pub mod signal;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::Duration;

use hyper::header::HeaderValue;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::logger::{self, AccessLogFormat};
use crate::routing::Router;

pub use listener::{bind_listener, DEFAULT_BACKLOG};

/// Connection-level settings derived from configuration
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// `Server` header value, `None` when not a valid header value
    pub server_name: Option<HeaderValue>,
    pub max_body_size: u64,
    pub max_connections: Option<u64>,
    pub keep_alive: Duration,
    pub read_timeout: Duration,
    /// Access log format, `None` when access logging is off
    pub access_log: Option<AccessLogFormat>,
}

impl ServerSettings {
    pub fn from_config(config: &Config) -> Self {
        let server_name = match HeaderValue::from_str(&config.http.server_name) {
            Ok(v) => Some(v),
            Err(e) => {
                logger::log_warning(&format!("Ignoring invalid server_name: {e}"));
                None
            }
        };

        Self {
            server_name,
            max_body_size: config.http.max_body_size,
            max_connections: config.performance.max_connections,
            keep_alive: config.performance.keep_alive(),
            read_timeout: config.performance.read_timeout(),
            access_log: config
                .logging
                .access_log
                .then(|| AccessLogFormat::from(config.logging.access_log_format.as_str())),
        }
    }
}

/// State shared by every connection
pub struct ServerState {
    pub router: Router,
    pub settings: ServerSettings,
    pub active_connections: AtomicUsize,
}

impl ServerState {
    pub const fn new(router: Router, settings: ServerSettings) -> Self {
        Self {
            router,
            settings,
            active_connections: AtomicUsize::new(0),
        }
    }
}

/// Accept connections until a shutdown signal arrives
pub async fn run(listener: TcpListener, state: Arc<ServerState>) {
    let shutdown = signal::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accept_result = listener.accept() => match accept_result {
                Ok((stream, peer_addr)) => connection::accept_connection(stream, peer_addr, &state),
                Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
            },
            () = &mut shutdown => break,
        }
    }

    logger::log_info("Server stopped accepting connections");
}
