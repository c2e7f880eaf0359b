use std::sync::Arc;

use yarest::config::{Config, DEFAULT_CONFIG_PATH};
use yarest::handler::HandlerOptions;
use yarest::logger;
use yarest::server::{self, ServerSettings, ServerState};

mod demo;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load_from(&config_path)?;
    logger::init(&cfg.logging)?;

    // Worker count from config, CPU cores otherwise
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;
    let listener = server::bind_listener(addr, server::DEFAULT_BACKLOG)?;

    let router = demo::router(HandlerOptions::from_config(&cfg.http))?;
    let state = Arc::new(ServerState::new(router, ServerSettings::from_config(&cfg)));

    logger::log_server_start(&addr, &cfg);
    server::run(listener, state).await;
    Ok(())
}
