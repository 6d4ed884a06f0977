use std::sync::Arc;

mod config;
mod error;
mod handler;
mod http;
mod logger;
mod model;
mod server;
mod store;

use logger::LogObserver;
use server::{create_reusable_listener, run_server_loop, start_signal_handler, SignalHandler};

const DEFAULT_CONFIG_PATH: &str = "config";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // First argument: config file path without extension
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;

    logger::init(&cfg)?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = cfg.get_socket_addr()?;

    let store = store::open(&cfg.store).await?;
    let observer = Arc::new(LogObserver::from_config(&cfg.logging));
    let listener = create_reusable_listener(addr)?;

    logger::log_server_start(&addr, &cfg, store.name());

    let state = Arc::new(config::AppState::new(cfg, store, observer));
    let signals = Arc::new(SignalHandler::new());
    start_signal_handler(Arc::clone(&signals));

    run_server_loop(listener, state, signals).await;
    Ok(())
}
