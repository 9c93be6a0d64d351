use crate::config::parse::{apply_port_override, validate_config};
use crate::config::{load_config, Config, ConfigError};
use crate::dispatch::{Dispatcher, DispatcherSettings, MockWorkUnit, WorkUnit};
use crate::ingest::IngestService;
use crate::queue::PriorityQueue;
use crate::storage::{Ledger, MemoryLedger};
use crate::web::{run_server, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("web server error: {0}")]
    WebServer(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub async fn run(config_path: Option<PathBuf>) -> Result<(), RunError> {
    let config = match config_path {
        Some(path) => {
            info!(config_path = %path.display(), "Loading configuration");
            load_config(&path)?
        }
        None => {
            info!("No config file found, using defaults");
            let mut config = Config::default();
            apply_port_override(&mut config, std::env::var("PORT").ok().as_deref())?;
            validate_config(&config)?;
            config
        }
    };

    run_with_config(config).await
}

/// Wire the queue, ledger, dispatcher and web server together and run until
/// Ctrl+C or until the web server stops on its own.
pub async fn run_with_config(config: Config) -> Result<(), RunError> {
    let queue = PriorityQueue::shared();
    let ledger: Arc<dyn Ledger> = Arc::new(MemoryLedger::new());
    let work_unit: Arc<dyn WorkUnit> = Arc::new(MockWorkUnit::from(&config.work_unit));

    let dispatcher = Dispatcher::new(
        Arc::clone(&queue),
        Arc::clone(&ledger),
        work_unit,
        DispatcherSettings::from(&config.dispatcher),
    );
    let stats = dispatcher.stats();
    let ingest = Arc::new(IngestService::new(
        queue,
        ledger,
        config.dispatcher.batch_size,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    info!("Starting dispatcher");
    let dispatcher_handle = dispatcher.spawn(shutdown_rx.clone());

    info!("Starting web server on {}", config.web.listen);
    let state = AppState::new(ingest, stats);
    let mut web_handle = tokio::spawn(run_server(state, config.web.clone(), shutdown_rx));

    let early_exit = tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            None
        }
        result = &mut web_handle => Some(result),
    };

    let _ = shutdown_tx.send(true);

    let web_result = match early_exit {
        Some(result) => result,
        None => web_handle.await,
    };

    match dispatcher_handle.await {
        Ok(()) => info!("Dispatcher stopped"),
        Err(e) => error!(error = %e, "Dispatcher task join error"),
    }

    web_result??;
    info!("Shutdown complete");
    Ok(())
}
