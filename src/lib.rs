pub mod authorization;
pub mod config;
pub mod db;
pub mod intelligence;
mod log_audit;
pub mod models;
pub mod notify;

use std::sync::Arc;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::db::{DatabaseError, SqliteStore};
use crate::intelligence::{start_sweep_scheduler, AlertOrchestrator, DedupWindow, PeriodicSweep};
use crate::notify::{
    DispatchError, NotificationDispatcher, OutboxChannel, RealtimeChannel, SessionHub,
};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Session hub error: {0}")]
    Hub(#[from] DispatchError),
}

/// Install the fmt subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Running alerting service: the engine callers use, plus the pieces that
/// must outlive it (hub for session attach, sweep handle for shutdown).
pub struct AlertingService {
    pub store: Arc<SqliteStore>,
    pub hub: Arc<SessionHub>,
    pub engine: Arc<AlertOrchestrator>,
    pub sweep: Arc<PeriodicSweep>,
}

impl AlertingService {
    /// Wire the pipeline over an opened store. Every active user is registered
    /// with the hub so role pushes can reach them before they first connect.
    pub fn build(store: Arc<SqliteStore>, config: config::AlertingConfig) -> Result<Self, StartupError> {
        let hub = Arc::new(SessionHub::new());
        for user in store.active_users()? {
            hub.register_user(user.id, user.role)?;
        }

        let dispatcher = NotificationDispatcher::new(
            vec![
                Box::new(RealtimeChannel::new(hub.clone())),
                Box::new(OutboxChannel::new(store.clone())),
            ],
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(DedupWindow::new()),
            config.notify_policy(),
        );

        let engine = Arc::new(AlertOrchestrator::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(dispatcher),
            Arc::new(DedupWindow::new()),
            config,
        ));
        let sweep = Arc::new(PeriodicSweep::new(engine.clone()));

        Ok(Self {
            store,
            hub,
            engine,
            sweep,
        })
    }
}

/// Open the database, start the sweep scheduler and block until Ctrl-C.
pub fn run() -> Result<(), StartupError> {
    init_tracing();
    tracing::info!("Gestantes alerting starting v{}", config::APP_VERSION);

    let config = config::AlertingConfig::from_env();
    std::fs::create_dir_all(config::app_data_dir())?;
    let store = Arc::new(SqliteStore::open(&config::database_path())?);

    let interval = config.sweep_interval();
    let service = AlertingService::build(store, config)?;
    let _sweeper = start_sweep_scheduler(service.sweep.clone(), interval);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Signal handler failed");
        }
    });

    tracing::info!("Gestantes alerting shutting down");
    Ok(())
}
