//! medicd — the Medic daemon.
//!
//! Assembles the Medic subsystems into one process:
//! - Tracker store (redb)
//! - Built-in problem checks, configured from `medic.toml`
//! - Message catalog (built-in English, optionally layered with a locale file)
//! - Scheduler loop for scheduled checks
//! - REST API

pub mod checks;
pub mod config;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use medic_core::{Catalog, CheckRunner};
use medic_scheduler::CheckScheduler;
use medic_state::TrackerStore;
use tokio::sync::watch;
use tracing::info;

use crate::config::MedicConfig;

/// Built-in English messages.
pub const DEFAULT_LOCALE: &str = include_str!("../locales/en.toml");

/// Built-in messages, with `extra` layered on top when given.
pub fn default_catalog(extra: Option<&Path>) -> anyhow::Result<Catalog> {
    let mut catalog = Catalog::from_toml_str(DEFAULT_LOCALE)?;
    if let Some(path) = extra {
        catalog.merge(Catalog::from_file(path)?);
        info!(path = ?path, "locale file loaded");
    }
    Ok(catalog)
}

/// Runner over the built-in checks using an already opened store.
pub fn runner_with_store(config: &MedicConfig, store: TrackerStore) -> anyhow::Result<CheckRunner> {
    let registry = checks::builtin_registry(config)?;
    let catalog = default_catalog(config.locale.path.as_deref())?;
    info!(checks = registry.len(), "problem checks registered");

    Ok(CheckRunner::new(Arc::new(registry), store, Arc::new(catalog))
        .with_base_path(config.server.base_path.clone()))
}

/// Open the tracker store under `data_dir` and build the runner.
pub fn build_runner(config: &MedicConfig) -> anyhow::Result<Arc<CheckRunner>> {
    std::fs::create_dir_all(&config.server.data_dir)?;
    let db_path = config.db_path();
    let store = TrackerStore::open(&db_path)?;
    info!(path = ?db_path, "tracker store opened");

    Ok(Arc::new(runner_with_store(config, store)?))
}

/// Run the scheduler and API server until Ctrl-C.
pub async fn serve(config: MedicConfig) -> anyhow::Result<()> {
    info!("Medic daemon starting");
    anyhow::ensure!(
        !config.scheduler.interval.is_zero(),
        "[scheduler] interval must be greater than zero"
    );

    let runner = build_runner(&config)?;

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let scheduler = CheckScheduler::new(runner.clone());
    let interval = config.scheduler.interval;
    let scheduler_handle = tokio::spawn(async move {
        scheduler.run(interval, shutdown_rx).await;
    });

    // ── Start API server ───────────────────────────────────────

    let router = medic_api::build_router(runner);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
        }
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    server.await?;

    let _ = scheduler_handle.await;

    info!("Medic daemon stopped");
    Ok(())
}
