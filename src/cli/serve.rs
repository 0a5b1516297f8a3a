//! Run the audit HTTP service.

use crate::browser::chromium::ChromiumSessionManager;
use crate::engine::axe::AxeRunner;
use crate::orchestrator::Orchestrator;
use crate::rest::{self, AppState};
use crate::store::{self, ReportStore};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::info;

/// Tunable service options, filled from CLI flags.
pub struct ServeOptions {
    pub port: u16,
    pub retention: Duration,
    pub nav_timeout: Duration,
    pub axe_source: Option<String>,
}

/// Compose the service and serve until interrupted.
pub async fn run(opts: ServeOptions) -> Result<()> {
    let sessions = Arc::new(ChromiumSessionManager::discover()?);
    info!(
        "using Chromium at {}",
        sessions.chrome_path().display()
    );

    let engine = match &opts.axe_source {
        Some(url) => AxeRunner::with_source_url(url),
        None => AxeRunner::new(),
    };

    let store = Arc::new(ReportStore::new(opts.retention));
    let orchestrator = Arc::new(
        Orchestrator::new(sessions, Arc::new(engine), Arc::clone(&store))
            .with_nav_timeout(opts.nav_timeout),
    );

    // Each task gets its own Notify, signaled with notify_one: the stored
    // permit means a signal cannot be lost between select polls.
    let shutdown = Arc::new(Notify::new());
    let sweeper_shutdown = Arc::new(Notify::new());
    let sweeper = store::spawn_sweeper(Arc::clone(&store), Arc::clone(&sweeper_shutdown));

    let shutdown_signal = Arc::clone(&shutdown);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
        shutdown_signal.notify_one();
    });

    let state = Arc::new(AppState {
        orchestrator,
        store,
    });

    info!(
        "starting a11y-audit v{} (retention {}s)",
        env!("CARGO_PKG_VERSION"),
        opts.retention.as_secs()
    );

    let result = tokio::select! {
        r = rest::start(opts.port, state) => r,
        _ = shutdown.notified() => Ok(()),
    };

    sweeper_shutdown.notify_one();
    let _ = sweeper.await;
    info!("a11y-audit stopped");
    result
}
