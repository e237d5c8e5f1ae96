//! CheckScheduler — the periodic loop for scheduled checks.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use medic_core::{CheckData, CheckError, CheckRunner, RegisteredCheck};

/// Outcome counts for one pass over the scheduled checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Checks that were due and executed.
    pub ran: u32,
    /// Executed checks that reported no problem.
    pub healthy: u32,
    /// Executed checks that reported at least one problem.
    pub problems: u32,
    /// Checks whose logic errored, or whose tracker could not be read or written.
    pub failed: u32,
    /// Checks that were not due yet.
    pub skipped: u32,
}

/// Runs due scheduled checks on a fixed interval.
pub struct CheckScheduler {
    runner: Arc<CheckRunner>,
}

impl CheckScheduler {
    pub fn new(runner: Arc<CheckRunner>) -> Self {
        Self { runner }
    }

    /// Identifiers of scheduled checks that are due now.
    pub fn due(&self) -> Vec<String> {
        let now = self.runner.now();
        self.runner
            .registry()
            .scheduled()
            .filter(|registered| matches!(self.is_due(registered, now), Ok(true)))
            .map(|registered| registered.identifier().to_string())
            .collect()
    }

    /// Run every due scheduled check once, sequentially.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();
        let now = self.runner.now();
        let no_data = CheckData::new();

        for registered in self.runner.registry().scheduled() {
            let identifier = registered.identifier();
            match self.is_due(registered, now) {
                Ok(true) => {}
                Ok(false) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!(%identifier, error = %e, "failed to load tracker");
                    report.failed += 1;
                    continue;
                }
            }

            report.ran += 1;
            match self.runner.run(registered, &no_data).await {
                Ok(problems) if problems.is_empty() => report.healthy += 1,
                Ok(problems) => {
                    debug!(%identifier, count = problems.len(), "problem check reported problems");
                    report.problems += 1;
                }
                Err(CheckError::Execution { source, .. }) => {
                    // Already recorded on the tracker by the runner.
                    debug!(%identifier, error = %source, "problem check errored");
                    report.failed += 1;
                }
                Err(e) => {
                    error!(%identifier, error = %e, "problem check could not be recorded");
                    report.failed += 1;
                }
            }
        }

        if report.ran > 0 {
            info!(
                ran = report.ran,
                healthy = report.healthy,
                problems = report.problems,
                failed = report.failed,
                skipped = report.skipped,
                "scheduled problem checks ran"
            );
        }
        report
    }

    /// Tick every `interval` until `shutdown` flips.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = interval.as_secs(), "problem check scheduler started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.tick().await;
                    if report.failed > 0 {
                        warn!(failed = report.failed, "some problem checks failed this tick");
                    }
                }
                _ = shutdown.changed() => {
                    info!("problem check scheduler shutting down");
                    break;
                }
            }
        }
    }

    fn is_due(&self, registered: &RegisteredCheck, now: u64) -> Result<bool, CheckError> {
        let tracker = self.runner.tracker(registered.identifier())?;
        Ok(tracker.ready_to_run(now))
    }
}
