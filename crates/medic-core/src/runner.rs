//! CheckRunner — executes a check and records the outcome on its tracker.
//!
//! Scheduled checks translate their outcome into a tracker transition:
//!
//! - no problems → `no_problem(now + perform_every)`
//! - problems or an error → `problem(now + retry_after)` while the streak is
//!   under `max_retries`, `problem(now + perform_every)` once it is not
//!
//! The backoff is computed inside the tracker's write transaction from the
//! committed blip count. Realtime checks skip the tracker entirely.

use std::sync::Arc;

use medic_state::{CheckTracker, TrackerStore};
use tracing::{debug, info, warn};

use crate::check::CheckContext;
use crate::clock::{Clock, SystemClock};
use crate::data::CheckData;
use crate::definition::{HealthState, Schedule};
use crate::error::{CheckError, CheckResult};
use crate::i18n::{Localizer, Params};
use crate::problem::Problem;
use crate::registry::{CheckRegistry, RegisteredCheck};

/// Translation key for a check whose logic raised an error.
pub const FAILED_KEY: &str = "problem_check.failed";

/// Runs checks against a registry, tracker store, and message catalog.
pub struct CheckRunner {
    registry: Arc<CheckRegistry>,
    store: TrackerStore,
    localizer: Arc<dyn Localizer>,
    clock: Arc<dyn Clock>,
    base_path: String,
}

impl CheckRunner {
    pub fn new(
        registry: Arc<CheckRegistry>,
        store: TrackerStore,
        localizer: Arc<dyn Localizer>,
    ) -> Self {
        Self {
            registry,
            store,
            localizer,
            clock: Arc::new(SystemClock),
            base_path: String::new(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Prefix interpolated as `%{base_path}` into problem messages.
    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    pub fn store(&self) -> &TrackerStore {
        &self.store
    }

    pub fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Look up a check by identifier and run it once.
    pub async fn invoke(&self, identifier: &str, data: &CheckData) -> CheckResult<Vec<Problem>> {
        let registered = self.registry.lookup(identifier)?;
        self.run(registered, data).await
    }

    /// Run a check with `data` layered over its defaults.
    ///
    /// For scheduled checks the tracker is updated before returning, including
    /// when the check's logic fails; the failure is then returned as
    /// [`CheckError::Execution`]. A check that rejects a value supplied in
    /// `data` itself returns [`CheckError::InvalidData`] and leaves the
    /// tracker untouched.
    pub async fn run(
        &self,
        registered: &RegisteredCheck,
        data: &CheckData,
    ) -> CheckResult<Vec<Problem>> {
        let merged = registered.defaults().merged(data);
        let identifier = registered.identifier();
        let outcome = match self.execute(registered, &merged).await {
            Err(source) => match rejected_input(source, data) {
                Ok(invalid) => {
                    debug!(%identifier, error = %invalid, "problem check input rejected");
                    return Err(invalid);
                }
                Err(source) => Err(source),
            },
            outcome => outcome,
        };

        let Some(schedule) = registered.definition().schedule() else {
            return outcome.map_err(|source| CheckError::Execution {
                identifier: identifier.to_string(),
                source,
            });
        };

        let now = self.clock.now();
        match outcome {
            Ok(problems) if problems.is_empty() => {
                self.record_success(registered, schedule, now)?;
                Ok(problems)
            }
            Ok(problems) => {
                self.record_failure(registered, schedule, now)?;
                Ok(problems)
            }
            Err(source) => {
                let tracker = self.record_failure(registered, schedule, now)?;
                warn!(
                    %identifier,
                    blips = tracker.blips,
                    error = %source,
                    "problem check raised an error"
                );
                Err(CheckError::Execution {
                    identifier: identifier.to_string(),
                    source,
                })
            }
        }
    }

    /// Current tracker for a check, persisted or freshly initialized.
    pub fn tracker(&self, identifier: &str) -> CheckResult<CheckTracker> {
        Ok(self.store.find_or_initialize(identifier)?)
    }

    /// Health of a scheduled check. Realtime checks are always healthy.
    pub fn health_state(&self, registered: &RegisteredCheck) -> CheckResult<HealthState> {
        if registered.definition().is_realtime() {
            return Ok(HealthState::Healthy);
        }
        let tracker = self.tracker(registered.identifier())?;
        Ok(registered.definition().health_state(tracker.blips))
    }

    /// The check's standard problem, rendered from its default data.
    pub fn standing_problem(&self, registered: &RegisteredCheck) -> Vec<Problem> {
        self.context(registered, registered.defaults()).problem()
    }

    /// A problem describing a check whose logic errored.
    pub fn failure_problem(&self, registered: &RegisteredCheck, error: &CheckError) -> Problem {
        let mut params = Params::new();
        params.insert("base_path".to_string(), self.base_path.clone());
        params.insert("identifier".to_string(), registered.identifier().to_string());
        params.insert("error".to_string(), error.to_string());
        Problem::new(
            self.localizer.translate(FAILED_KEY, &params),
            registered.definition().priority(),
            registered.identifier(),
        )
    }

    fn context<'a>(
        &'a self,
        registered: &'a RegisteredCheck,
        data: &'a CheckData,
    ) -> CheckContext<'a> {
        CheckContext::new(
            registered.definition(),
            registered.check(),
            data,
            self.localizer.as_ref(),
            &self.base_path,
        )
    }

    async fn execute(
        &self,
        registered: &RegisteredCheck,
        data: &CheckData,
    ) -> anyhow::Result<Vec<Problem>> {
        let ctx = self.context(registered, data);
        debug!(identifier = %registered.identifier(), "running problem check");
        registered.check().call(&ctx).await
    }

    fn record_success(
        &self,
        registered: &RegisteredCheck,
        schedule: Schedule,
        now: u64,
    ) -> CheckResult<CheckTracker> {
        let identifier = registered.identifier();
        let mut previous_blips = 0;
        let tracker = self.store.update(identifier, |t| {
            previous_blips = t.blips;
            t.record_no_problem(now, schedule.after_success(now));
        })?;

        if previous_blips > 0 {
            info!(%identifier, previous_blips, "problem check recovered");
        }
        Ok(tracker)
    }

    fn record_failure(
        &self,
        registered: &RegisteredCheck,
        schedule: Schedule,
        now: u64,
    ) -> CheckResult<CheckTracker> {
        let identifier = registered.identifier();
        let tracker = self.store.update(identifier, |t| {
            let next_run_at = schedule.after_failure(now, t.blips);
            t.record_problem(now, next_run_at);
        })?;

        let state = registered.definition().health_state(tracker.blips);
        if state == HealthState::Broken {
            warn!(
                %identifier,
                blips = tracker.blips,
                max_retries = schedule.max_retries,
                "problem check is broken"
            );
        } else {
            debug!(
                %identifier,
                blips = tracker.blips,
                next_run_at = ?tracker.next_run_at,
                "problem check will retry"
            );
        }
        Ok(tracker)
    }
}

/// Recover an `InvalidData` error raised for a key the caller supplied.
fn rejected_input(
    source: anyhow::Error,
    request: &CheckData,
) -> Result<CheckError, anyhow::Error> {
    match source.downcast::<CheckError>() {
        Ok(CheckError::InvalidData { key, reason }) if request.get(&key).is_some() => {
            Ok(CheckError::InvalidData { key, reason })
        }
        Ok(other) => Err(anyhow::Error::new(other)),
        Err(source) => Err(source),
    }
}
