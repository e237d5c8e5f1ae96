//! Tracker row persisted for every problem check.
//!
//! Timestamps are Unix seconds. A `None` `next_run_at` means the check is
//! eligible immediately.

use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};
use crate::store::TrackerStore;

/// Execution state of a single check, keyed by its identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckTracker {
    pub identifier: String,
    /// Consecutive failures since the last success.
    #[serde(default)]
    pub blips: u32,
    pub last_problem_at: Option<u64>,
    pub last_success_at: Option<u64>,
    pub last_run_at: Option<u64>,
    pub next_run_at: Option<u64>,
    /// Set when the row has not been written to the store yet.
    #[serde(skip)]
    new_record: bool,
}

impl CheckTracker {
    /// A fresh, unpersisted tracker with zeroed counters.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            blips: 0,
            last_problem_at: None,
            last_success_at: None,
            last_run_at: None,
            next_run_at: None,
            new_record: true,
        }
    }

    /// Whether this instance was built in memory and never persisted.
    pub fn is_new_record(&self) -> bool {
        self.new_record
    }

    /// True when no next run is scheduled or the scheduled time has arrived.
    pub fn ready_to_run(&self, now: u64) -> bool {
        match self.next_run_at {
            None => true,
            Some(next) => next <= now,
        }
    }

    /// Apply a failed run in memory.
    pub fn record_problem(&mut self, now: u64, next_run_at: u64) {
        self.blips = self.blips.saturating_add(1);
        self.last_problem_at = Some(now);
        self.last_run_at = Some(now);
        self.next_run_at = Some(next_run_at);
    }

    /// Apply a successful run in memory. Clears the failure streak.
    pub fn record_no_problem(&mut self, now: u64, next_run_at: u64) {
        self.blips = 0;
        self.last_success_at = Some(now);
        self.last_run_at = Some(now);
        self.next_run_at = Some(next_run_at);
    }

    /// Record a failed run and persist it; `self` is refreshed from the committed row.
    pub fn problem(&mut self, store: &TrackerStore, now: u64, next_run_at: u64) -> StateResult<()> {
        *self = store.problem(&self.identifier, now, next_run_at)?;
        Ok(())
    }

    /// Record a successful run and persist it; `self` is refreshed from the committed row.
    pub fn no_problem(
        &mut self,
        store: &TrackerStore,
        now: u64,
        next_run_at: u64,
    ) -> StateResult<()> {
        *self = store.no_problem(&self.identifier, now, next_run_at)?;
        Ok(())
    }

    /// Row-level constraints enforced before every write.
    pub fn validate(&self) -> StateResult<()> {
        if self.identifier.trim().is_empty() {
            return Err(StateError::Validation("identifier can't be blank".to_string()));
        }
        Ok(())
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.new_record = false;
    }
}
