//! medic-core — problem checks and the machinery that runs them.
//!
//! A *check* is a diagnostic routine that inspects system state and reports
//! zero or more [`Problem`]s for administrators. Checks are registered once at
//! startup into a [`CheckRegistry`]; each gets an immutable
//! [`CheckDefinition`] carrying its identifier, priority, and schedule.
//!
//! # Architecture
//!
//! ```text
//! CheckRegistry (identifier → RegisteredCheck)
//!   └── CheckRunner
//!       ├── Check::call(CheckContext) → Vec<Problem> | error
//!       ├── Localizer (problem messages)
//!       └── TrackerStore (scheduled checks only)
//!           ├── success  → no_problem(now + perform_every)
//!           └── failure  → problem(now + retry_after | perform_every)
//! ```
//!
//! Scheduled checks (with `perform_every`) are rate-limited by their tracker
//! and retried after `retry_after` until `max_retries` consecutive failures,
//! then fall back to their normal cadence. Realtime checks run on demand and
//! never touch the tracker.

pub mod check;
pub mod clock;
pub mod collect;
pub mod data;
pub mod definition;
pub mod duration;
pub mod error;
pub mod i18n;
pub mod problem;
pub mod registry;
pub mod runner;

pub use check::{Check, CheckContext, CheckFuture};
pub use clock::{Clock, ManualClock, SystemClock};
pub use collect::collect_problems;
pub use data::{CheckData, DataValue};
pub use definition::{
    identifier_for, CheckConfig, CheckDefinition, CheckOverrides, HealthState, Priority, Schedule,
};
pub use error::{CheckError, CheckResult};
pub use i18n::{Catalog, Localizer, Params};
pub use problem::Problem;
pub use registry::{CheckRegistry, RegisteredCheck};
pub use runner::CheckRunner;
