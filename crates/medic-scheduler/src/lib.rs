//! medic-scheduler — drives scheduled problem checks.
//!
//! On every tick the scheduler walks the registry's scheduled checks, skips
//! the ones whose tracker says they are not due, and runs the rest through the
//! `CheckRunner`. A failing check, or a tracker store error for one check, is
//! logged and counted; it never stops the remaining checks.
//!
//! # Architecture
//!
//! ```text
//! CheckScheduler
//!   ├── tokio interval loop (stops on watch shutdown signal)
//!   └── tick()
//!       ├── TrackerStore::find_or_initialize → ready_to_run(now)?
//!       └── CheckRunner::run → tracker transition
//! ```

pub mod scheduler;

pub use scheduler::{CheckScheduler, TickReport};
