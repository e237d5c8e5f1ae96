//! medic-state — persisted execution trackers for Medic problem checks.
//!
//! Backed by [redb](https://docs.rs/redb), holds one [`CheckTracker`] row per
//! check identifier: consecutive failure count ("blips") and the run/success/
//! problem timestamps that decide when a scheduled check may run again.
//!
//! # Architecture
//!
//! Rows are JSON-serialized into redb's `&[u8]` value column, keyed by the
//! check identifier. Every state transition is applied as a read-modify-write
//! inside a single write transaction, so two concurrent runs of the same check
//! never lose an increment.
//!
//! The `TrackerStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::TrackerStore;
pub use types::*;
