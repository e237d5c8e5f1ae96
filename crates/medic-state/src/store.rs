//! TrackerStore — redb-backed persistence for check execution trackers.
//!
//! Reads never write: `find_or_initialize` hands back an unpersisted default
//! when no row exists. Writes happen only through state transitions, each
//! applied as one read-modify-write inside a single write transaction. redb
//! admits one writer at a time, so concurrent transitions on the same
//! identifier are serialized rather than lost.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::CHECK_TRACKERS;
use crate::types::CheckTracker;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe tracker store backed by redb.
#[derive(Clone)]
pub struct TrackerStore {
    db: Arc<Database>,
}

impl TrackerStore {
    /// Open (or create) a persistent tracker store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "tracker store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory tracker store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory tracker store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(CHECK_TRACKERS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Get a persisted tracker by identifier.
    pub fn get(&self, identifier: &str) -> StateResult<Option<CheckTracker>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CHECK_TRACKERS).map_err(map_err!(Table))?;
        match table.get(identifier).map_err(map_err!(Read))? {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Fetch the persisted tracker, or a new unpersisted one with default counters.
    pub fn find_or_initialize(&self, identifier: &str) -> StateResult<CheckTracker> {
        Ok(self
            .get(identifier)?
            .unwrap_or_else(|| CheckTracker::new(identifier)))
    }

    /// List all persisted trackers.
    pub fn list(&self) -> StateResult<Vec<CheckTracker>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CHECK_TRACKERS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            results.push(decode(value.value())?);
        }
        Ok(results)
    }

    /// Create a tracker row. Fails if a row with the same identifier exists.
    pub fn insert(&self, tracker: &CheckTracker) -> StateResult<CheckTracker> {
        tracker.validate()?;
        let key = tracker.identifier.as_str();
        let value = serde_json::to_vec(tracker).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(CHECK_TRACKERS).map_err(map_err!(Table))?;
            if table.get(key).map_err(map_err!(Read))?.is_some() {
                return Err(StateError::Duplicate(key.to_string()));
            }
            table
                .insert(key, value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(identifier = %key, "tracker created");

        let mut stored = tracker.clone();
        stored.mark_persisted();
        Ok(stored)
    }

    /// Atomically load (or initialize), mutate, validate and persist one tracker.
    ///
    /// The closure sees the row as committed inside the write transaction, so
    /// decisions based on `blips` cannot race with another writer.
    pub fn update<F>(&self, identifier: &str, mutate: F) -> StateResult<CheckTracker>
    where
        F: FnOnce(&mut CheckTracker),
    {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let tracker = {
            let mut table = txn.open_table(CHECK_TRACKERS).map_err(map_err!(Table))?;
            let existing = match table.get(identifier).map_err(map_err!(Read))? {
                Some(guard) => Some(decode(guard.value())?),
                None => None,
            };
            let mut tracker = existing.unwrap_or_else(|| CheckTracker::new(identifier));
            mutate(&mut tracker);

            tracker.validate()?;
            if tracker.identifier != identifier {
                return Err(StateError::Validation(format!(
                    "identifier can't change from {identifier} to {}",
                    tracker.identifier
                )));
            }

            let value = serde_json::to_vec(&tracker).map_err(map_err!(Serialize))?;
            table
                .insert(identifier, value.as_slice())
                .map_err(map_err!(Write))?;
            tracker
        };
        txn.commit().map_err(map_err!(Transaction))?;

        let mut tracker = tracker;
        tracker.mark_persisted();
        Ok(tracker)
    }

    /// Record a failed run: bump `blips`, stamp `last_problem_at` and `last_run_at`.
    pub fn problem(
        &self,
        identifier: &str,
        now: u64,
        next_run_at: u64,
    ) -> StateResult<CheckTracker> {
        let tracker = self.update(identifier, |t| t.record_problem(now, next_run_at))?;
        debug!(%identifier, blips = tracker.blips, next_run_at, "tracker recorded problem");
        Ok(tracker)
    }

    /// Record a successful run: reset `blips`, stamp `last_success_at` and `last_run_at`.
    pub fn no_problem(
        &self,
        identifier: &str,
        now: u64,
        next_run_at: u64,
    ) -> StateResult<CheckTracker> {
        let tracker = self.update(identifier, |t| t.record_no_problem(now, next_run_at))?;
        debug!(%identifier, next_run_at, "tracker recorded success");
        Ok(tracker)
    }
}

fn decode(bytes: &[u8]) -> StateResult<CheckTracker> {
    serde_json::from_slice(bytes).map_err(map_err!(Deserialize))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000;
    const HOUR: u64 = 3600;
    const DAY: u64 = 24 * HOUR;

    fn fabricate(
        store: &TrackerStore,
        identifier: &str,
        f: impl FnOnce(&mut CheckTracker),
    ) -> CheckTracker {
        let mut tracker = CheckTracker::new(identifier);
        f(&mut tracker);
        store.insert(&tracker).unwrap()
    }

    // ── Validations ────────────────────────────────────────────────

    #[test]
    fn duplicate_identifier_is_rejected() {
        let store = TrackerStore::open_in_memory().unwrap();
        fabricate(&store, "twitter_login", |_| {});

        let err = store.insert(&CheckTracker::new("twitter_login")).unwrap_err();
        assert!(matches!(err, StateError::Duplicate(id) if id == "twitter_login"));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn blank_identifier_is_rejected() {
        let store = TrackerStore::open_in_memory().unwrap();
        assert!(matches!(
            store.insert(&CheckTracker::new("")),
            Err(StateError::Validation(_))
        ));
        assert!(matches!(
            store.problem("", NOW, NOW + HOUR),
            Err(StateError::Validation(_))
        ));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn identifier_cannot_change_during_update() {
        let store = TrackerStore::open_in_memory().unwrap();
        let err = store
            .update("twitter_login", |t| t.identifier = "facebook_login".to_string())
            .unwrap_err();
        assert!(matches!(err, StateError::Validation(_)));
        assert!(store.get("facebook_login").unwrap().is_none());
        assert!(store.get("twitter_login").unwrap().is_none());
    }

    #[test]
    fn negative_blips_in_stored_row_fail_to_load() {
        let store = TrackerStore::open_in_memory().unwrap();
        let raw = br#"{"identifier":"twitter_login","blips":-1,"last_problem_at":null,"last_success_at":null,"last_run_at":null,"next_run_at":null}"#;
        let txn = store.db.begin_write().unwrap();
        {
            let mut table = txn.open_table(CHECK_TRACKERS).unwrap();
            table.insert("twitter_login", raw.as_slice()).unwrap();
        }
        txn.commit().unwrap();

        assert!(matches!(store.get("twitter_login"), Err(StateError::Deserialize(_))));
    }

    // ── Lookup ─────────────────────────────────────────────────────

    #[test]
    fn find_existing_tracker() {
        let store = TrackerStore::open_in_memory().unwrap();
        let stored = fabricate(&store, "twitter_login", |t| t.blips = 2);

        let found = store.find_or_initialize("twitter_login").unwrap();
        assert!(!found.is_new_record());
        assert_eq!(found, stored);
    }

    #[test]
    fn find_missing_tracker_initializes_without_persisting() {
        let store = TrackerStore::open_in_memory().unwrap();
        fabricate(&store, "twitter_login", |_| {});

        let found = store.find_or_initialize("facebook_login").unwrap();
        assert!(found.is_new_record());
        assert_eq!(found.blips, 0);
        assert!(found.last_run_at.is_none());
        assert!(found.ready_to_run(NOW));
        assert!(store.get("facebook_login").unwrap().is_none());
    }

    // ── Transitions ────────────────────────────────────────────────

    #[test]
    fn problem_updates_counters_and_timestamps() {
        let store = TrackerStore::open_in_memory().unwrap();
        let mut tracker = fabricate(&store, "twitter_login", |t| {
            t.blips = 0;
            t.last_problem_at = Some(NOW - 7 * DAY);
            t.last_success_at = Some(NOW - DAY);
            t.last_run_at = Some(NOW - DAY);
            t.next_run_at = None;
        });

        tracker.problem(&store, NOW, NOW + DAY).unwrap();

        assert_eq!(tracker.blips, 1);
        assert_eq!(tracker.last_problem_at, Some(NOW));
        assert_eq!(tracker.last_run_at, Some(NOW));
        assert_eq!(tracker.last_success_at, Some(NOW - DAY));
        assert_eq!(tracker.next_run_at, Some(NOW + DAY));
        assert_eq!(store.get("twitter_login").unwrap(), Some(tracker));
    }

    #[test]
    fn problem_on_unpersisted_tracker_creates_row() {
        let store = TrackerStore::open_in_memory().unwrap();
        let mut tracker = store.find_or_initialize("twitter_login").unwrap();
        assert!(tracker.is_new_record());

        tracker.problem(&store, NOW, NOW + 30).unwrap();

        assert!(!tracker.is_new_record());
        let stored = store.get("twitter_login").unwrap().unwrap();
        assert_eq!(stored.blips, 1);
        assert_eq!(stored.next_run_at, Some(NOW + 30));
    }

    #[test]
    fn no_problem_resets_blips() {
        let store = TrackerStore::open_in_memory().unwrap();
        let mut tracker = fabricate(&store, "twitter_login", |t| {
            t.blips = 3;
            t.last_problem_at = Some(NOW - HOUR);
            t.last_run_at = Some(NOW - HOUR);
        });

        tracker.no_problem(&store, NOW, NOW + DAY).unwrap();

        assert_eq!(tracker.blips, 0);
        assert_eq!(tracker.last_success_at, Some(NOW));
        assert_eq!(tracker.last_run_at, Some(NOW));
        assert_eq!(tracker.last_problem_at, Some(NOW - HOUR));
        assert_eq!(tracker.next_run_at, Some(NOW + DAY));
    }

    #[test]
    fn transitions_read_committed_state_not_stale_copy() {
        let store = TrackerStore::open_in_memory().unwrap();
        let mut first = store.find_or_initialize("twitter_login").unwrap();
        let mut second = store.find_or_initialize("twitter_login").unwrap();

        first.problem(&store, NOW, NOW + 30).unwrap();
        second.problem(&store, NOW, NOW + 30).unwrap();

        assert_eq!(second.blips, 2);
        assert_eq!(store.get("twitter_login").unwrap().unwrap().blips, 2);
    }

    #[test]
    fn concurrent_problems_are_not_lost() {
        let store = TrackerStore::open_in_memory().unwrap();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        store.problem("twitter_login", NOW, NOW + 30).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.get("twitter_login").unwrap().unwrap().blips, 40);
    }

    #[test]
    fn list_returns_all_rows() {
        let store = TrackerStore::open_in_memory().unwrap();
        store.problem("twitter_login", NOW, NOW + 30).unwrap();
        store.no_problem("facebook_login", NOW, NOW + HOUR).unwrap();

        let mut ids: Vec<_> = store.list().unwrap().into_iter().map(|t| t.identifier).collect();
        ids.sort();
        assert_eq!(ids, vec!["facebook_login", "twitter_login"]);
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("medic.redb");

        {
            let store = TrackerStore::open(&db_path).unwrap();
            store.problem("twitter_login", NOW, NOW + 30).unwrap();
        }

        let store = TrackerStore::open(&db_path).unwrap();
        let tracker = store.find_or_initialize("twitter_login").unwrap();
        assert!(!tracker.is_new_record());
        assert_eq!(tracker.blips, 1);
        assert_eq!(tracker.next_run_at, Some(NOW + 30));
    }
}
