//! redb table definitions for the Medic tracker store.

use redb::TableDefinition;

/// Check execution trackers keyed by check identifier (e.g. `twitter_login`).
pub const CHECK_TRACKERS: TableDefinition<&str, &[u8]> = TableDefinition::new("check_trackers");
