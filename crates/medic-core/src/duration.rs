//! Human-readable durations: `"500ms"`, `"30s"`, `"5m"`, `"1h"`, `"2d"`.
//!
//! A bare number is read as seconds.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

/// Parse a duration string like "5s", "500ms", "1m", "1h".
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        scaled(mins, 60)
    } else if let Some(hours) = s.strip_suffix('h') {
        scaled(hours, 3600)
    } else if let Some(days) = s.strip_suffix('d') {
        scaled(days, 86_400)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

fn scaled(count: &str, unit_secs: u64) -> Option<Duration> {
    let count = count.trim().parse::<u64>().ok()?;
    count.checked_mul(unit_secs).map(Duration::from_secs)
}

/// `deserialize_with` helper for a required duration string.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_duration(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid duration `{raw}`")))
}

/// `deserialize_with` helper for an optional duration string.
pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_duration(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration `{raw}`"))),
        None => Ok(None),
    }
}
