//! Static configuration of a check: identity, priority, and schedule.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::duration;

/// Default number of consecutive failures tolerated before a check is broken.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default delay before retrying a failed scheduled check.
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Severity shown to administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    High,
}

/// Health of a scheduled check derived from its failure streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    /// No failures since the last success.
    Healthy,
    /// Failing, but still within the retry budget.
    Degraded,
    /// Retry budget exhausted; reported to administrators.
    Broken,
}

/// Settings a check declares for itself. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    pub priority: Priority,
    /// Recurrence interval. `None` makes the check realtime.
    pub perform_every: Option<Duration>,
    pub max_retries: u32,
    /// Only used when `max_retries > 1`.
    pub retry_after: Duration,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            priority: Priority::Low,
            perform_every: None,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_after: DEFAULT_RETRY_AFTER,
        }
    }
}

impl CheckConfig {
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn perform_every(mut self, every: Duration) -> Self {
        self.perform_every = Some(every);
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = retry_after;
        self
    }

    /// Layer operator overrides on top of the check's own settings.
    pub fn apply(mut self, overrides: &CheckOverrides) -> Self {
        if let Some(priority) = overrides.priority {
            self.priority = priority;
        }
        if let Some(every) = overrides.perform_every {
            self.perform_every = Some(every);
        }
        if let Some(max_retries) = overrides.max_retries {
            self.max_retries = max_retries;
        }
        if let Some(retry_after) = overrides.retry_after {
            self.retry_after = retry_after;
        }
        self
    }
}

/// Per-check overrides read from the daemon config (`[checks.<identifier>]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CheckOverrides {
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "duration::deserialize_opt")]
    pub perform_every: Option<Duration>,
    pub max_retries: Option<u32>,
    #[serde(default, deserialize_with = "duration::deserialize_opt")]
    pub retry_after: Option<Duration>,
}

/// Immutable definition of a registered check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckDefinition {
    identifier: String,
    priority: Priority,
    perform_every: Option<Duration>,
    max_retries: u32,
    retry_after: Duration,
}

impl CheckDefinition {
    pub fn new(identifier: impl Into<String>, config: CheckConfig) -> Self {
        Self {
            identifier: identifier.into(),
            priority: config.priority,
            perform_every: config.perform_every,
            max_retries: config.max_retries,
            retry_after: config.retry_after,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn perform_every(&self) -> Option<Duration> {
        self.perform_every
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn retry_after(&self) -> Duration {
        self.retry_after
    }

    pub fn is_scheduled(&self) -> bool {
        self.perform_every.is_some()
    }

    pub fn is_realtime(&self) -> bool {
        !self.is_scheduled()
    }

    /// Scheduling policy, present only for scheduled checks.
    pub fn schedule(&self) -> Option<Schedule> {
        self.perform_every.map(|every| Schedule {
            every,
            max_retries: self.max_retries,
            retry_after: self.retry_after,
        })
    }

    /// Classify a failure streak against this check's retry budget.
    pub fn health_state(&self, blips: u32) -> HealthState {
        if blips == 0 {
            HealthState::Healthy
        } else if blips < self.max_retries {
            HealthState::Degraded
        } else {
            HealthState::Broken
        }
    }
}

/// Next-run policy of a scheduled check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub every: Duration,
    pub max_retries: u32,
    pub retry_after: Duration,
}

impl Schedule {
    /// Next eligible run after a success.
    pub fn after_success(&self, now: u64) -> u64 {
        now.saturating_add(self.every.as_secs())
    }

    /// Next eligible run after a failure, given the blips recorded *before* it.
    ///
    /// Retries after `retry_after` while the streak stays under `max_retries`,
    /// then falls back to the regular interval.
    pub fn after_failure(&self, now: u64, blips: u32) -> u64 {
        if blips.saturating_add(1) < self.max_retries {
            now.saturating_add(self.retry_after.as_secs())
        } else {
            now.saturating_add(self.every.as_secs())
        }
    }
}

/// Lower-snake-case identifier for a check type name.
///
/// Module paths are stripped (`checks::TwitterLogin` → `twitter_login`) and
/// acronyms stay together (`HTTPProbe` → `http_probe`).
pub fn identifier_for(type_name: &str) -> String {
    let name = type_name.rsplit("::").next().unwrap_or(type_name);
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower);
            if boundary {
                out.push('_');
            }
        }
        match c {
            '-' | ' ' => out.push('_'),
            _ => out.push(c.to_ascii_lowercase()),
        }
    }
    out
}
