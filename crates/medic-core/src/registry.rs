//! Catalog of known checks, built once at startup.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::check::Check;
use crate::data::CheckData;
use crate::definition::{identifier_for, CheckDefinition, CheckOverrides};
use crate::error::{CheckError, CheckResult};

/// A check together with its definition and default input data.
#[derive(Clone)]
pub struct RegisteredCheck {
    definition: CheckDefinition,
    check: Arc<dyn Check>,
    defaults: CheckData,
}

impl RegisteredCheck {
    pub fn definition(&self) -> &CheckDefinition {
        &self.definition
    }

    pub fn identifier(&self) -> &str {
        self.definition.identifier()
    }

    pub fn check(&self) -> &dyn Check {
        self.check.as_ref()
    }

    /// Input data used when a caller supplies none.
    pub fn defaults(&self) -> &CheckData {
        &self.defaults
    }
}

impl std::fmt::Debug for RegisteredCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCheck")
            .field("definition", &self.definition)
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}

/// Explicit table of checks keyed by identifier.
#[derive(Debug, Default)]
pub struct CheckRegistry {
    checks: BTreeMap<String, RegisteredCheck>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check with its own settings.
    pub fn register<C: Check + 'static>(&mut self, check: C) -> CheckResult<&CheckDefinition> {
        self.register_with(check, &CheckOverrides::default(), CheckData::new())
    }

    /// Register a check with operator overrides and default input data.
    pub fn register_with<C: Check + 'static>(
        &mut self,
        check: C,
        overrides: &CheckOverrides,
        defaults: CheckData,
    ) -> CheckResult<&CheckDefinition> {
        let identifier = Self::identifier_for(&check);
        if self.checks.contains_key(&identifier) {
            return Err(CheckError::DuplicateCheck(identifier));
        }

        let definition = CheckDefinition::new(identifier.clone(), check.config().apply(overrides));
        debug!(
            %identifier,
            scheduled = definition.is_scheduled(),
            priority = ?definition.priority(),
            "problem check registered"
        );

        let entry = self.checks.entry(identifier).or_insert(RegisteredCheck {
            definition,
            check: Arc::new(check),
            defaults,
        });
        Ok(&entry.definition)
    }

    /// Identifier a check is (or would be) registered under.
    pub fn identifier_for(check: &dyn Check) -> String {
        identifier_for(check.name())
    }

    pub fn lookup(&self, identifier: &str) -> CheckResult<&RegisteredCheck> {
        self.checks
            .get(identifier)
            .ok_or_else(|| CheckError::NotFound(identifier.to_string()))
    }

    pub fn all(&self) -> impl Iterator<Item = &RegisteredCheck> {
        self.checks.values()
    }

    pub fn scheduled(&self) -> impl Iterator<Item = &RegisteredCheck> {
        self.all().filter(|c| c.definition.is_scheduled())
    }

    pub fn realtime(&self) -> impl Iterator<Item = &RegisteredCheck> {
        self.all().filter(|c| c.definition.is_realtime())
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}
