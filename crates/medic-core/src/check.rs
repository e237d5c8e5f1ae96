//! The `Check` trait implemented by every diagnostic.

use std::future::Future;
use std::pin::Pin;

use crate::data::CheckData;
use crate::definition::{CheckConfig, CheckDefinition};
use crate::i18n::{Localizer, Params};
use crate::problem::Problem;

/// Boxed future returned by [`Check::call`].
pub type CheckFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<Vec<Problem>>> + Send + 'a>>;

/// A diagnostic routine reporting zero or more problems.
///
/// Returning an empty list means "no problem". A non-empty list or an error
/// both count as a failed run for scheduled checks.
pub trait Check: Send + Sync {
    /// Type-style name (`TwitterLogin`); the identifier is derived from it.
    fn name(&self) -> &'static str;

    /// Priority and schedule. Realtime, low priority by default.
    fn config(&self) -> CheckConfig {
        CheckConfig::default()
    }

    /// Key of the message template used by [`CheckContext::problem`].
    fn translation_key(&self) -> &str;

    /// Extra interpolation values derived from the input data.
    fn translation_data(&self, _data: &CheckData) -> Params {
        Params::new()
    }

    /// Fixed message that bypasses the catalog.
    fn message(&self) -> Option<String> {
        None
    }

    fn call<'a>(&'a self, ctx: &'a CheckContext<'a>) -> CheckFuture<'a>;
}

/// Everything a check sees while it runs.
pub struct CheckContext<'a> {
    definition: &'a CheckDefinition,
    check: &'a dyn Check,
    data: &'a CheckData,
    localizer: &'a dyn Localizer,
    base_path: &'a str,
}

impl<'a> CheckContext<'a> {
    pub fn new(
        definition: &'a CheckDefinition,
        check: &'a dyn Check,
        data: &'a CheckData,
        localizer: &'a dyn Localizer,
        base_path: &'a str,
    ) -> Self {
        Self {
            definition,
            check,
            data,
            localizer,
            base_path,
        }
    }

    pub fn data(&self) -> &CheckData {
        self.data
    }

    pub fn definition(&self) -> &CheckDefinition {
        self.definition
    }

    pub fn identifier(&self) -> &str {
        self.definition.identifier()
    }

    /// One problem rendered from the check's own translation key.
    pub fn problem(&self) -> Vec<Problem> {
        self.problem_with(None, Params::new())
    }

    /// One problem, optionally with another translation key and extra values.
    ///
    /// Values from [`Check::translation_data`] take precedence over `overrides`.
    pub fn problem_with(&self, key: Option<&str>, overrides: Params) -> Vec<Problem> {
        let message = match self.check.message() {
            Some(message) => message,
            None => {
                let mut params = Params::new();
                params.insert("base_path".to_string(), self.base_path.to_string());
                params.extend(overrides);
                params.extend(self.check.translation_data(self.data));
                let key = key.unwrap_or_else(|| self.check.translation_key());
                self.localizer.translate(key, &params)
            }
        };

        vec![Problem::new(
            message,
            self.definition.priority(),
            self.definition.identifier(),
        )]
    }

    pub fn no_problem(&self) -> Vec<Problem> {
        Vec::new()
    }
}
