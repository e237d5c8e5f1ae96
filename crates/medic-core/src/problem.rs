//! Problem value reported by checks.

use serde::{Deserialize, Serialize};

use crate::definition::Priority;

/// A single issue detected by a check, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// Rendered, already localized text.
    pub message: String,
    pub priority: Priority,
    /// Identifier of the originating check, for grouping.
    pub identifier: String,
}

impl Problem {
    pub fn new(
        message: impl Into<String>,
        priority: Priority,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            priority,
            identifier: identifier.into(),
        }
    }
}
