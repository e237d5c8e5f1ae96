//! Message catalog used to render problem text.
//!
//! Locale files are TOML; nested tables flatten into dotted keys and
//! templates interpolate `%{name}` placeholders:
//!
//! ```toml
//! [problem_check.twitter_login]
//! message = "Twitter login is failing. Check the credentials at %{base_path}/admin/settings."
//! ```

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use tracing::debug;

use crate::error::{CheckError, CheckResult};

/// Named interpolation values.
pub type Params = BTreeMap<String, String>;

/// Looks up a template by key and renders it with named parameters.
pub trait Localizer: Send + Sync {
    fn translate(&self, key: &str, params: &Params) -> String;
}

/// In-memory catalog of message templates.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, String>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_toml_str(source: &str) -> CheckResult<Self> {
        let table: toml::Table =
            toml::from_str(source).map_err(|e| CheckError::Locale(e.to_string()))?;
        let mut catalog = Self::empty();
        flatten(&mut catalog.entries, "", &table);
        debug!(entries = catalog.entries.len(), "locale catalog loaded");
        Ok(catalog)
    }

    pub fn from_file(path: &Path) -> CheckResult<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| CheckError::Locale(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.entries.insert(key.into(), template.into());
    }

    /// Entries of `other` win over entries of `self`.
    pub fn merge(&mut self, other: Catalog) {
        self.entries.extend(other.entries);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Localizer for Catalog {
    fn translate(&self, key: &str, params: &Params) -> String {
        match self.entries.get(key) {
            Some(template) => interpolate(template, params),
            None => format!("translation missing: {key}"),
        }
    }
}

fn flatten(out: &mut HashMap<String, String>, prefix: &str, table: &toml::Table) {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::Table(inner) => flatten(out, &full, inner),
            toml::Value::String(s) => {
                out.insert(full, s.clone());
            }
            other => {
                out.insert(full, other.to_string());
            }
        }
    }
}

/// Replace `%{name}` placeholders. Unknown placeholders are left untouched.
pub fn interpolate(template: &str, params: &Params) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("%{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                match params.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("%{");
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
