//! medic.toml configuration parser.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use medic_core::duration;
use medic_core::{CheckData, CheckOverrides};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MedicConfig {
    pub server: ServerConfig,
    pub scheduler: SchedulerConfig,
    pub locale: LocaleConfig,
    /// Per-check sections keyed by identifier (`[checks.twitter_login]`).
    pub checks: BTreeMap<String, CheckSection>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub data_dir: PathBuf,
    /// Prefix for links in problem messages, e.g. `/forum`.
    pub base_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            data_dir: PathBuf::from("/var/lib/medic"),
            base_path: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How often to look for due scheduled checks.
    #[serde(deserialize_with = "duration::deserialize")]
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    /// Extra locale file layered over the built-in English messages.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckSection {
    /// `priority`, `perform_every`, `max_retries`, `retry_after`.
    #[serde(flatten)]
    pub overrides: CheckOverrides,
    /// Input data handed to the check on every scheduled or listed run.
    #[serde(default)]
    pub data: CheckData,
}

impl MedicConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: MedicConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn check(&self, identifier: &str) -> Option<&CheckSection> {
        self.checks.get(identifier)
    }

    pub fn db_path(&self) -> PathBuf {
        self.server.data_dir.join("medic.redb")
    }
}

#[cfg(test)]
mod tests {
    use medic_core::Priority;

    use super::*;

    const SAMPLE: &str = r#"
[server]
port = 9000
data_dir = "/tmp/medic"
base_path = "/forum"

[scheduler]
interval = "500ms"

[locale]
path = "locales/de.toml"

[checks.login_provider_reachable]
priority = "low"
perform_every = "5m"
max_retries = 4
retry_after = "45s"

[checks.login_provider_reachable.data]
provider = "Twitter"
address = "api.twitter.com:80"
path = "/health"
"#;

    #[test]
    fn parse_full_config() {
        let config = MedicConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.base_path, "/forum");
        assert_eq!(config.db_path(), PathBuf::from("/tmp/medic/medic.redb"));
        assert_eq!(config.scheduler.interval, Duration::from_millis(500));
        assert_eq!(config.locale.path, Some(PathBuf::from("locales/de.toml")));

        let section = config.check("login_provider_reachable").unwrap();
        let overrides = &section.overrides;
        assert_eq!(overrides.priority, Some(Priority::Low));
        assert_eq!(overrides.perform_every, Some(Duration::from_secs(300)));
        assert_eq!(overrides.max_retries, Some(4));
        assert_eq!(overrides.retry_after, Some(Duration::from_secs(45)));
        assert_eq!(section.data.text("address").unwrap(), "api.twitter.com:80");
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = MedicConfig::parse("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.scheduler.interval, Duration::from_secs(10));
        assert!(config.locale.path.is_none());
        assert!(config.checks.is_empty());
    }

    #[test]
    fn section_without_overrides() {
        let config = MedicConfig::parse("[checks.data_dir_writable]\n").unwrap();
        let section = config.check("data_dir_writable").unwrap();
        assert_eq!(section.overrides, CheckOverrides::default());
        assert!(section.data.is_empty());
    }

    #[test]
    fn bad_override_in_section_is_rejected() {
        assert!(MedicConfig::parse("[checks.x]\nretry_after = \"later\"\n").is_err());
        assert!(MedicConfig::parse("[checks.x]\npriority = \"urgent\"\n").is_err());
    }

    #[test]
    fn bad_duration_is_rejected() {
        let err = MedicConfig::parse("[scheduler]\ninterval = \"soon\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn nested_data_is_rejected() {
        let err = MedicConfig::parse("[checks.x.data]\nlist = [1, 2]\n");
        assert!(err.is_err());
    }

    #[test]
    fn load_without_path() {
        let config = MedicConfig::load(None).unwrap();
        assert_eq!(config.server.data_dir, PathBuf::from("/var/lib/medic"));
    }
}
