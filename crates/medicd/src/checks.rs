//! Problem checks shipped with the daemon.
//!
//! - `login_provider_reachable`: scheduled HTTP probe against a login
//!   provider. Registered only when `[checks.login_provider_reachable]`
//!   is configured, since it needs an address.
//! - `data_dir_writable`: realtime check that the data directory accepts
//!   writes.

use std::path::Path;
use std::time::Duration;

use medic_core::{
    Check, CheckConfig, CheckContext, CheckData, CheckFuture, CheckRegistry, Params, Priority,
};
use tracing::{debug, warn};

use crate::config::MedicConfig;

/// Timeout applied to a single provider probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

const PROBE_FILE: &str = ".medic-probe";

/// Result of an HTTP probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Healthy,
    /// Answered with a non-2xx status.
    Unhealthy(u16),
    /// Connection, handshake, or request failed, or the probe timed out.
    Failed(String),
}

/// Issue `GET http://{address}{path}` and classify the response.
pub async fn http_probe(address: &str, path: &str, timeout: Duration) -> ProbeResult {
    let uri = format!("http://{address}{path}");

    let result = tokio::time::timeout(timeout, async {
        let stream = match tokio::net::TcpStream::connect(address).await {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, %uri, "provider probe connection failed");
                return ProbeResult::Failed(e.to_string());
            }
        };

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
            Ok(pair) => pair,
            Err(e) => {
                debug!(error = %e, %uri, "provider probe handshake failed");
                return ProbeResult::Failed(e.to_string());
            }
        };

        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = match http::Request::builder()
            .method("GET")
            .uri(&uri)
            .header("host", address)
            .header("user-agent", "medic/0.1")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
        {
            Ok(req) => req,
            Err(e) => return ProbeResult::Failed(e.to_string()),
        };

        match sender.send_request(req).await {
            Ok(resp) if resp.status().is_success() => ProbeResult::Healthy,
            Ok(resp) => {
                debug!(status = %resp.status(), %uri, "provider probe non-2xx");
                ProbeResult::Unhealthy(resp.status().as_u16())
            }
            Err(e) => {
                debug!(error = %e, %uri, "provider probe request failed");
                ProbeResult::Failed(e.to_string())
            }
        }
    })
    .await;

    result.unwrap_or_else(|_| {
        debug!(%uri, "provider probe timed out");
        ProbeResult::Failed("timed out".to_string())
    })
}

// ── Login provider ─────────────────────────────────────────────

/// Reports a problem while the configured login provider does not answer
/// its health endpoint with a 2xx.
///
/// Data: `address` (`host:port`, required), `path` (default `/`),
/// `provider` (display name, defaults to the address).
pub struct LoginProviderReachable {
    timeout: Duration,
}

impl LoginProviderReachable {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for LoginProviderReachable {
    fn default() -> Self {
        Self::new(PROBE_TIMEOUT)
    }
}

impl Check for LoginProviderReachable {
    fn name(&self) -> &'static str {
        "LoginProviderReachable"
    }

    fn config(&self) -> CheckConfig {
        CheckConfig::default()
            .priority(Priority::High)
            .perform_every(Duration::from_secs(3600))
    }

    fn translation_key(&self) -> &str {
        "problem_check.login_provider_reachable.message"
    }

    fn translation_data(&self, data: &CheckData) -> Params {
        let address = data.opt_text("address").ok().flatten().unwrap_or_default();
        let provider = data
            .opt_text("provider")
            .ok()
            .flatten()
            .unwrap_or(address);

        let mut params = Params::new();
        params.insert("address".to_string(), address.to_string());
        params.insert("provider".to_string(), provider.to_string());
        params
    }

    fn call<'a>(&'a self, ctx: &'a CheckContext<'a>) -> CheckFuture<'a> {
        Box::pin(async move {
            let address = ctx.data().text("address")?;
            let path = ctx.data().opt_text("path")?.unwrap_or("/");

            let problems = match http_probe(address, path, self.timeout).await {
                ProbeResult::Healthy => ctx.no_problem(),
                ProbeResult::Unhealthy(status) => {
                    debug!(identifier = %ctx.identifier(), status, "login provider unhealthy");
                    ctx.problem()
                }
                ProbeResult::Failed(reason) => {
                    debug!(identifier = %ctx.identifier(), %reason, "login provider unreachable");
                    ctx.problem()
                }
            };
            anyhow::Ok(problems)
        })
    }
}

// ── Data directory ─────────────────────────────────────────────

/// Reports a problem when a probe file cannot be written to and removed
/// from `path`.
pub struct DataDirWritable;

impl Check for DataDirWritable {
    fn name(&self) -> &'static str {
        "DataDirWritable"
    }

    fn config(&self) -> CheckConfig {
        CheckConfig::default().priority(Priority::High)
    }

    fn translation_key(&self) -> &str {
        "problem_check.data_dir_writable.message"
    }

    fn translation_data(&self, data: &CheckData) -> Params {
        let mut params = Params::new();
        if let Ok(path) = data.text("path") {
            params.insert("path".to_string(), path.to_string());
        }
        params
    }

    fn call<'a>(&'a self, ctx: &'a CheckContext<'a>) -> CheckFuture<'a> {
        Box::pin(async move {
            let dir = Path::new(ctx.data().text("path")?);
            let probe = dir.join(PROBE_FILE);

            let written = match tokio::fs::write(&probe, b"medic").await {
                Ok(()) => tokio::fs::remove_file(&probe).await,
                Err(e) => Err(e),
            };

            let problems = match written {
                Ok(()) => ctx.no_problem(),
                Err(e) => {
                    debug!(path = %dir.display(), error = %e, "data directory probe failed");
                    ctx.problem()
                }
            };
            anyhow::Ok(problems)
        })
    }
}

// ── Registry ───────────────────────────────────────────────────

/// Build the registry of built-in checks, applying `[checks.*]` sections.
pub fn builtin_registry(config: &MedicConfig) -> anyhow::Result<CheckRegistry> {
    let mut registry = CheckRegistry::new();

    let data_dir = CheckData::new().with("path", config.server.data_dir.display().to_string());
    register(&mut registry, config, DataDirWritable, data_dir)?;

    let login = LoginProviderReachable::default();
    if config.check(&CheckRegistry::identifier_for(&login)).is_some() {
        register(&mut registry, config, login, CheckData::new())?;
    } else {
        debug!("login provider check not configured");
    }

    for identifier in config.checks.keys() {
        if registry.lookup(identifier).is_err() {
            warn!(%identifier, "config section for unknown problem check ignored");
        }
    }

    Ok(registry)
}

fn register<C: Check + 'static>(
    registry: &mut CheckRegistry,
    config: &MedicConfig,
    check: C,
    defaults: CheckData,
) -> anyhow::Result<()> {
    let identifier = CheckRegistry::identifier_for(&check);
    let (overrides, defaults) = match config.check(&identifier) {
        Some(section) => (section.overrides.clone(), defaults.merged(&section.data)),
        None => (Default::default(), defaults),
    };
    registry.register_with(check, &overrides, defaults)?;
    Ok(())
}
