//! medicd — run Medic problem checks.
//!
//! # Usage
//!
//! ```text
//! medicd serve --config /etc/medic/medic.toml --port 8080
//! medicd run login_provider_reachable --data path=/health
//! medicd list
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use medic_core::{CheckData, DataValue};
use medicd::config::MedicConfig;
use serde::Serialize;
use tracing::info;

#[derive(Parser)]
#[command(name = "medicd", about = "Medic problem check daemon", version)]
struct Cli {
    /// Path to medic.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler and REST API.
    Serve {
        /// Port to listen on (overrides `[server] port`).
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for the tracker store (overrides `[server] data_dir`).
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
    /// Run one check now and print its problems as JSON.
    Run {
        /// Check identifier, e.g. `login_provider_reachable`.
        identifier: String,

        /// Input data as `key=value`, layered over the configured data.
        #[arg(long = "data", value_parser = parse_data_arg)]
        data: Vec<(String, DataValue)>,
    },
    /// List registered checks with their health.
    List,
}

#[derive(Serialize)]
struct CheckRow<'a> {
    identifier: &'a str,
    scheduled: bool,
    health: medic_core::HealthState,
    blips: u32,
    next_run_at: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
                tracing_subscriber::EnvFilter::try_new("info,medicd=debug,medic=debug")
            })?,
        )
        .init();

    let cli = Cli::parse();
    let mut config = MedicConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { port, data_dir } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.server.data_dir = data_dir;
            }
            medicd::serve(config).await
        }
        Command::Run { identifier, data } => {
            let runner = medicd::build_runner(&config)?;
            let data = data
                .into_iter()
                .fold(CheckData::new(), |acc, (key, value)| acc.with(key, value));

            let problems = runner.invoke(&identifier, &data).await?;
            info!(%identifier, problems = problems.len(), "problem check finished");
            println!("{}", serde_json::to_string_pretty(&problems)?);
            Ok(())
        }
        Command::List => {
            let runner = medicd::build_runner(&config)?;
            let mut rows = Vec::new();
            for registered in runner.registry().all() {
                let tracker = runner.tracker(registered.identifier())?;
                rows.push(CheckRow {
                    identifier: registered.identifier(),
                    scheduled: registered.definition().is_scheduled(),
                    health: runner.health_state(registered)?,
                    blips: tracker.blips,
                    next_run_at: tracker.next_run_at,
                });
            }
            println!("{}", serde_json::to_string_pretty(&rows)?);
            Ok(())
        }
    }
}

/// Parse `key=value`; the value is read as bool, integer, float, or text.
fn parse_data_arg(raw: &str) -> Result<(String, DataValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    if key.is_empty() {
        return Err(format!("empty key in `{raw}`"));
    }

    let value = if let Ok(b) = value.parse::<bool>() {
        DataValue::Bool(b)
    } else if let Ok(i) = value.parse::<i64>() {
        DataValue::Int(i)
    } else if let Ok(f) = value.parse::<f64>() {
        DataValue::Float(f)
    } else {
        DataValue::Text(value.to_string())
    };
    Ok((key.to_string(), value))
}
