//! ## lwes-cli
//! `lwes emit` sends JSON events from stdin; `lwes listen` prints what arrives.

use anyhow::Context;
use clap::Parser;
use lwes_config::LwesConfig;
use lwes_telemetry::logging::EventLogger;
use lwes_telemetry::metrics::MetricsRecorder;
use tracing::debug;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let defaults = cli.command.defaults();
    let config = match &cli.config {
        Some(path) => LwesConfig::load_from_path_over(path, defaults),
        None => LwesConfig::load_over(defaults),
    }
    .context("failed to load configuration")?;

    EventLogger::init(&config.telemetry)
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to initialise logging")?;
    let metrics = MetricsRecorder::new()?;

    let result = commands::run_command(cli, config, metrics.clone()).await;
    if let Ok(text) = metrics.gather_metrics() {
        debug!("final counters\n{text}");
    }
    result
}
