//! `run` command implementation.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use contracts::Station;
use data_window::DataWindow;
use ingestion::JsonDirSource;
use observability::{record_window_metrics, WindowMetricsAggregator};
use tracing::{info, warn};

use super::{build_source, resolve_config};
use crate::cli::RunArgs;
use crate::error::CliError;

/// Execute the `run` command
pub async fn run_window(args: &RunArgs) -> Result<()> {
    let config = resolve_config(&args.window)?;
    let source = build_source(args.window.source);
    info!(source = source.name(), "Building data window");

    // the window builder is synchronous
    let build = tokio::task::spawn_blocking(move || DataWindow::new(config, source.as_ref()));
    let timeout = async {
        match args.timeout {
            0 => std::future::pending::<()>().await,
            seconds => tokio::time::sleep(Duration::from_secs(seconds)).await,
        }
    };

    let window = tokio::select! {
        joined = build => joined
            .context("Data window task panicked")?
            .context("Failed to build data window")?,
        _ = timeout => return Err(CliError::Timeout { seconds: args.timeout }.into()),
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, abandoning data window");
            return Err(CliError::Interrupted.into());
        }
    };

    let mut aggregator = WindowMetricsAggregator::new();
    for summary in window.summaries() {
        record_window_metrics(summary);
        aggregator.update(summary);
    }

    if args.json {
        let json = serde_json::to_string_pretty(window.summaries())
            .context("Failed to serialize window summaries")?;
        println!("{json}");
    } else {
        print!("{}", aggregator.summary());
    }

    if let Some(output) = &args.output {
        let written = write_stations(output, window.stations().values())?;
        info!(output = %output.display(), files = written, "Windowed stations written");
    }

    info!(
        retained = window.stations().len(),
        total = window.summaries().len(),
        "Data window finished"
    );
    Ok(())
}

fn write_stations<'a>(
    output: &Path,
    stations: impl Iterator<Item = &'a Station>,
) -> Result<usize, CliError> {
    std::fs::create_dir_all(output)?;
    let mut written = 0;
    for station in stations {
        JsonDirSource::write_station(output, station, true)
            .map_err(contracts::ContractError::from)?;
        written += 1;
    }
    Ok(written)
}

/// Resolves on Ctrl+C or SIGTERM; never resolves if no handler can be installed
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
