//! sensor-xcorr - main entry point
//!
//! Handles:
//! - Argument parsing and configuration loading
//! - Logging initialization
//! - Ctrl-C wiring to the scan's cancel handle
//! - Running the scan and writing the report

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use xcorr_core::analysis::AlignConfig;
use xcorr_core::config::ConfigManager;
use xcorr_core::fetch::{TimeseriesClient, WindowFetcher};
use xcorr_core::logging::{init_tracing, init_tracing_with_file};
use xcorr_core::report::{CsvReporter, SeriesReporter};
use xcorr_core::series::SnapshotStore;
use xcorr_core::{Accumulator, CancelHandle, RunError, ScanConfig};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = ConfigManager::new(&args.config);
    let config_warning = config.load_or_create().err();

    let settings = config.settings().clone();
    let level = settings.logging.level.with_verbose(args.verbose);
    let _log_guard = if settings.logging.file {
        match init_tracing_with_file(level, &config.logs_folder()) {
            Ok(guard) => Some(guard),
            Err(e) => {
                eprintln!("Warning: file logging disabled: {}", e);
                init_tracing(level);
                None
            }
        }
    } else {
        init_tracing(level);
        None
    };

    if let Some(e) = config_warning {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
    }
    tracing::debug!("Core version: {}", xcorr_core::version());
    tracing::debug!("Config: {}", config.path().display());

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            if matches!(e.downcast_ref::<RunError>(), Some(RunError::Cancelled { .. })) {
                ExitCode::from(130)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(args: Args, config: ConfigManager) -> Result<()> {
    if let Err(e) = config.ensure_dirs_exist() {
        tracing::warn!("Failed to create directories: {}", e);
    }
    let settings = config.settings();

    let pair = args.channel_pair(settings)?;
    let schedule = args.schedule(settings)?;

    let scan = ScanConfig {
        pair,
        schedule,
        align: AlignConfig {
            filter: settings.analysis.filter_config(),
            target_rate: settings.analysis.target_rate_hz,
        },
        max_lag_samples: settings.analysis.max_lag_samples,
        output_key: args.output.clone(),
    };
    let key = scan.key();

    let client = TimeseriesClient::new(
        settings.source.base_url.clone(),
        settings.source.timeout(),
        !args.keep_response,
    )
    .context("Cannot create waveform client")?;

    let cancel = CancelHandle::new();
    spawn_ctrl_c_handler(cancel.clone());

    let fetcher = WindowFetcher::new(Arc::new(client), settings.source.retry_policy(), cancel);
    let store = SnapshotStore::new(&settings.paths.snapshot_folder);
    let accumulator = Accumulator::new(fetcher, store, scan, args.run_mode());

    let report = accumulator.run().await?;

    if report.summary.loaded {
        tracing::info!(
            "Loaded {} sample(s) for '{}' from {}",
            report.series.len(),
            report.key,
            report.snapshot_path.display()
        );
    }

    let reporter = CsvReporter::new(PathBuf::from(&settings.paths.report_folder));
    if let Some(path) = reporter.report(&key, &report.series)? {
        tracing::info!("Report written to {}", path.display());
    }

    Ok(())
}

fn spawn_ctrl_c_handler(cancel: CancelHandle) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling scan");
            cancel.cancel();
        }
    });
}
