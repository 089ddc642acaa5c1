//! Command-line arguments.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;

use xcorr_core::config::Settings;
use xcorr_core::models::{duration_from_days, duration_from_secs, parse_instant};
use xcorr_core::{ChannelPair, RunMode, WindowSchedule};

/// Track the clock offset between two co-located sensors over time.
///
/// Windows of both channels are fetched at regular intervals, band-passed to
/// the microseism band, aligned and cross-correlated. The lag and peak
/// correlation of every window are saved as a snapshot and a CSV report.
#[derive(Parser, Debug)]
#[command(name = "sensor-xcorr", author, version, about)]
pub struct Args {
    /// Network code (e.g. II).
    pub net: String,

    /// Station code (e.g. MSEY).
    pub sta: String,

    /// Channel code (e.g. BHZ).
    pub chan: String,

    /// First window start, YYYY-JJJ or YYYY-MM-DD (UTC).
    pub startdate: String,

    /// Scan end (exclusive), YYYY-JJJ or YYYY-MM-DD (UTC).
    pub enddate: String,

    /// Window length in seconds [default: from config].
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Keep the instrument response (raw counts instead of corrected units).
    #[arg(short, long)]
    pub keep_response: bool,

    /// Output name for the snapshot and report [default: NET_STA_NET_STA].
    #[arg(short, long)]
    pub output: Option<String>,

    /// Log per-window diagnostics.
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip the scan and load the saved snapshot.
    #[arg(long)]
    pub load: bool,

    /// Days between window starts [default: from config].
    #[arg(long)]
    pub skip_days: Option<i64>,

    /// Settings file.
    #[arg(long, default_value = ".config/settings.toml")]
    pub config: PathBuf,
}

impl Args {
    pub fn run_mode(&self) -> RunMode {
        if self.load {
            RunMode::LoadSnapshot
        } else {
            RunMode::Compute
        }
    }

    pub fn channel_pair(&self, settings: &Settings) -> Result<ChannelPair> {
        let analysis = &settings.analysis;
        ChannelPair::co_located(
            &self.net,
            &self.sta,
            &self.chan,
            &analysis.location_a,
            &analysis.location_b,
        )
        .context("Invalid channel")
    }

    pub fn schedule(&self, settings: &Settings) -> Result<WindowSchedule> {
        let start = parse_date(&self.startdate)?;
        let end = parse_date(&self.enddate)?;
        let duration =
            duration_from_secs(self.duration.unwrap_or(settings.analysis.window_secs))
                .context("Invalid duration")?;
        let skip = duration_from_days(self.skip_days.unwrap_or(settings.analysis.skip_days))
            .context("Invalid skip interval")?;

        WindowSchedule::new(start, end, skip, duration).context("Invalid scan range")
    }
}

fn parse_date(text: &str) -> Result<DateTime<Utc>> {
    parse_instant(text).with_context(|| format!("Cannot parse date '{}'", text))
}
