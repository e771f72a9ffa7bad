//! College Dashboard - command-line entry point
//!
//! Reads the three CSV exports and writes the HTML dashboard.

use anyhow::{Context, Result};
use college_dashboard::{DashboardConfig, DashboardPipeline};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let matches = DashboardConfig::command().get_matches();
    let config = DashboardConfig::from_matches(&matches)?;

    let dashboard = DashboardPipeline::run(&config).context("dashboard generation failed")?;

    let skipped = dashboard.report.skipped_rows();
    if skipped > 0 {
        warn!("{skipped} rows skipped (no usable school identifier)");
    }
    println!(
        "Dashboard généré : {} ({} collèges, {} rows skipped)",
        config.output.display(),
        dashboard.records.len(),
        skipped
    );
    Ok(())
}
