//! Dashboard Pipeline
//! Load -> join -> summarise -> render -> write, once per run.

use crate::config::DashboardConfig;
use crate::data::{DataLoader, DataProcessor, JoinReport, LoaderError, SchoolRecord, SourceKind};
use crate::report::{HtmlGenerator, RenderError, ReportMeta};
use crate::stats::{DepartmentSummary, StatsCalculator};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoaderError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("cannot write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub records: Vec<SchoolRecord>,
    pub summary: DepartmentSummary,
    pub report: JoinReport,
    pub html: String,
}

/// Runs the whole generation.
pub struct DashboardPipeline;

impl DashboardPipeline {
    /// Load, join, aggregate and render without touching the output path.
    ///
    /// Any unreadable or malformed input aborts the run.
    pub fn build(config: &DashboardConfig) -> Result<Dashboard, PipelineError> {
        let personnel = DataLoader::load(&config.personnel, SourceKind::Personnel)?;
        let enrollment = DataLoader::load(&config.enrollment, SourceKind::Enrollment)?;
        let ips = DataLoader::load(&config.ips, SourceKind::Ips)?;

        let joined = DataProcessor::join(&personnel, &enrollment, &ips, &config.filters);
        let summary = StatsCalculator::summarize(&joined.records);

        let meta = ReportMeta {
            departement: config.filters.departement.clone(),
            departement_label: config.filters.departement_label.clone(),
            academie: config.filters.academie.clone(),
            top: config.filters.top,
            files: [&personnel, &enrollment, &ips]
                .into_iter()
                .map(|table| (table.kind, table.file_name()))
                .collect(),
        };
        let html = HtmlGenerator::render(&meta, &joined.records, &summary, &joined.report)?;

        Ok(Dashboard {
            records: joined.records,
            summary,
            report: joined.report,
            html,
        })
    }

    /// Build the dashboard and write it to `config.output`.
    pub fn run(config: &DashboardConfig) -> Result<Dashboard, PipelineError> {
        let dashboard = Self::build(config)?;

        std::fs::write(&config.output, dashboard.html.as_bytes()).map_err(|source| {
            PipelineError::Write {
                path: config.output.clone(),
                source,
            }
        })?;

        info!(
            path = %config.output.display(),
            bytes = dashboard.html.len(),
            schools = dashboard.records.len(),
            "dashboard written"
        );
        Ok(dashboard)
    }
}
