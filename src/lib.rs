//! College Dashboard - static HTML dashboard of public collèges
//!
//! Joins three public datasets (personnel indicators, enrollment, social
//! position index) by school code and renders one self-contained page.

pub mod charts;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod report;
pub mod stats;

pub use config::{DashboardConfig, FilterConfig};
pub use pipeline::{Dashboard, DashboardPipeline, PipelineError};
