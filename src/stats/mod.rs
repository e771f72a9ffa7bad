//! Stats module - Department aggregates

mod calculator;

pub use calculator::{DepartmentSummary, MetricStats, StatsCalculator};
