//! Charts module - Static Top-N bar charts

mod bars;

pub use bars::{Bar, BarChart, ChartPlotter, PALETTE};
