//! Top-N Bar Charts
//! Horizontal bar charts rendered as static HTML, one bar per school.

use crate::data::record::SchoolRecord;
use crate::data::schema::SourceKind;
use crate::report::format::{decimal, escape_html};
use std::cmp::Ordering;
use std::fmt::Write;

/// Bar colours, cycled by rank.
pub const PALETTE: [&str; 10] = [
    "#2563eb", // Blue
    "#16a34a", // Green
    "#9b59b6", // Purple
    "#f39c12", // Orange
    "#1abc9c", // Teal
    "#e91e63", // Pink
    "#00bcd4", // Cyan
    "#ff5722", // Deep Orange
    "#795548", // Brown
    "#607d8b", // Blue Grey
];

/// One bar: a school and its value.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

/// A ranked chart ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub id: &'static str,
    pub title: String,
    pub unit: &'static str,
    pub sources: &'static [SourceKind],
    pub bars: Vec<Bar>,
}

/// Builds and renders bar charts.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Get color for a rank.
    pub fn bar_color(rank: usize) -> &'static str {
        PALETTE[rank % PALETTE.len()]
    }

    /// The `n` schools with the highest `metric`, schools without a value excluded.
    ///
    /// Ties keep code order so the output is stable.
    pub fn top_n(
        records: &[SchoolRecord],
        metric: impl Fn(&SchoolRecord) -> Option<f64>,
        n: usize,
    ) -> Vec<Bar> {
        let mut ranked: Vec<(&SchoolRecord, f64)> = records
            .iter()
            .filter_map(|r| metric(r).map(|v| (r, v)))
            .collect();
        ranked.sort_by(|(a, av), (b, bv)| {
            bv.partial_cmp(av)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.code.cmp(&b.code))
        });

        ranked
            .into_iter()
            .take(n)
            .map(|(r, value)| Bar {
                label: r
                    .name
                    .clone()
                    .unwrap_or_else(|| r.code.to_string()),
                value,
            })
            .collect()
    }

    /// Render a chart as a `<section>` of CSS bars.
    pub fn render(chart: &BarChart) -> String {
        let mut html = String::new();
        let tags: Vec<String> = chart
            .sources
            .iter()
            .map(|s| {
                format!(
                    r#"<span class="src" title="{}">{}</span>"#,
                    escape_html(s.label()),
                    s.tag()
                )
            })
            .collect();

        let _ = writeln!(
            html,
            r#"<section class="chart" id="{}"><h2>{} {}</h2><div class="card bar-chart">"#,
            chart.id,
            escape_html(&chart.title),
            tags.join("")
        );

        if chart.bars.is_empty() {
            html.push_str(r#"<p class="muted">Aucune donnée disponible.</p>"#);
            html.push('\n');
        }

        let max = chart
            .bars
            .iter()
            .map(|b| b.value)
            .fold(0.0_f64, f64::max);

        for (rank, bar) in chart.bars.iter().enumerate() {
            let width = if max > 0.0 { bar.value / max * 100.0 } else { 0.0 };
            let _ = writeln!(
                html,
                r#"<div class="bar"><div class="bar-label">{}</div><div class="bar-track"><div class="bar-fill" style="width:{:.1}%;background:{}"></div></div><div class="bar-value muted">{} {}</div></div>"#,
                escape_html(&bar.label),
                width,
                Self::bar_color(rank),
                decimal(bar.value, 2),
                chart.unit
            );
        }

        html.push_str("</div></section>\n");
        html
    }
}
