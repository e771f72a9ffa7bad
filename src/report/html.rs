//! HTML Dashboard Generator
//! Builds the single self-contained dashboard page.
//!
//! The page carries its own CSS, its own script and the full data set as an
//! embedded JSON document, so it can be served from any static host and
//! viewed offline. Nothing in the output depends on the clock or on hash
//! ordering: identical inputs give byte-identical pages.

use crate::charts::{BarChart, ChartPlotter};
use crate::data::processor::JoinReport;
use crate::data::record::SchoolRecord;
use crate::data::schema::SourceKind;
use crate::report::format::{
    count, decimal, escape_html, opt_count, opt_decimal, percent, MISSING,
};
use crate::stats::DepartmentSummary;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("cannot serialise dashboard data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Context shown in the page header and the sources section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportMeta {
    pub departement: String,
    pub departement_label: String,
    pub academie: String,
    pub top: usize,
    /// Input file name per source.
    pub files: BTreeMap<SourceKind, String>,
}

impl ReportMeta {
    pub fn title(&self) -> String {
        format!(
            "Dashboard – Collèges publics de {} ({})",
            self.departement_label, self.departement
        )
    }
}

#[derive(Serialize)]
struct Payload<'a> {
    meta: &'a ReportMeta,
    summary: &'a DepartmentSummary,
    report: &'a JoinReport,
    records: &'a [SchoolRecord],
}

/// A rendered table cell.
enum Cell {
    Text(Option<String>),
    Count(Option<u32>),
    Decimal(Option<f64>, usize),
    Percent(Option<f64>),
}

impl Cell {
    /// (sort key, display text), both HTML-escaped.
    fn render(&self) -> (String, String) {
        match self {
            Cell::Text(Some(t)) => (escape_html(&t.to_lowercase()), escape_html(t)),
            Cell::Count(Some(n)) => (n.to_string(), count(u64::from(*n))),
            Cell::Decimal(Some(v), d) => (format!("{v:.4}"), decimal(*v, *d)),
            Cell::Percent(Some(v)) => (format!("{v:.6}"), percent(*v)),
            _ => (String::new(), MISSING.to_string()),
        }
    }
}

/// One table column and the datasets backing it.
struct Column {
    label: &'static str,
    sources: &'static [SourceKind],
    numeric: bool,
    cell: fn(&SchoolRecord) -> Cell,
}

impl Column {
    fn text(label: &'static str, sources: &'static [SourceKind], cell: fn(&SchoolRecord) -> Cell) -> Self {
        Self { label, sources, numeric: false, cell }
    }

    fn number(label: &'static str, sources: &'static [SourceKind], cell: fn(&SchoolRecord) -> Cell) -> Self {
        Self { label, sources, numeric: true, cell }
    }
}

const PERSONNEL: &[SourceKind] = &[SourceKind::Personnel];
const ENROLLMENT: &[SourceKind] = &[SourceKind::Enrollment];
const IPS: &[SourceKind] = &[SourceKind::Ips];
const ENROLLMENT_PERSONNEL: &[SourceKind] = &[SourceKind::Enrollment, SourceKind::Personnel];
const ALL_SOURCES: &[SourceKind] = &SourceKind::ALL;

fn columns() -> Vec<Column> {
    vec![
        Column::text("Collège", ALL_SOURCES, |r| Cell::Text(r.name.clone())),
        Column::text("UAI", ALL_SOURCES, |r| Cell::Text(Some(r.code.to_string()))),
        Column::text("Commune", ALL_SOURCES, |r| Cell::Text(r.commune.clone())),
        Column::number("Élèves", ENROLLMENT, |r| Cell::Count(r.students)),
        Column::number("6e", ENROLLMENT, |r| Cell::Count(r.level_6e)),
        Column::number("5e", ENROLLMENT, |r| Cell::Count(r.level_5e)),
        Column::number("4e", ENROLLMENT, |r| Cell::Count(r.level_4e)),
        Column::number("3e", ENROLLMENT, |r| Cell::Count(r.level_3e)),
        Column::number("Segpa", ENROLLMENT, |r| Cell::Count(r.segpa)),
        Column::number("ULIS", ENROLLMENT, |r| Cell::Count(r.ulis)),
        Column::number("Part Segpa + ULIS", ENROLLMENT, |r| Cell::Percent(r.special_cohort_share)),
        Column::number("ETP enseignants", PERSONNEL, |r| Cell::Decimal(r.teaching_staff, 1)),
        Column::number("ETP vie scolaire", PERSONNEL, |r| Cell::Decimal(r.life_staff, 2)),
        Column::number("ETP administratifs", PERSONNEL, |r| Cell::Decimal(r.admin_staff, 1)),
        Column::number("ETP total", PERSONNEL, |r| Cell::Decimal(r.total_personnel, 1)),
        Column::number("Élèves / ETP", ENROLLMENT_PERSONNEL, |r| Cell::Decimal(r.student_staff_ratio, 1)),
        Column::number("Élèves / ETP vie scolaire", ENROLLMENT_PERSONNEL, |r| Cell::Decimal(r.students_per_life_staff, 1)),
        Column::number("IPS", IPS, |r| Cell::Decimal(r.ips, 1)),
    ]
}

/// HTML generator for the dashboard page.
pub struct HtmlGenerator;

impl HtmlGenerator {
    /// Render the whole page.
    pub fn render(
        meta: &ReportMeta,
        records: &[SchoolRecord],
        summary: &DepartmentSummary,
        report: &JoinReport,
    ) -> Result<String, RenderError> {
        let payload = Payload {
            meta,
            summary,
            report,
            records,
        };
        // A raw `<` could close the script element early.
        let data_json = serde_json::to_string_pretty(&payload)?.replace('<', "\\u003c");

        let title = escape_html(&meta.title());
        let mut html = String::with_capacity(64 * 1024 + records.len() * 1024);

        html.push_str("<!DOCTYPE html>\n<html lang=\"fr\">\n<head>\n<meta charset=\"UTF-8\" />\n");
        html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />\n");
        let _ = writeln!(html, "<title>{title}</title>");
        let _ = writeln!(html, "<style>{STYLE}</style>");
        html.push_str("</head>\n<body>\n<div class=\"container\">\n");

        let _ = writeln!(
            html,
            r#"<header class="top-bar"><div><h1>{}</h1><div class="muted">Académie de {} · Personnels, effectifs élèves et indice de position sociale</div></div><div class="muted">Sources : {}</div></header>"#,
            title,
            escape_html(&meta.academie),
            Self::source_list(meta)
        );

        html.push_str(&Self::cards_html(summary));
        html.push_str(&Self::charts_html(meta, records));
        html.push_str(&Self::table_html(records));
        html.push_str(&Self::sources_html(meta, report));

        html.push_str(r#"<div class="footnote">Note : seuls les établissements publics sont inclus. Les ETP « personnels de vie scolaire » comprennent principalement les assistants d’éducation (surveillants, assistants pédagogiques, assistants de prévention et de sécurité, assistants en préprofessionnalisation, etc.) et peuvent inclure les CPE ou d’autres personnels éducatifs selon la déclaration de l’établissement. « n.d. » : donnée non renseignée par la source.</div>"#);
        html.push_str("\n</div>\n");

        let _ = writeln!(
            html,
            "<script type=\"application/json\" id=\"data-json\">\n{data_json}\n</script>"
        );
        let _ = writeln!(html, "<script>{SCRIPT}</script>");
        html.push_str("</body>\n</html>\n");

        Ok(html)
    }

    fn source_list(meta: &ReportMeta) -> String {
        meta.files
            .values()
            .map(|f| escape_html(f))
            .collect::<Vec<_>>()
            .join(" · ")
    }

    fn tags(sources: &[SourceKind]) -> String {
        sources
            .iter()
            .map(|s| {
                format!(
                    r#"<span class="src" title="{}">{}</span>"#,
                    escape_html(s.label()),
                    s.tag()
                )
            })
            .collect()
    }

    fn cards_html(summary: &DepartmentSummary) -> String {
        let coverage = |kind: SourceKind| summary.coverage.get(&kind).copied().unwrap_or(0);
        let life_note = summary.life_staff.as_ref().map_or_else(
            || "aucun établissement renseigné".to_string(),
            |s| {
                format!(
                    "moyenne {} · min {} · max {}",
                    decimal(s.mean, 2),
                    decimal(s.min, 2),
                    decimal(s.max, 2)
                )
            },
        );
        let ips_note = summary.ips.as_ref().map_or_else(
            || "aucun établissement renseigné".to_string(),
            |s| {
                format!(
                    "médiane {} · min {} · max {} · {} collèges",
                    decimal(s.median, 1),
                    decimal(s.min, 1),
                    decimal(s.max, 1),
                    s.count
                )
            },
        );

        let cards: Vec<(&str, String, &[SourceKind], String)> = vec![
            (
                "Collèges",
                count(summary.school_count as u64),
                ALL_SOURCES,
                format!(
                    "P {} · E {} · I {}",
                    coverage(SourceKind::Personnel),
                    coverage(SourceKind::Enrollment),
                    coverage(SourceKind::Ips)
                ),
            ),
            (
                "Élèves (total)",
                opt_count(summary.total_students),
                ENROLLMENT,
                format!("{} collèges renseignés", summary.students_reported),
            ),
            (
                "Personnels (ETP total)",
                opt_decimal(summary.total_personnel, 1),
                PERSONNEL,
                format!("{} collèges renseignés", summary.personnel_reported),
            ),
            (
                "ETP vie scolaire (total)",
                opt_decimal(summary.total_life_staff, 2),
                PERSONNEL,
                life_note,
            ),
            (
                "Élèves par ETP",
                opt_decimal(summary.student_staff_ratio, 1),
                ENROLLMENT_PERSONNEL,
                "collèges renseignant les deux sources".to_string(),
            ),
            (
                "Élèves par ETP vie scolaire",
                opt_decimal(summary.students_per_life_staff, 1),
                ENROLLMENT_PERSONNEL,
                "collèges renseignant les deux sources".to_string(),
            ),
            (
                "IPS moyen",
                opt_decimal(summary.average_ips, 1),
                IPS,
                ips_note,
            ),
            (
                "Collèges avec Segpa",
                count(summary.schools_with_segpa as u64),
                ENROLLMENT,
                format!("{} élèves en Segpa", opt_count(summary.total_segpa)),
            ),
            (
                "Collèges avec ULIS",
                count(summary.schools_with_ulis as u64),
                ENROLLMENT,
                format!("{} élèves en ULIS", opt_count(summary.total_ulis)),
            ),
        ];

        let mut html = String::from("<div id=\"cards\" class=\"grid\">\n");
        for (label, value, sources, note) in cards {
            let _ = writeln!(
                html,
                r#"<div class="card"><div class="muted">{} {}</div><div class="value">{}</div><div class="muted">{}</div></div>"#,
                escape_html(label),
                Self::tags(sources),
                value,
                escape_html(&note)
            );
        }
        html.push_str("</div>\n");
        html
    }

    fn charts_html(meta: &ReportMeta, records: &[SchoolRecord]) -> String {
        let charts = [
            BarChart {
                id: "top-life-staff",
                title: format!("Top {} collèges par ETP vie scolaire", meta.top),
                unit: "ETP",
                sources: PERSONNEL,
                bars: ChartPlotter::top_n(records, |r| r.life_staff, meta.top),
            },
            BarChart {
                id: "top-ratio",
                title: format!("Top {} collèges par élèves / ETP vie scolaire", meta.top),
                unit: "élèves/ETP",
                sources: ENROLLMENT_PERSONNEL,
                bars: ChartPlotter::top_n(records, |r| r.students_per_life_staff, meta.top),
            },
        ];
        charts.iter().map(ChartPlotter::render).collect()
    }

    fn table_html(records: &[SchoolRecord]) -> String {
        let columns = columns();
        let communes: BTreeSet<&str> = records.iter().filter_map(|r| r.commune.as_deref()).collect();

        let mut html = String::from("<h2>Vue détaillée</h2>\n<div class=\"card table-card\">\n<div class=\"filters\">\n");
        html.push_str(r#"<input id="filter-text" type="search" placeholder="Filtrer par collège, commune ou UAI" />"#);
        html.push_str("\n<select id=\"filter-commune\"><option value=\"\">Toutes les communes</option>");
        for commune in &communes {
            let escaped = escape_html(commune);
            let _ = write!(html, r#"<option value="{escaped}">{escaped}</option>"#);
        }
        html.push_str("</select>\n");
        html.push_str(r#"<label><input id="filter-segpa" type="checkbox" /> Avec Segpa</label>"#);
        html.push_str(r#"<label><input id="filter-ulis" type="checkbox" /> Avec ULIS</label>"#);
        let _ = writeln!(
            html,
            r#"<span class="muted"><span id="visible-count">{}</span> / {} collèges</span>"#,
            records.len(),
            records.len()
        );
        html.push_str("</div>\n<div class=\"table-scroll\">\n<table id=\"schools\">\n<thead><tr>");

        for column in &columns {
            let _ = write!(
                html,
                r#"<th data-type="{}">{} {}</th>"#,
                if column.numeric { "num" } else { "text" },
                escape_html(column.label),
                Self::tags(column.sources)
            );
        }
        html.push_str("</tr></thead>\n<tbody>\n");

        for record in records {
            let search = format!(
                "{} {} {}",
                record.name.as_deref().unwrap_or_default(),
                record.commune.as_deref().unwrap_or_default(),
                record.code
            )
            .to_lowercase();
            let _ = write!(
                html,
                r#"<tr data-search="{}" data-commune="{}" data-segpa="{}" data-ulis="{}">"#,
                escape_html(&search),
                escape_html(record.commune.as_deref().unwrap_or_default()),
                u8::from(record.has_segpa()),
                u8::from(record.has_ulis())
            );
            for column in &columns {
                let (key, display) = (column.cell)(record).render();
                let class = if key.is_empty() { r#" class="nd""# } else { "" };
                let _ = write!(html, r#"<td data-value="{key}"{class}>{display}</td>"#);
            }
            html.push_str("</tr>\n");
        }

        html.push_str("</tbody>\n</table>\n</div>\n</div>\n");
        html
    }

    fn sources_html(meta: &ReportMeta, report: &JoinReport) -> String {
        let mut html = String::from(
            "<h2>Sources et complétude</h2>\n<div class=\"card\">\n<table class=\"sources\">\n<thead><tr><th>Jeu de données</th><th>Fichier</th><th>Lignes lues</th><th>Hors périmètre</th><th>Années antérieures</th><th>Ignorées</th><th>Collèges</th></tr></thead>\n<tbody>\n",
        );
        for kind in SourceKind::ALL {
            let file = meta
                .files
                .get(&kind)
                .map(|f| escape_html(f))
                .unwrap_or_else(|| MISSING.to_string());
            let stats = report.source(kind).cloned().unwrap_or_default();
            let _ = writeln!(
                html,
                r#"<tr><td>{} {}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>"#,
                Self::tags(&[kind]),
                escape_html(kind.label()),
                file,
                count(stats.rows_read as u64),
                count(stats.rows_filtered as u64),
                count(stats.rows_superseded as u64),
                count(stats.rows_skipped as u64),
                count(stats.schools as u64)
            );
        }
        html.push_str("</tbody>\n</table>\n");

        let skipped = report.skipped_rows();
        if skipped == 0 {
            html.push_str("<p class=\"muted\">Aucune ligne ignorée.</p>\n");
        } else {
            let _ = writeln!(
                html,
                r#"<p class="warn" id="skipped-summary">{} lignes ignorées (identifiant d’établissement inutilisable).</p>"#,
                count(skipped as u64)
            );
            html.push_str("<details><summary>Détail des lignes ignorées</summary><ul>\n");
            for error in &report.skipped {
                let _ = writeln!(html, "<li>{}</li>", escape_html(&error.to_string()));
            }
            html.push_str("</ul></details>\n");
        }
        html.push_str("<p class=\"muted\">Étiquettes de source : P = indicateurs personnels, E = effectifs élèves, I = indice de position sociale.</p>\n</div>\n");
        html
    }
}

const STYLE: &str = r#"
:root {
  color-scheme: light dark;
  --bg: #f6f8fa;
  --card: #ffffff;
  --text: #222;
  --muted: #555;
  --accent: #2563eb;
  --warn: #b45309;
  --border: #dce3ec;
  --shadow: 0 2px 8px rgba(0,0,0,0.08);
  font-family: system-ui, -apple-system, Segoe UI, sans-serif;
}
body { margin: 0; padding: 32px; background: var(--bg); color: var(--text); }
h1 { margin: 0 0 8px; font-size: 24px; }
h2 { margin: 24px 0 12px; }
.container { max-width: 1400px; margin: 0 auto; }
.top-bar { display: flex; justify-content: space-between; align-items: baseline; gap: 12px; flex-wrap: wrap; }
.grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(220px, 1fr)); gap: 12px; margin: 16px 0 24px; }
.card { background: var(--card); border: 1px solid var(--border); border-radius: 10px; padding: 14px 16px; box-shadow: var(--shadow); }
.muted { color: var(--muted); font-size: 13px; }
.warn { color: var(--warn); font-weight: 600; }
.value { font-size: 22px; font-weight: 700; margin: 4px 0; }
.src { display: inline-block; min-width: 14px; padding: 0 4px; margin-left: 2px; border-radius: 999px; font-size: 10px; font-weight: 600; text-align: center; background: rgba(37,99,235,0.12); color: var(--accent); cursor: help; }
.bar-chart { display: grid; gap: 8px; }
.bar { display: flex; align-items: center; gap: 8px; }
.bar-label { width: 260px; font-size: 13px; }
.bar-track { flex: 1; background: #e5e7eb; border-radius: 8px; overflow: hidden; height: 14px; }
.bar-fill { height: 100%; }
.bar-value { width: 130px; text-align: right; }
.filters { display: flex; gap: 8px; align-items: center; flex-wrap: wrap; margin-bottom: 8px; }
.filters input[type=search] { flex: 1; min-width: 220px; padding: 8px; border: 1px solid var(--border); border-radius: 8px; }
.filters select { padding: 8px; border: 1px solid var(--border); border-radius: 8px; }
.table-scroll { overflow: auto; max-height: 650px; }
table { width: 100%; border-collapse: collapse; font-size: 13px; }
th, td { padding: 8px; border-bottom: 1px solid var(--border); text-align: left; white-space: nowrap; }
th { position: sticky; top: 0; background: var(--card); z-index: 1; cursor: pointer; user-select: none; }
th[data-type=num], td { font-variant-numeric: tabular-nums; }
th.sorted-asc::after { content: " ▲"; }
th.sorted-desc::after { content: " ▼"; }
td.nd { color: var(--muted); }
tbody tr:hover { background: rgba(37,99,235,0.08); }
table.sources th { position: static; cursor: default; }
.footnote { font-size: 12px; color: var(--muted); margin-top: 12px; }
"#;

const SCRIPT: &str = r#"
(function () {
  const table = document.getElementById('schools');
  const tbody = table.tBodies[0];
  const rows = Array.from(tbody.rows);
  const headers = Array.from(table.tHead.rows[0].cells);
  const text = document.getElementById('filter-text');
  const commune = document.getElementById('filter-commune');
  const segpa = document.getElementById('filter-segpa');
  const ulis = document.getElementById('filter-ulis');
  const visible = document.getElementById('visible-count');

  let sortIndex = -1;
  let sortDir = 1;

  const compare = (a, b, index, numeric) => {
    const av = a.cells[index].dataset.value;
    const bv = b.cells[index].dataset.value;
    // Missing values always sink to the bottom.
    if (av === '' && bv === '') return 0;
    if (av === '') return 1;
    if (bv === '') return -1;
    const order = numeric ? parseFloat(av) - parseFloat(bv) : av.localeCompare(bv, 'fr');
    return order * sortDir;
  };

  headers.forEach((th, index) => {
    th.addEventListener('click', () => {
      const numeric = th.dataset.type === 'num';
      if (sortIndex === index) {
        sortDir = -sortDir;
      } else {
        sortIndex = index;
        sortDir = numeric ? -1 : 1;
      }
      headers.forEach(h => h.classList.remove('sorted-asc', 'sorted-desc'));
      th.classList.add(sortDir === 1 ? 'sorted-asc' : 'sorted-desc');
      rows.slice().sort((a, b) => compare(a, b, index, numeric)).forEach(r => tbody.appendChild(r));
    });
  });

  const applyFilter = () => {
    const q = (text.value || '').trim().toLowerCase();
    const c = commune.value;
    let shown = 0;
    rows.forEach(r => {
      const ok = (!q || r.dataset.search.includes(q))
        && (!c || r.dataset.commune === c)
        && (!segpa.checked || r.dataset.segpa === '1')
        && (!ulis.checked || r.dataset.ulis === '1');
      r.hidden = !ok;
      if (ok) shown += 1;
    });
    visible.textContent = shown;
  };

  [text, commune, segpa, ulis].forEach(el => el.addEventListener('input', applyFilter));
  commune.addEventListener('change', applyFilter);
  applyFilter();
})();
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::code::SchoolCode;
    use crate::data::processor::JoinError;
    use crate::data::record::{EnrollmentRow, IpsRow, PersonnelRow};
    use crate::stats::StatsCalculator;

    fn meta() -> ReportMeta {
        ReportMeta {
            departement: "44".into(),
            departement_label: "Loire-Atlantique".into(),
            academie: "NANTES".into(),
            top: 15,
            files: SourceKind::ALL
                .iter()
                .map(|k| (*k, format!("{}.csv", k.tag())))
                .collect(),
        }
    }

    fn records() -> Vec<SchoolRecord> {
        let personnel = PersonnelRow {
            name: Some("COLLEGE <SCRIPT>".into()),
            life: Some(5.0),
            teaching: Some(35.0),
            ..Default::default()
        };
        let enrollment = EnrollmentRow {
            commune: Some("NANTES".into()),
            students: Some(600),
            segpa: Some(60),
            ..Default::default()
        };
        let ips = IpsRow {
            ips: Some(98.4),
            ..Default::default()
        };
        vec![
            SchoolRecord::assemble(
                SchoolCode::normalize("0440001A").unwrap(),
                Some(&personnel),
                Some(&enrollment),
                Some(&ips),
            ),
            SchoolRecord::assemble(SchoolCode::normalize("0440002B").unwrap(), None, None, Some(&ips)),
        ]
    }

    fn render(report: &JoinReport) -> String {
        let records = records();
        let summary = StatsCalculator::summarize(&records);
        HtmlGenerator::render(&meta(), &records, &summary, report).unwrap()
    }

    #[test]
    fn one_row_per_record_with_filters_and_citations() {
        let html = render(&JoinReport::default());
        assert_eq!(html.matches("<tr data-search=").count(), 2);
        assert!(html.contains(r#"id="filter-commune""#));
        assert!(html.contains(r#"<option value="Nantes">Nantes</option>"#));
        assert!(html.contains(r#"data-segpa="1""#));
        assert!(html.contains(r#"title="Indice de position sociale">I</span>"#));
        assert!(html.contains("Aucune ligne ignorée."));
    }

    #[test]
    fn data_is_escaped_and_embedded() {
        let html = render(&JoinReport::default());
        assert!(html.contains("College &lt;Script&gt;"));
        assert!(!html.contains("<Script>"));
        assert!(html.contains(r#"<script type="application/json" id="data-json">"#));
        assert!(html.contains(r#""code": "0440001A""#));
        assert!(!html.contains("http://") && !html.contains("https://"));
    }

    #[test]
    fn missing_values_show_nd() {
        let html = render(&JoinReport::default());
        assert!(html.contains(r#"<td data-value="" class="nd">n.d.</td>"#));
    }

    #[test]
    fn skipped_rows_are_summarised() {
        let report = JoinReport {
            skipped: vec![JoinError::UnusableIdentifier {
                kind: SourceKind::Personnel,
                line: 7,
                raw: String::new(),
            }],
            ..Default::default()
        };
        let html = render(&report);
        assert!(html.contains("1 lignes ignorées"));
        assert!(html.contains("Indicateurs personnels line 7"));
    }

    #[test]
    fn rendering_is_byte_stable() {
        assert_eq!(render(&JoinReport::default()), render(&JoinReport::default()));
    }
}
