//! Data Processor Module
//! Filters, deduplicates and joins the three sources into school records.

use crate::config::FilterConfig;
use crate::data::code::SchoolCode;
use crate::data::loader::{RawRow, RawTable};
use crate::data::record::{EnrollmentRow, IpsRow, PersonnelRow, SchoolRecord};
use crate::data::schema::{Field, SourceKind};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Row-level join failure. Recorded and counted, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum JoinError {
    #[error("{} line {line}: unusable school identifier {raw:?}", .kind.label())]
    UnusableIdentifier {
        kind: SourceKind,
        line: usize,
        raw: String,
    },
}

/// Per-source bookkeeping of what happened to every row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub file_name: String,
    pub rows_read: usize,
    /// Outside the configured department, académie, sector or nature.
    pub rows_filtered: usize,
    /// Older school years of a school that appears several times.
    pub rows_superseded: usize,
    /// No usable identifier.
    pub rows_skipped: usize,
    pub schools: usize,
}

/// Outcome of a join besides the records themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JoinReport {
    pub sources: BTreeMap<SourceKind, SourceReport>,
    pub skipped: Vec<JoinError>,
}

impl JoinReport {
    /// Rows dropped for lack of a usable identifier, all sources together.
    pub fn skipped_rows(&self) -> usize {
        self.skipped.len()
    }

    pub fn source(&self, kind: SourceKind) -> Option<&SourceReport> {
        self.sources.get(&kind)
    }
}

/// Records ordered by canonical code, plus the join report.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedData {
    pub records: Vec<SchoolRecord>,
    pub report: JoinReport,
}

/// Latest row per school for one source.
type Selected<'a> = BTreeMap<SchoolCode, (Option<&'a str>, &'a RawRow)>;

/// Handles filtering and joining of the loaded sources.
pub struct DataProcessor;

impl DataProcessor {
    /// Join personnel, enrollment and IPS tables by canonical school code.
    ///
    /// Every code found in at least one filtered source yields one record;
    /// the fields of absent sources stay missing.
    pub fn join(
        personnel: &RawTable,
        enrollment: &RawTable,
        ips: &RawTable,
        filters: &FilterConfig,
    ) -> JoinedData {
        let mut report = JoinReport::default();

        let personnel_rows: BTreeMap<SchoolCode, PersonnelRow> =
            Self::select_latest(personnel, filters, &mut report)
                .into_iter()
                .map(|(code, (_, row))| (code, PersonnelRow::from_raw(personnel, row)))
                .collect();
        let enrollment_rows: BTreeMap<SchoolCode, EnrollmentRow> =
            Self::select_latest(enrollment, filters, &mut report)
                .into_iter()
                .map(|(code, (_, row))| (code, EnrollmentRow::from_raw(enrollment, row)))
                .collect();
        let ips_rows: BTreeMap<SchoolCode, IpsRow> = Self::select_latest(ips, filters, &mut report)
            .into_iter()
            .map(|(code, (_, row))| (code, IpsRow::from_raw(ips, row)))
            .collect();

        let codes: BTreeSet<&SchoolCode> = personnel_rows
            .keys()
            .chain(enrollment_rows.keys())
            .chain(ips_rows.keys())
            .collect();

        let records: Vec<SchoolRecord> = codes
            .into_iter()
            .map(|code| {
                SchoolRecord::assemble(
                    code.clone(),
                    personnel_rows.get(code),
                    enrollment_rows.get(code),
                    ips_rows.get(code),
                )
            })
            .collect();

        if report.skipped_rows() > 0 {
            warn!(skipped = report.skipped_rows(), "rows without a usable school identifier were skipped");
        }
        info!(schools = records.len(), "joined sources");

        JoinedData { records, report }
    }

    /// Keep the most recent in-scope row of every school in `table`.
    ///
    /// Years compare as strings (`"2023"`, `"2023-2024"`); on equal years the
    /// first row wins.
    fn select_latest<'a>(
        table: &'a RawTable,
        filters: &FilterConfig,
        report: &mut JoinReport,
    ) -> Selected<'a> {
        let mut stats = SourceReport {
            file_name: table.file_name(),
            rows_read: table.rows.len(),
            ..Default::default()
        };
        let mut selected: Selected<'a> = BTreeMap::new();

        for row in &table.rows {
            if !Self::in_scope(table, row, filters) {
                stats.rows_filtered += 1;
                continue;
            }

            let raw_id = table.field(row, Field::Id).unwrap_or_default();
            let Some(code) = SchoolCode::normalize(raw_id) else {
                stats.rows_skipped += 1;
                let error = JoinError::UnusableIdentifier {
                    kind: table.kind,
                    line: row.line,
                    raw: raw_id.to_string(),
                };
                debug!("{error}");
                report.skipped.push(error);
                continue;
            };

            let year = table.field(row, Field::Year);
            let replace = match selected.get(&code) {
                Some((kept_year, _)) => {
                    stats.rows_superseded += 1;
                    *kept_year < year
                }
                None => true,
            };
            if replace {
                selected.insert(code, (year, row));
            }
        }

        stats.schools = selected.len();
        info!(
            source = table.kind.label(),
            read = stats.rows_read,
            filtered = stats.rows_filtered,
            superseded = stats.rows_superseded,
            skipped = stats.rows_skipped,
            schools = stats.schools,
            "selected rows"
        );
        report.sources.insert(table.kind, stats);
        selected
    }

    /// Whether a row belongs on the dashboard. Filter columns a source does
    /// not carry do not filter.
    pub fn in_scope(table: &RawTable, row: &RawRow, filters: &FilterConfig) -> bool {
        let departement_ok = table
            .field(row, Field::Department)
            .map_or(true, |d| same_departement(d, &filters.departement));
        let academie_ok = table
            .field(row, Field::Academie)
            .map_or(true, |a| fold(a) == fold(&filters.academie));
        let sector_ok = table
            .field(row, Field::Sector)
            .map_or(true, |s| fold(s) == "public");
        let nature_ok = table
            .field(row, Field::Nature)
            .map_or(true, |n| fold(n).starts_with(&fold(&filters.nature_prefix)));

        departement_ok && academie_ok && sector_ok && nature_ok
    }
}

/// `"44"`, `"044"` and `" 44 "` name the same department.
fn same_departement(value: &str, wanted: &str) -> bool {
    let strip = |s: &str| s.trim().trim_start_matches('0').to_ascii_uppercase();
    strip(value) == strip(wanted)
}

/// Lowercase and drop French diacritics, for label comparisons.
fn fold(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
