//! Statistics Calculator Module
//! Department-wide aggregates and descriptive statistics over school records.
//!
//! Every aggregate only looks at records that report the field in question:
//! a missing value is left out of both the numerator and the denominator.

use crate::data::record::{ratio, SchoolRecord};
use crate::data::schema::SourceKind;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

/// Descriptive statistics for one metric across schools.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p05: f64,
    pub p95: f64,
}

/// Aggregate scalars over all joined schools.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentSummary {
    pub school_count: usize,
    /// Schools each source knows about.
    pub coverage: BTreeMap<SourceKind, usize>,

    pub total_students: Option<u64>,
    pub students_reported: usize,
    pub total_segpa: Option<u64>,
    pub total_ulis: Option<u64>,
    pub schools_with_segpa: usize,
    pub schools_with_ulis: usize,

    pub total_personnel: Option<f64>,
    pub total_teaching_staff: Option<f64>,
    pub total_life_staff: Option<f64>,
    pub total_admin_staff: Option<f64>,
    pub personnel_reported: usize,

    pub average_ips: Option<f64>,
    pub ips: Option<MetricStats>,
    pub life_staff: Option<MetricStats>,
    pub school_ratios: Option<MetricStats>,

    /// Students ÷ personnel over schools reporting both (personnel > 0).
    pub student_staff_ratio: Option<f64>,
    /// Students ÷ life-supervision ETP over schools reporting both (ETP > 0).
    pub students_per_life_staff: Option<f64>,
}

/// Handles statistical calculations.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    ///
    /// Returns `None` for an empty slice.
    pub fn compute_descriptive_stats(values: &[f64]) -> Option<MetricStats> {
        let n = values.len();
        if n == 0 {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };
        // Sample standard deviation; undefined for a single value.
        let std = if n > 1 { values.iter().std_dev() } else { 0.0 };

        Some(MetricStats {
            count: n,
            mean: Self::mean(values).unwrap_or(f64::NAN),
            median,
            std,
            min: sorted[0],
            max: sorted[n - 1],
            p05: Self::percentile(&sorted, 5.0),
            p95: Self::percentile(&sorted, 95.0),
        })
    }

    /// Arithmetic mean, `None` for an empty slice.
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Roll the joined records up into the department summary.
    pub fn summarize(records: &[SchoolRecord]) -> DepartmentSummary {
        let coverage = SourceKind::ALL
            .iter()
            .map(|kind| (*kind, records.iter().filter(|r| r.has_source(*kind)).count()))
            .collect();

        let present = |f: fn(&SchoolRecord) -> Option<f64>| -> Vec<f64> {
            records.iter().filter_map(f).collect()
        };
        let students = present(|r| r.students.map(f64::from));
        let personnel = present(|r| r.total_personnel);
        let ips = present(|r| r.ips);
        let life_staff = present(|r| r.life_staff);
        let school_ratios = present(|r| r.student_staff_ratio);

        DepartmentSummary {
            school_count: records.len(),
            coverage,
            total_students: sum_counts(records.iter().map(|r| r.students)),
            students_reported: students.len(),
            total_segpa: sum_counts(records.iter().map(|r| r.segpa)),
            total_ulis: sum_counts(records.iter().map(|r| r.ulis)),
            schools_with_segpa: records.iter().filter(|r| r.has_segpa()).count(),
            schools_with_ulis: records.iter().filter(|r| r.has_ulis()).count(),
            total_personnel: sum_present(&personnel),
            total_teaching_staff: sum_present(&present(|r| r.teaching_staff)),
            total_life_staff: sum_present(&life_staff),
            total_admin_staff: sum_present(&present(|r| r.admin_staff)),
            personnel_reported: personnel.len(),
            average_ips: Self::mean(&ips),
            ips: Self::compute_descriptive_stats(&ips),
            life_staff: Self::compute_descriptive_stats(&life_staff),
            school_ratios: Self::compute_descriptive_stats(&school_ratios),
            student_staff_ratio: paired_ratio(records, |r| r.total_personnel),
            students_per_life_staff: paired_ratio(records, |r| r.life_staff),
        }
    }
}

fn sum_present(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum())
}

fn sum_counts(values: impl Iterator<Item = Option<u32>>) -> Option<u64> {
    values
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(0) + u64::from(v)))
}

/// Total students ÷ total of `staff`, restricted to schools reporting both
/// with a non-zero staff figure.
fn paired_ratio(records: &[SchoolRecord], staff: fn(&SchoolRecord) -> Option<f64>) -> Option<f64> {
    let (students, staff) = records
        .iter()
        .filter_map(|r| Some((f64::from(r.students?), staff(r).filter(|p| *p > 0.0)?)))
        .fold(None, |acc: Option<(f64, f64)>, (s, p)| {
            let (ts, tp) = acc.unwrap_or((0.0, 0.0));
            Some((ts + s, tp + p))
        })?;
    ratio(Some(students), Some(staff))
}
