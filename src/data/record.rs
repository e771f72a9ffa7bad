//! School Record Module
//! Typed per-source rows and the joined per-school record.

use crate::data::code::SchoolCode;
use crate::data::loader::{RawRow, RawTable};
use crate::data::schema::{Field, SourceKind};
use serde::Serialize;

/// Personnel figures for one school (full-time equivalents).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonnelRow {
    pub name: Option<String>,
    pub commune: Option<String>,
    pub year: Option<String>,
    pub teaching: Option<f64>,
    pub life: Option<f64>,
    pub admin: Option<f64>,
    /// A staff category column present in the file is blank on this row.
    pub blank_category: bool,
}

/// Enrollment figures for one school and one school year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrollmentRow {
    pub name: Option<String>,
    pub commune: Option<String>,
    pub year: Option<String>,
    pub students: Option<u32>,
    /// 6e, 5e, 4e, 3e.
    pub levels: [Option<u32>; 4],
    pub segpa: Option<u32>,
    pub ulis: Option<u32>,
}

/// Social-position index for one school and one school year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IpsRow {
    pub name: Option<String>,
    pub commune: Option<String>,
    pub year: Option<String>,
    pub ips: Option<f64>,
}

impl PersonnelRow {
    pub fn from_raw(table: &RawTable, row: &RawRow) -> Self {
        let teaching = number(table, row, Field::TeachingStaff);
        let life = number(table, row, Field::LifeStaff);
        let admin = number(table, row, Field::AdminStaff);
        let blank_category = [
            (Field::TeachingStaff, teaching),
            (Field::LifeStaff, life),
            (Field::AdminStaff, admin),
        ]
        .iter()
        .any(|(field, value)| table.column_map.has(*field) && value.is_none());

        Self {
            name: text(table, row, Field::Name),
            commune: text(table, row, Field::Commune),
            year: text(table, row, Field::Year),
            teaching,
            life,
            admin,
            blank_category,
        }
    }
}

impl EnrollmentRow {
    pub fn from_raw(table: &RawTable, row: &RawRow) -> Self {
        Self {
            name: text(table, row, Field::Name),
            commune: text(table, row, Field::Commune),
            year: text(table, row, Field::Year),
            students: count(table, row, Field::Students),
            levels: [
                count(table, row, Field::Level6),
                count(table, row, Field::Level5),
                count(table, row, Field::Level4),
                count(table, row, Field::Level3),
            ],
            segpa: count(table, row, Field::Segpa),
            ulis: count(table, row, Field::Ulis),
        }
    }
}

impl IpsRow {
    pub fn from_raw(table: &RawTable, row: &RawRow) -> Self {
        Self {
            name: text(table, row, Field::Name),
            commune: text(table, row, Field::Commune),
            year: text(table, row, Field::Year),
            ips: number(table, row, Field::Ips),
        }
    }
}

fn text(table: &RawTable, row: &RawRow, field: Field) -> Option<String> {
    table.field(row, field).map(str::to_string)
}

fn number(table: &RawTable, row: &RawRow, field: Field) -> Option<f64> {
    table.field(row, field).and_then(parse_number)
}

fn count(table: &RawTable, row: &RawRow, field: Field) -> Option<u32> {
    table.field(row, field).and_then(parse_count)
}

/// Parse a published number: decimal comma or point, spaces as thousands separators.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a non-negative whole count (`"12"`, `"12,0"`, `"1 204"`).
pub fn parse_count(raw: &str) -> Option<u32> {
    parse_number(raw)
        .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= u32::MAX as f64)
        .map(|v| v as u32)
}

/// Title-case an all-caps administrative label (`"COLLEGE JULES VERNE"`).
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut capitalize = true;
    for c in raw.trim().chars() {
        if c.is_alphabetic() {
            if capitalize {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            capitalize = false;
        } else {
            out.push(c);
            capitalize = true;
        }
    }
    out
}

/// One school after the join. Absent source values stay `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolRecord {
    pub code: SchoolCode,
    pub name: Option<String>,
    pub commune: Option<String>,
    pub sources: Vec<SourceKind>,

    pub teaching_staff: Option<f64>,
    pub life_staff: Option<f64>,
    pub admin_staff: Option<f64>,
    pub total_personnel: Option<f64>,
    pub personnel_year: Option<String>,

    pub students: Option<u32>,
    pub level_6e: Option<u32>,
    pub level_5e: Option<u32>,
    pub level_4e: Option<u32>,
    pub level_3e: Option<u32>,
    pub segpa: Option<u32>,
    pub ulis: Option<u32>,
    pub enrollment_year: Option<String>,

    pub ips: Option<f64>,
    pub ips_year: Option<String>,

    pub student_staff_ratio: Option<f64>,
    pub students_per_life_staff: Option<f64>,
    pub special_cohort_share: Option<f64>,
}

impl SchoolRecord {
    /// Assemble a record from whichever sources know the school.
    pub fn assemble(
        code: SchoolCode,
        personnel: Option<&PersonnelRow>,
        enrollment: Option<&EnrollmentRow>,
        ips: Option<&IpsRow>,
    ) -> Self {
        let mut sources = Vec::with_capacity(3);
        if personnel.is_some() {
            sources.push(SourceKind::Personnel);
        }
        if enrollment.is_some() {
            sources.push(SourceKind::Enrollment);
        }
        if ips.is_some() {
            sources.push(SourceKind::Ips);
        }

        let name = personnel
            .and_then(|p| p.name.as_deref())
            .or_else(|| ips.and_then(|i| i.name.as_deref()))
            .or_else(|| enrollment.and_then(|e| e.name.as_deref()))
            .map(title_case);
        let commune = enrollment
            .and_then(|e| e.commune.as_deref())
            .or_else(|| ips.and_then(|i| i.commune.as_deref()))
            .or_else(|| personnel.and_then(|p| p.commune.as_deref()))
            .map(title_case);

        let teaching_staff = personnel.and_then(|p| p.teaching);
        let life_staff = personnel.and_then(|p| p.life);
        let admin_staff = personnel.and_then(|p| p.admin);
        // A blank category would understate the total, so it leaves it missing.
        let total_personnel = personnel
            .filter(|p| !p.blank_category)
            .and_then(|_| sum_present(&[teaching_staff, life_staff, admin_staff]));

        let students = enrollment.and_then(|e| e.students);
        let levels = enrollment.map(|e| e.levels).unwrap_or_default();
        let segpa = enrollment.and_then(|e| e.segpa);
        let ulis = enrollment.and_then(|e| e.ulis);
        let cohorts = segpa.zip(ulis).map(|(s, u)| f64::from(s) + f64::from(u));

        let students_f = students.map(f64::from);

        Self {
            code,
            name,
            commune,
            sources,
            teaching_staff,
            life_staff,
            admin_staff,
            total_personnel,
            personnel_year: personnel.and_then(|p| p.year.clone()),
            students,
            level_6e: levels[0],
            level_5e: levels[1],
            level_4e: levels[2],
            level_3e: levels[3],
            segpa,
            ulis,
            enrollment_year: enrollment.and_then(|e| e.year.clone()),
            ips: ips.and_then(|i| i.ips),
            ips_year: ips.and_then(|i| i.year.clone()),
            student_staff_ratio: ratio(students_f, total_personnel),
            students_per_life_staff: ratio(students_f, life_staff),
            special_cohort_share: ratio(cohorts, students_f),
        }
    }

    pub fn has_source(&self, kind: SourceKind) -> bool {
        self.sources.contains(&kind)
    }

    pub fn has_segpa(&self) -> bool {
        self.segpa.is_some_and(|n| n > 0)
    }

    pub fn has_ulis(&self) -> bool {
        self.ulis.is_some_and(|n| n > 0)
    }
}

/// Sum of the values that are present; `None` when all are missing.
fn sum_present(values: &[Option<f64>]) -> Option<f64> {
    values
        .iter()
        .flatten()
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// `num / den`, undefined when either side is missing or `den` is not positive.
pub fn ratio(num: Option<f64>, den: Option<f64>) -> Option<f64> {
    match (num, den) {
        (Some(n), Some(d)) if d > 0.0 => Some(n / d),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code() -> SchoolCode {
        SchoolCode::normalize("0440001A").unwrap()
    }

    #[test]
    fn parses_french_numbers() {
        assert_eq!(parse_number("12,5"), Some(12.5));
        assert_eq!(parse_number("1 204"), Some(1204.0));
        assert_eq!(parse_number("1\u{202f}204,25"), Some(1204.25));
        assert_eq!(parse_number("n.d."), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_count("640"), Some(640));
        assert_eq!(parse_count("12,0"), Some(12));
        assert_eq!(parse_count("-3"), None);
        assert_eq!(parse_count("2.5"), None);
    }

    #[test]
    fn title_cases_like_published_labels() {
        assert_eq!(title_case("COLLEGE JULES VERNE"), "College Jules Verne");
        assert_eq!(title_case("SAINT-HERBLAIN"), "Saint-Herblain");
        assert_eq!(title_case("collège d'anjou"), "Collège D'Anjou");
    }

    #[test]
    fn enrollment_only_school_keeps_missing_markers() {
        let enrollment = EnrollmentRow {
            students: Some(500),
            ..Default::default()
        };
        let record = SchoolRecord::assemble(code(), None, Some(&enrollment), None);
        assert_eq!(record.sources, vec![SourceKind::Enrollment]);
        assert_eq!(record.teaching_staff, None);
        assert_eq!(record.life_staff, None);
        assert_eq!(record.total_personnel, None);
        assert_eq!(record.ips, None);
        assert_eq!(record.student_staff_ratio, None);
        assert_eq!(record.special_cohort_share, None);
    }

    #[test]
    fn zero_personnel_never_divides() {
        let personnel = PersonnelRow {
            teaching: Some(0.0),
            life: Some(0.0),
            admin: Some(0.0),
            ..Default::default()
        };
        let enrollment = EnrollmentRow {
            students: Some(300),
            ..Default::default()
        };
        let record = SchoolRecord::assemble(code(), Some(&personnel), Some(&enrollment), None);
        assert_eq!(record.total_personnel, Some(0.0));
        assert_eq!(record.student_staff_ratio, None);
        assert_eq!(record.students_per_life_staff, None);
    }

    #[test]
    fn derives_ratio_and_cohort_share() {
        let personnel = PersonnelRow {
            teaching: Some(30.0),
            life: Some(5.0),
            admin: Some(5.0),
            ..Default::default()
        };
        let enrollment = EnrollmentRow {
            students: Some(600),
            segpa: Some(48),
            ulis: Some(0),
            ..Default::default()
        };
        let record = SchoolRecord::assemble(code(), Some(&personnel), Some(&enrollment), None);
        assert_eq!(record.total_personnel, Some(40.0));
        assert_eq!(record.student_staff_ratio, Some(15.0));
        assert_eq!(record.students_per_life_staff, Some(120.0));
        assert_eq!(record.special_cohort_share, Some(0.08));
        assert!(record.has_segpa());
        assert!(!record.has_ulis());
    }

    #[test]
    fn blank_cohort_count_is_not_zero() {
        let enrollment = EnrollmentRow {
            students: Some(600),
            segpa: Some(48),
            ulis: None,
            ..Default::default()
        };
        let record = SchoolRecord::assemble(code(), None, Some(&enrollment), None);
        assert_eq!(record.segpa, Some(48));
        assert_eq!(record.ulis, None);
        assert_eq!(record.special_cohort_share, None);
    }

    #[test]
    fn cohort_share_needs_students() {
        let enrollment = EnrollmentRow {
            students: Some(0),
            segpa: Some(3),
            ulis: Some(0),
            ..Default::default()
        };
        let record = SchoolRecord::assemble(code(), None, Some(&enrollment), None);
        assert_eq!(record.special_cohort_share, None);
    }

    #[test]
    fn blank_staff_category_leaves_total_missing() {
        let personnel = PersonnelRow {
            teaching: Some(30.0),
            life: None,
            admin: Some(5.0),
            blank_category: true,
            ..Default::default()
        };
        let enrollment = EnrollmentRow {
            students: Some(600),
            ..Default::default()
        };
        let record = SchoolRecord::assemble(code(), Some(&personnel), Some(&enrollment), None);
        assert_eq!(record.teaching_staff, Some(30.0));
        assert_eq!(record.total_personnel, None);
        assert_eq!(record.student_staff_ratio, None);
    }

    #[test]
    fn name_prefers_personnel_then_ips() {
        let ips = IpsRow {
            name: Some("COLLEGE A".into()),
            commune: Some("NANTES".into()),
            ips: Some(101.0),
            ..Default::default()
        };
        let record = SchoolRecord::assemble(code(), None, None, Some(&ips));
        assert_eq!(record.name.as_deref(), Some("College A"));
        assert_eq!(record.commune.as_deref(), Some("Nantes"));
    }
}
