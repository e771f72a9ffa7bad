//! CSV Data Loader Module
//! Handles CSV file loading and column extraction using Polars.
//!
//! Public-data exports arrive as UTF-8 (with or without BOM), UTF-16 or
//! legacy Windows-1252, separated by `;`, `,` or tabs. Everything is decoded
//! to UTF-8 and the separator sniffed from the header before Polars parses
//! the text with every column kept as a string.

use crate::data::schema::{ColumnMap, Field, SourceKind};
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use polars::prelude::*;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("{} file {}: cannot read: {source}", .kind.label(), .path.display())]
    FileAccess {
        kind: SourceKind,
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{} file {}: cannot decode: {reason}", .kind.label(), .path.display())]
    Decode {
        kind: SourceKind,
        path: PathBuf,
        reason: String,
    },
    #[error("{} file {}: malformed CSV: {source}", .kind.label(), .path.display())]
    Csv {
        kind: SourceKind,
        path: PathBuf,
        source: PolarsError,
    },
    #[error("{} file {}: missing identifier column (expected one of: {expected})", .kind.label(), .path.display())]
    MissingColumn {
        kind: SourceKind,
        path: PathBuf,
        expected: String,
    },
}

/// One input row: column name to raw cell text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    /// 1-based line in the source file (the header is line 1).
    pub line: usize,
    pub values: HashMap<String, String>,
}

impl RawRow {
    /// Trimmed cell value, `None` when the column is absent or the cell blank.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .get(column)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// A fully loaded source file.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub kind: SourceKind,
    pub path: PathBuf,
    pub columns: Vec<String>,
    pub column_map: ColumnMap,
    pub rows: Vec<RawRow>,
    pub delimiter: u8,
}

impl RawTable {
    /// Cell for a logical field, resolved through the source's aliases.
    pub fn field<'a>(&self, row: &'a RawRow, field: Field) -> Option<&'a str> {
        self.column_map.get(field).and_then(|column| row.get(column))
    }

    /// File name without directories, for citations.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Handles CSV file loading with Polars.
pub struct DataLoader;

impl DataLoader {
    /// Load one source file from disk.
    pub fn load(path: &Path, kind: SourceKind) -> Result<RawTable, LoaderError> {
        let bytes = std::fs::read(path).map_err(|source| LoaderError::FileAccess {
            kind,
            path: path.to_path_buf(),
            source,
        })?;
        Self::load_bytes(&bytes, path, kind)
    }

    /// Load one source from an in-memory buffer; `path` is only used for reporting.
    pub fn load_bytes(bytes: &[u8], path: &Path, kind: SourceKind) -> Result<RawTable, LoaderError> {
        let (text, encoding) = Self::decode(bytes).map_err(|reason| LoaderError::Decode {
            kind,
            path: path.to_path_buf(),
            reason,
        })?;
        let delimiter = Self::sniff_delimiter(&text);
        debug!(
            source = kind.label(),
            encoding,
            delimiter = %(delimiter as char).escape_default(),
            "decoded input"
        );

        let csv_error = |source| LoaderError::Csv {
            kind,
            path: path.to_path_buf(),
            source,
        };
        let df = Self::read_frame(text, delimiter).map_err(csv_error)?;
        let (columns, rows) = Self::frame_to_rows(&df).map_err(csv_error)?;

        let column_map = ColumnMap::resolve(kind, &columns);
        if !column_map.has(Field::Id) {
            return Err(LoaderError::MissingColumn {
                kind,
                path: path.to_path_buf(),
                expected: kind.aliases(Field::Id).join(" / "),
            });
        }

        info!(
            source = kind.label(),
            path = %path.display(),
            rows = rows.len(),
            columns = columns.len(),
            "loaded source"
        );

        Ok(RawTable {
            kind,
            path: path.to_path_buf(),
            columns,
            column_map,
            rows,
            delimiter,
        })
    }

    /// Decode raw bytes to UTF-8 text, returning the encoding name used.
    ///
    /// A BOM wins; otherwise valid UTF-8 is taken as is and anything else is
    /// read as Windows-1252, the usual encoding of older French exports.
    pub fn decode(bytes: &[u8]) -> Result<(String, &'static str), String> {
        let encoding: &'static Encoding = match Encoding::for_bom(bytes) {
            Some((encoding, _)) => encoding,
            None if std::str::from_utf8(bytes).is_ok() => UTF_8,
            None => WINDOWS_1252,
        };

        let (text, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            return Err(format!("invalid {} byte sequence", encoding.name()));
        }
        if text.contains('\0') {
            return Err("binary content (NUL byte)".to_string());
        }
        if text.trim().is_empty() {
            return Err("file is empty".to_string());
        }

        Ok((text.into_owned(), encoding.name()))
    }

    /// Pick the separator used by the header line.
    ///
    /// Candidates are counted outside double quotes; `;` wins ties and is the
    /// fallback for single-column files.
    pub fn sniff_delimiter(text: &str) -> u8 {
        let header = text.lines().next().unwrap_or_default();
        let mut in_quotes = false;
        let mut counts = [0usize; 3];

        for c in header.chars() {
            match c {
                '"' => in_quotes = !in_quotes,
                ';' if !in_quotes => counts[0] += 1,
                ',' if !in_quotes => counts[1] += 1,
                '\t' if !in_quotes => counts[2] += 1,
                _ => {}
            }
        }

        let candidates = [b';', b',', b'\t'];
        let mut best = 0;
        for i in 1..candidates.len() {
            if counts[i] > counts[best] {
                best = i;
            }
        }
        candidates[best]
    }

    fn read_frame(text: String, delimiter: u8) -> PolarsResult<DataFrame> {
        // Schema inference is disabled so every column stays a string;
        // numeric parsing happens later with French number conventions.
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .map_parse_options(|opts| {
                opts.with_separator(delimiter)
                    .with_truncate_ragged_lines(true)
            })
            .into_reader_with_file_handle(Cursor::new(text.into_bytes()))
            .finish()
    }

    fn frame_to_rows(df: &DataFrame) -> PolarsResult<(Vec<String>, Vec<RawRow>)> {
        let columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        let mut rows: Vec<RawRow> = (0..df.height())
            .map(|i| RawRow {
                line: i + 2,
                values: HashMap::with_capacity(columns.len()),
            })
            .collect();

        for name in &columns {
            let values = df.column(name)?.str()?;
            for (row, value) in rows.iter_mut().zip(values.into_iter()) {
                row.values
                    .insert(name.clone(), value.unwrap_or_default().to_string());
            }
        }

        Ok((columns, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(bytes: &[u8], kind: SourceKind) -> Result<RawTable, LoaderError> {
        DataLoader::load_bytes(bytes, Path::new("test.csv"), kind)
    }

    #[test]
    fn sniffs_semicolon_comma_and_tab() {
        assert_eq!(DataLoader::sniff_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(DataLoader::sniff_delimiter("a,b,c\n"), b',');
        assert_eq!(DataLoader::sniff_delimiter("a\tb\n"), b'\t');
        assert_eq!(DataLoader::sniff_delimiter("\"a,b\";c\n"), b';');
        assert_eq!(DataLoader::sniff_delimiter("uai\n"), b';');
    }

    #[test]
    fn decodes_latin1_accents() {
        let bytes = b"Nom de l'\xe9tablissement;UAI\nColl\xe8ge;0440001A\n";
        let (text, encoding) = DataLoader::decode(bytes).unwrap();
        assert_eq!(encoding, "windows-1252");
        assert!(text.starts_with("Nom de l'établissement"));
        assert!(text.contains("Collège"));
    }

    #[test]
    fn strips_utf8_bom() {
        let bytes = "\u{feff}Annee_scolaire;UAI\n2023;0440001A\n".as_bytes();
        let (text, encoding) = DataLoader::decode(bytes).unwrap();
        assert_eq!(encoding, "UTF-8");
        assert!(text.starts_with("Annee_scolaire"));
    }

    #[test]
    fn decodes_utf16_with_bom() {
        let (text, encoding) = DataLoader::decode(b"\xff\xfeu\0a\0i\0\n\0").unwrap();
        assert_eq!(encoding, "UTF-16LE");
        assert_eq!(text, "uai\n");
    }

    #[test]
    fn rejects_empty_input() {
        assert!(DataLoader::decode(b"  \n").is_err());
        let err = load(b"", SourceKind::Ips).unwrap_err();
        assert!(matches!(err, LoaderError::Decode { .. }));
    }

    #[test]
    fn loads_rows_as_strings() {
        let csv = "uai;ips;nom_de_la_commune\n0440001A;103,5;Nantes\n0440002B;;Rezé\n";
        let table = load(csv.as_bytes(), SourceKind::Ips).unwrap();
        assert_eq!(table.columns, vec!["uai", "ips", "nom_de_la_commune"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].line, 2);
        assert_eq!(table.field(&table.rows[0], Field::Ips), Some("103,5"));
        assert_eq!(table.field(&table.rows[1], Field::Ips), None);
        assert_eq!(table.field(&table.rows[1], Field::Commune), Some("Rezé"));
    }

    #[test]
    fn comma_files_load_like_semicolon_files() {
        let csv = "uai,ips\n0440001A,101.2\n";
        let table = load(csv.as_bytes(), SourceKind::Ips).unwrap();
        assert_eq!(table.delimiter, b',');
        assert_eq!(table.field(&table.rows[0], Field::Id), Some("0440001A"));
    }

    #[test]
    fn missing_identifier_column_is_reported() {
        let csv = "ips;commune\n100;Nantes\n";
        let err = load(csv.as_bytes(), SourceKind::Ips).unwrap_err();
        match err {
            LoaderError::MissingColumn { kind, path, .. } => {
                assert_eq!(kind, SourceKind::Ips);
                assert_eq!(path, PathBuf::from("test.csv"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_file_is_a_file_access_error() {
        let err = DataLoader::load(Path::new("/nonexistent/ips.csv"), SourceKind::Ips).unwrap_err();
        assert!(matches!(err, LoaderError::FileAccess { .. }));
        assert!(err.to_string().contains("/nonexistent/ips.csv"));
    }
}
