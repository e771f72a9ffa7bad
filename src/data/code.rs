//! School Code Module
//! Canonical UAI keys shared by every source.

use serde::Serialize;
use std::fmt;

/// Length of an official UAI code (7 digits + 1 check letter).
pub const UAI_LEN: usize = 8;

/// Canonical school identifier used to join the three sources.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SchoolCode(String);

impl SchoolCode {
    /// Normalize a raw identifier into its canonical form.
    ///
    /// Whitespace anywhere in the value is removed, letters are uppercased and
    /// the code is left-padded with zeros to [`UAI_LEN`]. Returns `None` when
    /// the result is not 7 digits followed by one letter.
    pub fn normalize(raw: &str) -> Option<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if compact.is_empty() || !compact.is_ascii() || compact.len() > UAI_LEN {
            return None;
        }

        let padded = format!("{:0>width$}", compact, width = UAI_LEN);
        let (digits, letter) = padded.split_at(UAI_LEN - 1);
        let valid = digits.bytes().all(|b| b.is_ascii_digit())
            && letter.bytes().all(|b| b.is_ascii_uppercase());

        valid.then_some(Self(padded))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchoolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
