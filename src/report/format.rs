//! French number formatting and HTML escaping for the report.

/// Placeholder for values a source does not report.
pub const MISSING: &str = "n.d.";

/// Thousands separator used by French typography (narrow no-break space).
const THOUSANDS: char = '\u{202f}';

/// `1234.5` with 2 decimals -> `"1 234,50"`.
pub fn decimal(value: f64, decimals: usize) -> String {
    let digits = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits.as_str(), None),
    };

    let mut out = String::with_capacity(digits.len() + 4);
    if value < 0.0 && digits.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }
    out
}

/// Whole count with grouped thousands.
pub fn count(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Share in `[0, 1]` as a percentage with one decimal.
pub fn percent(share: f64) -> String {
    format!("{}\u{a0}%", decimal(share * 100.0, 1))
}

pub fn opt_decimal(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| decimal(v, decimals))
}

pub fn opt_count(value: Option<u64>) -> String {
    value.map_or_else(|| MISSING.to_string(), count)
}

pub fn opt_percent(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING.to_string(), percent)
}

fn group_thousands(int_part: &str) -> String {
    let len = int_part.chars().count();
    let mut out = String::with_capacity(len + len / 3 * 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(THOUSANDS);
        }
        out.push(c);
    }
    out
}

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_french_decimals() {
        assert_eq!(decimal(1234.5, 2), "1\u{202f}234,50");
        assert_eq!(decimal(0.0, 2), "0,00");
        assert_eq!(decimal(-12.345, 1), "-12,3");
        assert_eq!(decimal(-0.001, 2), "0,00");
        assert_eq!(decimal(999.0, 0), "999");
    }

    #[test]
    fn formats_counts_and_percentages() {
        assert_eq!(count(1234567), "1\u{202f}234\u{202f}567");
        assert_eq!(count(12), "12");
        assert_eq!(percent(0.08), "8,0\u{a0}%");
    }

    #[test]
    fn missing_values_render_as_nd() {
        assert_eq!(opt_decimal(None, 2), "n.d.");
        assert_eq!(opt_count(None), "n.d.");
        assert_eq!(opt_percent(Some(0.5)), "50,0\u{a0}%");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<b>"Saint-Jo & Co"</b>"#),
            "&lt;b&gt;&quot;Saint-Jo &amp; Co&quot;&lt;/b&gt;"
        );
        assert_eq!(escape_html("Collège d'Anjou"), "Collège d&#39;Anjou");
    }
}
