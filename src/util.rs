// Utility helpers for parsing, text normalization and number formatting.
//
// This module centralizes the "dirty" CSV/date/text handling so the rest of
// the code can assume clean, typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Trim a raw CSV value, turning blanks into `None`.
pub fn non_empty(s: Option<&str>) -> Option<&str> {
    let s = s?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parse a `YYYY-MM-DD` date. A trailing time part (`2025-03-01 10:00:00`
/// or `2025-03-01T10:00:00`) is accepted and dropped.
pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    let s = non_empty(s)?;
    let date_part = s.split(|c| c == ' ' || c == 'T').next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Parse a boolean-like operating flag. Blank means "not operating".
pub fn parse_flag(s: Option<&str>) -> Option<bool> {
    let Some(s) = non_empty(s) else {
        return Some(false);
    };
    match s.to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "t" | "yes" | "y" => Some(true),
        "0" | "0.0" | "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Strip surrounding quote and space characters, then title-case.
pub fn normalize_text(s: &str) -> String {
    let stripped = s.trim_matches(|c| c == '\'' || c == '"' || c == ' ');
    title_case(stripped)
}

/// Title-case the way `str.title` does it: the first letter of every run of
/// alphabetic characters is upper-cased, the rest lower-cased.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 0,
    }
}

/// Round half away from zero to two decimals.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234.50`).
    let neg = n.is_sign_negative();
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages, e.g. `9,855 rows loaded`.
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_quotes_spaces_and_case() {
        assert_eq!(normalize_text("  'maria LOPEZ' "), "Maria Lopez");
        assert_eq!(normalize_text("\"old town walk\""), "Old Town Walk");
        assert_eq!(normalize_text("o'neil"), "O'Neil");
        assert_eq!(normalize_text("09:00"), "09:00");
    }

    #[test]
    fn parses_dates_with_optional_time() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(parse_date_safe(Some("2025-03-01")), Some(d));
        assert_eq!(parse_date_safe(Some(" 2025-03-01 09:30:00 ")), Some(d));
        assert_eq!(parse_date_safe(Some("2025-03-01T09:30:00")), Some(d));
        assert_eq!(parse_date_safe(Some("01/03/2025")), None);
        assert_eq!(parse_date_safe(Some("")), None);
    }

    #[test]
    fn parses_flags() {
        assert_eq!(parse_flag(Some("1")), Some(true));
        assert_eq!(parse_flag(Some("True")), Some(true));
        assert_eq!(parse_flag(Some("0")), Some(false));
        assert_eq!(parse_flag(None), Some(false));
        assert_eq!(parse_flag(Some("maybe")), None);
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 3), 31);
        assert_eq!(days_in_month(2025, 4), 30);
        assert_eq!(days_in_month(2025, 12), 31);
    }

    #[test]
    fn rounding_and_formatting() {
        assert_eq!(round2(200.0 / 3.0), 66.67);
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-0.001, 2), "0.00");
        assert_eq!(format_int(9855), "9,855");
    }
}
