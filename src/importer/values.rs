use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use super::Cell;

/// Layouts tried after `YYYY-MM-DD` and `MM/DD/YYYY`.
const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%B %d %Y",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Largest serial Excel will display as a date (9999-12-31).
const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;

/// Serials a bare number typed as text may stand for: 1950-01-01 through
/// 2099-12-31. Anything outside is a number, not a date.
const PLAUSIBLE_SERIALS: std::ops::RangeInclusive<f64> = 18_264.0..=73_050.0;

/// Largest single amount accepted, in dollars.
pub const MAX_AMOUNT: f64 = 1_000_000_000.0;

/// Optional sign, optional 3-letter currency code, optional currency
/// symbol, then digits with well-formed thousands commas, optionally
/// followed by a currency code.
fn amount_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(-)?\s*(?:[A-Za-z]{3}\s*)?(-)?\s*\p{Sc}?\s*(-)?(\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?|\.\d+)\s*(?:[A-Za-z]{3})?$",
        )
        .expect("static pattern")
    })
}

// ---------------------------------------------------------------------------
// Money
// ---------------------------------------------------------------------------

/// Parse a dollar amount as typed by a person or exported by a spreadsheet:
/// a currency symbol or code, thousands commas and surrounding whitespace
/// are allowed, parenthesized values are negative. Anything else left over
/// (letters, exponents, decimal commas) makes the value `None`.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return parse_unsigned_amount(inner).map(|v| -v);
    }
    let caps = amount_pattern().captures(s)?;
    let signs = (1..=3).filter(|&i| caps.get(i).is_some()).count();
    if signs > 1 {
        return None;
    }
    let value: f64 = caps[4].replace(',', "").parse().ok()?;
    let value = if signs == 1 { -value } else { value };
    Some(value).filter(|v| v.is_finite())
}

fn parse_unsigned_amount(raw: &str) -> Option<f64> {
    parse_amount(raw).filter(|v| *v >= 0.0)
}

/// Round half away from zero, so 0.005 dollars becomes 1 cent. Callers keep
/// amounts within `MAX_AMOUNT`; larger values saturate.
pub fn dollars_to_cents(dollars: f64) -> i64 {
    (dollars * 100.0).round() as i64
}

pub fn cell_amount(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) => parse_amount(s),
        _ => None,
    }
}

/// A percentage such as `12.5`, `12.5%` or ` 10 % `.
pub fn cell_percent(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(n) if n.is_finite() => Some(*n),
        Cell::Text(s) => {
            let s = s.trim();
            let s = s.strip_suffix('%').unwrap_or(s).trim();
            s.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Counts
// ---------------------------------------------------------------------------

/// A whole number. `3` and `3.0` are accepted, `3.5` is not.
pub fn cell_integer(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
        Cell::Text(s) => {
            let s = s.trim();
            if let Ok(v) = s.parse::<i64>() {
                return Some(v);
            }
            s.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite() && v.fract() == 0.0)
                .map(|v| v as i64)
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.floor() as i64))
}

pub fn parse_date_mdy(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.trim().split('/').collect();
    if parts.len() != 3 || parts[2].len() != 4 {
        return None;
    }
    let m: u32 = parts[0].parse().ok()?;
    let d: u32 = parts[1].parse().ok()?;
    let y: i32 = parts[2].parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

fn is_iso_date(raw: &str) -> bool {
    let b = raw.as_bytes();
    b.len() == 10
        && b[4] == b'-'
        && b[7] == b'-'
        && b.iter()
            .enumerate()
            .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit())
}

/// Parse a date written as `YYYY-MM-DD`, `MM/DD/YYYY`, another common
/// textual layout, an ISO datetime, or a whole-number Excel serial between
/// 1950 and 2099.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if is_iso_date(raw) {
        return NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok();
    }
    if let Some(date) = parse_date_mdy(raw) {
        return Some(date);
    }
    for fmt in FALLBACK_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }
    for fmt in FALLBACK_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc2822(raw) {
        return Some(dt.date_naive());
    }
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        return raw.parse::<f64>().ok().and_then(plausible_serial_date);
    }
    None
}

fn plausible_serial_date(serial: f64) -> Option<NaiveDate> {
    if PLAUSIBLE_SERIALS.contains(&serial) {
        excel_serial_to_date(serial)
    } else {
        None
    }
}

pub fn cell_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::Number(n) => plausible_serial_date(*n),
        Cell::Text(s) => parse_date(s),
        _ => None,
    }
}
