//! Year-month period tokens from cells, sheet names and configuration.

use super::coerce::{era_year, excel_serial_to_date, parse_date_text};
use crate::model::Period;
use crate::reader::CellValue;
use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization as _;

fn numeric_period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})(?:[-/.]|年)?(\d{1,2})月?(?:分|度)?$").unwrap())
}

fn era_period_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(令和|平成|昭和|大正|[RHSTrhst])(\d{1,2}|元)[-/.年](\d{1,2})月?(?:分|度)?$")
            .unwrap()
    })
}

fn sheet_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^\d])(\d{4})(?:年|[-_/.])(\d{1,2})(?:月|[^\d]|$)").unwrap()
    })
}

fn sheet_name_compact_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:^|[^\d])(\d{4})(\d{2})(?:[^\d]|$)").unwrap())
}

fn sheet_name_era_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(令和|平成|昭和|大正)(\d{1,2}|元)年(\d{1,2})月").unwrap())
}

fn fold(raw: &str) -> String {
    raw.nfkc().filter(|c| !c.is_whitespace()).collect()
}

/// Parse a period spelling: `2024-03`, `2024/3`, `202403`, `2024年3月`,
/// `令和6年3月`, `R6.3`, or a full date.
pub fn parse_period_text(raw: &str) -> Option<Period> {
    let text = fold(raw);
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = numeric_period_re().captures(&text) {
        // Six digits without a separator must be exactly YYYYMM
        if caps[2].len() == 2 || text.len() != 5 {
            return Period::new(caps[1].parse().ok()?, caps[2].parse().ok()?);
        }
    }

    if let Some(caps) = era_period_re().captures(&text) {
        return Period::new(era_year(&caps[1], &caps[2])?, caps[3].parse().ok()?);
    }

    parse_date_text(&text).and_then(Period::from_date)
}

/// Period carried by a cell of a Period column
pub fn period_from_cell(value: &CellValue) -> Option<Period> {
    match value {
        CellValue::Empty => None,
        CellValue::Date(dt) => Period::from_date(dt.date()),
        CellValue::Number(n) => {
            if n.fract() == 0.0 && (190_001.0..=999_912.0).contains(n) {
                let n = *n as i64;
                Period::new((n / 100) as i32, (n % 100) as u32)
            } else {
                excel_serial_to_date(*n).and_then(Period::from_date)
            }
        }
        CellValue::Text(s) => parse_period_text(s),
    }
}

/// Period embedded in a sheet name such as `2024年3月分` or `支給_2024-03`
pub fn period_from_sheet_name(name: &str) -> Option<Period> {
    let text = fold(name);

    if let Some(caps) = sheet_name_re().captures(&text) {
        if let Some(period) = Period::new(caps[1].parse().ok()?, caps[2].parse().ok()?) {
            return Some(period);
        }
    }
    if let Some(caps) = sheet_name_era_re().captures(&text) {
        return Period::new(era_year(&caps[1], &caps[2])?, caps[3].parse().ok()?);
    }
    let caps = sheet_name_compact_re().captures(&text)?;
    Period::new(caps[1].parse().ok()?, caps[2].parse().ok()?)
}
