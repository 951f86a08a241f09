//! Cell value coercion to the typed fields of a payroll row.

use crate::model::{FieldRole, Gender};
use crate::reader::CellValue;
use chrono::{Days, NaiveDate, NaiveDateTime, Timelike};
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::str::FromStr;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization as _;

/// Result of coercing one cell
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced<T> {
    Value(T),
    /// The cell is blank
    Absent,
    /// The cell holds something that is not a valid value; carries the reason
    Invalid(String),
}

const NUMBER_NOISE: &[char] = &[',', '，', '¥', '￥', '$', '円'];
const NEGATIVE_MARKS: &[char] = &['-', '−', '△', '▲'];

/// Last serial Excel can represent (9999-12-31)
const MAX_EXCEL_SERIAL: i64 = 2_958_465;

/// Coerce a cell to a non-negative decimal.
///
/// Negative or unparseable values come back as [`Coerced::Invalid`]; the
/// caller decides whether that drops the field or the row.
pub fn coerce_decimal(value: &CellValue, role: FieldRole) -> Coerced<Decimal> {
    match value {
        v if v.is_blank() => Coerced::Absent,
        CellValue::Number(n) => decimal_from_f64(*n),
        CellValue::Date(dt) if role == FieldRole::WorkHours => match hours_from_time_of_day(dt) {
            Some(hours) => Coerced::Value(hours),
            None => Coerced::Invalid("date in a numeric column".to_string()),
        },
        CellValue::Date(_) => Coerced::Invalid("date in a numeric column".to_string()),
        CellValue::Text(s) => decimal_from_text(s, role),
        CellValue::Empty => Coerced::Absent,
    }
}

fn decimal_from_f64(n: f64) -> Coerced<Decimal> {
    if !n.is_finite() {
        return Coerced::Invalid("not a finite number".to_string());
    }
    if n < 0.0 {
        return Coerced::Invalid(format!("negative value {}", n));
    }
    match Decimal::from_f64(n) {
        Some(d) => Coerced::Value(d.normalize()),
        None => Coerced::Invalid(format!("{} is out of range", n)),
    }
}

fn decimal_from_text(raw: &str, role: FieldRole) -> Coerced<Decimal> {
    let folded: String = raw.nfkc().collect();
    let mut text: String = folded
        .chars()
        .filter(|c| !c.is_whitespace() && !NUMBER_NOISE.contains(c))
        .collect();

    if text.starts_with(NEGATIVE_MARKS) || (text.starts_with('(') && text.ends_with(')')) {
        return Coerced::Invalid(format!("negative value '{}'", raw.trim()));
    }

    for suffix in ["時間", "h", "H"] {
        if let Some(stripped) = text.strip_suffix(suffix) {
            text = stripped.to_string();
            break;
        }
    }

    if role == FieldRole::WorkHours {
        if let Some(hours) = hours_from_clock(&text) {
            return Coerced::Value(hours);
        }
    }

    match Decimal::from_str(&text) {
        Ok(d) => Coerced::Value(d.normalize()),
        Err(_) => Coerced::Invalid(format!("'{}' is not a number", raw.trim())),
    }
}

/// `h:mm` as a decimal number of hours
fn hours_from_clock(text: &str) -> Option<Decimal> {
    let (h, m) = text.split_once(':')?;
    let hours: u32 = h.parse().ok()?;
    let minutes: u32 = m.parse().ok()?;
    if m.len() != 2 || minutes >= 60 {
        return None;
    }
    let value = Decimal::from(hours) + Decimal::from(minutes) / Decimal::from(60);
    Some(value.normalize())
}

/// Hours of an `h:mm` time cell, which loads as a time on the Excel epoch day
fn hours_from_time_of_day(dt: &NaiveDateTime) -> Option<Decimal> {
    let epoch_day = [(1899, 12, 30), (1899, 12, 31)]
        .into_iter()
        .any(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d) == Some(dt.date()));
    if !epoch_day {
        return None;
    }
    let time = dt.time();
    let seconds = time.num_seconds_from_midnight() + u32::from(time.nanosecond() >= 500_000_000);
    Some((Decimal::from(seconds) / Decimal::from(3600)).normalize())
}

/// Coerce a cell to a calendar date
pub fn coerce_date(value: &CellValue) -> Coerced<NaiveDate> {
    match value {
        v if v.is_blank() => Coerced::Absent,
        CellValue::Date(dt) => Coerced::Value(dt.date()),
        CellValue::Number(n) => match excel_serial_to_date(*n) {
            Some(d) => Coerced::Value(d),
            None => Coerced::Invalid(format!("{} is not a date serial", n)),
        },
        CellValue::Text(s) => match parse_date_text(s) {
            Some(d) => Coerced::Value(d),
            None => Coerced::Invalid(format!("'{}' is not a date", s.trim())),
        },
        CellValue::Empty => Coerced::Absent,
    }
}

/// Convert an Excel 1900-system serial to a date.
///
/// Serial 60 is the fictitious 1900-02-29 and has no date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.floor() as i64;
    if !(1..=MAX_EXCEL_SERIAL).contains(&days) || days == 60 {
        return None;
    }
    let base = if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    base.checked_add_days(Days::new(days as u64))
}

fn western_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d{4})[-/.年](\d{1,2})[-/.月](\d{1,2})日?(?:[ T].*)?$").unwrap()
    })
}

fn compact_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{4})(\d{2})(\d{2})$").unwrap())
}

fn era_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(令和|平成|昭和|大正|[RHSTrhst])(\d{1,2}|元)[-/.年](\d{1,2})[-/.月](\d{1,2})日?$")
            .unwrap()
    })
}

/// Parse the date spellings found in payroll sheets
pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let text: String = raw.nfkc().collect();
    let text = text.trim();

    if let Some(caps) = western_date_re()
        .captures(text)
        .or_else(|| compact_date_re().captures(text))
    {
        return NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
    }

    let caps = era_date_re().captures(text)?;
    let year = era_year(&caps[1], &caps[2])?;
    NaiveDate::from_ymd_opt(year, caps[3].parse().ok()?, caps[4].parse().ok()?)
}

/// Gregorian year of a Japanese era year (`元` is year 1)
pub(crate) fn era_year(era: &str, year: &str) -> Option<i32> {
    let offset = match era {
        "令和" | "R" | "r" => 2018,
        "平成" | "H" | "h" => 1988,
        "昭和" | "S" | "s" => 1925,
        "大正" | "T" | "t" => 1911,
        _ => return None,
    };
    let n: i32 = if year == "元" { 1 } else { year.parse().ok()? };
    (n >= 1).then_some(offset + n)
}

/// Trimmed display text of a cell, `None` when blank
pub fn coerce_text(value: &CellValue) -> Option<String> {
    let text = value.display_text();
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn coerce_gender(value: &CellValue) -> Option<Gender> {
    let text: String = value
        .display_text()
        .nfkc()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect();
    match text.as_str() {
        "男" | "男性" | "m" | "male" => Some(Gender::Male),
        "女" | "女性" | "f" | "female" => Some(Gender::Female),
        _ => None,
    }
}
