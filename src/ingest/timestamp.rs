// src/ingest/timestamp.rs - Two-stage timestamp parsing for export rows

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Formats carrying an explicit offset. The offset is dropped and the wall-clock time kept.
const OFFSET_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M:%S%.f %:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
];

const NAIVE_DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];

const UTC_SUFFIXES: [&str; 4] = [" UTC", " GMT", "UTC", "Z"];

static DAY_MONTH_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(\d{1,2})\s+(\p{L}+)\.?,?\s+(\d{4})(?:\s*(?:г\.?|года))?(?:,?\s+(?:в\s+|at\s+)?(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([ap]m)?)?$",
    )
    .expect("day-month-year pattern is valid")
});

static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(\p{L}+)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})(?:,?\s+(?:at\s+)?(\d{1,2}):(\d{2})(?::(\d{2}))?\s*([ap]m)?)?$",
    )
    .expect("month-day-year pattern is valid")
});

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "january" | "jan" | "январь" | "января" | "янв" => 1,
        "february" | "feb" | "февраль" | "февраля" | "фев" => 2,
        "march" | "mar" | "март" | "марта" | "мар" => 3,
        "april" | "apr" | "апрель" | "апреля" | "апр" => 4,
        "may" | "май" | "мая" => 5,
        "june" | "jun" | "июнь" | "июня" | "июн" => 6,
        "july" | "jul" | "июль" | "июля" | "июл" => 7,
        "august" | "aug" | "август" | "августа" | "авг" => 8,
        "september" | "sep" | "sept" | "сентябрь" | "сентября" | "сен" | "сент" => 9,
        "october" | "oct" | "октябрь" | "октября" | "окт" => 10,
        "november" | "nov" | "ноябрь" | "ноября" | "ноя" => 11,
        "december" | "dec" | "декабрь" | "декабря" | "дек" => 12,
        _ => return None,
    };
    Some(month)
}

fn strip_utc_suffix(s: &str) -> &str {
    for suffix in UTC_SUFFIXES {
        if let Some(stripped) = s.strip_suffix(suffix) {
            return stripped.trim_end();
        }
    }
    s
}

/// Stage one: ISO-like and RFC formats.
fn parse_general(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_local());
        }
    }

    let naive = strip_utc_suffix(s);
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(naive, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn build_from_parts(caps: &Captures, year: usize, month: usize, day: usize) -> Option<NaiveDateTime> {
    let year: i32 = caps.get(year)?.as_str().parse().ok()?;
    let month = month_number(caps.get(month)?.as_str())?;
    let day: u32 = caps.get(day)?.as_str().parse().ok()?;

    let mut hour: u32 = caps.get(4).map_or(Some(0), |m| m.as_str().parse().ok())?;
    let minute: u32 = caps.get(5).map_or(Some(0), |m| m.as_str().parse().ok())?;
    let second: u32 = caps.get(6).map_or(Some(0), |m| m.as_str().parse().ok())?;
    if let Some(meridiem) = caps.get(7) {
        let pm = meridiem.as_str().eq_ignore_ascii_case("pm");
        if hour == 0 || hour > 12 {
            return None;
        }
        hour = match (pm, hour) {
            (true, 12) => 12,
            (true, h) => h + 12,
            (false, 12) => 0,
            (false, h) => h,
        };
    }

    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

/// Stage two: day/month-name/year text in English or Russian.
fn parse_natural_language(s: &str) -> Option<NaiveDateTime> {
    if let Some(caps) = DAY_MONTH_YEAR.captures(s) {
        return build_from_parts(&caps, 3, 2, 1);
    }
    if let Some(caps) = MONTH_DAY_YEAR.captures(s) {
        return build_from_parts(&caps, 3, 1, 2);
    }
    None
}

/// Parses an export timestamp into a naive datetime.
///
/// An explicit offset is dropped without shifting the time, so the row keeps
/// the calendar day it was recorded on. `None` marks a timestamp neither stage
/// understood.
pub fn parse_timestamp(unparsed_timestamp: &str) -> Option<NaiveDateTime> {
    let trimmed = unparsed_timestamp.trim();
    if trimmed.is_empty() {
        return None;
    }
    parse_general(trimmed).or_else(|| parse_natural_language(trimmed))
}
