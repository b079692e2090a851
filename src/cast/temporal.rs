//! DATE / TIME / DATETIME / TIMESTAMP parsing, printing and
//! interconversion. Zone-dependent conversions use the session default
//! zone; precision follows [`TimestampPrecision`].

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Timelike, Utc,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    analyzer::{AnalyzerError, truncate_literal},
    types::{LanguageFeature, LanguageOptions},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampPrecision {
    Micros,
    Nanos,
}

impl TimestampPrecision {
    pub fn from_options(options: &LanguageOptions) -> Self {
        if options.supports(LanguageFeature::TimestampNanos) {
            TimestampPrecision::Nanos
        } else {
            TimestampPrecision::Micros
        }
    }

    fn max_fraction_digits(self) -> usize {
        match self {
            TimestampPrecision::Micros => 6,
            TimestampPrecision::Nanos => 9,
        }
    }
}

static TIMESTAMP_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<date>\d{4}-\d{1,2}-\d{1,2})(?:[ Tt](?P<time>\d{1,2}:\d{1,2}:\d{1,2}(?:\.(?P<frac>\d+))?))?\s*(?P<zone>[Zz]|UTC|[+-]\d{1,2}(?::?\d{2})?)?$",
    )
    .expect("static regex")
});

static TIME_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}:\d{1,2}:\d{1,2}(?:\.(?P<frac>\d+))?$").expect("static regex"));

fn invalid(kind: &str, text: &str) -> AnalyzerError {
    AnalyzerError::eval(format!("Invalid {kind} string \"{}\"", truncate_literal(text)))
}

fn check_year(year: i32, kind: &str, shown: impl FnOnce() -> String) -> Result<(), AnalyzerError> {
    if (1..=9999).contains(&year) {
        Ok(())
    } else {
        Err(AnalyzerError::eval(format!("{kind} value out of range: {}", shown())))
    }
}

fn check_fraction(frac: Option<&str>, precision: TimestampPrecision, kind: &str, text: &str) -> Result<(), AnalyzerError> {
    match frac {
        Some(f) if f.len() > precision.max_fraction_digits() => Err(invalid(kind, text)),
        _ => Ok(()),
    }
}

fn parse_date_part(text: &str, whole: &str, kind: &str) -> Result<NaiveDate, AnalyzerError> {
    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid(kind, whole))?;
    check_year(date.year(), kind, || whole.to_string())?;
    Ok(date)
}

fn parse_time_part(text: &str, whole: &str, kind: &str) -> Result<NaiveTime, AnalyzerError> {
    NaiveTime::parse_from_str(text, "%H:%M:%S%.f").map_err(|_| invalid(kind, whole))
}

pub fn parse_date(text: &str) -> Result<NaiveDate, AnalyzerError> {
    parse_date_part(text.trim(), text, "date")
}

pub fn parse_time(text: &str, precision: TimestampPrecision) -> Result<NaiveTime, AnalyzerError> {
    let t = text.trim();
    let caps = TIME_TEXT.captures(t).ok_or_else(|| invalid("time", text))?;
    check_fraction(caps.name("frac").map(|m| m.as_str()), precision, "time", text)?;
    parse_time_part(t, text, "time")
}

pub fn parse_datetime(text: &str, precision: TimestampPrecision) -> Result<NaiveDateTime, AnalyzerError> {
    let t = text.trim();
    let caps = TIMESTAMP_TEXT.captures(t).ok_or_else(|| invalid("datetime", text))?;
    if caps.name("zone").is_some() {
        return Err(invalid("datetime", text));
    }
    check_fraction(caps.name("frac").map(|m| m.as_str()), precision, "datetime", text)?;
    let date = parse_date_part(&caps["date"], text, "datetime")?;
    let time = match caps.name("time") {
        Some(m) => parse_time_part(m.as_str(), text, "datetime")?,
        None => NaiveTime::MIN,
    };
    Ok(date.and_time(time))
}

fn parse_zone(zone: &str, text: &str) -> Result<FixedOffset, AnalyzerError> {
    if zone.eq_ignore_ascii_case("z") || zone == "UTC" {
        return Ok(Utc.fix());
    }
    let sign = if zone.starts_with('-') { -1 } else { 1 };
    let digits: String = zone[1..].chars().filter(|c| *c != ':').collect();
    let (hours, minutes) = match digits.len() {
        1 | 2 => (digits.parse::<i32>().ok(), Some(0)),
        3 | 4 => {
            let split = digits.len() - 2;
            (digits[..split].parse::<i32>().ok(), digits[split..].parse::<i32>().ok())
        }
        _ => (None, None),
    };
    match (hours, minutes) {
        (Some(h), Some(m)) if h <= 14 && m < 60 => {
            FixedOffset::east_opt(sign * (h * 3600 + m * 60)).ok_or_else(|| invalid("timestamp", text))
        }
        _ => Err(invalid("timestamp", text)),
    }
}

/// Timestamp text with an optional zone suffix (`Z`, `UTC`, `+HH[:MM]`);
/// without one the default zone applies.
pub fn parse_timestamp(
    text: &str,
    default_zone: FixedOffset,
    precision: TimestampPrecision,
) -> Result<DateTime<Utc>, AnalyzerError> {
    let t = text.trim();
    let caps = TIMESTAMP_TEXT.captures(t).ok_or_else(|| invalid("timestamp", text))?;
    check_fraction(caps.name("frac").map(|m| m.as_str()), precision, "timestamp", text)?;
    let date = parse_date_part(&caps["date"], text, "timestamp")?;
    let time = match caps.name("time") {
        Some(m) => parse_time_part(m.as_str(), text, "timestamp")?,
        None => NaiveTime::MIN,
    };
    let zone = match caps.name("zone") {
        Some(z) => parse_zone(z.as_str(), text)?,
        None => default_zone,
    };
    datetime_to_timestamp(date.and_time(time), zone)
}

/// Fractional seconds printed in groups of 3 digits, trailing zero groups
/// dropped.
fn fraction(nanos: u32, precision: TimestampPrecision) -> String {
    let nanos = match precision {
        TimestampPrecision::Micros => nanos / 1000 * 1000,
        TimestampPrecision::Nanos => nanos,
    } % 1_000_000_000;
    if nanos == 0 {
        return String::new();
    }
    let digits = format!("{nanos:09}");
    let keep = if nanos % 1_000_000 == 0 {
        3
    } else if nanos % 1000 == 0 {
        6
    } else {
        9
    };
    format!(".{}", &digits[..keep])
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_time(time: NaiveTime, precision: TimestampPrecision) -> String {
    format!("{}{}", time.format("%H:%M:%S"), fraction(time.nanosecond(), precision))
}

pub fn format_datetime(dt: NaiveDateTime, precision: TimestampPrecision) -> String {
    format!("{}{}", dt.format("%Y-%m-%d %H:%M:%S"), fraction(dt.nanosecond(), precision))
}

/// Renders in `zone` with a `+HH` or `+HH:MM` offset suffix.
pub fn format_timestamp(ts: DateTime<Utc>, zone: FixedOffset, precision: TimestampPrecision) -> String {
    let local = ts.with_timezone(&zone).naive_local();
    let offset = zone.local_minus_utc();
    let sign = if offset < 0 { '-' } else { '+' };
    let (h, m) = (offset.abs() / 3600, offset.abs() % 3600 / 60);
    let suffix = if m == 0 { format!("{sign}{h:02}") } else { format!("{sign}{h:02}:{m:02}") };
    format!("{}{}", format_datetime(local, precision), suffix)
}

pub fn date_to_datetime(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn date_to_timestamp(date: NaiveDate, zone: FixedOffset) -> Result<DateTime<Utc>, AnalyzerError> {
    datetime_to_timestamp(date_to_datetime(date), zone)
}

pub fn datetime_to_timestamp(dt: NaiveDateTime, zone: FixedOffset) -> Result<DateTime<Utc>, AnalyzerError> {
    let ts = zone
        .from_local_datetime(&dt)
        .single()
        .map(|t| t.with_timezone(&Utc))
        .ok_or_else(|| AnalyzerError::eval(format!("Cannot convert DATETIME {dt} to TIMESTAMP")))?;
    check_year(ts.year(), "Timestamp", || format_datetime(dt, TimestampPrecision::Nanos))?;
    Ok(ts)
}

pub fn timestamp_to_datetime(ts: DateTime<Utc>, zone: FixedOffset) -> Result<NaiveDateTime, AnalyzerError> {
    let local = ts.with_timezone(&zone).naive_local();
    check_year(local.year(), "Datetime", || local.to_string())?;
    Ok(local)
}

pub fn timestamp_to_date(ts: DateTime<Utc>, zone: FixedOffset) -> Result<NaiveDate, AnalyzerError> {
    timestamp_to_datetime(ts, zone).map(|dt| dt.date())
}

pub fn timestamp_to_time(ts: DateTime<Utc>, zone: FixedOffset) -> NaiveTime {
    ts.with_timezone(&zone).naive_local().time()
}
