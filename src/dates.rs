use chrono::{
    DateTime, Datelike, Duration as ChronoDuration, FixedOffset, NaiveDate, NaiveDateTime,
    TimeZone, Utc,
};

use crate::model::CoreError;

/// An instant together with the local offset it is observed from.
pub type LocalTime = DateTime<FixedOffset>;

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses a stored deadline.
///
/// Strings with an offset keep it, naive date-times are wall-clock times in `zone`,
/// and bare dates are midnight UTC. The result is expressed in `zone`.
pub fn parse_deadline(raw: &str, zone: &FixedOffset) -> Result<LocalTime, CoreError> {
    let trimmed = raw.trim();
    let invalid = || CoreError::InvalidDeadline {
        value: raw.to_string(),
    };
    if trimmed.is_empty() {
        return Err(invalid());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(zone));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return zone.from_local_datetime(&naive).single().ok_or_else(invalid);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
        return Ok(Utc.from_utc_datetime(&naive).with_timezone(zone));
    }
    Err(invalid())
}

/// `YYYY-MM-DD` of the instant in UTC.
pub fn date_key<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    instant.naive_utc().format("%Y-%m-%d").to_string()
}

/// Lookup key for a grid day: the UTC key of local midnight in `zone`.
pub fn day_key(date: NaiveDate, zone: &FixedOffset) -> String {
    match date
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| zone.from_local_datetime(&midnight).single())
    {
        Some(midnight) => date_key(&midnight),
        None => date.format("%Y-%m-%d").to_string(),
    }
}

pub fn is_same_day<A: TimeZone, B: TimeZone>(a: &DateTime<A>, b: &DateTime<B>) -> bool {
    date_key(a) == date_key(b)
}

pub fn is_today(date: NaiveDate, now: &LocalTime) -> bool {
    day_key(date, now.offset()) == date_key(now)
}

/// Monday on or before `date`.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    let back = date.weekday().num_days_from_monday();
    date.checked_sub_signed(ChronoDuration::days(i64::from(back)))
        .unwrap_or(date)
}

pub fn start_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn end_of_month(date: NaiveDate) -> NaiveDate {
    let next = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    next.and_then(|d| d.pred_opt()).unwrap_or(date)
}

/// First day of a 0-based month.
pub fn first_of_month(year: i32, month0: u32) -> Result<NaiveDate, CoreError> {
    if month0 > 11 {
        return Err(CoreError::InvalidMonth(month0));
    }
    NaiveDate::from_ymd_opt(year, month0 + 1, 1)
        .ok_or_else(|| CoreError::DateOutOfRange(format!("{year}-{}", month0 + 1)))
}

/// Moves a `(year, 0-based month)` pair by `delta` months.
pub fn shift_month(year: i32, month0: u32, delta: i32) -> Result<(i32, u32), CoreError> {
    if month0 > 11 {
        return Err(CoreError::InvalidMonth(month0));
    }
    let total = i64::from(year) * 12 + i64::from(month0) + i64::from(delta);
    let shifted = i32::try_from(total.div_euclid(12))
        .map_err(|_| CoreError::DateOutOfRange(format!("{year}-{} + {delta} months", month0 + 1)))?;
    Ok((shifted, total.rem_euclid(12) as u32))
}

pub fn shift_week(date: NaiveDate, delta: i64) -> Result<NaiveDate, CoreError> {
    delta
        .checked_mul(7)
        .and_then(ChronoDuration::try_days)
        .and_then(|span| date.checked_add_signed(span))
        .ok_or_else(|| CoreError::DateOutOfRange(format!("{date} + {delta} weeks")))
}

/// Heading for a month view, e.g. "October 2026".
pub fn month_title(year: i32, month0: u32) -> Result<String, CoreError> {
    Ok(first_of_month(year, month0)?.format("%B %Y").to_string())
}
