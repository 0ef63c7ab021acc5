//! ISO-8601 request dates and request-window throttling.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use log::debug;

use super::ReeError;

/// A request bound as accepted by the REE data API.
///
/// Keeps the full timestamp but always formats at minute precision, with the
/// UTC offset appended when one was given:
///
/// ```
/// use pvstats_data::ree::parse_date;
///
/// # fn main() -> Result<(), pvstats_data::ree::ReeError> {
/// assert_eq!(parse_date("2022-01-01T00:00:30")?.to_string(), "2022-01-01T00:00");
/// assert_eq!(parse_date("2022-01-01 08:15+01:00")?.to_string(), "2022-01-01T08:15+01:00");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiDate {
    local: NaiveDateTime,
    offset: Option<FixedOffset>,
}

impl ApiDate {
    /// Wall-clock timestamp, ignoring any offset.
    #[must_use]
    pub const fn local(&self) -> NaiveDateTime {
        self.local
    }

    /// Calendar date of the wall-clock timestamp.
    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.local.date()
    }

    /// UTC offset, when the input carried one.
    #[must_use]
    pub const fn offset(&self) -> Option<FixedOffset> {
        self.offset
    }

    /// Date formatted as `YYYYMMDD`, as used in output file names.
    #[must_use]
    pub fn compact_date(&self) -> String {
        self.local.format("%Y%m%d").to_string()
    }

    fn shifted(self, delta: TimeDelta) -> Option<Self> {
        Some(Self {
            local: self.local.checked_add_signed(delta)?,
            offset: self.offset,
        })
    }

    /// Elapsed time from `earlier` to `self`.
    ///
    /// When both bounds carry an offset the difference is taken in UTC,
    /// otherwise between the wall-clock timestamps.
    #[must_use]
    pub fn since(&self, earlier: &Self) -> TimeDelta {
        match (self.offset, earlier.offset) {
            (Some(own), Some(other)) => {
                let own = self.local - TimeDelta::seconds(i64::from(own.local_minus_utc()));
                let other = earlier.local - TimeDelta::seconds(i64::from(other.local_minus_utc()));
                own - other
            }
            _ => self.local - earlier.local,
        }
    }
}

impl From<NaiveDateTime> for ApiDate {
    fn from(local: NaiveDateTime) -> Self {
        Self {
            local,
            offset: None,
        }
    }
}

impl From<NaiveDate> for ApiDate {
    fn from(date: NaiveDate) -> Self {
        Self::from(date.and_time(NaiveTime::MIN))
    }
}

impl From<DateTime<FixedOffset>> for ApiDate {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self {
            local: value.naive_local(),
            offset: Some(*value.offset()),
        }
    }
}

impl fmt::Display for ApiDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.local.format("%Y-%m-%dT%H:%M"))?;
        if let Some(offset) = self.offset {
            write!(f, "{offset}")?;
        }
        Ok(())
    }
}

impl FromStr for ApiDate {
    type Err = ReeError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        parse_date(text)
    }
}

fn parse_time(text: &str) -> Option<NaiveTime> {
    ["%H:%M:%S%.f", "%H:%M", "%H%M%S", "%H%M"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
        .or_else(|| {
            let hour: u32 = text.parse().ok().filter(|_| text.len() == 2)?;
            NaiveTime::from_hms_opt(hour, 0, 0)
        })
}

fn parse_offset(text: &str) -> Option<FixedOffset> {
    if text == "Z" {
        return FixedOffset::east_opt(0);
    }
    let sign = match text.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let digits: String = text.chars().skip(1).filter(|ch| *ch != ':').collect();
    if !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return None;
    }
    let (hours, minutes) = match digits.len() {
        2 => (digits.parse::<i32>().ok()?, 0),
        4 => (
            digits.get(..2)?.parse::<i32>().ok()?,
            digits.get(2..)?.parse::<i32>().ok()?,
        ),
        _ => return None,
    };
    if minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Split `HH:MM[:SS[.f]][offset]` into the time and the offset designator.
fn split_offset(text: &str) -> (&str, Option<&str>) {
    if let Some(time) = text.strip_suffix('Z') {
        return (time, Some("Z"));
    }
    text.find(['+', '-']).map_or((text, None), |index| {
        let (time, offset) = text.split_at(index);
        (time, Some(offset))
    })
}

/// Split a leading `YYYY-MM-DD` or `YYYYMMDD` date from the rest of `text`.
fn split_calendar_date(text: &str) -> Option<(NaiveDate, &str)> {
    if text.get(4..5) == Some("-") {
        let date = NaiveDate::parse_from_str(text.get(..10)?, "%Y-%m-%d").ok()?;
        return Some((date, text.get(10..)?));
    }
    let digits = text.get(..8)?;
    if !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let date = NaiveDate::from_ymd_opt(
        digits.get(..4)?.parse().ok()?,
        digits.get(4..6)?.parse().ok()?,
        digits.get(6..)?.parse().ok()?,
    )?;
    Some((date, text.get(8..)?))
}

/// Parse an ISO-8601 date or date-time.
///
/// Accepts an extended `YYYY-MM-DD` or basic `YYYYMMDD` date, optionally
/// followed by `T` or a space and a time (`HH`, `HH:MM`, `HHMM`, `HH:MM:SS`
/// with an optional fraction, or `HHMMSS`), optionally followed by `Z` or a
/// `±HH[:MM]` offset. Week dates and ordinal dates are rejected.
///
/// # Errors
///
/// Returns [`ReeError::InvalidDate`] for anything else.
///
/// # Examples
///
/// ```
/// use pvstats_data::ree::{ReeError, parse_date};
///
/// assert_eq!(parse_date("2022-01-01").map(|d| d.to_string()).ok(), Some("2022-01-01T00:00".to_owned()));
/// assert!(matches!(parse_date("1-1-2022"), Err(ReeError::InvalidDate { .. })));
/// ```
pub fn parse_date(text: &str) -> Result<ApiDate, ReeError> {
    let invalid = || ReeError::InvalidDate {
        input: text.to_owned(),
    };
    let (date, rest) = split_calendar_date(text.trim()).ok_or_else(invalid)?;
    if rest.is_empty() {
        return Ok(ApiDate::from(date));
    }
    let time_part = rest
        .strip_prefix('T')
        .or_else(|| rest.strip_prefix(' '))
        .ok_or_else(invalid)?;
    let (time, offset) = split_offset(time_part);
    let time = parse_time(time).ok_or_else(invalid)?;
    let offset = offset
        .map(|raw| parse_offset(raw).ok_or_else(invalid))
        .transpose()?;
    Ok(ApiDate {
        local: date.and_time(time),
        offset,
    })
}

/// One request window produced by [`throttle_request_dates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    /// Inclusive window start.
    pub start: ApiDate,
    /// Window end.
    pub end: ApiDate,
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.start, self.end)
    }
}

/// Split `start .. end` into windows spanning at most `max_days` days.
///
/// A range of at most `max_days` whole days comes back as a single window.
/// Longer ranges yield `days / max_days` windows of exactly `max_days` days
/// followed by one window covering whatever remains, if anything does.
///
/// # Errors
///
/// Returns [`ReeError::InvalidRange`] when `end` precedes `start` or
/// `max_days` is zero.
///
/// # Examples
///
/// ```
/// use pvstats_data::ree::{parse_date, throttle_request_dates};
///
/// # fn main() -> Result<(), pvstats_data::ree::ReeError> {
/// let windows = throttle_request_dates(
///     parse_date("2022-01-01T00:00")?,
///     parse_date("2022-03-01T00:00")?,
///     31,
/// )?;
/// assert_eq!(windows.len(), 2);
/// assert_eq!(windows[1].start.to_string(), "2022-02-01T00:00");
/// # Ok(())
/// # }
/// ```
pub fn throttle_request_dates(
    start: ApiDate,
    end: ApiDate,
    max_days: u32,
) -> Result<Vec<DateWindow>, ReeError> {
    let invalid = |reason| ReeError::InvalidRange {
        start: start.to_string(),
        end: end.to_string(),
        reason,
    };
    if max_days == 0 {
        return Err(invalid("the per-request day limit must be positive"));
    }
    let delta = end.since(&start);
    if delta < TimeDelta::zero() {
        return Err(invalid("the end precedes the start"));
    }

    let limit = i64::from(max_days);
    let delta_days = delta.num_days();
    if delta_days <= limit {
        return Ok(vec![DateWindow { start, end }]);
    }

    let step = TimeDelta::days(limit);
    let mut windows = Vec::new();
    let mut cursor = start;
    for _ in 0..delta_days / limit {
        let next = cursor
            .shifted(step)
            .ok_or_else(|| invalid("the range overflows the calendar"))?;
        debug!("a request will be generated from {cursor} to {next}");
        windows.push(DateWindow {
            start: cursor,
            end: next,
        });
        cursor = next;
    }
    if end.since(&cursor) > TimeDelta::zero() {
        debug!("a request will be generated from {cursor} to {end}");
        windows.push(DateWindow { start: cursor, end });
    }
    Ok(windows)
}
