//! Temporal value parsing.
//!
//! Turns the raw strings found in rule definitions into typed values:
//! calendar dates and date-times ([`TemporalPoint`]), canonical weekdays
//! ([`Weekday`]) and minute-resolution clock times ([`ClockTime`]).
//!
//! Parsing happens once, when a rule is loaded. Evaluation only ever sees the
//! typed values, so none of the matchers branch on raw string shapes.
//!
//! Every parser is strict: input that does not match one of the accepted
//! forms is rejected with a format error instead of being truncated or
//! guessed at.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Result, SilenceError};

// ── TemporalPoint ───────────────────────────────────────────────────────────

/// A period boundary: either a whole calendar day or an exact date-time.
///
/// The distinction matters for comparisons. A bare date used as a period
/// start means the first instant of that day; used as a period end it covers
/// the day through its last instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum TemporalPoint {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl TemporalPoint {
    /// True when `now` is at or after this point taken as a period start.
    pub fn starts_by(&self, now: &NaiveDateTime) -> bool {
        match self {
            TemporalPoint::Date(date) => now.date() >= *date,
            TemporalPoint::DateTime(dt) => now >= dt,
        }
    }

    /// True when `now` is at or before this point taken as a period end.
    pub fn ends_after(&self, now: &NaiveDateTime) -> bool {
        match self {
            TemporalPoint::Date(date) => now.date() <= *date,
            TemporalPoint::DateTime(dt) => now <= dt,
        }
    }

    /// The calendar day this point falls on.
    pub fn date(&self) -> NaiveDate {
        match self {
            TemporalPoint::Date(date) => *date,
            TemporalPoint::DateTime(dt) => dt.date(),
        }
    }

    pub fn is_date_only(&self) -> bool {
        matches!(self, TemporalPoint::Date(_))
    }
}

impl fmt::Display for TemporalPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemporalPoint::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            TemporalPoint::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Parse a period boundary.
///
/// Accepted forms: `YYYY-MM-DD`, `YYYY-MM-DD HH:MM`, `YYYY-MM-DD HH:MM:SS`.
///
/// # Errors
///
/// Returns [`SilenceError::InvalidDate`] for any other shape, and for
/// well-shaped input naming a day or time that does not exist
/// (e.g. `2025-02-30`).
///
/// # Examples
///
/// ```
/// use silence_engine::parse::{parse_temporal_point, TemporalPoint};
///
/// let point = parse_temporal_point("2025-11-06").unwrap();
/// assert!(matches!(point, TemporalPoint::Date(_)));
///
/// let point = parse_temporal_point("2025-11-06 18:30").unwrap();
/// assert!(matches!(point, TemporalPoint::DateTime(_)));
///
/// assert!(parse_temporal_point("06/11/2025").is_err());
/// ```
pub fn parse_temporal_point(raw: &str) -> Result<TemporalPoint> {
    let s = raw.trim();
    let bytes = s.as_bytes();

    let invalid = || {
        SilenceError::InvalidDate(format!(
            "'{raw}': expected YYYY-MM-DD, YYYY-MM-DD HH:MM or YYYY-MM-DD HH:MM:SS"
        ))
    };

    // Shape check first: chrono alone would accept single-digit months and
    // signed years.
    let shape_ok = match bytes.len() {
        10 => has_shape(bytes, b"dddd-dd-dd"),
        16 => has_shape(bytes, b"dddd-dd-dd dd:dd"),
        19 => has_shape(bytes, b"dddd-dd-dd dd:dd:dd"),
        _ => false,
    };
    if !shape_ok {
        return Err(invalid());
    }

    let parsed = match bytes.len() {
        10 => NaiveDate::parse_from_str(s, "%Y-%m-%d").map(TemporalPoint::Date),
        16 => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").map(TemporalPoint::DateTime),
        _ => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(TemporalPoint::DateTime),
    };

    parsed.map_err(|e| SilenceError::InvalidDate(format!("'{raw}': {e}")))
}

/// Match `bytes` against a template where `d` stands for an ASCII digit and
/// every other byte must match literally.
fn has_shape(bytes: &[u8], template: &[u8]) -> bool {
    bytes.len() == template.len()
        && bytes.iter().zip(template).all(|(b, t)| match t {
            b'd' => b.is_ascii_digit(),
            _ => b == t,
        })
}

// ── Weekday ─────────────────────────────────────────────────────────────────

/// Canonical weekday: Monday = 0 .. Sunday = 6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Weekday(u8);

impl Weekday {
    pub const MONDAY: Weekday = Weekday(0);
    pub const TUESDAY: Weekday = Weekday(1);
    pub const WEDNESDAY: Weekday = Weekday(2);
    pub const THURSDAY: Weekday = Weekday(3);
    pub const FRIDAY: Weekday = Weekday(4);
    pub const SATURDAY: Weekday = Weekday(5);
    pub const SUNDAY: Weekday = Weekday(6);

    const NAMES: [&'static str; 7] = [
        "monday",
        "tuesday",
        "wednesday",
        "thursday",
        "friday",
        "saturday",
        "sunday",
    ];

    /// Build a weekday from its canonical index, `None` outside `0..=6`.
    pub fn from_index(index: i64) -> Option<Weekday> {
        u8::try_from(index)
            .ok()
            .filter(|i| *i <= 6)
            .map(Weekday)
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// The weekday of the calendar day `now` falls on.
    pub fn of(now: &NaiveDateTime) -> Weekday {
        Weekday::from(now.weekday())
    }

    /// Lowercase English name, e.g. `"monday"`.
    pub fn name(self) -> &'static str {
        Self::NAMES[self.0 as usize]
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        Weekday(day.num_days_from_monday() as u8)
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A weekday as written in a rule file: a name, an abbreviation, or a number.
///
/// Resolved to a [`Weekday`] once with [`parse_weekday_spec`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum WeekdaySpec {
    Number(i64),
    Name(String),
}

/// Parse a weekday token.
///
/// Accepts full English names and three-letter abbreviations in any case
/// (`"Monday"`, `"mon"`, `"MON"`), or the canonical number `"0"`..`"6"`
/// written as a single digit.
///
/// # Errors
///
/// Returns [`SilenceError::InvalidWeekday`] for anything else.
///
/// # Examples
///
/// ```
/// use silence_engine::parse::{parse_weekday, Weekday};
///
/// assert_eq!(parse_weekday("monday").unwrap(), Weekday::MONDAY);
/// assert_eq!(parse_weekday("Sun").unwrap(), Weekday::SUNDAY);
/// assert_eq!(parse_weekday("4").unwrap(), Weekday::FRIDAY);
/// assert!(parse_weekday("someday").is_err());
/// ```
pub fn parse_weekday(raw: &str) -> Result<Weekday> {
    let s = raw.trim().to_lowercase();

    let by_name = match s.as_str() {
        "monday" | "mon" => Some(Weekday::MONDAY),
        "tuesday" | "tue" => Some(Weekday::TUESDAY),
        "wednesday" | "wed" => Some(Weekday::WEDNESDAY),
        "thursday" | "thu" => Some(Weekday::THURSDAY),
        "friday" | "fri" => Some(Weekday::FRIDAY),
        "saturday" | "sat" => Some(Weekday::SATURDAY),
        "sunday" | "sun" => Some(Weekday::SUNDAY),
        _ => None,
    };
    if let Some(day) = by_name {
        return Ok(day);
    }

    if let [digit @ b'0'..=b'6'] = s.as_bytes() {
        return Ok(Weekday(digit - b'0'));
    }

    Err(SilenceError::InvalidWeekday(format!(
        "'{raw}': expected a weekday name, a 3-letter abbreviation or a number 0-6 (0=Monday)"
    )))
}

/// Resolve a rule-file weekday into its canonical form.
pub fn parse_weekday_spec(spec: &WeekdaySpec) -> Result<Weekday> {
    match spec {
        WeekdaySpec::Number(n) => Weekday::from_index(*n).ok_or_else(|| {
            SilenceError::InvalidWeekday(format!(
                "{n}: weekday numbers must be 0-6 (0=Monday, 6=Sunday)"
            ))
        }),
        WeekdaySpec::Name(name) => parse_weekday(name),
    }
}

// ── ClockTime ───────────────────────────────────────────────────────────────

/// Time of day with minute resolution, stored as minutes since midnight
/// (0..=1439).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime(u16);

impl ClockTime {
    pub const MIDNIGHT: ClockTime = ClockTime(0);

    /// Build from hour and minute, `None` when either is out of range.
    pub fn from_hm(hour: u32, minute: u32) -> Option<ClockTime> {
        (hour <= 23 && minute <= 59).then(|| ClockTime((hour * 60 + minute) as u16))
    }

    /// The clock time of `now`, seconds truncated.
    pub fn of(now: &NaiveDateTime) -> ClockTime {
        ClockTime((now.hour() * 60 + now.minute()) as u16)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Parse an `HH:MM` clock time (24-hour).
///
/// The hour may be written with one or two digits; the minute always has
/// two.
///
/// # Errors
///
/// Returns [`SilenceError::InvalidClockTime`] when the shape is wrong or the
/// hour/minute is out of range.
///
/// # Examples
///
/// ```
/// use silence_engine::parse::parse_clock_time;
///
/// assert_eq!(parse_clock_time("22:30").unwrap().minutes(), 1350);
/// assert_eq!(parse_clock_time("7:05").unwrap().minutes(), 425);
/// assert!(parse_clock_time("24:00").is_err());
/// ```
pub fn parse_clock_time(raw: &str) -> Result<ClockTime> {
    let s = raw.trim();

    let invalid = |detail: &str| {
        SilenceError::InvalidClockTime(format!("'{raw}': {detail}"))
    };

    let (hour_str, minute_str) = s
        .split_once(':')
        .ok_or_else(|| invalid("expected HH:MM (24-hour format)"))?;

    let digits_only = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !digits_only(hour_str) || hour_str.len() > 2 || !digits_only(minute_str) || minute_str.len() != 2
    {
        return Err(invalid("expected HH:MM (24-hour format)"));
    }

    let hour: u32 = hour_str
        .parse()
        .map_err(|_| invalid("invalid hour"))?;
    let minute: u32 = minute_str
        .parse()
        .map_err(|_| invalid("invalid minute"))?;

    ClockTime::from_hm(hour, minute)
        .ok_or_else(|| invalid("hour must be 0-23 and minute 0-59"))
}

// ── Tests ───────────────────────────────────────────────────────────────────
