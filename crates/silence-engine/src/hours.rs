//! Clock-hour range matching.
//!
//! Ranges are half-open: the start minute is included, the end minute is
//! not, so adjacent ranges such as `09:00-12:00` and `12:00-17:00` never
//! both claim `12:00`. A range whose end is earlier than its start wraps
//! past midnight. A range whose end equals its start is empty.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::parse::ClockTime;

/// A time-of-day interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourRange {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl HourRange {
    pub fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }

    /// True when the range spans midnight (e.g. `22:00-02:00`).
    pub fn wraps_midnight(&self) -> bool {
        self.end < self.start
    }

    /// True when the range matches no time at all.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Check whether the clock time `t` falls inside this range.
    pub fn contains_time(&self, t: ClockTime) -> bool {
        if self.start < self.end {
            self.start <= t && t < self.end
        } else if self.start > self.end {
            t >= self.start || t < self.end
        } else {
            false
        }
    }

    /// Check whether the time of day of `now` falls inside this range.
    pub fn contains(&self, now: &NaiveDateTime) -> bool {
        self.contains_time(ClockTime::of(now))
    }
}

impl fmt::Display for HourRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// OR-evaluate `hours` against the time of day of `now`.
///
/// An absent or empty list places no constraint and matches every
/// timestamp.
pub fn matches(hours: Option<&[HourRange]>, now: &NaiveDateTime) -> bool {
    match hours {
        None | Some([]) => true,
        Some(ranges) => {
            let t = ClockTime::of(now);
            ranges.iter().any(|r| r.contains_time(t))
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_clock_time;

    fn range(start: &str, end: &str) -> HourRange {
        HourRange::new(
            parse_clock_time(start).unwrap(),
            parse_clock_time(end).unwrap(),
        )
    }

    fn at(hm: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("2025-11-05 {hm}"), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_plain_range_is_half_open() {
        let r = range("09:00", "12:00");
        assert!(r.contains(&at("09:00:00")));
        assert!(r.contains(&at("11:59:59")));
        assert!(!r.contains(&at("12:00:00")));
        assert!(!r.contains(&at("08:59:59")));
    }

    #[test]
    fn test_wraparound_range() {
        let r = range("22:00", "02:00");
        assert!(r.wraps_midnight());
        assert!(r.contains(&at("22:00:00")));
        assert!(r.contains(&at("23:30:00")));
        assert!(r.contains(&at("00:00:00")));
        assert!(r.contains(&at("01:00:00")));
        assert!(!r.contains(&at("02:00:00")));
        assert!(!r.contains(&at("10:00:00")));
        assert!(!r.contains(&at("21:59:59")));
    }

    #[test]
    fn test_equal_bounds_never_match() {
        let r = range("09:00", "09:00");
        assert!(r.is_empty());
        assert!(!r.wraps_midnight());
        for hm in ["00:00:00", "08:59:00", "09:00:00", "09:00:30", "09:01:00", "23:59:59"] {
            assert!(!r.contains(&at(hm)), "{hm}");
        }
    }

    #[test]
    fn test_range_ending_at_last_minute() {
        let r = range("23:00", "23:59");
        assert!(r.contains(&at("23:58:59")));
        assert!(!r.contains(&at("23:59:00")));
    }

    #[test]
    fn test_wrap_to_midnight_start() {
        // 18:00-00:00 wraps, so it covers the rest of the day and nothing after.
        let r = range("18:00", "00:00");
        assert!(r.contains(&at("23:59:59")));
        assert!(!r.contains(&at("00:00:00")));
    }

    #[test]
    fn test_adjacent_ranges_do_not_overlap() {
        let morning = range("09:00", "12:00");
        let afternoon = range("12:00", "17:00");
        let noon = at("12:00:00");
        assert!(!morning.contains(&noon));
        assert!(afternoon.contains(&noon));
    }

    #[test]
    fn test_matches_is_or_over_ranges() {
        let ranges = [range("09:00", "12:00"), range("14:00", "17:00")];
        assert!(matches(Some(&ranges), &at("10:00:00")));
        assert!(matches(Some(&ranges), &at("15:00:00")));
        assert!(!matches(Some(&ranges), &at("13:00:00")));
    }

    #[test]
    fn test_matches_absent_and_empty_lists() {
        assert!(matches(None, &at("13:00:00")));
        assert!(matches(Some(&[]), &at("13:00:00")));
    }

    #[test]
    fn test_display() {
        assert_eq!(range("7:05", "22:00").to_string(), "07:05-22:00");
    }
}
