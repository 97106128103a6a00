//! Date and date-time period matching.
//!
//! A list of periods is OR-evaluated: the timestamp has to fall inside at
//! least one of them. Either boundary may be missing, which leaves that side
//! of the period open.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::parse::TemporalPoint;

/// A closed or half-open interval between two [`TemporalPoint`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Period {
    pub start: Option<TemporalPoint>,
    pub end: Option<TemporalPoint>,
}

impl Period {
    pub fn new(start: Option<TemporalPoint>, end: Option<TemporalPoint>) -> Self {
        Self { start, end }
    }

    /// Check whether `now` falls inside this period.
    ///
    /// Both boundaries are inclusive. Date-only boundaries are compared by
    /// calendar day, so a date-only `end` covers that whole day.
    pub fn contains(&self, now: &NaiveDateTime) -> bool {
        let after_start = self.start.is_none_or(|start| start.starts_by(now));
        let before_end = self.end.is_none_or(|end| end.ends_after(now));
        after_start && before_end
    }

    /// True when both boundaries are present and the period cannot contain
    /// any instant.
    pub fn is_inverted(&self) -> bool {
        match (self.start, self.end) {
            (Some(TemporalPoint::Date(s)), Some(end)) => s > end.date(),
            (Some(start), Some(TemporalPoint::Date(e))) => start.date() > e,
            (Some(TemporalPoint::DateTime(s)), Some(TemporalPoint::DateTime(e))) => s > e,
            _ => false,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(start) => write!(f, "{start}")?,
            None => f.write_str("∞")?,
        }
        f.write_str(" → ")?;
        match self.end {
            Some(end) => write!(f, "{end}"),
            None => f.write_str("∞"),
        }
    }
}

/// OR-evaluate `periods` against `now`.
///
/// An absent or empty list places no constraint and matches every
/// timestamp.
pub fn matches(periods: Option<&[Period]>, now: &NaiveDateTime) -> bool {
    match periods {
        None | Some([]) => true,
        Some(periods) => periods.iter().any(|p| p.contains(now)),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
