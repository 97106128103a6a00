//! Criteria sets: the AND-combination of periods, weekdays and hours.
//!
//! The same [`CriteriaSet`] type backs both the `validity` and the
//! `exclusions` block of a rule. Each field is optional and a field that is
//! absent (or present but empty) places no constraint, so a set with no
//! fields at all matches every timestamp.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::hours::{self, HourRange};
use crate::parse::Weekday;
use crate::period::{self, Period};
use crate::weekday;

/// One dimension of a criteria set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Periods,
    Weekdays,
    Hours,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dimension::Periods => "periods",
            Dimension::Weekdays => "weekdays",
            Dimension::Hours => "hours",
        })
    }
}

/// How a single dimension evaluated against a timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The field is absent or empty.
    Unconstrained,
    Matched,
    Missed,
}

impl Outcome {
    fn from_field(constrained: bool, matched: bool) -> Self {
        match (constrained, matched) {
            (false, _) => Outcome::Unconstrained,
            (true, true) => Outcome::Matched,
            (true, false) => Outcome::Missed,
        }
    }

    pub fn passed(self) -> bool {
        !matches!(self, Outcome::Missed)
    }
}

/// Per-dimension breakdown of a criteria set evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CriteriaTrace {
    pub matched: bool,
    pub periods: Outcome,
    pub weekdays: Outcome,
    pub hours: Outcome,
}

impl CriteriaTrace {
    /// The first dimension that failed, checked in the order periods,
    /// weekdays, hours.
    pub fn first_miss(&self) -> Option<Dimension> {
        self.first_where(|outcome| !outcome.passed())
    }

    /// The first dimension that was constrained and matched, in the same
    /// order. `None` when every dimension was unconstrained.
    pub fn first_hit(&self) -> Option<Dimension> {
        self.first_where(|outcome| outcome == Outcome::Matched)
    }

    fn first_where(&self, pred: impl Fn(Outcome) -> bool) -> Option<Dimension> {
        [
            (Dimension::Periods, self.periods),
            (Dimension::Weekdays, self.weekdays),
            (Dimension::Hours, self.hours),
        ]
        .into_iter()
        .find(|(_, outcome)| pred(*outcome))
        .map(|(dimension, _)| dimension)
    }
}

/// Time constraints of a validity or exclusions block.
///
/// `None` means the field was not written at all; `Some` with an empty
/// collection means it was written empty. Both currently evaluate as "no
/// constraint".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CriteriaSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periods: Option<Vec<Period>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weekdays: Option<BTreeSet<Weekday>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours: Option<Vec<HourRange>>,
}

impl CriteriaSet {
    pub fn with_periods(mut self, periods: impl IntoIterator<Item = Period>) -> Self {
        self.periods = Some(periods.into_iter().collect());
        self
    }

    pub fn with_weekdays(mut self, weekdays: impl IntoIterator<Item = Weekday>) -> Self {
        self.weekdays = Some(weekdays.into_iter().collect());
        self
    }

    pub fn with_hours(mut self, hours: impl IntoIterator<Item = HourRange>) -> Self {
        self.hours = Some(hours.into_iter().collect());
        self
    }

    /// True when no field constrains anything.
    pub fn is_unconstrained(&self) -> bool {
        self.periods.as_ref().is_none_or(Vec::is_empty)
            && self.weekdays.as_ref().is_none_or(BTreeSet::is_empty)
            && self.hours.as_ref().is_none_or(Vec::is_empty)
    }

    /// AND-evaluate every present field against `now`.
    pub fn matches(&self, now: &NaiveDateTime) -> bool {
        period::matches(self.periods.as_deref(), now)
            && weekday::matches(self.weekdays.as_ref(), now)
            && hours::matches(self.hours.as_deref(), now)
    }

    /// Evaluate every dimension against `now` and report each outcome.
    ///
    /// `explain(now).matched == matches(now)` always holds.
    pub fn explain(&self, now: &NaiveDateTime) -> CriteriaTrace {
        let periods = Outcome::from_field(
            self.periods.as_ref().is_some_and(|p| !p.is_empty()),
            period::matches(self.periods.as_deref(), now),
        );
        let weekdays = Outcome::from_field(
            self.weekdays.as_ref().is_some_and(|w| !w.is_empty()),
            weekday::matches(self.weekdays.as_ref(), now),
        );
        let hours = Outcome::from_field(
            self.hours.as_ref().is_some_and(|h| !h.is_empty()),
            hours::matches(self.hours.as_deref(), now),
        );

        CriteriaTrace {
            matched: periods.passed() && weekdays.passed() && hours.passed(),
            periods,
            weekdays,
            hours,
        }
    }
}

impl fmt::Display for CriteriaSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(periods) = self.periods.as_ref().filter(|p| !p.is_empty()) {
            let list: Vec<String> = periods.iter().map(ToString::to_string).collect();
            parts.push(format!("periods=[{}]", list.join(", ")));
        }
        if let Some(weekdays) = self.weekdays.as_ref().filter(|w| !w.is_empty()) {
            let list: Vec<&str> = weekdays.iter().map(|d| d.name()).collect();
            parts.push(format!("weekdays=[{}]", list.join(", ")));
        }
        if let Some(hours) = self.hours.as_ref().filter(|h| !h.is_empty()) {
            let list: Vec<String> = hours.iter().map(ToString::to_string).collect();
            parts.push(format!("hours=[{}]", list.join(", ")));
        }
        if parts.is_empty() {
            f.write_str("always")
        } else {
            f.write_str(&parts.join(" and "))
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
