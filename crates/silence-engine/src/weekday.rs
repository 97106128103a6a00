//! Weekday matching.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;

use crate::parse::Weekday;

/// Check whether `now` falls on one of `weekdays`.
///
/// Only the calendar date of `now` matters. An absent or empty set places no
/// constraint and matches every timestamp.
pub fn matches(weekdays: Option<&BTreeSet<Weekday>>, now: &NaiveDateTime) -> bool {
    match weekdays {
        None => true,
        Some(days) if days.is_empty() => true,
        Some(days) => days.contains(&Weekday::of(now)),
    }
}

/// Monday through Friday.
pub fn workdays() -> BTreeSet<Weekday> {
    (0..5).filter_map(Weekday::from_index).collect()
}
