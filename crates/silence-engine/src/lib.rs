//! # silence-engine
//!
//! Deterministic time-window evaluation for alarm silence rules.
//!
//! A rule carries an optional `validity` block (when it is active) and an
//! optional `exclusions` block (when, despite being valid, it must not
//! apply). Each block combines date periods, weekdays and clock-hour ranges.
//! Rule definitions are parsed once; evaluation is a pure function of the
//! rule and a timestamp and never fails.
//!
//! ## Modules
//!
//! - [`parse`] — raw strings → dates, date-times, weekdays, clock times
//! - [`period`] — OR over open or closed date(-time) periods
//! - [`weekday`] — weekday set membership
//! - [`hours`] — OR over clock-hour ranges, including ranges across midnight
//! - [`criteria`] — AND over the present dimensions of a validity/exclusions block
//! - [`rule`] — `applies = validity AND NOT exclusions`, with a decision trace
//! - [`loader`] — YAML rule file → typed rules, with per-rule failures
//! - [`message`] — matching alarm messages against a rule's pattern and path
//! - [`zone`] — resolving instants into the reference zone's wall-clock time
//! - [`error`] — Error types

pub mod criteria;
pub mod error;
pub mod hours;
pub mod loader;
pub mod message;
pub mod parse;
pub mod period;
pub mod rule;
pub mod weekday;
pub mod zone;

pub use criteria::{CriteriaSet, CriteriaTrace, Dimension, Outcome};
pub use error::SilenceError;
pub use hours::HourRange;
pub use loader::{load_rule_file, parse_rule_file, RuleFailure, RuleFile, RuleSet, RuleWarning};
pub use message::{find_suppression, matches_message, FieldPath, Suppression};
pub use parse::{
    parse_clock_time, parse_temporal_point, parse_weekday, ClockTime, TemporalPoint, Weekday,
    WeekdaySpec,
};
pub use period::Period;
pub use rule::{Block, Decision, DecisionReason, Rule, SemanticWarning};
pub use zone::ReferenceZone;
