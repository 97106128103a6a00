//! Error types for silence-engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SilenceError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid clock time: {0}")]
    InvalidClockTime(String),

    #[error("Invalid weekday: {0}")]
    InvalidWeekday(String),

    #[error("Invalid rule '{rule}': {source}")]
    InvalidRule {
        rule: String,
        #[source]
        source: Box<SilenceError>,
    },

    #[error("Invalid rule file: {0}")]
    RuleFile(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}

impl SilenceError {
    /// True for errors raised because a date, date-time, clock-time or
    /// weekday token matched none of the accepted forms.
    pub fn is_format_error(&self) -> bool {
        match self {
            SilenceError::InvalidDate(_)
            | SilenceError::InvalidClockTime(_)
            | SilenceError::InvalidWeekday(_) => true,
            SilenceError::InvalidRule { source, .. } => source.is_format_error(),
            SilenceError::RuleFile(_) | SilenceError::InvalidTimezone(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SilenceError>;
