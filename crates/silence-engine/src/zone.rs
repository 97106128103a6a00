//! Reference time zone.
//!
//! Rules are written in wall-clock time of a single deployment zone. The
//! evaluator works on naive local timestamps, so callers resolve instants
//! through a [`ReferenceZone`] first.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;

use crate::error::{Result, SilenceError};

/// Zone used when neither the rule file nor the caller names one.
pub const DEFAULT_ZONE: &str = "Europe/Rome";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceZone(Tz);

impl ReferenceZone {
    /// Parse an IANA zone name such as `"Europe/Rome"`.
    ///
    /// # Errors
    ///
    /// Returns [`SilenceError::InvalidTimezone`] if the name is not a known
    /// IANA zone.
    pub fn parse(name: &str) -> Result<Self> {
        name.trim()
            .parse::<Tz>()
            .map(ReferenceZone)
            .map_err(|_| SilenceError::InvalidTimezone(format!("'{name}'")))
    }

    /// Wall-clock time in this zone at `instant`.
    pub fn localize(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.0).naive_local()
    }

    /// Current wall-clock time in this zone, read from the system clock.
    pub fn now(&self) -> NaiveDateTime {
        self.localize(Utc::now())
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }
}

impl Default for ReferenceZone {
    fn default() -> Self {
        ReferenceZone(Tz::Europe__Rome)
    }
}

impl fmt::Display for ReferenceZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
