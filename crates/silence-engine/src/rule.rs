//! Rules and the top-level decision procedure.
//!
//! A rule applies at `now` when its validity block matches (or is absent)
//! and its exclusions block does not match (or is absent):
//!
//! ```text
//! applies = validity_ok AND NOT exclusion_hit
//! ```
//!
//! Evaluation is a pure function of the rule and the timestamp. Nothing is
//! cached or mutated, so a rule can be evaluated from any number of threads
//! at once.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::criteria::{CriteriaSet, CriteriaTrace, Dimension};
use crate::hours::HourRange;
use crate::message::FieldPath;
use crate::period::Period;

/// Placeholder replaced by the environment name in rule names.
pub const ENV_PLACEHOLDER: &str = "[#env#]";

/// Path selector meaning "search every field of the alarm".
pub const WILDCARD_PATH: &str = "*";

/// An alarm silence rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    /// Alarm name pattern. May contain [`ENV_PLACEHOLDER`].
    pub name: String,
    /// Field selector the pattern is matched against, `"*"` for all fields.
    pub path: String,
    /// Environments the rule is restricted to; empty means all.
    pub environments: BTreeSet<String>,
    /// Free-text documentation of why the rule exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity: Option<CriteriaSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusions: Option<CriteriaSet>,
}

impl Rule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: WILDCARD_PATH.to_string(),
            environments: BTreeSet::new(),
            reason: None,
            validity: None,
            exclusions: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_environments<I, S>(mut self, environments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.environments = environments.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_validity(mut self, validity: CriteriaSet) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn with_exclusions(mut self, exclusions: CriteriaSet) -> Self {
        self.exclusions = Some(exclusions);
        self
    }

    /// Decide whether the rule applies at `now`.
    ///
    /// `now` must already be expressed in the deployment's reference zone.
    pub fn applies(&self, now: &NaiveDateTime) -> bool {
        let validity_ok = self.validity.as_ref().is_none_or(|v| v.matches(now));
        let exclusion_hit = self.exclusions.as_ref().is_some_and(|e| e.matches(now));
        validity_ok && !exclusion_hit
    }

    /// Like [`Rule::applies`], but also reports which criterion decided the
    /// outcome.
    pub fn evaluate(&self, now: &NaiveDateTime) -> Decision {
        let validity = self.validity.as_ref().map(|v| v.explain(now));
        let exclusions = self.exclusions.as_ref().map(|e| e.explain(now));

        let exclusion_hit = exclusions.is_some_and(|t| t.matched);
        let reason = match validity.and_then(|t| t.first_miss()) {
            Some(dimension) => DecisionReason::OutsideValidity(dimension),
            None if exclusion_hit => {
                DecisionReason::Excluded(exclusions.and_then(|t| t.first_hit()))
            }
            None if validity.is_none() && exclusions.is_none() => DecisionReason::Unconstrained,
            None => DecisionReason::Valid,
        };

        let decision = Decision {
            applies: matches!(reason, DecisionReason::Valid | DecisionReason::Unconstrained),
            reason,
            validity,
            exclusions,
        };

        tracing::trace!(
            rule = %self.name,
            applies = decision.applies,
            reason = %decision.reason,
            "evaluated rule"
        );

        decision
    }

    /// True when the rule is not restricted to other environments.
    pub fn applies_to_environment(&self, environment: &str) -> bool {
        self.environments.is_empty() || self.environments.contains(environment)
    }

    /// The rule name with [`ENV_PLACEHOLDER`] replaced by `environment`.
    pub fn expand_name(&self, environment: &str) -> String {
        self.name.replace(ENV_PLACEHOLDER, environment)
    }

    /// Constraints that load fine but can never match as written.
    pub fn semantic_warnings(&self) -> Vec<SemanticWarning> {
        let mut warnings = Vec::new();
        if !FieldPath::parse(&self.path).is_known() {
            warnings.push(SemanticWarning::UnknownPath {
                path: self.path.clone(),
            });
        }
        for (block, criteria) in [
            (Block::Validity, &self.validity),
            (Block::Exclusions, &self.exclusions),
        ] {
            let Some(criteria) = criteria else {
                continue;
            };
            for period in criteria.periods.iter().flatten() {
                if period.is_inverted() {
                    warnings.push(SemanticWarning::InvertedPeriod {
                        block,
                        period: *period,
                    });
                }
            }
            for range in criteria.hours.iter().flatten() {
                if range.is_empty() {
                    warnings.push(SemanticWarning::EmptyHourRange {
                        block,
                        range: *range,
                    });
                }
            }
            if block == Block::Exclusions && criteria.is_unconstrained() {
                warnings.push(SemanticWarning::UnconstrainedExclusions);
            }
        }
        warnings
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rule(name='{}', path='{}'", self.name, self.path)?;
        if !self.environments.is_empty() {
            let envs: Vec<&str> = self.environments.iter().map(String::as_str).collect();
            write!(f, ", environments=[{}]", envs.join(", "))?;
        }
        if let Some(validity) = &self.validity {
            write!(f, ", validity={validity}")?;
        }
        if let Some(exclusions) = &self.exclusions {
            write!(f, ", exclusions={exclusions}")?;
        }
        f.write_str(")")
    }
}

// ── Decision ────────────────────────────────────────────────────────────────

/// Why a rule did or did not apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "dimension", rename_all = "snake_case")]
pub enum DecisionReason {
    /// Neither validity nor exclusions are set.
    Unconstrained,
    /// Validity matched (or is absent) and no exclusion matched.
    Valid,
    /// The validity block missed on the given dimension.
    OutsideValidity(Dimension),
    /// Validity matched but the exclusions block matched too, on the given
    /// dimension (`None` for an exclusions block without constraints).
    Excluded(Option<Dimension>),
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionReason::Unconstrained => f.write_str("no time constraints"),
            DecisionReason::Valid => f.write_str("within validity"),
            DecisionReason::OutsideValidity(dimension) => {
                write!(f, "outside validity ({dimension})")
            }
            DecisionReason::Excluded(Some(dimension)) => write!(f, "excluded ({dimension})"),
            DecisionReason::Excluded(None) => f.write_str("excluded"),
        }
    }
}

/// Outcome of [`Rule::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub applies: bool,
    pub reason: DecisionReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity: Option<CriteriaTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusions: Option<CriteriaTrace>,
}

// ── SemanticWarning ─────────────────────────────────────────────────────────

/// Which block of a rule a warning refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    Validity,
    Exclusions,
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Block::Validity => "validity",
            Block::Exclusions => "exclusions",
        })
    }
}

/// A constraint that is accepted at load time but can never match.
///
/// Midnight-crossing hour ranges are valid and never produce a warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SemanticWarning {
    /// `path` names no message field, so the rule matches no message.
    UnknownPath { path: String },
    InvertedPeriod { block: Block, period: Period },
    EmptyHourRange { block: Block, range: HourRange },
    /// An exclusions block with no constraints suppresses the rule at all
    /// times.
    UnconstrainedExclusions,
}

impl fmt::Display for SemanticWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SemanticWarning::UnknownPath { path } => {
                write!(f, "path '{path}' names no message field and never matches")
            }
            SemanticWarning::InvertedPeriod { block, period } => {
                write!(f, "{block}: period {period} ends before it starts and never matches")
            }
            SemanticWarning::EmptyHourRange { block, range } => {
                write!(f, "{block}: hour range {range} has equal bounds and never matches")
            }
            SemanticWarning::UnconstrainedExclusions => {
                f.write_str("exclusions: block has no constraints and excludes at all times")
            }
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
