//! Alarm message matching.
//!
//! A rule's `name` doubles as the text pattern it looks for and its `path`
//! says where in a chat message to look:
//!
//! - `*` searches the message text, the `title`, `fallback` and `text` of
//!   every attachment, and the `name` and `plain_text` of every file
//! - `text` is the message text only
//! - `attachments.<field>` and `files.<field>` read that field of every
//!   attachment or file
//! - `attachments.title.alarm_name` reads the alarm name out of titles of the
//!   form `#45533: ALARM: "Name" in Location`
//!
//! Matching is a case-insensitive substring test. A message is ignored by
//! the first rule that both matches it and applies at the evaluation time.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde_json::Value;

use crate::rule::{Decision, Rule, WILDCARD_PATH};

static ALARM_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"#\d+: ALARM: "([^"]+)" in .+"#).expect("valid alarm title regex")
});

const ATTACHMENT_FIELDS: [&str; 3] = ["title", "fallback", "text"];
const FILE_FIELDS: [&str; 2] = ["name", "plain_text"];

// ── FieldPath ───────────────────────────────────────────────────────────────

/// Where in a message a rule looks for its pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPath {
    Wildcard,
    Text,
    AlarmName,
    Attachments(String),
    Files(String),
    /// A path no message field answers to. Never matches.
    Unknown(String),
}

impl FieldPath {
    pub fn parse(path: &str) -> FieldPath {
        if path == WILDCARD_PATH {
            return FieldPath::Wildcard;
        }
        let parts: Vec<&str> = path.split('.').collect();
        match parts.as_slice() {
            ["text"] => FieldPath::Text,
            ["attachments", "title", "alarm_name"] => FieldPath::AlarmName,
            ["attachments", field] if !field.is_empty() => FieldPath::Attachments(field.to_string()),
            ["files", field] if !field.is_empty() => FieldPath::Files(field.to_string()),
            _ => FieldPath::Unknown(path.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, FieldPath::Unknown(_))
    }

    /// The string values this path selects from `message`, in message order.
    ///
    /// Missing fields and non-string values are skipped.
    pub fn values<'a>(&self, message: &'a Value) -> Vec<&'a str> {
        let text = || message.get("text").and_then(Value::as_str);

        match self {
            FieldPath::Wildcard => {
                let mut values: Vec<&str> = text().into_iter().collect();
                for attachment in items(message, "attachments") {
                    values.extend(
                        ATTACHMENT_FIELDS
                            .iter()
                            .filter_map(|f| attachment.get(*f).and_then(Value::as_str)),
                    );
                }
                for file in items(message, "files") {
                    values.extend(
                        FILE_FIELDS
                            .iter()
                            .filter_map(|f| file.get(*f).and_then(Value::as_str)),
                    );
                }
                values
            }
            FieldPath::Text => text().into_iter().collect(),
            FieldPath::AlarmName => item_fields(message, "attachments", "title")
                .into_iter()
                .filter_map(extract_alarm_name)
                .collect(),
            FieldPath::Attachments(field) => item_fields(message, "attachments", field),
            FieldPath::Files(field) => item_fields(message, "files", field),
            FieldPath::Unknown(_) => Vec::new(),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldPath::Wildcard => f.write_str(WILDCARD_PATH),
            FieldPath::Text => f.write_str("text"),
            FieldPath::AlarmName => f.write_str("attachments.title.alarm_name"),
            FieldPath::Attachments(field) => write!(f, "attachments.{field}"),
            FieldPath::Files(field) => write!(f, "files.{field}"),
            FieldPath::Unknown(path) => f.write_str(path),
        }
    }
}

fn items<'a>(message: &'a Value, list: &str) -> impl Iterator<Item = &'a Value> {
    message
        .get(list)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn item_fields<'a>(message: &'a Value, list: &str, field: &str) -> Vec<&'a str> {
    items(message, list)
        .filter_map(|item| item.get(field).and_then(Value::as_str))
        .collect()
}

/// The alarm name inside a `#<id>: ALARM: "<name>" in <location>` title.
///
/// # Examples
///
/// ```
/// use silence_engine::message::extract_alarm_name;
///
/// let title = r#"#45533: ALARM: "prod-queue-depth" in EU (Ireland)"#;
/// assert_eq!(extract_alarm_name(title), Some("prod-queue-depth"));
/// assert_eq!(extract_alarm_name("OK: all clear"), None);
/// ```
pub fn extract_alarm_name(title: &str) -> Option<&str> {
    ALARM_TITLE
        .captures(title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Case-insensitive substring test. An empty pattern or text never matches.
pub fn contains_pattern(pattern: &str, text: &str) -> bool {
    !pattern.is_empty()
        && !text.is_empty()
        && text.to_lowercase().contains(&pattern.to_lowercase())
}

// ── Rule matching ───────────────────────────────────────────────────────────

/// Check whether `rule` names `message`, ignoring time constraints.
///
/// With an `environment`, rules restricted to other environments never match
/// and `[#env#]` in the rule name is expanded first.
pub fn matches_message(rule: &Rule, message: &Value, environment: Option<&str>) -> bool {
    let pattern = match environment {
        Some(env) if !rule.applies_to_environment(env) => return false,
        Some(env) => rule.expand_name(env),
        None => rule.name.clone(),
    };
    FieldPath::parse(&rule.path)
        .values(message)
        .into_iter()
        .any(|value| contains_pattern(&pattern, value))
}

/// Human-readable reason for ignoring a message: the rule's own `reason`,
/// or a description of where its pattern was found.
pub fn ignore_reason(rule: &Rule, environment: Option<&str>) -> String {
    if let Some(reason) = &rule.reason {
        return reason.clone();
    }
    let pattern = environment.map_or_else(|| rule.name.clone(), |env| rule.expand_name(env));
    if rule.path == WILDCARD_PATH {
        format!("Pattern '{pattern}' found (wildcard search)")
    } else {
        format!("Pattern '{pattern}' found in {}", rule.path)
    }
}

/// A rule that both matches a message and applies at the evaluation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suppression<'a> {
    pub rule: &'a Rule,
    pub decision: Decision,
    pub reason: String,
}

/// The first of `rules` that ignores `message` at `now`.
pub fn find_suppression<'a>(
    rules: impl IntoIterator<Item = &'a Rule>,
    message: &Value,
    environment: Option<&str>,
    now: &NaiveDateTime,
) -> Option<Suppression<'a>> {
    rules.into_iter().find_map(|rule| {
        if !matches_message(rule, message, environment) {
            return None;
        }
        let decision = rule.evaluate(now);
        if !decision.applies {
            tracing::debug!(rule = %rule.name, reason = %decision.reason, "message matched an inactive rule");
            return None;
        }
        Some(Suppression {
            rule,
            decision,
            reason: ignore_reason(rule, environment),
        })
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────
