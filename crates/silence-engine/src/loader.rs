//! Rule file loading.
//!
//! Reads the YAML rule file and turns every entry under
//! `products.<name>.alarms.ignore` into a typed [`Rule`]:
//!
//! ```yaml
//! timezone: Europe/Rome
//! products:
//!   billing:
//!     alarms:
//!       ignore:
//!         - name: "[#env#]-queue-depth"
//!           path: attachments.title.alarm_name
//!           environments: [prod]
//!           reason: nightly batch
//!           validity:
//!             weekdays: [mon, tuesday, 2]
//!             hours: [{start: "22:00", end: "02:00"}]
//!           exclusions:
//!             periods: [{start: "2025-12-24", end: "2025-12-26 12:00"}]
//! ```
//!
//! A syntax error in the file as a whole is fatal. A single rule that fails
//! to parse is skipped and recorded in [`RuleSet::failures`]; the other
//! rules still load.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::criteria::CriteriaSet;
use crate::error::{Result, SilenceError};
use crate::hours::HourRange;
use crate::message::{find_suppression, Suppression};
use crate::parse::{
    parse_clock_time, parse_temporal_point, parse_weekday_spec, WeekdaySpec,
};
use crate::period::Period;
use crate::rule::{Rule, SemanticWarning, WILDCARD_PATH};
use crate::zone::ReferenceZone;

// ── Source shapes ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawFile {
    timezone: Option<String>,
    products: BTreeMap<String, RawProduct>,
}

#[derive(Debug, Default, Deserialize)]
struct RawProduct {
    #[serde(default)]
    alarms: RawAlarms,
}

#[derive(Debug, Default, Deserialize)]
struct RawAlarms {
    // Kept untyped so one malformed entry does not fail the whole file.
    #[serde(default)]
    ignore: Vec<serde_yaml::Value>,
}

/// A rule as written in the rule file, before any value is parsed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRule {
    #[serde(default)]
    pub name: String,
    pub path: Option<String>,
    pub environments: Option<Vec<String>>,
    pub reason: Option<String>,
    pub validity: Option<RawCriteria>,
    pub exclusions: Option<RawCriteria>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawCriteria {
    pub periods: Option<Vec<RawPeriod>>,
    pub weekdays: Option<Vec<WeekdaySpec>>,
    pub hours: Option<Vec<RawHourRange>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawPeriod {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawHourRange {
    pub start: String,
    pub end: String,
}

impl TryFrom<RawCriteria> for CriteriaSet {
    type Error = SilenceError;

    fn try_from(raw: RawCriteria) -> Result<Self> {
        let periods = raw
            .periods
            .map(|periods| {
                periods
                    .iter()
                    .map(|p| {
                        Ok(Period::new(
                            p.start.as_deref().map(parse_temporal_point).transpose()?,
                            p.end.as_deref().map(parse_temporal_point).transpose()?,
                        ))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        let weekdays = raw
            .weekdays
            .map(|days| days.iter().map(parse_weekday_spec).collect::<Result<BTreeSet<_>>>())
            .transpose()?;

        let hours = raw
            .hours
            .map(|ranges| {
                ranges
                    .iter()
                    .map(|r| {
                        Ok(HourRange::new(
                            parse_clock_time(&r.start)?,
                            parse_clock_time(&r.end)?,
                        ))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        Ok(CriteriaSet {
            periods,
            weekdays,
            hours,
        })
    }
}

impl TryFrom<RawRule> for Rule {
    type Error = SilenceError;

    fn try_from(raw: RawRule) -> Result<Self> {
        let name = raw.name;
        let wrap = |source: SilenceError| SilenceError::InvalidRule {
            rule: name.clone(),
            source: Box::new(source),
        };

        let validity = raw.validity.map(CriteriaSet::try_from).transpose().map_err(wrap)?;
        let exclusions = raw
            .exclusions
            .map(CriteriaSet::try_from)
            .transpose()
            .map_err(wrap)?;

        Ok(Rule {
            path: raw.path.unwrap_or_else(|| WILDCARD_PATH.to_string()),
            environments: raw.environments.unwrap_or_default().into_iter().collect(),
            reason: raw.reason,
            validity,
            exclusions,
            name,
        })
    }
}

// ── Loaded shapes ───────────────────────────────────────────────────────────

/// A rule entry that could not be loaded.
#[derive(Debug)]
pub struct RuleFailure {
    /// Zero-based position in the product's `ignore` list.
    pub index: usize,
    /// The rule name, when the entry got far enough to have one.
    pub name: Option<String>,
    pub error: SilenceError,
}

/// A rule that loaded but has a constraint that can never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleWarning {
    pub rule: String,
    pub warning: SemanticWarning,
}

/// The rules of one product.
#[derive(Debug, Default)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
    pub failures: Vec<RuleFailure>,
    pub warnings: Vec<RuleWarning>,
}

impl RuleSet {
    /// Rules that apply at `now`, in file order.
    pub fn active_at<'a>(&'a self, now: &'a NaiveDateTime) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules.iter().filter(move |rule| rule.applies(now))
    }

    /// Rules restricted to `environment` (or unrestricted) that apply at
    /// `now`.
    pub fn active_for<'a>(
        &'a self,
        environment: &'a str,
        now: &'a NaiveDateTime,
    ) -> impl Iterator<Item = &'a Rule> + 'a {
        self.active_at(now)
            .filter(move |rule| rule.applies_to_environment(environment))
    }

    /// The first rule of this product that ignores `message` at `now`.
    pub fn suppression<'a>(
        &'a self,
        message: &serde_json::Value,
        environment: Option<&str>,
        now: &NaiveDateTime,
    ) -> Option<Suppression<'a>> {
        find_suppression(&self.rules, message, environment, now)
    }
}

/// A fully loaded rule file.
#[derive(Debug, Default)]
pub struct RuleFile {
    /// Reference zone named in the file, if any.
    pub timezone: Option<ReferenceZone>,
    pub products: BTreeMap<String, RuleSet>,
}

impl RuleFile {
    pub fn product(&self, name: &str) -> Option<&RuleSet> {
        self.products.get(name)
    }

    /// Every loaded rule with its product name.
    pub fn rules(&self) -> impl Iterator<Item = (&str, &Rule)> {
        self.products
            .iter()
            .flat_map(|(product, set)| set.rules.iter().map(move |rule| (product.as_str(), rule)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &RuleFailure)> {
        self.products
            .iter()
            .flat_map(|(product, set)| set.failures.iter().map(move |f| (product.as_str(), f)))
    }

    pub fn warnings(&self) -> impl Iterator<Item = (&str, &RuleWarning)> {
        self.products
            .iter()
            .flat_map(|(product, set)| set.warnings.iter().map(move |w| (product.as_str(), w)))
    }
}

// ── Loading ─────────────────────────────────────────────────────────────────

/// Load a rule file from disk.
///
/// # Errors
///
/// Returns [`SilenceError::RuleFile`] if the file cannot be read or is not a
/// valid rule file, and [`SilenceError::InvalidTimezone`] if it names an
/// unknown zone.
pub fn load_rule_file(path: impl AsRef<Path>) -> Result<RuleFile> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| SilenceError::RuleFile(format!("{}: {e}", path.display())))?;
    parse_rule_file(&content)
}

/// Parse the contents of a rule file.
///
/// Individual rules that fail to parse are skipped and recorded in their
/// product's [`RuleSet::failures`]. Entries without a name are ignored.
///
/// # Errors
///
/// Returns [`SilenceError::RuleFile`] if the YAML is malformed or has no
/// `products` section, and [`SilenceError::InvalidTimezone`] if it names an
/// unknown zone.
///
/// # Examples
///
/// ```
/// use silence_engine::loader::parse_rule_file;
///
/// let file = parse_rule_file(r#"
/// products:
///   billing:
///     alarms:
///       ignore:
///         - name: nightly-export
///           validity:
///             hours: [{start: "22:00", end: "02:00"}]
///         - name: broken
///           validity:
///             weekdays: [someday]
/// "#).unwrap();
///
/// let billing = file.product("billing").unwrap();
/// assert_eq!(billing.rules.len(), 1);
/// assert_eq!(billing.failures.len(), 1);
/// ```
pub fn parse_rule_file(yaml: &str) -> Result<RuleFile> {
    let raw: RawFile =
        serde_yaml::from_str(yaml).map_err(|e| SilenceError::RuleFile(e.to_string()))?;

    let timezone = raw
        .timezone
        .as_deref()
        .map(ReferenceZone::parse)
        .transpose()?;

    let mut products = BTreeMap::new();
    for (product, raw_product) in raw.products {
        let set = load_product(&product, raw_product.alarms.ignore);
        products.insert(product, set);
    }

    let file = RuleFile { timezone, products };
    tracing::debug!(
        products = file.products.len(),
        rules = file.rules().count(),
        failures = file.failures().count(),
        "loaded rule file"
    );
    Ok(file)
}

fn load_product(product: &str, entries: Vec<serde_yaml::Value>) -> RuleSet {
    let mut set = RuleSet::default();

    for (index, mut entry) in entries.into_iter().enumerate() {
        let name = match entry_name(&entry) {
            Ok(Some(name)) => name,
            Ok(None) => {
                tracing::debug!(product, index, "skipping ignore entry without a name");
                continue;
            }
            Err(error) => {
                tracing::warn!(product, index, %error, "skipping rule that failed to load");
                set.failures.push(RuleFailure {
                    index,
                    name: None,
                    error,
                });
                continue;
            }
        };

        // Scalar names such as `404` are stored back as text before the typed
        // decode, which only accepts strings.
        if let serde_yaml::Value::Mapping(map) = &mut entry {
            map.insert("name".into(), serde_yaml::Value::String(name.clone()));
        }
        let name = Some(name);

        let loaded = serde_yaml::from_value::<RawRule>(entry)
            .map_err(|e| SilenceError::InvalidRule {
                rule: name.clone().unwrap_or_default(),
                source: Box::new(SilenceError::RuleFile(e.to_string())),
            })
            .and_then(Rule::try_from);

        match loaded {
            Ok(rule) => {
                for warning in rule.semantic_warnings() {
                    tracing::warn!(
                        product,
                        rule = %rule.name,
                        %warning,
                        "rule constraint never matches"
                    );
                    set.warnings.push(RuleWarning {
                        rule: rule.name.clone(),
                        warning,
                    });
                }
                set.rules.push(rule);
            }
            Err(error) => {
                tracing::warn!(product, index, %error, "skipping rule that failed to load");
                set.failures.push(RuleFailure { index, name, error });
            }
        }
    }

    set
}

/// Name of an `ignore` entry. Numbers and booleans are taken as their text;
/// an absent, null or empty name yields `None`.
fn entry_name(entry: &serde_yaml::Value) -> Result<Option<String>> {
    use serde_yaml::Value;

    let name = match entry.get("name") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(_) => {
            return Err(SilenceError::RuleFile(
                "rule name must be a string, number or boolean".to_string(),
            ))
        }
    };
    Ok(Some(name).filter(|n| !n.is_empty()))
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Weekday;
    use crate::rule::Block;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    const SAMPLE: &str = r#"
timezone: Europe/Rome
products:
  billing:
    envs:
      prod:
        slack_channel_id: C123
    alarms:
      ignore:
        - name: "[#env#]-queue-depth"
          path: attachments.title.alarm_name
          environments: [prod]
          reason: nightly batch
          validity:
            weekdays: [mon, Tuesday, 2, "3", fri]
            hours:
              - start: "22:00"
                end: "02:00"
        - name: holiday-freeze
          validity:
            periods:
              - start: "2025-12-24"
                end: "2025-12-26 12:00"
          exclusions:
            hours: [{start: "12:00", end: "13:00"}]
        - name: AWS Notification Message
          path: files.name
  search:
    alarms:
      ignore:
        - name: reindex
          validity:
            periods: [{end: "2025-11-06"}]
"#;

    #[test]
    fn test_parse_sample_file() {
        let file = parse_rule_file(SAMPLE).unwrap();
        assert_eq!(file.timezone.unwrap().name(), "Europe/Rome");
        assert_eq!(file.products.len(), 2);
        assert_eq!(file.rules().count(), 4);
        assert_eq!(file.failures().count(), 0);

        let billing = file.product("billing").unwrap();
        let queue = &billing.rules[0];
        assert_eq!(queue.name, "[#env#]-queue-depth");
        assert_eq!(queue.path, "attachments.title.alarm_name");
        assert!(queue.environments.contains("prod"));
        assert_eq!(queue.reason.as_deref(), Some("nightly batch"));

        let validity = queue.validity.as_ref().unwrap();
        let days: Vec<Weekday> = validity.weekdays.as_ref().unwrap().iter().copied().collect();
        assert_eq!(
            days,
            vec![
                Weekday::MONDAY,
                Weekday::TUESDAY,
                Weekday::WEDNESDAY,
                Weekday::THURSDAY,
                Weekday::FRIDAY
            ]
        );
        assert!(validity.periods.is_none());
        assert_eq!(validity.hours.as_ref().unwrap()[0].to_string(), "22:00-02:00");

        let plain = &billing.rules[2];
        assert_eq!(plain.path, "files.name");
        assert!(plain.validity.is_none());
        assert!(plain.exclusions.is_none());
        assert!(plain.environments.is_empty());
    }

    #[test]
    fn test_default_path_is_wildcard() {
        let file = parse_rule_file(SAMPLE).unwrap();
        let holiday = &file.product("billing").unwrap().rules[1];
        assert_eq!(holiday.path, "*");
    }

    #[test]
    fn test_loaded_rules_evaluate() {
        let file = parse_rule_file(SAMPLE).unwrap();
        let billing = file.product("billing").unwrap();

        // Christmas day, lunch: holiday-freeze is excluded
        let lunch = at("2025-12-25 12:30:00");
        let active: Vec<&str> = billing.active_at(&lunch).map(|r| r.name.as_str()).collect();
        assert_eq!(active, vec!["AWS Notification Message"]);

        // Wednesday 2025-12-24 23:00: queue-depth and holiday-freeze both apply
        let night = at("2025-12-24 23:00:00");
        let active: Vec<&str> = billing.active_at(&night).map(|r| r.name.as_str()).collect();
        assert_eq!(
            active,
            vec!["[#env#]-queue-depth", "holiday-freeze", "AWS Notification Message"]
        );

        let staging: Vec<&str> = billing
            .active_for("staging", &night)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(staging, vec!["holiday-freeze", "AWS Notification Message"]);

        let search = file.product("search").unwrap();
        assert_eq!(search.active_at(&at("2025-11-06 23:59:59")).count(), 1);
        assert_eq!(search.active_at(&at("2025-11-07 00:00:00")).count(), 0);
    }

    #[test]
    fn test_loaded_rules_suppress_messages() {
        let file = parse_rule_file(SAMPLE).unwrap();
        let billing = file.product("billing").unwrap();
        let message = serde_json::json!({
            "attachments": [{"title": "#7: ALARM: \"prod-queue-depth\" in EU"}],
        });

        // Tuesday night, inside the queue-depth window.
        let night = at("2025-11-04 23:00:00");
        let hit = billing.suppression(&message, Some("prod"), &night).unwrap();
        assert_eq!(hit.rule.name, "[#env#]-queue-depth");
        assert_eq!(hit.reason, "nightly batch");

        // Same message in daytime: the rule is outside its validity.
        assert!(billing
            .suppression(&message, Some("prod"), &at("2025-11-04 10:00:00"))
            .is_none());

        // Restricted to prod.
        assert!(billing.suppression(&message, Some("staging"), &night).is_none());
    }

    #[test]
    fn test_one_bad_rule_does_not_block_others() {
        let yaml = r#"
products:
  billing:
    alarms:
      ignore:
        - name: bad-date
          validity:
            periods: [{start: "2025/01/01"}]
        - name: good
        - name: bad-weekday
          validity:
            weekdays: [funday]
        - name: bad-hour
          exclusions:
            hours: [{start: "25:00", end: "02:00"}]
        - name: typo-block
          validty:
            hours: [{start: "01:00", end: "02:00"}]
        - name: missing-end
          validity:
            hours: [{start: "01:00"}]
        - name: weekday-out-of-range
          validity:
            weekdays: [9]
"#;
        let file = parse_rule_file(yaml).unwrap();
        let billing = file.product("billing").unwrap();

        assert_eq!(billing.rules.len(), 1);
        assert_eq!(billing.rules[0].name, "good");

        let failed: Vec<(usize, &str)> = billing
            .failures
            .iter()
            .map(|f| (f.index, f.name.as_deref().unwrap()))
            .collect();
        assert_eq!(
            failed,
            vec![
                (0, "bad-date"),
                (2, "bad-weekday"),
                (3, "bad-hour"),
                (4, "typo-block"),
                (5, "missing-end"),
                (6, "weekday-out-of-range"),
            ]
        );

        assert!(billing.failures[0].error.is_format_error());
        assert!(billing.failures[1].error.is_format_error());
        assert!(billing.failures[2].error.is_format_error());
        assert!(!billing.failures[3].error.is_format_error());
        assert!(billing.failures[5].error.is_format_error());

        let message = billing.failures[0].error.to_string();
        assert!(message.contains("bad-date"), "got: {message}");
        assert!(message.contains("Invalid date"), "got: {message}");
    }

    #[test]
    fn test_nameless_entries_are_ignored() {
        let yaml = r#"
products:
  billing:
    alarms:
      ignore:
        - name: ""
        - name: ~
        - path: text
        - just a string
        - name: kept
"#;
        let file = parse_rule_file(yaml).unwrap();
        let billing = file.product("billing").unwrap();
        assert_eq!(billing.rules.len(), 1);
        assert!(billing.failures.is_empty());
    }

    #[test]
    fn test_scalar_names_are_kept_as_text() {
        let yaml = r#"
products:
  billing:
    alarms:
      ignore:
        - name: 404
          validity:
            hours: [{start: "22:00", end: "02:00"}]
        - name: true
        - name: kept
"#;
        let file = parse_rule_file(yaml).unwrap();
        let billing = file.product("billing").unwrap();
        let names: Vec<&str> = billing.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["404", "true", "kept"]);
        assert!(billing.failures.is_empty());
        assert!(billing.rules[0].applies(&at("2025-05-05 23:00:00")));
        assert!(!billing.rules[0].applies(&at("2025-05-05 10:00:00")));
    }

    #[test]
    fn test_structured_name_is_a_failure() {
        let yaml = r#"
products:
  billing:
    alarms:
      ignore:
        - name: [not, a, name]
        - name: {nested: map}
        - name: kept
"#;
        let file = parse_rule_file(yaml).unwrap();
        let billing = file.product("billing").unwrap();
        assert_eq!(billing.rules.len(), 1);
        let failed: Vec<usize> = billing.failures.iter().map(|f| f.index).collect();
        assert_eq!(failed, vec![0, 1]);
        assert!(billing.failures[0].name.is_none());
        assert!(billing.failures[0]
            .error
            .to_string()
            .contains("rule name must be"));
    }

    #[test]
    fn test_semantic_warnings_do_not_reject_rules() {
        let yaml = r#"
products:
  billing:
    alarms:
      ignore:
        - name: inverted
          validity:
            periods: [{start: "2025-05-10", end: "2025-05-01"}]
        - name: empty-hours
          validity:
            hours: [{start: "09:00", end: "09:00"}]
        - name: wraps
          validity:
            hours: [{start: "22:00", end: "02:00"}]
"#;
        let file = parse_rule_file(yaml).unwrap();
        let billing = file.product("billing").unwrap();
        assert_eq!(billing.rules.len(), 3);
        assert_eq!(billing.warnings.len(), 2);
        assert_eq!(billing.warnings[0].rule, "inverted");
        assert!(matches!(
            billing.warnings[0].warning,
            SemanticWarning::InvertedPeriod {
                block: Block::Validity,
                ..
            }
        ));
        assert_eq!(billing.warnings[1].rule, "empty-hours");

        // They load, they just never match.
        assert!(!billing.rules[0].applies(&at("2025-05-05 10:00:00")));
        assert!(!billing.rules[1].applies(&at("2025-05-05 09:00:00")));
    }

    #[test]
    fn test_absent_and_empty_fields_stay_distinct() {
        let yaml = r#"
products:
  p:
    alarms:
      ignore:
        - name: empty-lists
          validity:
            periods: []
            weekdays: []
        - name: absent
          validity: {}
"#;
        let file = parse_rule_file(yaml).unwrap();
        let rules = &file.product("p").unwrap().rules;
        let empty = rules[0].validity.as_ref().unwrap();
        let absent = rules[1].validity.as_ref().unwrap();
        assert_eq!(empty.periods, Some(vec![]));
        assert_eq!(absent.periods, None);
        assert!(empty.hours.is_none());
        assert!(rules[0].applies(&at("2025-05-05 09:00:00")));
        assert!(rules[1].applies(&at("2025-05-05 09:00:00")));
    }

    #[test]
    fn test_file_level_errors_are_fatal() {
        let err = parse_rule_file("products: [unclosed").unwrap_err();
        assert!(err.to_string().contains("Invalid rule file"), "got: {err}");

        let err = parse_rule_file("timezone: UTC\n").unwrap_err();
        assert!(err.to_string().contains("products"), "got: {err}");

        let err = parse_rule_file("timezone: Nowhere/Land\nproducts: {}\n").unwrap_err();
        assert!(err.to_string().contains("Invalid timezone"), "got: {err}");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_rule_file("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("not/here.yaml"), "got: {err}");
    }

    #[test]
    fn test_raw_rule_conversion() {
        let raw = RawRule {
            name: "direct".into(),
            validity: Some(RawCriteria {
                weekdays: Some(vec![
                    WeekdaySpec::Name("sat".into()),
                    WeekdaySpec::Number(6),
                ]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let rule = Rule::try_from(raw).unwrap();
        assert_eq!(rule.path, "*");
        assert_eq!(rule.validity.unwrap().weekdays.unwrap().len(), 2);
    }
}
