use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDateTime, NaiveTime};
use serde::Serialize;

use silence_engine::message::{ignore_reason, matches_message};
use silence_engine::{
    load_rule_file, parse_temporal_point, Decision, ReferenceZone, RuleFile, TemporalPoint,
};

use crate::{CheckArgs, LintArgs};

#[derive(Serialize)]
struct CheckRow<'a> {
    product: &'a str,
    name: String,
    path: &'a str,
    applies: bool,
    reason: String,
    decision: Decision,
    #[serde(skip_serializing_if = "Option::is_none")]
    matches_message: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ignore_reason: Option<String>,
}

pub fn check(args: CheckArgs) -> Result<ExitCode> {
    let file = load(&args.rules)?;
    let zone = reference_zone(args.timezone.as_deref(), &file)?;
    let now = match args.at.as_deref() {
        Some(raw) => resolve_timestamp(raw, &zone)?,
        None => zone.now(),
    };
    let message = args.message.as_deref().map(load_message).transpose()?;
    let env = args.env.as_deref();

    if let Some(product) = args.product.as_deref() {
        if file.product(product).is_none() {
            bail!("product '{product}' not found in {}", args.rules.display());
        }
    }

    let rows: Vec<CheckRow> = file
        .rules()
        .filter(|(product, _)| args.product.as_deref().is_none_or(|p| p == *product))
        .filter(|(_, rule)| env.is_none_or(|env| rule.applies_to_environment(env)))
        .map(|(product, rule)| {
            let decision = rule.evaluate(&now);
            let matched = message.as_ref().map(|m| matches_message(rule, m, env));
            CheckRow {
                product,
                name: match env {
                    Some(env) => rule.expand_name(env),
                    None => rule.name.clone(),
                },
                path: &rule.path,
                applies: decision.applies,
                reason: decision.reason.to_string(),
                ignore_reason: (matched == Some(true) && decision.applies)
                    .then(|| ignore_reason(rule, env)),
                matches_message: matched,
                decision,
            }
        })
        .collect();

    tracing::debug!(rules = rows.len(), %now, zone = %zone, "evaluated rule file");

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("failed to serialize results")?
        );
    } else {
        println!("Evaluated at {} ({zone})", now.format("%Y-%m-%d %H:%M:%S %A"));
        for row in &rows {
            let status = if row.applies { "applies" } else { "inactive" };
            let matched = match row.matches_message {
                Some(true) => ", message matched",
                _ => "",
            };
            println!(
                "[{}] {}: {status} ({}){matched}",
                row.product, row.name, row.reason
            );
        }
        let active = rows.iter().filter(|r| r.applies).count();
        println!("{active} of {} rules apply", rows.len());

        if message.is_some() {
            match rows.iter().find_map(|r| Some((r, r.ignore_reason.as_deref()?))) {
                Some((row, reason)) => {
                    println!("Message ignored by [{}] {}: {reason}", row.product, row.name)
                }
                None => println!("Message not ignored"),
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

pub fn lint(args: LintArgs) -> Result<ExitCode> {
    let file = load(&args.rules)?;

    let mut failed = 0;
    for (product, failure) in file.failures() {
        failed += 1;
        println!(
            "error: [{product}] entry #{} ({}): {}",
            failure.index + 1,
            failure.name.as_deref().unwrap_or("unnamed"),
            failure.error
        );
    }
    for (product, warning) in file.warnings() {
        println!(
            "warning: [{product}] {}: {}",
            warning.rule, warning.warning
        );
    }

    let loaded = file.rules().count();
    println!("{loaded} rules loaded, {failed} failed");

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn load_message(path: &std::path::Path) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read message from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("message in {} is not valid JSON", path.display()))
}

fn load(path: &std::path::Path) -> Result<RuleFile> {
    load_rule_file(path).with_context(|| format!("failed to load rules from {}", path.display()))
}

/// Zone precedence: command line, then the rule file, then the default.
fn reference_zone(flag: Option<&str>, file: &RuleFile) -> Result<ReferenceZone> {
    match flag {
        Some(name) => ReferenceZone::parse(name).context("invalid --timezone"),
        None => Ok(file.timezone.unwrap_or_default()),
    }
}

/// Resolve `--at` into wall-clock time of the reference zone.
///
/// Local forms are taken as already being in the reference zone; RFC 3339
/// instants are converted.
fn resolve_timestamp(raw: &str, zone: &ReferenceZone) -> Result<NaiveDateTime> {
    if let Ok(point) = parse_temporal_point(raw) {
        return Ok(match point {
            TemporalPoint::Date(date) => date.and_time(NaiveTime::default()),
            TemporalPoint::DateTime(dt) => dt,
        });
    }

    let instant = DateTime::parse_from_rfc3339(raw.trim()).with_context(|| {
        format!("invalid --at '{raw}': expected YYYY-MM-DD[ HH:MM[:SS]] or RFC 3339")
    })?;
    Ok(zone.localize(instant.to_utc()))
}
