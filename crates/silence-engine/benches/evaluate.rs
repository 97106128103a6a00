use chrono::NaiveDate;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

use silence_engine::weekday::workdays;
use silence_engine::{parse_clock_time, parse_temporal_point, CriteriaSet, HourRange, Period, Rule};

fn hour_range(start: &str, end: &str) -> HourRange {
    HourRange::new(
        parse_clock_time(start).unwrap(),
        parse_clock_time(end).unwrap(),
    )
}

fn rule_set(n: usize) -> Vec<Rule> {
    (0..n)
        .map(|i| {
            let validity = CriteriaSet::default()
                .with_periods([Period::new(
                    Some(parse_temporal_point("2025-01-01").unwrap()),
                    Some(parse_temporal_point("2025-12-31 18:00").unwrap()),
                )])
                .with_weekdays(workdays())
                .with_hours([hour_range("22:00", "02:00"), hour_range("09:00", "12:00")]);
            let exclusions = CriteriaSet::default().with_hours([hour_range("12:00", "13:00")]);
            Rule::new(format!("rule-{i}"))
                .with_validity(validity)
                .with_exclusions(exclusions)
        })
        .collect()
}

fn bench_evaluate(c: &mut Criterion) {
    let rules = rule_set(1_000);
    let now = NaiveDate::from_ymd_opt(2025, 11, 5)
        .unwrap()
        .and_hms_opt(23, 30, 0)
        .unwrap();

    c.bench_function("applies_1000_rules", |b| {
        b.iter(|| {
            black_box(&rules)
                .iter()
                .filter(|rule| rule.applies(black_box(&now)))
                .count()
        })
    });

    c.bench_function("evaluate_1000_rules", |b| {
        b.iter(|| {
            black_box(&rules)
                .iter()
                .map(|rule| rule.evaluate(black_box(&now)))
                .filter(|d| d.applies)
                .count()
        })
    });
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
