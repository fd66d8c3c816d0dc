use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use tank_tracker::models::{ActivityRecord, ActivityType};
use tank_tracker::services::community::ranking;
use tank_tracker::services::streak::compute_streak;

fn benchmark_streaks(c: &mut Criterion) {
    let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();

    // Two years of activity every other day, with repeats
    let unbroken: Vec<NaiveDate> = (0..730)
        .rev()
        .flat_map(|i| {
            let day = today - Duration::days(i * 2 % 730);
            [day, day]
        })
        .collect();

    // Same history with a week-long gap a month ago
    let broken: Vec<NaiveDate> = unbroken
        .iter()
        .copied()
        .filter(|d| (today - *d).num_days() < 28 || (today - *d).num_days() > 35)
        .collect();

    let mut group = c.benchmark_group("streak");

    group.bench_function("two_years_unbroken", |b| {
        b.iter(|| compute_streak(black_box(&unbroken), black_box(today)))
    });

    group.bench_function("two_years_broken_last_month", |b| {
        b.iter(|| compute_streak(black_box(&broken), black_box(today)))
    });

    group.finish();
}

fn benchmark_ranking(c: &mut Criterion) {
    let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();

    // A busy month: 200 athletes, 5000 activities
    let records: Vec<ActivityRecord> = (0..5000u64)
        .map(|i| ActivityRecord {
            id: format!("manual-{}", i),
            athlete_id: i % 200,
            athlete_name: format!("Athlete {}", i % 200),
            activity_type: ActivityType::Run,
            distance_km: 3.0 + (i % 17) as f64,
            pace: None,
            timestamp: start + Duration::minutes(i as i64 * 8),
            external_id: None,
            avatar_url: None,
            description: None,
            badge: None,
        })
        .collect();

    c.bench_function("monthly_ranking", |b| b.iter(|| ranking(black_box(&records))));
}

criterion_group!(benches, benchmark_streaks, benchmark_ranking);
criterion_main!(benches);
