use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use criterion::BenchmarkId;
use criterion::Criterion;
use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;

use tally_stats::FixedCalendar;
use tally_stats::MemoryStore;
use tally_stats::MetricKind;
use tally_stats::StatsReporter;
use tally_stats::Store;
use tally_stats::Summary;
use tally_stats::bucket_key;

fn synthetic_counts(keys: usize, prefix: &str) -> HashMap<String, u64> {
    (0..keys)
        .map(|i| (format!("{prefix}-{i}"), (i as u64 * 7919) % 1000))
        .collect()
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");

    for keys in [10, 1_000, 100_000] {
        let summary = Summary::new(
            30,
            synthetic_counts(keys, "Mozilla/5.0 (X11; Linux x86_64) Gecko/20100101 Firefox"),
            synthetic_counts(keys, "10.0.0"),
        );
        group.bench_with_input(BenchmarkId::from_parameter(keys), &summary, |b, s| {
            b.iter(|| black_box(s.render(10)))
        });
    }

    group.finish();
}

fn bench_summarize(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let today = NaiveDate::from_ymd_opt(2025, 1, 31).unwrap();
    let store = Arc::new(MemoryStore::new());

    rt.block_on(async {
        for offset in 0..30 {
            let date = today - chrono::Days::new(offset);
            for kind in MetricKind::ALL {
                let key = bucket_key("api_requests", kind, date);
                for i in 0..500 {
                    store.incr_score(&key, 1 + i % 13, &format!("member-{i}")).await.unwrap();
                }
            }
        }
    });

    let reporter = StatsReporter::new(store).with_calendar(Arc::new(FixedCalendar(today)));

    let mut group = c.benchmark_group("summarize");
    for days in [1, 7, 30] {
        group.bench_with_input(BenchmarkId::from_parameter(days), &days, |b, &days| {
            b.to_async(&rt)
                .iter(|| async { black_box(reporter.summarize(days).await.unwrap()) })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_render, bench_summarize);
criterion_main!(benches);
