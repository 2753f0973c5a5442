//! Criterion benchmarks for the preparation pipeline.
//!
//! Benchmarks:
//! 1. Parsing semicolon-delimited text
//! 2. Full dataset preparation (returns, normalization, windows)

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use forecastlab_core::{parse_series, PreparedDataset, WindowSpec};

fn make_text(n: usize) -> String {
    let start = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
    let mut text = String::from("Datum;Schlusskurs\n");
    for i in 0..n {
        let date = start + chrono::Duration::days(i as i64);
        let price = 100.0 + (i as f64 * 0.05).sin() * 10.0 + i as f64 * 0.01;
        text.push_str(&format!("{};{:.4}\n", date.format("%d.%m.%Y"), price));
    }
    text
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_series");
    for n in [500usize, 5_000] {
        let text = make_text(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &text, |b, text| {
            b.iter(|| parse_series(black_box(text)).unwrap())
        });
    }
    group.finish();
}

fn bench_prepare(c: &mut Criterion) {
    let mut group = c.benchmark_group("prepare_dataset");
    for n in [500usize, 5_000] {
        let points = parse_series(&make_text(n)).unwrap().points;
        group.bench_with_input(BenchmarkId::from_parameter(n), &points, |b, points| {
            b.iter(|| PreparedDataset::prepare(black_box(points.clone()), WindowSpec::default()).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_prepare);
criterion_main!(benches);
