//! Benchmarks for report rendering and constraint composition.
//!
//! Run with: cargo bench -p skyplate-core

use chrono::{TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use skyplate_core::output::{render_solve, render_stars, ReportFormat};
use skyplate_core::{
    constraints, coords, ImageHints, Parity, SearchPosition, SkyPoint, Solution, StarDetection,
};
use std::path::PathBuf;

fn sample_solution() -> Solution {
    Solution {
        ra: 83.822,
        dec: -5.391,
        field_width: 42.5,
        field_height: 28.3,
        pixscale: 1.25,
        orientation: 12.7,
        parity: Parity::Normal,
        ra_error: Some(1.4),
        dec_error: Some(1.1),
    }
}

fn sample_stars(count: usize) -> Vec<StarDetection> {
    (0..count)
        .map(|i| StarDetection {
            x: 10.0 + i as f64,
            y: 20.0 + i as f64,
            mag: -8.0 + 0.01 * i as f64,
            flux: 20_000.0 - 10.0 * i as f64,
            peak: 4096.0,
            hfr: 2.1,
            sky: Some(SkyPoint {
                ra: 83.8 + 0.001 * i as f64,
                dec: -5.4 + 0.001 * i as f64,
            }),
        })
        .collect()
}

fn benchmark_render_solve(c: &mut Criterion) {
    let image = PathBuf::from("m42.fits");
    let date = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
    let solution = sample_solution();

    for format in [ReportFormat::Table, ReportFormat::Toml, ReportFormat::Yaml] {
        c.bench_function(&format!("render_solve_{format}"), |b| {
            b.iter(|| {
                let _ = render_solve(format, black_box(&image), date, black_box(&solution));
            })
        });
    }
}

fn benchmark_render_stars(c: &mut Criterion) {
    let stars = sample_stars(500);

    for format in [ReportFormat::Table, ReportFormat::Toml, ReportFormat::Yaml] {
        c.bench_function(&format!("render_stars_500_{format}"), |b| {
            b.iter(|| {
                let _ = render_stars(format, black_box(&stars));
            })
        });
    }
}

fn benchmark_sexagesimal(c: &mut Criterion) {
    c.bench_function("ra_to_hms", |b| {
        b.iter(|| coords::ra_to_hms(black_box(83.822)))
    });
    c.bench_function("dec_to_dms", |b| {
        b.iter(|| coords::dec_to_dms(black_box(-5.391)))
    });
}

fn benchmark_compose(c: &mut Criterion) {
    let hints = ImageHints {
        position: Some(SearchPosition {
            ra_hours: 5.5881,
            dec_deg: -5.391,
        }),
        scale: Some(ImageHints::band_around(1.25)),
    };

    c.bench_function("compose_constraints", |b| {
        b.iter(|| constraints::compose(black_box(Some((56.75, 24.1))), None, black_box(&hints)))
    });
}

criterion_group!(
    benches,
    benchmark_render_solve,
    benchmark_render_stars,
    benchmark_sexagesimal,
    benchmark_compose,
);
criterion_main!(benches);
