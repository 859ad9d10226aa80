//! Performance benchmarks for the generation engines.
//!
//! ## Benchmark Categories
//!
//! - **Curve**: interpolation and fixed-step sampling
//! - **Camelot**: key resolution and compatibility lookups
//! - **Rules**: filtering a large pool through rule chains
//! - **Sequencer**: building full sets against pools of varying size
//! - **Suggest**: ranking a large pool for next-track suggestions
//!
//! ## Running Benchmarks
//!
//! ```bash
//! cargo bench
//! cargo bench curve
//! cargo bench sequencer
//! ```

use chrono::{Duration, TimeZone, Utc};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::hint::black_box;

use setforge::camelot;
use setforge::curve::{Peak, TempoCurve, DEFAULT_STEP_MINUTES};
use setforge::rules::{filter_tracks, Rule};
use setforge::sequencer::{generate, SequencerConfig};
use setforge::suggest::{suggest, NowPlaying};
use setforge::track::Track;

/// Synthetic pool with tempos spread over 90-160 bpm and all 24 keys.
fn benchmark_pool(size: usize) -> Vec<Track> {
    let keys = camelot::known_keys();
    let base = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
    (0..size)
        .map(|i| Track {
            id: format!("track-{i:05}"),
            title: format!("Song {i:05}"),
            artist: Some(format!("Artist {}", i % 40)),
            genre: Some(if i % 3 == 0 { "techno" } else { "house" }.to_string()),
            bpm: Some(90.0 + (i % 70) as f64),
            key: Some(keys[i % keys.len()].to_string()),
            duration_seconds: 180 + (i % 180) as u32,
            created_at: base + Duration::days((i % 400) as i64),
            energy: Some((i % 10 + 1) as u8),
            location: Some(format!("/music/track-{i:05}.flac")),
        })
        .collect()
}

fn ramp_curve() -> TempoCurve {
    TempoCurve::new(
        vec![
            Peak::new(0.0, 110.0),
            Peak::new(30.0, 145.0),
            Peak::new(60.0, 125.0),
        ],
        60.0,
    )
    .expect("valid benchmark curve")
}

fn bench_curve(c: &mut Criterion) {
    let curve = ramp_curve();

    c.bench_function("curve_bpm_at", |b| {
        b.iter(|| {
            let mut acc = 0.0;
            let mut t = 0.0;
            while t <= 60.0 {
                acc += curve.bpm_at(black_box(t));
                t += 0.1;
            }
            acc
        });
    });

    c.bench_function("curve_sample_60min", |b| {
        b.iter(|| curve.sample(black_box(DEFAULT_STEP_MINUTES)).expect("valid step"));
    });
}

fn bench_camelot(c: &mut Criterion) {
    let keys = camelot::known_keys();

    c.bench_function("camelot_resolve_all_keys", |b| {
        b.iter(|| {
            keys.iter()
                .filter_map(|k| camelot::key_to_camelot(black_box(k)))
                .count()
        });
    });

    c.bench_function("camelot_compat_matrix", |b| {
        b.iter(|| {
            let mut compatible = 0usize;
            for a in &keys {
                for b2 in &keys {
                    if camelot::keys_compatible(black_box(a), black_box(b2)) {
                        compatible += 1;
                    }
                }
            }
            compatible
        });
    });
}

fn bench_rules(c: &mut Criterion) {
    let pool = benchmark_pool(1000);
    let rules: Vec<Rule> = ["bpm>=120", "energy>=6", "genre~techno"]
        .iter()
        .map(|r| r.parse().expect("valid benchmark rule"))
        .collect();
    let key_rules: Vec<Rule> = vec!["key~A minor".parse().expect("valid benchmark rule")];
    let now = Utc::now();

    c.bench_function("rules_filter_1000_tracks_3_rules", |b| {
        b.iter(|| filter_tracks(black_box(&pool), black_box(&rules), None, now));
    });

    c.bench_function("rules_camelot_key_filter_1000_tracks", |b| {
        b.iter(|| filter_tracks(black_box(&pool), black_box(&key_rules), Some("A minor"), now));
    });
}

fn bench_sequencer(c: &mut Criterion) {
    let samples = ramp_curve()
        .sample(DEFAULT_STEP_MINUTES)
        .expect("valid step");
    let config = SequencerConfig::default();

    let mut group = c.benchmark_group("sequencer_generate");
    for size in [100usize, 1000, 5000] {
        let pool = benchmark_pool(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &pool, |b, pool| {
            b.iter(|| {
                let mut rng = StdRng::seed_from_u64(42);
                generate(black_box(&samples), black_box(pool), &config, &mut rng)
            });
        });
    }
    group.finish();
}

fn bench_suggest(c: &mut Criterion) {
    let pool = benchmark_pool(1000);
    let current = NowPlaying {
        bpm: Some(128.0),
        key: Some("A minor".to_string()),
        energy: None,
    };
    let history: Vec<String> = (0..20).map(|i| format!("track-{i:05}")).collect();

    c.bench_function("suggest_rank_1000_tracks", |b| {
        b.iter(|| suggest(black_box(Some(&current)), black_box(&history), black_box(&pool)));
    });
}

criterion_group!(
    benches,
    bench_curve,
    bench_camelot,
    bench_rules,
    bench_sequencer,
    bench_suggest
);
criterion_main!(benches);
