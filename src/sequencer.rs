//! Curve-driven set sequencer.
//!
//! Walks a sampled tempo trajectory and fills each segment with an unused
//! track from the pool: first a uniform random pick among tracks inside
//! the BPM tolerance window that are long enough for the segment, then a
//! nearest-BPM fallback, then a silent skip.
//!
//! The random pick is the engine's one source of non-determinism. It is a
//! property, not a bug: re-running with the same pool and curve need not
//! reproduce the same set, but every run must be valid (no reused tracks,
//! non-decreasing start times). The RNG is injected so tests can seed it.
//!
//! The clock advances by the *chosen track's* real duration, not by the
//! segment's nominal length - tracks are atomic, never truncated, so the
//! generated timeline deliberately drifts from the nominal curve whenever
//! the two diverge.

use crate::curve::{CurveSample, Peak, TempoCurve, DEFAULT_STEP_MINUTES};
use crate::track::Track;
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Tuning knobs for sequencing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SequencerConfig {
    /// Allowed deviation from the target BPM before fallback applies.
    pub bpm_tolerance: f64,
    /// Minimum track length as a fraction of the segment length.
    pub min_fill_ratio: f64,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            bpm_tolerance: 5.0,
            min_fill_ratio: 0.7,
        }
    }
}

/// One slot of a generated set. The track is a full snapshot, not a
/// reference: later pool changes never retroactively alter a saved set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSetEntry {
    /// Cumulative start offset within the set, seconds.
    pub start_time_seconds: u32,
    pub track: Track,
    /// Trajectory value the track was matched against - not the track's
    /// own bpm.
    pub target_bpm: f64,
}

/// A generated set together with the inputs that produced it, so it can be
/// saved and regenerated against a refreshed pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSet {
    pub id: Uuid,
    pub name: String,
    pub peaks: Vec<Peak>,
    pub duration_minutes: f64,
    pub bpm_tolerance: f64,
    pub entries: Vec<GeneratedSetEntry>,
    pub created_at: DateTime<Utc>,
}

impl GeneratedSet {
    /// Build a named set from peaks by sampling the curve and sequencing
    /// the pool.
    ///
    /// # Errors
    ///
    /// Empty name, invalid peaks (fewer than 2, non-finite) or an empty
    /// pool are validation errors. A pool that merely matches nothing
    /// produces an empty entry list; refusing to *save* such a set is the
    /// caller's decision.
    pub fn build<R: Rng>(
        name: &str,
        peaks: Vec<Peak>,
        duration_minutes: f64,
        config: &SequencerConfig,
        pool: &[Track],
        rng: &mut R,
    ) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Set name must not be empty");
        }
        if pool.is_empty() {
            bail!("No tracks available - import some music first");
        }
        let curve = TempoCurve::new(peaks, duration_minutes)?;
        let samples = curve.sample(DEFAULT_STEP_MINUTES)?;
        let entries = generate(&samples, pool, config, rng);
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            peaks: curve.peaks().to_vec(),
            duration_minutes,
            bpm_tolerance: config.bpm_tolerance,
            entries,
            created_at: Utc::now(),
        })
    }

    /// Total runtime of the chosen tracks, seconds.
    #[must_use]
    pub fn total_duration_seconds(&self) -> u32 {
        self.entries.iter().map(|e| e.track.duration_seconds).sum()
    }

    /// The ordered tracks, for export.
    #[must_use]
    pub fn tracks(&self) -> Vec<Track> {
        self.entries.iter().map(|e| e.track.clone()).collect()
    }
}

/// Sequence a sampled trajectory against a pool snapshot.
///
/// The pool is read-only; used-track bookkeeping lives in a local set, so
/// concurrent runs over the same pool cannot interfere.
#[must_use]
pub fn generate<R: Rng>(
    samples: &[CurveSample],
    pool: &[Track],
    config: &SequencerConfig,
    rng: &mut R,
) -> Vec<GeneratedSetEntry> {
    let mut entries = Vec::new();
    let mut used: HashSet<&str> = HashSet::new();
    let mut current_time_seconds: u32 = 0;
    // The final sample always sits at the set end, so this is the full
    // set length even when the duration is not step-aligned.
    let set_length_seconds = samples
        .last()
        .map_or(0.0, |s| s.time * 60.0);

    for pair in samples.windows(2) {
        let segment = &pair[0];
        let next = &pair[1];
        let segment_duration_seconds = (next.time - segment.time) * 60.0;
        let target_bpm = segment.bpm;

        let picked = pick_strict(pool, &used, target_bpm, segment_duration_seconds, config, rng)
            .or_else(|| pick_fallback(pool, &used, target_bpm));

        if let Some(track) = picked {
            used.insert(track.id.as_str());
            entries.push(GeneratedSetEntry {
                start_time_seconds: current_time_seconds,
                track: track.clone(),
                target_bpm,
            });
            // Advance by the track's real length; see module docs on drift.
            current_time_seconds += track.duration_seconds;
        } else {
            log::debug!(
                "No usable track for segment at {:.1}min (target {target_bpm:.0} bpm); skipping",
                segment.time
            );
        }

        if f64::from(current_time_seconds) >= set_length_seconds {
            break;
        }
    }

    log::info!(
        "Sequenced {} tracks covering {}s of a nominal {}s set",
        entries.len(),
        current_time_seconds,
        set_length_seconds as u64
    );
    entries
}

/// Uniform random pick among unused tracks inside the tolerance window
/// that are long enough to carry the segment.
fn pick_strict<'a, R: Rng>(
    pool: &'a [Track],
    used: &HashSet<&str>,
    target_bpm: f64,
    segment_duration_seconds: f64,
    config: &SequencerConfig,
    rng: &mut R,
) -> Option<&'a Track> {
    let min_bpm = target_bpm - config.bpm_tolerance;
    let max_bpm = target_bpm + config.bpm_tolerance;
    let min_duration = segment_duration_seconds * config.min_fill_ratio;

    let candidates: Vec<&Track> = pool
        .iter()
        .filter(|t| !used.contains(t.id.as_str()))
        .filter(|t| t.bpm.is_some_and(|bpm| bpm >= min_bpm && bpm <= max_bpm))
        .filter(|t| f64::from(t.duration_seconds) >= min_duration)
        .collect();

    candidates.choose(rng).copied()
}

/// Nearest-BPM fallback over all unused tracks with a known tempo.
/// Ties go to pool order (first found).
fn pick_fallback<'a>(pool: &'a [Track], used: &HashSet<&str>, target_bpm: f64) -> Option<&'a Track> {
    pool.iter()
        .filter(|t| !used.contains(t.id.as_str()))
        .filter_map(|t| t.bpm.map(|bpm| (t, (bpm - target_bpm).abs())))
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(t, _)| t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn track(id: &str, bpm: Option<f64>, duration_seconds: u32) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Track {id}"),
            artist: None,
            genre: None,
            bpm,
            key: None,
            duration_seconds,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            energy: None,
            location: None,
        }
    }

    /// Pool and flat curve from the worked scenario: 3 tracks at
    /// [118, 122, 140] bpm, peaks (0,120) and (10,120), tolerance 5.
    fn scenario_pool() -> Vec<Track> {
        vec![
            track("a", Some(118.0), 200),
            track("b", Some(122.0), 210),
            track("c", Some(140.0), 180),
        ]
    }

    fn flat_samples(duration_minutes: f64, bpm: f64) -> Vec<CurveSample> {
        TempoCurve::new(
            vec![Peak::new(0.0, bpm), Peak::new(duration_minutes, bpm)],
            duration_minutes,
        )
        .unwrap()
        .sample(DEFAULT_STEP_MINUTES)
        .unwrap()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_no_track_reused_within_a_run() {
        let samples = flat_samples(60.0, 120.0);
        let pool: Vec<Track> = (0..20)
            .map(|i| track(&format!("t{i}"), Some(115.0 + f64::from(i)), 120))
            .collect();
        let entries = generate(&samples, &pool, &SequencerConfig::default(), &mut rng());
        let ids: HashSet<&str> = entries.iter().map(|e| e.track.id.as_str()).collect();
        assert_eq!(ids.len(), entries.len(), "a track id appeared twice");
    }

    #[test]
    fn test_start_times_are_cumulative_track_durations() {
        let samples = flat_samples(10.0, 120.0);
        let entries = generate(&samples, &scenario_pool(), &SequencerConfig::default(), &mut rng());
        let mut expected_start = 0;
        for entry in &entries {
            assert_eq!(entry.start_time_seconds, expected_start);
            expected_start += entry.track.duration_seconds;
        }
    }

    #[test]
    fn test_worked_scenario_tolerance_then_fallback() {
        // Flat 120 curve: the two in-tolerance tracks (118, 122) go first,
        // then the 140 one via fallback. Never a duplicate; after two picks
        // the clock reads the sum of the two chosen durations, not 20*60.
        let samples = flat_samples(10.0, 120.0);
        let entries = generate(&samples, &scenario_pool(), &SequencerConfig::default(), &mut rng());
        assert_eq!(entries.len(), 3);
        let first_two: HashSet<&str> = entries[..2].iter().map(|e| e.track.id.as_str()).collect();
        assert_eq!(first_two, HashSet::from(["a", "b"]));
        assert_eq!(entries[2].track.id, "c");
        assert_eq!(entries[2].start_time_seconds, 200 + 210);
        assert!((entries[0].target_bpm - 120.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_any_seed_yields_a_valid_set() {
        let samples = flat_samples(10.0, 120.0);
        for seed in 0..20 {
            let mut r = StdRng::seed_from_u64(seed);
            let entries = generate(&samples, &scenario_pool(), &SequencerConfig::default(), &mut r);
            let ids: HashSet<&str> = entries.iter().map(|e| e.track.id.as_str()).collect();
            assert_eq!(ids.len(), entries.len());
            for pair in entries.windows(2) {
                assert!(pair[0].start_time_seconds <= pair[1].start_time_seconds);
            }
        }
    }

    #[test]
    fn test_same_seed_reproduces_the_same_set() {
        let samples = flat_samples(10.0, 120.0);
        let a = generate(&samples, &scenario_pool(), &SequencerConfig::default(), &mut rng());
        let b = generate(&samples, &scenario_pool(), &SequencerConfig::default(), &mut rng());
        let ids_a: Vec<&str> = a.iter().map(|e| e.track.id.as_str()).collect();
        let ids_b: Vec<&str> = b.iter().map(|e| e.track.id.as_str()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn test_null_bpm_tracks_never_picked() {
        let samples = flat_samples(10.0, 120.0);
        let pool = vec![
            track("nobpm1", None, 600),
            track("nobpm2", None, 600),
            track("ok", Some(121.0), 600),
        ];
        let entries = generate(&samples, &pool, &SequencerConfig::default(), &mut rng());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].track.id, "ok");
    }

    #[test]
    fn test_all_null_bpm_pool_yields_empty_set() {
        let samples = flat_samples(10.0, 120.0);
        let pool = vec![track("x", None, 600), track("y", None, 600)];
        let entries = generate(&samples, &pool, &SequencerConfig::default(), &mut rng());
        assert!(entries.is_empty());
    }

    #[test]
    fn test_empty_pool_yields_empty_set() {
        let samples = flat_samples(10.0, 120.0);
        let entries = generate(&samples, &[], &SequencerConfig::default(), &mut rng());
        assert!(entries.is_empty());
    }

    #[test]
    fn test_too_short_tracks_fall_back_to_nearest_bpm() {
        // Segment is 30s, min fill 0.7 => 21s. The in-window track is only
        // 10s long, so the strict pick rejects it and fallback chooses the
        // nearest bpm among all unused tracks - which is the same track.
        let samples = flat_samples(1.0, 120.0);
        let pool = vec![track("short", Some(120.0), 10), track("far", Some(90.0), 300)];
        let entries = generate(&samples, &pool, &SequencerConfig::default(), &mut rng());
        assert_eq!(entries[0].track.id, "short");
    }

    #[test]
    fn test_fallback_ties_break_by_pool_order() {
        let samples = flat_samples(1.0, 120.0);
        // Both 10 bpm away from target and too short in neither case;
        // make them out of tolerance so only fallback applies.
        let pool = vec![track("first", Some(110.0), 300), track("second", Some(130.0), 300)];
        let entries = generate(&samples, &pool, &SequencerConfig::default(), &mut rng());
        assert_eq!(entries[0].track.id, "first");
    }

    #[test]
    fn test_fractional_duration_fills_to_the_set_end() {
        // 10.25 minutes of set is 615s. A single 600s track does not cover
        // it, so a second pick must happen before the clock passes the end
        // rather than stopping at the last whole sampling step.
        let samples = flat_samples(10.25, 120.0);
        let pool = vec![track("one", Some(120.0), 600), track("two", Some(120.0), 600)];
        let entries = generate(&samples, &pool, &SequencerConfig::default(), &mut rng());
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_generation_stops_at_set_length() {
        // One long track fills the whole nominal set in a single pick.
        let samples = flat_samples(10.0, 120.0);
        let pool = vec![track("long", Some(120.0), 3600), track("next", Some(120.0), 3600)];
        let entries = generate(&samples, &pool, &SequencerConfig::default(), &mut rng());
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_build_validates_name_and_pool() {
        let peaks = vec![Peak::new(0.0, 120.0), Peak::new(10.0, 120.0)];
        let config = SequencerConfig::default();
        assert!(GeneratedSet::build("", peaks.clone(), 10.0, &config, &scenario_pool(), &mut rng())
            .is_err());
        assert!(GeneratedSet::build("Set", peaks.clone(), 10.0, &config, &[], &mut rng()).is_err());
        let set =
            GeneratedSet::build("Set", peaks, 10.0, &config, &scenario_pool(), &mut rng()).unwrap();
        assert_eq!(set.name, "Set");
        assert!(!set.entries.is_empty());
        assert_eq!(
            set.total_duration_seconds(),
            set.entries.iter().map(|e| e.track.duration_seconds).sum::<u32>()
        );
    }

    #[test]
    fn test_build_rejects_single_peak() {
        let peaks = vec![Peak::new(0.0, 120.0)];
        let config = SequencerConfig::default();
        assert!(
            GeneratedSet::build("Set", peaks, 10.0, &config, &scenario_pool(), &mut rng()).is_err()
        );
    }

    #[test]
    fn test_set_json_round_trip() {
        let peaks = vec![Peak::new(0.0, 120.0), Peak::new(10.0, 120.0)];
        let set = GeneratedSet::build(
            "Round Trip",
            peaks,
            10.0,
            &SequencerConfig::default(),
            &scenario_pool(),
            &mut rng(),
        )
        .unwrap();
        let json = serde_json::to_string(&set).unwrap();
        let back: GeneratedSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, set.name);
        assert_eq!(back.entries.len(), set.entries.len());
        assert_eq!(back.peaks.len(), 2);
    }
}
