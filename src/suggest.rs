//! Next-track suggestions.
//!
//! Scores every pool track not yet in the play history against what is
//! currently playing and returns the best few, each with a confidence,
//! a cue point and a recommended transition. The scoring is an additive
//! heuristic over tempo proximity, circle-of-fifths key distance, energy
//! progression and recent-artist fatigue; it is deterministic, so the same
//! inputs always rank the same.

use crate::track::Track;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Number of suggestions returned per request.
pub const MAX_SUGGESTIONS: usize = 5;

/// How many history entries back the same-artist penalty looks.
const ARTIST_FATIGUE_WINDOW: usize = 5;

/// Note names in circle-of-fifths order. Adjacent entries (wrapping) are a
/// fifth apart and mix cleanly even across major/minor.
const FIFTHS: [&str; 12] = [
    "C", "G", "D", "A", "E", "B", "F#", "C#", "G#", "D#", "A#", "F",
];

/// Coarse energy tier, inferred from tempo when not supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyTier {
    Low,
    Medium,
    High,
}

impl EnergyTier {
    /// Tier for a track whose only signal is its tempo. Unknown tempo sits
    /// in the middle.
    #[must_use]
    pub fn from_bpm(bpm: Option<f64>) -> Self {
        match bpm {
            Some(b) if b < 100.0 => Self::Low,
            Some(b) if b < 130.0 => Self::Medium,
            Some(_) => Self::High,
            None => Self::Medium,
        }
    }

    fn level(self) -> i8 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }
}

impl fmt::Display for EnergyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        write!(f, "{s}")
    }
}

/// How to move from the current track into the suggested one, chosen from
/// the tempo gap alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionType {
    /// Tempos within 2 bpm, mix on the beatgrid.
    Beatmatch,
    /// Within 5 bpm, or no tempo information at all.
    Fade,
    /// Anything wider.
    Cut,
}

impl fmt::Display for TransitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Beatmatch => "beatmatch",
            Self::Fade => "fade",
            Self::Cut => "cut",
        };
        write!(f, "{s}")
    }
}

/// What is playing right now. All fields optional: with nothing known the
/// scorer degrades to ranking by artist fatigue alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NowPlaying {
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub energy: Option<EnergyTier>,
}

/// One ranked suggestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub track_id: String,
    pub title: String,
    pub artist: Option<String>,
    pub bpm: Option<f64>,
    pub key: Option<String>,
    pub energy: EnergyTier,
    pub cue_point_seconds: u32,
    pub transition: TransitionType,
    /// Normalized score in [0, 1].
    pub confidence: f64,
}

/// Rank the pool against the current track and return the top suggestions.
///
/// Tracks whose id appears in `history` are excluded outright. Ties keep
/// pool order (stable sort).
#[must_use]
pub fn suggest(current: Option<&NowPlaying>, history: &[String], pool: &[Track]) -> Vec<Suggestion> {
    let played: HashSet<&str> = history.iter().map(String::as_str).collect();
    let recent_artists = recent_artists(history, pool);

    let mut scored: Vec<(&Track, f64)> = pool
        .iter()
        .filter(|t| !played.contains(t.id.as_str()))
        .map(|t| (t, score_track(t, current, &recent_artists)))
        .collect();
    scored.sort_by(|(_, a), (_, b)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(MAX_SUGGESTIONS);

    log::debug!(
        "Ranked {} candidate tracks against {} history entries",
        pool.len() - played.len().min(pool.len()),
        history.len()
    );

    scored
        .into_iter()
        .map(|(track, confidence)| Suggestion {
            track_id: track.id.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            bpm: track.bpm,
            key: track.key.clone(),
            energy: EnergyTier::from_bpm(track.bpm),
            cue_point_seconds: cue_point(track),
            transition: transition_for(current, track),
            confidence,
        })
        .collect()
}

/// Artists behind the last few history entries, resolved against the pool.
fn recent_artists<'a>(history: &[String], pool: &'a [Track]) -> Vec<&'a str> {
    history
        .iter()
        .rev()
        .take(ARTIST_FATIGUE_WINDOW)
        .filter_map(|id| pool.iter().find(|t| &t.id == id))
        .filter_map(|t| t.artist.as_deref())
        .collect()
}

fn score_track(track: &Track, current: Option<&NowPlaying>, recent_artists: &[&str]) -> f64 {
    let mut score: f64 = 0.5;

    if let Some(now) = current {
        if let (Some(track_bpm), Some(now_bpm)) = (track.bpm, now.bpm) {
            let diff = (track_bpm - now_bpm).abs();
            score += if diff <= 5.0 {
                0.3
            } else if diff <= 10.0 {
                0.15
            } else if diff <= 20.0 {
                0.05
            } else {
                -0.1
            };
        }

        if let (Some(track_key), Some(now_key)) = (track.key.as_deref(), now.key.as_deref()) {
            score += key_affinity(now_key, track_key);
        }

        let now_tier = now.energy.unwrap_or(EnergyTier::Medium);
        let track_tier = EnergyTier::from_bpm(track.bpm);
        score += match track_tier.level() - now_tier.level() {
            0 => 0.1,
            1 => 0.15,
            -1 => 0.05,
            d if d > 1 => -0.1,
            _ => 0.0,
        };
    }

    if let Some(artist) = track.artist.as_deref() {
        if recent_artists.contains(&artist) {
            score -= 0.1;
        }
    }

    score.clamp(0.0, 1.0)
}

/// Circle-of-fifths affinity on the note name alone (major/minor quality is
/// ignored at this stage; the Camelot resolver handles the strict check).
fn key_affinity(now_key: &str, track_key: &str) -> f64 {
    let note = |key: &str| key.split_whitespace().next().map(str::to_string);
    let (Some(a), Some(b)) = (note(now_key), note(track_key)) else {
        return 0.0;
    };
    let (Some(ia), Some(ib)) = (
        FIFTHS.iter().position(|&n| n == a),
        FIFTHS.iter().position(|&n| n == b),
    ) else {
        return 0.0;
    };
    let diff = ia.abs_diff(ib);
    match diff {
        0 => 0.2,
        1 | 11 => 0.15,
        2 | 10 => 0.1,
        _ => 0.0,
    }
}

/// A safe early cue: 10% of an assumed intro span, capped at 30 seconds.
/// Tracks without tempo analysis get the shorter assumed span.
fn cue_point(track: &Track) -> u32 {
    let assumed_seconds = if track.bpm.is_some() { 240.0 } else { 180.0 };
    30.min((assumed_seconds * 0.1) as u32)
}

fn transition_for(current: Option<&NowPlaying>, track: &Track) -> TransitionType {
    let (Some(now), Some(track_bpm)) = (current, track.bpm) else {
        return TransitionType::Fade;
    };
    let Some(now_bpm) = now.bpm else {
        return TransitionType::Fade;
    };
    let diff = (track_bpm - now_bpm).abs();
    if diff <= 2.0 {
        TransitionType::Beatmatch
    } else if diff <= 5.0 {
        TransitionType::Fade
    } else {
        TransitionType::Cut
    }
}
