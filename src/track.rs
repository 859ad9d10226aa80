//! Track data model.
//!
//! Tracks are produced upstream by the analysis service and imported into
//! the library; this core treats them as a read-only pool snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single analyzed track as stored in the library.
///
/// All analysis-derived fields are optional: the analyzer may fail to
/// detect a tempo or key, and `energy` is an externally supplied feature
/// that may simply not exist yet. A track with `bpm = None` never takes
/// part in BPM-based matching or filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Opaque unique identifier, assigned upstream.
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub genre: Option<String>,
    /// Detected tempo in beats per minute, if the analyzer found one.
    pub bpm: Option<f64>,
    /// Western key name, e.g. "A minor". See [`crate::camelot`].
    pub key: Option<String>,
    pub duration_seconds: u32,
    pub created_at: DateTime<Utc>,
    /// Energy rating 1-10, externally supplied. Absent energy falls back
    /// to a neutral 5 inside the energy rule only.
    pub energy: Option<u8>,
    /// Resolvable path or URI for playlist export, if the library knows one.
    pub location: Option<String>,
}

impl Track {
    /// Format the duration as `m:ss` (or `h:mm:ss` past the hour).
    #[must_use]
    pub fn duration_formatted(&self) -> String {
        let hours = self.duration_seconds / 3600;
        let minutes = (self.duration_seconds % 3600) / 60;
        let seconds = self.duration_seconds % 60;
        if hours > 0 {
            format!("{hours}:{minutes:02}:{seconds:02}")
        } else {
            format!("{minutes}:{seconds:02}")
        }
    }

    /// Artist for display, with the usual placeholder for untagged tracks.
    #[must_use]
    pub fn artist_or_unknown(&self) -> &str {
        self.artist.as_deref().unwrap_or("Unknown")
    }
}
