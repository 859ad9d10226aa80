//! M3U playlist export.
//!
//! Renders an ordered track list as an extended M3U document. The location
//! line is the track's stored path or URI when the library knows one, and
//! the stable track id otherwise, so a re-import can always resolve the
//! entry back to a library row. Titles never double as locations.

use crate::rules::SmartCrate;
use crate::sequencer::GeneratedSet;
use crate::track::Track;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Render tracks as an extended M3U document.
///
/// Output uses `\n` line endings and ends with a trailing newline. An empty
/// track list yields just the header.
#[must_use]
pub fn to_m3u(tracks: &[Track]) -> String {
    let mut out = String::from("#EXTM3U\n");
    for track in tracks {
        out.push_str(&format!(
            "#EXTINF:{},{} - {}\n",
            track.duration_seconds,
            track.artist_or_unknown(),
            track.title
        ));
        out.push_str(track.location.as_deref().unwrap_or(&track.id));
        out.push('\n');
    }
    out
}

/// Write a playlist file for a generated set.
pub fn write_set_m3u(set: &GeneratedSet, path: &Path) -> Result<()> {
    write_m3u(&set.tracks(), path)?;
    log::info!(
        "Exported set '{}' ({} tracks) to {}",
        set.name,
        set.entries.len(),
        path.display()
    );
    Ok(())
}

/// Write a playlist file for a smart crate's materialized tracks.
pub fn write_crate_m3u(smart_crate: &SmartCrate, path: &Path) -> Result<()> {
    write_m3u(&smart_crate.tracks, path)?;
    log::info!(
        "Exported crate '{}' ({} tracks) to {}",
        smart_crate.name,
        smart_crate.tracks.len(),
        path.display()
    );
    Ok(())
}

fn write_m3u(tracks: &[Track], path: &Path) -> Result<()> {
    fs::write(path, to_m3u(tracks))
        .with_context(|| format!("Failed to write playlist to {}", path.display()))
}
