//! SQLite-backed track library.
//!
//! The library is the read-only pool the generation engines draw from.
//! Tracks are produced by the external analysis service and imported here
//! as a JSON array; nothing in this crate ever updates a track row.

use crate::track::Track;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::fs;
use std::path::Path;

/// Open the library database at `path`, creating the file if absent.
pub fn connect(path: &Path) -> Result<Connection> {
    Connection::open(path)
        .with_context(|| format!("Failed to open library database at {}", path.display()))
}

/// Create the library schema. With `force` an existing database file is
/// removed first; without it an existing file is left untouched.
pub fn init_database(path: &Path, force: bool) -> Result<Connection> {
    if force && path.exists() {
        fs::remove_file(path)
            .with_context(|| format!("Failed to remove existing database {}", path.display()))?;
        log::warn!("Removed existing database at {}", path.display());
    }

    let conn = connect(path)?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tracks (
            id               TEXT PRIMARY KEY,
            title            TEXT NOT NULL,
            artist           TEXT,
            genre            TEXT,
            bpm              REAL,
            key              TEXT,
            duration_seconds INTEGER NOT NULL,
            created_at       TEXT NOT NULL,
            energy           INTEGER,
            location         TEXT
        )",
        (),
    )
    .context("Failed to create the tracks table")?;

    log::info!("Initialized library database at {}", path.display());
    Ok(conn)
}

/// Import tracks from a JSON array file exported by the analysis service.
/// Returns the number of tracks imported. Re-importing an id replaces the
/// stored row.
pub fn import_tracks_from_file(conn: &mut Connection, json_path: &Path) -> Result<usize> {
    let data = fs::read_to_string(json_path)
        .with_context(|| format!("Failed to read track export {}", json_path.display()))?;
    let tracks: Vec<Track> = serde_json::from_str(&data)
        .with_context(|| format!("Invalid track JSON in {}", json_path.display()))?;
    if tracks.is_empty() {
        bail!("Track export {} contains no tracks", json_path.display());
    }
    insert_tracks(conn, &tracks)?;
    Ok(tracks.len())
}

/// Insert tracks inside a single transaction with one prepared statement.
pub fn insert_tracks(conn: &mut Connection, tracks: &[Track]) -> Result<()> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO tracks
             (id, title, artist, genre, bpm, key, duration_seconds, created_at, energy, location)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;
        for track in tracks {
            stmt.execute((
                &track.id,
                &track.title,
                &track.artist,
                &track.genre,
                track.bpm,
                &track.key,
                track.duration_seconds,
                track.created_at.to_rfc3339(),
                track.energy,
                &track.location,
            ))
            .with_context(|| format!("Failed to insert track {}", track.id))?;
        }
    }
    tx.commit().context("Committing track import failed")?;
    log::info!("Imported {} tracks", tracks.len());
    Ok(())
}

/// The full pool snapshot in insertion order.
pub fn all_tracks(conn: &Connection) -> Result<Vec<Track>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, title, artist, genre, bpm, key, duration_seconds,
                    created_at, energy, location
             FROM tracks ORDER BY rowid",
        )
        .context("Failed to prepare track query")?;

    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<f64>>(4)?,
                row.get::<_, Option<String>>(5)?,
                row.get::<_, u32>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, Option<u8>>(8)?,
                row.get::<_, Option<String>>(9)?,
            ))
        })
        .context("Failed to query tracks")?;

    let mut tracks = Vec::new();
    for row in rows {
        let (id, title, artist, genre, bpm, key, duration_seconds, created_at, energy, location) =
            row.context("Failed to read track row")?;
        let created_at = parse_timestamp(&id, &created_at)?;
        tracks.push(Track {
            id,
            title,
            artist,
            genre,
            bpm,
            key,
            duration_seconds,
            created_at,
            energy,
            location,
        });
    }
    Ok(tracks)
}

/// Number of tracks in the library.
pub fn track_count(conn: &Connection) -> Result<u64> {
    conn.query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))
        .context("Failed to count tracks")
}

fn parse_timestamp(track_id: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Track {track_id} has an unparseable created_at: {raw}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn sample_track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            title: format!("Track {id}"),
            artist: Some("Artist".to_string()),
            genre: Some("techno".to_string()),
            bpm: Some(128.0),
            key: Some("A minor".to_string()),
            duration_seconds: 300,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
            energy: Some(7),
            location: Some("/music/a.flac".to_string()),
        }
    }

    fn temp_db() -> (tempfile::TempDir, Connection) {
        let dir = tempdir().unwrap();
        let conn = init_database(&dir.path().join("library.db"), false).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_creates_empty_library() {
        let (_dir, conn) = temp_db();
        assert_eq!(track_count(&conn).unwrap(), 0);
        assert!(all_tracks(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_insert_and_retrieve_round_trip() {
        let (_dir, mut conn) = temp_db();
        let tracks = vec![sample_track("a"), sample_track("b")];
        insert_tracks(&mut conn, &tracks).unwrap();

        let back = all_tracks(&conn).unwrap();
        assert_eq!(back, tracks);
        assert_eq!(track_count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_reimport_replaces_by_id() {
        let (_dir, mut conn) = temp_db();
        insert_tracks(&mut conn, &[sample_track("a")]).unwrap();
        let updated = Track {
            bpm: Some(130.0),
            ..sample_track("a")
        };
        insert_tracks(&mut conn, &[updated.clone()]).unwrap();

        let back = all_tracks(&conn).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].bpm, Some(130.0));
    }

    #[test]
    fn test_nullable_fields_survive_storage() {
        let (_dir, mut conn) = temp_db();
        let sparse = Track {
            artist: None,
            genre: None,
            bpm: None,
            key: None,
            energy: None,
            location: None,
            ..sample_track("sparse")
        };
        insert_tracks(&mut conn, &[sparse.clone()]).unwrap();
        assert_eq!(all_tracks(&conn).unwrap()[0], sparse);
    }

    #[test]
    fn test_import_from_json_file() {
        let (dir, mut conn) = temp_db();
        let json_path = dir.path().join("export.json");
        let tracks = vec![sample_track("a"), sample_track("b"), sample_track("c")];
        fs::write(&json_path, serde_json::to_string(&tracks).unwrap()).unwrap();

        let imported = import_tracks_from_file(&mut conn, &json_path).unwrap();
        assert_eq!(imported, 3);
        assert_eq!(track_count(&conn).unwrap(), 3);
    }

    #[test]
    fn test_import_rejects_empty_export() {
        let (dir, mut conn) = temp_db();
        let json_path = dir.path().join("empty.json");
        fs::write(&json_path, "[]").unwrap();
        assert!(import_tracks_from_file(&mut conn, &json_path).is_err());
    }

    #[test]
    fn test_force_init_drops_existing_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("library.db");
        let mut conn = init_database(&path, false).unwrap();
        insert_tracks(&mut conn, &[sample_track("a")]).unwrap();
        drop(conn);

        let conn = init_database(&path, true).unwrap();
        assert_eq!(track_count(&conn).unwrap(), 0);
    }
}
