//! Setforge - tempo-curve DJ sets and rule-based smart crates.
//!
//! Command routing for the CLI binary. All functionality lives in the
//! library; this file resolves the database, loads the pool snapshot and
//! dispatches to the engine modules.
//!
//! # Logging
//!
//! Controlled via `RUST_LOG`:
//! - `RUST_LOG=debug setforge build-set ...` - per-segment decisions
//! - `RUST_LOG=setforge::rules=debug setforge crate new ...` - rule narrowing

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{CommandFactory, Parser};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};

use setforge::rules::{Rule, SmartCrate};
use setforge::sequencer::{GeneratedSet, SequencerConfig};
use setforge::suggest::NowPlaying;
use setforge::track::Track;
use setforge::{cli, completion, config, db, export, suggest};

fn main() -> Result<()> {
    env_logger::init();

    let args = cli::Args::parse();
    let db_path = resolve_db_path(args.db)?;

    match args.command {
        cli::Command::InitDb { force } => {
            let conn = db::init_database(&db_path, force)?;
            println!(
                "Library ready at {} ({} tracks)",
                db_path.display(),
                db::track_count(&conn)?
            );
        }
        cli::Command::Import { path } => {
            let mut conn = db::connect(&db_path)?;
            let imported = db::import_tracks_from_file(&mut conn, &path)?;
            println!(
                "Imported {imported} tracks ({} total in library)",
                db::track_count(&conn)?
            );
        }
        cli::Command::List => {
            let pool = load_pool(&db_path)?;
            if pool.is_empty() {
                println!("Library is empty. Import tracks with: setforge import <tracks.json>");
            }
            for track in &pool {
                println!(
                    "{} - {} [{}] [{}] {} (energy {})",
                    track.artist_or_unknown(),
                    track.title,
                    track
                        .bpm
                        .map_or_else(|| "no bpm".to_string(), |b| format!("{b:.0} bpm")),
                    track.key.as_deref().unwrap_or("no key"),
                    track.duration_formatted(),
                    track
                        .energy
                        .map_or_else(|| "-".to_string(), |e| e.to_string()),
                );
            }
        }
        cli::Command::BuildSet {
            name,
            duration,
            peaks,
            tolerance,
            seed,
            out,
            m3u,
        } => {
            let pool = load_pool(&db_path)?;
            let sequencer_config = SequencerConfig {
                bpm_tolerance: tolerance,
                ..SequencerConfig::default()
            };
            let mut rng = match seed {
                Some(s) => StdRng::seed_from_u64(s),
                None => StdRng::from_entropy(),
            };

            info!("Building set '{name}' over {duration}min with {} peaks", peaks.len());
            let set =
                GeneratedSet::build(&name, peaks, duration, &sequencer_config, &pool, &mut rng)?;

            println!("Set '{}' - {} tracks:", set.name, set.entries.len());
            for entry in &set.entries {
                println!(
                    "  {} {} - {} ({} @ target {:.0} bpm)",
                    format_offset(entry.start_time_seconds),
                    entry.track.artist_or_unknown(),
                    entry.track.title,
                    entry
                        .track
                        .bpm
                        .map_or_else(|| "no bpm".to_string(), |b| format!("{b:.0} bpm")),
                    entry.target_bpm,
                );
            }

            if let Some(out) = out {
                write_json(&set, &out)?;
                println!("Saved set to {}", out.display());
            }
            if let Some(m3u) = m3u {
                export::write_set_m3u(&set, &m3u)?;
                println!("Exported playlist to {}", m3u.display());
            }
        }
        cli::Command::Crate { action } => run_crate(&db_path, action)?,
        cli::Command::Suggest { bpm, key, history } => {
            let pool = load_pool(&db_path)?;
            let current = NowPlaying {
                bpm,
                key,
                energy: None,
            };
            let suggestions = suggest::suggest(Some(&current), &history, &pool);
            if suggestions.is_empty() {
                println!("No suggestions - the library has no unplayed tracks.");
            }
            for s in &suggestions {
                println!(
                    "{:.0}% {} - {} [{}] [{}] ({} in at {}s)",
                    s.confidence * 100.0,
                    s.artist.as_deref().unwrap_or("Unknown"),
                    s.title,
                    s.bpm
                        .map_or_else(|| "no bpm".to_string(), |b| format!("{b:.0} bpm")),
                    s.key.as_deref().unwrap_or("no key"),
                    s.transition,
                    s.cue_point_seconds,
                );
            }
        }
        cli::Command::Export { path, out } => {
            export_saved(&path, &out)?;
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(completion::shell_to_completion_shell(shell), &mut cmd);
        }
    }

    Ok(())
}

/// Route the crate subcommands.
fn run_crate(db_path: &Path, action: cli::CrateAction) -> Result<()> {
    let now = Utc::now();
    match action {
        cli::CrateAction::New {
            name,
            description,
            event_type,
            rules,
            base_key,
            out,
            m3u,
        } => {
            if rules.is_empty() {
                bail!("A crate needs at least one --rule");
            }
            let rules = rules
                .iter()
                .map(|r| r.parse::<Rule>())
                .collect::<Result<Vec<Rule>>>()?;
            let pool = load_pool(db_path)?;
            let smart_crate = SmartCrate::build(
                &name,
                &description,
                event_type.map(Into::into),
                rules,
                base_key,
                &pool,
                now,
            )?;
            report_crate(&smart_crate);
            finish_crate(&smart_crate, out.as_deref(), m3u.as_deref())?;
        }
        cli::CrateAction::Preset { kind, out, m3u } => {
            let pool = load_pool(db_path)?;
            let smart_crate = match kind {
                cli::PresetKind::HighEnergy => SmartCrate::preset_high_energy(&pool, now)?,
                cli::PresetKind::Fresh => SmartCrate::preset_fresh(&pool, now)?,
                cli::PresetKind::Chill => SmartCrate::preset_chill(&pool, now)?,
            };
            report_crate(&smart_crate);
            finish_crate(&smart_crate, out.as_deref(), m3u.as_deref())?;
        }
        cli::CrateAction::Regenerate { path, m3u } => {
            let data = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read crate file {}", path.display()))?;
            let mut smart_crate: SmartCrate = serde_json::from_str(&data)
                .with_context(|| format!("{} is not a saved crate", path.display()))?;
            let pool = load_pool(db_path)?;
            smart_crate.regenerate(&pool, now);
            report_crate(&smart_crate);
            write_json(&smart_crate, &path)?;
            println!("Updated {}", path.display());
            if let Some(m3u) = m3u {
                export::write_crate_m3u(&smart_crate, &m3u)?;
                println!("Exported playlist to {}", m3u.display());
            }
        }
    }
    Ok(())
}

fn report_crate(smart_crate: &SmartCrate) {
    println!(
        "Crate '{}': {} tracks match {} rule(s)",
        smart_crate.name,
        smart_crate.tracks.len(),
        smart_crate.rules.len()
    );
    for rule in &smart_crate.rules {
        println!("  rule: {rule}");
    }
    if smart_crate.tracks.is_empty() {
        println!("No tracks matched. Relax a rule or import more music.");
    }
}

fn finish_crate(smart_crate: &SmartCrate, out: Option<&Path>, m3u: Option<&Path>) -> Result<()> {
    if let Some(out) = out {
        write_json(smart_crate, out)?;
        println!("Saved crate to {}", out.display());
    }
    if let Some(m3u) = m3u {
        export::write_crate_m3u(smart_crate, m3u)?;
        println!("Exported playlist to {}", m3u.display());
    }
    Ok(())
}

/// Export a saved set or crate file as M3U, sniffing which of the two it is.
fn export_saved(path: &Path, out: &Path) -> Result<()> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    if let Ok(set) = serde_json::from_str::<GeneratedSet>(&data) {
        export::write_set_m3u(&set, out)?;
        println!(
            "Exported set '{}' ({} tracks) to {}",
            set.name,
            set.entries.len(),
            out.display()
        );
        return Ok(());
    }
    if let Ok(smart_crate) = serde_json::from_str::<SmartCrate>(&data) {
        export::write_crate_m3u(&smart_crate, out)?;
        println!(
            "Exported crate '{}' ({} tracks) to {}",
            smart_crate.name,
            smart_crate.tracks.len(),
            out.display()
        );
        return Ok(());
    }
    bail!("{} is neither a saved set nor a saved crate", path.display())
}

fn resolve_db_path(db_override: Option<PathBuf>) -> Result<PathBuf> {
    match db_override {
        Some(path) => Ok(path),
        None => config::get_db_path(),
    }
}

/// Load the full pool snapshot in library order.
fn load_pool(db_path: &Path) -> Result<Vec<Track>> {
    let conn = db::connect(db_path)?;
    db::all_tracks(&conn)
}

fn write_json<T: serde::Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Format a start offset as m:ss or h:mm:ss.
fn format_offset(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
