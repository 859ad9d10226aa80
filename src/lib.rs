//! Tempo-curve DJ set generation and rule-based smart crates.
//!
//! Core modules:
//! - [`curve`] - Tempo curve model (peaks, interpolation, sampling)
//! - [`camelot`] - Camelot wheel key compatibility
//! - [`rules`] - Declarative track filtering and smart crates
//! - [`sequencer`] - Curve-driven set generation
//! - [`suggest`] - Next-track suggestions for a live set
//! - [`export`] - M3U playlist export
//!
//! ### Supporting modules
//!
//! - [`track`] - Track data model
//! - [`db`] - SQLite track library
//! - [`config`] - Data directory management
//! - [`cli`] - Command-line interface definitions
//! - [`completion`] - Shell completion generation
//!
//! ## Quick start
//!
//! ```no_run
//! use setforge::curve::Peak;
//! use setforge::sequencer::{GeneratedSet, SequencerConfig};
//! use setforge::{config, db, export};
//! use anyhow::Result;
//!
//! let db_path = config::get_db_path()?;
//! let conn = db::connect(&db_path)?;
//! let pool = db::all_tracks(&conn)?;
//!
//! // Warm up from 120 to 150 bpm over an hour.
//! let peaks = vec![Peak::new(0.0, 120.0), Peak::new(60.0, 150.0)];
//! let set = GeneratedSet::build(
//!     "Friday",
//!     peaks,
//!     60.0,
//!     &SequencerConfig::default(),
//!     &pool,
//!     &mut rand::thread_rng(),
//! )?;
//! println!("{} tracks, {}s total", set.entries.len(), set.total_duration_seconds());
//!
//! let playlist = export::to_m3u(&set.tracks());
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Engine behavior
//!
//! - The tempo curve interpolates linearly between sorted peaks and holds
//!   flat outside them; the sequencer consumes a 30-second sampling of it.
//! - Track picks inside the BPM tolerance window are uniformly random, so
//!   rebuilding the same curve can produce a different (equally valid) set.
//!   Pass a seeded RNG for reproducibility.
//! - Tracks missing analysis data fail closed: no bpm means no BPM match,
//!   no key means no key match.
//!
//! ## Error handling
//!
//! All fallible public functions return `Result<T, anyhow::Error>`.
//! Validation problems (empty names, fewer than two peaks, malformed rule
//! text) are errors; empty results are not.

pub mod camelot;
pub mod cli;
pub mod completion;
pub mod config;
pub mod curve;
pub mod db;
pub mod export;
pub mod rules;
pub mod sequencer;
pub mod suggest;
pub mod track;
