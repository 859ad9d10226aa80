//! Command-line interface definitions.
//!
//! Uses clap derive macros for type-safe argument parsing. Every command
//! maps to one library operation; routing lives in `main.rs`.
//!
//! ## Examples
//!
//! ```bash
//! setforge import tracks.json
//! setforge build-set --name "Friday" --duration 60 --peak 0:120 --peak 45:150
//! setforge crate new --name "Peak Time" --rule "bpm>=120" --rule "energy>=7"
//! ```

use crate::curve::Peak;
use crate::rules::EventType;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Crate presets recovered from the dashboard widget.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum PresetKind {
    /// Energy >= 7 and BPM over 120, for club sets
    HighEnergy,
    /// Tracks not added in the last 90 days
    Fresh,
    /// Energy <= 4 and BPM under 100
    Chill,
}

/// Event type tag for a new crate.
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum EventTypeArg {
    Club,
    Festival,
    Radio,
    Custom,
}

impl From<EventTypeArg> for EventType {
    fn from(arg: EventTypeArg) -> Self {
        match arg {
            EventTypeArg::Club => Self::Club,
            EventTypeArg::Festival => Self::Festival,
            EventTypeArg::Radio => Self::Radio,
            EventTypeArg::Custom => Self::Custom,
        }
    }
}

/// Main application arguments structure.
///
/// The main structure carries only the database override and a subcommand;
/// all functionality is accessed through specific commands.
#[derive(Parser)]
#[command(name = "setforge")]
#[command(about = "Setforge - tempo-curve DJ sets and rule-based smart crates")]
#[command(version)]
pub struct Args {
    /// Override the library database path (defaults to the platform data dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub db: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Enumeration of all available subcommands.
///
/// Command arguments are embedded directly in the enum variants for type
/// safety and automatic validation.
#[derive(Subcommand)]
pub enum Command {
    /// Initialize the track library database
    ///
    /// Creates the library schema in the platform data directory (or the
    /// --db override). Without --force an existing database is left as-is.
    InitDb {
        /// Delete and recreate an existing database
        #[arg(long)]
        force: bool,
    },

    /// Import analyzed tracks from a JSON export
    ///
    /// The file must contain a JSON array of track objects as produced by
    /// the analysis service. Re-imported ids replace their stored rows.
    Import {
        /// Path to the JSON track export
        path: PathBuf,
    },

    /// List all tracks in the library
    List,

    /// Build a DJ set from a tempo curve
    ///
    /// Peaks define the target-BPM trajectory; the sequencer fills it with
    /// library tracks. At least two peaks are required.
    BuildSet {
        /// Name of the set
        #[arg(long)]
        name: String,

        /// Total set length in minutes
        #[arg(long)]
        duration: f64,

        /// Curve control point as MINUTES:BPM, e.g. `--peak 30:150`.
        /// Repeat for each peak; at least two are required.
        #[arg(long = "peak", value_name = "MIN:BPM", value_parser = parse_peak_arg)]
        peaks: Vec<Peak>,

        /// Allowed BPM deviation when matching tracks to the curve
        #[arg(long, default_value_t = 5.0)]
        tolerance: f64,

        /// Seed the track picker for reproducible sets
        #[arg(long)]
        seed: Option<u64>,

        /// Write the generated set as JSON
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Also export the set as an M3U playlist
        #[arg(long, value_name = "FILE")]
        m3u: Option<PathBuf>,
    },

    /// Manage rule-based smart crates
    Crate {
        #[command(subcommand)]
        action: CrateAction,
    },

    /// Suggest next tracks for a live set
    ///
    /// Ranks the library against the currently playing track and prints
    /// the top matches with confidence, cue point and transition type.
    Suggest {
        /// BPM of the currently playing track
        #[arg(long)]
        bpm: Option<f64>,

        /// Key of the currently playing track, e.g. "A minor"
        #[arg(long)]
        key: Option<String>,

        /// Comma-separated track ids already played, most recent last
        #[arg(long, value_delimiter = ',')]
        history: Vec<String>,
    },

    /// Export a saved set or crate as an M3U playlist
    Export {
        /// Path to a saved set or crate JSON file
        path: PathBuf,

        /// Playlist file to write
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },

    /// Generate shell completions
    ///
    /// Usage: setforge completion bash > ~/.local/share/bash-completion/completions/setforge
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

/// Smart crate subcommands.
#[derive(Subcommand)]
pub enum CrateAction {
    /// Create a crate from filter rules
    ///
    /// Rules use the text form FIELD OP VALUE with no spaces, e.g.
    /// `bpm>=120`, `key~A minor`, `energy<=4`, `date>90`, `genre!~remix`.
    /// All rules must match (AND).
    New {
        /// Name of the crate
        #[arg(long)]
        name: String,

        /// Free-form description
        #[arg(long, default_value = "")]
        description: String,

        /// Event type tag
        #[arg(long, value_enum)]
        event_type: Option<EventTypeArg>,

        /// Filter rule; repeat for each rule
        #[arg(long = "rule", value_name = "RULE")]
        rules: Vec<String>,

        /// Base key for Camelot-compatible key matching, e.g. "A minor"
        #[arg(long)]
        base_key: Option<String>,

        /// Write the crate as JSON
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Also export the crate as an M3U playlist
        #[arg(long, value_name = "FILE")]
        m3u: Option<PathBuf>,
    },

    /// Create one of the built-in preset crates
    Preset {
        /// Which preset to build
        #[arg(value_enum)]
        kind: PresetKind,

        /// Write the crate as JSON
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Also export the crate as an M3U playlist
        #[arg(long, value_name = "FILE")]
        m3u: Option<PathBuf>,
    },

    /// Re-run a saved crate's rules against the current library
    ///
    /// Overwrites the track snapshot inside the JSON file in place.
    Regenerate {
        /// Path to a saved crate JSON file
        path: PathBuf,

        /// Also export the refreshed crate as an M3U playlist
        #[arg(long, value_name = "FILE")]
        m3u: Option<PathBuf>,
    },
}

/// Parse a `MINUTES:BPM` peak argument.
fn parse_peak_arg(raw: &str) -> Result<Peak, String> {
    let (time, bpm) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected MINUTES:BPM, got '{raw}'"))?;
    let time: f64 = time
        .trim()
        .parse()
        .map_err(|_| format!("invalid peak time '{time}'"))?;
    let bpm: f64 = bpm
        .trim()
        .parse()
        .map_err(|_| format!("invalid peak bpm '{bpm}'"))?;
    Ok(Peak::new(time, bpm))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_peak_argument_parsing() {
        let peak = parse_peak_arg("30:150").unwrap();
        assert_eq!(peak.time, 30.0);
        assert_eq!(peak.bpm, 150.0);
        let peak = parse_peak_arg(" 0 : 120.5 ").unwrap();
        assert_eq!(peak.bpm, 120.5);
        assert!(parse_peak_arg("30").is_err());
        assert!(parse_peak_arg("x:120").is_err());
        assert!(parse_peak_arg("30:y").is_err());
    }

    #[test]
    fn test_build_set_args_parse() {
        let args = Args::try_parse_from([
            "setforge",
            "build-set",
            "--name",
            "Friday",
            "--duration",
            "60",
            "--peak",
            "0:120",
            "--peak",
            "45:150",
            "--seed",
            "7",
        ])
        .unwrap();
        match args.command {
            Command::BuildSet {
                name,
                duration,
                peaks,
                tolerance,
                seed,
                ..
            } => {
                assert_eq!(name, "Friday");
                assert_eq!(duration, 60.0);
                assert_eq!(peaks.len(), 2);
                assert_eq!(tolerance, 5.0);
                assert_eq!(seed, Some(7));
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn test_suggest_history_is_comma_split() {
        let args = Args::try_parse_from([
            "setforge",
            "suggest",
            "--bpm",
            "128",
            "--history",
            "a,b,c",
        ])
        .unwrap();
        match args.command {
            Command::Suggest { history, .. } => {
                assert_eq!(history, vec!["a", "b", "c"]);
            }
            _ => panic!("wrong command parsed"),
        }
    }
}
