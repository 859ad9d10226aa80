//! Rule filter engine and smart crates.
//!
//! A crate is a named, rule-filtered subset of the track pool. Rules are
//! applied left to right as an intersection pipeline: each rule only ever
//! sees the tracks that survived the rules before it (AND semantics, no
//! OR or grouping). Surviving tracks keep the pool's original order.

use crate::camelot;
use crate::track::Track;
use anyhow::{bail, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Track attribute a rule tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleField {
    Bpm,
    Key,
    Energy,
    Date,
    Genre,
}

/// Comparison operator. Text forms: `>` `<` `>=` `<=` `=` `~` (contains)
/// and `!~` (not contains).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Contains,
    NotContains,
}

impl fmt::Display for RuleOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "=",
            Self::Contains => "~",
            Self::NotContains => "!~",
        };
        write!(f, "{s}")
    }
}

/// One declarative filter predicate. `value` is interpreted per field:
/// a number for bpm/energy, "days ago" for date, text for key/genre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: Uuid,
    pub field: RuleField,
    pub op: RuleOp,
    pub value: String,
}

impl Rule {
    #[must_use]
    pub fn new(field: RuleField, op: RuleOp, value: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            field,
            op,
            value: value.into(),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = match self.field {
            RuleField::Bpm => "bpm",
            RuleField::Key => "key",
            RuleField::Energy => "energy",
            RuleField::Date => "date",
            RuleField::Genre => "genre",
        };
        write!(f, "{field}{}{}", self.op, self.value)
    }
}

impl FromStr for Rule {
    type Err = anyhow::Error;

    /// Parse the CLI text form, e.g. `bpm>=120`, `key~A minor`,
    /// `genre!~remix`, `date>90`.
    fn from_str(s: &str) -> Result<Self> {
        // Longest operators first so ">=" is not read as ">".
        const OPS: [(&str, RuleOp); 7] = [
            (">=", RuleOp::Ge),
            ("<=", RuleOp::Le),
            ("!~", RuleOp::NotContains),
            (">", RuleOp::Gt),
            ("<", RuleOp::Lt),
            ("=", RuleOp::Eq),
            ("~", RuleOp::Contains),
        ];
        for (token, op) in OPS {
            if let Some(idx) = s.find(token) {
                let field = match s[..idx].trim().to_lowercase().as_str() {
                    "bpm" => RuleField::Bpm,
                    "key" => RuleField::Key,
                    "energy" => RuleField::Energy,
                    "date" => RuleField::Date,
                    "genre" => RuleField::Genre,
                    other => bail!("Unknown rule field '{other}' in rule '{s}'"),
                };
                let value = s[idx + token.len()..].trim();
                if value.is_empty() {
                    bail!("Rule '{s}' has no value");
                }
                return Ok(Self::new(field, op, value));
            }
        }
        bail!("Rule '{s}' has no operator (expected one of > < >= <= = ~ !~)")
    }
}

/// Venue tag for a crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Club,
    Festival,
    Radio,
    Custom,
}

/// A named, rule-filtered subset of the track pool, with the materialized
/// result of the last filter run. Saved as JSON so it can be regenerated
/// against a refreshed pool later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartCrate {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub event_type: Option<EventType>,
    pub rules: Vec<Rule>,
    /// Base key for Camelot-compatibility key rules, if any.
    pub base_key: Option<String>,
    /// Snapshot of the tracks that matched at the last (re)generation.
    pub tracks: Vec<Track>,
    pub created_at: DateTime<Utc>,
}

impl SmartCrate {
    /// Build a crate by running `rules` against a pool snapshot.
    ///
    /// # Errors
    ///
    /// An empty name is a validation error. An empty *result* is not:
    /// a crate that matches nothing is returned as-is.
    pub fn build(
        name: &str,
        description: &str,
        event_type: Option<EventType>,
        rules: Vec<Rule>,
        base_key: Option<String>,
        pool: &[Track],
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Crate name must not be empty");
        }
        let tracks = filter_tracks(pool, &rules, base_key.as_deref(), now);
        log::info!(
            "Crate '{}': {} of {} tracks matched {} rule(s)",
            name,
            tracks.len(),
            pool.len(),
            rules.len()
        );
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.trim().to_string(),
            event_type,
            rules,
            base_key,
            tracks,
            created_at: now,
        })
    }

    /// Re-run the crate's rules against the current pool and overwrite the
    /// materialized track snapshot.
    pub fn regenerate(&mut self, pool: &[Track], now: DateTime<Utc>) {
        self.tracks = filter_tracks(pool, &self.rules, self.base_key.as_deref(), now);
        log::info!(
            "Regenerated crate '{}': {} tracks now match",
            self.name,
            self.tracks.len()
        );
    }

    /// Preset: high-energy peak-time tracks for club sets.
    pub fn preset_high_energy(pool: &[Track], now: DateTime<Utc>) -> Result<Self> {
        Self::build(
            "High Energy Club",
            "High energy, BPM over 120",
            Some(EventType::Club),
            vec![
                Rule::new(RuleField::Energy, RuleOp::Ge, "7"),
                Rule::new(RuleField::Bpm, RuleOp::Gt, "120"),
            ],
            None,
            pool,
            now,
        )
    }

    /// Preset: tracks not added in the last 3 months.
    pub fn preset_fresh(pool: &[Track], now: DateTime<Utc>) -> Result<Self> {
        Self::build(
            "Fresh Tracks",
            "Not added in the last 3 months",
            Some(EventType::Radio),
            vec![Rule::new(RuleField::Date, RuleOp::Gt, "90")],
            None,
            pool,
            now,
        )
    }

    /// Preset: low energy, slow tempo.
    pub fn preset_chill(pool: &[Track], now: DateTime<Utc>) -> Result<Self> {
        Self::build(
            "Chill Vibes",
            "Low energy, BPM under 100",
            Some(EventType::Radio),
            vec![
                Rule::new(RuleField::Energy, RuleOp::Le, "4"),
                Rule::new(RuleField::Bpm, RuleOp::Lt, "100"),
            ],
            None,
            pool,
            now,
        )
    }
}

/// Apply rules to a pool snapshot as a sequential narrowing pipeline.
///
/// The caller's pool is never mutated; survivors are cloned out in the
/// pool's original order. `base_key` switches key `~` rules to Camelot
/// compatibility matching when both keys resolve to wheel codes.
#[must_use]
pub fn filter_tracks(
    pool: &[Track],
    rules: &[Rule],
    base_key: Option<&str>,
    now: DateTime<Utc>,
) -> Vec<Track> {
    let mut filtered: Vec<Track> = pool.to_vec();
    for rule in rules {
        let before = filtered.len();
        filtered.retain(|track| rule_matches(rule, track, base_key, now));
        log::debug!("Rule {rule}: {before} -> {} tracks", filtered.len());
    }
    filtered
}

fn rule_matches(rule: &Rule, track: &Track, base_key: Option<&str>, now: DateTime<Utc>) -> bool {
    match rule.field {
        RuleField::Bpm => {
            // Tracks without a detected tempo never match, whatever the
            // operator (fail closed).
            let Some(bpm) = track.bpm else { return false };
            let Some(value) = parse_numeric(rule) else { return false };
            compare_numeric(rule.op, bpm, value)
        }
        RuleField::Key => {
            let Some(key) = track.key.as_deref() else { return false };
            match rule.op {
                RuleOp::Contains => {
                    if let Some(base) = base_key {
                        if let (Some(track_code), Some(base_code)) =
                            (camelot::key_to_camelot(key), camelot::key_to_camelot(base))
                        {
                            return camelot::codes_compatible(base_code, track_code);
                        }
                    }
                    key.to_lowercase().contains(&rule.value.to_lowercase())
                }
                RuleOp::Eq => key.eq_ignore_ascii_case(rule.value.trim()),
                // Only containment and equality are defined for keys.
                _ => true,
            }
        }
        RuleField::Energy => {
            // Absent energy gets the neutral default rather than failing
            // closed: the feature is optional upstream.
            let energy = f64::from(track.energy.unwrap_or(5));
            let Some(value) = parse_numeric(rule) else { return false };
            compare_numeric(rule.op, energy, value)
        }
        RuleField::Date => {
            // Only ">" is defined: created more than N days ago.
            if rule.op != RuleOp::Gt {
                log::warn!("Date rule operator '{}' has no effect; only '>' is defined", rule.op);
                return true;
            }
            let Some(days) = parse_numeric(rule) else { return false };
            // A day count outside chrono's representable range matches
            // nothing, like any other malformed numeric value.
            let Some(cutoff) = Duration::try_days(days as i64)
                .and_then(|span| now.checked_sub_signed(span))
            else {
                log::warn!("Rule {rule}: '{}' days is out of range; rule matches nothing", rule.value);
                return false;
            };
            track.created_at < cutoff
        }
        RuleField::Genre => {
            let genre = track.genre.as_deref().unwrap_or("").to_lowercase();
            let needle = rule.value.to_lowercase();
            match rule.op {
                RuleOp::Contains => genre.contains(&needle),
                RuleOp::NotContains => !genre.contains(&needle),
                _ => true,
            }
        }
    }
}

/// Numeric rule value, or `None` (with a warning) when it does not parse.
/// A malformed value makes the rule match nothing rather than panicking.
fn parse_numeric(rule: &Rule) -> Option<f64> {
    match rule.value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            log::warn!("Rule {rule}: value '{}' is not a number; rule matches nothing", rule.value);
            None
        }
    }
}

fn compare_numeric(op: RuleOp, left: f64, right: f64) -> bool {
    match op {
        RuleOp::Gt => left > right,
        RuleOp::Lt => left < right,
        RuleOp::Ge => left >= right,
        RuleOp::Le => left <= right,
        RuleOp::Eq => (left - right).abs() < f64::EPSILON,
        // Containment operators have no numeric meaning.
        RuleOp::Contains | RuleOp::NotContains => true,
    }
}
