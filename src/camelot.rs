//! Camelot wheel key compatibility.
//!
//! Maps western key names to Camelot wheel codes (`1A`..`12B`) and decides
//! whether two keys mix harmonically. Both directions are fixed lookup
//! tables rather than wheel arithmetic: the ±1 neighbour relation wraps at
//! 12→1, and a table sidesteps the off-by-one bugs that arithmetic invites.

use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    /// Western key name → Camelot code, for the closed set of 24 keys the
    /// analyzer emits.
    static ref KEY_TO_CAMELOT: HashMap<&'static str, &'static str> = {
        let mut m = HashMap::new();
        m.insert("C major", "8B");
        m.insert("C minor", "5A");
        m.insert("C# major", "3B");
        m.insert("C# minor", "12A");
        m.insert("D major", "10B");
        m.insert("D minor", "7A");
        m.insert("D# major", "5B");
        m.insert("D# minor", "2A");
        m.insert("E major", "12B");
        m.insert("E minor", "9A");
        m.insert("F major", "7B");
        m.insert("F minor", "4A");
        m.insert("F# major", "2B");
        m.insert("F# minor", "11A");
        m.insert("G major", "9B");
        m.insert("G minor", "6A");
        m.insert("G# major", "4B");
        m.insert("G# minor", "1A");
        m.insert("A major", "11B");
        m.insert("A minor", "8A");
        m.insert("A# major", "6B");
        m.insert("A# minor", "3A");
        m.insert("B major", "1B");
        m.insert("B minor", "10A");
        m
    };

    /// Camelot code → codes it mixes with: itself, the relative major/minor
    /// (same number, other letter), and ±1 on the same letter (wrapping).
    static ref COMPATIBLE: HashMap<&'static str, [&'static str; 4]> = {
        let mut m = HashMap::new();
        m.insert("1A", ["1A", "1B", "2A", "12A"]);
        m.insert("1B", ["1A", "1B", "2B", "12B"]);
        m.insert("2A", ["2A", "2B", "1A", "3A"]);
        m.insert("2B", ["2A", "2B", "1B", "3B"]);
        m.insert("3A", ["3A", "3B", "2A", "4A"]);
        m.insert("3B", ["3A", "3B", "2B", "4B"]);
        m.insert("4A", ["4A", "4B", "3A", "5A"]);
        m.insert("4B", ["4A", "4B", "3B", "5B"]);
        m.insert("5A", ["5A", "5B", "4A", "6A"]);
        m.insert("5B", ["5A", "5B", "4B", "6B"]);
        m.insert("6A", ["6A", "6B", "5A", "7A"]);
        m.insert("6B", ["6A", "6B", "5B", "7B"]);
        m.insert("7A", ["7A", "7B", "6A", "8A"]);
        m.insert("7B", ["7A", "7B", "6B", "8B"]);
        m.insert("8A", ["8A", "8B", "7A", "9A"]);
        m.insert("8B", ["8A", "8B", "7B", "9B"]);
        m.insert("9A", ["9A", "9B", "8A", "10A"]);
        m.insert("9B", ["9A", "9B", "8B", "10B"]);
        m.insert("10A", ["10A", "10B", "9A", "11A"]);
        m.insert("10B", ["10A", "10B", "9B", "11B"]);
        m.insert("11A", ["11A", "11B", "10A", "12A"]);
        m.insert("11B", ["11A", "11B", "10B", "12B"]);
        m.insert("12A", ["12A", "12B", "11A", "1A"]);
        m.insert("12B", ["12A", "12B", "11B", "1B"]);
        m
    };
}

/// Resolve a western key name to its Camelot code.
///
/// Unknown or unparseable names return `None` - that is not an error, but
/// such keys cannot participate in compatibility checks.
#[must_use]
pub fn key_to_camelot(key: &str) -> Option<&'static str> {
    KEY_TO_CAMELOT.get(key.trim()).copied()
}

/// Whether two western keys are harmonically compatible.
///
/// Returns false if either key fails to resolve to a Camelot code.
#[must_use]
pub fn keys_compatible(a: &str, b: &str) -> bool {
    match (key_to_camelot(a), key_to_camelot(b)) {
        (Some(ca), Some(cb)) => codes_compatible(ca, cb),
        _ => false,
    }
}

/// Whether two Camelot codes are compatible per the wheel table.
#[must_use]
pub fn codes_compatible(a: &str, b: &str) -> bool {
    COMPATIBLE
        .get(a)
        .is_some_and(|list| list.contains(&b))
}

/// All 24 western key names the resolver understands, for validation and
/// property tests.
#[must_use]
pub fn known_keys() -> Vec<&'static str> {
    KEY_TO_CAMELOT.keys().copied().collect()
}
