//! Tempo curve model.
//!
//! Turns user-placed control points ("peaks") into a continuous target-BPM
//! trajectory over the length of a set. The curve is a pure function of the
//! sorted peaks - nothing is cached, so moving a peak can never leave a
//! stale curve behind.
//!
//! Downstream the sequencer consumes a fixed-step sampling of the curve,
//! not the continuous function; see [`TempoCurve::sample`].

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sampling step used by the set builder: one sample every 30 seconds.
pub const DEFAULT_STEP_MINUTES: f64 = 0.5;

/// BPM bounds offered by the set-builder UI. Peaks are not clamped to this
/// range here; it is exposed for input layers that want to.
pub const MIN_BPM: f64 = 60.0;
pub const MAX_BPM: f64 = 180.0;

/// A user-specified (time, target-tempo) control point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub id: Uuid,
    /// Position in the set, minutes from the start.
    pub time: f64,
    /// Target tempo at that position.
    pub bpm: f64,
}

impl Peak {
    #[must_use]
    pub fn new(time: f64, bpm: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            time,
            bpm,
        }
    }
}

/// One point of a sampled trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveSample {
    /// Minutes from the start of the set.
    pub time: f64,
    pub bpm: f64,
}

/// A validated, time-sorted tempo trajectory.
#[derive(Debug, Clone)]
pub struct TempoCurve {
    peaks: Vec<Peak>,
    duration_minutes: f64,
}

impl TempoCurve {
    /// Build a curve from peaks and a total set duration in minutes.
    ///
    /// Peaks are sorted by time; the caller's order does not matter.
    ///
    /// # Errors
    ///
    /// Fewer than 2 peaks, a non-positive or non-finite duration, or any
    /// non-finite or out-of-range peak refuses the whole generation
    /// pipeline up front.
    pub fn new(mut peaks: Vec<Peak>, duration_minutes: f64) -> Result<Self> {
        if peaks.len() < 2 {
            bail!(
                "At least 2 peaks are required to build a tempo curve (got {})",
                peaks.len()
            );
        }
        if !duration_minutes.is_finite() || duration_minutes <= 0.0 {
            bail!("Set duration must be a positive number of minutes (got {duration_minutes})");
        }
        for peak in &peaks {
            if !peak.time.is_finite() || !peak.bpm.is_finite() {
                bail!("Peak at {}min/{}bpm contains a non-finite value", peak.time, peak.bpm);
            }
            if peak.time < 0.0 || peak.time > duration_minutes {
                bail!(
                    "Peak time {}min is outside the set duration of {}min",
                    peak.time,
                    duration_minutes
                );
            }
        }
        // Stable sort: equal-time peaks keep their insertion order and the
        // first one wins during interpolation.
        peaks.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(std::cmp::Ordering::Equal));
        Ok(Self {
            peaks,
            duration_minutes,
        })
    }

    #[must_use]
    pub fn peaks(&self) -> &[Peak] {
        &self.peaks
    }

    #[must_use]
    pub fn duration_minutes(&self) -> f64 {
        self.duration_minutes
    }

    /// Target BPM at minute `t`.
    ///
    /// Flat extrapolation outside the peak span: before the first peak the
    /// first peak's bpm holds, after the last peak the last one's.
    #[must_use]
    pub fn bpm_at(&self, t: f64) -> f64 {
        let first = &self.peaks[0];
        let last = &self.peaks[self.peaks.len() - 1];
        if t <= first.time {
            return first.bpm;
        }
        if t >= last.time {
            return last.bpm;
        }
        for pair in self.peaks.windows(2) {
            let (p1, p2) = (&pair[0], &pair[1]);
            if t >= p1.time && t <= p2.time {
                let span = p2.time - p1.time;
                if span <= 0.0 {
                    // Zero-width interval from equal-time peaks.
                    return p1.bpm;
                }
                let ratio = (t - p1.time) / span;
                return p1.bpm + (p2.bpm - p1.bpm) * ratio;
            }
        }
        last.bpm
    }

    /// Sample the curve at fixed steps from 0 to the set duration. The set
    /// end is always the final sample, even when the duration is not a
    /// multiple of the step.
    ///
    /// This ordered list is what the sequencer consumes.
    ///
    /// # Errors
    ///
    /// A non-finite or non-positive step would never terminate; it is
    /// rejected up front.
    pub fn sample(&self, step_minutes: f64) -> Result<Vec<CurveSample>> {
        if !step_minutes.is_finite() || step_minutes <= 0.0 {
            bail!("Sampling step must be a positive number of minutes (got {step_minutes})");
        }
        let mut samples = Vec::new();
        let mut t = 0.0;
        while t <= self.duration_minutes {
            samples.push(CurveSample {
                time: t,
                bpm: self.bpm_at(t),
            });
            t += step_minutes;
        }
        // Close the trajectory at the set end when the stepping missed it.
        let covered = samples
            .last()
            .map_or(0.0, |s| s.time);
        if covered < self.duration_minutes - 1e-9 {
            samples.push(CurveSample {
                time: self.duration_minutes,
                bpm: self.bpm_at(self.duration_minutes),
            });
        }
        log::debug!(
            "Sampled tempo curve: {} samples over {}min at {}min steps",
            samples.len(),
            self.duration_minutes,
            step_minutes
        );
        Ok(samples)
    }
}
