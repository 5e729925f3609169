//! # Tempo Sync and Delay-Time Smoothing
//!
//! Converts a musical time specification into a delay length in samples
//! and glides the effective length toward it.
//!
//! ## The Note-Division Scale
//!
//! Tempo-synced delay time arrives as a value on a 1–96 scale where 96
//! is one whole note (four quarter notes):
//!
//! ```text
//! 96 = whole   48 = half   24 = quarter   12 = eighth   6 = sixteenth
//! ```
//!
//! Dotted and odd groupings fall out for free: 36 is a dotted quarter,
//! 16 is a quarter-note triplet. Conversion to milliseconds:
//!
//! ```text
//! ms = (60000 / bpm) · (value / 24)
//! ```
//!
//! At 120 BPM a quarter note (24) is 500 ms.
//!
//! ## Smoothing
//!
//! Jumping the read head to a new delay length would click and skip
//! (zipper noise). Instead the effective length takes one step toward
//! the target every sample:
//!
//! ```text
//! current = current·k + target·(1 - k),  k = 0.9995
//! ```
//!
//! The coefficient is a fixed per-sample constant, deliberately not
//! compensated for sample rate: at 192 kHz the glide settles ~4x faster
//! in wall-clock time than at 48 kHz. The glide itself is also what
//! produces the tape-style pitch sweep when the delay knob is turned.
//!
//! [`DelayTimeController::reset`] collapses `current` onto `target` so a
//! transport restart never begins with an audible glide from the old
//! setting.

use crate::MAX_DELAY_SAMPLES;

/// Shortest supported delay time.
pub const MIN_DELAY_MS: f32 = 1.0;
/// Longest supported delay time (4 seconds).
pub const MAX_DELAY_MS: f32 = 4000.0;

/// Per-sample smoothing coefficient for the delay-length glide.
const SMOOTHING_COEFF: f32 = 0.9995;

/// Note-division units per quarter note; 96 units make a whole note.
const UNITS_PER_QUARTER: f64 = 24.0;

/// Convert a note division (1–96 scale) at the given tempo into
/// milliseconds. A non-positive `bpm` falls back to 120.
pub fn note_division_ms(note_value: f32, bpm: f64) -> f32 {
    let bpm = if bpm <= 0.0 { 120.0 } else { bpm };
    let quarter_note_ms = 60_000.0 / bpm;
    let quarter_notes = note_value as f64 / UNITS_PER_QUARTER;
    (quarter_note_ms * quarter_notes) as f32
}

/// Tracks the target delay length in samples and glides the effective
/// length toward it one smoothing step per sample.
///
/// Both `current` and `target` always lie within `[1, capacity - 1]`.
pub struct DelayTimeController {
    current: f32,
    target: f32,
}

impl DelayTimeController {
    /// Starts at 22050 samples — 500 ms at 44.1 kHz, the engine default
    /// before any host configuration arrives.
    pub fn new() -> Self {
        Self {
            current: 22050.0,
            target: 22050.0,
        }
    }

    /// Set a new target from a time specification.
    ///
    /// `time_value` is a 1–96 note division when `tempo_synced`,
    /// otherwise direct milliseconds. The time is clamped to
    /// [1, 4000] ms and the sample target to `[1, MAX_DELAY_SAMPLES - 1]`.
    ///
    /// Returns the clamped milliseconds so the caller can rederive the
    /// degradation characteristics, which are a function of the target
    /// time rather than of the smoothed length.
    pub fn set_target(
        &mut self,
        time_value: f32,
        tempo_synced: bool,
        bpm: f64,
        sample_rate: f64,
    ) -> f32 {
        let delay_ms = if tempo_synced {
            note_division_ms(time_value, bpm)
        } else {
            time_value
        };
        let delay_ms = delay_ms.clamp(MIN_DELAY_MS, MAX_DELAY_MS);

        let delay_samples = (delay_ms as f64 * sample_rate / 1000.0) as f32;
        self.target = delay_samples.clamp(1.0, (MAX_DELAY_SAMPLES - 1) as f32);

        delay_ms
    }

    /// One smoothing step; returns the delay length (in samples) to
    /// read at for the current sample.
    pub fn tick(&mut self) -> f32 {
        self.current = self.current * SMOOTHING_COEFF + self.target * (1.0 - SMOOTHING_COEFF);
        self.current
    }

    /// Collapse the glide: the effective length snaps onto the target.
    pub fn reset(&mut self) {
        self.current = self.target;
    }

    /// The smoothed delay length in samples.
    pub fn current(&self) -> f32 {
        self.current
    }

    /// The target delay length in samples.
    pub fn target(&self) -> f32 {
        self.target
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
