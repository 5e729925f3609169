//! # Degradation Model
//!
//! Emulates the lo-fi character of a PT2399-class bucket-brigade delay
//! chip. Those chips run a fixed number of analog "buckets" at a clock
//! whose rate sets the delay time: the longer the delay, the slower the
//! clock, and the narrower the usable bandwidth. Two artifacts fall out
//! of that, and both are modeled here:
//!
//! - **Bandwidth loss**: a lowpass whose cutoff is derived from the
//!   delay time — 30 ms still sounds full-range (~15 kHz), while 500 ms
//!   and beyond is dark (~3 kHz).
//! - **Sample-rate reduction**: a sample-and-hold that latches the
//!   delayed signal only every `period` samples, where the period also
//!   grows with delay time (1 sample at 30 ms up to 4 at 500 ms).
//!
//! The degraded signal is crossfaded against the clean one by the
//! degradation amount, then lowpassed. Below a small threshold the whole
//! stage is bypassed and none of its state advances.

use crate::dsp::filter::{FilterMode, Svf};
use crate::dsp::map_linear;

/// Amounts at or below this bypass the stage entirely.
const BYPASS_THRESHOLD: f32 = 0.001;

/// Bucket-brigade degradation: sample-and-hold plus bandwidth lowpass,
/// both derived from the current delay time.
pub struct Degradation {
    lowpass_l: Svf,
    lowpass_r: Svf,

    /// Sample-and-hold memory per channel.
    held_l: f32,
    held_r: f32,
    /// Counts up every processed sample; latches and wraps at `period`.
    counter: u32,
    /// Hold length in samples, recomputed whenever delay time changes.
    period: u32,

    /// Crossfade between clean (0.0) and degraded (1.0).
    amount: f32,
}

impl Degradation {
    /// Start at the engine's 500 ms default delay: 3 kHz bandwidth and a
    /// 4-sample hold, with the stage itself bypassed (amount 0).
    pub fn new() -> Self {
        let mut degradation = Self {
            lowpass_l: Svf::new(FilterMode::Lowpass),
            lowpass_r: Svf::new(FilterMode::Lowpass),
            held_l: 0.0,
            held_r: 0.0,
            counter: 0,
            period: 1,
            amount: 0.0,
        };
        degradation.set_delay_ms(500.0);
        degradation
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.lowpass_l.prepare(sample_rate);
        self.lowpass_r.prepare(sample_rate);
    }

    /// Set the clean/degraded crossfade, clamped to [0, 1].
    pub fn set_amount(&mut self, amount: f32) {
        self.amount = amount.clamp(0.0, 1.0);
    }

    /// Rederive the bandwidth cutoff and hold period from the delay time
    /// in milliseconds. Called whenever the delay target changes; the
    /// derivation uses the target time, not the smoothed per-sample one.
    pub fn set_delay_ms(&mut self, delay_ms: f32) {
        let cutoff = cutoff_for_delay_ms(delay_ms);
        self.lowpass_l.set_cutoff(cutoff);
        self.lowpass_r.set_cutoff(cutoff);
        self.period = hold_period_for_delay_ms(delay_ms);
    }

    /// Degrade one stereo pair of delayed samples.
    ///
    /// At amounts at or below the bypass threshold the input passes
    /// through untouched and neither the hold counter nor the lowpass
    /// state advances; state is only ever cleared by [`reset()`](Self::reset).
    pub fn process(&mut self, clean_l: f32, clean_r: f32) -> (f32, f32) {
        if self.amount <= BYPASS_THRESHOLD {
            return (clean_l, clean_r);
        }

        self.counter += 1;
        if self.counter >= self.period {
            self.held_l = clean_l;
            self.held_r = clean_r;
            self.counter = 0;
        }

        let mixed_l = clean_l * (1.0 - self.amount) + self.held_l * self.amount;
        let mixed_r = clean_r * (1.0 - self.amount) + self.held_r * self.amount;

        (
            self.lowpass_l.process(mixed_l),
            self.lowpass_r.process(mixed_r),
        )
    }

    /// Zero the hold memory and lowpass state.
    pub fn reset(&mut self) {
        self.held_l = 0.0;
        self.held_r = 0.0;
        self.counter = 0;
        self.lowpass_l.reset();
        self.lowpass_r.reset();
    }
}

/// Bandwidth cutoff for a given delay time: [30, 500] ms maps linearly
/// onto [15000, 3000] Hz, clamped to [2000, 15000].
fn cutoff_for_delay_ms(delay_ms: f32) -> f32 {
    map_linear(delay_ms, 30.0, 500.0, 15000.0, 3000.0).clamp(2000.0, 15000.0)
}

/// Sample-and-hold period for a given delay time: [30, 500] ms maps
/// linearly onto [1, 4] samples, truncated, never below 1. Delays past
/// 500 ms keep extrapolating, so very long settings hold even longer.
fn hold_period_for_delay_ms(delay_ms: f32) -> u32 {
    let period = map_linear(delay_ms, 30.0, 500.0, 1.0, 4.0) as i32;
    period.max(1) as u32
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
