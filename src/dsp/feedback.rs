//! # Feedback Shaper
//!
//! Conditions the filtered wet signal into the value that re-enters the
//! delay lines. The stage order is load-bearing; each step depends on
//! the one before it:
//!
//! 1. **Cross-feed**: a fraction of each channel is routed into the
//!    opposite channel's feedback, producing ping-pong repeats.
//! 2. **Feedback gain**: scales the repeat level; capped at 0.95 so the
//!    loop decays even before any limiting.
//! 3. **Soft saturation**: `tanh` rounds off peaks and adds the odd
//!    harmonics that make hot repeats sound pushed rather than clipped.
//! 4. **Post-saturation lowpass**: a fixed 8 kHz lowpass strips the
//!    high-frequency edge harmonics the saturation just generated,
//!    before they are re-injected and saturated again on the next pass.
//!    It must run after the tanh, not before — its whole job is cleaning
//!    up what the tanh produced.
//! 5. **Ceiling**: an unconditional clamp to ±0.95. Whatever the
//!    upstream gain, resonance, and saturation have done, the value
//!    written back into the delay line is bounded, so the loop cannot
//!    diverge under any parameter combination.
//!
//! The dry input is NOT part of this stage: the engine adds it,
//! unclamped, at write-back time so input transients are preserved.

use crate::dsp::filter::{FilterMode, Svf};

/// Hard amplitude ceiling on the feedback contribution written back
/// into the delay lines.
pub const WRITE_CEILING: f32 = 0.95;

/// Fixed cutoff of the post-saturation lowpass.
pub const POST_SATURATION_LPF_HZ: f32 = 8000.0;

/// Stereo feedback conditioner: cross-feed, gain, saturation, lowpass,
/// ceiling — in that order.
pub struct FeedbackShaper {
    lowpass_l: Svf,
    lowpass_r: Svf,

    /// Feedback gain in [0, 0.95].
    gain: f32,
    /// Fraction of the left channel fed into the right feedback, [0, 1].
    pan_lr: f32,
    /// Fraction of the right channel fed into the left feedback, [0, 1].
    pan_rl: f32,
}

impl FeedbackShaper {
    pub fn new() -> Self {
        let mut lowpass_l = Svf::new(FilterMode::Lowpass);
        let mut lowpass_r = Svf::new(FilterMode::Lowpass);
        lowpass_l.set_cutoff(POST_SATURATION_LPF_HZ);
        lowpass_r.set_cutoff(POST_SATURATION_LPF_HZ);
        Self {
            lowpass_l,
            lowpass_r,
            gain: 0.5,
            pan_lr: 0.0,
            pan_rl: 0.0,
        }
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.lowpass_l.prepare(sample_rate);
        self.lowpass_r.prepare(sample_rate);
    }

    /// Feedback gain, already mapped to [0, 0.95] by the engine.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(0.0, WRITE_CEILING);
    }

    /// Left→right cross-feed coefficient in [0, 1].
    pub fn set_pan_lr(&mut self, coeff: f32) {
        self.pan_lr = coeff.clamp(0.0, 1.0);
    }

    /// Right→left cross-feed coefficient in [0, 1].
    pub fn set_pan_rl(&mut self, coeff: f32) {
        self.pan_rl = coeff.clamp(0.0, 1.0);
    }

    /// Shape one stereo pair of filtered wet samples into the feedback
    /// values to write back. The result is always within
    /// ±[`WRITE_CEILING`].
    pub fn process(&mut self, filtered_l: f32, filtered_r: f32) -> (f32, f32) {
        // Ping-pong cross-feed.
        let cross_l = filtered_r * self.pan_rl;
        let cross_r = filtered_l * self.pan_lr;

        // Gain.
        let fb_l = (filtered_l + cross_l) * self.gain;
        let fb_r = (filtered_r + cross_r) * self.gain;

        // Soft saturation.
        let fb_l = fb_l.tanh();
        let fb_r = fb_r.tanh();

        // Lowpass AFTER the saturation: removes the edge harmonics it
        // generated before they re-enter the loop.
        let fb_l = self.lowpass_l.process(fb_l);
        let fb_r = self.lowpass_r.process(fb_r);

        // Ceiling.
        (
            fb_l.clamp(-WRITE_CEILING, WRITE_CEILING),
            fb_r.clamp(-WRITE_CEILING, WRITE_CEILING),
        )
    }

    pub fn reset(&mut self) {
        self.lowpass_l.reset();
        self.lowpass_r.reset();
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
