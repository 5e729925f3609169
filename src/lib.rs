//! # Dub Delay — A PT2399-Style Tape Delay Engine
//!
//! A stereo dub delay modeled on bucket-brigade hardware: a feedback
//! delay line whose repeats get darker and crunchier the longer and
//! hotter you run it. Tempo-synced delay time, a resonant bandpass in
//! the feedback loop, tape-style degradation, soft saturation, and
//! ping-pong cross-feed.
//!
//! ## Signal Flow
//!
//! ```text
//! Input ──┬───────────────────────────────────────────────── × (1 - mix) ──────┐
//!         │                                                                    │
//!         │          ┌─────────────────────────────────────────────┐           │
//!         │          │               FEEDBACK LOOP                 │           │
//!         │          │                                             │           ▼
//!         └────────►(+)──► [Delay Line] ──► [Degrade] ──► [Bandpass] ─┬─ × gain × mix ──►(+)──► Output
//!                    ▲     (circular,       (S&H +       (12/24 dB)   │
//!                    │      cubic read)      lowpass)                 │⇄ cross-feed with
//!                    │                                                │  the other channel
//!                    └── ceiling ◄── 8 kHz LPF ◄── tanh ◄── × feedback┘
//! ```
//!
//! ## Using the Engine
//!
//! The engine is a plain library type driven by a host-integration
//! layer (a plugin wrapper, an app, a test harness). The contract:
//!
//! - Call [`DubDelay::prepare`] with the sample rate before audio runs,
//!   and only while audio is inactive. It rederives every
//!   sample-rate-dependent coefficient and forces a [`DubDelay::reset`].
//! - Push parameters through the setters once per block, from the same
//!   thread, immediately before [`DubDelay::process`]. Every setter
//!   clamps its input to the valid domain instead of rejecting it.
//! - Call [`DubDelay::reset`] on the transport stopped→playing edge
//!   (track it with a `was_playing` flag in the host layer): it clears
//!   the delay history and all filter state so stale feedback energy
//!   and filter ringing never bleed into a fresh pass.
//!
//! `process` runs synchronously to completion and never allocates,
//! blocks, or performs I/O; all buffers are preallocated at
//! construction for the worst case (4 seconds at 192 kHz per channel).

pub mod dsp;
pub mod tempo;

use dsp::degrade::Degradation;
use dsp::delay_line::DelayLine;
use dsp::feedback::{FeedbackShaper, POST_SATURATION_LPF_HZ, WRITE_CEILING};
use dsp::filter::FeedbackFilter;
use dsp::map_linear;
use tempo::DelayTimeController;

/// Delay buffer capacity per channel: 4 seconds at 192 kHz.
pub const MAX_DELAY_SAMPLES: usize = 192_000 * 4;

/// The dub delay engine.
///
/// Owns all audio-rate state: a delay line, bandpass stage, and shaper
/// path per channel, plus the delay-time glide and degradation model
/// shared across the pair. One instance per plugin/track; it persists
/// across `process` calls until the next `prepare` or `reset`.
pub struct DubDelay {
    /// Set by `prepare()`; 44.1 kHz until the host reports otherwise.
    sample_rate: f64,

    delay_line_l: DelayLine,
    delay_line_r: DelayLine,

    /// Tempo-sync conversion and per-sample delay-length smoothing.
    delay_time: DelayTimeController,

    /// Bucket-brigade lo-fi model, derived from the delay time.
    degradation: Degradation,

    /// Resonant bandpass stage(s) in the feedback loop, per channel.
    feedback_filter_l: FeedbackFilter,
    feedback_filter_r: FeedbackFilter,

    /// Cross-feed, gain, saturation, and the write-back ceiling.
    feedback: FeedbackShaper,

    /// Linear wet gain, from the ±12 dB output gain parameter.
    output_gain: f32,
    /// Dry/wet balance in [0, 1].
    wet_mix: f32,
}

impl DubDelay {
    pub fn new() -> Self {
        Self {
            sample_rate: 44100.0,
            delay_line_l: DelayLine::new(MAX_DELAY_SAMPLES),
            delay_line_r: DelayLine::new(MAX_DELAY_SAMPLES),
            delay_time: DelayTimeController::new(),
            degradation: Degradation::new(),
            feedback_filter_l: FeedbackFilter::new(),
            feedback_filter_r: FeedbackFilter::new(),
            feedback: FeedbackShaper::new(),
            output_gain: 1.0,
            wet_mix: 0.5,
        }
    }

    /// Adopt the host's audio configuration.
    ///
    /// Rederives every sample-rate-dependent filter coefficient (the
    /// configured cutoffs and resonances themselves survive) and forces
    /// a [`reset()`](Self::reset). Call only while audio is inactive.
    ///
    /// `max_block_size` is accepted for completeness of the host
    /// contract; the per-sample pipeline has no block-sized state.
    pub fn prepare(&mut self, sample_rate: f64, _max_block_size: usize) {
        self.sample_rate = sample_rate;

        let sr = sample_rate as f32;
        self.feedback_filter_l.prepare(sr);
        self.feedback_filter_r.prepare(sr);
        self.degradation.prepare(sr);
        self.feedback.prepare(sr);

        log::debug!(
            "prepare: sample_rate={sample_rate} write_ceiling={WRITE_CEILING} \
             feedback_lpf_hz={POST_SATURATION_LPF_HZ}"
        );

        self.reset();
    }

    /// Return to a freshly-prepared state: delay buffers zeroed, all
    /// filter and hold state cleared, and the delay-time glide collapsed
    /// onto its target so a transport restart never glides audibly.
    ///
    /// The host layer calls this on the transport stopped→playing edge.
    pub fn reset(&mut self) {
        self.delay_line_l.clear();
        self.delay_line_r.clear();

        self.feedback_filter_l.reset();
        self.feedback_filter_r.reset();
        self.degradation.reset();
        self.feedback.reset();

        self.delay_time.reset();

        log::debug!("reset: delay buffers and filter state cleared");
    }

    /// Process one block in place.
    ///
    /// `channels` is channel-major: 1 slice for mono, 2 for stereo.
    /// With no channels the call is a no-op; in mono the right-channel
    /// path reuses the left channel's delayed signal and writes no
    /// right output. Mismatched slice lengths are truncated to the
    /// shorter channel.
    pub fn process(&mut self, channels: &mut [&mut [f32]]) {
        let Some((left, rest)) = channels.split_first_mut() else {
            return;
        };
        let mut right = rest.first_mut();

        let num_samples = match &right {
            Some(r) => left.len().min(r.len()),
            None => left.len(),
        };

        // Snapshot of the block-rate parameters: the per-sample loop
        // reads only these locals, never the setter-backed fields.
        let output_gain = self.output_gain;
        let wet_mix = self.wet_mix;

        for i in 0..num_samples {
            // Glide the delay length one step toward its target.
            let delay_samples = self.delay_time.tick();

            // Read both channels at the same fractional offset.
            let delayed_l = self.delay_line_l.read(delay_samples);
            let delayed_r = match &right {
                Some(_) => self.delay_line_r.read(delay_samples),
                None => delayed_l,
            };

            // Bucket-brigade degradation (bypassed at amount ~0).
            let (degraded_l, degraded_r) = self.degradation.process(delayed_l, delayed_r);

            // Feedback-loop bandpass. This output is both the wet
            // signal and the input to the feedback shaper.
            let filtered_l = self.feedback_filter_l.process(degraded_l);
            let filtered_r = self.feedback_filter_r.process(degraded_r);

            // Cross-feed, gain, saturation, post-LPF, ceiling.
            let (fb_l, fb_r) = self.feedback.process(filtered_l, filtered_r);

            let dry_l = left[i];
            let dry_r = match &right {
                Some(r) => r[i],
                None => dry_l,
            };

            // Write-back: dry input enters unclamped; only the feedback
            // contribution is ceiling-limited. The right buffer is fed
            // even for mono blocks, so a later mono→stereo switch finds
            // real history instead of a 4-second hole.
            self.delay_line_l.write(dry_l + fb_l);
            self.delay_line_r.write(dry_r + fb_r);

            // Dry/wet mix; the output gain rides the wet path only.
            let wet_l = filtered_l * output_gain;
            let wet_r = filtered_r * output_gain;
            left[i] = dry_l * (1.0 - wet_mix) + wet_l * wet_mix;
            if let Some(r) = &mut right {
                r[i] = dry_r * (1.0 - wet_mix) + wet_r * wet_mix;
            }

            self.delay_line_l.advance();
            self.delay_line_r.advance();
        }
    }

    // ─── Parameter setters ───────────────────────────────────────────
    //
    // All setters clamp to their stated domain and store plain values;
    // they are called from the audio thread between blocks, so no
    // locking or atomics are involved.

    /// Set the delay time.
    ///
    /// When `tempo_synced`, `value` is a note division on the 1–96
    /// scale (24 = quarter note) evaluated at `bpm` (non-positive BPM
    /// falls back to 120); otherwise `value` is milliseconds. The time
    /// is clamped to [1, 4000] ms.
    ///
    /// Also rederives the degradation bandwidth and hold period, which
    /// are functions of the new target time.
    pub fn set_delay_time(&mut self, value: f32, tempo_synced: bool, bpm: f64) {
        let delay_ms = self
            .delay_time
            .set_target(value, tempo_synced, bpm, self.sample_rate);
        self.degradation.set_delay_ms(delay_ms);
    }

    /// Feedback amount, 0–100. Maps onto a loop gain of 0.0–0.95,
    /// deliberately capped below unity.
    pub fn set_feedback(&mut self, percent: f32) {
        self.feedback
            .set_gain(percent.clamp(0.0, 100.0) / 100.0 * WRITE_CEILING);
    }

    /// Degradation amount, 0–100.
    pub fn set_degradation(&mut self, percent: f32) {
        self.degradation.set_amount(percent.clamp(0.0, 100.0) / 100.0);
    }

    /// Feedback filter slope: false = 12 dB/octave, true = 24 dB/octave.
    pub fn set_filter_type(&mut self, is_24_db: bool) {
        self.feedback_filter_l.set_slope(is_24_db);
        self.feedback_filter_r.set_slope(is_24_db);
    }

    /// Feedback filter center frequency in Hz, clamped to 300–3000.
    pub fn set_filter_frequency(&mut self, freq_hz: f32) {
        let freq = freq_hz.clamp(300.0, 3000.0);
        self.feedback_filter_l.set_cutoff(freq);
        self.feedback_filter_r.set_cutoff(freq);
    }

    /// Feedback filter bandwidth, 0.0–4.0, mapped onto a resonance Q of
    /// 0.5–5.0.
    pub fn set_filter_bandwidth(&mut self, bandwidth: f32) {
        let q = map_linear(bandwidth.clamp(0.0, 4.0), 0.0, 4.0, 0.5, 5.0);
        self.feedback_filter_l.set_resonance(q);
        self.feedback_filter_r.set_resonance(q);
    }

    /// Wet output gain in dB, clamped to ±12.
    pub fn set_gain(&mut self, gain_db: f32) {
        self.output_gain = db_to_gain(gain_db.clamp(-12.0, 12.0));
    }

    /// Left→right cross-feed, 0–100.
    pub fn set_pan_lr(&mut self, percent: f32) {
        self.feedback.set_pan_lr(percent.clamp(0.0, 100.0) / 100.0);
    }

    /// Right→left cross-feed, 0–100.
    pub fn set_pan_rl(&mut self, percent: f32) {
        self.feedback.set_pan_rl(percent.clamp(0.0, 100.0) / 100.0);
    }

    /// Dry/wet mix, 0–100. At 0 the output is the untouched dry input.
    pub fn set_mix(&mut self, percent: f32) {
        self.wet_mix = percent.clamp(0.0, 100.0) / 100.0;
    }
}

impl Default for DubDelay {
    fn default() -> Self {
        Self::new()
    }
}

/// Decibels to linear gain: `10^(db/20)`. 0 dB = 1.0, ±12 dB ≈ 3.98x / 0.25x.
fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_to_gain() {
        assert!((db_to_gain(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_gain(20.0) - 10.0).abs() < 1e-4);
        assert!((db_to_gain(-20.0) - 0.1).abs() < 1e-6);
        assert!((db_to_gain(6.0) - 1.9953).abs() < 1e-3);
    }

    /// Setters must accept wildly out-of-range values without panicking;
    /// the clamped results are exercised behaviorally in tests/engine.rs.
    #[test]
    fn test_setters_clamp_instead_of_rejecting() {
        let mut engine = DubDelay::new();
        engine.prepare(48000.0, 512);

        engine.set_feedback(250.0);
        engine.set_feedback(-10.0);
        engine.set_degradation(1000.0);
        engine.set_filter_frequency(20.0);
        engine.set_filter_frequency(90000.0);
        engine.set_filter_bandwidth(-3.0);
        engine.set_gain(100.0);
        engine.set_pan_lr(500.0);
        engine.set_pan_rl(-500.0);
        engine.set_mix(101.0);
        engine.set_delay_time(-5.0, false, 0.0);

        let mut block = vec![0.5f32; 64];
        let mut channels: [&mut [f32]; 1] = [&mut block];
        engine.process(&mut channels);
        assert!(block.iter().all(|s| s.is_finite()));
    }
}
