//! # State-Variable Filter (TPT)
//!
//! All three filtering jobs in the engine — the resonant bandpass in the
//! feedback loop, the degradation lowpass, and the fixed post-saturation
//! lowpass — are served by one small state-variable filter, parameterized
//! by an output-mode tag rather than by trait objects or inheritance.
//!
//! ## The Topology
//!
//! This is the topology-preserving-transform (TPT) form of the analog
//! state-variable filter, per Andrew Simper's "Solving the continuous
//! SVF equations". Two trapezoidal integrators (`ic1eq`, `ic2eq`) carry
//! the state; per sample:
//!
//! ```text
//! g  = tan(π · cutoff / sample_rate)      (prewarped frequency)
//! k  = 1 / Q                              (damping)
//! a1 = 1 / (1 + g·(g + k))
//! a2 = g · a1
//! a3 = g · a2
//!
//! v3 = input - ic2eq
//! v1 = a1·ic1eq + a2·v3                   → bandpass output
//! v2 = ic2eq + a2·ic1eq + a3·v3           → lowpass output
//! ic1eq = 2·v1 - ic1eq
//! ic2eq = 2·v2 - ic2eq
//! ```
//!
//! The prewarped `tan` mapping keeps the cutoff accurate right up toward
//! Nyquist, and the trapezoidal integration keeps the filter stable when
//! cutoff or resonance move while audio is running — both matter in a
//! feedback loop where the filter is struck by its own output.

use std::f32::consts::{FRAC_1_SQRT_2, PI};

/// Which of the filter's simultaneous outputs to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    Lowpass,
    Bandpass,
}

/// A single TPT state-variable filter section.
///
/// Cutoff and resonance survive [`prepare()`](Self::prepare) — only the
/// integrator state is volatile, and only [`reset()`](Self::reset)
/// clears it.
pub struct Svf {
    mode: FilterMode,
    sample_rate: f32,
    cutoff_hz: f32,
    /// Resonance as filter Q. 1/√2 is the flattest (Butterworth) response.
    q: f32,

    // Coefficients derived from (cutoff, q, sample_rate).
    a1: f32,
    a2: f32,
    a3: f32,

    // Trapezoidal integrator state.
    ic1eq: f32,
    ic2eq: f32,
}

impl Svf {
    /// Create a filter producing the given output, at 1 kHz / Q = 1/√2
    /// until configured otherwise.
    pub fn new(mode: FilterMode) -> Self {
        let mut svf = Self {
            mode,
            sample_rate: 44100.0,
            cutoff_hz: 1000.0,
            q: FRAC_1_SQRT_2,
            a1: 0.0,
            a2: 0.0,
            a3: 0.0,
            ic1eq: 0.0,
            ic2eq: 0.0,
        };
        svf.update_coefficients();
        svf
    }

    /// Adopt a new sample rate and rederive the coefficients.
    pub fn prepare(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
    }

    /// Set the cutoff (lowpass) / center (bandpass) frequency in Hz.
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.cutoff_hz = cutoff_hz;
        self.update_coefficients();
    }

    /// Set the resonance as a Q value. Higher Q = narrower, more
    /// resonant response around the cutoff.
    pub fn set_resonance(&mut self, q: f32) {
        self.q = q.max(0.05);
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        // Keep the prewarp argument below π/2: clamp to just under the
        // Nyquist frequency, and away from 0 Hz where g vanishes.
        let cutoff = self.cutoff_hz.clamp(10.0, self.sample_rate * 0.49);

        let g = (PI * cutoff / self.sample_rate).tan();
        let k = 1.0 / self.q;
        self.a1 = 1.0 / (1.0 + g * (g + k));
        self.a2 = g * self.a1;
        self.a3 = g * self.a2;
    }

    /// Process one sample.
    pub fn process(&mut self, input: f32) -> f32 {
        let v3 = input - self.ic2eq;
        let v1 = self.a1 * self.ic1eq + self.a2 * v3;
        let v2 = self.ic2eq + self.a2 * self.ic1eq + self.a3 * v3;
        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        match self.mode {
            FilterMode::Lowpass => v2,
            FilterMode::Bandpass => v1,
        }
    }

    /// Clear the integrator state. Configuration is untouched.
    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}

/// The feedback-loop tone filter: one bandpass stage, with a second
/// identical stage cascaded behind it in 24 dB mode.
///
/// Its output plays two roles at once — it is the wet signal handed to
/// the dry/wet mixer, and it is the input to the feedback shaper. One
/// instance per channel.
pub struct FeedbackFilter {
    stage1: Svf,
    stage2: Svf,
    is_24_db: bool,
}

impl FeedbackFilter {
    /// Bandpass at the engine defaults: 1 kHz center, Q = 1, 12 dB slope.
    pub fn new() -> Self {
        let mut stage1 = Svf::new(FilterMode::Bandpass);
        let mut stage2 = Svf::new(FilterMode::Bandpass);
        stage1.set_resonance(1.0);
        stage2.set_resonance(1.0);
        Self {
            stage1,
            stage2,
            is_24_db: false,
        }
    }

    pub fn prepare(&mut self, sample_rate: f32) {
        self.stage1.prepare(sample_rate);
        self.stage2.prepare(sample_rate);
    }

    /// Center frequency, applied to both stages.
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        self.stage1.set_cutoff(cutoff_hz);
        self.stage2.set_cutoff(cutoff_hz);
    }

    /// Resonance (Q), applied to both stages.
    pub fn set_resonance(&mut self, q: f32) {
        self.stage1.set_resonance(q);
        self.stage2.set_resonance(q);
    }

    /// Select the slope: false = 12 dB/octave (one stage), true =
    /// 24 dB/octave (two cascaded stages).
    pub fn set_slope(&mut self, is_24_db: bool) {
        self.is_24_db = is_24_db;
    }

    /// Filter one sample. The second stage's state only advances in
    /// 24 dB mode.
    pub fn process(&mut self, input: f32) -> f32 {
        let out = self.stage1.process(input);
        if self.is_24_db {
            self.stage2.process(out)
        } else {
            out
        }
    }

    pub fn reset(&mut self) {
        self.stage1.reset();
        self.stage2.reset();
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// DC (0 Hz) is below any lowpass cutoff and must pass at unity
    /// gain: feeding a constant converges to that constant.
    #[test]
    fn test_lowpass_passes_dc() {
        let mut filter = Svf::new(FilterMode::Lowpass);
        filter.prepare(44100.0);
        filter.set_cutoff(100.0);

        let mut output = 0.0;
        for _ in 0..20000 {
            output = filter.process(1.0);
        }

        assert!(
            (output - 1.0).abs() < 1e-4,
            "DC should pass through lowpass, got {output}"
        );
    }

    /// A low lowpass cutoff must crush a Nyquist-rate alternation
    /// (+1, -1, +1, ...), the highest representable frequency.
    #[test]
    fn test_lowpass_attenuates_high_freq() {
        let mut filter = Svf::new(FilterMode::Lowpass);
        filter.prepare(44100.0);
        filter.set_cutoff(100.0);

        let mut max_output = 0.0_f32;
        for i in 0..2000 {
            let input = if i % 2 == 0 { 1.0 } else { -1.0 };
            let output = filter.process(input);
            if i > 100 {
                max_output = max_output.max(output.abs());
            }
        }

        assert!(
            max_output < 0.05,
            "Expected heavy attenuation, got max output {max_output}"
        );
    }

    /// A bandpass rejects DC: with a constant input the bandpass output
    /// settles to zero while the integrators absorb the offset.
    #[test]
    fn test_bandpass_rejects_dc() {
        let mut filter = Svf::new(FilterMode::Bandpass);
        filter.prepare(44100.0);
        filter.set_cutoff(1000.0);
        filter.set_resonance(1.0);

        let mut output = 1.0;
        for _ in 0..20000 {
            output = filter.process(1.0);
        }

        assert!(
            output.abs() < 1e-4,
            "Bandpass should reject DC, got {output}"
        );
    }

    /// A sine at the bandpass center must come through far stronger
    /// than one well outside the passband.
    #[test]
    fn test_bandpass_selects_center_frequency() {
        let sample_rate = 44100.0;

        let response = |freq: f32| -> f32 {
            let mut filter = Svf::new(FilterMode::Bandpass);
            filter.prepare(sample_rate);
            filter.set_cutoff(1000.0);
            filter.set_resonance(2.0);

            let mut peak = 0.0_f32;
            for i in 0..8820 {
                let phase = 2.0 * PI * freq * i as f32 / sample_rate;
                let output = filter.process(phase.sin());
                // Skip the settling transient.
                if i > 4410 {
                    peak = peak.max(output.abs());
                }
            }
            peak
        };

        let at_center = response(1000.0);
        let far_below = response(50.0);
        let far_above = response(12000.0);

        assert!(
            at_center > 4.0 * far_below,
            "center {at_center} vs below {far_below}"
        );
        assert!(
            at_center > 4.0 * far_above,
            "center {at_center} vs above {far_above}"
        );
    }

    /// reset() clears the integrators but keeps the configuration.
    #[test]
    fn test_reset_clears_state_only() {
        let mut filter = Svf::new(FilterMode::Lowpass);
        filter.prepare(44100.0);
        filter.set_cutoff(500.0);

        filter.process(1.0);
        filter.reset();

        // With zeroed state, silence in = silence out.
        let output = filter.process(0.0);
        assert!(
            output.abs() < 1e-6,
            "Expected silence after reset, got {output}"
        );
    }

    /// The cascade only runs its second stage in 24 dB mode, so the two
    /// slopes must produce different outputs for the same input.
    #[test]
    fn test_cascade_slope_selection() {
        let run = |is_24_db: bool| -> Vec<f32> {
            let mut filter = FeedbackFilter::new();
            filter.prepare(44100.0);
            filter.set_cutoff(1000.0);
            filter.set_resonance(1.0);
            filter.set_slope(is_24_db);

            let mut out = Vec::with_capacity(64);
            for i in 0..64 {
                let input = if i == 0 { 1.0 } else { 0.0 };
                out.push(filter.process(input));
            }
            out
        };

        let twelve = run(false);
        let twenty_four = run(true);

        let differs = twelve
            .iter()
            .zip(&twenty_four)
            .any(|(a, b)| (a - b).abs() > 1e-6);
        assert!(differs, "12 and 24 dB slopes should not be identical");
    }
}
