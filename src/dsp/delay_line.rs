//! # Delay Line (Circular Buffer)
//!
//! A delay line stores audio samples and lets you read them back after a
//! specified time delay. One instance per channel; the engine owns a pair.
//!
//! ## How the Circular Buffer Works
//!
//! Imagine a circular tape loop. A "write head" records incoming audio
//! onto the tape, and a "read head" plays it back from a position further
//! behind on the tape. The distance between the two heads determines the
//! delay time.
//!
//! In code, the "tape" is a `Vec<f32>` of fixed capacity and the write
//! head is an integer index. Each processed sample:
//!
//! 1. Read the delayed sample from `write_pos - delay_in_samples`,
//!    wrapping around the end of the buffer.
//! 2. Write the new sample at `write_pos`.
//! 3. Advance `write_pos` by 1, wrapping back to 0 at the end.
//!
//! ## Cubic (Catmull-Rom) Interpolation
//!
//! Delay time is continuously smoothed, so the read position is almost
//! never a whole number of samples. Reading the nearest slot would snap
//! between positions and produce zipper noise; linear interpolation fixes
//! the snapping but dulls the top octave while the read head is in
//! motion. A four-point Catmull-Rom cubic over `{pos-1, pos, pos+1,
//! pos+2}` keeps moving reads clean, which matters here because the read
//! head glides over thousands of samples every time the delay knob (or
//! the host tempo) changes.
//!
//! With `frac = read_pos - floor(read_pos)` the kernel is
//!
//! ```text
//! a0 = -0.5*y0 + 1.5*y1 - 1.5*y2 + 0.5*y3
//! a1 =      y0 - 2.5*y1 + 2.0*y2 - 0.5*y3
//! a2 = -0.5*y0          + 0.5*y2
//! a3 =           y1
//! out = a0*frac³ + a1*frac² + a2*frac + a3
//! ```
//!
//! The constant term is `y1`, the sample at `pos` itself, so at
//! `frac = 0` the read reduces exactly to the stored sample.

/// A fixed-capacity circular buffer functioning as an audio delay line.
///
/// The buffer is allocated once, at construction, to the worst-case
/// length and never resized. No allocation ever happens during audio
/// processing; changing the delay time only moves the read position.
pub struct DelayLine {
    /// The circular sample store. All values start at 0.0 (silence).
    buffer: Vec<f32>,

    /// Write cursor: the slot the next incoming sample will overwrite.
    /// Advances by 1 per sample, wrapping to 0 at `capacity`.
    write_pos: usize,

    /// Cached buffer length; all index arithmetic is taken modulo this.
    capacity: usize,
}

impl DelayLine {
    /// Create a delay line holding `capacity` samples of history.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity],
            write_pos: 0,
            capacity,
        }
    }

    /// Store `sample` at the current write position.
    ///
    /// Does NOT advance the cursor. Call [`advance()`](Self::advance)
    /// once per sample after both `read()` and `write()` are done; the
    /// separation lets the caller read the old state before overwriting.
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
    }

    /// Read `delay_samples` behind the write cursor with Catmull-Rom
    /// interpolation. Does not mutate state.
    ///
    /// `delay_samples` may be fractional and is not bounds-checked by
    /// callers: negative or oversized positions are wrapped back into
    /// the buffer here.
    pub fn read(&self, delay_samples: f32) -> f32 {
        let capacity = self.capacity as f32;

        let mut read_pos = self.write_pos as f32 - delay_samples;
        while read_pos < 0.0 {
            read_pos += capacity;
        }

        let pos0 = (read_pos as usize) % self.capacity;
        let pos1 = (pos0 + 1) % self.capacity;
        let pos2 = (pos0 + 2) % self.capacity;
        let pos_m1 = (pos0 + self.capacity - 1) % self.capacity;

        let frac = read_pos - read_pos.floor();

        let y0 = self.buffer[pos_m1];
        let y1 = self.buffer[pos0];
        let y2 = self.buffer[pos1];
        let y3 = self.buffer[pos2];

        let a0 = -0.5 * y0 + 1.5 * y1 - 1.5 * y2 + 0.5 * y3;
        let a1 = y0 - 2.5 * y1 + 2.0 * y2 - 0.5 * y3;
        let a2 = -0.5 * y0 + 0.5 * y2;
        let a3 = y1;

        a0 * frac * frac * frac + a1 * frac * frac + a2 * frac + a3
    }

    /// Advance the write cursor by one sample, wrapping at capacity.
    pub fn advance(&mut self) {
        self.write_pos = (self.write_pos + 1) % self.capacity;
    }

    /// Clear the buffer to silence and rewind the cursor.
    ///
    /// Called from the engine's `reset()` so stale echoes never bleed
    /// into the next playback pass.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Integer delays must return the exact stored sample: the cubic's
    /// constant term is the sample at `pos`, so `frac = 0` reduces to it.
    #[test]
    fn test_integer_reads_are_exact() {
        let mut dl = DelayLine::new(100);

        for i in 1..=5 {
            dl.write(i as f32);
            dl.advance();
        }

        // Most recent write is 1 sample back, oldest is 5 back.
        assert!((dl.read(1.0) - 5.0).abs() < 1e-5);
        assert!((dl.read(2.0) - 4.0).abs() < 1e-5);
        assert!((dl.read(3.0) - 3.0).abs() < 1e-5);
        assert!((dl.read(4.0) - 2.0).abs() < 1e-5);
        assert!((dl.read(5.0) - 1.0).abs() < 1e-5);
    }

    /// The Catmull-Rom weights sum to 1 at any `frac`, so a constant
    /// signal must interpolate to the same constant.
    #[test]
    fn test_fractional_read_of_constant_signal() {
        let mut dl = DelayLine::new(64);
        for _ in 0..32 {
            dl.write(0.5);
            dl.advance();
        }

        for delay in [1.25, 4.5, 10.75, 19.999] {
            let result = dl.read(delay);
            assert!(
                (result - 0.5).abs() < 1e-5,
                "Expected 0.5 at delay {delay}, got {result}"
            );
        }
    }

    /// Catmull-Rom reproduces straight lines exactly, so fractional
    /// reads of a ramp land on the ramp.
    #[test]
    fn test_fractional_read_of_ramp() {
        let mut dl = DelayLine::new(100);
        for i in 0..20 {
            dl.write(i as f32);
            dl.advance();
        }

        // write_pos = 20; reading 4.5 back targets position 15.5 on the
        // ramp, whose value is 15.5.
        let result = dl.read(4.5);
        assert!((result - 15.5).abs() < 1e-4, "Expected 15.5, got {result}");

        let result = dl.read(10.25);
        assert!((result - 9.75).abs() < 1e-4, "Expected 9.75, got {result}");
    }

    /// The buffer wraps correctly once more samples than its capacity
    /// have been written.
    #[test]
    fn test_wrapping() {
        let mut dl = DelayLine::new(4);

        for i in 0..6 {
            dl.write(i as f32);
            dl.advance();
        }

        // After 6 writes into a size-4 buffer, write_pos = 2 and the
        // most recent value (5.0) lives at slot 1.
        let result = dl.read(1.0);
        assert!((result - 5.0).abs() < 1e-5, "Expected 5.0, got {result}");
    }

    /// Negative and oversized delays must wrap rather than panic; the
    /// caller does not bounds-check.
    #[test]
    fn test_out_of_range_delays_wrap() {
        let mut dl = DelayLine::new(16);
        for _ in 0..8 {
            dl.write(0.25);
            dl.advance();
        }

        for delay in [-1.0, -40.0, 16.0, 100.5] {
            let result = dl.read(delay);
            assert!(
                result.is_finite(),
                "Expected finite result at delay {delay}, got {result}"
            );
        }
    }

    /// Clearing resets everything to silence.
    #[test]
    fn test_clear() {
        let mut dl = DelayLine::new(10);

        dl.write(0.5);
        dl.advance();
        dl.clear();

        let result = dl.read(1.0);
        assert!(result.abs() < 1e-6, "Expected 0.0 after clear, got {result}");
    }

    /// A freshly-built buffer outputs silence at any delay.
    #[test]
    fn test_silence_in_silence_out() {
        let dl = DelayLine::new(100);

        for delay in [1.0, 10.5, 50.0, 99.0] {
            let result = dl.read(delay);
            assert!(
                result.abs() < 1e-6,
                "Expected silence at delay {delay}, got {result}"
            );
        }
    }
}
