//! Offline listening harness for the dub delay engine.
//!
//! Renders a two-second click pattern through the engine — driving it
//! exactly like a host would, one block and one parameter push at a
//! time — and writes the result to a stereo float WAV. Handy for
//! auditioning parameter changes without loading a DAW.
//!
//! ```text
//! cargo run --bin render [output.wav]
//! ```

use anyhow::{Context, Result};
use dub_delay::DubDelay;

const SAMPLE_RATE: u32 = 48_000;
const BLOCK_SIZE: usize = 512;
const BPM: f64 = 120.0;

/// Four seconds of pattern, then enough tail to hear the repeats fade.
const RENDER_SECONDS: usize = 8;

fn main() -> Result<()> {
    let out_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "dub-delay-demo.wav".to_string());

    let mut delay = DubDelay::new();
    delay.prepare(SAMPLE_RATE as f64, BLOCK_SIZE);

    // A classic dub setting: eighth-note repeats, hot feedback, some
    // tape grime, and full ping-pong.
    delay.set_delay_time(12.0, true, BPM);
    delay.set_feedback(65.0);
    delay.set_degradation(35.0);
    delay.set_filter_type(false);
    delay.set_filter_frequency(1200.0);
    delay.set_filter_bandwidth(2.0);
    delay.set_gain(0.0);
    delay.set_pan_lr(70.0);
    delay.set_pan_rl(70.0);
    delay.set_mix(50.0);

    // Transport edge: start the pass from silence, glide collapsed.
    delay.reset();

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&out_path, spec)
        .with_context(|| format!("creating {out_path}"))?;

    let total_samples = SAMPLE_RATE as usize * RENDER_SECONDS;
    let mut left = vec![0.0f32; BLOCK_SIZE];
    let mut right = vec![0.0f32; BLOCK_SIZE];

    let mut pos = 0;
    while pos < total_samples {
        for i in 0..BLOCK_SIZE {
            let sample = click(pos + i);
            left[i] = sample;
            right[i] = sample;
        }

        let mut channels: [&mut [f32]; 2] = [&mut left, &mut right];
        delay.process(&mut channels);

        for i in 0..BLOCK_SIZE {
            writer.write_sample(left[i])?;
            writer.write_sample(right[i])?;
        }
        pos += BLOCK_SIZE;
    }

    writer.finalize().context("finalizing WAV")?;
    println!("wrote {RENDER_SECONDS}s of audio to {out_path}");
    Ok(())
}

/// One short percussive click per beat for the first four seconds,
/// alternating polarity so successive repeats are easy to tell apart.
fn click(t: usize) -> f32 {
    let beat = (SAMPLE_RATE as usize * 60) / BPM as usize;
    if t >= SAMPLE_RATE as usize * 4 {
        return 0.0;
    }

    let phase = t % beat;
    if phase < 300 {
        let env = 1.0 - phase as f32 / 300.0;
        let sign = if (t / beat) % 2 == 0 { 1.0 } else { -1.0 };
        sign * 0.8 * env * env
    } else {
        0.0
    }
}
