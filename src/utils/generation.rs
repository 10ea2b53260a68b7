//! Deterministic test-signal generation.
//!
//! Every generator is a pure function of its arguments so analysis and
//! processing results built on top of them are reproducible.

use std::f64::consts::PI;
use std::time::Duration;

use ndarray::{Array1, Array2};

use crate::{AudioBuffer, MasteringResult};

/// A single sinusoid of a compound tone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneComponent {
    /// Frequency in Hz.
    pub frequency: f64,
    /// Peak amplitude.
    pub amplitude: f64,
}

impl ToneComponent {
    /// Creates a new component.
    pub const fn new(frequency: f64, amplitude: f64) -> Self {
        Self {
            frequency,
            amplitude,
        }
    }
}

fn sample_count(duration: Duration, sample_rate: u32) -> usize {
    (duration.as_secs_f64() * f64::from(sample_rate)).round() as usize
}

/// Generates a mono sine wave.
///
/// # Arguments
/// * `frequency` - Frequency in Hz
/// * `duration` - Signal length
/// * `sample_rate` - Sample rate in Hz
/// * `amplitude` - Peak amplitude
pub fn sine_wave(
    frequency: f64,
    duration: Duration,
    sample_rate: u32,
    amplitude: f64,
) -> MasteringResult<AudioBuffer> {
    compound_tone(
        &[ToneComponent::new(frequency, amplitude)],
        duration,
        sample_rate,
    )
}

/// Generates a mono sum of sinusoids.
pub fn compound_tone(
    components: &[ToneComponent],
    duration: Duration,
    sample_rate: u32,
) -> MasteringResult<AudioBuffer> {
    let n = sample_count(duration, sample_rate);
    let sr = f64::from(sample_rate);
    let samples = Array1::from_iter((0..n).map(|i| {
        let t = i as f64 / sr;
        components
            .iter()
            .map(|c| c.amplitude * (2.0 * PI * c.frequency * t).sin())
            .sum::<f64>()
    }));
    AudioBuffer::new_mono(samples, sample_rate)
}

/// Generates a mono linear sine sweep from `start_freq` to `end_freq`.
pub fn chirp(
    start_freq: f64,
    end_freq: f64,
    duration: Duration,
    sample_rate: u32,
    amplitude: f64,
) -> MasteringResult<AudioBuffer> {
    let n = sample_count(duration, sample_rate);
    let sr = f64::from(sample_rate);
    let slope = (end_freq - start_freq) / duration.as_secs_f64().max(f64::MIN_POSITIVE);

    let mut phase = 0.0_f64;
    let mut samples = Vec::with_capacity(n);
    for i in 0..n {
        let t = i as f64 / sr;
        samples.push(amplitude * phase.sin());
        // Integrate the instantaneous frequency f0 + k t
        phase += 2.0 * PI * (start_freq + slope * t) / sr;
    }
    AudioBuffer::new_mono(Array1::from(samples), sample_rate)
}

/// Generates a stereo sine with independent channel amplitudes.
pub fn stereo_sine_wave(
    frequency: f64,
    duration: Duration,
    sample_rate: u32,
    left_amplitude: f64,
    right_amplitude: f64,
) -> MasteringResult<AudioBuffer> {
    let n = sample_count(duration, sample_rate);
    let sr = f64::from(sample_rate);
    let data = Array2::from_shape_fn((2, n), |(ch, i)| {
        let amplitude = if ch == 0 {
            left_amplitude
        } else {
            right_amplitude
        };
        amplitude * (2.0 * PI * frequency * i as f64 / sr).sin()
    });
    AudioBuffer::new_multi_channel(data, sample_rate)
}

/// Generates mono silence.
pub fn silence(duration: Duration, sample_rate: u32) -> MasteringResult<AudioBuffer> {
    AudioBuffer::new_mono(
        Array1::zeros(sample_count(duration, sample_rate)),
        sample_rate,
    )
}

/// Generates a single unit impulse at `position` samples.
pub fn impulse(length: usize, position: usize, sample_rate: u32) -> MasteringResult<AudioBuffer> {
    let mut samples = Array1::zeros(length);
    if position < length {
        samples[position] = 1.0;
    }
    AudioBuffer::new_mono(samples, sample_rate)
}
