//! Loudness Meter: ungated K-weighted loudness and oversampled true peak.
//!
//! The loudness is a simplified BS.1770 measurement: each channel is
//! K-weighted, channel mean squares are summed, and the result is
//! `-0.691 + 10 log10(sum)`. Block gating is deliberately not applied.

use std::f64::consts::PI;

use rubato::{FftFixedIn, Resampler};
use tracing::trace;

use super::biquad::{BiquadCoefficients, FilterCascade};
use super::traits::AudioLoudness;
use super::types::FilterKind;
use crate::{
    AudioBuffer, EPS, MasteringError, MasteringResult, db_to_linear, linear_to_amplitude_db,
};

/// Offset that makes a 997 Hz full-scale sine read about −3.01 LUFS.
pub const LOUDNESS_OFFSET: f64 = -0.691;

/// Oversampling factor of the true-peak meter.
pub const TRUE_PEAK_OVERSAMPLING: usize = 4;

const TRUE_PEAK_CHUNK: usize = 1024;

// BS.1770 stage 1 (head-related high shelf) analogue parameters
const SHELF_F0: f64 = 1681.974450955533;
const SHELF_GAIN_DB: f64 = 3.999843853973347;
const SHELF_Q: f64 = 0.7071752369554196;
const SHELF_VB_EXPONENT: f64 = 0.4996667741545416;

// BS.1770 stage 2 (RLB high-pass) analogue parameters
const RLB_F0: f64 = 38.13547087602444;
const RLB_Q: f64 = 0.5003270373238773;

/// Designs the two-stage K-weighting pre-filter for `sample_rate`.
///
/// At 48 kHz this reproduces the published BS.1770 coefficients; other rates
/// are derived from the same analogue prototypes by bilinear transform.
pub fn k_weighting(sample_rate: f64) -> MasteringResult<FilterCascade> {
    if !(sample_rate > 2.0 * SHELF_F0) || !sample_rate.is_finite() {
        return Err(MasteringError::invalid_filter(
            FilterKind::HighShelf,
            SHELF_F0,
            SHELF_Q,
            sample_rate,
            "K-weighting needs a sample rate above twice the shelf frequency",
        ));
    }

    let k = (PI * SHELF_F0 / sample_rate).tan();
    let vh = 10.0_f64.powf(SHELF_GAIN_DB / 20.0);
    let vb = vh.powf(SHELF_VB_EXPONENT);
    let k_q = k / SHELF_Q;
    let k2 = k * k;
    let shelf = BiquadCoefficients::from_raw(
        [vh + vb * k_q + k2, 2.0 * (k2 - vh), vh - vb * k_q + k2],
        [1.0 + k_q + k2, 2.0 * (k2 - 1.0), 1.0 - k_q + k2],
    )?;

    let k = (PI * RLB_F0 / sample_rate).tan();
    let k_q = k / RLB_Q;
    let k2 = k * k;
    let a0 = 1.0 + k_q + k2;
    // BS.1770 publishes this numerator un-normalised as [1, -2, 1]
    let high_pass = BiquadCoefficients {
        b0: 1.0,
        b1: -2.0,
        b2: 1.0,
        a1: 2.0 * (k2 - 1.0) / a0,
        a2: (1.0 - k_q + k2) / a0,
    };

    Ok(FilterCascade::new(vec![shelf, high_pass]))
}

/// Sum of the K-weighted mean squares of every channel.
fn weighted_power(audio: &AudioBuffer) -> MasteringResult<f64> {
    let filter = k_weighting(audio.sample_rate_hz())?;
    Ok(audio
        .channels()
        .map(|channel| {
            let samples: Vec<f64> = channel.iter().copied().collect();
            let weighted = filter.filter_samples(&samples);
            weighted.iter().map(|x| x * x).sum::<f64>() / weighted.len() as f64
        })
        .sum())
}

fn chunk_peak(peak: f64, output: &[Vec<f64>]) -> f64 {
    output
        .iter()
        .flat_map(|channel| channel.iter())
        .fold(peak, |acc, x| acc.max(x.abs()))
}

/// Largest absolute sample of `audio` after 4x FFT oversampling (linear).
///
/// Never reports less than the plain sample peak.
pub fn true_peak_linear(audio: &AudioBuffer) -> MasteringResult<f64> {
    audio.ensure_not_empty("true_peak")?;
    let rate = audio.sample_rate() as usize;
    let planar: Vec<Vec<f64>> = audio.channels().map(|c| c.to_vec()).collect();
    let n = audio.samples_per_channel();

    let mut resampler = FftFixedIn::<f64>::new(
        rate,
        rate * TRUE_PEAK_OVERSAMPLING,
        TRUE_PEAK_CHUNK,
        2,
        planar.len(),
    )?;

    let mut peak = chunk_peak(0.0, &planar);
    let mut position = 0;
    while position + resampler.input_frames_next() <= n {
        let frames = resampler.input_frames_next();
        let chunk: Vec<&[f64]> = planar
            .iter()
            .map(|c| &c[position..position + frames])
            .collect();
        peak = chunk_peak(peak, &resampler.process(&chunk, None)?);
        position += frames;
    }
    if position < n {
        let tail: Vec<&[f64]> = planar.iter().map(|c| &c[position..]).collect();
        peak = chunk_peak(peak, &resampler.process_partial(Some(tail.as_slice()), None)?);
    }
    // Flush the resampler delay line
    peak = chunk_peak(peak, &resampler.process_partial(None::<&[&[f64]]>, None)?);

    trace!(peak, "true peak measured");
    Ok(peak)
}

impl AudioLoudness for AudioBuffer {
    fn integrated_loudness(&self) -> MasteringResult<f64> {
        self.ensure_not_empty("integrated_loudness")?;
        let power = weighted_power(self)?;
        Ok(LOUDNESS_OFFSET + 10.0 * power.max(EPS).log10())
    }

    fn true_peak_db(&self) -> MasteringResult<f64> {
        Ok(linear_to_amplitude_db(true_peak_linear(self)?))
    }

    fn gain_to_target(&self, target_lufs: f64) -> MasteringResult<(AudioBuffer, f64)> {
        if !target_lufs.is_finite() {
            return Err(MasteringError::invalid_parameter(
                "target_lufs",
                "loudness target must be finite",
            ));
        }
        let gain_db = target_lufs - self.integrated_loudness()?;
        Ok((self.scaled(db_to_linear(gain_db)), gain_db))
    }
}
