//! Dynamics processing: multiband compression, soft clipping and limiting.
//!
//! All three processors share one envelope model. The detector takes the
//! per-frame peak across channels, so every channel of a frame receives the
//! same gain and the stereo image does not shift under compression. Time
//! constants are realised as centred moving averages with nearest-edge
//! padding rather than attack/release state machines.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::filter_design::design_band_pass;
use super::traits::AudioDynamics;
use super::types::BandConfig;
use crate::{AudioBuffer, EPS, MasteringError, MasteringResult, db_to_linear, ms_to_samples};

/// Largest value the soft clipper can emit: the last `f64` below 1.0.
pub const SOFT_CLIP_MAX: f64 = 1.0 - f64::EPSILON / 2.0;

/// Shortest limiter smoothing window in samples.
pub const MIN_LIMITER_WINDOW: usize = 10;

/// Fraction of the ceiling above which the limiter starts reducing gain.
pub const LIMITER_KNEE: f64 = 0.95;

/// A band the compressor could not build and left out of the sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedBand {
    /// The band as requested.
    pub band: BandConfig,
    /// Why the band-pass could not be designed.
    pub reason: String,
}

/// Result of [`AudioDynamics::multiband_compress`].
#[derive(Debug, Clone, PartialEq)]
pub struct MultibandOutput {
    /// Sum of the compressed bands.
    pub audio: AudioBuffer,
    /// Bands that were skipped, in request order.
    pub skipped_bands: Vec<SkippedBand>,
}

/// Centred moving average of `size` samples with nearest-edge padding.
///
/// For even sizes the window reaches one sample further to the left than to
/// the right. A size of 0 or 1 returns the input unchanged.
pub fn moving_average_nearest(values: &[f64], size: usize) -> Vec<f64> {
    let n = values.len();
    if size <= 1 || n == 0 {
        return values.to_vec();
    }
    let left = size / 2;
    let right = size - 1 - left;
    let (first, last) = (values[0], values[n - 1]);

    let padded = std::iter::repeat_n(first, left)
        .chain(values.iter().copied())
        .chain(std::iter::repeat_n(last, right));
    let mut prefix = Vec::with_capacity(n + size);
    prefix.push(0.0);
    let mut running = 0.0;
    for x in padded {
        running += x;
        prefix.push(running);
    }

    (0..n)
        .map(|i| (prefix[i + size] - prefix[i]) / size as f64)
        .collect()
}

/// Soft saturation of one sample above `threshold`.
///
/// `sign(x) * (t + tanh(2 (|x| - t)) * (1 - t))`, never reaching 1.0.
pub fn soft_clip_sample(x: f64, threshold: f64) -> f64 {
    let magnitude = x.abs();
    if magnitude <= threshold {
        return x;
    }
    let shaped = threshold + (2.0 * (magnitude - threshold)).tanh() * (1.0 - threshold);
    shaped.min(SOFT_CLIP_MAX).copysign(x)
}

/// Static compression gain for one envelope value.
fn compression_gain(envelope: f64, threshold: f64, ratio: f64) -> f64 {
    if envelope > threshold {
        (threshold / envelope).powf((ratio - 1.0) / ratio)
    } else {
        1.0
    }
}

fn compress_band(audio: &AudioBuffer, band: &BandConfig) -> MasteringResult<AudioBuffer> {
    let sample_rate = audio.sample_rate_hz();
    let filtered = design_band_pass(band.low_hz, band.high_hz, sample_rate)?.apply(audio)?;

    let attack = ms_to_samples(band.attack_ms, sample_rate).max(1);
    let release = ms_to_samples(band.release_ms, sample_rate).max(1);
    let threshold = db_to_linear(band.threshold_db);

    let envelope = moving_average_nearest(&filtered.frame_peaks(), attack);
    let gains: Vec<f64> = envelope
        .iter()
        .map(|&e| compression_gain(e, threshold, band.ratio))
        .collect();
    let gains = moving_average_nearest(&gains, release);

    debug!(
        low_hz = band.low_hz,
        high_hz = band.high_hz,
        min_gain = gains.iter().copied().fold(1.0_f64, f64::min),
        "band compressed"
    );
    filtered.apply_frame_gains(&gains)
}

impl AudioDynamics for AudioBuffer {
    fn multiband_compress(&self, bands: &[BandConfig]) -> MasteringResult<MultibandOutput> {
        self.ensure_not_empty("multiband_compress")?;
        for band in bands {
            band.validate()?;
        }

        let mut audio = self.zeros_like();
        let mut skipped_bands = Vec::new();
        for band in bands {
            match compress_band(self, band) {
                Ok(processed) => audio.accumulate(&processed)?,
                Err(err @ MasteringError::DegenerateBand { .. }) => {
                    let reason = err.to_string();
                    warn!(
                        low_hz = band.low_hz,
                        high_hz = band.high_hz,
                        reason = %reason,
                        "skipping multiband band"
                    );
                    skipped_bands.push(SkippedBand {
                        band: *band,
                        reason,
                    });
                }
                Err(err) => return Err(err),
            }
        }

        Ok(MultibandOutput {
            audio,
            skipped_bands,
        })
    }

    fn soft_clip(&self, threshold: f64) -> MasteringResult<AudioBuffer> {
        self.ensure_not_empty("soft_clip")?;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(MasteringError::invalid_parameter(
                "threshold",
                format!("soft clip threshold must be within (0, 1), got {threshold}"),
            ));
        }
        Ok(self.mapv(|x| soft_clip_sample(x, threshold)))
    }

    fn true_peak_limit(&self, ceiling_db: f64, release_ms: f64) -> MasteringResult<AudioBuffer> {
        self.ensure_not_empty("true_peak_limit")?;
        if !ceiling_db.is_finite() {
            return Err(MasteringError::invalid_parameter(
                "ceiling_db",
                "ceiling must be finite",
            ));
        }
        if !(release_ms >= 0.0) {
            return Err(MasteringError::invalid_parameter(
                "release_ms",
                "release must be non-negative",
            ));
        }

        let ceiling = db_to_linear(ceiling_db);
        let knee = LIMITER_KNEE * ceiling;
        let clipped = self.mapv(|x| x.clamp(-ceiling, ceiling));

        let window = ms_to_samples(release_ms, self.sample_rate_hz()).max(MIN_LIMITER_WINDOW);
        let envelope = moving_average_nearest(&clipped.frame_peaks(), window);
        let gains: Vec<f64> = envelope
            .iter()
            .map(|&e| if e > knee { knee / e.max(EPS) } else { 1.0 })
            .collect();

        let limited = clipped.apply_frame_gains(&gains)?;
        Ok(limited.mapv(|x| x.clamp(-ceiling, ceiling)))
    }
}
