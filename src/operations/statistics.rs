//! Level statistics for AudioBuffer.
//!
//! This module implements the [`AudioStatistics`] trait: RMS, peak and crest
//! factor for any channel layout, plus stereo-field and short-term level
//! analysis. Every level in dB goes through the shared epsilon floor.

use ndarray::{ArrayView1, Axis};
use serde::{Deserialize, Serialize};

use super::traits::AudioStatistics;
use crate::{AudioBuffer, EPS, MasteringError, MasteringResult, linear_to_amplitude_db};

/// Stereo field measurements of the first two channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StereoBalance {
    /// Left channel RMS in dB.
    pub left_rms_db: f64,
    /// Right channel RMS in dB.
    pub right_rms_db: f64,
    /// `|left_rms_db - right_rms_db|`.
    pub rms_difference_db: f64,
    /// Left channel peak in dB.
    pub left_peak_db: f64,
    /// Right channel peak in dB.
    pub right_peak_db: f64,
    /// Pearson correlation of left and right; 0 when either is constant.
    pub correlation: f64,
    /// `side_rms / (mid_rms + EPS)`.
    pub stereo_width: f64,
    /// RMS of `(L + R) / 2` in dB.
    pub mid_rms_db: f64,
    /// RMS of `(L - R) / 2` in dB.
    pub side_rms_db: f64,
}

/// Block RMS profile of a buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortTermLevels {
    /// RMS of each full block, in dB.
    pub block_levels_db: Vec<f64>,
    /// Mean of `block_levels_db`.
    pub mean_db: f64,
    /// Population standard deviation of `block_levels_db`.
    pub std_db: f64,
    /// Sample peak of the mono mixdown in dB.
    pub peak_db: f64,
    /// `peak_db - mean_db`.
    pub dynamic_range_db: f64,
}

/// `sqrt(mean(x^2))` of a non-empty slice view.
pub(crate) fn rms_of(samples: ArrayView1<'_, f64>) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|x| x * x).sum::<f64>() / samples.len() as f64).sqrt()
}

pub(crate) fn peak_of(samples: ArrayView1<'_, f64>) -> f64 {
    samples.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
}

fn correlation(left: ArrayView1<'_, f64>, right: ArrayView1<'_, f64>) -> f64 {
    let n = left.len() as f64;
    let mean_l = left.sum() / n;
    let mean_r = right.sum() / n;
    let (mut cov, mut var_l, mut var_r) = (0.0, 0.0, 0.0);
    for (&l, &r) in left.iter().zip(right.iter()) {
        let dl = l - mean_l;
        let dr = r - mean_r;
        cov += dl * dr;
        var_l += dl * dl;
        var_r += dr * dr;
    }
    let denominator = (var_l * var_r).sqrt();
    if denominator > 0.0 {
        (cov / denominator).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

impl AudioStatistics for AudioBuffer {
    fn rms(&self) -> MasteringResult<f64> {
        self.ensure_not_empty("rms")?;
        let view = self.planar_view();
        let sum_sq: f64 = view.iter().map(|x| x * x).sum();
        Ok((sum_sq / view.len() as f64).sqrt())
    }

    fn peak(&self) -> MasteringResult<f64> {
        self.ensure_not_empty("peak")?;
        Ok(self
            .planar_view()
            .iter()
            .fold(0.0_f64, |acc, x| acc.max(x.abs())))
    }

    fn channel_rms(&self) -> MasteringResult<Vec<f64>> {
        self.ensure_not_empty("channel_rms")?;
        Ok(self.channels().map(rms_of).collect())
    }

    fn crest_factor_db(&self) -> MasteringResult<f64> {
        Ok(linear_to_amplitude_db(self.peak()?) - linear_to_amplitude_db(self.rms()?))
    }

    fn stereo_balance(&self) -> MasteringResult<Option<StereoBalance>> {
        self.ensure_not_empty("stereo_balance")?;
        let (Some(left), Some(right)) = (self.channel(0), self.channel(1)) else {
            return Ok(None);
        };

        let left_rms_db = linear_to_amplitude_db(rms_of(left));
        let right_rms_db = linear_to_amplitude_db(rms_of(right));
        let mid = (&left + &right) / 2.0;
        let side = (&left - &right) / 2.0;
        let mid_rms = rms_of(mid.view());
        let side_rms = rms_of(side.view());

        Ok(Some(StereoBalance {
            left_rms_db,
            right_rms_db,
            rms_difference_db: (left_rms_db - right_rms_db).abs(),
            left_peak_db: linear_to_amplitude_db(peak_of(left)),
            right_peak_db: linear_to_amplitude_db(peak_of(right)),
            correlation: correlation(left, right),
            stereo_width: side_rms / (mid_rms + EPS),
            mid_rms_db: linear_to_amplitude_db(mid_rms),
            side_rms_db: linear_to_amplitude_db(side_rms),
        }))
    }

    fn short_term_levels(&self, block_seconds: f64) -> MasteringResult<Option<ShortTermLevels>> {
        self.ensure_not_empty("short_term_levels")?;
        if !(block_seconds > 0.0) || !block_seconds.is_finite() {
            return Err(MasteringError::invalid_parameter(
                "block_seconds",
                format!("block length must be positive, got {block_seconds}"),
            ));
        }
        let block = (block_seconds * self.sample_rate_hz()) as usize;
        let mono = self.mono_mix();
        if block == 0 || mono.len() < block {
            return Ok(None);
        }

        let block_levels_db: Vec<f64> = mono
            .axis_chunks_iter(Axis(0), block)
            .filter(|chunk| chunk.len() == block)
            .map(|chunk| linear_to_amplitude_db(rms_of(chunk)))
            .collect();
        let n = block_levels_db.len() as f64;
        let mean_db = block_levels_db.iter().sum::<f64>() / n;
        let std_db =
            (block_levels_db.iter().map(|l| (l - mean_db).powi(2)).sum::<f64>() / n).sqrt();
        let peak_db = linear_to_amplitude_db(peak_of(mono.view()));

        Ok(Some(ShortTermLevels {
            block_levels_db,
            mean_db,
            std_db,
            peak_db,
            dynamic_range_db: peak_db - mean_db,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generation::{sine_wave, stereo_sine_wave};
    use ndarray::{Array1, array};
    use std::time::Duration;

    #[test]
    fn test_rms_and_peak_of_sine() {
        let audio = sine_wave(1000.0, Duration::from_secs(1), 48_000, 1.0).unwrap();
        let rms = audio.rms().unwrap();
        assert!((rms - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-3);
        assert!((audio.peak().unwrap() - 1.0).abs() < 1e-3);
        assert!((audio.crest_factor_db().unwrap() - 3.0103).abs() < 0.01);
    }

    #[test]
    fn test_empty_buffer_is_an_error() {
        let empty = AudioBuffer::new_mono(Array1::zeros(0), 48_000).unwrap();
        assert!(matches!(
            empty.rms(),
            Err(MasteringError::EmptyBuffer { operation: "rms" })
        ));
        assert!(empty.peak().is_err());
        assert!(empty.crest_factor_db().is_err());
    }

    #[test]
    fn test_silence_crest_factor_is_finite() {
        let silent = AudioBuffer::new_mono(Array1::zeros(64), 48_000).unwrap();
        assert_eq!(silent.crest_factor_db().unwrap(), 0.0);
    }

    #[test]
    fn test_stereo_balance_of_scaled_channels() {
        let audio =
            stereo_sine_wave(440.0, Duration::from_millis(500), 48_000, 1.0, 0.5).unwrap();
        let balance = audio.stereo_balance().unwrap().unwrap();
        assert!((balance.rms_difference_db - 6.0206).abs() < 0.01);
        assert!((balance.correlation - 1.0).abs() < 1e-9);
        // side / mid = 0.25 / 0.75
        assert!((balance.stereo_width - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_stereo_balance_mono_is_none() {
        let mono = AudioBuffer::new_mono(array![0.1, -0.1], 48_000).unwrap();
        assert!(mono.stereo_balance().unwrap().is_none());
    }

    #[test]
    fn test_short_term_levels() {
        let audio = sine_wave(125.0, Duration::from_secs(2), 1_000, 0.5).unwrap();
        let levels = audio.short_term_levels(0.4).unwrap().unwrap();
        assert_eq!(levels.block_levels_db.len(), 5);
        assert!(levels.std_db < 0.01);
        // Sine peak-to-RMS
        assert!((levels.dynamic_range_db - 3.0103).abs() < 0.05);
        assert!(audio.short_term_levels(5.0).unwrap().is_none());
        assert!(audio.short_term_levels(0.0).is_err());
    }
}
