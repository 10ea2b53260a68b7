//! Transient detection on the analytic envelope.
//!
//! The mono mix is passed through a causal Butterworth high-pass to favour
//! attacks over sustained bass, and its Hilbert envelope is searched for
//! local maxima. A peak is kept when it reaches `mean + k * std` of the
//! envelope and no higher peak lies within the minimum spacing.

use rustfft::{FftPlanner, num_complex::Complex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::filter_design::design_high_pass;
use super::peak_picking::{local_maxima, select_by_distance};
use super::traits::AudioTransients;
use super::types::TransientConfig;
use crate::{AudioBuffer, MasteringResult, ms_to_samples};

/// One detected transient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transient {
    /// Position of the envelope peak in seconds from the start.
    pub time_seconds: f64,
    /// Envelope value at the peak (linear).
    pub strength: f64,
}

/// Magnitude of the analytic signal of `samples`, computed with one FFT pair.
pub fn analytic_envelope(samples: &[f64]) -> Vec<f64> {
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }
    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(n);
    let inverse = planner.plan_fft_inverse(n);

    let mut spectrum: Vec<Complex<f64>> =
        samples.iter().map(|&x| Complex::new(x, 0.0)).collect();
    forward.process(&mut spectrum);

    // DC and Nyquist once, positive bins twice, negative bins dropped
    let positive_end = n.div_ceil(2);
    for (k, bin) in spectrum.iter_mut().enumerate() {
        let weight = if k == 0 || (n % 2 == 0 && k == n / 2) {
            1.0
        } else if k < positive_end {
            2.0
        } else {
            0.0
        };
        *bin *= weight;
    }
    inverse.process(&mut spectrum);

    let scale = 1.0 / n as f64;
    spectrum.iter().map(|c| c.norm() * scale).collect()
}

fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

impl AudioTransients for AudioBuffer {
    fn detect_transients(&self, config: &TransientConfig) -> MasteringResult<Vec<Transient>> {
        config.validate()?;
        self.ensure_not_empty("detect_transients")?;
        let sample_rate = self.sample_rate_hz();

        let emphasis = design_high_pass(config.high_pass_hz, config.high_pass_order, sample_rate)?;
        let filtered = emphasis.filter_samples(&self.mono_mix().to_vec());
        let envelope = analytic_envelope(&filtered);

        let (mean, std) = mean_and_std(&envelope);
        let threshold = mean + config.threshold_std * std;
        let loud: Vec<usize> = local_maxima(&envelope)
            .into_iter()
            .filter(|&i| envelope[i] >= threshold)
            .collect();
        let spacing = ms_to_samples(config.min_spacing_ms, sample_rate);
        let kept = select_by_distance(&loud, &envelope, spacing);

        debug!(
            candidates = loud.len(),
            transients = kept.len(),
            threshold,
            "transient search finished"
        );
        Ok(kept
            .into_iter()
            .map(|i| Transient {
                time_seconds: i as f64 / sample_rate,
                strength: envelope[i],
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generation::silence;
    use ndarray::Array1;
    use std::f64::consts::PI;
    use std::time::Duration;

    fn bursts(onsets: &[f64], seconds: f64, sample_rate: u32) -> AudioBuffer {
        let rate = f64::from(sample_rate);
        let burst_len = (0.005 * rate) as usize;
        let mut samples = vec![0.0; (seconds * rate) as usize];
        for &onset in onsets {
            let start = (onset * rate) as usize;
            for i in 0..burst_len {
                samples[start + i] = 0.8 * (2.0 * PI * 1000.0 * i as f64 / rate).sin();
            }
        }
        AudioBuffer::new_mono(Array1::from(samples), sample_rate).unwrap()
    }

    #[test]
    fn test_envelope_of_periodic_sine_is_flat() {
        let samples: Vec<f64> = (0..480)
            .map(|i| 0.5 * (2.0 * PI * 10.0 * i as f64 / 480.0).sin())
            .collect();
        let envelope = analytic_envelope(&samples);
        assert_eq!(envelope.len(), samples.len());
        assert!(envelope.iter().all(|e| (e - 0.5).abs() < 1e-9));
        assert!(analytic_envelope(&[]).is_empty());
    }

    #[test]
    fn test_bursts_are_found_in_order() {
        let onsets = [0.25, 0.75, 1.25];
        let audio = bursts(&onsets, 1.5, 48_000);
        let found = audio.detect_transients(&TransientConfig::new()).unwrap();
        assert_eq!(found.len(), onsets.len());
        for (transient, onset) in found.iter().zip(onsets) {
            assert!(
                (transient.time_seconds - onset).abs() < 0.01,
                "{transient:?} vs {onset}"
            );
            assert!(transient.strength > 0.1);
        }
    }

    #[test]
    fn test_spacing_merges_close_bursts() {
        let audio = bursts(&[0.5, 0.55], 1.0, 48_000);
        let found = audio.detect_transients(&TransientConfig::new()).unwrap();
        assert_eq!(found.len(), 1);

        let mut tight = TransientConfig::new();
        tight.min_spacing_ms = 20.0;
        assert_eq!(audio.detect_transients(&tight).unwrap().len(), 2);
    }

    #[test]
    fn test_silence_and_bad_config() {
        let quiet = silence(Duration::from_millis(500), 48_000).unwrap();
        assert!(quiet.detect_transients(&TransientConfig::new()).unwrap().is_empty());

        let mut config = TransientConfig::new();
        config.min_spacing_ms = -1.0;
        assert!(quiet.detect_transients(&config).is_err());

        let mut config = TransientConfig::new();
        config.high_pass_hz = 30_000.0;
        assert!(quiet.detect_transients(&config).is_err());
    }
}
