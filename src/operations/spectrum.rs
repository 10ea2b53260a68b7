//! Averaged power spectra for resonance analysis.
//!
//! [`AudioSpectrum::averaged_spectrum`] estimates the power spectral density
//! of the mono mixdown with Welch's method:
//!
//! 1. Split the signal into segments of `window_size` samples, `overlap`
//!    samples apart from the previous segment's start.
//! 2. Remove each segment's mean and apply a periodic Hann window.
//! 3. FFT each segment and keep `|X(k)|^2` for `k = 0..=N/2`.
//! 4. Scale to a density (`1 / (fs * sum(w^2))`), double every bin that has
//!    a negative-frequency twin, and average over segments.
//! 5. Convert to dB with `10 log10(p + EPS)`.
//!
//! Averaging many short periodograms trades time detail for a far lower
//! per-bin variance, which keeps the peak search from chasing noise.

use rustfft::{FftPlanner, num_complex::Complex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::peak_picking::{ResonanceRecord, find_dips, find_resonances};
use super::traits::AudioSpectrum;
use super::types::{PeakSearchConfig, SpectrumConfig};
use crate::{AudioBuffer, MasteringError, MasteringResult, power_to_db};

/// A one-sided spectrum in dB with linearly spaced bins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    /// Bin centre frequencies in Hz, starting at DC.
    pub frequencies: Vec<f64>,
    /// Level of each bin in dB.
    pub levels_db: Vec<f64>,
    /// Bin spacing in Hz (`sample_rate / window_size`).
    pub resolution_hz: f64,
}

/// Summary of a spectrum restricted to one frequency band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandLevel {
    /// Mean of the bin levels in the band, in dB.
    pub average_db: f64,
    /// Highest bin level in the band, in dB.
    pub peak_db: f64,
    /// Frequency of the highest bin.
    pub peak_frequency_hz: f64,
    /// Lowest bin level in the band, in dB.
    pub min_db: f64,
    /// `peak_db - min_db`.
    pub spread_db: f64,
}

/// A named analysis band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NamedBand {
    /// Short identifier such as `"low_mids"`.
    pub name: &'static str,
    /// Lower edge in Hz (inclusive).
    pub low_hz: f64,
    /// Upper edge in Hz (inclusive).
    pub high_hz: f64,
}

const STANDARD_BANDS: [NamedBand; 7] = [
    NamedBand { name: "sub_bass", low_hz: 20.0, high_hz: 60.0 },
    NamedBand { name: "bass", low_hz: 60.0, high_hz: 250.0 },
    NamedBand { name: "low_mids", low_hz: 250.0, high_hz: 500.0 },
    NamedBand { name: "mids", low_hz: 500.0, high_hz: 2000.0 },
    NamedBand { name: "high_mids", low_hz: 2000.0, high_hz: 4000.0 },
    NamedBand { name: "presence", low_hz: 4000.0, high_hz: 6000.0 },
    NamedBand { name: "brilliance", low_hz: 6000.0, high_hz: 20000.0 },
];

/// The seven reference bands from sub-bass to brilliance.
pub const fn standard_bands() -> &'static [NamedBand] {
    &STANDARD_BANDS
}

impl Spectrum {
    /// A spectrum with no bins.
    pub const fn empty(resolution_hz: f64) -> Self {
        Self {
            frequencies: Vec::new(),
            levels_db: Vec::new(),
            resolution_hz,
        }
    }

    /// True when the spectrum has no bins.
    pub fn is_empty(&self) -> bool {
        self.levels_db.is_empty()
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.levels_db.len()
    }

    /// Copy with the levels Gaussian-smoothed across bins.
    pub fn smoothed(&self, sigma_bins: f64) -> MasteringResult<Self> {
        Ok(Self {
            frequencies: self.frequencies.clone(),
            levels_db: gaussian_smooth(&self.levels_db, sigma_bins)?,
            resolution_hz: self.resolution_hz,
        })
    }

    /// Level summary of the bins in `[low_hz, high_hz]`.
    ///
    /// Returns `None` when no bin falls in the band.
    pub fn band_level(&self, low_hz: f64, high_hz: f64) -> Option<BandLevel> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min_db = f64::INFINITY;
        let mut peak: Option<(f64, f64)> = None;
        for (&f, &level) in self.frequencies.iter().zip(&self.levels_db) {
            if f < low_hz || f > high_hz {
                continue;
            }
            count += 1;
            sum += level;
            min_db = min_db.min(level);
            if peak.is_none_or(|(_, best)| level > best) {
                peak = Some((f, level));
            }
        }
        peak.map(|(peak_frequency_hz, peak_db)| BandLevel {
            average_db: sum / count as f64,
            peak_db,
            peak_frequency_hz,
            min_db,
            spread_db: peak_db - min_db,
        })
    }
}

/// Spectrum plus the resonances and dips found in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResonanceAnalysis {
    /// The spectrum that was searched (smoothed if requested).
    pub spectrum: Spectrum,
    /// Peaks, most prominent first.
    pub resonances: Vec<ResonanceRecord>,
    /// Notches, deepest first.
    pub dips: Vec<ResonanceRecord>,
}

impl ResonanceAnalysis {
    fn empty(spectrum: Spectrum) -> Self {
        Self {
            spectrum,
            resonances: Vec::new(),
            dips: Vec::new(),
        }
    }
}

fn periodic_hann(size: usize) -> Vec<f64> {
    let n = size as f64;
    (0..size)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / n).cos())
        .collect()
}

/// Welch power spectral density of `samples`, linear power per Hz.
fn welch_density(samples: &[f64], sample_rate: f64, window_size: usize, overlap: usize) -> Vec<f64> {
    let window = periodic_hann(window_size);
    let window_power: f64 = window.iter().map(|w| w * w).sum();
    let scale = 1.0 / (sample_rate * window_power);
    let step = window_size - overlap;
    let bins = window_size / 2 + 1;

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(window_size);
    let mut frame = vec![Complex::new(0.0, 0.0); window_size];
    let mut accumulated = vec![0.0; bins];
    let mut segments = 0usize;

    let mut start = 0;
    while start + window_size <= samples.len() {
        let segment = &samples[start..start + window_size];
        let mean = segment.iter().sum::<f64>() / window_size as f64;
        for ((slot, &x), &w) in frame.iter_mut().zip(segment).zip(&window) {
            *slot = Complex::new((x - mean) * w, 0.0);
        }
        fft.process(&mut frame);
        for (acc, value) in accumulated.iter_mut().zip(&frame) {
            *acc += value.norm_sqr();
        }
        segments += 1;
        start += step;
    }

    // Bins with a negative-frequency twin carry both halves of the power
    let last_doubled = if window_size % 2 == 0 { bins - 1 } else { bins };
    let segments = segments.max(1) as f64;
    accumulated
        .iter()
        .enumerate()
        .map(|(k, &p)| {
            let one_sided = if k > 0 && k < last_doubled { 2.0 } else { 1.0 };
            p * scale * one_sided / segments
        })
        .collect()
}

/// Reflect (`d c b a | a b c d | d c b a`) an out-of-range index into `0..n`.
fn reflect_index(i: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = i.rem_euclid(period);
    if m < n as isize {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

/// Gaussian smoothing with reflected edges, truncated at four sigma.
pub fn gaussian_smooth(values: &[f64], sigma: f64) -> MasteringResult<Vec<f64>> {
    if !(sigma > 0.0) || !sigma.is_finite() {
        return Err(MasteringError::invalid_parameter(
            "sigma",
            format!("Gaussian sigma must be positive and finite, got {sigma}"),
        ));
    }
    let n = values.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let radius = (4.0 * sigma + 0.5) as isize;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= total);

    Ok((0..n as isize)
        .map(|i| {
            kernel
                .iter()
                .zip(-radius..=radius)
                .map(|(k, offset)| k * values[reflect_index(i + offset, n)])
                .sum()
        })
        .collect())
}

impl AudioSpectrum for AudioBuffer {
    fn averaged_spectrum(&self, config: &SpectrumConfig) -> MasteringResult<Spectrum> {
        config.validate()?;
        self.ensure_not_empty("averaged_spectrum")?;
        let sample_rate = self.sample_rate_hz();
        let resolution_hz = sample_rate / config.window_size as f64;

        let mono = self.mono_mix();
        if mono.len() < config.window_size {
            debug!(
                samples = mono.len(),
                window_size = config.window_size,
                "buffer shorter than one analysis window, spectrum is empty"
            );
            return Ok(Spectrum::empty(resolution_hz));
        }

        let samples = mono.to_vec();
        let density = welch_density(&samples, sample_rate, config.window_size, config.overlap);
        let frequencies = (0..density.len())
            .map(|k| k as f64 * resolution_hz)
            .collect();
        let levels_db = density.into_iter().map(power_to_db).collect();

        Ok(Spectrum {
            frequencies,
            levels_db,
            resolution_hz,
        })
    }

    fn analyze_resonances(
        &self,
        spectrum: &SpectrumConfig,
        search: &PeakSearchConfig,
    ) -> MasteringResult<ResonanceAnalysis> {
        search.validate()?;
        let mut averaged = self.averaged_spectrum(spectrum)?;
        if averaged.is_empty() {
            return Ok(ResonanceAnalysis::empty(averaged));
        }
        if let Some(sigma) = spectrum.smoothing_sigma {
            averaged = averaged.smoothed(sigma)?;
        }

        let resonances = find_resonances(&averaged.frequencies, &averaged.levels_db, search)?;
        let dips = find_dips(&averaged.frequencies, &averaged.levels_db, search)?;
        debug!(
            resonances = resonances.len(),
            dips = dips.len(),
            "resonance analysis complete"
        );
        Ok(ResonanceAnalysis {
            spectrum: averaged,
            resonances,
            dips,
        })
    }
}
