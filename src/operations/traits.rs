//! Core trait definitions for audio analysis and processing operations.
//!
//! Each trait covers one component of the mastering toolkit and is
//! implemented for [`AudioBuffer`] in the module of the same name. Processing
//! methods never mutate `self`; they return a new buffer with the same
//! channel count, length and sample rate.

use super::dynamics::MultibandOutput;
use super::spectrum::{ResonanceAnalysis, Spectrum};
use super::statistics::{ShortTermLevels, StereoBalance};
use super::transients::Transient;
use super::types::{
    BandConfig, EqPoint, FilterSpec, PeakSearchConfig, SpectrumConfig, TransientConfig,
};
use crate::{AudioBuffer, MasteringResult};

/// Level measurements on whole buffers.
///
/// Every measurement rejects empty buffers with
/// [`MasteringError::EmptyBuffer`](crate::MasteringError::EmptyBuffer).
pub trait AudioStatistics {
    /// Computes the Root Mean Square (RMS) over all samples of all channels.
    fn rms(&self) -> MasteringResult<f64>;

    /// Returns the peak (maximum absolute value) over all channels.
    fn peak(&self) -> MasteringResult<f64>;

    /// RMS of each channel in order.
    fn channel_rms(&self) -> MasteringResult<Vec<f64>>;

    /// Peak-to-RMS ratio in dB: `20 log10(peak) - 20 log10(rms)`.
    ///
    /// Both levels go through the epsilon floor, so silence reports 0 dB.
    fn crest_factor_db(&self) -> MasteringResult<f64>;

    /// Left/right balance, correlation and width of a buffer with at least
    /// two channels. Mono buffers return `None`.
    fn stereo_balance(&self) -> MasteringResult<Option<StereoBalance>>;

    /// Non-overlapping block RMS profile of the mono mixdown.
    ///
    /// Returns `None` when the buffer is shorter than one block.
    fn short_term_levels(&self, block_seconds: f64) -> MasteringResult<Option<ShortTermLevels>>;
}

/// Filtering with designed coefficient cascades.
pub trait AudioFiltering {
    /// Designs `spec` at this buffer's sample rate and applies it causally.
    fn apply_filter(&self, spec: &FilterSpec) -> MasteringResult<AudioBuffer>;

    /// Designs `spec` and applies it forward and backward (zero phase).
    fn apply_filter_zero_phase(&self, spec: &FilterSpec) -> MasteringResult<AudioBuffer>;

    /// Applies a list of peaking EQ points in order.
    fn apply_eq(&self, points: &[EqPoint]) -> MasteringResult<AudioBuffer>;
}

/// Loudness and true-peak metering.
pub trait AudioLoudness {
    /// Ungated integrated loudness in LUFS.
    ///
    /// Each channel is K-weighted, its mean square taken, the channel mean
    /// squares are summed and `-0.691 + 10 log10(sum)` is returned. There is
    /// no block gating, so silence and quiet passages lower the result.
    fn integrated_loudness(&self) -> MasteringResult<f64>;

    /// Maximum absolute sample after 4x band-limited oversampling, in dBFS.
    fn true_peak_db(&self) -> MasteringResult<f64>;

    /// Scales the buffer so its integrated loudness equals `target_lufs`.
    ///
    /// Returns the scaled buffer and the gain applied in dB. No clipping
    /// protection is applied.
    fn gain_to_target(&self, target_lufs: f64) -> MasteringResult<(AudioBuffer, f64)>;
}

/// Averaged spectra and resonance detection.
pub trait AudioSpectrum {
    /// Welch power spectral density of the mono mixdown, in dB.
    ///
    /// A buffer shorter than one window yields an empty spectrum.
    fn averaged_spectrum(&self, config: &SpectrumConfig) -> MasteringResult<Spectrum>;

    /// Averaged spectrum, optional smoothing, then resonance and dip search.
    fn analyze_resonances(
        &self,
        spectrum: &SpectrumConfig,
        search: &PeakSearchConfig,
    ) -> MasteringResult<ResonanceAnalysis>;
}

/// Multiband compression, soft clipping and limiting.
pub trait AudioDynamics {
    /// Splits into bands, compresses each independently and sums them.
    ///
    /// Bands whose band-pass collapses are skipped and listed in the output.
    fn multiband_compress(&self, bands: &[BandConfig]) -> MasteringResult<MultibandOutput>;

    /// Smoothly saturates samples above `threshold`; output stays below 1.0.
    fn soft_clip(&self, threshold: f64) -> MasteringResult<AudioBuffer>;

    /// Limits so that no sample exceeds `ceiling_db`.
    fn true_peak_limit(&self, ceiling_db: f64, release_ms: f64) -> MasteringResult<AudioBuffer>;
}

/// Transient detection for structure analysis.
pub trait AudioTransients {
    /// Envelope peaks of the high-passed mono mix, in time order.
    ///
    /// Silence and signals without a clear attack yield an empty list.
    fn detect_transients(&self, config: &TransientConfig) -> MasteringResult<Vec<Transient>>;
}
