//! Configuration types shared by the analysis and processing operations.
//!
//! All types here are plain data: they are built with `const fn`
//! constructors or presets, checked with `validate()` and turned
//! into coefficients or processing by the modules that consume them.

use serde::{Deserialize, Serialize};

use crate::operations::peak_picking::ResonanceRecord;
use crate::{MasteringError, MasteringResult, RIGHT};

/// Filter families the designer knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKind {
    /// Butterworth high-pass of a given order.
    HighPass,
    /// Peaking (bell) EQ.
    Peaking,
    /// High shelf EQ.
    HighShelf,
    /// Butterworth band-pass between two edges.
    BandPass,
}

/// An immutable filter request that maps to exactly one coefficient cascade.
///
/// Designing is done by [`FilterSpec::design`]; invalid requests fail there,
/// never when coefficients are applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum FilterSpec {
    /// Butterworth high-pass.
    HighPass {
        /// Cutoff frequency in Hz.
        cutoff_hz: f64,
        /// Filter order (number of poles), at least 1.
        order: usize,
    },
    /// Peaking EQ; identity when `|gain_db| < 0.1`.
    Peaking {
        /// Centre frequency in Hz.
        frequency_hz: f64,
        /// Gain in dB.
        gain_db: f64,
        /// Quality factor.
        q: f64,
    },
    /// High shelf EQ; identity when `|gain_db| < 0.1`.
    HighShelf {
        /// Corner frequency in Hz.
        frequency_hz: f64,
        /// Shelf gain in dB.
        gain_db: f64,
        /// Quality factor.
        q: f64,
    },
    /// 4-pole Butterworth band-pass used for multiband splitting.
    BandPass {
        /// Lower edge in Hz.
        low_hz: f64,
        /// Upper edge in Hz.
        high_hz: f64,
    },
}

impl FilterSpec {
    /// Butterworth high-pass request.
    pub const fn high_pass(cutoff_hz: f64, order: usize) -> Self {
        Self::HighPass { cutoff_hz, order }
    }

    /// Peaking EQ request.
    pub const fn peaking(frequency_hz: f64, gain_db: f64, q: f64) -> Self {
        Self::Peaking {
            frequency_hz,
            gain_db,
            q,
        }
    }

    /// High shelf request.
    pub const fn high_shelf(frequency_hz: f64, gain_db: f64, q: f64) -> Self {
        Self::HighShelf {
            frequency_hz,
            gain_db,
            q,
        }
    }

    /// Band-pass request.
    pub const fn band_pass(low_hz: f64, high_hz: f64) -> Self {
        Self::BandPass { low_hz, high_hz }
    }

    /// Filter family of this request.
    pub const fn kind(&self) -> FilterKind {
        match self {
            Self::HighPass { .. } => FilterKind::HighPass,
            Self::Peaking { .. } => FilterKind::Peaking,
            Self::HighShelf { .. } => FilterKind::HighShelf,
            Self::BandPass { .. } => FilterKind::BandPass,
        }
    }
}

/// One parametric EQ point: `{frequency, gain, Q}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqPoint {
    /// Centre frequency in Hz.
    pub frequency_hz: f64,
    /// Gain in dB (negative for cuts).
    pub gain_db: f64,
    /// Quality factor.
    pub q: f64,
}

impl EqPoint {
    /// Creates an EQ point.
    pub const fn new(frequency_hz: f64, gain_db: f64, q: f64) -> Self {
        Self {
            frequency_hz,
            gain_db,
            q,
        }
    }

    /// Suggests a corrective cut for a detected resonance.
    ///
    /// Narrower and deeper cuts are used for more prominent resonances:
    ///
    /// | prominence | Q | gain |
    /// |------------|---|------|
    /// | > 12 dB    | 4 | `-min(0.6 p, 8)` |
    /// | > 8 dB     | 3 | `-min(0.5 p, 6)` |
    /// | otherwise  | 2 | `-min(0.4 p, 4)` |
    pub fn cut_for_resonance(resonance: &ResonanceRecord) -> Self {
        let p = resonance.prominence_db;
        let (q, gain_db) = if p > 12.0 {
            (4.0, -(p * 0.6).min(8.0))
        } else if p > 8.0 {
            (3.0, -(p * 0.5).min(6.0))
        } else {
            (2.0, -(p * 0.4).min(4.0))
        };
        Self::new(resonance.frequency_hz, gain_db, q)
    }

    /// Peaking filter request for this point.
    pub const fn to_spec(&self) -> FilterSpec {
        FilterSpec::peaking(self.frequency_hz, self.gain_db, self.q)
    }
}

/// A high shelf expressed with the cookbook shelf slope `S` instead of Q.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShelfPoint {
    /// Corner frequency in Hz.
    pub frequency_hz: f64,
    /// Shelf gain in dB.
    pub gain_db: f64,
    /// Shelf slope `S` in `(0, 1]`; 1 is the steepest monotonic slope.
    pub slope: f64,
}

impl ShelfPoint {
    /// Creates a shelf point.
    pub const fn new(frequency_hz: f64, gain_db: f64, slope: f64) -> Self {
        Self {
            frequency_hz,
            gain_db,
            slope,
        }
    }

    /// The 10 kHz "air" shelf used by the mastering presets.
    pub const fn air() -> Self {
        Self::new(10_000.0, 2.0, 0.7)
    }

    /// High shelf request with the slope converted to Q.
    ///
    /// `sample_rate` is only carried into the error when the slope has no
    /// equivalent Q; the error's `q` is then NaN.
    pub fn to_spec(&self, sample_rate: f64) -> MasteringResult<FilterSpec> {
        let q = shelf_slope_to_q(self.gain_db, self.slope).ok_or_else(|| {
            MasteringError::invalid_filter(
                FilterKind::HighShelf,
                self.frequency_hz,
                f64::NAN,
                sample_rate,
                format!(
                    "shelf slope {} has no equivalent Q at {} dB",
                    self.slope, self.gain_db
                ),
            )
        })?;
        Ok(FilterSpec::high_shelf(self.frequency_hz, self.gain_db, q))
    }
}

/// Converts a cookbook shelf slope `S` to the equivalent Q.
///
/// `1/Q = sqrt((A + 1/A) * (1/S - 1) + 2)` with `A = 10^(gain_db/40)`.
/// Returns `None` when the slope is outside `(0, ∞)` or the radicand is not
/// positive.
pub fn shelf_slope_to_q(gain_db: f64, slope: f64) -> Option<f64> {
    if !(slope > 0.0) || !slope.is_finite() {
        return None;
    }
    let a = 10.0_f64.powf(gain_db / 40.0);
    let radicand = (a + 1.0 / a) * (1.0 / slope - 1.0) + 2.0;
    (radicand > 0.0).then(|| 1.0 / radicand.sqrt())
}

/// One band of the multiband compressor.
///
/// Bands may overlap or leave gaps; each is compressed independently and the
/// results are summed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandConfig {
    /// Lower edge in Hz. `<= 0` means "from DC".
    pub low_hz: f64,
    /// Upper edge in Hz. `>= nyquist` means "up to Nyquist".
    pub high_hz: f64,
    /// Compression threshold in dBFS.
    pub threshold_db: f64,
    /// Compression ratio, `>= 1`.
    pub ratio: f64,
    /// Envelope smoothing window in ms.
    pub attack_ms: f64,
    /// Gain smoothing window in ms.
    pub release_ms: f64,
}

impl BandConfig {
    /// Creates a band.
    pub const fn new(
        low_hz: f64,
        high_hz: f64,
        threshold_db: f64,
        ratio: f64,
        attack_ms: f64,
        release_ms: f64,
    ) -> Self {
        Self {
            low_hz,
            high_hz,
            threshold_db,
            ratio,
            attack_ms,
            release_ms,
        }
    }

    /// A single band covering the whole spectrum.
    ///
    /// The band's filter is a pass-through, so with a threshold above the
    /// signal peak the compressor returns its input unchanged.
    pub const fn full_spectrum(threshold_db: f64, ratio: f64) -> Self {
        Self::new(0.0, f64::INFINITY, threshold_db, ratio, 10.0, 100.0)
    }

    /// True when the band spans DC to Nyquist at `sample_rate`.
    pub fn covers_spectrum(&self, sample_rate: f64) -> bool {
        self.low_hz <= 0.0 && self.high_hz >= sample_rate / 2.0
    }

    /// Validates the dynamic parameters. Band edges are checked when the
    /// band-pass is designed, since a degenerate band is recoverable.
    pub fn validate(&self) -> MasteringResult<()> {
        if !(self.ratio >= 1.0) || !self.ratio.is_finite() {
            return Err(MasteringError::invalid_parameter(
                "ratio",
                format!("compression ratio must be >= 1, got {}", self.ratio),
            ));
        }
        if !self.threshold_db.is_finite() {
            return Err(MasteringError::invalid_parameter(
                "threshold_db",
                "threshold must be finite",
            ));
        }
        if !(self.attack_ms >= 0.0) || !(self.release_ms >= 0.0) {
            return Err(MasteringError::invalid_parameter(
                "attack_ms/release_ms",
                "time constants must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Gentle five-band table used for streaming masters.
pub const GENTLE_BANDS: [BandConfig; 5] = [
    BandConfig::new(20.0, 120.0, -20.0, 2.0, 20.0, 120.0),
    BandConfig::new(120.0, 500.0, -18.0, 1.8, 15.0, 100.0),
    BandConfig::new(500.0, 2000.0, -16.0, 1.5, 10.0, 80.0),
    BandConfig::new(2000.0, 8000.0, -14.0, 1.5, 5.0, 60.0),
    BandConfig::new(8000.0, 20000.0, -12.0, 1.5, 3.0, 50.0),
];

/// Aggressive five-band table used for club masters.
pub const AGGRESSIVE_BANDS: [BandConfig; 5] = [
    BandConfig::new(20.0, 120.0, -18.0, 3.0, 15.0, 100.0),
    BandConfig::new(120.0, 500.0, -15.0, 2.5, 10.0, 80.0),
    BandConfig::new(500.0, 2000.0, -12.0, 3.0, 5.0, 60.0),
    BandConfig::new(2000.0, 8000.0, -10.0, 2.0, 3.0, 40.0),
    BandConfig::new(8000.0, 20000.0, -8.0, 2.0, 1.0, 30.0),
];

/// Corrective cuts of the reference master.
pub const REFERENCE_CORRECTIVE_EQ: [EqPoint; 6] = [
    EqPoint::new(146.0, -3.5, 3.0),
    EqPoint::new(350.0, -2.0, 1.5),
    EqPoint::new(1693.0, -3.0, 3.0),
    EqPoint::new(2244.0, -2.5, 3.0),
    EqPoint::new(3545.0, -2.0, 2.5),
    EqPoint::new(7916.0, -1.5, 2.0),
];

/// Enhancement boosts of the reference master.
pub const REFERENCE_ENHANCEMENT_EQ: [EqPoint; 2] =
    [EqPoint::new(40.0, 1.0, 0.7), EqPoint::new(3000.0, 1.5, 1.2)];

/// Welch spectrum parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumConfig {
    /// Segment length in samples.
    pub window_size: usize,
    /// Overlap between segments in samples.
    pub overlap: usize,
    /// Optional Gaussian smoothing of the dB spectrum, sigma in bins.
    pub smoothing_sigma: Option<f64>,
}

impl SpectrumConfig {
    /// 8192-sample Hann segments with 50% overlap, no smoothing.
    pub const fn new() -> Self {
        Self {
            window_size: 8192,
            overlap: 4096,
            smoothing_sigma: None,
        }
    }

    /// Same as [`SpectrumConfig::new`] with a 10-bin Gaussian smoothing pass.
    pub const fn smoothed() -> Self {
        Self {
            window_size: 8192,
            overlap: 4096,
            smoothing_sigma: Some(10.0),
        }
    }

    /// Validates the segment geometry.
    pub fn validate(&self) -> MasteringResult<()> {
        if self.window_size < 2 {
            return Err(MasteringError::invalid_parameter(
                "window_size",
                format!("window must hold at least 2 samples, got {}", self.window_size),
            ));
        }
        if self.overlap >= self.window_size {
            return Err(MasteringError::invalid_parameter(
                "overlap",
                format!(
                    "overlap {} must be smaller than window {}",
                    self.overlap, self.window_size
                ),
            ));
        }
        if let Some(sigma) = self.smoothing_sigma {
            if !(sigma > 0.0) || !sigma.is_finite() {
                return Err(MasteringError::invalid_parameter(
                    "smoothing_sigma",
                    "sigma must be positive and finite",
                ));
            }
        }
        Ok(())
    }
}

impl Default for SpectrumConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Peak/dip search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakSearchConfig {
    /// Prominence in dB a peak must exceed to be reported.
    pub min_prominence_db: f64,
    /// Minimum distance between reported peaks, in bins.
    pub min_distance_bins: usize,
    /// Peaks at or below this frequency are dropped.
    pub min_frequency_hz: f64,
    /// Peaks at or above this frequency are dropped.
    pub max_frequency_hz: f64,
}

impl PeakSearchConfig {
    /// 6 dB prominence, 20 bins apart, audible band.
    pub const fn new() -> Self {
        Self {
            min_prominence_db: 6.0,
            min_distance_bins: 20,
            min_frequency_hz: 20.0,
            max_frequency_hz: 20_000.0,
        }
    }

    /// Validates the thresholds.
    pub fn validate(&self) -> MasteringResult<()> {
        if !(self.min_prominence_db >= 0.0) {
            return Err(MasteringError::invalid_parameter(
                "min_prominence_db",
                "prominence threshold must be non-negative",
            ));
        }
        if !(self.min_frequency_hz < self.max_frequency_hz) {
            return Err(MasteringError::invalid_parameter(
                "min_frequency_hz",
                format!(
                    "search band {}..{} Hz is empty",
                    self.min_frequency_hz, self.max_frequency_hz
                ),
            ));
        }
        Ok(())
    }
}

impl Default for PeakSearchConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Transient search on the analytic envelope of the high-passed mono mix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransientConfig {
    /// Cutoff of the causal Butterworth emphasis filter in Hz.
    pub high_pass_hz: f64,
    /// Order of the emphasis filter.
    pub high_pass_order: usize,
    /// Envelope peaks must reach `mean + threshold_std * std`.
    pub threshold_std: f64,
    /// Minimum time between reported transients in milliseconds.
    pub min_spacing_ms: f64,
}

impl TransientConfig {
    /// 4th-order 80 Hz emphasis, 1.5 standard deviations, 100 ms apart.
    pub const fn new() -> Self {
        Self {
            high_pass_hz: 80.0,
            high_pass_order: 4,
            threshold_std: 1.5,
            min_spacing_ms: 100.0,
        }
    }

    /// Validates the threshold and spacing. The filter is checked when designed.
    pub fn validate(&self) -> MasteringResult<()> {
        if !self.threshold_std.is_finite() {
            return Err(MasteringError::invalid_parameter(
                "threshold_std",
                "threshold must be finite",
            ));
        }
        if !(self.min_spacing_ms >= 0.0) || !self.min_spacing_ms.is_finite() {
            return Err(MasteringError::invalid_parameter(
                "min_spacing_ms",
                format!("spacing must be non-negative, got {}", self.min_spacing_ms),
            ));
        }
        Ok(())
    }
}

impl Default for TransientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Loudness and ceiling a master is rendered to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MasteringTarget {
    /// Integrated loudness target (ungated LUFS approximation).
    pub target_lufs: f64,
    /// True-peak ceiling in dBFS.
    pub ceiling_db: f64,
    /// Selects the aggressive band table and tighter soft clip.
    pub aggressive: bool,
}

impl MasteringTarget {
    /// Creates a target.
    pub const fn new(target_lufs: f64, ceiling_db: f64, aggressive: bool) -> Self {
        Self {
            target_lufs,
            ceiling_db,
            aggressive,
        }
    }

    /// −14 LUFS, −1.0 dBTP.
    pub const fn streaming() -> Self {
        Self::new(-14.0, -1.0, false)
    }

    /// −9 LUFS, −0.5 dBTP, aggressive.
    pub const fn club() -> Self {
        Self::new(-9.0, -0.5, true)
    }

    /// Validates the target levels.
    pub fn validate(&self) -> MasteringResult<()> {
        if !self.target_lufs.is_finite() {
            return Err(MasteringError::invalid_parameter(
                "target_lufs",
                "loudness target must be finite",
            ));
        }
        if !self.ceiling_db.is_finite() || self.ceiling_db > 0.0 {
            return Err(MasteringError::invalid_parameter(
                "ceiling_db",
                format!("ceiling must be finite and <= 0 dBFS, got {}", self.ceiling_db),
            ));
        }
        Ok(())
    }
}

/// Wet share of the parallel compression blend.
pub const DEFAULT_PARALLEL_MIX: f64 = 0.6;

/// Everything the mastering chain needs for one render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteringConfig {
    /// Loudness target and ceiling.
    pub target: MasteringTarget,
    /// Static trim applied to `balance_channel`, in dB.
    pub stereo_balance_trim_db: f64,
    /// Channel receiving the balance trim.
    pub balance_channel: usize,
    /// Zero-phase high-pass cutoff in Hz.
    pub high_pass_hz: f64,
    /// Zero-phase high-pass order.
    pub high_pass_order: usize,
    /// Corrective cuts, applied in order.
    pub corrective_eq: Vec<EqPoint>,
    /// Enhancement boosts, applied in order.
    pub enhancement_eq: Vec<EqPoint>,
    /// Optional high shelf applied after the enhancement boosts.
    pub air_shelf: Option<ShelfPoint>,
    /// Multiband compressor bands.
    pub bands: Vec<BandConfig>,
    /// Wet share of the parallel compression blend, in `[0, 1]`.
    pub parallel_mix: f64,
    /// Flat gain applied after compression, in dB.
    pub pre_gain_db: f64,
    /// Soft clip threshold in `(0, 1)`.
    pub soft_clip_threshold: f64,
    /// Limiter envelope smoothing in ms.
    pub limiter_release_ms: f64,
}

impl MasteringConfig {
    /// Reference chain for a target; the band table and soft clip follow
    /// `target.aggressive`.
    pub fn for_target(target: MasteringTarget) -> Self {
        let (bands, soft_clip_threshold) = if target.aggressive {
            (AGGRESSIVE_BANDS.to_vec(), 0.92)
        } else {
            (GENTLE_BANDS.to_vec(), 0.95)
        };
        Self {
            target,
            stereo_balance_trim_db: 0.42,
            balance_channel: RIGHT,
            high_pass_hz: 25.0,
            high_pass_order: 4,
            corrective_eq: REFERENCE_CORRECTIVE_EQ.to_vec(),
            enhancement_eq: REFERENCE_ENHANCEMENT_EQ.to_vec(),
            air_shelf: Some(ShelfPoint::air()),
            bands,
            parallel_mix: DEFAULT_PARALLEL_MIX,
            pre_gain_db: 0.0,
            soft_clip_threshold,
            limiter_release_ms: 100.0,
        }
    }

    /// Streaming master: −14 LUFS, −1.0 dBTP, gentle bands.
    pub fn streaming() -> Self {
        Self::for_target(MasteringTarget::streaming())
    }

    /// Club master: −9 LUFS, −0.5 dBTP, aggressive bands.
    pub fn club() -> Self {
        Self::for_target(MasteringTarget::club())
    }

    /// A chain that only changes level: no EQ, no balance trim, one
    /// full-spectrum band that never compresses and no pre-gain.
    pub fn transparent(target: MasteringTarget) -> Self {
        Self {
            target,
            stereo_balance_trim_db: 0.0,
            balance_channel: RIGHT,
            high_pass_hz: 25.0,
            high_pass_order: 4,
            corrective_eq: Vec::new(),
            enhancement_eq: Vec::new(),
            air_shelf: None,
            bands: vec![BandConfig::full_spectrum(0.0, 2.0)],
            parallel_mix: DEFAULT_PARALLEL_MIX,
            pre_gain_db: 0.0,
            soft_clip_threshold: 0.95,
            limiter_release_ms: 100.0,
        }
    }

    /// Validates every non-filter parameter. Filter parameters are checked
    /// when the chain designs them, so the error names the failing stage.
    pub fn validate(&self) -> MasteringResult<()> {
        self.target.validate()?;
        if !(0.0..=1.0).contains(&self.parallel_mix) {
            return Err(MasteringError::invalid_parameter(
                "parallel_mix",
                format!("wet mix must be within [0, 1], got {}", self.parallel_mix),
            ));
        }
        if !(self.soft_clip_threshold > 0.0 && self.soft_clip_threshold < 1.0) {
            return Err(MasteringError::invalid_parameter(
                "soft_clip_threshold",
                format!(
                    "threshold must be within (0, 1), got {}",
                    self.soft_clip_threshold
                ),
            ));
        }
        if !self.stereo_balance_trim_db.is_finite() || !self.pre_gain_db.is_finite() {
            return Err(MasteringError::invalid_parameter(
                "gain",
                "trim and pre-gain must be finite",
            ));
        }
        if !(self.limiter_release_ms >= 0.0) {
            return Err(MasteringError::invalid_parameter(
                "limiter_release_ms",
                "release must be non-negative",
            ));
        }
        for band in &self.bands {
            band.validate()?;
        }
        Ok(())
    }
}

impl Default for MasteringConfig {
    fn default() -> Self {
        Self::streaming()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_follow_target() {
        let streaming = MasteringConfig::streaming();
        assert_eq!(streaming.bands, GENTLE_BANDS.to_vec());
        assert_eq!(streaming.target.target_lufs, -14.0);
        assert_eq!(streaming.soft_clip_threshold, 0.95);

        let club = MasteringConfig::club();
        assert_eq!(club.bands, AGGRESSIVE_BANDS.to_vec());
        assert_eq!(club.target.ceiling_db, -0.5);
        assert_eq!(club.soft_clip_threshold, 0.92);

        assert!(streaming.validate().is_ok());
        assert!(club.validate().is_ok());
    }

    #[test]
    fn test_cut_for_resonance_table() {
        let record = |p| ResonanceRecord {
            frequency_hz: 1000.0,
            level_db: -30.0,
            prominence_db: p,
        };
        assert_eq!(
            EqPoint::cut_for_resonance(&record(20.0)),
            EqPoint::new(1000.0, -8.0, 4.0)
        );
        assert_eq!(
            EqPoint::cut_for_resonance(&record(10.0)),
            EqPoint::new(1000.0, -5.0, 3.0)
        );
        let gentle = EqPoint::cut_for_resonance(&record(7.0));
        assert_eq!(gentle.q, 2.0);
        assert!((gentle.gain_db + 2.8).abs() < 1e-12);
    }

    #[test]
    fn test_shelf_slope_to_q() {
        // S = 1 gives the Butterworth-like Q of 1/sqrt(2)
        let q = shelf_slope_to_q(6.0, 1.0).unwrap();
        assert!((q - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-12);
        assert!(shelf_slope_to_q(6.0, 0.0).is_none());
        assert!(ShelfPoint::air().to_spec(48_000.0).is_ok());
    }

    #[test]
    fn test_unrealisable_shelf_reports_design_context() {
        let err = ShelfPoint::new(10_000.0, 6.0, 0.0)
            .to_spec(44_100.0)
            .unwrap_err();
        match err {
            MasteringError::InvalidFilterSpec {
                kind,
                frequency,
                q,
                sample_rate,
                reason,
            } => {
                assert_eq!(kind, FilterKind::HighShelf);
                assert_eq!(frequency, 10_000.0);
                assert!(q.is_nan());
                assert_eq!(sample_rate, 44_100.0);
                assert!(reason.contains("slope 0"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = MasteringConfig::streaming();
        config.soft_clip_threshold = 1.0;
        assert!(config.validate().is_err());

        let mut config = MasteringConfig::streaming();
        config.parallel_mix = 1.5;
        assert!(config.validate().is_err());

        assert!(BandConfig::new(20.0, 100.0, -10.0, 0.5, 5.0, 50.0)
            .validate()
            .is_err());
        let bad_window = SpectrumConfig {
            window_size: 1024,
            overlap: 1024,
            smoothing_sigma: None,
        };
        assert!(bad_window.validate().is_err());
    }

    #[test]
    fn test_full_spectrum_band() {
        let band = BandConfig::full_spectrum(0.0, 2.0);
        assert!(band.covers_spectrum(48_000.0));
        assert!(!GENTLE_BANDS[0].covers_spectrum(48_000.0));
    }
}
