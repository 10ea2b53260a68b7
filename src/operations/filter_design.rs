//! Filter Designer: RBJ cookbook biquads, Butterworth high-pass and band-pass.
//!
//! Every design function validates its parameters up front and returns
//! [`MasteringError::InvalidFilterSpec`] when they cannot produce a stable
//! filter; coefficients that come out of this module are always safe to
//! apply.
//!
//! Peaking and shelf gains are converted with `A = 10^(gain_db / 40)`, and
//! both are the identity when `|gain_db| < 0.1` because the closed-form
//! coefficients are ill-conditioned as `A -> 1`.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use num_complex::Complex;

use super::biquad::{BiquadCoefficients, FilterCascade};
use super::traits::AudioFiltering;
use super::types::{EqPoint, FilterKind, FilterSpec};
use crate::{AudioBuffer, MasteringError, MasteringResult};

/// Peaking and shelf gains below this magnitude (dB) design to the identity.
pub const MIN_EQ_GAIN_DB: f64 = 0.1;

/// Lower clamp for normalised band-pass edges (fraction of Nyquist).
pub const BAND_EDGE_MIN: f64 = 0.001;

/// Upper clamp for normalised band-pass edges (fraction of Nyquist).
pub const BAND_EDGE_MAX: f64 = 0.999;

fn validate(kind: FilterKind, frequency: f64, q: f64, sample_rate: f64) -> MasteringResult<()> {
    let fail = |reason: String| -> MasteringResult<()> {
        Err(MasteringError::invalid_filter(
            kind,
            frequency,
            q,
            sample_rate,
            reason,
        ))
    };
    if !(sample_rate > 0.0) || !sample_rate.is_finite() {
        return fail("sample rate must be positive".to_string());
    }
    let nyquist = sample_rate / 2.0;
    if !(frequency > 0.0 && frequency < nyquist) {
        return fail(format!("frequency must be within (0, {nyquist}) Hz"));
    }
    if !(q > 0.0) || !q.is_finite() {
        return fail("Q must be positive and finite".to_string());
    }
    Ok(())
}

fn validate_gain(
    kind: FilterKind,
    frequency: f64,
    gain_db: f64,
    q: f64,
    sample_rate: f64,
) -> MasteringResult<()> {
    if gain_db.is_finite() {
        Ok(())
    } else {
        Err(MasteringError::invalid_filter(
            kind,
            frequency,
            q,
            sample_rate,
            format!("gain {gain_db} dB is not finite"),
        ))
    }
}

/// Design a peak/notch filter using the RBJ (Robert Bristow-Johnson) cookbook formulas.
///
/// Returns [`BiquadCoefficients::IDENTITY`] when `|gain_db| < 0.1`.
pub fn design_peaking(
    frequency: f64,
    gain_db: f64,
    q: f64,
    sample_rate: f64,
) -> MasteringResult<BiquadCoefficients> {
    validate(FilterKind::Peaking, frequency, q, sample_rate)?;
    validate_gain(FilterKind::Peaking, frequency, gain_db, q, sample_rate)?;
    if gain_db.abs() < MIN_EQ_GAIN_DB {
        return Ok(BiquadCoefficients::IDENTITY);
    }

    let a = 10.0_f64.powf(gain_db / 40.0);
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = omega.cos();
    let alpha = omega.sin() / (2.0 * q);

    BiquadCoefficients::from_raw(
        [1.0 + alpha * a, -2.0 * cos_omega, 1.0 - alpha * a],
        [1.0 + alpha / a, -2.0 * cos_omega, 1.0 - alpha / a],
    )
}

/// Design a high shelf filter using the RBJ cookbook formulas.
///
/// Returns [`BiquadCoefficients::IDENTITY`] when `|gain_db| < 0.1`. Use
/// [`shelf_slope_to_q`](super::types::shelf_slope_to_q) to design from a
/// shelf slope.
pub fn design_high_shelf(
    frequency: f64,
    gain_db: f64,
    q: f64,
    sample_rate: f64,
) -> MasteringResult<BiquadCoefficients> {
    validate(FilterKind::HighShelf, frequency, q, sample_rate)?;
    validate_gain(FilterKind::HighShelf, frequency, gain_db, q, sample_rate)?;
    if gain_db.abs() < MIN_EQ_GAIN_DB {
        return Ok(BiquadCoefficients::IDENTITY);
    }

    let a = 10.0_f64.powf(gain_db / 40.0);
    let omega = 2.0 * PI * frequency / sample_rate;
    let cos_omega = omega.cos();
    let alpha = omega.sin() / (2.0 * q);
    let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

    BiquadCoefficients::from_raw(
        [
            a * ((a + 1.0) + (a - 1.0) * cos_omega + two_sqrt_a_alpha),
            -2.0 * a * ((a - 1.0) + (a + 1.0) * cos_omega),
            a * ((a + 1.0) + (a - 1.0) * cos_omega - two_sqrt_a_alpha),
        ],
        [
            (a + 1.0) - (a - 1.0) * cos_omega + two_sqrt_a_alpha,
            2.0 * ((a - 1.0) - (a + 1.0) * cos_omega),
            (a + 1.0) - (a - 1.0) * cos_omega - two_sqrt_a_alpha,
        ],
    )
}

fn rbj_high_pass(cutoff: f64, q: f64, sample_rate: f64) -> MasteringResult<BiquadCoefficients> {
    let omega = 2.0 * PI * cutoff / sample_rate;
    let cos_omega = omega.cos();
    let alpha = omega.sin() / (2.0 * q);
    BiquadCoefficients::from_raw(
        [(1.0 + cos_omega) / 2.0, -(1.0 + cos_omega), (1.0 + cos_omega) / 2.0],
        [1.0 + alpha, -2.0 * cos_omega, 1.0 - alpha],
    )
}

fn first_order_high_pass(cutoff: f64, sample_rate: f64) -> MasteringResult<BiquadCoefficients> {
    let k = (PI * cutoff / sample_rate).tan();
    let norm = 1.0 / (1.0 + k);
    BiquadCoefficients::from_raw([norm, -norm, 0.0], [1.0, (k - 1.0) * norm, 0.0])
}

/// Design a Butterworth high-pass of the given order as cascaded sections.
///
/// Each conjugate pole pair becomes one RBJ high-pass section with
/// `Q_k = 1 / (2 sin(π(2k+1) / 2N))`; odd orders get one extra first-order
/// section. The result matches the bilinear-transformed analogue prototype
/// with the cutoff prewarped.
pub fn design_high_pass(
    cutoff: f64,
    order: usize,
    sample_rate: f64,
) -> MasteringResult<FilterCascade> {
    validate(FilterKind::HighPass, cutoff, FRAC_1_SQRT_2, sample_rate)?;
    if order == 0 {
        return Err(MasteringError::invalid_filter(
            FilterKind::HighPass,
            cutoff,
            0.0,
            sample_rate,
            "order must be at least 1",
        ));
    }

    let mut sections = Vec::with_capacity(order.div_ceil(2));
    for k in 0..order / 2 {
        let angle = PI * (2 * k + 1) as f64 / (2 * order) as f64;
        let q = 1.0 / (2.0 * angle.sin());
        sections.push(rbj_high_pass(cutoff, q, sample_rate)?);
    }
    if order % 2 == 1 {
        sections.push(first_order_high_pass(cutoff, sample_rate)?);
    }
    Ok(FilterCascade::new(sections))
}

/// Design the 4-pole Butterworth band-pass used to split multiband bands.
///
/// Edges are normalised to Nyquist and clamped to
/// `[BAND_EDGE_MIN, BAND_EDGE_MAX]`. A band spanning DC to Nyquist
/// designs to the identity cascade. A band whose clamped edges no longer
/// satisfy `low < high` is reported as [`MasteringError::DegenerateBand`].
pub fn design_band_pass(
    low_hz: f64,
    high_hz: f64,
    sample_rate: f64,
) -> MasteringResult<FilterCascade> {
    if !(sample_rate > 0.0) || !sample_rate.is_finite() {
        return Err(MasteringError::invalid_filter(
            FilterKind::BandPass,
            low_hz,
            0.0,
            sample_rate,
            "sample rate must be positive",
        ));
    }
    let nyquist = sample_rate / 2.0;
    if low_hz <= 0.0 && high_hz >= nyquist {
        return Ok(FilterCascade::identity());
    }

    let degenerate = |reason: String| MasteringError::DegenerateBand {
        low_hz,
        high_hz,
        reason,
    };
    if low_hz.is_nan() || high_hz.is_nan() {
        return Err(degenerate("band edge is NaN".to_string()));
    }
    let low_n = (low_hz / nyquist).max(BAND_EDGE_MIN);
    let high_n = (high_hz / nyquist).min(BAND_EDGE_MAX);
    if low_n >= high_n {
        return Err(degenerate(format!(
            "normalised edges {low_n:.4}..{high_n:.4} collapse"
        )));
    }

    // Prewarped analogue edges with fs = 2 (frequencies as fractions of Nyquist)
    let fs2 = 4.0;
    let warped_low = fs2 * (PI * low_n / 2.0).tan();
    let warped_high = fs2 * (PI * high_n / 2.0).tan();
    let bandwidth = warped_high - warped_low;
    let w0_sq = warped_low * warped_high;

    // Second-order Butterworth prototype pole, low-pass to band-pass
    let prototype = Complex::new(-FRAC_1_SQRT_2, FRAC_1_SQRT_2);
    let scaled = prototype * (bandwidth / 2.0);
    let root = (scaled * scaled - w0_sq).sqrt();
    let analogue_poles = [scaled + root, scaled - root];

    // Analogue zeros at s = 0 map to z = 1, the excess to z = -1
    let mut gain = bandwidth * bandwidth * fs2 * fs2;
    let mut sections = Vec::with_capacity(2);
    for s in analogue_poles {
        gain /= (fs2 - s).norm_sqr();
        let z = (fs2 + s) / (fs2 - s);
        sections.push([1.0, -2.0 * z.re, z.norm_sqr()]);
    }

    let mut cascade = Vec::with_capacity(2);
    for (i, a) in sections.into_iter().enumerate() {
        let k = if i == 0 { gain } else { 1.0 };
        cascade.push(BiquadCoefficients::from_raw([k, 0.0, -k], a)?);
    }
    Ok(FilterCascade::new(cascade))
}

impl FilterSpec {
    /// Designs the coefficient cascade for this request at `sample_rate`.
    pub fn design(&self, sample_rate: f64) -> MasteringResult<FilterCascade> {
        match *self {
            Self::HighPass { cutoff_hz, order } => design_high_pass(cutoff_hz, order, sample_rate),
            Self::Peaking {
                frequency_hz,
                gain_db,
                q,
            } => design_peaking(frequency_hz, gain_db, q, sample_rate).map(single_or_identity),
            Self::HighShelf {
                frequency_hz,
                gain_db,
                q,
            } => design_high_shelf(frequency_hz, gain_db, q, sample_rate).map(single_or_identity),
            Self::BandPass { low_hz, high_hz } => design_band_pass(low_hz, high_hz, sample_rate),
        }
    }
}

fn single_or_identity(section: BiquadCoefficients) -> FilterCascade {
    if section == BiquadCoefficients::IDENTITY {
        FilterCascade::identity()
    } else {
        FilterCascade::single(section)
    }
}

/// Designs one cascade for a list of EQ points applied in order.
pub fn design_eq(points: &[EqPoint], sample_rate: f64) -> MasteringResult<FilterCascade> {
    let mut cascade = FilterCascade::identity();
    for point in points {
        cascade.extend(&point.to_spec().design(sample_rate)?);
    }
    Ok(cascade)
}

impl AudioFiltering for AudioBuffer {
    fn apply_filter(&self, spec: &FilterSpec) -> MasteringResult<AudioBuffer> {
        spec.design(self.sample_rate_hz())?.apply(self)
    }

    fn apply_filter_zero_phase(&self, spec: &FilterSpec) -> MasteringResult<AudioBuffer> {
        spec.design(self.sample_rate_hz())?.apply_zero_phase(self)
    }

    fn apply_eq(&self, points: &[EqPoint]) -> MasteringResult<AudioBuffer> {
        design_eq(points, self.sample_rate_hz())?.apply(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generation::sine_wave;
    use std::time::Duration;

    const SR: f64 = 48_000.0;

    #[test]
    fn test_peaking_gain_at_centre() {
        let cascade = FilterCascade::single(design_peaking(1000.0, 6.0, 1.0, SR).unwrap());
        assert!((cascade.magnitude_db_at(1000.0, SR) - 6.0).abs() < 1e-6);
        assert!(cascade.magnitude_db_at(20.0, SR).abs() < 0.1);

        let cut = FilterCascade::single(design_peaking(1000.0, -3.5, 3.0, SR).unwrap());
        assert!((cut.magnitude_db_at(1000.0, SR) + 3.5).abs() < 1e-6);
    }

    #[test]
    fn test_peaking_below_threshold_is_identity() {
        for gain in [0.05, -0.05, 0.0, 0.099] {
            let c = design_peaking(2000.0, gain, 2.0, SR).unwrap();
            assert_eq!(c, BiquadCoefficients::IDENTITY);
        }
        assert_ne!(
            design_peaking(2000.0, 0.1, 2.0, SR).unwrap(),
            BiquadCoefficients::IDENTITY
        );
    }

    #[test]
    fn test_invalid_specs_fail_at_design() {
        assert!(matches!(
            design_peaking(24_000.0, 3.0, 1.0, SR),
            Err(MasteringError::InvalidFilterSpec { .. })
        ));
        assert!(design_peaking(1000.0, 3.0, 0.0, SR).is_err());
        assert!(design_peaking(1000.0, 3.0, 1.0, -SR).is_err());
        assert!(design_high_shelf(0.0, 3.0, 1.0, SR).is_err());
        assert!(design_high_pass(25.0, 0, SR).is_err());
        assert!(design_high_pass(30_000.0, 4, SR).is_err());
    }

    #[test]
    fn test_high_shelf_plateau() {
        let cascade = FilterCascade::single(design_high_shelf(10_000.0, 2.0, 0.7, SR).unwrap());
        assert!((cascade.magnitude_db_at(20_000.0, SR) - 2.0).abs() < 0.3);
        assert!(cascade.magnitude_db_at(100.0, SR).abs() < 0.01);
        // Half the shelf gain at the corner
        assert!((cascade.magnitude_db_at(10_000.0, SR) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_butterworth_high_pass_response() {
        for order in [1, 2, 3, 4] {
            let cascade = design_high_pass(100.0, order, SR).unwrap();
            assert_eq!(cascade.sections().len(), order.div_ceil(2));
            assert!(cascade.is_stable());
            // -3 dB at cutoff for every Butterworth order
            assert!((cascade.magnitude_db_at(100.0, SR) + 3.0103).abs() < 0.01);
            assert!(cascade.magnitude_db_at(5_000.0, SR).abs() < 0.01);
        }
        let fourth = design_high_pass(100.0, 4, SR).unwrap();
        // 24 dB/octave below cutoff
        assert!(fourth.magnitude_db_at(25.0, SR) < -45.0);
    }

    #[test]
    fn test_band_pass_shape() {
        let cascade = design_band_pass(500.0, 2000.0, SR).unwrap();
        assert_eq!(cascade.sections().len(), 2);
        assert!(cascade.is_stable());
        let centre = (500.0_f64 * 2000.0).sqrt();
        assert!(cascade.magnitude_db_at(centre, SR).abs() < 0.1);
        assert!((cascade.magnitude_db_at(500.0, SR) + 3.0103).abs() < 0.1);
        assert!((cascade.magnitude_db_at(2000.0, SR) + 3.0103).abs() < 0.1);
        assert!(cascade.magnitude_db_at(50.0, SR) < -30.0);
        assert!(cascade.magnitude_db_at(15_000.0, SR) < -25.0);
    }

    #[test]
    fn test_band_pass_degenerate_and_full() {
        assert!(matches!(
            design_band_pass(30_000.0, 40_000.0, SR),
            Err(MasteringError::DegenerateBand { .. })
        ));
        assert!(matches!(
            design_band_pass(2000.0, 1000.0, SR),
            Err(MasteringError::DegenerateBand { .. })
        ));
        assert!(design_band_pass(0.0, f64::INFINITY, SR).unwrap().is_identity());
        // Clamped but still valid
        assert!(design_band_pass(8000.0, 30_000.0, SR).is_ok());
    }

    #[test]
    fn test_filter_spec_design_dispatch() {
        assert!(FilterSpec::peaking(1000.0, 0.05, 1.0).design(SR).unwrap().is_identity());
        assert_eq!(
            FilterSpec::high_pass(25.0, 4).design(SR).unwrap().sections().len(),
            2
        );
        assert_eq!(FilterSpec::band_pass(20.0, 120.0).kind(), FilterKind::BandPass);
    }

    #[test]
    fn test_zero_phase_high_pass_removes_dc_and_keeps_tone() {
        let tone = sine_wave(1000.0, Duration::from_millis(200), 48_000, 0.5).unwrap();
        let offset = tone.mapv(|x| x + 0.2);
        let filtered = offset
            .apply_filter_zero_phase(&FilterSpec::high_pass(25.0, 4))
            .unwrap();
        let out = filtered.as_mono().unwrap();
        let reference = tone.as_mono().unwrap();
        // Zero phase: the tone passes in place, the offset is gone mid-buffer
        for i in 4000..5000 {
            assert!((out[i] - reference[i]).abs() < 0.02);
        }
    }

    #[test]
    fn test_apply_eq_preserves_shape() {
        let stereo = crate::utils::generation::stereo_sine_wave(
            440.0,
            Duration::from_millis(50),
            48_000,
            0.5,
            0.25,
        )
        .unwrap();
        let points = [EqPoint::new(146.0, -3.5, 3.0), EqPoint::new(3000.0, 1.5, 1.2)];
        let out = stereo.apply_eq(&points).unwrap();
        assert_eq!(out.num_channels(), 2);
        assert_eq!(out.samples_per_channel(), stereo.samples_per_channel());
        assert_eq!(out.sample_rate(), 48_000);
    }
}
