//! Level and time conversions shared by every analysis and processing stage.
//!
//! All logarithmic conversions floor their input at [`EPS`] so silence maps to
//! a finite level instead of `-inf` or NaN. Min/max reductions over levels
//! rely on that floor, so new code taking a logarithm of a level must go
//! through these helpers.

/// Smallest linear amplitude or power treated as non-zero.
pub const EPS: f64 = 1e-10;

/// Level returned by [`linear_to_amplitude_db`] for silence (`20 * log10(EPS)`).
pub const AMPLITUDE_FLOOR_DB: f64 = -200.0;

/// Level returned by [`power_to_db`] for silence (`10 * log10(EPS)`).
pub const POWER_FLOOR_DB: f64 = -100.0;

/// Converts decibels to a linear amplitude factor: `10^(db / 20)`.
///
/// # Examples
///
/// ```rust
/// use audio_mastering::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 1e-12);
/// assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-12);
/// ```
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Converts a linear amplitude to decibels: `20 * log10(max(amplitude, EPS))`.
///
/// Zero, negative and NaN inputs all return [`AMPLITUDE_FLOOR_DB`].
///
/// # Examples
///
/// ```rust
/// use audio_mastering::{linear_to_amplitude_db, AMPLITUDE_FLOOR_DB};
///
/// assert!((linear_to_amplitude_db(0.1) + 20.0).abs() < 1e-12);
/// assert_eq!(linear_to_amplitude_db(0.0), AMPLITUDE_FLOOR_DB);
/// ```
pub fn linear_to_amplitude_db(amplitude: f64) -> f64 {
    20.0 * amplitude.max(EPS).log10()
}

/// Converts a power (mean-square) value to decibels: `10 * log10(power + EPS)`.
///
/// Uses the additive floor the spectral estimators have always used, so a
/// spectrum of pure silence sits at [`POWER_FLOOR_DB`].
pub fn power_to_db(power: f64) -> f64 {
    if power.is_nan() {
        return POWER_FLOOR_DB;
    }
    10.0 * (power.max(0.0) + EPS).log10()
}

/// Converts a duration in milliseconds to a whole number of samples (truncating).
pub fn ms_to_samples(ms: f64, sample_rate: f64) -> usize {
    let samples = ms * sample_rate / 1000.0;
    if samples.is_finite() && samples > 0.0 {
        samples as usize
    } else {
        0
    }
}
