//! Audio analysis and mastering operations.
//!
//! Every component is a trait implemented for [`AudioBuffer`](crate::AudioBuffer),
//! backed by free functions for callers that work on raw slices or designed
//! coefficients.
//!
//! ## Module Organization
//!
//! - [`traits`] - Core trait definitions
//! - [`types`] - Filter requests, band tables and chain configuration
//! - [`statistics`] - RMS, peak, crest factor, stereo field and short-term levels
//! - [`biquad`] - Coefficient cascades, causal and zero-phase application
//! - [`filter_design`] - Peaking, shelf, high-pass and band-pass design
//! - [`loudness`] - K-weighted loudness and oversampled true peak
//! - [`spectrum`] - Welch averaged spectra, smoothing and band levels
//! - [`peak_picking`] - Resonance and dip search
//! - [`dynamics`] - Multiband compression, soft clipping and limiting
//! - [`mastering`] - The fixed mastering chain
//!
//! ## Quick Start
//!
//! ```rust
//! use audio_mastering::operations::*;
//! use audio_mastering::sine_wave;
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let audio = sine_wave(1000.0, Duration::from_secs(1), 48_000, 0.5)?;
//!
//! let loudness = audio.integrated_loudness()?;
//! let cut = audio.apply_eq(&[EqPoint::new(1000.0, -3.0, 2.0)])?;
//! let limited = cut.true_peak_limit(-1.0, 100.0)?;
//! assert!(limited.peak()? <= audio_mastering::db_to_linear(-1.0));
//! # let _ = loudness;
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

pub mod traits;
pub mod types;

pub mod biquad;
pub mod dynamics;
pub mod filter_design;
pub mod loudness;
pub mod mastering;
pub mod peak_picking;
pub mod spectrum;
pub mod statistics;
pub mod transients;

pub use traits::{
    AudioDynamics, AudioFiltering, AudioLoudness, AudioSpectrum, AudioStatistics, AudioTransients,
};

pub use biquad::{BiquadCoefficients, BiquadState, CascadeProcessor, FilterCascade};
pub use dynamics::{MultibandOutput, SkippedBand};
pub use mastering::{MasteringOutput, MasteringStage, STAGE_ORDER, master, master_many};
pub use peak_picking::{ResonanceRecord, find_dips, find_resonances};
pub use spectrum::{BandLevel, NamedBand, ResonanceAnalysis, Spectrum, standard_bands};
pub use statistics::{ShortTermLevels, StereoBalance};
pub use transients::{Transient, analytic_envelope};
pub use types::{
    AGGRESSIVE_BANDS, BandConfig, DEFAULT_PARALLEL_MIX, EqPoint, FilterKind, FilterSpec,
    GENTLE_BANDS, MasteringConfig, MasteringTarget, PeakSearchConfig,
    REFERENCE_CORRECTIVE_EQ, REFERENCE_ENHANCEMENT_EQ, ShelfPoint, SpectrumConfig, TransientConfig,
};
