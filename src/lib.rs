// Correctness and logic
#![warn(clippy::unit_cmp)] // Detects comparing unit types
#![warn(clippy::match_same_arms)] // Duplicate match arms

// Performance-focused
#![warn(clippy::inefficient_to_string)] // `format!("{}", x)` vs `x.to_string()`
#![warn(clippy::map_clone)] // Cloning inside `map()` unnecessarily
#![warn(clippy::unnecessary_to_owned)] // Detects redundant `.to_owned()` or `.clone()`
#![warn(clippy::large_stack_arrays)] // Helps avoid stack overflows
#![warn(clippy::needless_collect)] // Avoids `.collect().iter()` chains

// Style and idiomatic Rust
#![warn(clippy::redundant_clone)] // Detects unnecessary `.clone()`
#![warn(clippy::needless_return)] // Avoids `return` at the end of functions
#![warn(clippy::manual_map)] // Use `.map()` instead of manual `match`
#![cfg_attr(not(test), warn(clippy::unwrap_used))] // Avoids using `unwrap()`

// Maintainability
#![warn(clippy::missing_panics_doc)] // Docs for functions that might panic
#![warn(clippy::missing_const_for_fn)] // Suggests making eligible functions `const`
#![deny(missing_docs)] // Documentation is a must for release

//! # AudioMastering
//!
//! A DSP mastering toolkit for Rust: filter design, loudness and true-peak
//! metering, resonance detection, multiband dynamics and a fixed mastering
//! chain that renders a buffer to a loudness target under a peak ceiling.
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! audio_mastering = "0.1.0"
//! ```
//!
//! Enable `parallel-processing` to render several masters of one source on
//! the rayon thread pool:
//!
//! ```toml
//! [dependencies]
//! audio_mastering = { version = "0.1.0", features = ["parallel-processing"] }
//! ```
//!
//! ## Components
//!
//! - **Signal primitives** ([`utils::audio_math`], [`AudioStatistics`]): dB
//!   conversions with an epsilon floor, RMS, peak, crest factor.
//! - **Filter designer** ([`operations::filter_design`]): peaking, high
//!   shelf, Butterworth high-pass and band-pass as biquad cascades.
//! - **Loudness meter** ([`AudioLoudness`]): ungated K-weighted loudness and
//!   4x oversampled true peak.
//! - **Resonance detector** ([`AudioSpectrum`], [`operations::peak_picking`]):
//!   Welch spectra and prominence-ranked peak and dip search.
//! - **Dynamics processor** ([`AudioDynamics`]): multiband compression, soft
//!   clipping and ceiling limiting.
//! - **Transient detection** ([`AudioTransients`]): attack positions from the
//!   Hilbert envelope of the high-passed mix.
//! - **Mastering chain** ([`operations::mastering`]): the nine-stage chain.
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`MasteringResult`]. Errors raised inside
//! the chain are wrapped with the stage that produced them:
//!
//! ```rust
//! use audio_mastering::operations::mastering::master;
//! use audio_mastering::{MasteringConfig, MasteringError, sine_wave};
//! use std::time::Duration;
//!
//! let audio = sine_wave(440.0, Duration::from_millis(200), 48_000, 0.1).unwrap();
//! let mut config = MasteringConfig::streaming();
//! config.high_pass_hz = 40_000.0;
//!
//! match master(&audio, &config) {
//!     Err(MasteringError::Stage { stage, source }) => {
//!         eprintln!("stage {stage} failed: {source}");
//!     }
//!     other => panic!("expected a stage error, got {other:?}"),
//! }
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use audio_mastering::operations::mastering::master;
//! use audio_mastering::{AudioLoudness, MasteringConfig, chirp};
//! use std::time::Duration;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let audio = chirp(20.0, 20_000.0, Duration::from_secs(2), 48_000, 0.1)?;
//! println!("input: {:.1} LUFS", audio.integrated_loudness()?);
//!
//! let output = master(&audio, &MasteringConfig::streaming())?;
//! println!(
//!     "output: {:.1} LUFS, {:.2} dBTP",
//!     output.output_loudness, output.output_true_peak_db
//! );
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`] events and spans but never installs a
//! subscriber. Each chain run opens a `mastering_chain` span; skipped
//! multiband bands are reported at `WARN`.
//!
//! ## License
//!
//! MIT License

mod error;
mod repr;

pub mod conversions;
pub mod operations;
pub mod utils;

pub use crate::error::{MasteringError, MasteringResult};
pub use crate::repr::{AudioBuffer, AudioData};

pub use crate::operations::{
    AudioDynamics, AudioFiltering, AudioLoudness, AudioSpectrum, AudioStatistics, AudioTransients,
    BandConfig, EqPoint, FilterSpec, MasteringConfig, MasteringTarget, PeakSearchConfig,
    ShelfPoint, SpectrumConfig, TransientConfig,
};
pub use crate::utils::{
    audio_math::{
        AMPLITUDE_FLOOR_DB, EPS, POWER_FLOOR_DB, db_to_linear, linear_to_amplitude_db,
        ms_to_samples, power_to_db,
    },
    generation::{
        ToneComponent, chirp, compound_tone, impulse, silence, sine_wave, stereo_sine_wave,
    },
};

/// Left channel index.
pub const LEFT: usize = 0;
/// Right channel index.
pub const RIGHT: usize = 1;
