//! Utility functions for audio processing.
//!
//! # Modules
//!
//! - [`audio_math`] - dB/linear conversions with the shared epsilon floor
//! - [`generation`] - deterministic test-signal generation

pub mod audio_math;
pub mod generation;

pub use audio_math::*;
pub use generation::*;
