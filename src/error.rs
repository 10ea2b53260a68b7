//! Error types and result utilities for mastering operations.

use thiserror::Error;

use crate::operations::types::FilterKind;

/// Convenience type alias for results that may contain a [`MasteringError`].
pub type MasteringResult<T> = Result<T, MasteringError>;

/// Errors that can occur while analysing or processing audio.
#[derive(Error, Debug)]
pub enum MasteringError {
    /// A primitive was given a buffer with no samples.
    ///
    /// Never recovered by returning 0 or NaN: an empty buffer has no level.
    #[error("{operation}: buffer is empty")]
    EmptyBuffer {
        /// Operation that rejected the buffer.
        operation: &'static str,
    },

    /// A filter specification cannot be turned into stable coefficients.
    ///
    /// Raised at design time, never when coefficients are applied.
    #[error(
        "invalid {kind:?} filter (frequency {frequency} Hz, Q {q}, sample rate {sample_rate} Hz): {reason}"
    )]
    InvalidFilterSpec {
        /// Filter family being designed.
        kind: FilterKind,
        /// Requested centre or cutoff frequency in Hz.
        frequency: f64,
        /// Requested quality factor, NaN when a shelf slope had no equivalent Q.
        q: f64,
        /// Sample rate the design targets.
        sample_rate: f64,
        /// Human readable reason.
        reason: String,
    },

    /// A band-pass range collapsed after normalisation to Nyquist.
    ///
    /// The dynamics processor recovers from this by skipping the band and
    /// reporting it in [`SkippedBand`](crate::operations::dynamics::SkippedBand).
    #[error("degenerate band {low_hz}..{high_hz} Hz: {reason}")]
    DegenerateBand {
        /// Requested lower edge in Hz.
        low_hz: f64,
        /// Requested upper edge in Hz.
        high_hz: f64,
        /// Human readable reason.
        reason: String,
    },

    /// A non-filter parameter is outside its valid range.
    #[error("invalid parameter `{parameter}`: {reason}")]
    InvalidParameter {
        /// Parameter name.
        parameter: &'static str,
        /// Human readable reason.
        reason: String,
    },

    /// Two buffers that must share a shape do not.
    #[error("channel layout mismatch: expected {expected}, got {actual}")]
    ChannelMismatch {
        /// Expected shape description.
        expected: String,
        /// Actual shape description.
        actual: String,
    },

    /// The oversampling resampler could not be built or failed while running.
    #[error("resampling failed: {0}")]
    Resampling(String),

    /// A mastering chain stage failed; the chain was aborted.
    #[error("mastering stage `{stage}` failed: {source}")]
    Stage {
        /// Stage that failed.
        stage: crate::operations::mastering::MasteringStage,
        /// Underlying cause.
        #[source]
        source: Box<MasteringError>,
    },
}

impl MasteringError {
    /// Build an [`MasteringError::InvalidParameter`].
    pub fn invalid_parameter(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter,
            reason: reason.into(),
        }
    }

    /// Build an [`MasteringError::InvalidFilterSpec`].
    pub fn invalid_filter(
        kind: FilterKind,
        frequency: f64,
        q: f64,
        sample_rate: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidFilterSpec {
            kind,
            frequency,
            q,
            sample_rate,
            reason: reason.into(),
        }
    }

    /// Wrap this error with the mastering stage that produced it.
    pub fn in_stage(self, stage: crate::operations::mastering::MasteringStage) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through any [`MasteringError::Stage`] wrappers.
    pub fn root_cause(&self) -> &MasteringError {
        match self {
            Self::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<rubato::ResamplerConstructionError> for MasteringError {
    fn from(err: rubato::ResamplerConstructionError) -> Self {
        Self::Resampling(err.to_string())
    }
}

impl From<rubato::ResampleError> for MasteringError {
    fn from(err: rubato::ResampleError) -> Self {
        Self::Resampling(err.to_string())
    }
}
