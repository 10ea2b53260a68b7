//! The mastering chain.
//!
//! A master is rendered by running nine stages in a fixed order, each taking
//! the previous stage's complete output:
//!
//! | # | Stage | Operation |
//! |---|-------|-----------|
//! | 1 | [`MasteringStage::StereoBalance`] | static trim on one channel |
//! | 2 | [`MasteringStage::HighPass`] | zero-phase Butterworth high-pass |
//! | 3 | [`MasteringStage::CorrectiveEq`] | corrective peaking cuts |
//! | 4 | [`MasteringStage::EnhancementEq`] | peaking boosts and the air shelf |
//! | 5 | [`MasteringStage::MultibandCompression`] | multiband compression, parallel blend |
//! | 6 | [`MasteringStage::PreGain`] | flat makeup gain |
//! | 7 | [`MasteringStage::SoftClip`] | soft saturation |
//! | 8 | [`MasteringStage::LoudnessNormalization`] | gain to the loudness target |
//! | 9 | [`MasteringStage::TruePeakLimit`] | limiting to the ceiling |
//!
//! The limiter runs after normalisation so that it sees the final level; it
//! is the only stage allowed to have the last word on peaks.
//!
//! Any failure aborts the chain and is returned wrapped in
//! [`MasteringError::Stage`](crate::MasteringError::Stage); no partial master
//! is ever produced.
//!
//! # Examples
//!
//! ```rust
//! use audio_mastering::operations::mastering::master;
//! use audio_mastering::{MasteringConfig, MasteringTarget, sine_wave};
//! use std::time::Duration;
//!
//! let audio = sine_wave(440.0, Duration::from_secs(1), 48_000, 0.1).unwrap();
//! let config = MasteringConfig::transparent(MasteringTarget::streaming());
//! let output = master(&audio, &config).unwrap();
//! assert!((output.output_loudness - (-14.0)).abs() < 0.5);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

#[cfg(feature = "parallel-processing")]
use rayon::prelude::*;

use super::dynamics::SkippedBand;
use super::filter_design::design_eq;
use super::traits::{AudioDynamics, AudioFiltering, AudioLoudness, AudioStatistics};
use super::types::{FilterSpec, MasteringConfig};
use crate::{AudioBuffer, MasteringError, MasteringResult, db_to_linear};

/// One step of the mastering chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MasteringStage {
    /// Static gain trim on one channel.
    StereoBalance,
    /// Zero-phase high-pass.
    HighPass,
    /// Corrective peaking cuts.
    CorrectiveEq,
    /// Enhancement boosts plus the optional high shelf.
    EnhancementEq,
    /// Multiband compression blended with the dry signal.
    MultibandCompression,
    /// Flat gain.
    PreGain,
    /// Soft clipper.
    SoftClip,
    /// Gain to the loudness target.
    LoudnessNormalization,
    /// Ceiling limiter.
    TruePeakLimit,
}

/// The order in which [`master`] runs its stages.
pub const STAGE_ORDER: [MasteringStage; 9] = [
    MasteringStage::StereoBalance,
    MasteringStage::HighPass,
    MasteringStage::CorrectiveEq,
    MasteringStage::EnhancementEq,
    MasteringStage::MultibandCompression,
    MasteringStage::PreGain,
    MasteringStage::SoftClip,
    MasteringStage::LoudnessNormalization,
    MasteringStage::TruePeakLimit,
];

impl MasteringStage {
    /// Short snake_case name used in logs and errors.
    pub const fn name(self) -> &'static str {
        match self {
            Self::StereoBalance => "stereo_balance",
            Self::HighPass => "high_pass",
            Self::CorrectiveEq => "corrective_eq",
            Self::EnhancementEq => "enhancement_eq",
            Self::MultibandCompression => "multiband_compression",
            Self::PreGain => "pre_gain",
            Self::SoftClip => "soft_clip",
            Self::LoudnessNormalization => "loudness_normalization",
            Self::TruePeakLimit => "true_peak_limit",
        }
    }

    /// Runs this stage alone on `audio`.
    pub fn apply(self, audio: &AudioBuffer, config: &MasteringConfig) -> MasteringResult<StageOutput> {
        let sample_rate = audio.sample_rate_hz();
        let processed = match self {
            Self::StereoBalance => {
                if audio.num_channels() < 2 {
                    audio.clone()
                } else if config.balance_channel >= audio.num_channels() {
                    return Err(MasteringError::invalid_parameter(
                        "balance_channel",
                        format!(
                            "channel {} does not exist in a {}-channel buffer",
                            config.balance_channel,
                            audio.num_channels()
                        ),
                    ));
                } else if config.stereo_balance_trim_db == 0.0 {
                    audio.clone()
                } else {
                    audio.scaled_channel(
                        config.balance_channel,
                        db_to_linear(config.stereo_balance_trim_db),
                    )?
                }
            }
            Self::HighPass => audio.apply_filter_zero_phase(&FilterSpec::high_pass(
                config.high_pass_hz,
                config.high_pass_order,
            ))?,
            Self::CorrectiveEq => audio.apply_eq(&config.corrective_eq)?,
            Self::EnhancementEq => {
                let mut cascade = design_eq(&config.enhancement_eq, sample_rate)?;
                if let Some(shelf) = &config.air_shelf {
                    cascade.extend(&shelf.to_spec(sample_rate)?.design(sample_rate)?);
                }
                cascade.apply(audio)?
            }
            Self::MultibandCompression => {
                let compressed = audio.multiband_compress(&config.bands)?;
                let blended =
                    AudioBuffer::blend(&compressed.audio, audio, config.parallel_mix)?;
                return Ok(StageOutput {
                    audio: blended,
                    skipped_bands: compressed.skipped_bands,
                    applied_gain_db: None,
                });
            }
            Self::PreGain => audio.scaled(db_to_linear(config.pre_gain_db)),
            Self::SoftClip => audio.soft_clip(config.soft_clip_threshold)?,
            Self::LoudnessNormalization => {
                let (normalized, gain_db) = audio.gain_to_target(config.target.target_lufs)?;
                return Ok(StageOutput {
                    audio: normalized,
                    skipped_bands: Vec::new(),
                    applied_gain_db: Some(gain_db),
                });
            }
            Self::TruePeakLimit => {
                audio.true_peak_limit(config.target.ceiling_db, config.limiter_release_ms)?
            }
        };
        Ok(StageOutput::new(processed))
    }
}

impl fmt::Display for MasteringStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output of a single stage.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutput {
    /// Processed audio.
    pub audio: AudioBuffer,
    /// Bands the multiband stage skipped.
    pub skipped_bands: Vec<SkippedBand>,
    /// Gain applied by loudness normalisation, in dB.
    pub applied_gain_db: Option<f64>,
}

impl StageOutput {
    const fn new(audio: AudioBuffer) -> Self {
        Self {
            audio,
            skipped_bands: Vec::new(),
            applied_gain_db: None,
        }
    }
}

/// A rendered master and the measurements taken along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct MasteringOutput {
    /// The mastered audio, same shape and rate as the input.
    pub audio: AudioBuffer,
    /// Integrated loudness of the input in LUFS.
    pub input_loudness: f64,
    /// Integrated loudness of the output in LUFS.
    pub output_loudness: f64,
    /// Oversampled true peak of the output in dBTP.
    pub output_true_peak_db: f64,
    /// Gain applied by loudness normalisation, in dB.
    pub applied_gain_db: f64,
    /// Multiband bands that could not be built.
    pub skipped_bands: Vec<SkippedBand>,
}

/// Renders one master of `audio` with `config`.
pub fn master(audio: &AudioBuffer, config: &MasteringConfig) -> MasteringResult<MasteringOutput> {
    let span = info_span!(
        "mastering_chain",
        target_lufs = config.target.target_lufs,
        ceiling_db = config.target.ceiling_db
    );
    let _guard = span.enter();

    config.validate()?;
    audio.ensure_not_empty("master")?;
    let input_loudness = audio.integrated_loudness()?;
    debug!(input_loudness, "mastering started");

    let mut current = audio.clone();
    let mut applied_gain_db = 0.0;
    let mut skipped_bands = Vec::new();
    for stage in STAGE_ORDER {
        let output = stage
            .apply(&current, config)
            .map_err(|err| err.in_stage(stage))?;
        if let Some(gain) = output.applied_gain_db {
            applied_gain_db = gain;
        }
        skipped_bands.extend(output.skipped_bands);
        current = output.audio;
        debug!(
            stage = stage.name(),
            peak = current.peak()?,
            applied_gain_db = output.applied_gain_db,
            "stage complete"
        );
    }

    let output_loudness = current.integrated_loudness()?;
    let output_true_peak_db = current.true_peak_db()?;
    debug!(output_loudness, output_true_peak_db, "mastering finished");

    Ok(MasteringOutput {
        audio: current,
        input_loudness,
        output_loudness,
        output_true_peak_db,
        applied_gain_db,
        skipped_bands,
    })
}

/// Renders one master per config, in config order.
///
/// The renders are independent; with the `parallel-processing` feature they
/// run on the rayon thread pool.
pub fn master_many(
    audio: &AudioBuffer,
    configs: &[MasteringConfig],
) -> Vec<MasteringResult<MasteringOutput>> {
    #[cfg(feature = "parallel-processing")]
    {
        configs.par_iter().map(|config| master(audio, config)).collect()
    }
    #[cfg(not(feature = "parallel-processing"))]
    {
        configs.iter().map(|config| master(audio, config)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::types::{BandConfig, MasteringTarget};
    use crate::utils::generation::{sine_wave, stereo_sine_wave};
    use crate::{MasteringError, linear_to_amplitude_db};
    use ndarray::Array1;
    use std::time::Duration;

    #[test]
    fn test_stage_order_is_fixed() {
        let names: Vec<&str> = STAGE_ORDER.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            [
                "stereo_balance",
                "high_pass",
                "corrective_eq",
                "enhancement_eq",
                "multiband_compression",
                "pre_gain",
                "soft_clip",
                "loudness_normalization",
                "true_peak_limit",
            ]
        );
        assert_eq!(MasteringStage::HighPass.to_string(), "high_pass");
    }

    #[test]
    fn test_streaming_preset_hits_targets() {
        let audio = stereo_sine_wave(220.0, Duration::from_secs(2), 48_000, 0.3, 0.28).unwrap();
        let output = master(&audio, &MasteringConfig::streaming()).unwrap();
        assert_eq!(output.audio.num_channels(), 2);
        assert_eq!(output.audio.samples_per_channel(), audio.samples_per_channel());
        assert!(output.audio.peak().unwrap() <= db_to_linear(-1.0));
        assert!(output.skipped_bands.is_empty());
        assert!(output.applied_gain_db.is_finite());
    }

    #[test]
    fn test_balance_trim_only_touches_one_channel() {
        let audio = stereo_sine_wave(440.0, Duration::from_millis(100), 48_000, 0.5, 0.5).unwrap();
        let config = MasteringConfig::streaming();
        let trimmed = MasteringStage::StereoBalance.apply(&audio, &config).unwrap().audio;
        let left = trimmed.channel(0).unwrap();
        let right = trimmed.channel(1).unwrap();
        assert_eq!(left, audio.channel(0).unwrap());
        let ratio = linear_to_amplitude_db(right[10] / left[10]);
        assert!((ratio - 0.42).abs() < 1e-9);

        let mono = sine_wave(440.0, Duration::from_millis(100), 48_000, 0.5).unwrap();
        let untouched = MasteringStage::StereoBalance.apply(&mono, &config).unwrap().audio;
        assert_eq!(untouched, mono);
    }

    #[test]
    fn test_missing_balance_channel_is_an_error() {
        let audio = stereo_sine_wave(440.0, Duration::from_millis(100), 48_000, 0.5, 0.5).unwrap();
        let mut config = MasteringConfig::streaming();
        config.balance_channel = 7;
        assert!(config.validate().is_ok());

        let err = MasteringStage::StereoBalance.apply(&audio, &config).unwrap_err();
        assert!(matches!(
            err,
            MasteringError::InvalidParameter {
                parameter: "balance_channel",
                ..
            }
        ));

        // Zero trim still checks the channel exists
        config.stereo_balance_trim_db = 0.0;
        let err = master(&audio, &config).unwrap_err();
        match &err {
            MasteringError::Stage { stage, .. } => {
                assert_eq!(*stage, MasteringStage::StereoBalance)
            }
            other => panic!("unexpected error {other:?}"),
        }

        // Mono buffers never use the balance channel
        let mono = sine_wave(440.0, Duration::from_millis(100), 48_000, 0.5).unwrap();
        assert!(MasteringStage::StereoBalance.apply(&mono, &config).is_ok());
    }

    #[test]
    fn test_limiter_after_normalisation_matters() {
        let audio = sine_wave(1000.0, Duration::from_secs(1), 48_000, 0.05).unwrap();
        // A 0 LUFS sine peaks well above a -1 dBFS ceiling
        let config = MasteringConfig::transparent(MasteringTarget::new(0.0, -1.0, false));

        let normalized = MasteringStage::LoudnessNormalization
            .apply(&audio, &config)
            .unwrap()
            .audio;
        let in_order = MasteringStage::TruePeakLimit
            .apply(&normalized, &config)
            .unwrap()
            .audio;

        let limited = MasteringStage::TruePeakLimit.apply(&audio, &config).unwrap().audio;
        let swapped = MasteringStage::LoudnessNormalization
            .apply(&limited, &config)
            .unwrap()
            .audio;

        let ceiling = db_to_linear(config.target.ceiling_db);
        assert!(in_order.peak().unwrap() <= ceiling);
        assert!(swapped.peak().unwrap() > ceiling);
    }

    #[test]
    fn test_stage_errors_name_the_stage() {
        let audio = sine_wave(440.0, Duration::from_millis(200), 48_000, 0.1).unwrap();
        let mut config = MasteringConfig::streaming();
        config.high_pass_hz = 30_000.0;
        let err = master(&audio, &config).unwrap_err();
        match &err {
            MasteringError::Stage { stage, .. } => assert_eq!(*stage, MasteringStage::HighPass),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(
            err.root_cause(),
            MasteringError::InvalidFilterSpec { .. }
        ));
    }

    #[test]
    fn test_empty_buffer_and_invalid_config_abort() {
        let empty = AudioBuffer::new_mono(Array1::zeros(0), 48_000).unwrap();
        assert!(matches!(
            master(&empty, &MasteringConfig::streaming()),
            Err(MasteringError::EmptyBuffer { .. })
        ));

        let audio = sine_wave(440.0, Duration::from_millis(200), 48_000, 0.1).unwrap();
        let mut config = MasteringConfig::streaming();
        config.bands.push(BandConfig::new(100.0, 200.0, -10.0, 0.0, 5.0, 50.0));
        assert!(master(&audio, &config).is_err());
    }

    #[test]
    fn test_skipped_bands_are_reported() {
        let audio = sine_wave(440.0, Duration::from_millis(500), 16_000, 0.2).unwrap();
        let mut config = MasteringConfig::streaming();
        config.air_shelf = None;
        // The 8-20 kHz band collapses at a 16 kHz sample rate
        let output = master(&audio, &config).unwrap();
        assert_eq!(output.skipped_bands.len(), 1);
        assert_eq!(output.skipped_bands[0].band.low_hz, 8000.0);
    }

    #[test]
    fn test_master_many_keeps_config_order() {
        let audio = sine_wave(330.0, Duration::from_secs(1), 48_000, 0.1).unwrap();
        let configs = [
            MasteringConfig::transparent(MasteringTarget::streaming()),
            MasteringConfig::transparent(MasteringTarget::new(-20.0, -1.0, false)),
        ];
        let outputs = master_many(&audio, &configs);
        assert_eq!(outputs.len(), 2);
        let first = outputs[0].as_ref().unwrap();
        let second = outputs[1].as_ref().unwrap();
        assert!((first.output_loudness + 14.0).abs() < 0.5);
        assert!((second.output_loudness + 20.0).abs() < 0.5);
    }
}
