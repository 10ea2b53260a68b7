//! End-to-end tests of the mastering chain and its analysis front end.

use audio_mastering::operations::mastering::{MasteringStage, STAGE_ORDER, master, master_many};
use audio_mastering::{
    AudioBuffer, AudioFiltering, AudioLoudness, AudioSpectrum, AudioStatistics, EqPoint,
    MasteringConfig, MasteringError, MasteringTarget, PeakSearchConfig, SpectrumConfig,
    ToneComponent, chirp, compound_tone, db_to_linear, stereo_sine_wave,
};
use std::time::Duration;

#[test]
fn transparent_chain_hits_streaming_target() {
    let audio = chirp(20.0, 20_000.0, Duration::from_secs(10), 48_000, 0.1).unwrap();
    let config = MasteringConfig::transparent(MasteringTarget::new(-14.0, -1.0, false));

    let output = master(&audio, &config).unwrap();

    assert!(
        (output.output_loudness + 14.0).abs() < 0.5,
        "loudness {}",
        output.output_loudness
    );
    assert!(
        output.output_true_peak_db <= -1.0,
        "true peak {}",
        output.output_true_peak_db
    );
    assert!(output.skipped_bands.is_empty());
    assert!(output.audio.is_mono());
    assert_eq!(output.audio.samples_per_channel(), audio.samples_per_channel());
    assert!(output.input_loudness < output.output_loudness);
    assert!(output.applied_gain_db > 0.0);
}

#[test]
fn club_preset_on_stereo_material() {
    let audio = stereo_sine_wave(110.0, Duration::from_secs(2), 44_100, 0.4, 0.35).unwrap();
    let config = MasteringConfig::club();

    let output = master(&audio, &config).unwrap();

    assert_eq!(output.audio.num_channels(), 2);
    assert_eq!(output.audio.sample_rate(), 44_100);
    assert!(output.audio.peak().unwrap() <= db_to_linear(config.target.ceiling_db));
    assert!(output.output_loudness.is_finite());
    assert!(output.output_true_peak_db.is_finite());
}

#[test]
fn mastering_is_deterministic() {
    let audio = chirp(100.0, 8_000.0, Duration::from_secs(1), 48_000, 0.2).unwrap();
    let config = MasteringConfig::streaming();
    let first = master(&audio, &config).unwrap();
    let second = master(&audio, &config).unwrap();
    assert_eq!(first, second);

    let many = master_many(&audio, &[config.clone(), config]);
    assert_eq!(many.len(), 2);
    for result in many {
        assert_eq!(result.unwrap(), first);
    }
}

#[test]
fn every_stage_preserves_shape() {
    let audio = stereo_sine_wave(440.0, Duration::from_millis(500), 48_000, 0.3, 0.2).unwrap();
    let config = MasteringConfig::streaming();
    let mut current = audio.clone();
    for stage in STAGE_ORDER {
        current = stage.apply(&current, &config).unwrap().audio;
        assert_eq!(current.num_channels(), audio.num_channels(), "{stage}");
        assert_eq!(
            current.samples_per_channel(),
            audio.samples_per_channel(),
            "{stage}"
        );
    }
    assert_eq!(STAGE_ORDER.first(), Some(&MasteringStage::StereoBalance));
    assert_eq!(STAGE_ORDER.last(), Some(&MasteringStage::TruePeakLimit));
}

#[test]
fn invalid_eq_aborts_with_stage_context() {
    let audio = chirp(100.0, 1_000.0, Duration::from_millis(500), 48_000, 0.2).unwrap();
    let mut config = MasteringConfig::streaming();
    config.corrective_eq.push(EqPoint::new(1_000.0, -3.0, 0.0));

    let err = master(&audio, &config).unwrap_err();
    assert!(matches!(
        err,
        MasteringError::Stage {
            stage: MasteringStage::CorrectiveEq,
            ..
        }
    ));
    assert!(err.to_string().contains("corrective_eq"));
}

#[test]
fn detected_resonance_can_be_cut() {
    let tones = [
        ToneComponent::new(200.0, 0.1),
        ToneComponent::new(1_200.0, 0.6),
        ToneComponent::new(5_000.0, 0.1),
    ];
    let audio = compound_tone(&tones, Duration::from_secs(2), 48_000).unwrap();

    let analysis = audio
        .analyze_resonances(&SpectrumConfig::smoothed(), &PeakSearchConfig::new())
        .unwrap();
    let loudest = analysis.resonances.first().copied().unwrap();
    assert!((loudest.frequency_hz - 1_200.0).abs() < 50.0);

    let cut = EqPoint::cut_for_resonance(&loudest);
    assert!(cut.gain_db < 0.0);
    let corrected = audio.apply_eq(&[cut]).unwrap();
    assert!(corrected.integrated_loudness().unwrap() < audio.integrated_loudness().unwrap());
}

#[test]
fn empty_input_is_rejected() {
    let empty = AudioBuffer::from_channels(vec![Vec::new(), Vec::new()], 48_000).unwrap();
    let err = master(&empty, &MasteringConfig::streaming()).unwrap_err();
    assert!(matches!(err, MasteringError::EmptyBuffer { .. }));
}
