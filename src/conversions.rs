//! # PCM Input Normalisation
//!
//! The mastering operations work exclusively on `f64` samples in `[-1, 1]`.
//! This module is the single place where fixed-point and floating-point PCM
//! is brought into that range, and where finished masters are exported back
//! to 32-bit integers.
//!
//! ```rust
//! use audio_mastering::conversions::{from_interleaved_pcm, to_i32_pcm};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Two frames of 16-bit stereo
//! let pcm: [i16; 4] = [16_384, -16_384, 0, 32_767];
//! let audio = from_interleaved_pcm(&pcm, 2, 44_100)?;
//! assert_eq!(audio.num_channels(), 2);
//! assert_eq!(audio.channel(0).unwrap()[0], 0.5);
//!
//! let exported = to_i32_pcm(&audio);
//! assert_eq!(exported[0], 1 << 30);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Scaling
//!
//! | Type  | Conversion |
//! |-------|------------|
//! | `u8`  | `(x - 128) / 128` |
//! | `i16` | `x / 32768` |
//! | `i32` | `x / 2147483648` |
//! | `f32` | widened unchanged |
//! | `f64` | unchanged |

use ndarray::{Array1, Array2};

use crate::{AudioBuffer, MasteringError, MasteringResult};

/// A PCM sample type that can be normalised to `f64`.
pub trait PcmSample: Copy {
    /// The sample as a float, full scale mapped to `[-1, 1)`.
    fn to_normalized(self) -> f64;
}

impl PcmSample for u8 {
    fn to_normalized(self) -> f64 {
        (f64::from(self) - 128.0) / 128.0
    }
}

impl PcmSample for i16 {
    fn to_normalized(self) -> f64 {
        f64::from(self) / 32_768.0
    }
}

impl PcmSample for i32 {
    fn to_normalized(self) -> f64 {
        f64::from(self) / 2_147_483_648.0
    }
}

impl PcmSample for f32 {
    fn to_normalized(self) -> f64 {
        f64::from(self)
    }
}

impl PcmSample for f64 {
    fn to_normalized(self) -> f64 {
        self
    }
}

/// Builds a buffer from interleaved PCM frames.
///
/// One channel produces a mono buffer. The sample count must be a multiple
/// of `channels`.
pub fn from_interleaved_pcm<T: PcmSample>(
    samples: &[T],
    channels: usize,
    sample_rate: u32,
) -> MasteringResult<AudioBuffer> {
    if channels == 0 {
        return Err(MasteringError::invalid_parameter(
            "channels",
            "at least one channel is required",
        ));
    }
    if samples.len() % channels != 0 {
        return Err(MasteringError::ChannelMismatch {
            expected: format!("a multiple of {channels} samples"),
            actual: format!("{} samples", samples.len()),
        });
    }

    if channels == 1 {
        let mono = Array1::from_iter(samples.iter().map(|s| s.to_normalized()));
        return AudioBuffer::new_mono(mono, sample_rate);
    }
    let frames = samples.len() / channels;
    let planar = Array2::from_shape_fn((channels, frames), |(ch, i)| {
        samples[i * channels + ch].to_normalized()
    });
    AudioBuffer::new_multi_channel(planar, sample_rate)
}

/// Interleaved 32-bit PCM export, clipped to the integer range.
pub fn to_i32_pcm(audio: &AudioBuffer) -> Vec<i32> {
    audio
        .to_interleaved()
        .into_iter()
        .map(|x| (x * 2_147_483_648.0).clamp(-2_147_483_648.0, 2_147_483_647.0) as i32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_scaling() {
        assert_eq!(0u8.to_normalized(), -1.0);
        assert_eq!(128u8.to_normalized(), 0.0);
        assert_eq!(i16::MIN.to_normalized(), -1.0);
        assert_eq!(16_384i16.to_normalized(), 0.5);
        assert_eq!(i32::MIN.to_normalized(), -1.0);
        assert!(i32::MAX.to_normalized() < 1.0);
        assert_eq!(0.25f32.to_normalized(), 0.25);
    }

    #[test]
    fn test_interleaved_layout() {
        let pcm = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let audio = from_interleaved_pcm(&pcm, 3, 48_000).unwrap();
        assert_eq!(audio.num_channels(), 3);
        assert_eq!(audio.samples_per_channel(), 2);
        assert_eq!(audio.channel(1).unwrap().to_vec(), vec![0.2, 0.5]);
        assert_eq!(audio.to_interleaved(), pcm.to_vec());

        let mono = from_interleaved_pcm(&[64u8, 192], 1, 8_000).unwrap();
        assert!(mono.is_mono());
        assert_eq!(mono.as_mono().unwrap().to_vec(), vec![-0.5, 0.5]);
    }

    #[test]
    fn test_interleaved_rejects_bad_shapes() {
        assert!(from_interleaved_pcm(&[0i16; 5], 2, 48_000).is_err());
        assert!(from_interleaved_pcm(&[0i16; 4], 0, 48_000).is_err());
    }

    #[test]
    fn test_i32_export_clips() {
        let audio = from_interleaved_pcm(&[1.5, -1.5, 0.5, 0.0], 1, 48_000).unwrap();
        assert_eq!(to_i32_pcm(&audio), vec![i32::MAX, i32::MIN, 1 << 30, 0]);
    }
}
