//! Core audio buffer representation.
//!
//! [`AudioBuffer`] pairs normalised `f64` samples with their sample rate. The
//! data lives in an [`AudioData`] enum so mono material keeps a 1-D shape and
//! multi-channel material a 2-D `(channels, samples_per_channel)` shape; every
//! processing stage hands back a buffer with the same variant it was given.
//!
//! # Examples
//!
//! ```rust
//! use audio_mastering::AudioBuffer;
//! use ndarray::array;
//!
//! let mono = AudioBuffer::new_mono(array![0.1, 0.2, 0.3], 48_000).unwrap();
//! assert_eq!(mono.num_channels(), 1);
//!
//! let stereo = AudioBuffer::new_multi_channel(
//!     array![[0.1, 0.2, 0.3], [0.4, 0.5, 0.6]],
//!     48_000,
//! )
//! .unwrap();
//! assert_eq!(stereo.num_channels(), 2);
//! assert_eq!(stereo.samples_per_channel(), 3);
//! ```

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use std::num::NonZeroU32;

use crate::{MasteringError, MasteringResult};

/// Sample storage for an [`AudioBuffer`].
#[derive(Debug, Clone, PartialEq)]
pub enum AudioData {
    /// Single channel, one sample per frame.
    Mono(Array1<f64>),
    /// Planar multi-channel data, one row per channel.
    MultiChannel(Array2<f64>),
}

impl AudioData {
    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        match self {
            AudioData::Mono(_) => 1,
            AudioData::MultiChannel(m) => m.nrows(),
        }
    }

    /// Number of samples in each channel.
    pub fn samples_per_channel(&self) -> usize {
        match self {
            AudioData::Mono(m) => m.len(),
            AudioData::MultiChannel(m) => m.ncols(),
        }
    }

    /// Planar 2-D view; mono data is exposed as a single row.
    pub fn planar_view(&self) -> ArrayView2<'_, f64> {
        match self {
            AudioData::Mono(m) => m.view().insert_axis(Axis(0)),
            AudioData::MultiChannel(m) => m.view(),
        }
    }
}

/// An owned block of normalised floating-point audio.
///
/// Samples are conventionally in `[-1.0, 1.0]`. The channel count and sample
/// rate never change for the lifetime of a buffer; operations return new
/// buffers instead of mutating their input.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub(crate) data: AudioData,
    sample_rate: NonZeroU32,
}

fn checked_rate(sample_rate: u32) -> MasteringResult<NonZeroU32> {
    NonZeroU32::new(sample_rate)
        .ok_or_else(|| MasteringError::invalid_parameter("sample_rate", "must be greater than 0"))
}

impl AudioBuffer {
    /// Creates a mono buffer.
    pub fn new_mono(data: Array1<f64>, sample_rate: u32) -> MasteringResult<Self> {
        Ok(Self {
            data: AudioData::Mono(data),
            sample_rate: checked_rate(sample_rate)?,
        })
    }

    /// Creates a multi-channel buffer from a `(channels, samples)` array.
    pub fn new_multi_channel(data: Array2<f64>, sample_rate: u32) -> MasteringResult<Self> {
        if data.nrows() == 0 {
            return Err(MasteringError::invalid_parameter(
                "channels",
                "multi-channel buffer needs at least one channel",
            ));
        }
        Ok(Self {
            data: AudioData::MultiChannel(data),
            sample_rate: checked_rate(sample_rate)?,
        })
    }

    /// Creates a buffer from per-channel vectors.
    ///
    /// One channel produces a mono buffer; all channels must have equal length.
    pub fn from_channels(channels: Vec<Vec<f64>>, sample_rate: u32) -> MasteringResult<Self> {
        match channels.len() {
            0 => Err(MasteringError::invalid_parameter(
                "channels",
                "at least one channel is required",
            )),
            1 => {
                let mono = channels.into_iter().next().unwrap_or_default();
                Self::new_mono(Array1::from(mono), sample_rate)
            }
            n => {
                let len = channels[0].len();
                if let Some(bad) = channels.iter().find(|c| c.len() != len) {
                    return Err(MasteringError::ChannelMismatch {
                        expected: format!("{len} samples per channel"),
                        actual: format!("{} samples", bad.len()),
                    });
                }
                let flat: Vec<f64> = channels.into_iter().flatten().collect();
                let data = Array2::from_shape_vec((n, len), flat).map_err(|e| {
                    MasteringError::invalid_parameter("channels", e.to_string())
                })?;
                Self::new_multi_channel(data, sample_rate)
            }
        }
    }

    /// Sample rate in Hz.
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate.get()
    }

    /// Sample rate in Hz as `f64`, for filter and time-constant maths.
    pub fn sample_rate_hz(&self) -> f64 {
        f64::from(self.sample_rate.get())
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.data.num_channels()
    }

    /// Number of samples in each channel.
    pub fn samples_per_channel(&self) -> usize {
        self.data.samples_per_channel()
    }

    /// Total number of samples across all channels.
    pub fn total_samples(&self) -> usize {
        self.num_channels() * self.samples_per_channel()
    }

    /// True when the buffer has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples_per_channel() == 0
    }

    /// True for mono buffers.
    pub const fn is_mono(&self) -> bool {
        matches!(self.data, AudioData::Mono(_))
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.samples_per_channel() as f64 / self.sample_rate_hz()
    }

    /// Underlying storage.
    pub const fn data(&self) -> &AudioData {
        &self.data
    }

    /// Mono samples, if this is a mono buffer.
    pub const fn as_mono(&self) -> Option<&Array1<f64>> {
        match &self.data {
            AudioData::Mono(m) => Some(m),
            AudioData::MultiChannel(_) => None,
        }
    }

    /// Multi-channel samples, if this is a multi-channel buffer.
    pub const fn as_multi_channel(&self) -> Option<&Array2<f64>> {
        match &self.data {
            AudioData::Mono(_) => None,
            AudioData::MultiChannel(m) => Some(m),
        }
    }

    /// Planar view with one row per channel.
    pub fn planar_view(&self) -> ArrayView2<'_, f64> {
        self.data.planar_view()
    }

    /// View of a single channel.
    pub fn channel(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.num_channels()).then(|| self.planar_view().index_axis_move(Axis(0), index))
    }

    /// Iterates over channels in order.
    pub fn channels(&self) -> impl Iterator<Item = ArrayView1<'_, f64>> {
        (0..self.num_channels()).filter_map(move |i| self.channel(i))
    }

    /// Fails with [`MasteringError::EmptyBuffer`] if the buffer has no samples.
    pub fn ensure_not_empty(&self, operation: &'static str) -> MasteringResult<()> {
        if self.is_empty() {
            Err(MasteringError::EmptyBuffer { operation })
        } else {
            Ok(())
        }
    }

    /// Builds a buffer with this buffer's layout and sample rate from planar data.
    pub(crate) fn with_planar(&self, planar: Array2<f64>) -> MasteringResult<Self> {
        if planar.nrows() != self.num_channels() {
            return Err(MasteringError::ChannelMismatch {
                expected: format!("{} channels", self.num_channels()),
                actual: format!("{} channels", planar.nrows()),
            });
        }
        let data = match self.data {
            AudioData::Mono(_) => AudioData::Mono(planar.index_axis_move(Axis(0), 0)),
            AudioData::MultiChannel(_) => AudioData::MultiChannel(planar),
        };
        Ok(Self {
            data,
            sample_rate: self.sample_rate,
        })
    }

    /// Applies `f` to each channel and reassembles the results.
    ///
    /// Every returned channel must keep the original length.
    pub fn map_channels<F>(&self, mut f: F) -> MasteringResult<Self>
    where
        F: FnMut(ArrayView1<'_, f64>) -> MasteringResult<Vec<f64>>,
    {
        let len = self.samples_per_channel();
        let mut planar = Array2::zeros((self.num_channels(), len));
        for (input, mut output) in self
            .planar_view()
            .axis_iter(Axis(0))
            .zip(planar.axis_iter_mut(Axis(0)))
        {
            let processed = f(input)?;
            if processed.len() != len {
                return Err(MasteringError::ChannelMismatch {
                    expected: format!("{len} samples per channel"),
                    actual: format!("{} samples", processed.len()),
                });
            }
            output.assign(&Array1::from(processed));
        }
        self.with_planar(planar)
    }

    /// Applies `f` to every sample.
    pub fn mapv<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        let data = match &self.data {
            AudioData::Mono(m) => AudioData::Mono(m.mapv(&f)),
            AudioData::MultiChannel(m) => AudioData::MultiChannel(m.mapv(&f)),
        };
        Self {
            data,
            sample_rate: self.sample_rate,
        }
    }

    /// Returns a copy scaled by a linear gain.
    pub fn scaled(&self, gain: f64) -> Self {
        self.mapv(|x| x * gain)
    }

    /// Returns a copy with one channel scaled by a linear gain.
    pub fn scaled_channel(&self, channel: usize, gain: f64) -> MasteringResult<Self> {
        if channel >= self.num_channels() {
            return Err(MasteringError::invalid_parameter(
                "channel",
                format!(
                    "index {channel} is out of range for {} channels",
                    self.num_channels()
                ),
            ));
        }
        let mut out = self.clone();
        match &mut out.data {
            AudioData::Mono(m) => m.mapv_inplace(|x| x * gain),
            AudioData::MultiChannel(m) => m.row_mut(channel).mapv_inplace(|x| x * gain),
        }
        Ok(out)
    }

    /// Multiplies every channel by a per-frame gain curve.
    pub fn apply_frame_gains(&self, gains: &[f64]) -> MasteringResult<Self> {
        if gains.len() != self.samples_per_channel() {
            return Err(MasteringError::ChannelMismatch {
                expected: format!("{} gain values", self.samples_per_channel()),
                actual: format!("{} gain values", gains.len()),
            });
        }
        let gains = ArrayView1::from(gains);
        let mut planar = self.planar_view().to_owned();
        for mut row in planar.axis_iter_mut(Axis(0)) {
            row *= &gains;
        }
        self.with_planar(planar)
    }

    /// Per-frame maximum absolute value across channels.
    pub fn frame_peaks(&self) -> Vec<f64> {
        let view = self.planar_view();
        let mut peaks = vec![0.0_f64; self.samples_per_channel()];
        for row in view.axis_iter(Axis(0)) {
            for (peak, &x) in peaks.iter_mut().zip(row.iter()) {
                *peak = peak.max(x.abs());
            }
        }
        peaks
    }

    /// Average of all channels, one value per frame.
    pub fn mono_mix(&self) -> Array1<f64> {
        match &self.data {
            AudioData::Mono(m) => m.clone(),
            AudioData::MultiChannel(m) => m
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(m.ncols())),
        }
    }

    /// A silent buffer with the same shape and sample rate.
    pub fn zeros_like(&self) -> Self {
        self.mapv(|_| 0.0)
    }

    fn ensure_same_shape(&self, other: &Self) -> MasteringResult<()> {
        if self.num_channels() != other.num_channels()
            || self.samples_per_channel() != other.samples_per_channel()
        {
            return Err(MasteringError::ChannelMismatch {
                expected: format!(
                    "{}x{}",
                    self.num_channels(),
                    self.samples_per_channel()
                ),
                actual: format!(
                    "{}x{}",
                    other.num_channels(),
                    other.samples_per_channel()
                ),
            });
        }
        Ok(())
    }

    /// Adds `other` sample-by-sample into this buffer.
    pub fn accumulate(&mut self, other: &Self) -> MasteringResult<()> {
        self.ensure_same_shape(other)?;
        match (&mut self.data, &other.data) {
            (AudioData::Mono(a), AudioData::Mono(b)) => *a += b,
            (AudioData::MultiChannel(a), AudioData::MultiChannel(b)) => *a += b,
            (a, b) => {
                return Err(MasteringError::ChannelMismatch {
                    expected: format!("{} layout", layout_name(a)),
                    actual: format!("{} layout", layout_name(b)),
                });
            }
        }
        Ok(())
    }

    /// Linear blend `wet_mix * wet + (1 - wet_mix) * dry`.
    pub fn blend(wet: &Self, dry: &Self, wet_mix: f64) -> MasteringResult<Self> {
        wet.ensure_same_shape(dry)?;
        let dry_mix = 1.0 - wet_mix;
        let mut planar = wet.planar_view().to_owned();
        Zip::from(&mut planar)
            .and(&dry.planar_view())
            .for_each(|w, &d| *w = wet_mix * *w + dry_mix * d);
        wet.with_planar(planar)
    }

    /// Interleaved copy of the samples (frame-major).
    pub fn to_interleaved(&self) -> Vec<f64> {
        let view = self.planar_view();
        let mut out = Vec::with_capacity(self.total_samples());
        for frame in view.axis_iter(Axis(1)) {
            out.extend(frame.iter().copied());
        }
        out
    }
}

const fn layout_name(data: &AudioData) -> &'static str {
    match data {
        AudioData::Mono(_) => "mono",
        AudioData::MultiChannel(_) => "multi-channel",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_zero_sample_rate_rejected() {
        assert!(AudioBuffer::new_mono(array![0.0, 1.0], 0).is_err());
    }

    #[test]
    fn test_map_channels_preserves_layout() {
        let mono = AudioBuffer::new_mono(array![1.0, 2.0, 3.0], 44_100).unwrap();
        let doubled = mono
            .map_channels(|ch| Ok(ch.iter().map(|x| x * 2.0).collect()))
            .unwrap();
        assert!(doubled.is_mono());
        assert_eq!(doubled.as_mono().unwrap(), &array![2.0, 4.0, 6.0]);

        let stereo =
            AudioBuffer::new_multi_channel(array![[1.0, 2.0], [3.0, 4.0]], 44_100).unwrap();
        let negated = stereo
            .map_channels(|ch| Ok(ch.iter().map(|x| -x).collect()))
            .unwrap();
        assert!(!negated.is_mono());
        assert_eq!(
            negated.as_multi_channel().unwrap(),
            &array![[-1.0, -2.0], [-3.0, -4.0]]
        );
    }

    #[test]
    fn test_map_channels_rejects_length_change() {
        let mono = AudioBuffer::new_mono(array![1.0, 2.0, 3.0], 44_100).unwrap();
        let result = mono.map_channels(|ch| Ok(ch.iter().take(2).copied().collect()));
        assert!(matches!(result, Err(MasteringError::ChannelMismatch { .. })));
    }

    #[test]
    fn test_from_channels_and_interleave() {
        let buffer =
            AudioBuffer::from_channels(vec![vec![1.0, 2.0], vec![-1.0, -2.0]], 48_000).unwrap();
        assert_eq!(buffer.to_interleaved(), vec![1.0, -1.0, 2.0, -2.0]);

        let uneven = AudioBuffer::from_channels(vec![vec![1.0, 2.0], vec![1.0]], 48_000);
        assert!(uneven.is_err());
    }

    #[test]
    fn test_frame_peaks_and_mono_mix() {
        let stereo =
            AudioBuffer::new_multi_channel(array![[0.5, -0.2], [-0.1, 0.8]], 48_000).unwrap();
        assert_eq!(stereo.frame_peaks(), vec![0.5, 0.8]);
        let mix = stereo.mono_mix();
        assert!((mix[0] - 0.2).abs() < 1e-12);
        assert!((mix[1] - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_blend_and_scaled_channel() {
        let a = AudioBuffer::new_multi_channel(array![[1.0, 1.0], [1.0, 1.0]], 48_000).unwrap();
        let b = a.zeros_like();
        let mixed = AudioBuffer::blend(&a, &b, 0.6).unwrap();
        assert!(mixed.to_interleaved().iter().all(|&x| (x - 0.6).abs() < 1e-12));

        let trimmed = a.scaled_channel(1, 0.5).unwrap();
        assert_eq!(trimmed.to_interleaved(), vec![1.0, 0.5, 1.0, 0.5]);
        assert!(a.scaled_channel(2, 0.5).is_err());
    }

    #[test]
    fn test_accumulate_shape_mismatch() {
        let mut a = AudioBuffer::new_mono(array![1.0, 2.0], 48_000).unwrap();
        let b = AudioBuffer::new_mono(array![1.0], 48_000).unwrap();
        assert!(a.accumulate(&b).is_err());
        let c = a.clone();
        a.accumulate(&c).unwrap();
        assert_eq!(a.as_mono().unwrap(), &array![2.0, 4.0]);
    }
}
