//! Biquad coefficients, cascades and their application to audio.
//!
//! Coefficients are always stored normalised (`a0 == 1`). Each section runs
//! the direct-form I difference equation
//!
//! ```text
//! y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
//! ```
//!
//! with per-channel state holding the last two inputs and outputs. Block
//! processing of a whole buffer and streaming through [`CascadeProcessor`]
//! produce identical output.

use std::f64::consts::PI;

use ndarray::ArrayView1;
use num_complex::Complex;

use crate::{AudioBuffer, MasteringError, MasteringResult};

/// Normalised second-order section coefficients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    /// Feed-forward coefficient for `x[n]`.
    pub b0: f64,
    /// Feed-forward coefficient for `x[n-1]`.
    pub b1: f64,
    /// Feed-forward coefficient for `x[n-2]`.
    pub b2: f64,
    /// Feedback coefficient for `y[n-1]`.
    pub a1: f64,
    /// Feedback coefficient for `y[n-2]`.
    pub a2: f64,
}

impl BiquadCoefficients {
    /// Pass-through section.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Normalises raw `b`/`a` coefficients by `a[0]`.
    pub fn from_raw(b: [f64; 3], a: [f64; 3]) -> MasteringResult<Self> {
        let a0 = a[0];
        if a0 == 0.0 || !a0.is_finite() {
            return Err(MasteringError::invalid_parameter(
                "a0",
                format!("leading feedback coefficient must be finite and non-zero, got {a0}"),
            ));
        }
        let coeffs = Self {
            b0: b[0] / a0,
            b1: b[1] / a0,
            b2: b[2] / a0,
            a1: a[1] / a0,
            a2: a[2] / a0,
        };
        if coeffs.as_array().iter().any(|c| !c.is_finite()) {
            return Err(MasteringError::invalid_parameter(
                "coefficients",
                "coefficients are not finite",
            ));
        }
        Ok(coeffs)
    }

    /// `[b0, b1, b2, a1, a2]`.
    pub const fn as_array(&self) -> [f64; 5] {
        [self.b0, self.b1, self.b2, self.a1, self.a2]
    }

    /// True when the section is a first-order section (`b2 == a2 == 0`).
    pub fn is_first_order(&self) -> bool {
        self.b2 == 0.0 && self.a2 == 0.0
    }

    /// True when both poles lie strictly inside the unit circle.
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }

    /// Gain at DC, `H(z = 1)`. Zero when the section has a pole at DC.
    pub fn dc_gain(&self) -> f64 {
        let den = 1.0 + self.a1 + self.a2;
        if den.abs() < 1e-15 {
            0.0
        } else {
            (self.b0 + self.b1 + self.b2) / den
        }
    }

    /// Complex response at `frequency` Hz.
    pub fn response_at(&self, frequency: f64, sample_rate: f64) -> Complex<f64> {
        let w = 2.0 * PI * frequency / sample_rate;
        let z1 = Complex::from_polar(1.0, -w);
        let z2 = z1 * z1;
        let num = self.b0 + z1 * self.b1 + z2 * self.b2;
        let den = 1.0 + z1 * self.a1 + z2 * self.a2;
        num / den
    }
}

impl Default for BiquadCoefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Direct-form I state of one section on one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    /// State the section would settle into after a long constant input `x0`.
    pub fn steady_state(coeffs: &BiquadCoefficients, x0: f64) -> Self {
        let y0 = coeffs.dc_gain() * x0;
        Self {
            x1: x0,
            x2: x0,
            y1: y0,
            y2: y0,
        }
    }

    /// Runs one sample through the section.
    #[inline]
    pub fn process(&mut self, coeffs: &BiquadCoefficients, x: f64) -> f64 {
        let y = coeffs.b0 * x + coeffs.b1 * self.x1 + coeffs.b2 * self.x2
            - coeffs.a1 * self.y1
            - coeffs.a2 * self.y2;
        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;
        y
    }

    /// Clears the delay lines.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// An ordered series of biquad sections applied one after another.
///
/// An empty cascade is the identity filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCascade {
    sections: Vec<BiquadCoefficients>,
}

impl FilterCascade {
    /// Cascade from sections, applied in order.
    pub const fn new(sections: Vec<BiquadCoefficients>) -> Self {
        Self { sections }
    }

    /// The pass-through cascade.
    pub const fn identity() -> Self {
        Self {
            sections: Vec::new(),
        }
    }

    /// Cascade of a single section.
    pub fn single(section: BiquadCoefficients) -> Self {
        Self::new(vec![section])
    }

    /// Sections in application order.
    pub fn sections(&self) -> &[BiquadCoefficients] {
        &self.sections
    }

    /// Appends every section of `other` after this cascade's sections.
    pub fn extend(&mut self, other: &FilterCascade) {
        self.sections.extend_from_slice(&other.sections);
    }

    /// True when the cascade has no sections.
    pub fn is_identity(&self) -> bool {
        self.sections.is_empty()
    }

    /// True when every section is stable.
    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(BiquadCoefficients::is_stable)
    }

    /// Complex response of the whole cascade at `frequency` Hz.
    pub fn response_at(&self, frequency: f64, sample_rate: f64) -> Complex<f64> {
        self.sections
            .iter()
            .fold(Complex::new(1.0, 0.0), |acc, s| {
                acc * s.response_at(frequency, sample_rate)
            })
    }

    /// Magnitude response in dB at `frequency` Hz.
    pub fn magnitude_db_at(&self, frequency: f64, sample_rate: f64) -> f64 {
        crate::linear_to_amplitude_db(self.response_at(frequency, sample_rate).norm())
    }

    /// Get the frequency response at specified frequencies.
    ///
    /// Returns (magnitude, phase) response vectors.
    pub fn frequency_response(&self, frequencies: &[f64], sample_rate: f64) -> (Vec<f64>, Vec<f64>) {
        frequencies
            .iter()
            .map(|&f| {
                let h = self.response_at(f, sample_rate);
                (h.norm(), h.arg())
            })
            .unzip()
    }

    fn run(&self, states: &mut [BiquadState], input: &[f64]) -> Vec<f64> {
        input
            .iter()
            .map(|&x| {
                self.sections
                    .iter()
                    .zip(states.iter_mut())
                    .fold(x, |acc, (coeffs, state)| state.process(coeffs, acc))
            })
            .collect()
    }

    fn fresh_states(&self) -> Vec<BiquadState> {
        vec![BiquadState::default(); self.sections.len()]
    }

    fn settled_states(&self, x0: f64) -> Vec<BiquadState> {
        let mut level = x0;
        self.sections
            .iter()
            .map(|coeffs| {
                let state = BiquadState::steady_state(coeffs, level);
                level *= coeffs.dc_gain();
                state
            })
            .collect()
    }

    /// Causal filtering of one channel from zero initial state.
    pub fn filter_samples(&self, input: &[f64]) -> Vec<f64> {
        if self.is_identity() {
            return input.to_vec();
        }
        self.run(&mut self.fresh_states(), input)
    }

    /// Length of the odd extension used by [`FilterCascade::filtfilt_samples`].
    pub fn padding_len(&self) -> usize {
        let first_order = self
            .sections
            .iter()
            .filter(|s| s.is_first_order())
            .count();
        3 * (2 * self.sections.len() + 1 - first_order)
    }

    /// Zero-phase forward-backward filtering of one channel.
    ///
    /// The signal is padded at both ends with its odd extension and each
    /// pass starts from the steady state of its first sample, so a constant
    /// input produces no start-up transient. The magnitude response is the
    /// square of the cascade's and the phase response is zero.
    pub fn filtfilt_samples(&self, input: &[f64]) -> Vec<f64> {
        let n = input.len();
        if self.is_identity() || n == 0 {
            return input.to_vec();
        }
        let pad = self.padding_len().min(n - 1);

        let mut extended = Vec::with_capacity(n + 2 * pad);
        let first = input[0];
        let last = input[n - 1];
        extended.extend((1..=pad).rev().map(|i| 2.0 * first - input[i]));
        extended.extend_from_slice(input);
        extended.extend((1..=pad).map(|i| 2.0 * last - input[n - 1 - i]));

        let mut forward = self.run(&mut self.settled_states(extended[0]), &extended);
        forward.reverse();
        let mut backward = self.run(&mut self.settled_states(forward[0]), &forward);
        backward.reverse();

        backward.drain(pad..pad + n).collect()
    }

    fn channel_vec(channel: ArrayView1<'_, f64>) -> Vec<f64> {
        channel.iter().copied().collect()
    }

    /// Applies the cascade causally to every channel of a buffer.
    pub fn apply(&self, audio: &AudioBuffer) -> MasteringResult<AudioBuffer> {
        audio.map_channels(|channel| Ok(self.filter_samples(&Self::channel_vec(channel))))
    }

    /// Applies the cascade forward and backward to every channel of a buffer.
    pub fn apply_zero_phase(&self, audio: &AudioBuffer) -> MasteringResult<AudioBuffer> {
        audio.map_channels(|channel| Ok(self.filtfilt_samples(&Self::channel_vec(channel))))
    }
}

/// Streaming wrapper around a [`FilterCascade`] with state per channel.
///
/// Feeding a buffer in blocks through [`CascadeProcessor::process_block`]
/// yields the same samples as [`FilterCascade::apply`] on the whole buffer.
#[derive(Debug, Clone)]
pub struct CascadeProcessor {
    cascade: FilterCascade,
    states: Vec<Vec<BiquadState>>,
}

impl CascadeProcessor {
    /// Creates a processor for `num_channels` channels.
    pub fn new(cascade: FilterCascade, num_channels: usize) -> Self {
        let states = vec![cascade.fresh_states(); num_channels];
        Self { cascade, states }
    }

    /// Number of channels this processor keeps state for.
    pub fn num_channels(&self) -> usize {
        self.states.len()
    }

    /// Filters the next block, carrying state over from the previous block.
    pub fn process_block(&mut self, block: &AudioBuffer) -> MasteringResult<AudioBuffer> {
        if block.num_channels() != self.states.len() {
            return Err(MasteringError::ChannelMismatch {
                expected: format!("{} channels", self.states.len()),
                actual: format!("{} channels", block.num_channels()),
            });
        }
        let mut states = self.states.iter_mut();
        let cascade = &self.cascade;
        block.map_channels(|channel| {
            let input = FilterCascade::channel_vec(channel);
            Ok(match states.next() {
                Some(state) => cascade.run(state, &input),
                None => input,
            })
        })
    }

    /// Clears all channel state.
    pub fn reset(&mut self) {
        self.states
            .iter_mut()
            .flat_map(|channel| channel.iter_mut())
            .for_each(BiquadState::reset);
    }
}
