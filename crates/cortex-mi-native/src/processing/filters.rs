//! Digital filters for EEG processing
//!
//! Provides floating-point IIR filters for host processing, and zero-phase
//! forward-backward application over whole recordings.

use ndarray::{Array2, Axis};

/// Butterworth IIR filter coefficients (second-order section)
#[derive(Clone, Copy, Debug)]
pub struct BiquadCoeffs {
    /// Numerator coefficients [b0, b1, b2]
    pub b: [f64; 3],
    /// Denominator coefficients [a0=1, a1, a2]
    pub a: [f64; 3],
}

impl BiquadCoeffs {
    /// Gain at DC (z = 1)
    #[must_use]
    pub fn dc_gain(&self) -> f64 {
        let den = self.a[0] + self.a[1] + self.a[2];
        if den.abs() < f64::EPSILON {
            0.0
        } else {
            (self.b[0] + self.b[1] + self.b[2]) / den
        }
    }
}

/// Second-order biquad filter section (transposed direct form II)
#[derive(Clone, Debug)]
pub struct Biquad {
    coeffs: BiquadCoeffs,
    /// State: [z1, z2]
    state: [f64; 2],
}

impl Biquad {
    /// Create a new biquad section with given coefficients
    #[must_use]
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self { coeffs, state: [0.0, 0.0] }
    }

    /// Create a second-order Butterworth lowpass filter
    #[must_use]
    pub fn lowpass(sample_rate: f64, cutoff: f64) -> Self {
        let omega = std::f64::consts::PI * cutoff / sample_rate;
        let k = omega.tan();
        let k2 = k * k;
        let sqrt2 = std::f64::consts::SQRT_2;

        let norm = 1.0 / (1.0 + sqrt2 * k + k2);

        let coeffs = BiquadCoeffs {
            b: [k2 * norm, 2.0 * k2 * norm, k2 * norm],
            a: [1.0, 2.0 * (k2 - 1.0) * norm, (1.0 - sqrt2 * k + k2) * norm],
        };

        Self::new(coeffs)
    }

    /// Create a second-order Butterworth highpass filter
    #[must_use]
    pub fn highpass(sample_rate: f64, cutoff: f64) -> Self {
        let omega = std::f64::consts::PI * cutoff / sample_rate;
        let k = omega.tan();
        let k2 = k * k;
        let sqrt2 = std::f64::consts::SQRT_2;

        let norm = 1.0 / (1.0 + sqrt2 * k + k2);

        let coeffs = BiquadCoeffs {
            b: [norm, -2.0 * norm, norm],
            a: [1.0, 2.0 * (k2 - 1.0) * norm, (1.0 - sqrt2 * k + k2) * norm],
        };

        Self::new(coeffs)
    }

    /// Create a notch filter for power line interference
    #[must_use]
    pub fn notch(sample_rate: f64, notch_freq: f64, q: f64) -> Self {
        let omega = 2.0 * std::f64::consts::PI * notch_freq / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q);

        let norm = 1.0 / (1.0 + alpha);

        let coeffs = BiquadCoeffs {
            b: [norm, -2.0 * cos_omega * norm, norm],
            a: [1.0, -2.0 * cos_omega * norm, (1.0 - alpha) * norm],
        };

        Self::new(coeffs)
    }

    /// Zero-phase application of this section alone.
    pub fn filtfilt(&mut self, signal: &[f64]) -> Vec<f64> {
        let mut output = signal.to_vec();
        for _ in 0..2 {
            if let Some(&first) = output.first() {
                self.prime(first);
            }
            for sample in &mut output {
                *sample = self.filter(*sample);
            }
            output.reverse();
        }
        self.reset();
        output
    }

    /// Process a single sample
    pub fn filter(&mut self, input: f64) -> f64 {
        let [b0, b1, b2] = self.coeffs.b;
        let [_, a1, a2] = self.coeffs.a;

        let output = b0 * input + self.state[0];
        self.state[0] = b1 * input - a1 * output + self.state[1];
        self.state[1] = b2 * input - a2 * output;

        output
    }

    /// Set the state to the steady response of a constant `input`.
    ///
    /// Starting from this state a constant signal passes without a transient.
    pub fn prime(&mut self, input: f64) {
        let [b0, _, b2] = self.coeffs.b;
        let [_, _, a2] = self.coeffs.a;
        let output = self.coeffs.dc_gain() * input;

        self.state = [output - b0 * input, b2 * input - a2 * output];
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.state = [0.0, 0.0];
    }
}

/// Bandpass filter built from a highpass and a lowpass section
#[derive(Clone, Debug)]
pub struct BandpassFilter {
    highpass: Biquad,
    lowpass: Biquad,
}

impl BandpassFilter {
    /// Samples of odd-reflection padding added at each end by [`Self::filtfilt`].
    pub const PAD_LEN: usize = 15;

    /// Create a bandpass filter for a frequency range
    #[must_use]
    pub fn new(sample_rate: f64, low_cutoff: f64, high_cutoff: f64) -> Self {
        Self {
            highpass: Biquad::highpass(sample_rate, low_cutoff),
            lowpass: Biquad::lowpass(sample_rate, high_cutoff),
        }
    }

    /// Process a single sample
    pub fn filter(&mut self, input: f64) -> f64 {
        let hp_out = self.highpass.filter(input);
        self.lowpass.filter(hp_out)
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.lowpass.reset();
        self.highpass.reset();
    }

    fn prime(&mut self, input: f64) {
        self.highpass.prime(input);
        self.lowpass.prime(self.highpass.coeffs.dc_gain() * input);
    }

    fn run(&mut self, signal: &mut [f64]) {
        let Some(&first) = signal.first() else {
            return;
        };
        self.prime(first);
        for sample in signal.iter_mut() {
            *sample = self.filter(*sample);
        }
    }

    /// Zero-phase filtering: run forward, then backward over the reversed
    /// output, with odd-reflection padding at both ends.
    ///
    /// The magnitude response is squared and the phase response cancels.
    pub fn filtfilt(&mut self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n < 2 {
            return signal.to_vec();
        }
        let pad = Self::PAD_LEN.min(n - 1);
        let first = signal[0];
        let last = signal[n - 1];

        let mut extended = Vec::with_capacity(n + 2 * pad);
        extended.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
        extended.extend_from_slice(signal);
        extended.extend((n - 1 - pad..n - 1).rev().map(|i| 2.0 * last - signal[i]));

        self.run(&mut extended);
        extended.reverse();
        self.run(&mut extended);
        extended.reverse();
        self.reset();

        extended[pad..pad + n].to_vec()
    }
}

/// Zero-phase band-pass every row (channel) of a channels × samples matrix.
pub fn filtfilt_rows(data: &mut Array2<f64>, sample_rate: f64, low_cutoff: f64, high_cutoff: f64) {
    let mut filter = BandpassFilter::new(sample_rate, low_cutoff, high_cutoff);

    for mut row in data.axis_iter_mut(Axis(0)) {
        let input: Vec<f64> = row.iter().copied().collect();
        let output = filter.filtfilt(&input);
        for (dst, src) in row.iter_mut().zip(output) {
            *dst = src;
        }
    }
}

/// Zero-phase notch every row of a channels × samples matrix.
pub fn notch_rows(data: &mut Array2<f64>, sample_rate: f64, notch_freq: f64) {
    let mut filter = Biquad::notch(sample_rate, notch_freq, NOTCH_Q);

    for mut row in data.axis_iter_mut(Axis(0)) {
        let input: Vec<f64> = row.iter().copied().collect();
        let output = filter.filtfilt(&input);
        for (dst, src) in row.iter_mut().zip(output) {
            *dst = src;
        }
    }
}

/// Quality factor of the power-line notch
const NOTCH_Q: f64 = 30.0;
