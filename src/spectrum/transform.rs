// src/spectrum/transform.rs

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Periodic Hann window of length `n`.
pub fn hann_window(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / n as f32).cos()))
        .collect()
}

/// Forward FFT of one real window into `len` magnitudes.
///
/// Magnitudes are `sqrt(re² + im²)` of the Hann-windowed input, unscaled,
/// over the full (mirrored) spectrum: bin `k` and bin `len - k` match.
///
/// The planner is kept so that re-preparing for a size seen before reuses
/// the cached plan.
pub struct SpectrumTransform {
    planner: FftPlanner<f32>,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumTransform {
    /// # Panics
    /// If `len` is not a power of two >= 2.
    pub fn new(len: usize) -> Self {
        assert_radix2(len);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(len);
        let scratch_len = fft.get_inplace_scratch_len();
        Self {
            planner,
            fft,
            window: hann_window(len),
            buffer: vec![Complex::new(0.0, 0.0); len],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Switches to a new window length, reallocating the work buffers.
    pub fn prepare(&mut self, len: usize) {
        assert_radix2(len);
        if len == self.len() {
            return;
        }
        self.fft = self.planner.plan_fft_forward(len);
        self.window = hann_window(len);
        self.buffer = vec![Complex::new(0.0, 0.0); len];
        self.scratch = vec![Complex::new(0.0, 0.0); self.fft.get_inplace_scratch_len()];
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Writes the magnitude spectrum of `input` into `magnitudes`.
    ///
    /// # Panics
    /// If either slice differs from the prepared length.
    pub fn process(&mut self, input: &[f32], magnitudes: &mut [f32]) {
        let len = self.len();
        assert_eq!(input.len(), len, "input window length mismatch");
        assert_eq!(magnitudes.len(), len, "magnitude buffer length mismatch");

        for ((slot, &sample), &w) in self.buffer.iter_mut().zip(input).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }

        self.fft.process_with_scratch(&mut self.buffer, &mut self.scratch);

        for (mag, bin) in magnitudes.iter_mut().zip(&self.buffer) {
            *mag = bin.norm();
        }
    }

    /// Allocating convenience wrapper around `process`.
    pub fn magnitudes(&mut self, input: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0; self.len()];
        self.process(input, &mut out);
        out
    }
}

fn assert_radix2(len: usize) {
    assert!(
        len >= 2 && len.is_power_of_two(),
        "transform length {len} must be a power of two >= 2"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, amplitude: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| amplitude * (2.0 * PI * freq * n as f32 / sample_rate).sin())
            .collect()
    }

    fn peak_bin(mags: &[f32]) -> usize {
        mags[..mags.len() / 2]
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap()
    }

    #[test]
    fn hann_window_shape() {
        let w = hann_window(8);
        assert_eq!(w[0], 0.0);
        assert!((w[4] - 1.0).abs() < 1e-6);
        assert!((w[2] - w[6]).abs() < 1e-6);
    }

    #[test]
    fn silence_gives_zero_spectrum() {
        let mut t = SpectrumTransform::new(256);
        let mags = t.magnitudes(&[0.0; 256]);
        assert!(mags.iter().all(|&m| m == 0.0));
    }

    #[test]
    fn sine_peaks_at_expected_bin() {
        let (len, sr) = (1024, 48_000.0);
        let mut t = SpectrumTransform::new(len);
        for freq in [187.5_f32, 1000.0, 5000.0, 12_345.0] {
            let mags = t.magnitudes(&sine(freq, 0.5, sr, len));
            let expected = (freq * len as f32 / sr).round() as i64;
            let got = peak_bin(&mags) as i64;
            assert!((got - expected).abs() <= 1, "freq {freq}: expected ~{expected}, got {got}");
        }
    }

    #[test]
    fn spectrum_is_mirrored() {
        let len = 64;
        let mut t = SpectrumTransform::new(len);
        let mags = t.magnitudes(&sine(3000.0, 1.0, 48_000.0, len));
        for k in 1..len / 2 {
            assert!((mags[k] - mags[len - k]).abs() < 1e-3);
        }
    }

    #[test]
    fn prepare_switches_length() {
        let mut t = SpectrumTransform::new(16);
        t.prepare(32);
        assert_eq!(t.len(), 32);
        assert_eq!(t.magnitudes(&[0.0; 32]).len(), 32);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn rejects_non_power_of_two() {
        SpectrumTransform::new(100);
    }
}
