use crate::error::{Error, Result};

/// Immutable result of one transform: parallel frequency/magnitude arrays of
/// length N, with `frequencies[i] = i * sample_rate / N`.
#[derive(Clone, Debug)]
pub struct Spectrum {
    pub frequencies: Vec<f32>,
    pub magnitudes: Vec<f32>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }
}

struct Butterfly {
    lo: usize,
    hi: usize,
    twiddle: usize,
}

/// Table-driven iterative radix-2 FFT.
///
/// All preparation happens in `new`: the bit-reversal permutation, the N/2
/// unit-root powers, and the butterfly schedule for each of the log2(N)
/// passes. `transform` then runs on the live audio thread with nothing but
/// table lookups and multiply-adds - no recursion, no allocation beyond the
/// output spectrum itself.
pub struct SpectrumEngine {
    size: usize,
    reverse: Vec<usize>,
    twiddle_re: Vec<f32>,
    twiddle_im: Vec<f32>,
    passes: Vec<Vec<Butterfly>>,
    frequencies: Vec<f32>,
    work_re: Vec<f32>,
    work_im: Vec<f32>,
}

impl SpectrumEngine {
    pub fn new(size: usize, sample_rate: f32) -> Result<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(Error::FftSizeNotPowerOfTwo(size));
        }

        let bits = size.trailing_zeros() as usize;

        let mut reverse = vec![0usize; size];
        for (i, slot) in reverse.iter_mut().enumerate() {
            *slot = i.reverse_bits() >> (usize::BITS as usize - bits);
        }

        let mut twiddle_re = Vec::with_capacity(size / 2);
        let mut twiddle_im = Vec::with_capacity(size / 2);
        for k in 0..size / 2 {
            let angle = -2.0 * std::f32::consts::PI * k as f32 / size as f32;
            twiddle_re.push(angle.cos());
            twiddle_im.push(angle.sin());
        }

        // For pass p the butterflies span blocks of 2^(p+1) slots; the j-th
        // pair in a block uses root j * N / 2^(p+1).
        let mut passes = Vec::with_capacity(bits);
        for p in 0..bits {
            let half = 1 << p;
            let span = half * 2;
            let step = size / span;
            let mut pass = Vec::with_capacity(size / 2);
            for start in (0..size).step_by(span) {
                for j in 0..half {
                    pass.push(Butterfly {
                        lo: start + j,
                        hi: start + j + half,
                        twiddle: j * step,
                    });
                }
            }
            passes.push(pass);
        }

        let frequencies = (0..size)
            .map(|i| i as f32 * sample_rate / size as f32)
            .collect();

        Ok(Self {
            size,
            reverse,
            twiddle_re,
            twiddle_im,
            passes,
            frequencies,
            work_re: vec![0.0; size],
            work_im: vec![0.0; size],
        })
    }

    pub fn transform(&mut self, samples: &[f32]) -> Result<Spectrum> {
        if samples.len() != self.size {
            return Err(Error::WindowLength {
                expected: self.size,
                got: samples.len(),
            });
        }

        for (i, &rev) in self.reverse.iter().enumerate() {
            self.work_re[i] = samples[rev];
            self.work_im[i] = 0.0;
        }

        for pass in &self.passes {
            for bf in pass {
                let wr = self.twiddle_re[bf.twiddle];
                let wi = self.twiddle_im[bf.twiddle];
                let tr = wr * self.work_re[bf.hi] - wi * self.work_im[bf.hi];
                let ti = wr * self.work_im[bf.hi] + wi * self.work_re[bf.hi];
                self.work_re[bf.hi] = self.work_re[bf.lo] - tr;
                self.work_im[bf.hi] = self.work_im[bf.lo] - ti;
                self.work_re[bf.lo] += tr;
                self.work_im[bf.lo] += ti;
            }
        }

        let magnitudes = self
            .work_re
            .iter()
            .zip(self.work_im.iter())
            .map(|(re, im)| (re * re + im * im).sqrt())
            .collect();

        Ok(Spectrum {
            frequencies: self.frequencies.clone(),
            magnitudes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::{num_complex::Complex, FftPlanner};

    /// Naive O(N^2) DFT used as the correctness oracle.
    fn naive_dft(samples: &[f32]) -> Vec<f32> {
        let n = samples.len();
        (0..n)
            .map(|k| {
                let (mut re, mut im) = (0.0f64, 0.0f64);
                for (i, &s) in samples.iter().enumerate() {
                    let angle = -2.0 * std::f64::consts::PI * (k * i) as f64 / n as f64;
                    re += s as f64 * angle.cos();
                    im += s as f64 * angle.sin();
                }
                (re * re + im * im).sqrt() as f32
            })
            .collect()
    }

    fn sine(freq: f32, sample_rate: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert!(SpectrumEngine::new(1000, 44100.0).is_err());
        assert!(SpectrumEngine::new(0, 44100.0).is_err());
        assert!(SpectrumEngine::new(1, 44100.0).is_err());
    }

    #[test]
    fn rejects_wrong_input_length() {
        let mut engine = SpectrumEngine::new(64, 44100.0).unwrap();
        assert!(engine.transform(&vec![0.0; 63]).is_err());
        assert!(engine.transform(&vec![0.0; 128]).is_err());
    }

    #[test]
    fn frequency_axis_is_linear() {
        let mut engine = SpectrumEngine::new(8, 8000.0).unwrap();
        let spectrum = engine.transform(&vec![0.0; 8]).unwrap();
        for (i, f) in spectrum.frequencies.iter().enumerate() {
            assert_eq!(*f, i as f32 * 1000.0);
        }
    }

    #[test]
    fn matches_naive_dft() {
        for &n in &[16usize, 64, 256] {
            let samples: Vec<f32> = (0..n)
                .map(|i| ((i * 7919 + 13) % 101) as f32 / 101.0 - 0.5)
                .collect();

            let mut engine = SpectrumEngine::new(n, 44100.0).unwrap();
            let spectrum = engine.transform(&samples).unwrap();
            let oracle = naive_dft(&samples);

            for (got, want) in spectrum.magnitudes.iter().zip(oracle.iter()) {
                assert!(
                    (got - want).abs() < 1e-2 * n as f32 / 64.0 + 1e-3,
                    "magnitude mismatch for N={}: {} vs {}",
                    n,
                    got,
                    want
                );
            }
        }
    }

    #[test]
    fn matches_rustfft() {
        let n = 512;
        let samples = sine(1234.0, 44100.0, n);

        let mut engine = SpectrumEngine::new(n, 44100.0).unwrap();
        let spectrum = engine.transform(&samples).unwrap();

        let mut buf: Vec<Complex<f32>> =
            samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
        FftPlanner::new().plan_fft_forward(n).process(&mut buf);

        for (got, c) in spectrum.magnitudes.iter().zip(buf.iter()) {
            assert!((got - c.norm()).abs() < 1e-2, "{} vs {}", got, c.norm());
        }
    }

    #[test]
    fn sine_peaks_at_expected_bin() {
        for &(n, freq, sample_rate) in &[
            (256usize, 1000.0f32, 8000.0f32),
            (1024, 440.0, 44100.0),
            (2048, 60.0, 44100.0),
        ] {
            let samples = sine(freq, sample_rate, n);
            let mut engine = SpectrumEngine::new(n, sample_rate).unwrap();
            let spectrum = engine.transform(&samples).unwrap();

            // Only inspect the first half; the upper half mirrors it.
            let peak = spectrum.magnitudes[..n / 2]
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
                .map(|(i, _)| i)
                .unwrap();

            let expected = (freq * n as f32 / sample_rate).round() as usize;
            assert!(
                peak.abs_diff(expected) <= 1,
                "N={} freq={}: peak at bin {}, expected {}",
                n,
                freq,
                peak,
                expected
            );
        }
    }

    #[test]
    fn repeated_transforms_are_stable() {
        let n = 128;
        let samples = sine(500.0, 8000.0, n);
        let mut engine = SpectrumEngine::new(n, 8000.0).unwrap();

        let first = engine.transform(&samples).unwrap();
        let second = engine.transform(&samples).unwrap();
        assert_eq!(first.magnitudes, second.magnitudes);
    }
}
