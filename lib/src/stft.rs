//! Short-Time Fourier Transform layer
//!
//! Forward analysis and inverse synthesis over fixed-size overlapping frames.
//! The analyzer uses a drop policy at the signal tail: trailing samples
//! shorter than one frame are discarded, so the number of frames for a signal
//! of length `L` is `(L - fft_size) / hop_size + 1`. The synthesizer
//! reconstructs by overlap-add, normalizing each output sample by the sum of
//! squared window overlaps at that position, which makes a forward/inverse
//! round trip exact up to floating-point error wherever frames overlap.

use crate::error::EnhanceError;
use crate::window::{generate_window, WindowType};
use crate::Result;
use num_complex::Complex64;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use std::sync::Arc;

/// Samples with squared-window coverage below this are left at zero
const OVERLAP_NORM_FLOOR: f64 = 1e-12;

/// Transform layer configuration, fixed for the duration of one call
#[derive(Debug, Clone, Copy)]
pub struct StftConfig {
    /// Frame and FFT length in samples, power of two
    pub fft_size: usize,
    /// Step between consecutive frames, at most `fft_size`
    pub hop_size: usize,
    /// Analysis/synthesis window
    pub window_type: WindowType,
}

impl Default for StftConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            hop_size: 512,
            window_type: WindowType::Hann,
        }
    }
}

impl StftConfig {
    /// Create a configuration, rejecting inconsistent parameters up front
    pub fn new(fft_size: usize, hop_size: usize, window_type: WindowType) -> Result<Self> {
        let config = Self {
            fft_size,
            hop_size,
            window_type,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the parameter set without constructing anything
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() || self.fft_size < 64 || self.fft_size > 65536 {
            return Err(EnhanceError::Config(format!(
                "FFT size must be a power of 2 between 64 and 65536, got {}",
                self.fft_size
            )));
        }
        if self.hop_size == 0 {
            return Err(EnhanceError::Config("hop size must be at least 1".to_string()));
        }
        if self.hop_size > self.fft_size {
            return Err(EnhanceError::Config(format!(
                "hop size {} exceeds FFT size {}",
                self.hop_size, self.fft_size
            )));
        }
        Ok(())
    }

    /// Number of frequency bins per spectrum frame (real transform)
    pub fn bins(&self) -> usize {
        self.fft_size / 2 + 1
    }

    /// Frame count produced by the drop policy for a signal of `len` samples
    pub fn num_frames(&self, len: usize) -> usize {
        if len < self.fft_size {
            0
        } else {
            (len - self.fft_size) / self.hop_size + 1
        }
    }
}

/// One complex spectrum frame of `fft_size / 2 + 1` bins
#[derive(Debug, Clone)]
pub struct SpectrumFrame {
    /// Complex frequency-domain bins
    pub bins: Vec<Complex64>,
    /// Frame index in analysis order
    pub index: usize,
    /// Start position of the frame in samples
    pub position: usize,
}

impl SpectrumFrame {
    /// Per-bin magnitude spectrum
    pub fn magnitudes(&self) -> Vec<f64> {
        self.bins.iter().map(|c| c.norm()).collect()
    }

    /// Per-bin power spectrum
    pub fn power(&self) -> Vec<f64> {
        self.bins.iter().map(|c| c.norm_sqr()).collect()
    }
}

/// Forward transform: signal to spectrum frames
pub struct StftAnalyzer {
    config: StftConfig,
    window: Vec<f64>,
    fft: Arc<dyn RealToComplex<f64>>,
}

impl StftAnalyzer {
    pub fn new(config: StftConfig) -> Result<Self> {
        config.validate()?;
        let window = generate_window(config.window_type, config.fft_size);
        let fft = RealFftPlanner::<f64>::new().plan_fft_forward(config.fft_size);

        Ok(Self {
            config,
            window,
            fft,
        })
    }

    pub fn config(&self) -> &StftConfig {
        &self.config
    }

    /// Analyze a signal into spectrum frames, in strict time order.
    ///
    /// Deterministic and restartable: the same input always produces the same
    /// frame sequence. Fails with `EmptySignal` when the signal is empty or
    /// shorter than one frame.
    pub fn analyze(&self, samples: &[f64]) -> Result<Vec<SpectrumFrame>> {
        let fft_size = self.config.fft_size;
        let num_frames = self.config.num_frames(samples.len());

        if num_frames == 0 {
            return Err(EnhanceError::EmptySignal);
        }

        let mut frames = Vec::with_capacity(num_frames);
        let mut windowed = vec![0.0; fft_size];

        for index in 0..num_frames {
            let position = index * self.config.hop_size;

            for (i, &sample) in samples[position..position + fft_size].iter().enumerate() {
                windowed[i] = sample * self.window[i];
            }

            let mut bins = vec![Complex64::new(0.0, 0.0); self.config.bins()];
            self.fft
                .process(&mut windowed, &mut bins)
                .map_err(|e| EnhanceError::Transform(format!("forward FFT failed: {}", e)))?;

            frames.push(SpectrumFrame {
                bins,
                index,
                position,
            });
        }

        Ok(frames)
    }
}

/// Inverse transform: spectrum frames back to a signal
pub struct StftSynthesizer {
    config: StftConfig,
    window: Vec<f64>,
    ifft: Arc<dyn ComplexToReal<f64>>,
}

impl StftSynthesizer {
    pub fn new(config: StftConfig) -> Result<Self> {
        config.validate()?;
        let window = generate_window(config.window_type, config.fft_size);
        let ifft = RealFftPlanner::<f64>::new().plan_fft_inverse(config.fft_size);

        Ok(Self {
            config,
            window,
            ifft,
        })
    }

    pub fn config(&self) -> &StftConfig {
        &self.config
    }

    /// Reconstruct a signal by overlap-add of the given frames.
    ///
    /// Fails with `Transform` when the frame list is empty or any frame's bin
    /// count does not match `fft_size / 2 + 1`.
    pub fn synthesize(&self, frames: &[SpectrumFrame]) -> Result<Vec<f64>> {
        let fft_size = self.config.fft_size;
        let bins = self.config.bins();

        let last = frames
            .last()
            .ok_or_else(|| EnhanceError::Transform("no spectrum frames to synthesize".to_string()))?;

        let output_len = last.position + fft_size;
        let mut output = vec![0.0; output_len];
        let mut window_sq_sum = vec![0.0; output_len];
        let mut time_data = vec![0.0; fft_size];

        for frame in frames {
            if frame.bins.len() != bins {
                return Err(EnhanceError::Transform(format!(
                    "frame {} has {} bins, expected {}",
                    frame.index,
                    frame.bins.len(),
                    bins
                )));
            }

            // The inverse plan consumes its input; DC and Nyquist must be real
            let mut spectrum = frame.bins.clone();
            spectrum[0].im = 0.0;
            spectrum[bins - 1].im = 0.0;

            self.ifft
                .process(&mut spectrum, &mut time_data)
                .map_err(|e| EnhanceError::Transform(format!("inverse FFT failed: {}", e)))?;

            for (i, &sample) in time_data.iter().enumerate() {
                let pos = frame.position + i;
                // realfft leaves the inverse unscaled by 1/N
                output[pos] += sample * self.window[i] / fft_size as f64;
                window_sq_sum[pos] += self.window[i] * self.window[i];
            }
        }

        for (sample, &sq_sum) in output.iter_mut().zip(window_sq_sum.iter()) {
            if sq_sum > OVERLAP_NORM_FLOOR {
                *sample /= sq_sum;
            }
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(len: usize, freq: f64, sample_rate: f64) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_config_defaults() {
        let config = StftConfig::default();
        assert_eq!(config.fft_size, 2048);
        assert_eq!(config.hop_size, 512);
        assert_eq!(config.bins(), 1025);
    }

    #[test]
    fn test_config_validation() {
        assert!(StftConfig::new(1024, 256, WindowType::Hann).is_ok());
        // hop exceeding frame length would leave gaps
        assert!(StftConfig::new(1024, 2048, WindowType::Hann).is_err());
        assert!(StftConfig::new(1000, 256, WindowType::Hann).is_err());
        assert!(StftConfig::new(1024, 0, WindowType::Hann).is_err());
    }

    #[test]
    fn test_frame_count_drop_policy() {
        let config = StftConfig::new(2048, 512, WindowType::Hann).unwrap();
        // floor((len - N) / H) + 1
        assert_eq!(config.num_frames(16000), (16000 - 2048) / 512 + 1);
        assert_eq!(config.num_frames(2048), 1);
        assert_eq!(config.num_frames(2047), 0);

        let analyzer = StftAnalyzer::new(config).unwrap();
        let frames = analyzer.analyze(&sine(16000, 440.0, 16000.0)).unwrap();
        assert_eq!(frames.len(), config.num_frames(16000));
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.index, i);
            assert_eq!(frame.position, i * 512);
            assert_eq!(frame.bins.len(), 1025);
        }
    }

    #[test]
    fn test_empty_signal() {
        let analyzer = StftAnalyzer::new(StftConfig::default()).unwrap();
        assert!(matches!(
            analyzer.analyze(&[]),
            Err(EnhanceError::EmptySignal)
        ));
    }

    #[test]
    fn test_synthesize_rejects_bad_input() {
        let config = StftConfig::new(1024, 256, WindowType::Hann).unwrap();
        let synthesizer = StftSynthesizer::new(config).unwrap();

        assert!(matches!(
            synthesizer.synthesize(&[]),
            Err(EnhanceError::Transform(_))
        ));

        let bad_frame = SpectrumFrame {
            bins: vec![Complex64::new(0.0, 0.0); 100],
            index: 0,
            position: 0,
        };
        assert!(matches!(
            synthesizer.synthesize(&[bad_frame]),
            Err(EnhanceError::Transform(_))
        ));
    }

    #[test]
    fn test_round_trip() {
        let config = StftConfig::new(1024, 256, WindowType::Hann).unwrap();
        let analyzer = StftAnalyzer::new(config).unwrap();
        let synthesizer = StftSynthesizer::new(config).unwrap();

        let signal = sine(16000, 440.0, 16000.0);
        let frames = analyzer.analyze(&signal).unwrap();
        let reconstructed = synthesizer.synthesize(&frames).unwrap();

        assert!(reconstructed.len() <= signal.len());

        // Interior samples have full window coverage; edges do not
        let start = config.fft_size;
        let end = reconstructed.len() - config.fft_size;
        let max_error = (start..end)
            .map(|i| (signal[i] - reconstructed[i]).abs())
            .fold(0.0f64, f64::max);
        assert!(max_error < 1e-6, "round-trip error too large: {}", max_error);
    }
}
