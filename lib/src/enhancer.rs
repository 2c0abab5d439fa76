//! Adaptive speech-enhancement engine
//!
//! Consumes spectrum frames in time order, tracks a per-bin running noise
//! power estimate, and suppresses noise with a Wiener-style gain optionally
//! composed with magnitude-domain spectral subtraction. The noise estimate is
//! seeded from the first few frames of the signal being processed and then
//! adapted with a first-order recursion; there is no voice-activity gating,
//! so a high adaptation factor is used on the assumption that speech
//! dominates most frames.
//!
//! All engine state lives inside one `enhance` call. Independent calls share
//! nothing and may run concurrently.

use crate::error::EnhanceError;
use crate::stft::SpectrumFrame;
use crate::Result;
use num_complex::Complex64;
use std::sync::atomic::{AtomicBool, Ordering};

/// Floor applied to estimated speech power to avoid negative values
const PSD_FLOOR: f64 = 1e-10;

/// Engine configuration, validated before any processing begins
#[derive(Debug, Clone, Copy)]
pub struct EnhancerConfig {
    /// Noise adaptation factor in [0, 1); higher adapts slower
    pub alpha: f64,
    /// Number of initial frames seeding the noise estimate
    pub bootstrap_frames: usize,
    /// Apply the Wiener gain stage
    pub wiener: bool,
    /// Apply the magnitude-domain spectral subtraction stage
    pub spectral_subtraction: bool,
    /// Subtraction strength applied to the noise magnitude
    pub subtraction_factor: f64,
    /// Fraction of the observed magnitude kept as a floor, in [0, 1]
    pub subtraction_floor: f64,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            alpha: 0.98,
            bootstrap_frames: 5,
            wiener: true,
            spectral_subtraction: true,
            subtraction_factor: 0.8,
            subtraction_floor: 0.1,
        }
    }
}

impl EnhancerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.alpha) {
            return Err(EnhanceError::Config(format!(
                "adaptation factor {} out of range [0, 1)",
                self.alpha
            )));
        }
        if self.bootstrap_frames == 0 {
            return Err(EnhanceError::Config(
                "at least one bootstrap frame is required".to_string(),
            ));
        }
        if self.subtraction_factor < 0.0 || !self.subtraction_factor.is_finite() {
            return Err(EnhanceError::Config(format!(
                "subtraction factor {} must be finite and non-negative",
                self.subtraction_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.subtraction_floor) {
            return Err(EnhanceError::Config(format!(
                "subtraction floor {} out of range [0, 1]",
                self.subtraction_floor
            )));
        }
        Ok(())
    }
}

/// Per-bin running noise power estimate
///
/// First-order recursive filter: `psd = alpha * psd + (1 - alpha) * current`.
/// Created at the start of one processing call and discarded at its end.
#[derive(Debug, Clone)]
pub struct NoiseEstimate {
    psd: Vec<f64>,
    alpha: f64,
}

impl NoiseEstimate {
    pub fn new(psd: Vec<f64>, alpha: f64) -> Self {
        Self { psd, alpha }
    }

    /// Bootstrap the estimate from the mean power spectrum of the first
    /// `count` frames of the signal being processed
    pub fn from_frames(frames: &[SpectrumFrame], count: usize) -> Vec<f64> {
        let count = count.min(frames.len()).max(1);
        let bins = frames[0].bins.len();
        let mut psd = vec![0.0; bins];

        for frame in &frames[..count] {
            for (acc, bin) in psd.iter_mut().zip(frame.bins.iter()) {
                *acc += bin.norm_sqr();
            }
        }
        for value in psd.iter_mut() {
            *value /= count as f64;
        }
        psd
    }

    /// Advance the recursion by one frame. Non-finite input bins are skipped
    /// so a corrupt frame cannot poison the estimate.
    pub fn update(&mut self, current_psd: &[f64]) {
        for (est, &cur) in self.psd.iter_mut().zip(current_psd.iter()) {
            if cur.is_finite() {
                *est = self.alpha * *est + (1.0 - self.alpha) * cur;
            }
        }
    }

    pub fn psd(&self) -> &[f64] {
        &self.psd
    }
}

/// Result of one enhancement call: new frames plus the gain summaries the
/// metrics module reports
#[derive(Debug, Clone)]
pub struct Enhancement {
    /// Enhanced spectrum frames, same count and order as the input
    pub frames: Vec<SpectrumFrame>,
    /// Mean Wiener gain over all frames and bins (1.0 when the stage is off)
    pub mean_gain: f64,
    /// Mean subtraction strength actually applied (the configured factor
    /// where the floor did not bind, less where it did; config value when off)
    pub mean_subtraction: f64,
    /// True when any bin hit a NaN/Inf and was forced to zero gain
    pub degraded: bool,
}

/// The enhancement engine. Holds only configuration; per-call state is owned
/// by each `enhance` invocation.
pub struct Enhancer {
    config: EnhancerConfig,
}

impl Enhancer {
    pub fn new(config: EnhancerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EnhancerConfig {
        &self.config
    }

    /// Enhance a frame sequence to completion
    pub fn enhance(&self, frames: &[SpectrumFrame]) -> Result<Enhancement> {
        self.enhance_cancellable(frames, &AtomicBool::new(false))
    }

    /// Enhance with cooperative cancellation, checked once per frame.
    /// Frames are strictly sequential: each step's noise estimate depends on
    /// the previous step's update.
    pub fn enhance_cancellable(
        &self,
        frames: &[SpectrumFrame],
        cancel: &AtomicBool,
    ) -> Result<Enhancement> {
        if frames.is_empty() {
            return Err(EnhanceError::EmptySignal);
        }

        let cfg = &self.config;
        let bins = frames[0].bins.len();
        let mut noise = NoiseEstimate::new(
            NoiseEstimate::from_frames(frames, cfg.bootstrap_frames),
            cfg.alpha,
        );

        let mut output = Vec::with_capacity(frames.len());
        let mut current_psd = vec![0.0; bins];
        let mut degraded = false;
        let mut gain_sum = 0.0;
        let mut gain_count = 0u64;
        let mut sub_sum = 0.0;
        let mut sub_count = 0u64;

        for frame in frames {
            if cancel.load(Ordering::Relaxed) {
                return Err(EnhanceError::Cancelled);
            }

            for (psd, bin) in current_psd.iter_mut().zip(frame.bins.iter()) {
                *psd = bin.norm_sqr();
            }
            noise.update(&current_psd);

            let mut enhanced = frame.bins.clone();
            let mut bad_bins = 0usize;

            for (i, value) in enhanced.iter_mut().enumerate() {
                // A NaN/Inf bin gets zero gain and is excluded from the
                // summaries; processing continues
                if !current_psd[i].is_finite() {
                    *value = Complex64::new(0.0, 0.0);
                    bad_bins += 1;
                    continue;
                }

                let noise_psd = noise.psd()[i];
                let speech_psd = (current_psd[i] - noise_psd).max(PSD_FLOOR);
                let mut gain = speech_psd / (speech_psd + noise_psd);

                if !gain.is_finite() {
                    gain = 0.0;
                    bad_bins += 1;
                }
                gain = gain.clamp(0.0, 1.0);

                if cfg.wiener {
                    *value *= gain;
                    gain_sum += gain;
                    gain_count += 1;
                }

                if cfg.spectral_subtraction {
                    let magnitude = value.norm();
                    let noise_mag = noise_psd.sqrt();
                    let subtracted = magnitude - cfg.subtraction_factor * noise_mag;
                    let floor_mag = cfg.subtraction_floor * magnitude;
                    let target = subtracted.max(floor_mag);

                    // Strength actually achieved: equals the configured factor
                    // except where the magnitude floor limits the subtraction
                    if noise_mag > PSD_FLOOR {
                        let applied = (magnitude - target) / noise_mag;
                        sub_sum += applied.clamp(0.0, cfg.subtraction_factor);
                        sub_count += 1;
                    }

                    // Rescale magnitude, phase unchanged
                    if magnitude > 0.0 {
                        *value *= target / magnitude;
                    }
                }

                if !value.re.is_finite() || !value.im.is_finite() {
                    *value = Complex64::new(0.0, 0.0);
                    bad_bins += 1;
                }
            }

            if bad_bins > 0 {
                degraded = true;
                log::warn!(
                    "frame {}: {} non-finite bins forced to zero gain",
                    frame.index,
                    bad_bins
                );
            }

            output.push(SpectrumFrame {
                bins: enhanced,
                index: frame.index,
                position: frame.position,
            });
        }

        let mean_gain = if gain_count > 0 {
            gain_sum / gain_count as f64
        } else {
            1.0
        };
        let mean_subtraction = if sub_count > 0 {
            sub_sum / sub_count as f64
        } else {
            cfg.subtraction_factor
        };

        Ok(Enhancement {
            frames: output,
            mean_gain,
            mean_subtraction,
            degraded,
        })
    }
}
