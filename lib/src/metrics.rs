//! Quality metrics for one enhancement call
//!
//! Pure functions over the original and enhanced signals and spectra. Every
//! field of the record is genuinely computed from the processed data; nothing
//! here carries hidden state, so repeated computation on the same inputs is
//! bit-identical.

use crate::stft::SpectrumFrame;
use std::time::Duration;

/// Epsilon added before logarithms to avoid -inf on silence
const LOG_EPS: f64 = 1e-10;

/// Residual power below this is treated as a perfect block and skipped in
/// the segmental SNR average
const RESIDUAL_FLOOR: f64 = 1e-10;

/// The eight scalar quality measures of one processing call, plus the
/// numeric-degradation flag. Immutable once computed.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRecord {
    /// Whole-signal power in dB
    pub signal_power_db: f64,
    /// Power of the noise-bootstrap prefix in dB
    pub noise_power_db: f64,
    /// Signal-to-noise ratio of the input in dB, floored at zero
    pub input_snr_db: f64,
    /// Mean Wiener gain actually applied
    pub wiener_gain: f64,
    /// Mean spectral-subtraction strength actually applied
    pub subtraction_factor: f64,
    /// RMS distance between original and enhanced magnitude spectra
    pub spectral_distance: f64,
    /// Block-wise SNR of the enhancement residual in dB
    pub segmental_snr_db: f64,
    /// Wall-clock duration of the full pipeline call
    pub processing_duration: Duration,
    /// True when any gain computation hit a NaN/Inf and was recovered
    pub degraded: bool,
}

/// Root-mean-square amplitude of a signal
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean_sq = samples.iter().map(|&s| s * s).sum::<f64>() / samples.len() as f64;
    mean_sq.sqrt()
}

/// Signal power in dB relative to full scale
pub fn signal_power_db(samples: &[f64]) -> f64 {
    20.0 * (rms(samples) + LOG_EPS).log10()
}

/// Noise power in dB, estimated from the bootstrap prefix of the signal
/// (`frame_len * num_frames` samples, clipped to the signal length)
pub fn noise_power_db(samples: &[f64], frame_len: usize, num_frames: usize) -> f64 {
    let prefix = (frame_len * num_frames).min(samples.len());
    signal_power_db(&samples[..prefix])
}

/// Input SNR in dB. Floored at zero: when the noise estimate exceeds the
/// signal power the result is exactly 0.0, never negative.
pub fn input_snr_db(signal_db: f64, noise_db: f64) -> f64 {
    (signal_db - noise_db).max(0.0)
}

/// RMS difference between original and enhanced magnitude spectra over all
/// frames and bins
pub fn spectral_distance(original: &[SpectrumFrame], enhanced: &[SpectrumFrame]) -> f64 {
    let mut sum_sq = 0.0;
    let mut count = 0u64;

    for (orig, enh) in original.iter().zip(enhanced.iter()) {
        for (o, e) in orig.bins.iter().zip(enh.bins.iter()) {
            let diff = o.norm() - e.norm();
            sum_sq += diff * diff;
            count += 1;
        }
    }

    if count == 0 {
        0.0
    } else {
        (sum_sq / count as f64).sqrt()
    }
}

/// Segmental SNR in dB over non-overlapping blocks of `block_len` samples.
///
/// Each block contributes `10 * log10(signal_power / residual_power)` where
/// the residual is original minus enhanced. Blocks whose residual power is
/// effectively zero are skipped; an empty average yields 0.0.
pub fn segmental_snr(original: &[f64], enhanced: &[f64], block_len: usize) -> f64 {
    if block_len == 0 {
        return 0.0;
    }
    let len = original.len().min(enhanced.len());
    let num_blocks = len / block_len;

    let mut sum = 0.0;
    let mut count = 0u64;

    for block in 0..num_blocks {
        let start = block * block_len;
        let end = start + block_len;

        let mut signal_power = 0.0;
        let mut residual_power = 0.0;
        for i in start..end {
            let residual = original[i] - enhanced[i];
            signal_power += original[i] * original[i];
            residual_power += residual * residual;
        }
        signal_power /= block_len as f64;
        residual_power /= block_len as f64;

        if residual_power > RESIDUAL_FLOOR {
            let snr = 10.0 * (signal_power / (residual_power + LOG_EPS)).log10();
            if snr.is_finite() {
                sum += snr;
                count += 1;
            }
        }
    }

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
