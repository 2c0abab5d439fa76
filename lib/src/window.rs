//! Window functions for STFT analysis and synthesis
//!
//! Hann is the default analysis window for speech material; Hamming and
//! Rectangular are kept for experimentation.

use std::f64::consts::PI;
use std::fmt;

/// Window function types available for the transform layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    /// Hann window (default)
    #[default]
    Hann,
    /// Hamming window
    Hamming,
    /// Rectangular window (no windowing)
    Rectangular,
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl WindowType {
    pub fn name(&self) -> &'static str {
        match self {
            WindowType::Hann => "Hann",
            WindowType::Hamming => "Hamming",
            WindowType::Rectangular => "Rectangular",
        }
    }
}

/// Generate a window of the given type and size
pub fn generate_window(window_type: WindowType, size: usize) -> Vec<f64> {
    let mut window = vec![0.0; size];

    match window_type {
        WindowType::Hann => {
            let n = (size - 1) as f64;
            for (i, w) in window.iter_mut().enumerate() {
                *w = 0.5 * (1.0 - (2.0 * PI * i as f64 / n).cos());
            }
        }
        WindowType::Hamming => {
            let n = (size - 1) as f64;
            for (i, w) in window.iter_mut().enumerate() {
                *w = 0.54 - 0.46 * (2.0 * PI * i as f64 / n).cos();
            }
        }
        WindowType::Rectangular => window.fill(1.0),
    }

    window
}
