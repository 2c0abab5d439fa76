//! Clearwave Library
//!
//! Adaptive speech enhancement using short-time spectral analysis. A noisy
//! mono signal is transformed into overlapping spectrum frames, a running
//! noise-power estimate drives a per-bin Wiener gain optionally composed
//! with spectral subtraction, and the enhanced frames are reconstructed by
//! overlap-add. Every processing call produces a record of quality metrics
//! characterizing the transformation.

pub mod audio_io;
pub mod enhancer;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod stft;
pub mod window;

pub use error::EnhanceError;
pub use num_complex::Complex64;
pub use pipeline::{enhance_file, enhance_signal, PipelineConfig};
pub use rustfft; // Re-export rustfft for external use if needed

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
///
/// Sets up logging when the `env_logger` feature is enabled.
pub fn init() {
    #[cfg(feature = "env_logger")]
    {
        let _ = env_logger::try_init();
    }
}

/// Result type for enhancement operations
pub type Result<T> = std::result::Result<T, EnhanceError>;
