//! Error types for the enhancement pipeline
//!
//! All fatal conditions are typed and surfaced to the immediate caller.
//! Recoverable numeric issues (NaN/Inf in a gain computation) are not errors;
//! they are handled in place and reported through the degraded flag on the
//! metrics record.

use std::fmt;

/// Errors produced by the transform layer, the enhancement engine, and the
/// file I/O boundary around them.
#[derive(Debug)]
pub enum EnhanceError {
    /// Inconsistent configuration parameters, rejected before any processing
    Config(String),

    /// Zero-length or all-silent input signal
    EmptySignal,

    /// Malformed spectrum-frame input to the inverse transform
    Transform(String),

    /// Processing was cancelled between frame iterations
    Cancelled,

    /// File I/O failure at the ingestion or persistence boundary
    Io(std::io::Error),

    /// Audio decoding failure
    Decode(String),
}

impl fmt::Display for EnhanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnhanceError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
            EnhanceError::EmptySignal => write!(f, "Input signal is empty or silent"),
            EnhanceError::Transform(msg) => write!(f, "Transform error: {}", msg),
            EnhanceError::Cancelled => write!(f, "Processing cancelled"),
            EnhanceError::Io(err) => write!(f, "I/O error: {}", err),
            EnhanceError::Decode(msg) => write!(f, "Audio decode error: {}", msg),
        }
    }
}

impl std::error::Error for EnhanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EnhanceError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EnhanceError {
    fn from(err: std::io::Error) -> Self {
        EnhanceError::Io(err)
    }
}

impl From<hound::Error> for EnhanceError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => EnhanceError::Io(io),
            other => EnhanceError::Decode(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = EnhanceError::Config("hop size 4096 exceeds FFT size 2048".to_string());
        assert!(err.to_string().contains("hop size 4096"));
        assert_eq!(
            EnhanceError::EmptySignal.to_string(),
            "Input signal is empty or silent"
        );
    }

    #[test]
    fn test_io_source() {
        use std::error::Error;
        let err: EnhanceError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(err.source().is_some());
    }
}
