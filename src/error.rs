/// Error taxonomy for the mastering engine.
///
/// Three classes, matching how failures are actually handled upstream:
/// - `Fatal` errors abort construction or processing outright.
/// - `InputValidation` errors are raised only by explicit `validate_input`
///   calls, never implicitly inside an analyzer.
/// - Everything else (missing profile file, unrecognized user preference,
///   a low-confidence content match) is a warning, logged via `tracing` and
///   never surfaced as an `Err`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MasteringError {
    #[error("reference profile directory not found: {0}")]
    ProfileDirMissing(String),

    #[error("shape invariant violated: {0}")]
    ShapeInvariant(String),

    #[error("invalid configuration value for `{field}`: {message}")]
    InvalidConfig { field: String, message: String },

    #[error("sample rate must be finite and positive, got {0}")]
    InvalidSampleRate(f64),

    #[error("input validation failed: {0}")]
    InputValidation(String),

    #[error("failed to parse reference profile {path}: {source}")]
    ProfileParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read reference profile {path}: {source}")]
    ProfileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MasteringError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_descriptive() {
        let err = MasteringError::InvalidSampleRate(-1.0);
        assert!(err.to_string().contains("positive"));
    }
}
