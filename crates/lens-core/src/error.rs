//! Error types for the ViralLens workspace.

use thiserror::Error;

/// Result type alias using the workspace Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ViralLens operations.
///
/// Variants line up with the error taxonomy surfaced to users: validation
/// (`InvalidInput`), per-file processing (`Extraction`), synthesis, generation
/// of ideas or visuals, and persistence (`Storage`, `QuotaExceeded`). None of
/// them is fatal to the process.
#[derive(Error, Debug)]
pub enum Error {
    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Text extraction failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Inference/generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Research synthesis failed or could not start
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Content idea generation failed
    #[error("Idea generation error: {0}")]
    IdeaGeneration(String),

    /// Visual generation failed
    #[error("Image generation error: {0}")]
    ImageGeneration(String),

    /// Persistence backend failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Persistence backend ran out of space
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The bare message without the category prefix, as shown next to a file or idea.
    pub fn detail(&self) -> String {
        match self {
            Error::NotFound(m)
            | Error::InvalidInput(m)
            | Error::Extraction(m)
            | Error::Inference(m)
            | Error::Synthesis(m)
            | Error::IdeaGeneration(m)
            | Error::ImageGeneration(m)
            | Error::Storage(m)
            | Error::QuotaExceeded(m)
            | Error::Serialization(m)
            | Error::Config(m)
            | Error::Request(m)
            | Error::Internal(m) => m.clone(),
            Error::Io(e) => e.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("notebook nb-1".to_string());
        assert_eq!(err.to_string(), "Not found: notebook nb-1");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("Notebook name is required.".to_string());
        assert_eq!(err.to_string(), "Invalid input: Notebook name is required.");
    }

    #[test]
    fn test_error_display_synthesis() {
        let err = Error::Synthesis("no items".to_string());
        assert_eq!(err.to_string(), "Synthesis error: no items");
    }

    #[test]
    fn test_error_display_quota() {
        let err = Error::QuotaExceeded("5 bytes over".to_string());
        assert_eq!(err.to_string(), "Storage quota exceeded: 5 bytes over");
    }

    #[test]
    fn test_error_detail_strips_prefix() {
        let err = Error::IdeaGeneration("Please perform AI Research Synthesis first.".to_string());
        assert_eq!(err.detail(), "Please perform AI Research Synthesis first.");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.detail(), "missing");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
