//! Error types for Folio Core

use thiserror::Error;

/// Result type alias for viewer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Viewer error types
#[derive(Error, Debug)]
pub enum Error {
    // Pipeline errors
    #[error("iiifResourceUri is required.")]
    MissingResourceReference,

    #[error("Failed to load manifest: {0}")]
    ManifestLoad(String),

    #[error("Sequence {0} not found.")]
    SequenceNotFound(usize),

    #[error("Canvas {0} not found.")]
    CanvasNotFound(usize),

    #[error("Failed to fetch configuration {uri}: {reason}")]
    ConfigurationFetch { uri: String, reason: String },

    // State errors
    #[error("Invalid pipeline state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("No active renderer")]
    NoActiveRenderer,

    #[error("Invalid crop region: {0}")]
    InvalidRegion(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // Transport errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration fetch error
    pub fn config_fetch(uri: impl Into<String>, reason: impl ToString) -> Self {
        Error::ConfigurationFetch {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true for the error kinds that terminate a pipeline run
    pub fn is_pipeline_failure(&self) -> bool {
        matches!(
            self,
            Error::MissingResourceReference
                | Error::ManifestLoad(_)
                | Error::SequenceNotFound(_)
                | Error::CanvasNotFound(_)
                | Error::ConfigurationFetch { .. }
        )
    }

    /// Returns the stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::MissingResourceReference => "MISSING_RESOURCE",
            Error::ManifestLoad(_) => "MANIFEST_LOAD",
            Error::SequenceNotFound(_) => "SEQUENCE_NOT_FOUND",
            Error::CanvasNotFound(_) => "CANVAS_NOT_FOUND",
            Error::ConfigurationFetch { .. } => "CONFIG_FETCH",
            Error::InvalidStateTransition { .. } => "INVALID_STATE",
            Error::NoActiveRenderer => "NO_RENDERER",
            Error::InvalidRegion(_) => "INVALID_REGION",
            Error::InvalidConfig(_) => "INVALID_CONFIG",
            Error::Network(_) => "NETWORK",
            Error::Json(_) => "JSON",
            Error::Io(_) => "IO",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_failures() {
        assert!(Error::MissingResourceReference.is_pipeline_failure());
        assert!(Error::CanvasNotFound(3).is_pipeline_failure());
        assert!(!Error::InvalidRegion("x".into()).is_pipeline_failure());
    }

    #[test]
    fn test_messages() {
        assert_eq!(Error::SequenceNotFound(2).to_string(), "Sequence 2 not found.");
        assert_eq!(Error::CanvasNotFound(7).to_string(), "Canvas 7 not found.");
        let err = Error::config_fetch("./folio/lib/a.json", "404");
        assert_eq!(err.error_code(), "CONFIG_FETCH");
        assert!(err.to_string().contains("./folio/lib/a.json"));
    }
}
