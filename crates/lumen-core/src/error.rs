//! Error types for the Lumen model store.
//!
//! Naming failures have their own enum so callers can tell a filename that
//! does not parse apart from a model/labels pair whose fields disagree.
//! Everything else surfaces through [`LumenError`].

use crate::installer::InstallState;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the `name-width-height-version[suffix]` grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamingError {
    #[error("'{filename}' must follow the convention name-width-height-version{expected_suffix}")]
    Malformed {
        filename: String,
        expected_suffix: String,
    },

    #[error("'{filename}' has an invalid {dimension} '{value}' (expected a positive integer)")]
    InvalidDimension {
        filename: String,
        dimension: &'static str,
        value: String,
    },

    #[error("Unknown model version '{tag}' in '{filename}'")]
    UnknownVersion { filename: String, tag: String },

    #[error("Model name '{model}' and labels name '{labels}' parts must match")]
    CompanionMismatch { model: String, labels: String },
}

impl NamingError {
    /// True when both names parsed but their fields differ.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, NamingError::CompanionMismatch { .. })
    }
}

/// Main error type for the model store.
#[derive(Debug, Error)]
pub enum LumenError {
    // Naming errors
    #[error("Invalid artifact name: {0}")]
    Naming(#[from] NamingError),

    // Discovery / load errors
    #[error("Could not find expected labels file: {0}")]
    MissingLabelsFile(PathBuf),

    #[error("Failed to read labels file {path}: {message}")]
    UnreadableLabelsFile {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Path {path} is not a {expected} artifact")]
    NotOwned { path: PathBuf, expected: String },

    // Upload errors
    #[error("Unsupported file pair (model: {model}, labels: {labels}); expected model types: {accepted} with matching -labels.txt")]
    NoHandlerForUpload {
        model: String,
        labels: String,
        accepted: String,
    },

    #[error("File validation failed: {0}")]
    UploadRejected(String),

    // Install errors
    #[error("Install failed while {state}: {message}")]
    InstallStepFailure {
        state: InstallState,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Archive entry '{entry}' resolves outside of {target}")]
    PathTraversalRejected { entry: String, target: PathBuf },

    // Catalog errors
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Generic errors
    #[error("{0}")]
    Other(String),
}

/// Result type alias for model store operations.
pub type Result<T> = std::result::Result<T, LumenError>;

impl From<std::io::Error> for LumenError {
    fn from(err: std::io::Error) -> Self {
        LumenError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl LumenError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        LumenError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create an install failure for the step that was running in `state`.
    pub fn install_step(
        state: InstallState,
        message: impl Into<String>,
        source: Option<std::io::Error>,
    ) -> Self {
        LumenError::InstallStepFailure {
            state,
            message: message.into(),
            source,
        }
    }

    /// Whether the error was caused by the caller's input rather than the
    /// host (bad names, unsupported uploads, hostile archives).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            LumenError::Naming(_)
                | LumenError::NoHandlerForUpload { .. }
                | LumenError::UploadRejected(_)
                | LumenError::PathTraversalRejected { .. }
                | LumenError::ModelNotFound(_)
        )
    }

    /// The install step that failed, if this is an install failure.
    pub fn failed_state(&self) -> Option<InstallState> {
        match self {
            LumenError::InstallStepFailure { state, .. } => Some(*state),
            LumenError::PathTraversalRejected { .. } => Some(InstallState::ArchiveStaged),
            _ => None,
        }
    }
}
