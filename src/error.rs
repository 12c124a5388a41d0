//! Error types for Deepview.
//!
//! This module provides a unified error handling approach using `thiserror`.
//! Loader failures and path failures are typed; render failures never leave
//! the renderer (see [`crate::render`]).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Deepview operations.
pub type Result<T> = std::result::Result<T, DeepviewError>;

/// Boxed cause kept behind a [`DeepviewError::Decode`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in Deepview.
#[derive(Debug, Error)]
pub enum DeepviewError {
    /// The requested file does not exist.
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    /// No decoder is registered for the file extension.
    #[error("Unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },

    /// The decoder for this format is not compiled in.
    #[error("{format} files need {dependency}, which is not available in this build")]
    MissingDependency {
        format: String,
        dependency: String,
    },

    /// Decoding failed; the underlying cause is kept for display.
    #[error("Failed to load file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// A path could not be resolved against the current document.
    #[error(transparent)]
    Path(#[from] PathError),

    /// Failed to access clipboard.
    #[error("Clipboard error: {0}")]
    Clipboard(#[from] arboard::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The background load worker is gone.
    #[error("Load worker stopped")]
    WorkerStopped,
}

impl DeepviewError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Create an UnsupportedFormat error.
    pub fn unsupported_format(extension: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    /// Create a MissingDependency error.
    pub fn missing_dependency(format: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self::MissingDependency {
            format: format.into(),
            dependency: dependency.into(),
        }
    }

    /// Create a Decode error wrapping any underlying failure.
    pub fn decode(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::Decode {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Short machine-friendly name of the error category.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::UnsupportedFormat { .. } => "UnsupportedFormat",
            Self::MissingDependency { .. } => "MissingDependency",
            Self::Decode { .. } => "DecodeError",
            Self::Path(_) => "PathResolutionError",
            Self::Clipboard(_) => "ClipboardError",
            Self::Io(_) => "IoError",
            Self::WorkerStopped => "WorkerStopped",
        }
    }
}

/// Why a path could not be parsed or resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The textual path is malformed.
    #[error("Invalid path '{input}' at offset {offset}: {reason}")]
    Syntax {
        input: String,
        offset: usize,
        reason: &'static str,
    },

    /// The segment does not apply to the value's shape kind.
    #[error("Cannot apply '{segment}' to a {kind} value")]
    Inapplicable { segment: String, kind: &'static str },

    /// Mapping key or object field is absent.
    #[error("Key not found: {key}")]
    MissingKey { key: String },

    /// Index is past the end of the axis.
    #[error("Index {index} out of range for axis {axis} of length {len}")]
    OutOfRange { index: usize, axis: usize, len: usize },

    /// More indices than the array has dimensions.
    #[error("Too many indices: {given} given for {ndim}-dimensional array")]
    TooManyIndices { given: usize, ndim: usize },

    /// The path is deeper than the configured maximum.
    #[error("Path depth {depth} exceeds the maximum of {max}")]
    TooDeep { depth: usize, max: usize },

    /// No document is loaded.
    #[error("No document loaded")]
    NoDocument,

    /// The current rendering has no cell at that position.
    #[error("No cell at row {row}, column {col}")]
    NoCell { row: usize, col: usize },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn decode_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = DeepviewError::decode("/tmp/x.npy", io);
        assert_eq!(err.category(), "DecodeError");
        assert!(err.to_string().contains("denied"));
        assert!(err.source().is_some());
    }

    #[test]
    fn path_error_is_transparent() {
        let err: DeepviewError = PathError::MissingKey { key: "a".into() }.into();
        assert_eq!(err.to_string(), "Key not found: a");
        assert_eq!(err.category(), "PathResolutionError");
    }
}
