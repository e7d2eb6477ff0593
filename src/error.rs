use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for the file-bundle library.
///
/// Only structural failures surface as `Error` values. Per-file extraction
/// failures are folded into placeholder text by the extraction registry and
/// never escape a `process_file` call.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// A rich-format extractor could not recover text.
    #[error("{format} extraction failed: {message}")]
    Extraction {
        /// Human-readable format name (PDF, DOCX, ...)
        format: String,
        /// Error message
        message: String,
    },

    /// Archive could not be opened or expanded.
    #[error("Failed to extract archive '{path}': {message}")]
    Archive {
        /// Path to the archive
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// JSON serialization error.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message
        message: String,
    },

    /// System time error.
    #[error("System time error: {message}")]
    SystemTime {
        /// Error message
        message: String,
    },

    /// Invalid directory exclusion pattern.
    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The invalid pattern
        pattern: String,
        /// Reason why it's invalid
        reason: String,
    },

    /// Background task failed to complete.
    #[error("Background task failed: {message}")]
    Task {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates an extraction error for the given format.
    #[must_use]
    pub fn extraction(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Creates an archive error.
    #[must_use]
    pub fn archive(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Archive {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a serialization error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates an invalid pattern error.
    #[must_use]
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Creates a background task error.
    #[must_use]
    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }

    /// Returns the message without the variant prefix.
    ///
    /// Placeholders embed this so the bundle reads
    /// `[Error processing PDF: <parser message>]`.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Extraction { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::InvalidPattern { .. })
    }

    /// Returns true if this is an archive error.
    #[must_use]
    pub const fn is_archive(&self) -> bool {
        matches!(self, Self::Archive { .. })
    }
}

impl From<std::time::SystemTimeError> for Error {
    fn from(e: std::time::SystemTimeError) -> Self {
        Self::SystemTime {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization {
            message: e.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(e: zip::result::ZipError) -> Self {
        Self::Extraction {
            format: "ZIP".to_string(),
            message: e.to_string(),
        }
    }
}
