//! Error handling for physioData conversion
//!
//! Every failure in the conversion pipeline is fatal to the run, so errors
//! carry enough context (input path, row, column) to diagnose the input.

use core::fmt;

/// Result type alias for conversion operations
pub type PdtResult<T> = Result<T, PdtError>;

/// Error type for all conversion operations
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum PdtError {
    /// Input unreadable or output unwritable
    Io {
        /// Path involved in the failed operation
        path: String,
        /// Underlying I/O failure
        reason: String,
    },

    /// Input does not parse as the expected tabular numeric shape
    Format {
        /// Input the problem was found in
        source: String,
        /// 1-based line number, when the problem is tied to a row
        row: Option<usize>,
        /// Description of the format issue
        reason: String,
    },

    /// Epoch rows have inconsistent keys or column types
    Schema {
        /// 0-based epoch row index
        row: usize,
        /// Description of the schema issue
        reason: String,
    },

    /// Semantic constraint violated
    Validation {
        /// Description of the violated constraint
        reason: String,
    },

    /// Container could not be encoded or decoded
    Serialization {
        /// Serialization error description
        reason: String,
    },

    /// Conversion configuration is unusable
    Configuration {
        /// Description of the configuration error
        message: String,
    },
}

/// Error class without the context fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Format,
    Schema,
    Validation,
    Serialization,
    Configuration,
}

impl PdtError {
    /// Build an I/O error for `path`
    pub fn io(path: impl AsRef<std::path::Path>, err: impl fmt::Display) -> Self {
        PdtError::Io {
            path: path.as_ref().display().to_string(),
            reason: err.to_string(),
        }
    }

    /// Error class, for callers that only care which stage failed
    pub fn kind(&self) -> ErrorKind {
        match self {
            PdtError::Io { .. } => ErrorKind::Io,
            PdtError::Format { .. } => ErrorKind::Format,
            PdtError::Schema { .. } => ErrorKind::Schema,
            PdtError::Validation { .. } => ErrorKind::Validation,
            PdtError::Serialization { .. } => ErrorKind::Serialization,
            PdtError::Configuration { .. } => ErrorKind::Configuration,
        }
    }
}

impl fmt::Display for PdtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdtError::Io { path, reason } => {
                write!(f, "I/O error on {}: {}", path, reason)
            }
            PdtError::Format { source, row: Some(row), reason } => {
                write!(f, "Format error in {} at line {}: {}", source, row, reason)
            }
            PdtError::Format { source, row: None, reason } => {
                write!(f, "Format error in {}: {}", source, reason)
            }
            PdtError::Schema { row, reason } => {
                write!(f, "Schema error in epoch row {}: {}", row, reason)
            }
            PdtError::Validation { reason } => {
                write!(f, "Validation error: {}", reason)
            }
            PdtError::Serialization { reason } => {
                write!(f, "Serialization error: {}", reason)
            }
            PdtError::Configuration { message } => {
                write!(f, "Configuration error: {}", message)
            }
        }
    }
}

impl std::error::Error for PdtError {}

/// Convenience macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::error::PdtError::Validation {
            reason: format!($($arg)*),
        }
    };
}

/// Convenience macro for creating schema errors
#[macro_export]
macro_rules! schema_error {
    ($row:expr, $($arg:tt)*) => {
        $crate::error::PdtError::Schema {
            row: $row,
            reason: format!($($arg)*),
        }
    };
}
