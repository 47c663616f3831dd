//! Typed error handling for goconst.
//!
//! Every failure carries enough context (file, package, position) to be
//! reported against the directory or file group that produced it.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for goconst operations.
#[derive(Error, Debug)]
pub enum GoconstError {
    /// I/O error when reading sources or writing the listing
    #[error("I/O error at {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Syntax error when parsing Go source
    #[error("Parse error in {path}: {message}")]
    Parse {
        path: PathBuf,
        message: String,
        /// Line number (1-indexed) if available
        line: Option<usize>,
        /// Column number (1-indexed) if available
        column: Option<usize>,
    },

    /// Constant or type resolution failed for a package
    #[error("Type-check error in package {package}: {message}")]
    Analysis { package: String, message: String },

    /// The destination stream could not be created or opened
    #[error("Failed to open output {path}: {message}")]
    OutputOpen {
        path: PathBuf,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid argument provided
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl GoconstError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a parse error without location.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Create a parse error with line/column info.
    pub fn parse_at(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self::Parse {
            path: path.into(),
            message: format!("{}:{}: {}", line, column, message.into()),
            line: Some(line),
            column: Some(column),
        }
    }

    /// Create an analysis error for a package.
    pub fn analysis(package: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Analysis {
            package: package.into(),
            message: message.into(),
        }
    }

    /// Create an output-open error.
    pub fn output_open(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::OutputOpen {
            path: path.into(),
            message: err.to_string(),
            source: err,
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Convenience type alias for goconst results.
pub type GoconstResult<T> = Result<T, GoconstError>;

/// Extension trait for converting std::io::Error with path context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    fn with_path(self, path: impl Into<PathBuf>) -> GoconstResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> GoconstResult<T> {
        self.map_err(|e| GoconstError::io(path, e))
    }
}
