//! Error types for hojear.

use std::path::PathBuf;

/// Result type alias for hojear operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in hojear operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        /// The path where the error occurred, if known.
        path: Option<PathBuf>,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// CSV error during parsing.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error during parsing or serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Spreadsheet error during XLSX parsing.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    /// Unsupported file format.
    #[error("Unsupported format: {format}")]
    UnsupportedFormat {
        /// The unsupported format name or extension.
        format: String,
    },

    /// Two records in one dataset carry the same id.
    #[error("Duplicate record id: {id}")]
    DuplicateId {
        /// The offending id.
        id: i64,
    },

    /// A record id is missing or not an integer.
    #[error("Invalid record id: {message}")]
    InvalidId {
        /// Description of the id problem.
        message: String,
    },

    /// Page request with out-of-range parameters.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of the rejected parameter.
        message: String,
    },

    /// Filter or pivot column not present in the dataset.
    #[error("Column '{name}' not found in dataset")]
    ColumnNotFound {
        /// The name of the missing column.
        name: String,
    },
}

impl Error {
    /// Create an I/O error with a path context.
    pub fn io(source: std::io::Error, path: impl Into<PathBuf>) -> Self {
        Self::Io {
            path: Some(path.into()),
            source,
        }
    }

    /// Create an I/O error without path context.
    pub fn io_no_path(source: std::io::Error) -> Self {
        Self::Io { path: None, source }
    }

    /// Create an unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Create an invalid id error.
    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::InvalidId {
            message: message.into(),
        }
    }

    /// Create an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a column not found error.
    pub fn column_not_found(name: impl Into<String>) -> Self {
        Self::ColumnNotFound { name: name.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::column_not_found("operating_status");
        assert_eq!(
            err.to_string(),
            "Column 'operating_status' not found in dataset"
        );

        let err = Error::invalid_request("page must be >= 1");
        assert_eq!(err.to_string(), "Invalid request: page must be >= 1");
    }

    #[test]
    fn test_io_error_with_path() {
        let source = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::io(source, "records.xlsx");
        assert!(err.to_string().contains("records.xlsx"));
    }
}
