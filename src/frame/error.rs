//! Frame error types
//!
//! Errors that abort building or reshaping a result frame. Value coercion
//! failures are not errors: they are logged and resolved by the fill policy.

use thiserror::Error;

/// A row could not be read from the result cursor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not scan row: {0}")]
pub struct RowScanError(pub String);

impl RowScanError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors that can occur while materializing or shaping a frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// A column's reported type conflicts with a name-based rule
    #[error("type conflict for column '{column}': {reason}")]
    TypeConflict { column: String, reason: String },

    /// The cursor failed while producing a row
    #[error("row {row}: {source}")]
    RowScan {
        row: usize,
        #[source]
        source: RowScanError,
    },

    /// A row did not have one value per column
    #[error("row {row} has {actual} values, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// Long-to-wide conversion failed
    #[error("failed to reshape frame: {0}")]
    Reshape(String),
}

/// Result type for frame operations
pub type FrameResult<T> = Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FrameError::RowScan {
            row: 3,
            source: RowScanError::new("connection reset"),
        };
        assert_eq!(err.to_string(), "row 3: could not scan row: connection reset");

        let err = FrameError::TypeConflict {
            column: "metric".to_string(),
            reason: "numeric or temporal type INT".to_string(),
        };
        assert!(err.to_string().contains("metric"));
    }
}
