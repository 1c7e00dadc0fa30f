//! Query error types
//!
//! Defines all error conditions that can abort a single query. An error never
//! affects the other queries of the same request.

use std::time::Duration;
use thiserror::Error;

use crate::frame::FrameError;
use crate::macros::MacroError;

/// Errors that can occur while running a query
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    /// Macro expansion failed
    #[error("Macro error: {0}")]
    Macro(#[from] MacroError),

    /// Materializing or shaping the result failed
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// The query model could not be decoded
    #[error("Invalid query model: {0}")]
    InvalidModel(String),

    /// The database rejected or failed the query
    #[error("Execution error: {0}")]
    Execution(String),

    /// The database did not answer within the deadline
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::InvalidModel(err.to_string())
    }
}

impl From<rusqlite::Error> for QueryError {
    fn from(err: rusqlite::Error) -> Self {
        QueryError::Execution(err.to_string())
    }
}
