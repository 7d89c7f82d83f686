//! Error types for SheetDB
//!
//! Every façade operation returns [`Result`]. Errors fall into four families
//! that callers map to user-visible behavior:
//!
//! - not found: the predicate matched nothing, or the sheet does not exist
//! - validation: a constraint rejected the candidate row before any write
//! - backend unavailable: transport, auth or HTTP failure from the backend
//! - malformed response: the backend acknowledged a write in a shape that
//!   cannot be mapped back to a row

use crate::constraint::ValidationError;
use thiserror::Error;

/// The main error type for SheetDB operations
#[derive(Debug, Error)]
pub enum Error {
    // ==========================================================================
    // Table Errors
    // ==========================================================================
    #[error("Table '{table}' does not exist in the spreadsheet")]
    TableNotFound { table: String },

    #[error("Invalid table name '{value}': {reason}")]
    InvalidTableName { value: String, reason: &'static str },

    // ==========================================================================
    // Row Errors
    // ==========================================================================
    #[error("No row in table '{table}' matched the predicate")]
    RowNotFound { table: String },

    // ==========================================================================
    // Validation Errors
    // ==========================================================================
    #[error("Validation failed for table '{table}': {source}")]
    Validation {
        table: String,
        #[source]
        source: ValidationError,
    },

    // ==========================================================================
    // Backend Errors
    // ==========================================================================
    #[error("Spreadsheet backend unavailable: {message}")]
    BackendUnavailable {
        message: String,
        /// HTTP status when the backend answered at all
        status: Option<u16>,
    },

    #[error("Malformed backend response: {message}")]
    MalformedResponse { message: String },

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ==========================================================================
    // Catch-all
    // ==========================================================================
    #[error("{0}")]
    Other(String),
}

/// Result type alias for SheetDB operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(table: impl Into<String>, source: ValidationError) -> Self {
        Error::Validation {
            table: table.into(),
            source,
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Error::BackendUnavailable {
            message: message.into(),
            status: None,
        }
    }
}

// =============================================================================
// Conversions from external error types
// =============================================================================

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::BackendUnavailable {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedResponse {
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Config {
            message: err.to_string(),
        }
    }
}

impl From<a1ref::ParseError> for Error {
    fn from(err: a1ref::ParseError) -> Self {
        Error::MalformedResponse {
            message: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Other(format!("write task did not complete: {}", err))
    }
}

impl From<crate::validation::ValidationError> for Error {
    fn from(err: crate::validation::ValidationError) -> Self {
        match err {
            crate::validation::ValidationError::InvalidName(value, reason) => {
                Error::InvalidTableName { value, reason }
            }
            crate::validation::ValidationError::TooLong(value, _max) => Error::InvalidTableName {
                value,
                reason: "exceeds maximum length",
            },
            crate::validation::ValidationError::Empty => Error::InvalidTableName {
                value: String::new(),
                reason: "cannot be empty",
            },
        }
    }
}

// =============================================================================
// Error Display Helpers
// =============================================================================

impl Error {
    /// Returns a user-friendly suggestion for fixing the error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::TableNotFound { .. } => {
                Some("Create a sheet with that name and a header row first")
            }
            Error::RowNotFound { .. } => Some("Check the filter; rows are matched by value, not position"),
            Error::InvalidTableName { .. } => {
                Some("Sheet names cannot contain [ ] * ? / \\ : and are at most 100 characters")
            }
            Error::Validation {
                source: ValidationError::UnknownColumn { .. },
                ..
            } => Some("Only columns present in the sheet's header row can be written"),
            Error::Config { .. } => {
                Some("Set spreadsheet_id and access_token in the config file or SHEETDB_* variables")
            }
            _ => None,
        }
    }

    /// True for errors caused by the request rather than the backend
    /// (the 4xx class when surfaced over HTTP).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::TableNotFound { .. }
                | Error::InvalidTableName { .. }
                | Error::RowNotFound { .. }
                | Error::Validation { .. }
        )
    }

    /// HTTP status a route layer should answer with
    pub fn http_status(&self) -> u16 {
        match self {
            Error::TableNotFound { .. } | Error::RowNotFound { .. } => 404,
            Error::InvalidTableName { .. } | Error::Validation { .. } => 422,
            Error::BackendUnavailable { .. } => 503,
            Error::MalformedResponse { .. } => 502,
            Error::Config { .. } | Error::Other(_) => 500,
        }
    }
}
