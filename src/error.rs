//! Structured error types for the graph pipeline and its HTTP surface.
//!
//! Most failure modes of the pipeline degrade instead of erroring (a malformed
//! line is plain text, a dangling blocker is dropped, a degenerate fit is a
//! no-op). `GraphError` covers what is left: I/O against the document
//! collection, configuration problems and invalid requests from the view.

use serde::Serialize;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,

    // Not found errors
    DocumentNotFound,
    NodeNotFound,

    // Environment errors
    ConfigError,
    IoError,
    OpenFailed,

    // Internal errors
    InternalError,
}

/// Structured error returned by fallible pipeline operations.
#[derive(Debug, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct GraphError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl GraphError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn document_not_found(path: &str) -> Self {
        Self::new(
            ErrorCode::DocumentNotFound,
            format!("Document not found: {}", path),
        )
    }

    pub fn node_not_found(id: &str) -> Self {
        Self::new(ErrorCode::NodeNotFound, format!("Node not found: {}", id))
    }

    pub fn config(err: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::ConfigError, err.to_string())
    }

    pub fn io(path: &str, err: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::IoError, format!("I/O error on {}", path))
            .with_details(err.to_string())
    }

    pub fn open_failed(file: &str, err: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::OpenFailed, format!("Could not open {}", file))
            .with_details(err.to_string())
    }

    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl From<std::io::Error> for GraphError {
    fn from(err: std::io::Error) -> Self {
        Self::new(ErrorCode::IoError, err.to_string())
    }
}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for GraphError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<GraphError>() {
            Ok(graph_err) => graph_err,
            Err(err) => GraphError::internal(err),
        }
    }
}

/// Result type for pipeline operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;
