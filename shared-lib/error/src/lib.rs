//! Common error types for the workforce services.
//!
//! This crate provides unified error handling across all services.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Storage-related errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found")]
    NotFound,

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Version conflict: {0}")]
    VersionConflict(String),
}

/// Error response for API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Add details to the error response.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl From<StorageError> for ErrorResponse {
    fn from(err: StorageError) -> Self {
        let (code, message) = match &err {
            StorageError::ConnectionFailed(_) => {
                ("STORAGE_CONNECTION_FAILED", "Storage connection failed")
            }
            StorageError::QueryFailed(_) => ("STORAGE_QUERY_FAILED", "Storage query failed"),
            StorageError::NotFound => ("STORAGE_NOT_FOUND", "Record not found"),
            StorageError::DuplicateEntry(_) => ("STORAGE_DUPLICATE_ENTRY", "Duplicate entry"),
            StorageError::VersionConflict(_) => ("STORAGE_VERSION_CONFLICT", "Version conflict"),
        };
        Self::new(code, message).with_details(err.to_string())
    }
}

impl From<AppError> for ErrorResponse {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(msg) => Self::new("VALIDATION", msg),
            AppError::NotFound(msg) => Self::new("NOT_FOUND", msg),
            AppError::Conflict(msg) => Self::new("CONFLICT", msg),
            AppError::Timeout(msg) => Self::new("TIMEOUT", msg),
            AppError::Storage(err) => err.into(),
            AppError::Internal(msg) => Self::new("INTERNAL", msg),
        }
    }
}

/// Result type alias using AppError.
pub type Result<T> = std::result::Result<T, AppError>;
