//! # Error Handling
//!
//! This module defines custom error types and how they're converted to HTTP responses.
//!
//! ## Error Categories:
//! - **InvalidInput**: The client sent a malformed or incomplete request (400)
//! - **ExtractionError**: Source metadata could not be read or parsed (500)
//! - **ConversionError**: The download or transcode step failed (500)
//! - **FileMissing**: Expected output absent after a nominally successful run (500)
//! - **ConfigError**: Configuration file or environment variable problems (500)
//! - **Internal**: Everything else that goes wrong server-side (500)
//!
//! ## Why custom errors:
//! Custom error types make it easy to handle different failure scenarios
//! and provide meaningful error messages to API clients. Every failure is
//! caught at the handler boundary and becomes a JSON error body; no error
//! is allowed to crash the process.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Custom error types for the application.
///
/// ## Usage Example:
/// ```rust
/// return Err(AppError::InvalidInput("No URL provided".to_string()));
/// ```
#[derive(Debug)]
pub enum AppError {
    /// Client sent invalid or incomplete data (missing/empty url)
    InvalidInput(String),

    /// The source could not be read or its metadata parsed
    ExtractionError(String),

    /// The download or transcode step failed
    ConversionError(String),

    /// The adapter reported success but the output file is not on disk
    FileMissing(String),

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// Internal server errors (I/O failures, etc.)
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::ExtractionError(msg) => write!(f, "Extraction error: {}", msg),
            AppError::ConversionError(msg) => write!(f, "Conversion error: {}", msg),
            AppError::FileMissing(msg) => write!(f, "Output file missing: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

/// Converts our custom errors into HTTP responses that clients can understand.
///
/// ## HTTP Status Code Mapping:
/// - InvalidInput → 400 (Bad Request)
/// - everything else → 500 (Internal Server Error)
///
/// ## JSON Response Format:
/// All errors return JSON with a consistent structure:
/// ```json
/// {
///   "error": "No URL provided",
///   "kind": "invalid_input",
///   "timestamp": "2025-01-01T12:00:00Z"
/// }
/// ```
/// The top-level `error` field always carries the human-readable message.
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, kind, message) = match self {
            AppError::InvalidInput(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "invalid_input",
                msg.clone(),
            ),
            AppError::ExtractionError(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "extraction_error",
                msg.clone(),
            ),
            AppError::ConversionError(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "conversion_error",
                msg.clone(),
            ),
            AppError::FileMissing(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "file_missing",
                msg.clone(),
            ),
            AppError::ConfigError(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "config_error",
                msg.clone(),
            ),
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
        };

        HttpResponse::build(status).json(json!({
            "error": message,
            "kind": kind,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }
}

/// When you use `?` with an anyhow::Error, it automatically becomes an AppError::Internal.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// JSON parsing errors are almost always due to the client sending malformed
/// data, so they map to 400 rather than 500.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

/// Shorthand for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;
