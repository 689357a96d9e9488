//! Error types for PageDoc operations.
//!
//! This module defines the main error type [`PageDocError`]. Only structurally
//! fatal conditions surface through it: timeouts, unreadable input, and JSON API
//! payloads missing required fields. Thin content, malformed metadata and failed
//! renders are absorbed by the pipeline and recorded in the trace instead.
//!
//! # Example
//!
//! ```rust
//! use pagedoc_core::{PageDocError, Result};
//!
//! fn require_items(items: &[String]) -> Result<&String> {
//!     items.first().ok_or_else(|| PageDocError::InvalidApiResponse("no items".to_string()))
//! }
//! # assert!(require_items(&[]).is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for extraction, ingestion and coordination.
///
/// # Example
///
/// ```rust
/// use pagedoc_core::PageDocError;
///
/// let err = PageDocError::Timeout { timeout: 30 };
/// match err {
///     PageDocError::Timeout { timeout } => println!("gave up after {}s", timeout),
///     other => println!("Error: {}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum PageDocError {
    /// HTTP request errors from reqwest.
    ///
    /// This variant wraps network errors, DNS failures, connection issues,
    /// and other HTTP-related problems.
    #[cfg(feature = "fetch")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The per-input run or an HTTP request exceeded its deadline.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// File not found.
    ///
    /// Returned when attempting to read a file that doesn't exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Standard I/O errors for stdin, files and the state store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A known JSON API payload is missing required fields.
    ///
    /// Fatal to that input; the pipeline does not fall back to HTML.
    #[error("Invalid API response: {0}")]
    InvalidApiResponse(String),

    /// Pattern pack definition errors.
    #[error("Pattern pack error: {0}")]
    PackError(String),

    /// Domain state persistence errors.
    #[error("State store error: {0}")]
    StateError(String),

    /// No browser renderer is available in this deployment.
    #[error("Browser rendering unavailable: {0}")]
    RenderUnavailable(String),

    /// The browser renderer failed while rendering a page.
    #[error("Browser rendering failed: {0}")]
    RenderFailed(String),
}

impl PageDocError {
    /// Whether this error came from the browser collaborator.
    ///
    /// The coordinator absorbs these and continues with the content it already has.
    pub fn is_render_error(&self) -> bool {
        matches!(self, PageDocError::RenderUnavailable(_) | PageDocError::RenderFailed(_))
    }
}

/// Result type alias for PageDocError.
///
/// This is a convenience alias for `std::result::Result<T, PageDocError>`.
pub type Result<T> = std::result::Result<T, PageDocError>;
