//! Custom error types for publist.
//!
//! All fallible library functions return `Result<T, PublistError>`.
//! Per-publication problems are not errors at this level; they are
//! reported as [`crate::normalize::SkipReason`] values instead.

use thiserror::Error;

/// Main error type for publist operations.
#[derive(Debug, Error)]
pub enum PublistError {
    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// HTML parsing error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Rate limited by Google Scholar
    #[error("Rate limited, retry after {0}s")]
    RateLimited(u64),

    /// Scholar returned a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: i32,
        /// Error message
        message: String,
    },

    /// CAPTCHA or anti-bot interstitial detected
    #[error("CAPTCHA detected, try again later or through a proxy")]
    Captcha,

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// No author could be resolved by any method
    #[error("Author not found: {0}")]
    AuthorNotFound(String),

    /// A retried operation failed on every attempt
    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Name of the retried operation
        operation: String,
        /// Number of attempts made
        attempts: u32,
        /// Error from the final attempt
        last: Box<PublistError>,
    },

    /// Invalid affiliation pattern
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type alias using `PublistError`
pub type Result<T> = std::result::Result<T, PublistError>;

/// Extension trait for adding context to Option types
pub trait OptionExt<T> {
    /// Convert Option to Result with a parse error message
    fn ok_or_parse(self, msg: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_parse(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| PublistError::Parse(msg.to_string()))
    }
}
