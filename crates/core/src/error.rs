//! Error types for pagewalk operations.
//!
//! [`PagewalkError`] covers both the expected outcomes of extraction and
//! navigation (an unreachable page, a page without readable text, a page
//! that is not paginated) and genuine misuse such as invalid URLs or
//! malformed configuration.
//!
//! # Example
//!
//! ```rust
//! use pagewalk_core::{PagewalkError, Result};
//!
//! fn require_text(text: &str, url: &str) -> Result<String> {
//!     if text.is_empty() {
//!         return Err(PagewalkError::NoContentFound { url: url.to_string() });
//!     }
//!     Ok(text.to_string())
//! }
//! ```

use thiserror::Error;

use crate::navigation::Direction;

/// Main error type for extraction and navigation operations.
///
/// The first four variants are normal, recoverable outcomes that callers are
/// expected to handle (see [`PagewalkError::is_recoverable`]).
#[derive(Error, Debug)]
pub enum PagewalkError {
    /// The page could not be retrieved after all retries were exhausted.
    #[error("Failed to fetch {url}: {reason}")]
    FetchFailure { url: String, reason: String },

    /// Extraction produced no text above the content threshold.
    #[error("No readable content found at {url}")]
    NoContentFound { url: String },

    /// Neither the URL nor the page content carries a chapter number.
    #[error("No chapter pattern detected for {url}")]
    NoPatternDetected { url: String },

    /// None of the navigation tiers produced a candidate.
    #[error("No {direction} page found from {url}")]
    NoNavigationTarget { url: String, direction: Direction },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// The operation was cancelled by the caller.
    #[error("Operation cancelled")]
    Cancelled,

    /// Invalid engine configuration, such as a pattern that does not compile.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PagewalkError {
    /// Returns `true` for outcomes that are part of normal operation.
    ///
    /// Fetch failures, empty pages, non-paginated pages and dead-end
    /// navigation are expected; everything else indicates bad input or
    /// configuration.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PagewalkError::FetchFailure { .. }
                | PagewalkError::NoContentFound { .. }
                | PagewalkError::NoPatternDetected { .. }
                | PagewalkError::NoNavigationTarget { .. }
                | PagewalkError::Cancelled
        )
    }
}

/// Result type alias for PagewalkError.
pub type Result<T> = std::result::Result<T, PagewalkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PagewalkError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_navigation_error_names_direction() {
        let err = PagewalkError::NoNavigationTarget {
            url: "https://example.com/1".to_string(),
            direction: Direction::Previous,
        };
        assert!(err.to_string().contains("previous"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_config_error_not_recoverable() {
        let err = PagewalkError::ConfigError("bad regex".to_string());
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("bad regex"));
    }

    #[test]
    fn test_fetch_failure_message() {
        let err = PagewalkError::FetchFailure { url: "https://x.com".to_string(), reason: "HTTP 404".to_string() };
        assert!(err.to_string().contains("HTTP 404"));
        assert!(err.is_recoverable());
    }
}
