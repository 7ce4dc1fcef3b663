//! The staged text extraction pipeline.
//!
//! Stages run in a fixed order and each reports a [`StageOutcome`]:
//!
//! 1. the primary [`StructuredExtractor`] (readability by default), accepted
//!    only when its text is longer than [`ExtractConfig::min_content_chars`];
//! 2. the scored fallback block selector from [`crate::fallback`].
//!
//! Whatever happens, [`TextExtractor::extract_text`] returns an
//! [`ExtractionResult`]; failures are reported in its `failure` and `error`
//! fields.
//!
//! # Example
//!
//! ```rust
//! use pagewalk_core::extract::{ExtractionMethod, TextExtractor};
//!
//! let html = r#"<html><head><title>Chapter 2</title></head><body>
//!     <div class="chapter-content"><p>Short, but the fallback still finds it.</p></div>
//! </body></html>"#;
//!
//! let result = TextExtractor::default().extract_text(html, "https://example.com/novel/2.html");
//! assert_eq!(result.method, ExtractionMethod::Fallback);
//! assert_eq!(result.title.as_deref(), Some("Chapter 2"));
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::fallback::select_block;
use crate::parse::Document;
use crate::readability::{ReadabilityExtractor, StructuredExtractor};
use crate::text::{char_count, normalize_text};
use crate::PagewalkError;

/// Configuration for the extraction pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Primary output must be longer than this many characters (default: 250).
    pub min_content_chars: usize,
    /// Fallback candidates with more anchors per word are disqualified (default: 0.15).
    pub max_link_density: f64,
    /// Fallback score added per `<p>` (default: 25.0).
    pub paragraph_bonus: f64,
    /// Tags removed before fallback scoring.
    pub strip_tags: Vec<String>,
    /// Boilerplate selectors removed before fallback scoring.
    pub boilerplate_selectors: Vec<String>,
    /// Fallback containers, in priority order.
    pub candidate_selectors: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            min_content_chars: 250,
            max_link_density: 0.15,
            paragraph_bonus: 25.0,
            strip_tags: strings(&["script", "style", "nav", "header", "footer", "aside", "form", "iframe", "noscript"]),
            boilerplate_selectors: strings(&[
                ".nav",
                ".navbar",
                ".site-nav",
                ".pagination",
                ".pager",
                ".ads",
                ".advert",
                ".advertisement",
                ".share",
                ".social",
                ".breadcrumbs",
                ".comments",
                "#comments",
                ".related",
            ]),
            candidate_selectors: strings(&[
                "article",
                "main",
                "#content",
                "#main",
                ".content",
                ".post-content",
                ".entry-content",
                ".article-content",
                ".chapter-content",
                ".chapterContent",
                ".read-content",
                ".read__content",
                ".content-body",
                ".story-content",
                "#chapter-content",
                "#chaptercontent",
            ]),
        }
    }
}

/// Which stage produced the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Primary,
    Fallback,
    None,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionMethod::Primary => write!(f, "primary"),
            ExtractionMethod::Fallback => write!(f, "fallback"),
            ExtractionMethod::None => write!(f, "none"),
        }
    }
}

/// Why an extraction produced no text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionFailure {
    InvalidUrl,
    /// The page could not be retrieved.
    Fetch,
    /// The page was retrieved but no stage found text.
    NoContent,
    Cancelled,
}

/// Text extracted from one page.
///
/// When `method` is not [`ExtractionMethod::None`], `text` is non-empty and
/// normalized: no blank lines and no leading or trailing whitespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub url: String,
    pub text: String,
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub method: ExtractionMethod,
    /// Set exactly when `method` is [`ExtractionMethod::None`].
    pub failure: Option<ExtractionFailure>,
    /// Human-readable detail for `failure`.
    pub error: Option<String>,
}

impl ExtractionResult {
    /// A result carrying no text and the reason why.
    pub fn failed(url: &str, failure: ExtractionFailure, error: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            text: String::new(),
            title: None,
            meta_description: None,
            method: ExtractionMethod::None,
            failure: Some(failure),
            error: Some(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.method != ExtractionMethod::None
    }

    /// The failure as a [`PagewalkError`], `None` for successful results.
    pub fn to_error(&self) -> Option<PagewalkError> {
        let detail = || self.error.clone().unwrap_or_default();
        let err = match self.failure? {
            ExtractionFailure::InvalidUrl => PagewalkError::InvalidUrl(self.url.clone()),
            ExtractionFailure::Fetch => PagewalkError::FetchFailure { url: self.url.clone(), reason: detail() },
            ExtractionFailure::NoContent => PagewalkError::NoContentFound { url: self.url.clone() },
            ExtractionFailure::Cancelled => PagewalkError::Cancelled,
        };
        Some(err)
    }
}

/// Outcome of a single extraction stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Normalized, non-empty text
    Accepted(String),
    TooShort { chars: usize },
    Failed(String),
}

/// Runs the staged pipeline with a pluggable primary extractor.
#[derive(Clone)]
pub struct TextExtractor {
    config: ExtractConfig,
    primary: Arc<dyn StructuredExtractor>,
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new(ExtractConfig::default())
    }
}

impl fmt::Debug for TextExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextExtractor").field("config", &self.config).finish_non_exhaustive()
    }
}

impl TextExtractor {
    /// Uses [`ReadabilityExtractor`] as the primary stage.
    pub fn new(config: ExtractConfig) -> Self {
        Self::with_primary(config, Arc::new(ReadabilityExtractor::default()))
    }

    pub fn with_primary(config: ExtractConfig, primary: Arc<dyn StructuredExtractor>) -> Self {
        Self { config, primary }
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Runs the primary extractor and applies the minimum length.
    pub fn primary_stage(&self, markup: &str, base_url: Option<&Url>) -> StageOutcome {
        match self.primary.extract(markup, base_url) {
            Ok(text) => {
                let text = normalize_text(&text);
                let chars = char_count(&text);
                if chars > self.config.min_content_chars {
                    StageOutcome::Accepted(text)
                } else {
                    StageOutcome::TooShort { chars }
                }
            }
            Err(e) => StageOutcome::Failed(e.to_string()),
        }
    }

    /// Runs the fallback block selector. Any non-empty text is accepted.
    pub fn fallback_stage(&self, markup: &str, base_url: Option<&Url>) -> StageOutcome {
        match select_block(markup, base_url, &self.config) {
            Ok(selection) if selection.text.is_empty() => StageOutcome::TooShort { chars: 0 },
            Ok(selection) => StageOutcome::Accepted(normalize_text(&selection.text)),
            Err(e) => StageOutcome::Failed(e.to_string()),
        }
    }

    /// Extracts the main text of `markup`, served from `url`.
    pub fn extract_text(&self, markup: &str, url: &str) -> ExtractionResult {
        if markup.trim().is_empty() {
            return ExtractionResult::failed(url, ExtractionFailure::NoContent, "empty document");
        }

        let base_url = Url::parse(url).ok();
        let metadata = match Document::parse(markup) {
            Ok(doc) => doc.extract_metadata(),
            Err(e) => return ExtractionResult::failed(url, ExtractionFailure::NoContent, e.to_string()),
        };

        let stages: [(ExtractionMethod, fn(&Self, &str, Option<&Url>) -> StageOutcome); 2] = [
            (ExtractionMethod::Primary, Self::primary_stage),
            (ExtractionMethod::Fallback, Self::fallback_stage),
        ];

        let mut reasons = Vec::new();
        for (method, stage) in stages {
            match stage(self, markup, base_url.as_ref()) {
                StageOutcome::Accepted(text) => {
                    tracing::debug!(url, stage = %method, chars = char_count(&text), "extraction stage accepted");
                    return ExtractionResult {
                        url: url.to_string(),
                        text,
                        title: metadata.title,
                        meta_description: metadata.description,
                        method,
                        failure: None,
                        error: None,
                    };
                }
                StageOutcome::TooShort { chars } => {
                    tracing::debug!(url, stage = %method, chars, "extraction stage too short");
                    reasons.push(format!("{}: {} characters", method, chars));
                }
                StageOutcome::Failed(reason) => {
                    tracing::debug!(url, stage = %method, %reason, "extraction stage failed");
                    reasons.push(format!("{}: {}", method, reason));
                }
            }
        }

        ExtractionResult {
            title: metadata.title,
            meta_description: metadata.description,
            ..ExtractionResult::failed(
                url,
                ExtractionFailure::NoContent,
                format!("no readable content ({})", reasons.join("; ")),
            )
        }
    }
}

/// Extracts text with the default pipeline.
pub fn extract_text(markup: &str, url: &str) -> ExtractionResult {
    TextExtractor::default().extract_text(markup, url)
}
