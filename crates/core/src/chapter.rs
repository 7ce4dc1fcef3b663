//! Chapter number and URL template detection.
//!
//! Detection looks at the URL path first, trying an ordered list of patterns
//! from the most specific (`/p12.html`) to the loosest (`p-12` anywhere in
//! the path). Only when the URL carries nothing usable are the page title
//! and first heading searched. A URL match yields a template that can be
//! stepped to neighbouring chapters; a content match only yields a number.
//!
//! # Example
//!
//! ```rust
//! use pagewalk_core::chapter::ChapterDetector;
//!
//! let detector = ChapterDetector::default();
//! let info = detector.detect_from_url("https://example.com/novel/chapter-12.html", None).unwrap();
//!
//! assert_eq!(info.numeric_value, 12);
//! assert_eq!(info.url_template, "https://example.com/novel/chapter-{n}.html");
//! assert_eq!(info.format_url(13).as_deref(), Some("https://example.com/novel/chapter-13.html"));
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use url::{Position, Url};

use crate::parse::Document;
use crate::{PagewalkError, Result};

/// Placeholder substituted with the chapter number in [`ChapterInfo::url_template`].
pub const PLACEHOLDER: &str = "{n}";

/// Where a chapter number was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterSource {
    Url,
    Content,
}

/// A detected chapter position and how to reach its neighbours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterInfo {
    /// URL text preceding the chapter digits; the page URL for content matches.
    pub base_url: String,
    pub numeric_value: u64,
    /// Full URL with the digits replaced by `{n}`; empty for content matches.
    pub url_template: String,
    /// Token that matched, e.g. `chapter-12`.
    pub matched_fragment: String,
    pub source: ChapterSource,
    /// False when a caller hint selected the pattern.
    pub auto_detected: bool,
    /// Digit count of a zero-padded number, 0 when unpadded.
    pub digit_width: usize,
}

impl ChapterInfo {
    /// Formats the URL of chapter `n`, or `None` when there is no template.
    pub fn format_url(&self, n: u64) -> Option<String> {
        format_url(self, n)
    }

    /// Whether the URL of other chapters can be derived from this one.
    pub fn has_template(&self) -> bool {
        self.url_template.contains(PLACEHOLDER)
    }

    /// Moves to chapter `n`, re-rendering the digits of `matched_fragment`
    /// with the stored padding.
    pub fn set_value(&mut self, n: u64) {
        let prefix_len = self.matched_fragment.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        if prefix_len < self.matched_fragment.len() {
            self.matched_fragment.truncate(prefix_len);
            self.matched_fragment.push_str(&pad_number(n, self.digit_width));
        }
        self.numeric_value = n;
    }

    /// Whether the template renders exactly `url` for the number that follows
    /// `base_url` in it.
    pub fn reproduces(&self, url: &str) -> bool {
        let Some(rest) = url.strip_prefix(self.base_url.as_str()) else {
            return false;
        };
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        match rest[..digits].parse::<u64>() {
            Ok(n) => self.format_url(n).as_deref() == Some(url),
            Err(_) => false,
        }
    }
}

/// Substitutes `n` into the template of `info`, keeping zero padding.
pub fn format_url(info: &ChapterInfo, n: u64) -> Option<String> {
    if !info.has_template() {
        return None;
    }
    Some(info.url_template.replacen(PLACEHOLDER, &pad_number(n, info.digit_width), 1))
}

pub(crate) fn pad_number(n: u64, width: usize) -> String {
    format!("{:0width$}", n, width = width)
}

/// Width to preserve when stepping `digits`: its length if zero-padded, else 0.
pub(crate) fn padded_width(digits: &str) -> usize {
    if digits.len() > 1 && digits.starts_with('0') { digits.len() } else { 0 }
}

/// A URL path pattern. `prefix` renders the fragment compared against hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlPatternSpec {
    /// Regex with the chapter digits in capture group 1; matched case-insensitively.
    pub pattern: String,
    pub prefix: String,
}

impl UrlPatternSpec {
    fn new(pattern: &str, prefix: &str) -> Self {
        Self { pattern: pattern.to_string(), prefix: prefix.to_string() }
    }
}

/// Ordered pattern lists used by the [`ChapterDetector`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterConfig {
    /// Tried against the URL path in order; first match wins.
    pub url_patterns: Vec<UrlPatternSpec>,
    /// Tried against the title, then the first heading.
    pub content_patterns: Vec<String>,
}

impl Default for ChapterConfig {
    fn default() -> Self {
        Self {
            url_patterns: vec![
                UrlPatternSpec::new(r"/p(\d+)\.html?$", "p"),
                UrlPatternSpec::new(r"/ch(\d+)\.html?$", "ch"),
                UrlPatternSpec::new(r"/chapter(\d+)\.html?$", "chapter"),
                UrlPatternSpec::new(r"/(\d+)\.html?$", ""),
                UrlPatternSpec::new(r"/(\d+)/?$", ""),
                UrlPatternSpec::new(r"(?:^|[^a-z])chapter[-_]?(\d+)", "chapter"),
                UrlPatternSpec::new(r"(?:^|[^a-z])ch[-_]?(\d+)", "ch"),
                UrlPatternSpec::new(r"(?:^|[^a-z])p[-_]?(\d+)", "p"),
            ],
            content_patterns: vec![
                r"chapter\s+(\d+)".to_string(),
                r"chap\.*\s*(\d+)".to_string(),
                r"第\s*(\d+)\s*章".to_string(),
                r"p\s*(\d+)$".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone)]
struct UrlPattern {
    regex: Regex,
    prefix: String,
}

#[allow(clippy::expect_used)]
static DEFAULT_DETECTOR: LazyLock<ChapterDetector> =
    LazyLock::new(|| ChapterDetector::new(&ChapterConfig::default()).expect("valid default patterns"));

/// Detects chapter numbers in URLs and page content.
#[derive(Debug, Clone)]
pub struct ChapterDetector {
    url_patterns: Vec<UrlPattern>,
    content_patterns: Vec<Regex>,
}

impl Default for ChapterDetector {
    fn default() -> Self {
        DEFAULT_DETECTOR.clone()
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("(?i){}", pattern))
        .map_err(|e| PagewalkError::ConfigError(format!("invalid chapter pattern '{}': {}", pattern, e)))
}

impl ChapterDetector {
    /// Compiles the pattern lists of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`PagewalkError::ConfigError`] if a pattern does not compile or
    /// has no capture group.
    pub fn new(config: &ChapterConfig) -> Result<Self> {
        let url_patterns = config
            .url_patterns
            .iter()
            .map(|spec| {
                let regex = compile(&spec.pattern)?;
                if regex.captures_len() < 2 {
                    return Err(PagewalkError::ConfigError(format!(
                        "chapter pattern '{}' has no capture group",
                        spec.pattern
                    )));
                }
                Ok(UrlPattern { regex, prefix: spec.prefix.to_lowercase() })
            })
            .collect::<Result<Vec<_>>>()?;

        let content_patterns = config.content_patterns.iter().map(|p| compile(p)).collect::<Result<Vec<_>>>()?;

        Ok(Self { url_patterns, content_patterns })
    }

    /// Detects from the URL, then from `markup` if one is given.
    ///
    /// A non-empty `hint` restricts URL matches to those whose rendered
    /// fragment (`p12`, `ch12`, `chapter12` or `12`) equals it.
    pub fn detect(&self, url: &str, markup: Option<&str>, hint: Option<&str>) -> Option<ChapterInfo> {
        self.detect_from_url(url, hint)
            .or_else(|| markup.and_then(|markup| self.detect_from_content(url, markup)))
    }

    /// URL-only detection; never fetches or parses markup.
    pub fn detect_from_url(&self, url: &str, hint: Option<&str>) -> Option<ChapterInfo> {
        let parsed = Url::parse(url.trim()).ok()?;
        let full = parsed.as_str();
        let path_offset = parsed[..Position::BeforePath].len();
        let path = parsed.path();
        let hint = hint.map(str::trim).filter(|h| !h.is_empty());

        for pattern in &self.url_patterns {
            let Some(caps) = pattern.regex.captures(path) else { continue };
            let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else { continue };
            let Ok(value) = digits.as_str().parse::<u64>() else { continue };

            if let Some(hint) = hint {
                let rendered = format!("{}{}", pattern.prefix, digits.as_str());
                if !rendered.eq_ignore_ascii_case(hint) {
                    tracing::debug!(url, %rendered, hint, "URL candidate does not satisfy hint");
                    continue;
                }
            }

            let token_start = path[whole.start()..]
                .find(|c: char| c.is_ascii_alphanumeric())
                .map_or(whole.start(), |i| whole.start() + i);

            let start = path_offset + digits.start();
            let end = path_offset + digits.end();

            return Some(ChapterInfo {
                base_url: full[..start].to_string(),
                numeric_value: value,
                url_template: format!("{}{}{}", &full[..start], PLACEHOLDER, &full[end..]),
                matched_fragment: path[token_start..digits.end()].to_string(),
                source: ChapterSource::Url,
                auto_detected: hint.is_none(),
                digit_width: padded_width(digits.as_str()),
            });
        }

        None
    }

    /// Searches the `<title>`, then the first `h1`-`h3`, of `markup`.
    pub fn detect_from_content(&self, url: &str, markup: &str) -> Option<ChapterInfo> {
        let doc = Document::parse(markup).ok()?;

        [doc.title(), doc.first_heading()].into_iter().flatten().find_map(|text| {
            self.content_patterns.iter().find_map(|regex| {
                let caps = regex.captures(&text)?;
                let value = caps.get(1)?.as_str().parse::<u64>().ok()?;
                Some(ChapterInfo {
                    base_url: url.to_string(),
                    numeric_value: value,
                    url_template: String::new(),
                    matched_fragment: caps.get(0)?.as_str().to_string(),
                    source: ChapterSource::Content,
                    auto_detected: true,
                    digit_width: 0,
                })
            })
        })
    }
}

impl fmt::Display for ChapterInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chapter {} ({})", self.numeric_value, self.matched_fragment)
    }
}
