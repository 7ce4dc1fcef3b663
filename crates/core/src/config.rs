//! Engine configuration.
//!
//! Every threshold, keyword list and pattern list the engine uses lives in
//! [`EngineConfig`]. Build one with [`EngineConfig::builder`]:
//!
//! ```rust
//! use pagewalk_core::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .timeout(5)
//!     .max_retries(0)
//!     .min_content_chars(100)
//!     .probe_target(false)
//!     .build();
//!
//! assert_eq!(config.fetch.timeout, 5);
//! assert_eq!(config.extract.min_content_chars, 100);
//! ```

use serde::{Deserialize, Serialize};

use crate::chapter::{ChapterConfig, UrlPatternSpec};
use crate::extract::ExtractConfig;
use crate::fetch::FetchConfig;
use crate::navigation::NavigationConfig;

/// Default cap on chapters collected by one book walk.
pub const DEFAULT_MAX_BOOK_CHAPTERS: usize = 4000;

/// Configuration for an [`crate::Engine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub fetch: FetchConfig,
    pub extract: ExtractConfig,
    pub chapter: ChapterConfig,
    pub navigation: NavigationConfig,
    /// Upper bound for [`crate::Engine::collect_book`] (default: 4000).
    pub max_book_chapters: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            extract: ExtractConfig::default(),
            chapter: ChapterConfig::default(),
            navigation: NavigationConfig::default(),
            max_book_chapters: DEFAULT_MAX_BOOK_CHAPTERS,
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }
}

/// Builder for creating [`EngineConfig`] instances.
#[derive(Debug, Clone)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: EngineConfig::default() }
    }

    /// Sets the request timeout in seconds.
    pub fn timeout(mut self, secs: u64) -> Self {
        self.config.fetch.timeout = secs;
        self
    }

    /// Sets the number of retries after the first attempt.
    pub fn max_retries(mut self, value: u32) -> Self {
        self.config.fetch.max_retries = value;
        self
    }

    /// Sets the delay between attempts in milliseconds.
    pub fn retry_delay_ms(mut self, value: u64) -> Self {
        self.config.fetch.retry_delay_ms = value;
        self
    }

    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.config.fetch.user_agent = value.into();
        self
    }

    /// Sets the length primary extraction output must exceed.
    pub fn min_content_chars(mut self, value: usize) -> Self {
        self.config.extract.min_content_chars = value;
        self
    }

    /// Sets the fallback link density limit.
    pub fn max_link_density(mut self, value: f64) -> Self {
        self.config.extract.max_link_density = value;
        self
    }

    pub fn paragraph_bonus(mut self, value: f64) -> Self {
        self.config.extract.paragraph_bonus = value;
        self
    }

    /// Replaces the URL pattern list.
    pub fn url_patterns(mut self, patterns: Vec<UrlPatternSpec>) -> Self {
        self.config.chapter.url_patterns = patterns;
        self
    }

    /// Adds a "next" keyword, lowercased.
    pub fn next_keyword(mut self, keyword: &str) -> Self {
        self.config.navigation.next_keywords.push(keyword.to_lowercase());
        self
    }

    /// Adds a "previous" keyword, lowercased.
    pub fn previous_keyword(mut self, keyword: &str) -> Self {
        self.config.navigation.previous_keywords.push(keyword.to_lowercase());
        self
    }

    /// Sets whether link targets may be fetched to learn their chapter.
    pub fn probe_target(mut self, value: bool) -> Self {
        self.config.navigation.probe_target = value;
        self
    }

    pub fn max_book_chapters(mut self, value: usize) -> Self {
        self.config.max_book_chapters = value;
        self
    }

    pub fn fetch(mut self, fetch: FetchConfig) -> Self {
        self.config.fetch = fetch;
        self
    }

    pub fn extract(mut self, extract: ExtractConfig) -> Self {
        self.config.extract = extract;
        self
    }

    /// Builds the config.
    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.max_book_chapters, 4000);
        assert_eq!(config.fetch.max_retries, 2);
        assert_eq!(config.extract.min_content_chars, 250);
        assert!(config.navigation.probe_target);
        assert_eq!(config.chapter.url_patterns.len(), 8);
    }

    #[test]
    fn test_builder_keywords_are_lowercased() {
        let config = EngineConfig::builder().next_keyword("Weiter").previous_keyword("Zurück").build();
        assert!(config.navigation.next_keywords.contains(&"weiter".to_string()));
        assert!(config.navigation.previous_keywords.contains(&"zurück".to_string()));
    }

    #[test]
    fn test_builder_overrides() {
        let config = EngineConfig::builder()
            .retry_delay_ms(10)
            .user_agent("pagewalk-test")
            .max_link_density(0.3)
            .paragraph_bonus(10.0)
            .max_book_chapters(5)
            .build();
        assert_eq!(config.fetch.retry_delay_ms, 10);
        assert_eq!(config.fetch.user_agent, "pagewalk-test");
        assert_eq!(config.extract.max_link_density, 0.3);
        assert_eq!(config.extract.paragraph_bonus, 10.0);
        assert_eq!(config.max_book_chapters, 5);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let json = serde_json::to_string(&EngineConfig::default()).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.chapter, ChapterConfig::default());
    }
}
