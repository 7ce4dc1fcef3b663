//! The engine tying fetching, extraction, detection and navigation together.
//!
//! An [`Engine`] owns its configuration, a [`PageSource`] and a handle to a
//! [`PatternMemory`]. Several engines may share one memory, and tests run
//! engines against in-memory page sources.
//!
//! # Example
//!
//! ```rust,no_run
//! use pagewalk_core::{Direction, Engine, EngineConfig};
//!
//! # async fn run() -> pagewalk_core::Result<()> {
//! let engine = Engine::new(EngineConfig::default())?;
//! let outcome = engine.navigate("https://example.com/novel/chapter-12.html", Direction::Next).await?;
//! println!("{} via {}", outcome.target_url, outcome.tier);
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::chapter::{ChapterDetector, ChapterInfo, ChapterSource};
use crate::config::EngineConfig;
use crate::extract::{ExtractionFailure, ExtractionResult, TextExtractor};
use crate::fetch::{HttpFetcher, PageSource, parse_http_url};
use crate::memory::{ClearScope, MemorySnapshot, PatternMemory, StepOutcome};
use crate::navigation::{Direction, NavigationLinks, NavigationTier, resolve};
use crate::{PagewalkError, Result};

/// Where a navigation request leads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationOutcome {
    pub target_url: String,
    /// Chapter number of the target, `None` when it could not be determined.
    pub chapter: Option<u64>,
    pub tier: NavigationTier,
}

/// Chapter and navigation links of a page, from a single fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LockReport {
    pub final_url: String,
    pub chapter: Option<ChapterInfo>,
    pub links: NavigationLinks,
}

/// One chapter collected by [`Engine::collect_book`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookChapter {
    pub url: String,
    pub chapter: Option<u64>,
    pub text: String,
}

/// Content extraction and chapter navigation over a [`PageSource`].
#[derive(Clone)]
pub struct Engine {
    config: EngineConfig,
    source: Arc<dyn PageSource>,
    memory: Arc<PatternMemory>,
    extractor: TextExtractor,
    detector: ChapterDetector,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine fetching over HTTP with a fresh memory.
    ///
    /// # Errors
    ///
    /// Returns [`PagewalkError::ConfigError`] if the HTTP client cannot be
    /// built or a chapter pattern does not compile.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let source = Arc::new(HttpFetcher::new(config.fetch.clone())?);
        Self::with_source(config, source, Arc::new(PatternMemory::new()))
    }

    /// Creates an engine over an arbitrary page source and a shared memory.
    pub fn with_source(config: EngineConfig, source: Arc<dyn PageSource>, memory: Arc<PatternMemory>) -> Result<Self> {
        let detector = ChapterDetector::new(&config.chapter)?;
        let extractor = TextExtractor::new(config.extract.clone());
        Ok(Self { config, source, memory, extractor, detector })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn memory(&self) -> &Arc<PatternMemory> {
        &self.memory
    }

    /// Fetches `url` and extracts its main text.
    ///
    /// Never fails: problems are reported through [`ExtractionResult::failure`].
    /// Successful results are cached in memory under the final URL.
    pub async fn extract(&self, url: &str) -> ExtractionResult {
        if let Err(e) = parse_http_url(url) {
            return ExtractionResult::failed(url, ExtractionFailure::InvalidUrl, e.to_string());
        }

        let fetched = self.source.fetch(url).await;
        if !fetched.succeeded {
            let reason = fetched.error.unwrap_or_else(|| "unreachable".to_string());
            tracing::warn!(url, %reason, "fetch failed, nothing to extract");
            return ExtractionResult::failed(url, ExtractionFailure::Fetch, reason);
        }

        let result = self.extractor.extract_text(&fetched.raw_markup, &fetched.final_url);
        tracing::debug!(url = %result.url, method = %result.method, chars = result.text.chars().count(), "extracted");
        self.memory.cache_content(&result);
        result
    }

    /// Like [`Engine::extract`], but returns no text once `token` is cancelled.
    pub async fn extract_cancellable(&self, url: &str, token: &CancellationToken) -> ExtractionResult {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                ExtractionResult::failed(url, ExtractionFailure::Cancelled, PagewalkError::Cancelled.to_string())
            }
            result = self.extract(url) => result,
        }
    }

    /// Detects the chapter of `url`, fetching the page only when the URL
    /// itself carries no usable number. URL-based detections are stored in
    /// memory, which later navigation requests step from.
    ///
    /// # Errors
    ///
    /// [`PagewalkError::InvalidUrl`], [`PagewalkError::FetchFailure`], or
    /// [`PagewalkError::NoPatternDetected`] when nothing matched.
    pub async fn detect_chapter(&self, url: &str, hint: Option<&str>) -> Result<ChapterInfo> {
        parse_http_url(url)?;

        if let Some(info) = self.detector.detect_from_url(url, hint) {
            self.memory.upsert(info.clone());
            return Ok(info);
        }

        let (markup, final_url) = self.source.fetch(url).await.into_result()?;
        let info = self
            .detector
            .detect(&final_url, Some(&markup), hint)
            .ok_or_else(|| PagewalkError::NoPatternDetected { url: url.to_string() })?;

        if info.source == ChapterSource::Url {
            self.memory.upsert(info.clone());
        }
        Ok(info)
    }

    /// Fetches `url` once and reports its chapter and both navigation links.
    pub async fn check_lock(&self, url: &str, hint: Option<&str>) -> Result<LockReport> {
        parse_http_url(url)?;
        let (markup, final_url) = self.source.fetch(url).await.into_result()?;

        let links = NavigationLinks::from_markup(&markup, &final_url, &self.config.navigation);
        let chapter = self.detector.detect(&final_url, Some(&markup), hint);
        if let Some(info) = chapter.as_ref().filter(|info| info.source == ChapterSource::Url) {
            self.memory.upsert(info.clone());
        }

        Ok(LockReport { final_url, chapter, links })
    }

    /// Resolves the page after (or before) `current_url`.
    ///
    /// When the chapter pattern of `current_url` is stored in memory, the
    /// stored number is stepped and no page is fetched. Otherwise the page
    /// is fetched and link relations, anchor text and URL arithmetic are
    /// tried in that order; if the fetch fails only URL arithmetic is used.
    ///
    /// # Errors
    ///
    /// [`PagewalkError::NoNavigationTarget`] when every tier comes up empty,
    /// including stepping back from chapter 1 of a stored pattern.
    pub async fn navigate(&self, current_url: &str, direction: Direction) -> Result<NavigationOutcome> {
        let parsed = parse_http_url(current_url)?;
        let no_target = || PagewalkError::NoNavigationTarget { url: current_url.to_string(), direction };

        if let Some(outcome) = self.navigate_from_memory(parsed.as_str(), direction) {
            return outcome.ok_or_else(no_target);
        }

        let fetched = self.source.fetch(current_url).await;
        let (markup, base_url) = if fetched.succeeded {
            (Some(fetched.raw_markup), fetched.final_url)
        } else {
            tracing::warn!(url = current_url, error = ?fetched.error, "current page unavailable, using URL arithmetic");
            (None, current_url.to_string())
        };

        let (target_url, tier) =
            resolve(&base_url, markup.as_deref(), direction, &self.config.navigation).ok_or_else(no_target)?;

        let chapter = match tier {
            NavigationTier::LinkRelation | NavigationTier::AnchorText => self.target_chapter(&target_url).await,
            _ => self.detector.detect_from_url(&target_url, None).map(|info| info.numeric_value),
        };

        tracing::debug!(url = current_url, target = %target_url, %tier, ?chapter, "navigation resolved");
        Ok(NavigationOutcome { target_url, chapter, tier })
    }

    /// `None` when memory has no pattern reproducing the URL, `Some(None)`
    /// when the stored pattern cannot move in `direction`.
    fn navigate_from_memory(&self, current_url: &str, direction: Direction) -> Option<Option<NavigationOutcome>> {
        let base_url = self.memory.base_for_url(current_url)?;

        match self.memory.step(&base_url, direction) {
            StepOutcome::Moved(info) => {
                let target_url = info.format_url(info.numeric_value)?;
                tracing::debug!(url = current_url, target = %target_url, chapter = info.numeric_value, "navigation from memory");
                Some(Some(NavigationOutcome {
                    target_url,
                    chapter: Some(info.numeric_value),
                    tier: NavigationTier::Memory,
                }))
            }
            StepOutcome::AtBoundary => Some(None),
            StepOutcome::NotStored => {
                tracing::debug!(url = current_url, %base_url, "pattern cleared during navigation");
                None
            }
        }
    }

    /// Chapter number of a link target, from its URL or, when allowed, its content.
    async fn target_chapter(&self, target_url: &str) -> Option<u64> {
        if let Some(info) = self.detector.detect_from_url(target_url, None) {
            return Some(info.numeric_value);
        }
        if !self.config.navigation.probe_target {
            return None;
        }

        let fetched = self.source.fetch(target_url).await;
        if !fetched.succeeded {
            tracing::debug!(url = target_url, "could not probe navigation target");
            return None;
        }
        self.detector
            .detect_from_content(&fetched.final_url, &fetched.raw_markup)
            .map(|info| info.numeric_value)
    }

    /// Adds `url` to the queue; `false` when it was already queued.
    pub fn enqueue(&self, url: &str) -> Result<bool> {
        let parsed = parse_http_url(url)?;
        Ok(self.memory.enqueue(parsed.as_str()))
    }

    /// Walks `next` links from `start_url`, extracting every chapter.
    ///
    /// The walk ends when navigation fails, a URL repeats, a page yields no
    /// text, or `max_chapters` (default from the config) pages were read.
    ///
    /// # Errors
    ///
    /// Fails only when the start page itself cannot be fetched or read.
    pub async fn collect_book(&self, start_url: &str, max_chapters: Option<usize>) -> Result<Vec<BookChapter>> {
        parse_http_url(start_url)?;
        let cap = max_chapters.unwrap_or(self.config.max_book_chapters);

        let mut chapters = Vec::new();
        let mut seen = HashSet::new();
        let mut url = start_url.to_string();

        while chapters.len() < cap {
            if !seen.insert(url.clone()) {
                tracing::debug!(%url, "book walk reached a page it already read");
                break;
            }

            let fetched = self.source.fetch(&url).await;
            if !fetched.succeeded {
                if chapters.is_empty() {
                    let reason = fetched.error.unwrap_or_else(|| "unreachable".to_string());
                    return Err(PagewalkError::FetchFailure { url, reason });
                }
                break;
            }
            seen.insert(fetched.final_url.clone());

            let result = self.extractor.extract_text(&fetched.raw_markup, &fetched.final_url);
            if !result.is_success() {
                if chapters.is_empty() {
                    return Err(PagewalkError::NoContentFound { url });
                }
                break;
            }
            self.memory.cache_content(&result);

            let chapter = self
                .detector
                .detect(&fetched.final_url, Some(&fetched.raw_markup), None)
                .map(|info| info.numeric_value);
            let next = resolve(&fetched.final_url, Some(&fetched.raw_markup), Direction::Next, &self.config.navigation);

            tracing::info!(url = %fetched.final_url, ?chapter, collected = chapters.len() + 1, "chapter collected");
            chapters.push(BookChapter { url: fetched.final_url, chapter, text: result.text });

            match next {
                Some((next_url, _)) => url = next_url,
                None => break,
            }
        }

        Ok(chapters)
    }

    pub fn inspect_memory(&self) -> MemorySnapshot {
        self.memory.snapshot()
    }

    pub fn clear_memory(&self, scope: ClearScope) -> usize {
        self.memory.clear(scope)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;
    use crate::fetch::FetchResult;

    #[derive(Default)]
    struct StaticSource {
        pages: HashMap<String, String>,
    }

    impl StaticSource {
        fn page(mut self, url: &str, markup: &str) -> Self {
            self.pages.insert(url.to_string(), markup.to_string());
            self
        }
    }

    #[async_trait]
    impl PageSource for StaticSource {
        async fn fetch(&self, url: &str) -> FetchResult {
            match self.pages.get(url) {
                Some(markup) => FetchResult {
                    raw_markup: markup.clone(),
                    final_url: url.to_string(),
                    succeeded: true,
                    status: Some(200),
                    attempts: 1,
                    error: None,
                },
                None => FetchResult {
                    final_url: url.to_string(),
                    status: Some(404),
                    attempts: 1,
                    error: Some("HTTP 404 Not Found".to_string()),
                    ..Default::default()
                },
            }
        }
    }

    fn engine(source: StaticSource) -> Engine {
        Engine::with_source(EngineConfig::default(), Arc::new(source), Arc::new(PatternMemory::new())).unwrap()
    }

    #[tokio::test]
    async fn test_navigate_from_memory_does_not_fetch() {
        let engine = engine(StaticSource::default());
        engine.detect_chapter("https://x.com/p5", None).await.unwrap();

        let outcome = engine.navigate("https://x.com/p5", Direction::Previous).await.unwrap();
        assert_eq!(outcome.target_url, "https://x.com/p4");
        assert_eq!(outcome.chapter, Some(4));
        assert_eq!(outcome.tier, NavigationTier::Memory);
    }

    #[tokio::test]
    async fn test_memory_floor_is_no_target() {
        let engine = engine(StaticSource::default());
        engine.detect_chapter("https://x.com/p1", None).await.unwrap();

        let err = engine.navigate("https://x.com/p1", Direction::Previous).await.unwrap_err();
        assert!(matches!(err, PagewalkError::NoNavigationTarget { direction: Direction::Previous, .. }));
    }

    #[tokio::test]
    async fn test_cleared_pattern_falls_through_to_page_tiers() {
        let engine = engine(StaticSource::default());
        engine.detect_chapter("https://x.com/p5", None).await.unwrap();
        engine.clear_memory(ClearScope::Patterns);

        let outcome = engine.navigate("https://x.com/p5", Direction::Previous).await.unwrap();
        assert_eq!(outcome.tier, NavigationTier::UrlArithmetic);
        assert_eq!(outcome.target_url, "https://x.com/p4");
    }

    #[tokio::test]
    async fn test_unreachable_page_uses_url_arithmetic() {
        let engine = engine(StaticSource::default());
        let outcome = engine
            .navigate("https://example.com/novel/chapter-12.html", Direction::Next)
            .await
            .unwrap();
        assert_eq!(outcome.target_url, "https://example.com/novel/chapter-13.html");
        assert_eq!(outcome.tier, NavigationTier::UrlArithmetic);
        assert_eq!(outcome.chapter, Some(13));
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected() {
        let engine = engine(StaticSource::default());
        assert!(matches!(engine.navigate("nope", Direction::Next).await, Err(PagewalkError::InvalidUrl(_))));
        let result = engine.extract("nope").await;
        assert!(!result.is_success());
        assert_eq!(result.failure, Some(ExtractionFailure::InvalidUrl));
        assert!(engine.enqueue("ftp://x/1").is_err());
    }

    #[tokio::test]
    async fn test_cancelled_extraction_has_no_text() {
        let engine = engine(StaticSource::default().page("https://a.com/1", "<p>text</p>"));
        let token = CancellationToken::new();
        token.cancel();
        let result = engine.extract_cancellable("https://a.com/1", &token).await;
        assert!(result.text.is_empty());
        assert_eq!(result.error.as_deref(), Some("Operation cancelled"));
        assert_eq!(result.failure, Some(ExtractionFailure::Cancelled));
    }
}
