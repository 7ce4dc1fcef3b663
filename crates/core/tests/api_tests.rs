//! Library API integration tests
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pagewalk_core::*;

/// In-memory page source that counts requests.
#[derive(Default)]
struct FixtureSource {
    pages: HashMap<String, String>,
    requests: AtomicUsize,
}

impl FixtureSource {
    fn with(pages: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            pages: pages.iter().map(|(u, m)| (u.to_string(), m.to_string())).collect(),
            requests: AtomicUsize::new(0),
        })
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSource for FixtureSource {
    async fn fetch(&self, url: &str) -> FetchResult {
        self.requests.fetch_add(1, Ordering::SeqCst);
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

fn engine_over(source: Arc<FixtureSource>, memory: Arc<PatternMemory>) -> Engine {
    Engine::with_source(EngineConfig::default(), source, memory).expect("engine")
}

const CHAPTER_12: &str = "https://example.com/novel/chapter-12.html";

fn long_prose(label: &str) -> String {
    (1..=5)
        .map(|i| {
            format!(
                "<p>{label}, part {i}: the tide came in over the flats, grey and patient, and the gulls rose \
                 ahead of it, crying, wheeling, settling again on the last dry ridge of sand.</p>"
            )
        })
        .collect()
}

#[tokio::test]
async fn test_detect_from_url_without_fetching() {
    let source = FixtureSource::with(&[]);
    let engine = engine_over(source.clone(), Arc::new(PatternMemory::new()));

    let info = engine.detect_chapter(CHAPTER_12, None).await.unwrap();

    assert_eq!(info.numeric_value, 12);
    assert_eq!(info.format_url(12).as_deref(), Some(CHAPTER_12));
    assert_eq!(source.requests(), 0);
    assert_eq!(engine.inspect_memory().patterns.len(), 1);
}

#[tokio::test]
async fn test_detect_from_content_is_not_stored() {
    let url = "https://example.com/read?book=tide";
    let source = FixtureSource::with(&[(url, "<html><head><title>第 8 章</title></head><body></body></html>")]);
    let engine = engine_over(source, Arc::new(PatternMemory::new()));

    let info = engine.detect_chapter(url, None).await.unwrap();

    assert_eq!(info.numeric_value, 8);
    assert_eq!(info.source, ChapterSource::Content);
    assert!(engine.inspect_memory().patterns.is_empty());
}

#[tokio::test]
async fn test_detect_reports_missing_pattern() {
    let url = "https://example.com/about";
    let source = FixtureSource::with(&[(url, "<html><head><title>About us</title></head></html>")]);
    let engine = engine_over(source, Arc::new(PatternMemory::new()));

    let err = engine.detect_chapter(url, None).await.unwrap_err();
    assert!(matches!(err, PagewalkError::NoPatternDetected { .. }));
    assert!(err.is_recoverable());
}

#[tokio::test]
async fn test_detect_is_idempotent() {
    let engine = engine_over(FixtureSource::with(&[]), Arc::new(PatternMemory::new()));
    let first = engine.detect_chapter(CHAPTER_12, None).await.unwrap();
    let second = engine.detect_chapter(CHAPTER_12, None).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_tier_three_next_then_previous_round_trips() {
    let engine = engine_over(FixtureSource::with(&[]), Arc::new(PatternMemory::new()));

    let next = engine.navigate(CHAPTER_12, Direction::Next).await.unwrap();
    assert_eq!(next.target_url, "https://example.com/novel/chapter-13.html");
    assert_eq!(next.tier, NavigationTier::UrlArithmetic);

    let back = engine.navigate(&next.target_url, Direction::Previous).await.unwrap();
    assert_eq!(back.target_url, CHAPTER_12);
    assert_eq!(back.chapter, Some(12));
}

#[tokio::test]
async fn test_zero_padding_survives_navigation() {
    let engine = engine_over(FixtureSource::with(&[]), Arc::new(PatternMemory::new()));
    let outcome = engine.navigate("https://example.com/book/007.html", Direction::Next).await.unwrap();
    assert_eq!(outcome.target_url, "https://example.com/book/008.html");
    assert_eq!(outcome.chapter, Some(8));
}

#[tokio::test]
async fn test_link_relation_beats_url_arithmetic() {
    let page = r#"<html><head><link rel="next" href="/novel/chapter-20.html"></head><body></body></html>"#;
    let engine = engine_over(FixtureSource::with(&[(CHAPTER_12, page)]), Arc::new(PatternMemory::new()));

    let outcome = engine.navigate(CHAPTER_12, Direction::Next).await.unwrap();

    assert_eq!(outcome.target_url, "https://example.com/novel/chapter-20.html");
    assert_eq!(outcome.tier, NavigationTier::LinkRelation);
    assert_eq!(outcome.chapter, Some(20));
}

#[tokio::test]
async fn test_anchor_target_chapter_is_probed_not_guessed() {
    let current = "https://example.com/read?id=abc";
    let target = "https://example.com/read?id=def";
    let source = FixtureSource::with(&[
        (current, r#"<html><body><a href="/read?id=def">下一章</a></body></html>"#),
        (target, "<html><head><title>Chapter 41: Salt</title></head><body></body></html>"),
    ]);
    let engine = engine_over(source.clone(), Arc::new(PatternMemory::new()));

    let outcome = engine.navigate(current, Direction::Next).await.unwrap();

    assert_eq!(outcome.target_url, target);
    assert_eq!(outcome.tier, NavigationTier::AnchorText);
    assert_eq!(outcome.chapter, Some(41));
    assert_eq!(source.requests(), 2);
}

#[tokio::test]
async fn test_unknown_target_chapter_without_probe() {
    let current = "https://example.com/read?id=abc";
    let source = FixtureSource::with(&[(current, r#"<a href="/read?id=def">Next »</a>"#)]);
    let config = EngineConfig::builder().probe_target(false).build();
    let engine = Engine::with_source(config, source.clone(), Arc::new(PatternMemory::new())).unwrap();

    let outcome = engine.navigate(current, Direction::Next).await.unwrap();

    assert_eq!(outcome.chapter, None);
    assert_eq!(source.requests(), 1);
}

#[tokio::test]
async fn test_no_navigation_target() {
    let current = "https://example.com/about";
    let engine = engine_over(FixtureSource::with(&[(current, "<p>About</p>")]), Arc::new(PatternMemory::new()));

    let err = engine.navigate(current, Direction::Next).await.unwrap_err();
    assert!(matches!(err, PagewalkError::NoNavigationTarget { direction: Direction::Next, .. }));
}

#[tokio::test]
async fn test_memory_shared_between_engines() {
    let memory = Arc::new(PatternMemory::new());
    let source = FixtureSource::with(&[]);
    let first = engine_over(source.clone(), Arc::clone(&memory));
    let second = engine_over(source.clone(), Arc::clone(&memory));

    first.detect_chapter("https://x.com/p5", None).await.unwrap();
    let outcome = second.navigate("https://x.com/p5", Direction::Previous).await.unwrap();

    assert_eq!(outcome.target_url, "https://x.com/p4");
    assert_eq!(outcome.tier, NavigationTier::Memory);
    assert_eq!(source.requests(), 0);
    assert_eq!(memory.get("https://x.com/p").unwrap().numeric_value, 4);
}

#[tokio::test]
async fn test_memory_previous_stops_at_one() {
    let memory = Arc::new(PatternMemory::new());
    let engine = engine_over(FixtureSource::with(&[]), Arc::clone(&memory));
    engine.detect_chapter("https://x.com/p2", None).await.unwrap();

    assert_eq!(engine.navigate("https://x.com/p2", Direction::Previous).await.unwrap().chapter, Some(1));
    assert!(engine.navigate("https://x.com/p1", Direction::Previous).await.is_err());
    assert_eq!(memory.get("https://x.com/p").unwrap().numeric_value, 1);
}

#[tokio::test]
async fn test_hinted_lock_navigates_from_memory() {
    let memory = Arc::new(PatternMemory::new());
    let source = FixtureSource::with(&[]);
    let engine = engine_over(source.clone(), Arc::clone(&memory));
    let current = "https://example.com/chapter-2/p14.html";

    let info = engine.detect_chapter(current, Some("chapter2")).await.unwrap();
    assert_eq!(info.base_url, "https://example.com/chapter-");

    let outcome = engine.navigate(current, Direction::Next).await.unwrap();
    assert_eq!(outcome.target_url, "https://example.com/chapter-3/p14.html");
    assert_eq!(outcome.tier, NavigationTier::Memory);
    assert_eq!(outcome.chapter, Some(3));
    assert_eq!(source.requests(), 0);

    let stored = memory.get("https://example.com/chapter-").unwrap();
    assert_eq!(stored.numeric_value, 3);
    assert_eq!(stored.matched_fragment, "chapter-3");
}

#[tokio::test]
async fn test_check_lock_reports_chapter_and_links() {
    let page = r#"<html><head><title>Chapter 12</title></head><body>
        <a href="/novel/chapter-11.html">« Previous</a>
        <a href="/novel/chapter-13.html">Next »</a>
    </body></html>"#;
    let engine = engine_over(FixtureSource::with(&[(CHAPTER_12, page)]), Arc::new(PatternMemory::new()));

    let report = engine.check_lock(CHAPTER_12, None).await.unwrap();

    assert_eq!(report.final_url, CHAPTER_12);
    assert_eq!(report.chapter.unwrap().numeric_value, 12);
    assert_eq!(report.links.next.unwrap().url, "https://example.com/novel/chapter-13.html");
    assert_eq!(report.links.previous.unwrap().url, "https://example.com/novel/chapter-11.html");
    assert_eq!(engine.inspect_memory().patterns.len(), 1);
}

#[tokio::test]
async fn test_check_lock_fetch_failure() {
    let engine = engine_over(FixtureSource::with(&[]), Arc::new(PatternMemory::new()));
    let err = engine.check_lock(CHAPTER_12, None).await.unwrap_err();
    assert!(matches!(err, PagewalkError::FetchFailure { .. }));
}

#[tokio::test]
async fn test_extract_caches_successful_results() {
    let page = format!(
        "<html><head><title>Tides</title><meta name=\"description\" content=\"Flats\"></head><body>\
         <nav><a href=\"/\">Home</a></nav><div class=\"chapter-content\">{}</div></body></html>",
        long_prose("Tides")
    );
    let engine = engine_over(FixtureSource::with(&[(CHAPTER_12, page.as_str())]), Arc::new(PatternMemory::new()));

    let result = engine.extract(CHAPTER_12).await;

    assert_eq!(result.method, ExtractionMethod::Primary);
    assert_eq!(result.title.as_deref(), Some("Tides"));
    assert_eq!(result.meta_description.as_deref(), Some("Flats"));
    assert!(result.text.contains("Tides, part 5"));
    assert!(!result.text.contains("Home"));
    assert!(!result.text.contains("\n\n"));
    assert_eq!(result.text, result.text.trim());
    assert_eq!(engine.memory().cached_content(CHAPTER_12), Some(result));
}

#[tokio::test]
async fn test_extract_fetch_failure_is_reported() {
    let engine = engine_over(FixtureSource::with(&[]), Arc::new(PatternMemory::new()));
    let result = engine.extract(CHAPTER_12).await;
    assert_eq!(result.method, ExtractionMethod::None);
    assert!(result.text.is_empty());
    assert!(result.error.unwrap().contains("404"));
    assert!(engine.inspect_memory().cached_urls.is_empty());
}

#[test]
fn test_link_dense_block_never_chosen() {
    let anchors = (0..100).map(|i| format!("<a href=\"/tag/{i}\">tag</a>")).collect::<Vec<_>>().join(" ");
    let words = "filler ".repeat(20);
    let html = format!(
        r#"<html><body>
            <div class="content"><p>{anchors} {words}</p></div>
            <div class="entry-content"><p>The only real paragraph on this page, short but genuine.</p></div>
        </body></html>"#
    );
    let config = ExtractConfig { min_content_chars: 100_000, ..ExtractConfig::default() };
    let result = TextExtractor::new(config).extract_text(&html, "https://example.com/tags");

    assert_eq!(result.method, ExtractionMethod::Fallback);
    assert_eq!(result.text, "The only real paragraph on this page, short but genuine.");
}

#[tokio::test]
async fn test_clear_memory_scopes() {
    let engine = engine_over(FixtureSource::with(&[]), Arc::new(PatternMemory::new()));
    engine.detect_chapter(CHAPTER_12, None).await.unwrap();
    assert!(engine.enqueue("https://example.com/novel/chapter-13.html").unwrap());
    assert!(!engine.enqueue("https://example.com/novel/chapter-13.html").unwrap());

    assert_eq!(engine.clear_memory(ClearScope::Queue), 1);
    assert_eq!(engine.clear_memory(ClearScope::All), 1);
    assert_eq!(engine.inspect_memory(), MemorySnapshot::default());
}
