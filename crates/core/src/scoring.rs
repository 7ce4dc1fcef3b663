//! Readability-style element scoring used by the structured extractor.

use std::sync::LazyLock;

use regex::Regex;

use crate::parse::Element;

#[allow(clippy::expect_used)]
static POSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story|chapter|read)")
        .expect("valid regex")
});

#[allow(clippy::expect_used)]
static NEGATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup|share|social|toc|catalog)").expect("valid regex")
});

/// Configuration for content scoring
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    /// Weight for positive class/ID patterns
    pub positive_weight: f64,
    /// Weight for negative class/ID patterns
    pub negative_weight: f64,
    /// Maximum content density score from character count
    pub max_char_density_score: f64,
    /// Maximum content density score from clause separators
    pub max_comma_density_score: f64,
    /// Characters per point for content density scoring
    pub chars_per_point: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            positive_weight: 25.0,
            negative_weight: -25.0,
            max_char_density_score: 3.0,
            max_comma_density_score: 3.0,
            chars_per_point: 100,
        }
    }
}

/// Result of scoring an element
#[derive(Debug, Clone)]
pub struct ScoreResult {
    pub tag_name: String,
    pub base_score: f64,
    pub class_weight: f64,
    pub content_density: f64,
    /// Share of the element's text that sits inside links (0.0 to 1.0)
    pub link_density: f64,
    pub final_score: f64,
}

/// Base score from the tag name: prose containers up, lists and chrome down.
pub fn base_tag_score(element: &Element<'_>) -> f64 {
    match element.tag_name().as_str() {
        "article" => 10.0,
        "main" | "section" => 8.0,
        "div" => 5.0,
        "td" | "blockquote" => 3.0,
        "form" => -3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" | "header" | "footer" | "nav" => -5.0,
        _ => 0.0,
    }
}

/// Class/ID weight: the id is checked first, then each class name; positive wins ties.
pub fn class_id_weight(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let names = element
        .attr("id")
        .into_iter()
        .chain(element.attr("class").into_iter().flat_map(str::split_whitespace));

    for name in names {
        if POSITIVE_RE.is_match(name) {
            return config.positive_weight;
        }
        if NEGATIVE_RE.is_match(name) {
            return config.negative_weight;
        }
    }

    0.0
}

/// Content density from text length and clause separators.
///
/// Full-width CJK punctuation counts like commas so that Chinese and
/// Japanese prose scores comparably to English.
pub fn content_density_score(element: &Element<'_>, config: &ScoreConfig) -> f64 {
    let text = element.text();
    let char_score = ((text.chars().count() / config.chars_per_point) as f64).min(config.max_char_density_score);
    let separators = text.chars().filter(|c| matches!(c, ',' | '，' | '、' | '。')).count();
    let comma_score = (separators as f64).min(config.max_comma_density_score);

    char_score + comma_score
}

/// Ratio of link text characters to total text characters.
pub fn link_density(element: &Element<'_>) -> f64 {
    let text_length = element.text().chars().count();
    if text_length == 0 {
        return 0.0;
    }

    let link_text_length = element
        .select("a")
        .unwrap_or_default()
        .iter()
        .map(|link| link.text().chars().count())
        .sum::<usize>();

    (link_text_length as f64 / text_length as f64).min(1.0)
}

/// Final score: `(tag + class/id + density) * (1 - link_density)`.
///
/// The link penalty is halved for elements with a content-like class/id or
/// more than 500 characters of text.
pub fn calculate_score(element: &Element<'_>, config: &ScoreConfig) -> ScoreResult {
    let base_score = base_tag_score(element);
    let class_weight = class_id_weight(element, config);
    let content_density = content_density_score(element, config);
    let ld = link_density(element);

    let content_rich = element.text().chars().count() > 500;
    let link_penalty = if class_weight > 0.0 || content_rich { 1.0 - ld * 0.5 } else { 1.0 - ld };
    let final_score = (base_score + class_weight + content_density) * link_penalty;

    ScoreResult { tag_name: element.tag_name(), base_score, class_weight, content_density, link_density: ld, final_score }
}
