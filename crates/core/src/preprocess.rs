//! Streaming markup cleanup ahead of parsing.
//!
//! Both extraction stages start here: the readability stage strips
//! non-content tags and unlikely wrappers, the fallback stage additionally
//! removes page chrome (`nav`, `header`, `footer`, ...) and boilerplate
//! containers named by CSS selectors.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

#[allow(clippy::expect_used)]
static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));

#[allow(clippy::expect_used)]
static UNLIKELY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(banner|breadcrumbs?|combx|comment|community|disqus|extra|foot|header|menu|related|remark|rss|shoutbox|sidebar|sponsor|ad-break|agegate|pagination|pager|popup)").expect("valid regex")
});

#[allow(clippy::expect_used)]
static POSITIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(article|body|content|entry|hentry|h-entry|main|page|post|text|blog|story|chapter)")
        .expect("valid regex")
});

#[allow(clippy::expect_used)]
static HIDDEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(display\s*:\s*none|visibility\s*:\s*hidden)").expect("valid regex"));

/// Configuration for HTML preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Tags removed together with their content
    pub strip_tags: Vec<String>,
    /// CSS selectors removed together with their content
    pub strip_selectors: Vec<String>,
    /// Whether to remove HTML comments
    pub remove_comments: bool,
    /// Whether to unwrap elements whose class/id looks like page chrome
    pub remove_unlikely: bool,
    /// Whether to keep elements that also match a content pattern
    pub keep_positive: bool,
    /// Whether to remove elements hidden with inline styles
    pub remove_hidden: bool,
    /// Whether to convert relative URLs to absolute
    pub convert_urls: bool,
    /// Base URL for converting relative URLs
    pub base_url: Option<Url>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            strip_tags: ["script", "style", "noscript", "iframe", "svg", "canvas"]
                .iter()
                .map(|t| t.to_string())
                .collect(),
            strip_selectors: Vec::new(),
            remove_comments: true,
            remove_unlikely: true,
            keep_positive: true,
            remove_hidden: true,
            convert_urls: true,
            base_url: None,
        }
    }
}

impl PreprocessConfig {
    /// Cleanup used by the fallback block selector: drop chrome outright, keep wrappers.
    pub fn for_fallback(strip_tags: &[String], boilerplate_selectors: &[String]) -> Self {
        Self {
            strip_tags: strip_tags.to_vec(),
            strip_selectors: boilerplate_selectors.to_vec(),
            remove_unlikely: false,
            convert_urls: false,
            ..Default::default()
        }
    }
}

/// Preprocess HTML by removing unwanted elements and normalizing the document
pub fn preprocess_html(html: &str, config: &PreprocessConfig) -> String {
    let mut processed = if config.remove_comments { remove_comments(html) } else { html.to_string() };

    let removals: Vec<&str> = config
        .strip_tags
        .iter()
        .chain(config.strip_selectors.iter())
        .map(|s| s.as_str())
        .collect();
    if !removals.is_empty() {
        processed = remove_matching(&processed, &removals);
    }

    if config.remove_unlikely {
        processed = remove_unlikely_candidates(&processed, config.keep_positive);
    }

    if config.remove_hidden {
        processed = remove_hidden_elements(&processed);
    }

    if config.convert_urls
        && let Some(base_url) = &config.base_url
    {
        processed = convert_relative_urls(&processed, base_url);
    }

    processed
}

/// Remove every element matching one of `selectors`, content included.
///
/// Selectors the streaming rewriter cannot handle are skipped.
fn remove_matching(html: &str, selectors: &[&str]) -> String {
    let usable: Vec<&str> = selectors
        .iter()
        .copied()
        .filter(|s| match s.parse::<lol_html::Selector>() {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(selector = s, error = %e, "skipping unsupported strip selector");
                false
            }
        })
        .collect();

    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: usable
                .iter()
                .map(|selector| {
                    lol_html::element!(selector, |el| {
                        el.remove();
                        Ok(())
                    })
                })
                .collect(),
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { output }
}

/// Remove HTML comments from the document
fn remove_comments(html: &str) -> String {
    COMMENT_RE.replace_all(html, "").to_string()
}

/// Unwrap elements that match unlikely candidate patterns, keeping their children
fn remove_unlikely_candidates(html: &str, keep_positive: bool) -> String {
    let is_unlikely = |value: &str| UNLIKELY_RE.is_match(value) && (!keep_positive || !POSITIVE_RE.is_match(value));

    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("*", |el| {
                if matches!(el.tag_name().as_str(), "html" | "body" | "article" | "main") {
                    return Ok(());
                }

                if let Some(id) = el.get_attribute("id")
                    && is_unlikely(&id)
                {
                    el.remove_and_keep_content();
                    return Ok(());
                }

                if let Some(class) = el.get_attribute("class")
                    && class.split_whitespace().any(is_unlikely)
                {
                    el.remove_and_keep_content();
                }

                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { output }
}

/// Convert relative URLs to absolute URLs
pub fn convert_relative_urls(html: &str, base_url: &Url) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![
                lol_html::element!("a[href]", |el| {
                    if let Some(href) = el.get_attribute("href")
                        && !href.trim_start().starts_with("javascript:")
                        && let Ok(absolute) = base_url.join(href.trim())
                    {
                        el.set_attribute("href", absolute.as_str()).ok();
                    }
                    Ok(())
                }),
                lol_html::element!("link[href]", |el| {
                    if let Some(href) = el.get_attribute("href")
                        && let Ok(absolute) = base_url.join(href.trim())
                    {
                        el.set_attribute("href", absolute.as_str()).ok();
                    }
                    Ok(())
                }),
                lol_html::element!("img[src]", |el| {
                    if let Some(src) = el.get_attribute("src")
                        && let Ok(absolute) = base_url.join(src.trim())
                    {
                        el.set_attribute("src", absolute.as_str()).ok();
                    }
                    Ok(())
                }),
            ],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { output }
}

/// Remove elements with display:none or visibility:hidden styles
fn remove_hidden_elements(html: &str) -> String {
    let mut output = String::new();
    let mut rewriter = lol_html::HtmlRewriter::new(
        lol_html::Settings {
            element_content_handlers: vec![lol_html::element!("[style]", |el| {
                if let Some(style) = el.get_attribute("style")
                    && HIDDEN_RE.is_match(&style)
                {
                    el.remove();
                }
                Ok(())
            })],
            ..Default::default()
        },
        |c: &[u8]| {
            output.push_str(&String::from_utf8_lossy(c));
        },
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }

    if output.is_empty() { html.to_string() } else { output }
}
