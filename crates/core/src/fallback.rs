//! Scored heuristic container selection.
//!
//! The second extraction stage. After stripping chrome and boilerplate, a
//! fixed list of well-known content containers is scored by paragraph text
//! and paragraph count; link-heavy containers are disqualified. When no
//! container qualifies the visible text of the whole body is used.

use std::collections::HashSet;

use url::Url;

use crate::extract::ExtractConfig;
use crate::parse::{Document, Element};
use crate::preprocess::PreprocessConfig;
use crate::text::{char_count, html_to_text, normalize_text};
use crate::Result;

/// Scores for one fallback candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockScore {
    /// Characters of paragraph text (of all text when there are no paragraphs)
    pub text_chars: usize,
    pub paragraphs: usize,
    /// Anchors per word, `anchors / (words + 1)`
    pub link_density: f64,
    pub score: f64,
}

/// The container chosen by [`select_block`].
#[derive(Debug, Clone)]
pub struct BlockSelection {
    pub text: String,
    /// Selector that matched the winning container, `None` for the body fallback.
    pub selector: Option<String>,
    pub score: f64,
}

/// Scores a candidate container.
pub fn score_block(element: &Element<'_>, config: &ExtractConfig) -> BlockScore {
    let paragraphs = element.select("p").unwrap_or_default();

    let text_chars = if paragraphs.is_empty() {
        char_count(&normalize_text(&element.text()))
    } else {
        paragraphs.iter().map(|p| char_count(&normalize_text(&p.text()))).sum()
    };

    let anchors = element.select("a").map(|a| a.len()).unwrap_or(0);
    let link_density = anchors as f64 / (word_count(&element.text()) as f64 + 1.0);

    let score = text_chars as f64 + config.paragraph_bonus * paragraphs.len() as f64;
    BlockScore { text_chars, paragraphs: paragraphs.len(), link_density, score }
}

/// Picks the best content container from `markup` and returns its text.
///
/// # Errors
///
/// Returns [`crate::PagewalkError::HtmlParseError`] if a configured candidate
/// selector is invalid.
pub fn select_block(markup: &str, base_url: Option<&Url>, config: &ExtractConfig) -> Result<BlockSelection> {
    let cleaning = PreprocessConfig::for_fallback(&config.strip_tags, &config.boilerplate_selectors);
    let doc = Document::parse_with_preprocessing(markup, base_url.cloned(), &cleaning)?;

    let mut seen = HashSet::new();
    let mut best: Option<(String, Element<'_>, f64)> = None;

    for selector in &config.candidate_selectors {
        for candidate in doc.select(selector)? {
            if !seen.insert(candidate.element_ref().id()) {
                continue;
            }

            let score = score_block(&candidate, config);
            if score.link_density > config.max_link_density {
                tracing::debug!(selector = %selector, density = score.link_density, "fallback candidate disqualified");
                continue;
            }
            if score.text_chars == 0 {
                continue;
            }
            if best.as_ref().is_none_or(|(_, _, top)| score.score > *top) {
                best = Some((selector.clone(), candidate, score.score));
            }
        }
    }

    match best {
        Some((selector, element, score)) => {
            tracing::debug!(selector = %selector, score, "fallback selected container");
            Ok(BlockSelection { text: html_to_text(&element.outer_html()), selector: Some(selector), score })
        }
        None => {
            tracing::debug!("no fallback container qualified, using body text");
            let text = match doc.body() {
                Some(body) => html_to_text(&body.outer_html()),
                None => normalize_text(&doc.text_content()),
            };
            Ok(BlockSelection { text, selector: None, score: 0.0 })
        }
    }
}

/// Counts words, treating each CJK character as a word of its own.
pub fn word_count(text: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;

    for c in text.chars() {
        if is_cjk(c) {
            count += 1;
            in_word = false;
        } else if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            count += 1;
            in_word = true;
        }
    }

    count
}

fn is_cjk(c: char) -> bool {
    matches!(c as u32,
        0x3040..=0x30FF | 0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xAC00..=0xD7AF | 0xF900..=0xFAFF)
}
