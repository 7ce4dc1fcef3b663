//! Readability-style structured extractor.
//!
//! This is the primary extraction stage. It cleans the markup, scores every
//! plausible content container, lets scores flow up to parents and
//! grandparents, picks the best container and pulls in qualifying siblings.
//! The [`StructuredExtractor`] trait is the seam the text extractor uses, so
//! the algorithm can be swapped without touching the staged pipeline.
//!
//! # Example
//!
//! ```rust
//! use pagewalk_core::readability::{ReadabilityExtractor, StructuredExtractor};
//!
//! let html = r#"<html><body><article class="chapter">
//!     <p>The rain had not stopped for three days, and the river was rising, slowly, steadily.</p>
//!     <p>Mara counted the sandbags again, then once more, because counting was easier than waiting.</p>
//! </article></body></html>"#;
//!
//! let text = ReadabilityExtractor::default().extract(html, None).unwrap();
//! assert!(text.contains("sandbags"));
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use scraper::ElementRef;
use url::Url;

use crate::parse::{Document, Element};
use crate::preprocess::PreprocessConfig;
use crate::scoring::{ScoreConfig, calculate_score, link_density};
use crate::text::html_to_text;
use crate::{PagewalkError, Result};

/// A main-content extractor returning plain text.
pub trait StructuredExtractor: Send + Sync {
    /// Extracts the main content of `markup` as plain text.
    ///
    /// # Errors
    ///
    /// Returns [`PagewalkError::NoContentFound`] when no container qualifies.
    fn extract(&self, markup: &str, base_url: Option<&Url>) -> Result<String>;
}

/// Configuration for the readability extractor.
#[derive(Debug, Clone)]
pub struct ReadabilityConfig {
    /// Minimum score the top candidate must reach (default: 20.0).
    pub min_score: f64,
    /// Minimum text length for `p`/`td`/`pre`/`blockquote` candidates (default: 25).
    pub min_candidate_chars: usize,
    /// Maximum elements to score, 0 for unlimited (default: 1000).
    pub max_elements: usize,
    /// Sibling score threshold as a fraction of the top score (default: 0.2).
    pub sibling_threshold: f64,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self { min_score: 20.0, min_candidate_chars: 25, max_elements: 1000, sibling_threshold: 0.2 }
    }
}

/// HTML selected by the readability pass.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Outer HTML of the top candidate and its included siblings, in document order
    pub html: String,
    pub top_score: f64,
    pub element_count: usize,
}

#[derive(Debug, Clone)]
struct Candidate<'a> {
    element: Element<'a>,
    score: f64,
}

const CANDIDATE_SELECTOR: &str = "div, article, section, main, p, td, pre, blockquote";

/// Readability-inspired [`StructuredExtractor`].
#[derive(Debug, Clone, Default)]
pub struct ReadabilityExtractor {
    config: ReadabilityConfig,
    score_config: ScoreConfig,
}

impl ReadabilityExtractor {
    pub fn new(config: ReadabilityConfig) -> Self {
        Self { config, score_config: ScoreConfig::default() }
    }

    /// Runs the readability pass and returns the selected HTML.
    pub fn extract_html(&self, markup: &str, base_url: Option<&Url>) -> Result<ExtractedContent> {
        let doc = Document::parse_with_preprocessing(markup, base_url.cloned(), &PreprocessConfig::default())?;
        let no_content = || PagewalkError::NoContentFound { url: base_url.map(|u| u.to_string()).unwrap_or_default() };

        let mut candidates = self.identify_candidates(&doc);
        self.propagate_scores(&mut candidates);

        let top = candidates
            .iter()
            .max_by(|a, b| compare_candidates(a, b))
            .ok_or_else(no_content)?;

        if top.score < self.config.min_score {
            tracing::debug!(score = top.score, threshold = self.config.min_score, "top candidate below threshold");
            return Err(no_content());
        }

        let included = self.collect_with_siblings(top, &candidates);
        let html = included.iter().map(|el| el.outer_html()).collect::<Vec<_>>().join("\n");

        Ok(ExtractedContent { html, top_score: top.score, element_count: included.len() })
    }

    fn identify_candidates<'a>(&self, doc: &'a Document) -> Vec<Candidate<'a>> {
        let limit = if self.config.max_elements == 0 { usize::MAX } else { self.config.max_elements };

        doc.select(CANDIDATE_SELECTOR)
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .filter(|el| {
                matches!(el.tag_name().as_str(), "div" | "article" | "section" | "main")
                    || el.text().trim().chars().count() >= self.config.min_candidate_chars
            })
            .map(|element| {
                let score = calculate_score(&element, &self.score_config).final_score;
                Candidate { element, score }
            })
            .collect()
    }

    /// Parents receive half of a candidate's score, grandparents a third.
    fn propagate_scores<'a>(&self, candidates: &mut Vec<Candidate<'a>>) {
        let mut index: HashMap<_, usize> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (c.element.element_ref().id(), i))
            .collect();

        let originals: Vec<(Element<'a>, f64)> = candidates.iter().map(|c| (c.element.clone(), c.score)).collect();

        for (element, score) in originals {
            let parent = element.parent();
            let grandparent = parent.as_ref().and_then(Element::parent);

            for (ancestor, divisor) in [(parent, 2.0), (grandparent, 3.0)] {
                let Some(ancestor) = ancestor else { continue };
                if matches!(ancestor.tag_name().as_str(), "html" | "body") {
                    continue;
                }

                let id = ancestor.element_ref().id();
                let slot = match index.get(&id) {
                    Some(&slot) => slot,
                    None => {
                        let own = calculate_score(&ancestor, &self.score_config).final_score;
                        candidates.push(Candidate { element: ancestor, score: own });
                        index.insert(id, candidates.len() - 1);
                        candidates.len() - 1
                    }
                };
                candidates[slot].score += score / divisor;
            }
        }
    }

    fn collect_with_siblings<'a>(&self, top: &Candidate<'a>, candidates: &[Candidate<'a>]) -> Vec<Element<'a>> {
        let Some(parent) = top.element.parent() else {
            return vec![top.element.clone()];
        };

        let scores: HashMap<_, f64> = candidates
            .iter()
            .map(|c| (c.element.element_ref().id(), c.score))
            .collect();
        let top_id = top.element.element_ref().id();
        let threshold = (top.score * self.config.sibling_threshold).max(10.0);

        parent
            .element_ref()
            .children()
            .filter_map(ElementRef::wrap)
            .map(Element::new)
            .filter(|sibling| {
                let id = sibling.element_ref().id();
                if id == top_id {
                    return true;
                }
                if sibling.tag_name() == "p" {
                    let len = sibling.text().trim().chars().count();
                    return len > 80 && link_density(sibling) < 0.25;
                }
                scores.get(&id).is_some_and(|&score| score >= threshold)
            })
            .collect()
    }
}

impl StructuredExtractor for ReadabilityExtractor {
    fn extract(&self, markup: &str, base_url: Option<&Url>) -> Result<String> {
        let content = self.extract_html(markup, base_url)?;
        tracing::debug!(score = content.top_score, elements = content.element_count, "readability pass selected content");
        Ok(html_to_text(&content.html))
    }
}

fn compare_candidates(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    a.score
        .partial_cmp(&b.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| candidate_priority(&a.element.tag_name()).cmp(&candidate_priority(&b.element.tag_name())))
        .then_with(|| a.element.text().chars().count().cmp(&b.element.text().chars().count()))
}

fn candidate_priority(tag_name: &str) -> u8 {
    match tag_name {
        "article" | "main" | "section" => 3,
        "div" => 2,
        _ => 1,
    }
}
