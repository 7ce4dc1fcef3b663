//! Next/previous page resolution.
//!
//! Three signals are consulted in order, each only when the previous one
//! yields nothing:
//!
//! 1. `rel="next"` / `rel="prev"` on `<link>` and `<a>` elements;
//! 2. anchor text containing a direction keyword ("next", "下一章", "»", ...);
//! 3. arithmetic on the last number in the URL path.
//!
//! # Example
//!
//! ```rust
//! use pagewalk_core::navigation::{Direction, NavigationConfig, NavigationTier, resolve};
//!
//! let html = r#"<html><body><a href="/novel/13.html">Next Chapter »</a></body></html>"#;
//! let (url, tier) = resolve("https://example.com/novel/12.html", Some(html), Direction::Next, &NavigationConfig::default()).unwrap();
//!
//! assert_eq!(url, "https://example.com/novel/13.html");
//! assert_eq!(tier, NavigationTier::AnchorText);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::chapter::{pad_number, padded_width};
use crate::parse::Document;

/// Which way to move through a paginated document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Next,
    #[serde(alias = "prev")]
    Previous,
}

impl Direction {
    /// `+1` for next, `-1` for previous.
    pub fn delta(self) -> i64 {
        match self {
            Direction::Next => 1,
            Direction::Previous => -1,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Next => Direction::Previous,
            Direction::Previous => Direction::Next,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Next => write!(f, "next"),
            Direction::Previous => write!(f, "previous"),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "next" => Ok(Direction::Next),
            "previous" | "prev" => Ok(Direction::Previous),
            other => Err(format!("unknown direction '{}' (expected next or previous)", other)),
        }
    }
}

/// The signal that produced a navigation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavigationTier {
    Memory,
    LinkRelation,
    AnchorText,
    UrlArithmetic,
}

impl fmt::Display for NavigationTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NavigationTier::Memory => "memory",
            NavigationTier::LinkRelation => "link_relation",
            NavigationTier::AnchorText => "anchor_text",
            NavigationTier::UrlArithmetic => "url_arithmetic",
        };
        f.write_str(name)
    }
}

/// Keyword lists and probing behaviour for navigation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Lowercase keywords marking a "next" anchor.
    pub next_keywords: Vec<String>,
    /// Lowercase keywords marking a "previous" anchor.
    pub previous_keywords: Vec<String>,
    /// Fetch a link target to read its chapter number when its URL has none (default: true).
    pub probe_target: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        let words = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            next_keywords: words(&[
                "next",
                "next chapter",
                "next page",
                "下一章",
                "下一页",
                "下一頁",
                "下页",
                "下一節",
                "続き",
                "次へ",
                "suivant",
                "›",
                "»",
                "→",
                ">>",
            ]),
            previous_keywords: words(&[
                "prev",
                "previous",
                "previous chapter",
                "上一章",
                "上一页",
                "上一頁",
                "上页",
                "上一節",
                "前へ",
                "précédent",
                "‹",
                "«",
                "←",
                "<<",
            ]),
            probe_target: true,
        }
    }
}

impl NavigationConfig {
    pub fn keywords(&self, direction: Direction) -> &[String] {
        match direction {
            Direction::Next => &self.next_keywords,
            Direction::Previous => &self.previous_keywords,
        }
    }
}

/// A resolved link and the tier that found it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationLink {
    pub url: String,
    pub tier: NavigationTier,
}

/// Both navigation links of a page, from markup signals only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NavigationLinks {
    pub next: Option<NavigationLink>,
    pub previous: Option<NavigationLink>,
}

impl NavigationLinks {
    /// Finds both links using link relations, then anchor text.
    pub fn from_markup(markup: &str, final_url: &str, config: &NavigationConfig) -> Self {
        let Ok(doc) = Document::parse_with_url(markup, Url::parse(final_url).ok()) else {
            return Self::default();
        };
        Self {
            next: find_in_document(&doc, Direction::Next, config),
            previous: find_in_document(&doc, Direction::Previous, config),
        }
    }

    pub fn get(&self, direction: Direction) -> Option<&NavigationLink> {
        match direction {
            Direction::Next => self.next.as_ref(),
            Direction::Previous => self.previous.as_ref(),
        }
    }
}

fn find_in_document(doc: &Document, direction: Direction, config: &NavigationConfig) -> Option<NavigationLink> {
    if let Some(url) = link_relation(doc, direction) {
        return Some(NavigationLink { url, tier: NavigationTier::LinkRelation });
    }
    anchor_text(doc, config.keywords(direction)).map(|url| NavigationLink { url, tier: NavigationTier::AnchorText })
}

/// Resolves an href to a navigable URL, skipping fragments, scripts and self-links.
fn usable_target(doc: &Document, href: Option<&str>) -> Option<String> {
    let href = href?.trim();
    if href.is_empty() || href.starts_with('#') || href.to_lowercase().starts_with("javascript:") {
        return None;
    }

    let mut target = doc.resolve(href)?;
    target.set_fragment(None);
    if let Some(current) = doc.base_url() {
        let mut current = current.clone();
        current.set_fragment(None);
        if current == target {
            return None;
        }
    }
    Some(target.to_string())
}

/// Tier 1: the first `<link>`, then `<a>`, whose `rel` names the direction.
pub fn link_relation(doc: &Document, direction: Direction) -> Option<String> {
    let wanted = |rel: &str| {
        rel.split_whitespace().any(|token| {
            let token = token.to_lowercase();
            match direction {
                Direction::Next => token == "next",
                Direction::Previous => token == "prev" || token == "previous",
            }
        })
    };

    ["link[rel]", "a[rel]"].into_iter().find_map(|selector| {
        doc.select(selector)
            .unwrap_or_default()
            .iter()
            .filter(|el| el.attr("rel").is_some_and(|rel| wanted(rel)))
            .find_map(|el| usable_target(doc, el.attr("href")))
    })
}

/// Tier 2: the first anchor whose lowercased text contains one of `keywords`.
pub fn anchor_text(doc: &Document, keywords: &[String]) -> Option<String> {
    doc.select("a[href]").unwrap_or_default().iter().find_map(|anchor| {
        let text = anchor.text().trim().to_lowercase();
        if text.is_empty() || !keywords.iter().any(|k| !k.is_empty() && text.contains(k.as_str())) {
            return None;
        }
        usable_target(doc, anchor.attr("href"))
    })
}

/// Tier 3: steps the last digit run of the URL path by one.
///
/// Zero-padded numbers keep their width. Returns `None` when the path has
/// no digits or the step would go below zero.
///
/// ```rust
/// use pagewalk_core::navigation::{Direction, step_url};
///
/// assert_eq!(step_url("https://example.com/book/007.html", Direction::Next).as_deref(), Some("https://example.com/book/008.html"));
/// assert_eq!(step_url("https://example.com/book/0.html", Direction::Previous), None);
/// ```
pub fn step_url(url: &str, direction: Direction) -> Option<String> {
    let mut parsed = Url::parse(url.trim()).ok()?;
    let path = parsed.path().to_string();

    let end = path.rfind(|c: char| c.is_ascii_digit())? + 1;
    let start = path[..end].rfind(|c: char| !c.is_ascii_digit()).map_or(0, |i| i + 1);
    let digits = &path[start..end];

    let value = digits.parse::<u64>().ok()?;
    let stepped = match direction {
        Direction::Next => value.checked_add(1)?,
        Direction::Previous => value.checked_sub(1)?,
    };

    let new_path = format!("{}{}{}", &path[..start], pad_number(stepped, padded_width(digits)), &path[end..]);
    parsed.set_path(&new_path);
    Some(parsed.to_string())
}

/// Resolves the target for `direction` from the current page.
///
/// Without markup only URL arithmetic is possible.
pub fn resolve(
    current_url: &str, markup: Option<&str>, direction: Direction, config: &NavigationConfig,
) -> Option<(String, NavigationTier)> {
    if let Some(markup) = markup
        && let Ok(doc) = Document::parse_with_url(markup, Url::parse(current_url).ok())
        && let Some(link) = find_in_document(&doc, direction, config)
    {
        tracing::debug!(url = current_url, target = %link.url, tier = %link.tier, "navigation link found in markup");
        return Some((link.url, link.tier));
    }

    let stepped = step_url(current_url, direction)?;
    tracing::debug!(url = current_url, target = %stepped, "navigation by URL arithmetic");
    Some((stepped, NavigationTier::UrlArithmetic))
}
