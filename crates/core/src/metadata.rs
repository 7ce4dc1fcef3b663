use serde::Serialize;

use crate::Document;
use crate::text::normalize_text;

/// Page metadata reported alongside extracted text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl Document {
    /// Extract title from the `<title>` element, whitespace-normalized.
    pub fn extract_title(&self) -> Option<String> {
        self.title()
            .map(|title| normalize_text(&title).replace('\n', " "))
            .filter(|title| !title.is_empty())
    }

    /// Extract description with priority fallback:
    /// 1. Meta `description`
    /// 2. Open Graph `og:description`
    pub fn extract_description(&self) -> Option<String> {
        self.get_meta_content("description")
            .or_else(|| self.get_meta_content("og:description"))
    }

    /// Extract all metadata at once
    pub fn extract_metadata(&self) -> Metadata {
        Metadata { title: self.extract_title(), description: self.extract_description() }
    }

    /// Get meta tag content by name or property attribute
    fn get_meta_content(&self, attr: &str) -> Option<String> {
        ["name", "property"].into_iter().find_map(|kind| {
            let selector = format!("meta[{}=\"{}\"]", kind, attr);
            self.select(&selector)
                .ok()?
                .iter()
                .filter_map(|el| el.attr("content"))
                .map(str::trim)
                .find(|content| !content.is_empty())
                .map(str::to_string)
        })
    }
}
