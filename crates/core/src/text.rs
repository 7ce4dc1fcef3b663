//! HTML to plain text conversion and whitespace normalization.
//!
//! Block-level elements and `<br>` become line breaks, so paragraph
//! structure survives extraction. [`normalize_text`] then guarantees the
//! output shape every extraction result carries: entities decoded, runs of
//! whitespace collapsed, no blank lines, no leading or trailing whitespace.

use scraper::{ElementRef, Html, Node};

/// Converts an HTML fragment or document to normalized plain text.
///
/// # Example
///
/// ```rust
/// use pagewalk_core::text::html_to_text;
///
/// let text = html_to_text("<div><h2>Chapter 1</h2><p>It  began\n in   rain.</p><p>Then&nbsp;sun.</p></div>");
/// assert_eq!(text, "Chapter 1\nIt began in rain.\nThen sun.");
/// ```
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut output = String::new();
    walk(document.root_element(), &mut output);
    normalize_text(&output)
}

/// Decodes entities, collapses whitespace within lines and drops blank lines.
///
/// ```rust
/// use pagewalk_core::text::normalize_text;
///
/// assert_eq!(normalize_text("  one \t two\n\n\n &amp; three  "), "one two\n& three");
/// ```
pub fn normalize_text(text: &str) -> String {
    let decoded = html_escape::decode_html_entities(text);

    decoded
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Number of characters (not bytes) in `text`.
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

const BLOCK_ELEMENTS: [&str; 22] = [
    "p",
    "div",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "li",
    "ul",
    "ol",
    "blockquote",
    "pre",
    "td",
    "th",
    "tr",
    "table",
    "article",
    "section",
    "main",
    "dd",
    "dt",
];

const SKIPPED_ELEMENTS: [&str; 5] = ["script", "style", "noscript", "template", "head"];

/// Appends the text under `element`, breaking lines around block elements.
fn walk(element: ElementRef<'_>, output: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => output.push_str(text),
            Node::Element(el) => {
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    continue;
                }
                if name == "br" {
                    output.push('\n');
                    continue;
                }

                let Some(child_ref) = ElementRef::wrap(child) else { continue };
                let block = BLOCK_ELEMENTS.contains(&name);
                if block {
                    output.push('\n');
                }
                walk(child_ref, output);
                if block {
                    output.push('\n');
                }
            }
            _ => {}
        }
    }
}
