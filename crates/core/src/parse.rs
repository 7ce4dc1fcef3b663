//! HTML parsing and DOM access.
//!
//! This module provides the [`Document`] and [`Element`] types used by every
//! stage of the pipeline to query markup with CSS selectors.
//!
//! # Example
//!
//! ```rust
//! use pagewalk_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <head><title>Chapter 3</title></head>
//!         <body><p class="content">Paragraph</p></body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html).unwrap();
//! assert_eq!(doc.title(), Some("Chapter 3".to_string()));
//! assert_eq!(doc.select("p.content").unwrap().len(), 1);
//! ```

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::preprocess::{PreprocessConfig, preprocess_html};
use crate::{PagewalkError, Result};

/// A parsed HTML document.
///
/// Wraps a `scraper::Html` tree together with the URL the markup was served
/// from, which is needed to resolve relative links.
pub struct Document {
    html: Html,
    base_url: Option<Url>,
}

impl Document {
    /// Parses HTML from a string without preprocessing.
    pub fn parse(html: &str) -> Result<Self> {
        Ok(Self { html: Html::parse_document(html), base_url: None })
    }

    /// Parses HTML and records the URL it came from.
    pub fn parse_with_url(html: &str, base_url: Option<Url>) -> Result<Self> {
        Ok(Self { html: Html::parse_document(html), base_url })
    }

    /// Parses HTML after running it through [`preprocess_html`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use pagewalk_core::parse::Document;
    /// use pagewalk_core::preprocess::PreprocessConfig;
    ///
    /// let html = "<html><body><script>x()</script><article>Content</article></body></html>";
    /// let doc = Document::parse_with_preprocessing(html, None, &PreprocessConfig::default()).unwrap();
    /// assert!(!doc.as_string().contains("x()"));
    /// ```
    pub fn parse_with_preprocessing(html: &str, base_url: Option<Url>, config: &PreprocessConfig) -> Result<Self> {
        let config = PreprocessConfig { base_url: base_url.clone(), ..config.clone() };
        let cleaned = preprocess_html(html, &config);
        Ok(Self { html: Html::parse_document(&cleaned), base_url })
    }

    /// Gets the base URL used for link resolution.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Gets the underlying `scraper::Html` instance.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// Gets the entire HTML as a string.
    pub fn as_string(&self) -> String {
        self.html.html()
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`PagewalkError::HtmlParseError`] if the selector is invalid.
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = compile_selector(selector)?;
        Ok(self.html.select(&sel).map(Element::new).collect())
    }

    /// Gets the trimmed content of the `<title>` element, if present and non-empty.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Gets the text of the first `h1`, `h2` or `h3` in document order.
    pub fn first_heading(&self) -> Option<String> {
        let selector = Selector::parse("h1, h2, h3").ok()?;
        self.html
            .select(&selector)
            .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .find(|t| !t.is_empty())
    }

    /// Gets the `<body>` element, if the parser produced one.
    pub fn body(&'_ self) -> Option<Element<'_>> {
        let selector = Selector::parse("body").ok()?;
        self.html.select(&selector).next().map(Element::new)
    }

    /// Gets all text content from the document.
    pub fn text_content(&self) -> String {
        self.html.root_element().text().collect()
    }

    /// Resolves an href against the document's base URL.
    ///
    /// Without a base URL only absolute hrefs resolve.
    pub fn resolve(&self, href: &str) -> Option<Url> {
        match &self.base_url {
            Some(base) => base.join(href.trim()).ok(),
            None => Url::parse(href.trim()).ok(),
        }
    }
}

fn compile_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| PagewalkError::HtmlParseError(format!("Invalid selector: {}", e)))
}

/// A single element in a parsed [`Document`].
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    pub(crate) fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    /// Gets the wrapped `scraper` element.
    pub fn element_ref(&self) -> ElementRef<'a> {
        self.element
    }

    /// Gets the HTML content inside this element.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Gets the HTML content including this element's own tags.
    pub fn outer_html(&self) -> String {
        self.element.html()
    }

    /// Gets the concatenation of all text nodes within this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Gets the lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Gets the closest ancestor that is an element.
    pub fn parent(&self) -> Option<Element<'a>> {
        self.element.parent().and_then(ElementRef::wrap).map(Element::new)
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`PagewalkError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = compile_selector(selector)?;
        Ok(self.element.select(&sel).map(Element::new).collect())
    }
}
