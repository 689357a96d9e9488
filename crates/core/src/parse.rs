//! HTML parsing and DOM navigation.
//!
//! This module provides the [`Document`] and [`Element`] types used by every
//! extraction stage. They wrap `scraper` and expose the handful of operations the
//! extractors need: CSS queries, attribute and class access, child and ancestor
//! iteration, and text collection.
//!
//! # Example
//!
//! ```rust
//! use pagedoc_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <h1>Title</h1>
//!             <p class="content">Paragraph</p>
//!         </body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html);
//! let paragraphs = doc.select("p.content").unwrap();
//! assert_eq!(paragraphs[0].text(), "Paragraph");
//! ```

use scraper::{ElementRef, Html, Selector};

use crate::{PageDocError, Result};

/// Represents a parsed HTML document.
///
/// # Example
///
/// ```rust
/// use pagedoc_core::parse::Document;
///
/// let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
/// let doc = Document::parse(html);
/// assert_eq!(doc.title(), Some("Test".to_string()));
/// ```
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses a full HTML document. Parsing is lenient and never fails.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Parses an HTML fragment such as a comment body or a readability result.
    pub fn parse_fragment(html: &str) -> Self {
        Self { html: Html::parse_fragment(html) }
    }

    /// Gets the raw HTML representation.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// The document's root element (`<html>` for documents).
    pub fn root(&self) -> Element<'_> {
        Element { element: self.html.root_element() }
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`PageDocError::HtmlParseError`] if the selector is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pagedoc_core::parse::Document;
    ///
    /// let html = r#"<p class="content">First</p><p class="content">Second</p>"#;
    /// let doc = Document::parse(html);
    /// let elements = doc.select("p.content").unwrap();
    /// assert_eq!(elements.len(), 2);
    /// ```
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// First element matching `selector`, or `None` when nothing matches or
    /// the selector is invalid.
    pub fn select_first(&'_ self, selector: &str) -> Option<Element<'_>> {
        let sel = parse_selector(selector).ok()?;
        self.html.select(&sel).next().map(|el| Element { element: el })
    }

    /// Gets the title of the document.
    ///
    /// Returns the trimmed content of the `<title>` element if present and non-empty.
    pub fn title(&self) -> Option<String> {
        self.select_first("title").map(|el| el.trimmed_text()).filter(|t| !t.is_empty())
    }

    /// Gets all text content from the document.
    pub fn text_content(&self) -> String {
        self.html.root_element().text().collect()
    }
}

/// A wrapper around scraper's ElementRef.
///
/// # Example
///
/// ```rust
/// use pagedoc_core::parse::Document;
///
/// let html = r#"<a href="https://example.com">Link text</a>"#;
/// let doc = Document::parse(html);
/// let link = &doc.select("a").unwrap()[0];
///
/// assert_eq!(link.text(), "Link text");
/// assert_eq!(link.attr("href"), Some("https://example.com"));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the inner HTML of this element.
    pub fn inner_html(&self) -> String {
        self.element.inner_html()
    }

    /// Gets the text content of this element, including all descendants.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Text content with surrounding whitespace removed.
    pub fn trimmed_text(&self) -> String {
        self.text().trim().to_string()
    }

    /// Text of this element's direct text-node children only.
    pub fn own_text(&self) -> String {
        self.element
            .children()
            .filter_map(|node| node.value().as_text().map(|t| t.text.to_string()))
            .collect()
    }

    /// Descendant text, skipping any element subtree for which `skip` returns true.
    pub fn text_without<F>(&self, skip: &F) -> String
    where
        F: Fn(&Element<'a>) -> bool,
    {
        let mut out = String::new();
        for node in self.element.children() {
            if let Some(text) = node.value().as_text() {
                out.push_str(&text.text);
            } else if let Some(element) = ElementRef::wrap(node) {
                let child = Element { element };
                if !skip(&child) {
                    out.push_str(&child.text_without(skip));
                }
            }
        }
        out
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Gets the lowercase tag name of this element.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Whether the class attribute contains `class` as a whitespace-separated token.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class").is_some_and(|value| value.split_whitespace().any(|c| c == class))
    }

    /// Direct element children in document order.
    pub fn children(&self) -> impl Iterator<Item = Element<'a>> + 'a {
        self.element.child_elements().map(|element| Element { element })
    }

    /// Ancestor elements, nearest first.
    pub fn ancestors(&self) -> impl Iterator<Item = Element<'a>> + 'a {
        self.element.ancestors().filter_map(ElementRef::wrap).map(|element| Element { element })
    }

    /// Selects descendant elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`PageDocError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = parse_selector(selector)?;
        Ok(self.element.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// First descendant matching `selector`, or `None` when nothing matches or
    /// the selector is invalid.
    pub fn select_first(&self, selector: &str) -> Option<Element<'a>> {
        let sel = parse_selector(selector).ok()?;
        self.element.select(&sel).next().map(|el| Element { element: el })
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| PageDocError::HtmlParseError(format!("Invalid selector: {}", e)))
}

/// Reduces an HTML fragment to its trimmed text content.
///
/// Used for API payloads that embed markup in string fields.
pub fn html_to_text(html: &str) -> String {
    Document::parse_fragment(html).root().trimmed_text()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_HTML: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title>Test Page</title>
        </head>
        <body>
            <h1>Heading</h1>
            <div class="comment odd" depth="1">Own <span>nested</span> text<p class="content">Paragraph 1</p></div>
            <p class="content">Paragraph 2</p>
            <a href="https://example.com">Link</a>
        </body>
        </html>
    "#;

    #[test]
    fn test_parse_document() {
        let doc = Document::parse(SAMPLE_HTML);
        assert_eq!(doc.title(), Some("Test Page".to_string()));
    }

    #[test]
    fn test_select_elements() {
        let doc = Document::parse(SAMPLE_HTML);
        let elements = doc.select("p.content").unwrap();

        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].text(), "Paragraph 1");
        assert_eq!(elements[1].text(), "Paragraph 2");
    }

    #[test]
    fn test_element_attributes() {
        let doc = Document::parse(SAMPLE_HTML);
        let link = doc.select_first("a").unwrap();

        assert_eq!(link.attr("href"), Some("https://example.com"));
        assert_eq!(link.text(), "Link");
        assert_eq!(link.tag_name(), "a");
    }

    #[test]
    fn test_invalid_selector() {
        let doc = Document::parse(SAMPLE_HTML);
        let result = doc.select("[[invalid");

        assert!(matches!(result, Err(PageDocError::HtmlParseError(_))));
        assert!(doc.select_first("[[invalid").is_none());
    }

    #[test]
    fn test_classes_and_own_text() {
        let doc = Document::parse(SAMPLE_HTML);
        let comment = doc.select_first("div").unwrap();

        assert!(comment.has_class("comment"));
        assert!(comment.has_class("odd"));
        assert!(!comment.has_class("even"));
        assert_eq!(comment.own_text(), "Own  text");
        assert_eq!(comment.children().count(), 2);
    }

    #[test]
    fn test_text_without_skips_subtrees() {
        let doc = Document::parse(SAMPLE_HTML);
        let comment = doc.select_first("div").unwrap();
        let text = comment.text_without(&|el: &Element<'_>| el.tag_name() == "p");

        assert_eq!(text, "Own nested text");
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let doc = Document::parse(SAMPLE_HTML);
        let paragraph = doc.select_first("div p").unwrap();
        let tags: Vec<String> = paragraph.ancestors().map(|el| el.tag_name()).collect();

        assert_eq!(tags, vec!["div", "body", "html"]);
    }

    #[test]
    fn test_html_to_text() {
        assert_eq!(html_to_text("<p>How do I <code>test</code>?</p>"), "How do I test?");
        assert_eq!(html_to_text("plain"), "plain");
    }
}
