//! Readability fallback for article-shaped pages.
//!
//! The article extractor is a seam: [`SmoothieExtractor`] wraps `dom_smoothie`
//! when the `readability` feature is enabled, and [`NullExtractor`] stands in
//! otherwise. Either way the cleaned HTML is converted to blocks by the same
//! traversal structural extraction uses.

use std::sync::Arc;

use crate::extract::StructuralExtractor;
use crate::model::ContentBlock;
use crate::parse::Document;
use crate::trace::Trace;

/// Main-content HTML isolated by an article extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadableArticle {
    pub title: Option<String>,
    pub html: String,
}

/// Isolates the main article of a page.
pub trait ArticleExtractor: Send + Sync {
    /// Returns `None` when no article could be isolated.
    fn extract_article(&self, html: &str, url: Option<&str>) -> Option<ReadableArticle>;
}

/// `dom_smoothie` readability port.
#[cfg(feature = "readability")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SmoothieExtractor;

#[cfg(feature = "readability")]
impl ArticleExtractor for SmoothieExtractor {
    fn extract_article(&self, html: &str, url: Option<&str>) -> Option<ReadableArticle> {
        let mut reader = match dom_smoothie::Readability::new(html, url, None) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::debug!("readability setup failed: {}", e);
                return None;
            }
        };

        match reader.parse() {
            Ok(article) => {
                let title = Some(article.title.trim().to_string()).filter(|t| !t.is_empty());
                Some(ReadableArticle { title, html: article.content.to_string() })
            }
            Err(e) => {
                tracing::debug!("readability found no article: {}", e);
                None
            }
        }
    }
}

/// Extractor that never finds an article.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullExtractor;

impl ArticleExtractor for NullExtractor {
    fn extract_article(&self, _html: &str, _url: Option<&str>) -> Option<ReadableArticle> {
        None
    }
}

/// The best extractor compiled into this build.
pub fn default_extractor() -> Arc<dyn ArticleExtractor> {
    #[cfg(feature = "readability")]
    {
        Arc::new(SmoothieExtractor)
    }
    #[cfg(not(feature = "readability"))]
    {
        Arc::new(NullExtractor)
    }
}

/// Result of a readability pass: title plus blocks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadabilityResult {
    pub title: Option<String>,
    pub content: Vec<ContentBlock>,
}

/// Runs `extractor` over `html` and converts the article to blocks.
pub fn extract_readable(
    extractor: &dyn ArticleExtractor,
    html: &str,
    url: Option<&str>,
    trace: &mut Trace,
) -> ReadabilityResult {
    let Some(article) = extractor.extract_article(html, url) else {
        return ReadabilityResult::default();
    };

    let fragment = Document::parse_fragment(&article.html);
    let mut content = Vec::new();
    StructuralExtractor::new(None).walk(fragment.root(), &mut content, trace, None);

    ReadabilityResult { title: article.title, content }
}
