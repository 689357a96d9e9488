//! The extraction pipeline: one payload in, one finalized [`PageDoc`] out.
//!
//! JSON payloads from known APIs go straight to their adapter. Everything
//! else takes the HTML branch: metadata hunting, structural extraction
//! (possibly escalating to generic thread detection) and the readability
//! fallback for thin pages.
//!
//! # Example
//!
//! ```rust
//! use pagedoc_core::{ExtractOptions, ExtractionPipeline, IngestionPayload, SourceKind, Trace};
//!
//! let html = "<html><body><h1>Hello</h1><p>One</p><p>Two</p></body></html>";
//! let payload = IngestionPayload::new(SourceKind::Stdin, "-", html);
//! let mut trace = Trace::new();
//!
//! let doc = ExtractionPipeline::new().process(&payload, None, &ExtractOptions::default(), &mut trace).unwrap();
//! assert_eq!(doc.title, "Hello");
//! assert_eq!(doc.content.len(), 3);
//! ```

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use url::Url;

use crate::api::{ApiDocument, ApiSource};
use crate::error::Result;
use crate::extract::{StructuralExtractor, THIN_CONTENT_THRESHOLD};
use crate::finalize::{Draft, Limits, finalize};
use crate::metadata::MetaSource;
use crate::model::{ContentBlock, IngestionPayload, Meta, PageDoc, SourceKind};
use crate::packs::PatternPack;
use crate::parse::Document;
use crate::readability::{ArticleExtractor, default_extractor, extract_readable};
use crate::trace::Trace;

/// Confidence for HTML no pack governed.
pub const UNGOVERNED_CONFIDENCE: f64 = 0.7;
/// Confidence for thin HTML no pack governed.
pub const THIN_UNGOVERNED_CONFIDENCE: f64 = 0.4;
/// Below this many blocks ungoverned HTML is flagged unreliable.
pub const RELIABLE_BLOCK_COUNT: usize = 5;
pub const UNRELIABLE_WARNING: &str = "Structure unreliable: Low content signal and no pattern match.";

const JSON_MIME: &str = "application/json";
const UNTITLED: &str = "Untitled";

/// Knobs for a single pipeline pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Skip structural extraction and use readability output directly.
    pub force_readability: bool,
    /// Allow the generic thread detector on thin, pack-less pages.
    pub generic_threads: bool,
    pub limits: Limits,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self { force_readability: false, generic_threads: true, limits: Limits::default() }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn force_readability(mut self, enabled: bool) -> Self {
        self.force_readability = enabled;
        self
    }

    pub fn generic_threads(mut self, enabled: bool) -> Self {
        self.generic_threads = enabled;
        self
    }

    pub fn max_depth(mut self, depth: Option<u32>) -> Self {
        self.limits.max_depth = depth;
        self
    }

    pub fn max_length(mut self, length: Option<usize>) -> Self {
        self.limits.max_length = length;
        self
    }
}

/// Stateless extraction pipeline.
#[derive(Clone)]
pub struct ExtractionPipeline {
    readability: Arc<dyn ArticleExtractor>,
}

impl std::fmt::Debug for ExtractionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionPipeline").finish_non_exhaustive()
    }
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractionPipeline {
    /// Pipeline with the best article extractor compiled in.
    pub fn new() -> Self {
        Self { readability: default_extractor() }
    }

    /// Pipeline with a custom readability backend.
    pub fn with_article_extractor(extractor: Arc<dyn ArticleExtractor>) -> Self {
        Self { readability: extractor }
    }

    /// Extracts `payload`, appending decisions to `trace`.
    ///
    /// Steps accumulate across passes, but `trace.signals` is cleared first:
    /// the returned doc's metadata only describes this pass.
    ///
    /// # Errors
    ///
    /// Only a known API payload missing required fields is fatal. Malformed
    /// JSON falls through to the HTML branch.
    pub fn process(
        &self,
        payload: &IngestionPayload,
        pack: Option<&PatternPack>,
        options: &ExtractOptions,
        trace: &mut Trace,
    ) -> Result<PageDoc> {
        let started = Instant::now();
        let body = payload.body();
        trace.signals.clear();

        if is_json_payload(payload, &body) {
            match serde_json::from_str::<Value>(&body) {
                Ok(json) => {
                    if let Some(api) = ApiSource::detect(&payload.identifier) {
                        trace.step("Extraction", api.label(), format!("Extracted structured data from {}", api.endpoint()));
                        let doc = api.extract(json, Some(&payload.identifier))?;
                        return Ok(finish_api(doc, options, trace, started));
                    }
                    tracing::debug!(identifier = %payload.identifier, "JSON payload from unknown source, treating as HTML");
                }
                Err(e) => trace.step("Parsing", "JSON Failure", format!("Attempted JSON parsing but failed: {}", e)),
            }
        }

        Ok(self.process_html(payload, &body, pack, options, trace, started))
    }

    fn process_html(
        &self,
        payload: &IngestionPayload,
        body: &str,
        pack: Option<&PatternPack>,
        options: &ExtractOptions,
        trace: &mut Trace,
        started: Instant,
    ) -> PageDoc {
        let doc = Document::parse(body);

        if let Some(pack) = pack {
            trace.step("Pattern Match", pack.domain.clone(), "Using domain-specific pattern pack");
        }
        trace.step("Parsing", "Success", format!("Parsed {} characters of HTML", body.chars().count()));

        let meta = doc.hunt_metadata();
        if let Some(headline) = &meta.headline {
            trace.step("Metadata Extraction", headline.clone(), "Extracted via metadata hunter (JSON-LD/OG/Twitter)");
        }

        let mut title = meta.headline.clone().unwrap_or_else(|| fallback_title(&doc));
        let url = (payload.source == SourceKind::Url).then(|| payload.identifier.clone());

        let content = if options.force_readability {
            trace.step("Extraction", "Readability", "Forced Readability mode via options");
            let readable = extract_readable(self.readability.as_ref(), body, url.as_deref(), trace);
            if let Some(readable_title) = readable.title {
                title = readable_title;
            }
            readable.content
        } else {
            let mut content =
                StructuralExtractor::new(pack).with_generic_threads(options.generic_threads).extract(&doc, trace);

            if content.len() < THIN_CONTENT_THRESHOLD {
                trace.step("Heuristic Fallback", "Readability", "Low content signal; attempting Readability extraction");
                let readable = extract_readable(self.readability.as_ref(), body, url.as_deref(), trace);
                let has_thread = content.iter().any(ContentBlock::is_thread_item);

                if readable.content.len() > content.len() && !has_thread {
                    if let Some(readable_title) = readable.title {
                        title = readable_title;
                    }
                    content = readable.content;
                    trace.step("Readability Result", "Success", format!("Extracted {} blocks via Readability", content.len()));
                }
            }
            content
        };

        let mut confidence = 1.0;
        let mut warnings = Vec::new();
        let known_thread_site =
            payload.identifier.contains("reddit.com") || payload.identifier.contains("news.ycombinator.com");
        if pack.is_none() && !known_thread_site {
            confidence = UNGOVERNED_CONFIDENCE;
            if content.len() < RELIABLE_BLOCK_COUNT {
                confidence = THIN_UNGOVERNED_CONFIDENCE;
                warnings.push(UNRELIABLE_WARNING.to_string());
            }
        }

        let site = meta.site.clone().or_else(|| url.as_deref().and_then(hostname));

        trace.duration_ms = started.elapsed().as_millis() as u64;
        let mut metadata = trace.signals.clone();
        metadata.insert("source".to_string(), payload.source.as_str().into());
        if let Some(mime) = &payload.mime_type {
            metadata.insert("mimeType".to_string(), mime.clone().into());
        }
        metadata.insert("durationMs".to_string(), trace.duration_ms.into());

        let draft = Draft {
            title,
            url,
            meta: Meta {
                author: meta.author,
                site,
                published: meta.date,
                pack: pack.map(|p| p.domain.clone()),
                json_ld: meta.source == MetaSource::JsonLd,
                confidence,
                warnings,
            },
            content,
            metadata,
        };

        finalize(draft, options.limits)
    }
}

fn finish_api(doc: ApiDocument, options: &ExtractOptions, trace: &mut Trace, started: Instant) -> PageDoc {
    trace.duration_ms = started.elapsed().as_millis() as u64;

    let mut metadata = trace.signals.clone();
    metadata.insert("source".to_string(), "json-api".into());
    metadata.insert("mimeType".to_string(), JSON_MIME.into());
    metadata.insert("durationMs".to_string(), trace.duration_ms.into());

    let pack = doc.pack_label();
    let draft = Draft {
        title: doc.title,
        url: doc.url,
        meta: Meta {
            author: doc.author,
            site: Some(doc.site),
            published: doc.published,
            pack: Some(pack),
            json_ld: false,
            confidence: 1.0,
            warnings: Vec::new(),
        },
        content: doc.content,
        metadata,
    };

    finalize(draft, options.limits)
}

/// JSON by declared mime type or by the body's first character.
fn is_json_payload(payload: &IngestionPayload, body: &str) -> bool {
    let trimmed = body.trim_start();
    payload.mime_type.as_deref().is_some_and(|mime| mime.contains(JSON_MIME))
        || trimmed.starts_with('{')
        || trimmed.starts_with('[')
}

/// `og:title`, then the first `h1`, then `<title>`.
fn fallback_title(doc: &Document) -> String {
    doc.select_first("meta[property=\"og:title\"]")
        .and_then(|el| el.attr("content"))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| doc.select_first("h1").map(|el| el.trimmed_text()).filter(|t| !t.is_empty()))
        .or_else(|| doc.title())
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn hostname(url: &str) -> Option<String> {
    Url::parse(url).ok().and_then(|u| u.host_str().map(str::to_string))
}
