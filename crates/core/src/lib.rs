pub mod api;
pub mod browser;
pub mod coordinator;
pub mod error;
pub mod extract;
pub mod finalize;
pub mod generic;
pub mod ingest;
pub mod metadata;
pub mod model;
pub mod packs;
pub mod parse;
pub mod pipeline;
pub mod readability;
pub mod rebuild;
pub mod selector;
pub mod trace;

pub use api::{ApiDocument, ApiSource};
#[cfg(feature = "browser")]
pub use browser::ChromiumRenderer;
pub use browser::{BrowserRenderer, NoopRenderer, render_target};
pub use coordinator::{Coordinator, CoordinatorOptions, CoordinatorResult, Mode};
pub use error::{PageDocError, Result};
pub use extract::{StructuralExtractor, THIN_CONTENT_THRESHOLD};
pub use finalize::{Draft, Limits, finalize, fnv1a, normalize_text, structural_signature};
pub use ingest::{DefaultIngestor, FetchConfig, Ingest, classify_input, sniff_mime};
pub use metadata::{HuntedMetadata, MetaSource};
pub use model::{ContentBlock, DocKind, IngestionPayload, LinkRef, Meta, PageDoc, SourceKind, ThreadItem};
pub use packs::{
    DomainState, JsonStateStore, MemoryStateStore, PackParser, PackRegistry, PackRegistryBuilder, PatternPack,
    Provider, StateStore, state_domain,
};
pub use parse::{Document, Element};
#[cfg(feature = "readability")]
pub use readability::SmoothieExtractor;
pub use readability::{ArticleExtractor, NullExtractor, ReadableArticle};
pub use pipeline::{ExtractOptions, ExtractionPipeline};
pub use rebuild::rebuild;
pub use selector::SelectorList;
pub use trace::{Trace, TraceStep};
