//! The PageDoc document model.
//!
//! A [`PageDoc`] is the unit of output: scalar identity fields, a [`Meta`]
//! record, an ordered tree of [`ContentBlock`]s, the deduplicated link table
//! and a structural signature. Block ids are empty until the finalizer assigns
//! them.
//!
//! # Example
//!
//! ```rust
//! use pagedoc_core::ContentBlock;
//!
//! let block = ContentBlock::text("Hello");
//! let json = serde_json::to_value(&block).unwrap();
//! assert_eq!(json["type"], "text");
//! assert_eq!(json["text"], "Hello");
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema version written by the finalizer.
pub const SCHEMA_VERSION: &str = "1.1";

/// A finalized, deterministic document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageDoc {
    pub version: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub meta: Meta,
    pub kind: DocKind,
    pub content: Vec<ContentBlock>,
    pub links: Vec<LinkRef>,
    /// Extraction signals plus ingestion provenance (`source`, `mimeType`).
    pub metadata: BTreeMap<String, Value>,
    pub structural_signature: String,
}

/// Descriptive metadata and extraction certainty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pack: Option<String>,
    pub json_ld: bool,
    pub confidence: f64,
    pub warnings: Vec<String>,
}

/// Document composition, inferred from the top-level blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocKind {
    Thread,
    Article,
    Mixed,
}

/// Entry in the deduplicated link table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRef {
    /// 1-based, in first-seen order.
    pub id: usize,
    pub text: String,
    pub url: String,
}

/// One node of the document tree.
///
/// Every variant carries an `id` assigned by the finalizer from the block's
/// type, structural path and text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ContentBlock {
    Heading {
        #[serde(default)]
        id: String,
        level: u8,
        text: String,
    },
    Text {
        #[serde(default)]
        id: String,
        text: String,
    },
    Code {
        #[serde(default)]
        id: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    Quote {
        #[serde(default)]
        id: String,
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<String>,
    },
    List {
        #[serde(default)]
        id: String,
        items: Vec<String>,
    },
    Link {
        #[serde(default)]
        id: String,
        text: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ref_id: Option<usize>,
    },
    Image {
        #[serde(default)]
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
        src: String,
    },
    ThreadItem(ThreadItem),
}

/// A comment, reply or answer in a discussion.
///
/// `content` holds the item's own body; `children` holds nested replies.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadItem {
    #[serde(default)]
    pub id: String,
    /// Relative to the thread root, 0 = top level.
    pub depth: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub children: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
}

impl ThreadItem {
    pub fn new(depth: u32, author: Option<String>, content: Vec<ContentBlock>) -> Self {
        Self { depth, author, content, collapsed: Some(false), ..Default::default() }
    }
}

impl ContentBlock {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        ContentBlock::Heading { id: String::new(), level, text: text.into() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { id: String::new(), text: text.into() }
    }

    pub fn code(text: impl Into<String>, language: Option<String>) -> Self {
        ContentBlock::Code { id: String::new(), text: text.into(), language }
    }

    pub fn quote(text: impl Into<String>) -> Self {
        ContentBlock::Quote { id: String::new(), text: text.into(), author: None }
    }

    pub fn list(items: Vec<String>) -> Self {
        ContentBlock::List { id: String::new(), items }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        ContentBlock::Link { id: String::new(), text: text.into(), url: url.into(), ref_id: None }
    }

    pub fn image(alt: Option<String>, src: impl Into<String>) -> Self {
        ContentBlock::Image { id: String::new(), alt, src: src.into() }
    }

    /// The wire name of this block's variant, e.g. `"thread-item"`.
    pub fn type_name(&self) -> &'static str {
        match self {
            ContentBlock::Heading { .. } => "heading",
            ContentBlock::Text { .. } => "text",
            ContentBlock::Code { .. } => "code",
            ContentBlock::Quote { .. } => "quote",
            ContentBlock::List { .. } => "list",
            ContentBlock::Link { .. } => "link",
            ContentBlock::Image { .. } => "image",
            ContentBlock::ThreadItem(_) => "thread-item",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ContentBlock::Heading { id, .. }
            | ContentBlock::Text { id, .. }
            | ContentBlock::Code { id, .. }
            | ContentBlock::Quote { id, .. }
            | ContentBlock::List { id, .. }
            | ContentBlock::Link { id, .. }
            | ContentBlock::Image { id, .. } => id,
            ContentBlock::ThreadItem(item) => &item.id,
        }
    }

    pub fn set_id(&mut self, value: String) {
        match self {
            ContentBlock::Heading { id, .. }
            | ContentBlock::Text { id, .. }
            | ContentBlock::Code { id, .. }
            | ContentBlock::Quote { id, .. }
            | ContentBlock::List { id, .. }
            | ContentBlock::Link { id, .. }
            | ContentBlock::Image { id, .. } => *id = value,
            ContentBlock::ThreadItem(item) => item.id = value,
        }
    }

    /// The block's `text` field, for the variants that carry one.
    pub fn text_value(&self) -> Option<&str> {
        match self {
            ContentBlock::Heading { text, .. }
            | ContentBlock::Text { text, .. }
            | ContentBlock::Code { text, .. }
            | ContentBlock::Quote { text, .. }
            | ContentBlock::Link { text, .. } => Some(text),
            ContentBlock::List { .. } | ContentBlock::Image { .. } | ContentBlock::ThreadItem(_) => None,
        }
    }

    pub fn text_value_mut(&mut self) -> Option<&mut String> {
        match self {
            ContentBlock::Heading { text, .. }
            | ContentBlock::Text { text, .. }
            | ContentBlock::Code { text, .. }
            | ContentBlock::Quote { text, .. }
            | ContentBlock::Link { text, .. } => Some(text),
            ContentBlock::List { .. } | ContentBlock::Image { .. } | ContentBlock::ThreadItem(_) => None,
        }
    }

    pub fn as_thread_item(&self) -> Option<&ThreadItem> {
        match self {
            ContentBlock::ThreadItem(item) => Some(item),
            _ => None,
        }
    }

    pub fn is_thread_item(&self) -> bool {
        matches!(self, ContentBlock::ThreadItem(_))
    }
}

impl From<ThreadItem> for ContentBlock {
    fn from(item: ThreadItem) -> Self {
        ContentBlock::ThreadItem(item)
    }
}

/// Where an input came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Url,
    File,
    Stdin,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Url => "url",
            SourceKind::File => "file",
            SourceKind::Stdin => "stdin",
        }
    }
}

/// Raw bytes handed to the pipeline by the ingestion layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionPayload {
    pub source: SourceKind,
    pub identifier: String,
    pub raw_content: Vec<u8>,
    pub mime_type: Option<String>,
}

impl IngestionPayload {
    pub fn new(source: SourceKind, identifier: impl Into<String>, raw_content: impl Into<Vec<u8>>) -> Self {
        Self { source, identifier: identifier.into(), raw_content: raw_content.into(), mime_type: None }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    pub fn body(&self) -> String {
        String::from_utf8_lossy(&self.raw_content).into_owned()
    }
}
