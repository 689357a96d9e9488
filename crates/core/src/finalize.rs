//! Document finalizer: the only stage that assigns ids.
//!
//! Runs in a fixed order, since each step depends on the previous one:
//!
//! 1. resource limits (depth pruning, text truncation)
//! 2. text normalization, block ids and thread `parent_id`s
//! 3. link deduplication into the `links` table
//! 4. structural signature over the top-level skeleton
//! 5. kind inference
//!
//! Ids and the signature are pure functions of the block tree, so the same
//! input always produces byte-identical output.

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use crate::model::{ContentBlock, DocKind, LinkRef, Meta, PageDoc, SCHEMA_VERSION};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Pruning and truncation applied before ids are assigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Limits {
    /// Thread items deeper than this are dropped with their subtrees.
    pub max_depth: Option<u32>,
    /// Text longer than this many characters is cut and suffixed with `...`.
    pub max_length: Option<usize>,
}

/// Everything the finalizer needs besides the block tree.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub title: String,
    pub url: Option<String>,
    pub meta: Meta,
    pub content: Vec<ContentBlock>,
    pub metadata: BTreeMap<String, Value>,
}

/// Turns a draft into a finished [`PageDoc`].
pub fn finalize(draft: Draft, limits: Limits) -> PageDoc {
    let mut content = draft.content;

    apply_limits(&mut content, limits);
    assign_ids(&mut content, "0", None);
    let links = dedup_links(&mut content);
    let structural_signature = structural_signature(&content);
    let kind = infer_kind(&content);

    PageDoc {
        version: SCHEMA_VERSION.to_string(),
        title: normalize_text(&draft.title),
        url: draft.url,
        meta: draft.meta,
        kind,
        content,
        links,
        metadata: draft.metadata,
        structural_signature,
    }
}

/// NFC plus whitespace collapse and trim.
pub fn normalize_text(text: &str) -> String {
    let composed: String = text.nfc().collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 64-bit FNV-1a.
pub fn fnv1a(input: &str) -> u64 {
    input.bytes().fold(FNV_OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME))
}

fn apply_limits(blocks: &mut Vec<ContentBlock>, limits: Limits) {
    if let Some(max_depth) = limits.max_depth {
        blocks.retain(|block| block.as_thread_item().is_none_or(|item| item.depth <= max_depth));
    }

    for block in blocks.iter_mut() {
        if let Some(max_length) = limits.max_length
            && let Some(text) = block.text_value_mut()
        {
            truncate(text, max_length);
        }

        if let ContentBlock::ThreadItem(item) = block {
            apply_limits(&mut item.content, limits);
            apply_limits(&mut item.children, limits);
        }
    }
}

fn truncate(text: &mut String, max_length: usize) {
    if let Some((cut, _)) = text.char_indices().nth(max_length) {
        text.truncate(cut);
        text.push_str("...");
    }
}

fn assign_ids(blocks: &mut [ContentBlock], prefix: &str, parent_id: Option<&str>) {
    for (index, block) in blocks.iter_mut().enumerate() {
        let path = format!("{}.{}", prefix, index);

        if let Some(text) = block.text_value_mut() {
            *text = normalize_text(text);
        }
        if let ContentBlock::List { items, .. } = block {
            for item in items.iter_mut() {
                *item = normalize_text(item);
            }
        }

        let seed = format!("{}{}{}", block.type_name(), path, block.text_value().unwrap_or_default());
        let id = format!("{:016x}", fnv1a(&seed));
        block.set_id(id.clone());

        if let ContentBlock::ThreadItem(item) = block {
            item.parent_id = parent_id.map(str::to_string);
            assign_ids(&mut item.content, &format!("{}.c", path), Some(&id));
            assign_ids(&mut item.children, &format!("{}.n", path), Some(&id));
        }
    }
}

fn dedup_links(blocks: &mut [ContentBlock]) -> Vec<LinkRef> {
    let mut links = Vec::new();
    let mut seen = HashMap::new();
    collect_links(blocks, &mut links, &mut seen);
    links
}

fn collect_links(blocks: &mut [ContentBlock], links: &mut Vec<LinkRef>, seen: &mut HashMap<String, usize>) {
    for block in blocks.iter_mut() {
        match block {
            ContentBlock::Link { text, url, ref_id, .. } => {
                let id = *seen.entry(url.clone()).or_insert_with(|| {
                    links.push(LinkRef { id: links.len() + 1, text: text.clone(), url: url.clone() });
                    links.len()
                });
                *ref_id = Some(id);
            }
            ContentBlock::ThreadItem(item) => {
                collect_links(&mut item.content, links, seen);
                collect_links(&mut item.children, links, seen);
            }
            _ => {}
        }
    }
}

/// Hash of the top-level shape string, e.g. `H1|T|T0[2]`.
pub fn structural_signature(blocks: &[ContentBlock]) -> String {
    format!("{:016x}", fnv1a(&shape(blocks)))
}

fn shape(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .map(|block| match block {
            ContentBlock::Heading { level, .. } => format!("H{}", level),
            ContentBlock::ThreadItem(item) => format!("T{}[{}]", item.depth, item.children.len()),
            other => other.type_name().chars().next().map(|c| c.to_ascii_uppercase().to_string()).unwrap_or_default(),
        })
        .collect::<Vec<_>>()
        .join("|")
}

/// `mixed` needs a thread item and more than five text blocks at the top level.
pub fn infer_kind(blocks: &[ContentBlock]) -> DocKind {
    let has_thread = blocks.iter().any(ContentBlock::is_thread_item);
    let text_blocks = blocks.iter().filter(|b| matches!(b, ContentBlock::Text { .. })).count();

    match (has_thread, text_blocks > 5) {
        (true, true) => DocKind::Mixed,
        (true, false) => DocKind::Thread,
        _ => DocKind::Article,
    }
}
