//! Structural extraction: markup tree to content blocks.
//!
//! Walks the content root depth-first, applying pack rules where a pack is
//! present and a fixed set of block-type heuristics otherwise:
//!
//! | Element          | Block                        |
//! |------------------|------------------------------|
//! | `h1`..`h6`       | heading with level           |
//! | `p`              | text                         |
//! | `blockquote`     | quote                        |
//! | `pre`, `code`    | code                         |
//! | `ul`, `ol`       | list of trimmed `li` texts   |
//! | `a`              | link                         |
//! | pack `item`      | thread item (recursive)      |
//!
//! Anything else is a transparent container and is walked into.

use serde_json::json;

use crate::generic;
use crate::model::{ContentBlock, ThreadItem};
use crate::packs::{DepthMethod, PatternPack};
use crate::parse::{Document, Element};
use crate::rebuild::rebuild;
use crate::selector::SelectorList;
use crate::trace::Trace;

/// Below this many blocks the content is considered thin.
pub const THIN_CONTENT_THRESHOLD: usize = 3;

const FALLBACK_ROOTS: [&str; 3] = ["main", "article", "body"];

/// Pack-aware structural extractor.
#[derive(Debug, Clone)]
pub struct StructuralExtractor<'p> {
    pack: Option<&'p PatternPack>,
    item: Option<SelectorList>,
    filters: Vec<SelectorList>,
    generic_threads: bool,
}

impl<'p> StructuralExtractor<'p> {
    pub fn new(pack: Option<&'p PatternPack>) -> Self {
        let item = pack
            .and_then(|p| p.selectors.item.as_deref())
            .map(SelectorList::parse)
            .filter(|list| !list.is_empty());
        let filters = pack.map(|p| p.filters.iter().map(|f| SelectorList::parse(f)).collect()).unwrap_or_default();

        Self { pack, item, filters, generic_threads: true }
    }

    /// Enable or disable the generic thread detector for thin pages.
    pub fn with_generic_threads(mut self, enabled: bool) -> Self {
        self.generic_threads = enabled;
        self
    }

    /// Extracts blocks from `doc`, recording decisions and signals in `trace`.
    pub fn extract(&self, doc: &Document, trace: &mut Trace) -> Vec<ContentBlock> {
        let root = self.content_root(doc, trace);

        let mut blocks = Vec::new();
        self.walk(root, &mut blocks, trace, None);

        let item_selector = self.pack.and_then(|p| p.selectors.item.clone()).unwrap_or_else(|| "none".to_string());
        trace.signal("itemSelector", item_selector);

        if is_flat_thread(&blocks) {
            trace.step("Tree Reconstruction", "Pattern-driven", "Rebuilding hierarchy from flat HTML list via depth metadata");
            blocks = rebuild(blocks);
        }

        trace.signal("blockCount", blocks.len());

        if blocks.len() < THIN_CONTENT_THRESHOLD && self.item.is_none() && self.generic_threads {
            let thread = generic::detect(doc.root(), trace);
            if !thread.is_empty() {
                trace.step(
                    "Generic Thread",
                    "Detected",
                    format!("Found {} items via generic heuristics", thread.len()),
                );
                trace.signal("strategy", "generic-thread");
                blocks = thread;
            }
        }

        blocks
    }

    fn content_root<'d>(&self, doc: &'d Document, trace: &mut Trace) -> Element<'d> {
        if let Some(selector) = self.pack.and_then(|p| p.selectors.root.as_deref())
            && let Some(root) = doc.select_first(selector)
        {
            trace.step_with(
                "Content Root",
                root.tag_name(),
                format!("Selected via pack selector: {}", selector),
                json!({ "selector": selector }),
            );
            trace.signal("rootSelector", selector);
            return root;
        }

        let root = FALLBACK_ROOTS.iter().find_map(|tag| doc.select_first(tag)).unwrap_or_else(|| doc.root());
        let tag = root.tag_name();
        trace.step("Content Root", tag.clone(), "Selected via heuristics");
        trace.signal("rootSelector", tag);
        root
    }

    /// Block-type traversal over `node`'s children.
    ///
    /// Subtrees matching `exclude` are skipped entirely.
    pub(crate) fn walk(
        &self,
        node: Element<'_>,
        blocks: &mut Vec<ContentBlock>,
        trace: &mut Trace,
        exclude: Option<&SelectorList>,
    ) {
        for child in node.children() {
            if self.is_filtered(&child) || exclude.is_some_and(|ex| ex.matches(&child)) {
                continue;
            }

            if self.is_item(&child) {
                self.extract_thread_item(child, blocks, trace);
                continue;
            }

            let tag = child.tag_name();
            match tag.as_str() {
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    let level = tag[1..].parse().unwrap_or(1);
                    push_non_empty(blocks, child.trimmed_text(), |text| ContentBlock::heading(level, text));
                }
                "p" => push_non_empty(blocks, child.trimmed_text(), ContentBlock::text),
                "blockquote" => push_non_empty(blocks, child.trimmed_text(), ContentBlock::quote),
                "pre" | "code" => {
                    let language = code_language(&child);
                    push_non_empty(blocks, child.trimmed_text(), |text| ContentBlock::code(text, language));
                }
                "ul" | "ol" => {
                    let items: Vec<String> = child
                        .select("li")
                        .unwrap_or_default()
                        .iter()
                        .map(Element::trimmed_text)
                        .filter(|text| !text.is_empty())
                        .collect();
                    if !items.is_empty() {
                        blocks.push(ContentBlock::list(items));
                    }
                }
                "a" => {
                    if let Some(href) = child.attr("href").map(str::trim).filter(|h| !h.is_empty()) {
                        blocks.push(ContentBlock::link(child.trimmed_text(), href));
                    }
                }
                _ => self.walk(child, blocks, trace, exclude),
            }
        }
    }

    fn is_filtered(&self, element: &Element<'_>) -> bool {
        self.filters.iter().any(|filter| filter.matches(element))
    }

    fn is_item(&self, element: &Element<'_>) -> bool {
        self.item.as_ref().is_some_and(|item| item.matches(element))
    }

    fn extract_thread_item(&self, node: Element<'_>, blocks: &mut Vec<ContentBlock>, trace: &mut Trace) {
        let author = self.item_author(&node);

        let body = self
            .pack
            .and_then(|p| p.selectors.body.as_deref())
            .and_then(|selector| node.select_first(selector))
            .or_else(|| node.select_first("[slot=\"comment\"]"))
            .or_else(|| node.select_first(".md"))
            .unwrap_or(node);

        // Nested items belong in `children`, never in this item's own body.
        let mut content = Vec::new();
        self.walk(body, &mut content, trace, self.item.as_ref());

        let depth = self.item_depth(&node, trace);

        let mut item = ThreadItem::new(depth, author, content);
        for nested in node.children() {
            if self.is_item(&nested) {
                self.extract_thread_item(nested, &mut item.children, trace);
            } else {
                self.search_items(nested, &mut item.children, trace);
            }
        }

        blocks.push(item.into());
    }

    /// Finds item matches below `node` without creating intermediate blocks.
    fn search_items(&self, node: Element<'_>, blocks: &mut Vec<ContentBlock>, trace: &mut Trace) {
        for child in node.children() {
            if self.is_filtered(&child) {
                continue;
            }
            if self.is_item(&child) {
                self.extract_thread_item(child, blocks, trace);
            } else {
                self.search_items(child, blocks, trace);
            }
        }
    }

    fn item_author(&self, node: &Element<'_>) -> Option<String> {
        let declared = self.pack.and_then(|p| p.selectors.author.as_deref());

        let from_pack = declared.and_then(|selector| match selector.strip_prefix("attr:") {
            Some(name) => node.attr(name.trim()).map(str::to_string),
            None => node.select_first(selector).map(|el| el.trimmed_text()),
        });

        from_pack
            .filter(|author| !author.is_empty())
            .or_else(|| node.attr("author").map(str::to_string))
            .or_else(|| node.select_first("[author]").map(|el| el.trimmed_text()))
            .filter(|author| !author.is_empty())
    }

    fn item_depth(&self, node: &Element<'_>, trace: &mut Trace) -> u32 {
        let selectors = self.pack.map(|p| &p.selectors);
        let method = selectors.and_then(|s| s.depth_method);
        let depth_selector = selectors.and_then(|s| s.depth.as_deref());

        match (method, depth_selector) {
            (Some(DepthMethod::Attr), Some(attr)) => {
                let name = attr.strip_prefix("attr:").unwrap_or(attr);
                node.attr(name).map_or(0, parse_depth)
            }
            (Some(DepthMethod::Query), Some(query)) => {
                let Some(marker) = node.select_first(query) else {
                    return 0;
                };
                match self.pack.filter(|p| p.selectors.depth_math.is_some()) {
                    Some(pack) => {
                        let raw = marker.attr("width").map_or_else(|| parse_depth(&marker.text()), parse_depth);
                        pack.apply_depth_math(raw)
                    }
                    None => parse_depth(&marker.text()),
                }
            }
            (Some(DepthMethod::Nested), _) => {
                node.ancestors().filter(|ancestor| self.is_item(ancestor)).count() as u32
            }
            _ => {
                let depth = attribute_depth(node);
                if depth > 0 {
                    trace.step_with(
                        "Depth Inference",
                        "Attribute",
                        format!("Found depth {} via attribute", depth),
                        json!({ "method": "attribute", "value": depth }),
                    );
                }
                depth
            }
        }
    }
}

/// `depth` attribute, else `aria-level`, else 0.
pub(crate) fn attribute_depth(node: &Element<'_>) -> u32 {
    node.attr("depth").or_else(|| node.attr("aria-level")).map_or(0, parse_depth)
}

/// Leading decimal digits of `raw`, ignoring surrounding whitespace. Anything
/// unparseable is depth 0.
pub(crate) fn parse_depth(raw: &str) -> u32 {
    let digits: String = raw.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// Every block is a childless thread item and at least one is nested.
fn is_flat_thread(blocks: &[ContentBlock]) -> bool {
    let items: Option<Vec<&ThreadItem>> = blocks.iter().map(ContentBlock::as_thread_item).collect();
    items.is_some_and(|items| {
        items.iter().any(|item| item.depth > 0) && items.iter().all(|item| item.children.is_empty())
    })
}

fn push_non_empty(blocks: &mut Vec<ContentBlock>, text: String, make: impl FnOnce(String) -> ContentBlock) {
    if !text.is_empty() {
        blocks.push(make(text));
    }
}

/// Language from a `language-*` / `lang-*` class on the element or its `code` child.
fn code_language(node: &Element<'_>) -> Option<String> {
    let from_class = |el: &Element<'_>| {
        el.attr("class")?
            .split_whitespace()
            .find_map(|class| class.strip_prefix("language-").or_else(|| class.strip_prefix("lang-")))
            .map(str::to_string)
    };

    from_class(node).or_else(|| node.select_first("code").as_ref().and_then(from_class))
}
