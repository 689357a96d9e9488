//! Pack-less thread detection by repeated class patterns.
//!
//! Counts the literal `class` attribute of every `div`, `section`, `li` and
//! `article`. The most frequent value seen at least [`MIN_REPEATS`] times is
//! taken as the comment container.

use serde_json::json;

use crate::extract::{StructuralExtractor, attribute_depth};
use crate::metadata::hunt_author;
use crate::model::{ContentBlock, ThreadItem};
use crate::parse::Element;
use crate::rebuild::rebuild;
use crate::selector::SelectorList;
use crate::trace::Trace;

pub const MIN_REPEATS: usize = 3;

const CANDIDATES: &str = "div, section, li, article";
const ANONYMOUS: &str = "Anonymous";

/// Detects a repeated-class thread under `root` and returns it as a tree.
///
/// Returns an empty vec when no class repeats often enough.
pub fn detect(root: Element<'_>, trace: &mut Trace) -> Vec<ContentBlock> {
    let Some((class, count)) = dominant_class(&root) else {
        return Vec::new();
    };

    let selector = format!(".{}", class.split_whitespace().collect::<Vec<_>>().join("."));
    trace.step_with(
        "Generic Thread",
        "Heuristic",
        format!("Repeated class pattern {} ({} occurrences)", selector, count),
        json!({ "selector": selector, "count": count }),
    );

    let item_match = SelectorList::parse(&selector);
    let walker = StructuralExtractor::new(None).with_generic_threads(false);

    let mut flat = Vec::new();
    for item in root.select("*").unwrap_or_default() {
        if !item_match.matches(&item) {
            continue;
        }

        let mut depth = attribute_depth(&item);
        if depth == 0 {
            depth = item.ancestors().filter(|a| item_match.matches(a)).count() as u32;
        }

        let mut content = Vec::new();
        walker.walk(item, &mut content, trace, Some(&item_match));
        if content.is_empty() {
            let text = item.text_without(&|el: &Element<'_>| item_match.matches(el));
            let text = text.trim();
            if !text.is_empty() {
                content.push(ContentBlock::text(text));
            }
        }

        let author = hunt_author(&item).unwrap_or_else(|| ANONYMOUS.to_string());
        flat.push(ThreadItem::new(depth, Some(author), content).into());
    }

    rebuild(flat)
}

/// Most frequent non-empty class value with at least [`MIN_REPEATS`] uses.
///
/// Ties go to the value seen first in document order.
fn dominant_class(root: &Element<'_>) -> Option<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();

    for element in root.select(CANDIDATES).unwrap_or_default() {
        let Some(class) = element.attr("class").filter(|c| !c.trim().is_empty()) else {
            continue;
        };
        match counts.iter_mut().find(|(seen, _)| seen == class) {
            Some((_, count)) => *count += 1,
            None => counts.push((class.to_string(), 1)),
        }
    }

    let mut best: Option<(String, usize)> = None;
    for (class, count) in counts {
        if count >= MIN_REPEATS && best.as_ref().is_none_or(|(_, top)| count > *top) {
            best = Some((class, count));
        }
    }
    best
}
