//! Plain text outline of a PageDoc.
//!
//! One line per block. Thread items are indented two spaces per depth level
//! and prefixed with their author; links print their reference number, and
//! the link table follows the body.

use std::fmt::Write;

use pagedoc_core::{ContentBlock, PageDoc, ThreadItem};

const ANONYMOUS: &str = "anonymous";

pub fn render(doc: &PageDoc) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", doc.title);
    if let Some(url) = &doc.url {
        let _ = writeln!(out, "{}", url);
    }
    out.push('\n');

    for block in &doc.content {
        render_block(&mut out, block, 0);
    }

    if !doc.links.is_empty() {
        out.push('\n');
        for link in &doc.links {
            let _ = writeln!(out, "[{}] {}", link.id, link.url);
        }
    }

    out
}

fn render_block(out: &mut String, block: &ContentBlock, indent: usize) {
    let pad = "  ".repeat(indent);

    match block {
        ContentBlock::Heading { level, text, .. } => {
            let _ = writeln!(out, "{}{} {}", pad, "#".repeat(usize::from(*level)), text);
        }
        ContentBlock::Text { text, .. } => {
            let _ = writeln!(out, "{}{}", pad, text);
        }
        ContentBlock::Code { text, language, .. } => {
            let _ = writeln!(out, "{}```{}", pad, language.as_deref().unwrap_or_default());
            for line in text.lines() {
                let _ = writeln!(out, "{}{}", pad, line);
            }
            let _ = writeln!(out, "{}```", pad);
        }
        ContentBlock::Quote { text, .. } => {
            let _ = writeln!(out, "{}> {}", pad, text);
        }
        ContentBlock::List { items, .. } => {
            for item in items {
                let _ = writeln!(out, "{}- {}", pad, item);
            }
        }
        ContentBlock::Link { text, url, ref_id, .. } => match ref_id {
            Some(id) => {
                let _ = writeln!(out, "{}{} [{}]", pad, text, id);
            }
            None => {
                let _ = writeln!(out, "{}{} <{}>", pad, text, url);
            }
        },
        ContentBlock::Image { alt, src, .. } => {
            let _ = writeln!(out, "{}[image: {}] {}", pad, alt.as_deref().unwrap_or_default(), src);
        }
        ContentBlock::ThreadItem(item) => render_item(out, item),
    }
}

fn render_item(out: &mut String, item: &ThreadItem) {
    let indent = item.depth as usize;
    let _ = writeln!(out, "{}@{}", "  ".repeat(indent), item.author.as_deref().unwrap_or(ANONYMOUS));

    for block in &item.content {
        render_block(out, block, indent + 1);
    }
    for child in &item.children {
        render_block(out, child, indent + 1);
    }
}
