//! Hacker News items from the Algolia API (`/api/v1/items/<id>`).
//!
//! Algolia already nests replies under `children`, so depth is the nesting
//! level rather than anything carried in the payload.

use serde::Deserialize;
use serde_json::Value;

use super::{ApiDocument, from_json};
use crate::error::Result;
use crate::model::{ContentBlock, ThreadItem};
use crate::parse::html_to_text;

const SITE: &str = "news.ycombinator.com";

#[derive(Debug, Deserialize)]
struct Item {
    id: Option<u64>,
    title: Option<String>,
    author: Option<String>,
    created_at: Option<String>,
    text: Option<String>,
    url: Option<String>,
    #[serde(default)]
    children: Vec<Item>,
}

pub fn extract(json: Value, url: Option<&str>) -> Result<ApiDocument> {
    let item: Item = from_json(json, "Hacker News")?;

    let mut content = Vec::new();
    match (non_empty(item.text.as_deref()), non_empty(item.url.as_deref())) {
        (Some(text), _) => content.push(ContentBlock::text(html_to_text(text))),
        (None, Some(link)) => content.push(ContentBlock::link("External Link", link)),
        (None, None) => {}
    }
    content.extend(comment_blocks(&item.children, 0));

    let url = url
        .map(str::to_string)
        .or_else(|| item.id.map(|id| format!("https://news.ycombinator.com/item?id={}", id)));

    Ok(ApiDocument {
        title: item.title.filter(|t| !t.is_empty()).unwrap_or_else(|| "Hacker News Thread".to_string()),
        url,
        author: item.author,
        published: item.created_at,
        site: SITE.to_string(),
        content,
    })
}

/// Deleted and dead comments carry no text and are dropped with their subtree.
fn comment_blocks(children: &[Item], depth: u32) -> Vec<ContentBlock> {
    children
        .iter()
        .filter_map(|child| {
            let text = non_empty(child.text.as_deref())?;
            let mut item =
                ThreadItem::new(depth, child.author.clone(), vec![ContentBlock::text(html_to_text(text))]);
            item.children = comment_blocks(&child.children, depth + 1);
            Some(item.into())
        })
        .collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_comments_get_nesting_depth() {
        let json = json!({
            "id": 42, "title": "Show HN: pagedoc", "author": "pg", "created_at": "2024-01-01T00:00:00.000Z",
            "url": "https://example.com",
            "children": [
                {"author": "dang", "text": "<p>Nice &amp; tidy</p>", "children": [
                    {"author": "tptacek", "text": "Agreed", "children": []}
                ]},
                {"author": null, "text": null, "children": [{"author": "ghost", "text": "orphan"}]}
            ]
        });

        let doc = extract(json, None).unwrap();

        assert_eq!(doc.url.as_deref(), Some("https://news.ycombinator.com/item?id=42"));
        assert_eq!(doc.published.as_deref(), Some("2024-01-01T00:00:00.000Z"));
        assert_eq!(doc.content[0], ContentBlock::link("External Link", "https://example.com"));
        assert_eq!(doc.content.len(), 2);

        let top = doc.content[1].as_thread_item().unwrap();
        assert_eq!(top.depth, 0);
        assert_eq!(top.content, vec![ContentBlock::text("Nice & tidy")]);
        assert_eq!(top.children[0].as_thread_item().unwrap().depth, 1);
    }

    #[test]
    fn test_text_post_and_defaults() {
        let doc = extract(json!({"text": "Ask HN body"}), Some("https://hn.algolia.com/api/v1/items/1")).unwrap();

        assert_eq!(doc.title, "Hacker News Thread");
        assert_eq!(doc.url.as_deref(), Some("https://hn.algolia.com/api/v1/items/1"));
        assert_eq!(doc.content, vec![ContentBlock::text("Ask HN body")]);
    }
}
