//! Wikipedia REST page summaries (`/api/rest_v1/page/summary/<title>`).

use serde::Deserialize;
use serde_json::Value;

use super::{ApiDocument, from_json};
use crate::error::Result;
use crate::model::ContentBlock;
use crate::parse::html_to_text;

const SITE: &str = "wikipedia.org";

#[derive(Debug, Deserialize)]
struct Summary {
    title: Option<String>,
    /// May carry inline markup such as `<i>`.
    displaytitle: Option<String>,
    extract: Option<String>,
    timestamp: Option<String>,
    thumbnail: Option<Thumbnail>,
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: Option<String>,
}

pub fn extract(json: Value, url: Option<&str>) -> Result<ApiDocument> {
    let summary: Summary = from_json(json, "Wikipedia")?;

    let title = summary
        .displaytitle
        .as_deref()
        .map(html_to_text)
        .filter(|t| !t.is_empty())
        .or(summary.title.filter(|t| !t.is_empty()))
        .unwrap_or_else(|| "Wikipedia Article".to_string());

    let mut content = Vec::new();
    if let Some(extract) = summary.extract.filter(|e| !e.trim().is_empty()) {
        content.push(ContentBlock::text(extract));
    }
    if let Some(src) = summary.thumbnail.and_then(|t| t.source) {
        content.push(ContentBlock::image(Some("Article thumbnail".to_string()), src));
    }

    let page = summary.content_urls.and_then(|u| u.desktop).and_then(|d| d.page);

    Ok(ApiDocument {
        title,
        url: url.map(str::to_string).or(page),
        author: None,
        published: summary.timestamp,
        site: SITE.to_string(),
        content,
    })
}
