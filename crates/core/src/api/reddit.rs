//! Reddit listing JSON (`<post-url>/.json`).
//!
//! The endpoint returns `[post_listing, comment_listing]`; subreddit and
//! search endpoints return a single listing whose first child is used.

use serde::Deserialize;
use serde_json::Value;

use super::{ApiDocument, epoch_to_rfc3339, from_json};
use crate::error::{PageDocError, Result};
use crate::model::{ContentBlock, ThreadItem};

const SITE: &str = "reddit.com";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Response {
    Thread(Vec<Listing>),
    Single(Listing),
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Default, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    #[serde(default)]
    kind: String,
    data: ThingData,
}

#[derive(Debug, Default, Deserialize)]
struct ThingData {
    title: Option<String>,
    author: Option<String>,
    selftext: Option<String>,
    url: Option<String>,
    created_utc: Option<f64>,
    body: Option<String>,
    depth: Option<u32>,
    /// A listing, or `""` when there are no replies.
    #[serde(default)]
    replies: Option<Replies>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Replies {
    Listing(Listing),
    #[allow(dead_code)]
    Empty(Value),
}

pub fn extract(json: Value, url: Option<&str>) -> Result<ApiDocument> {
    let (post_listing, comments) = match from_json::<Response>(json, "Reddit")? {
        Response::Thread(listings) => {
            let mut listings = listings.into_iter();
            (listings.next(), listings.next().map(|l| l.data.children).unwrap_or_default())
        }
        Response::Single(listing) => (Some(listing), Vec::new()),
    };

    let post = post_listing
        .and_then(|listing| listing.data.children.into_iter().next())
        .map(|thing| thing.data)
        .ok_or_else(|| PageDocError::InvalidApiResponse("Invalid Reddit JSON response".to_string()))?;

    let mut content = Vec::new();
    match (post.selftext.filter(|s| !s.is_empty()), &post.url) {
        (Some(selftext), _) => content.push(ContentBlock::text(selftext)),
        (None, Some(link)) if !link.contains("reddit.com") => content.push(ContentBlock::link("Link to content", link)),
        _ => {}
    }
    content.extend(comment_blocks(comments));

    Ok(ApiDocument {
        title: post.title.filter(|t| !t.is_empty()).unwrap_or_else(|| "Reddit Post".to_string()),
        url: url.map(str::to_string).or(post.url),
        author: post.author,
        published: post.created_utc.and_then(epoch_to_rfc3339),
        site: SITE.to_string(),
        content,
    })
}

/// `t1` comments only; `more` stubs and other kinds are skipped.
fn comment_blocks(children: Vec<Thing>) -> Vec<ContentBlock> {
    children
        .into_iter()
        .filter(|thing| thing.kind == "t1")
        .map(|thing| {
            let data = thing.data;
            let content = data.body.filter(|b| !b.is_empty()).map(ContentBlock::text).into_iter().collect();

            let mut item = ThreadItem::new(data.depth.unwrap_or(0), data.author, content);
            if let Some(Replies::Listing(replies)) = data.replies {
                item.children = comment_blocks(replies.data.children);
            }
            item.into()
        })
        .collect()
}
