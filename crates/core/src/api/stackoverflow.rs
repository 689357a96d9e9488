//! Stack Exchange API questions (`/2.3/questions/<id>?filter=withbody`).

use serde::Deserialize;
use serde_json::Value;

use super::{ApiDocument, epoch_to_rfc3339, from_json};
use crate::error::{PageDocError, Result};
use crate::model::{ContentBlock, ThreadItem};
use crate::parse::html_to_text;

const SITE: &str = "stackoverflow.com";

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    items: Vec<Question>,
}

#[derive(Debug, Deserialize)]
struct Question {
    title: Option<String>,
    owner: Option<Owner>,
    creation_date: Option<i64>,
    body: Option<String>,
    link: Option<String>,
    #[serde(default)]
    answers: Vec<Answer>,
}

#[derive(Debug, Deserialize)]
struct Answer {
    owner: Option<Owner>,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct Owner {
    display_name: Option<String>,
}

pub fn extract(json: Value, url: Option<&str>) -> Result<ApiDocument> {
    let response: Response = from_json(json, "StackOverflow")?;
    let question = response
        .items
        .into_iter()
        .next()
        .ok_or_else(|| PageDocError::InvalidApiResponse("Invalid StackOverflow JSON response".to_string()))?;

    let mut content = Vec::new();
    if let Some(body) = question.body.as_deref().map(html_to_text).filter(|b| !b.is_empty()) {
        content.push(ContentBlock::text(body));
    }

    // Answers arrive flat; each is a top-level reply to the question.
    for answer in question.answers {
        let author = answer.owner.and_then(|o| o.display_name);
        content.push(ThreadItem::new(0, author, vec![ContentBlock::text(html_to_text(&answer.body))]).into());
    }

    Ok(ApiDocument {
        title: question.title.unwrap_or_default(),
        url: url.map(str::to_string).or(question.link),
        author: question.owner.and_then(|o| o.display_name),
        published: question.creation_date.and_then(|secs| epoch_to_rfc3339(secs as f64)),
        site: SITE.to_string(),
        content,
    })
}
