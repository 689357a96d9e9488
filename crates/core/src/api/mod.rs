//! Adapters for known JSON API payloads.
//!
//! Each adapter maps one response shape straight onto the content-block model,
//! bypassing markup parsing. Detection is by source identifier, checked in a
//! fixed order: Reddit, Hacker News, Wikipedia, Stack Exchange.

pub mod hn;
pub mod reddit;
pub mod stackoverflow;
pub mod wikipedia;

use chrono::{DateTime, SecondsFormat};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{PageDocError, Result};
use crate::model::ContentBlock;

/// Unfinalized document produced by an API adapter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiDocument {
    pub title: String,
    pub url: Option<String>,
    pub author: Option<String>,
    pub published: Option<String>,
    pub site: String,
    pub content: Vec<ContentBlock>,
}

impl ApiDocument {
    /// Pack label recorded in `meta.pack`, e.g. `reddit.com (JSON)`.
    pub fn pack_label(&self) -> String {
        format!("{} (JSON)", self.site)
    }
}

/// A JSON API this crate knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiSource {
    Reddit,
    HackerNews,
    Wikipedia,
    StackOverflow,
}

impl ApiSource {
    /// Picks the adapter for `identifier` by substring, in precedence order.
    pub fn detect(identifier: &str) -> Option<Self> {
        if identifier.contains("reddit.com") {
            Some(ApiSource::Reddit)
        } else if identifier.contains("hn.algolia.com") || identifier.contains("news.ycombinator.com") {
            Some(ApiSource::HackerNews)
        } else if identifier.contains("wikipedia.org") {
            Some(ApiSource::Wikipedia)
        } else if identifier.contains("stackexchange.com") || identifier.contains("stackoverflow.com") {
            Some(ApiSource::StackOverflow)
        } else {
            None
        }
    }

    /// Trace decision for this source.
    pub fn label(&self) -> &'static str {
        match self {
            ApiSource::Reddit => "Reddit JSON API",
            ApiSource::HackerNews => "HN JSON API",
            ApiSource::Wikipedia => "Wikipedia JSON API",
            ApiSource::StackOverflow => "StackOverflow JSON API",
        }
    }

    pub fn endpoint(&self) -> &'static str {
        match self {
            ApiSource::Reddit => "Reddit JSON endpoint",
            ApiSource::HackerNews => "HN Algolia endpoint",
            ApiSource::Wikipedia => "Wikipedia REST endpoint",
            ApiSource::StackOverflow => "Stack Exchange API",
        }
    }

    /// Runs the adapter for this source.
    ///
    /// # Errors
    ///
    /// Returns [`PageDocError::InvalidApiResponse`] when required fields are missing.
    pub fn extract(&self, json: Value, url: Option<&str>) -> Result<ApiDocument> {
        match self {
            ApiSource::Reddit => reddit::extract(json, url),
            ApiSource::HackerNews => hn::extract(json, url),
            ApiSource::Wikipedia => wikipedia::extract(json, url),
            ApiSource::StackOverflow => stackoverflow::extract(json, url),
        }
    }
}

/// Deserializes an API response, mapping shape errors to `InvalidApiResponse`.
pub(crate) fn from_json<T: DeserializeOwned>(json: Value, api: &str) -> Result<T> {
    serde_json::from_value(json)
        .map_err(|e| PageDocError::InvalidApiResponse(format!("Invalid {} JSON response: {}", api, e)))
}

/// Epoch seconds as an RFC 3339 UTC timestamp with millisecond precision.
pub(crate) fn epoch_to_rfc3339(seconds: f64) -> Option<String> {
    let millis = (seconds * 1000.0).round() as i64;
    DateTime::from_timestamp_millis(millis).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("https://www.reddit.com/r/rust/comments/abc/x/.json", Some(ApiSource::Reddit))]
    #[case("https://hn.algolia.com/api/v1/items/1", Some(ApiSource::HackerNews))]
    #[case("https://news.ycombinator.com/item?id=1", Some(ApiSource::HackerNews))]
    #[case("https://en.wikipedia.org/api/rest_v1/page/summary/Rust", Some(ApiSource::Wikipedia))]
    #[case("https://api.stackexchange.com/2.3/questions/1", Some(ApiSource::StackOverflow))]
    #[case("https://example.com/data.json", None)]
    fn test_detect(#[case] identifier: &str, #[case] expected: Option<ApiSource>) {
        assert_eq!(ApiSource::detect(identifier), expected);
    }

    #[test]
    fn test_reddit_wins_over_later_sources() {
        assert_eq!(ApiSource::detect("https://reddit.com/?ref=wikipedia.org"), Some(ApiSource::Reddit));
    }

    #[test]
    fn test_epoch_to_rfc3339() {
        assert_eq!(epoch_to_rfc3339(1_700_000_000.0).as_deref(), Some("2023-11-14T22:13:20.000Z"));
    }
}
