//! Metadata hunting: title, author, date and site from structured markup.
//!
//! Tiers are tried in a fixed order and the first tier that yields a headline
//! wins outright. Values are never merged across tiers.
//!
//! 1. JSON-LD `<script type="application/ld+json">` with an article-like `@type`
//! 2. Open Graph `og:*` / `article:*` meta tags
//! 3. Twitter card meta tags
//! 4. Heuristics: `<title>`, author-ish elements, `<time datetime>`

use serde::Serialize;
use serde_json::Value;

use crate::parse::{Document, Element};

const ARTICLE_TYPES: [&str; 6] =
    ["Article", "BlogPosting", "NewsArticle", "TechArticle", "DiscussionForumPosting", "SocialMediaPosting"];

/// Which tier produced the metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetaSource {
    JsonLd,
    OpenGraph,
    Twitter,
    Heuristics,
}

/// Result of [`Document::hunt_metadata`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuntedMetadata {
    pub headline: Option<String>,
    pub author: Option<String>,
    pub date: Option<String>,
    pub site: Option<String>,
    pub source: MetaSource,
}

impl Document {
    /// Runs the metadata tiers in priority order.
    pub fn hunt_metadata(&self) -> HuntedMetadata {
        if let Some(found) = self.hunt_json_ld()
            && found.headline.is_some()
        {
            return found;
        }

        let og_title = self.meta_property("og:title");
        if og_title.is_some() {
            return HuntedMetadata {
                headline: og_title,
                author: self.meta_property("article:author"),
                date: self.meta_property("article:published_time"),
                site: self.meta_property("og:site_name"),
                source: MetaSource::OpenGraph,
            };
        }

        let twitter_title = self.meta_name("twitter:title");
        if twitter_title.is_some() {
            return HuntedMetadata {
                headline: twitter_title,
                author: self.meta_name("twitter:creator"),
                date: None,
                site: self.meta_name("twitter:site"),
                source: MetaSource::Twitter,
            };
        }

        HuntedMetadata {
            headline: self.title(),
            author: hunt_author(&self.root()),
            date: self.select_first("time[datetime]").and_then(|el| el.attr("datetime")).map(str::to_string),
            site: None,
            source: MetaSource::Heuristics,
        }
    }

    /// First article-like JSON-LD object across all ld+json scripts.
    ///
    /// Malformed scripts are skipped.
    fn hunt_json_ld(&self) -> Option<HuntedMetadata> {
        let scripts = self.select("script[type=\"application/ld+json\"]").ok()?;

        for script in scripts {
            let Ok(data) = serde_json::from_str::<Value>(script.text().trim()) else {
                tracing::debug!("skipping malformed JSON-LD block");
                continue;
            };

            if let Some(item) = json_ld_candidates(&data).into_iter().find(|item| is_article_like(item)) {
                return Some(HuntedMetadata {
                    headline: string_field(item, "headline").or_else(|| string_field(item, "name")),
                    author: item.get("author").and_then(json_ld_author),
                    date: string_field(item, "datePublished"),
                    site: item.get("publisher").and_then(|p| string_field(p, "name")),
                    source: MetaSource::JsonLd,
                });
            }
        }

        None
    }

    fn meta_property(&self, property: &str) -> Option<String> {
        self.meta_content(&format!("meta[property=\"{}\"]", property))
    }

    fn meta_name(&self, name: &str) -> Option<String> {
        self.meta_content(&format!("meta[name=\"{}\"]", name))
    }

    fn meta_content(&self, selector: &str) -> Option<String> {
        self.select_first(selector)
            .and_then(|el| el.attr("content"))
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
    }
}

/// Author heuristics scoped to the descendants of `scope`.
///
/// Preference order: `[rel=author]` text, `.author` text, `.user` text, then
/// an `[author]` element's attribute value or its text.
pub fn hunt_author(scope: &Element<'_>) -> Option<String> {
    for selector in ["[rel=\"author\"]", ".author", ".user"] {
        if let Some(el) = scope.select_first(selector) {
            let text = el.trimmed_text();
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    let el = scope.select_first("[author]")?;
    el.attr("author")
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| Some(el.trimmed_text()).filter(|text| !text.is_empty()))
}

/// Top-level objects, array members and `@graph` members, in document order.
fn json_ld_candidates(data: &Value) -> Vec<&Value> {
    let roots: Vec<&Value> = match data {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut candidates = Vec::new();
    for root in roots {
        candidates.push(root);
        if let Some(Value::Array(graph)) = root.get("@graph") {
            candidates.extend(graph.iter());
        }
    }
    candidates
}

fn is_article_like(item: &Value) -> bool {
    match item.get("@type") {
        Some(Value::String(kind)) => ARTICLE_TYPES.contains(&kind.as_str()),
        Some(Value::Array(kinds)) => kinds.iter().filter_map(Value::as_str).any(|kind| ARTICLE_TYPES.contains(&kind)),
        _ => false,
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Handles string, `{name}` and array author forms.
fn json_ld_author(author: &Value) -> Option<String> {
    match author {
        Value::String(name) => Some(name.trim().to_string()).filter(|n| !n.is_empty()),
        Value::Object(_) => string_field(author, "name"),
        Value::Array(authors) => authors.first().and_then(json_ld_author),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_ld_beats_open_graph() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type": "NewsArticle", "headline": "LD Title",
              "author": {"name": "Jane"}, "datePublished": "2024-01-01", "publisher": {"name": "Daily"}}</script>
            <meta property="og:title" content="OG Title">
            <meta property="og:site_name" content="OG Site">
        </head><body></body></html>"#;

        let meta = Document::parse(html).hunt_metadata();
        assert_eq!(meta.source, MetaSource::JsonLd);
        assert_eq!(meta.headline.as_deref(), Some("LD Title"));
        assert_eq!(meta.author.as_deref(), Some("Jane"));
        assert_eq!(meta.date.as_deref(), Some("2024-01-01"));
        assert_eq!(meta.site.as_deref(), Some("Daily"));
    }

    #[test]
    fn test_malformed_json_ld_is_skipped() {
        let html = r#"<html><head>
            <script type="application/ld+json">{ not json</script>
            <script type="application/ld+json">[{"@type": "WebSite", "name": "Site"}, {"@type": "BlogPosting", "name": "Second"}]</script>
        </head><body></body></html>"#;

        let meta = Document::parse(html).hunt_metadata();
        assert_eq!(meta.source, MetaSource::JsonLd);
        assert_eq!(meta.headline.as_deref(), Some("Second"));
    }

    #[test]
    fn test_json_ld_graph_members() {
        let html = r#"<script type="application/ld+json">{"@graph": [{"@type": ["Article"], "headline": "Graph"}]}</script>"#;
        let meta = Document::parse(html).hunt_metadata();
        assert_eq!(meta.headline.as_deref(), Some("Graph"));
    }

    #[test]
    fn test_tiers_do_not_merge() {
        let html = r#"<html><head>
            <meta property="og:title" content="OG Title">
            <meta name="twitter:creator" content="@someone">
            <title>Page</title>
        </head><body><span class="author">Heuristic Author</span></body></html>"#;

        let meta = Document::parse(html).hunt_metadata();
        assert_eq!(meta.source, MetaSource::OpenGraph);
        assert_eq!(meta.headline.as_deref(), Some("OG Title"));
        assert_eq!(meta.author, None);
    }

    #[test]
    fn test_twitter_tier() {
        let html = r#"<head><meta name="twitter:title" content="Tweet"><meta name="twitter:site" content="@site"></head>"#;
        let meta = Document::parse(html).hunt_metadata();
        assert_eq!(meta.source, MetaSource::Twitter);
        assert_eq!(meta.site.as_deref(), Some("@site"));
    }

    #[test]
    fn test_heuristic_tier() {
        let html = r#"<html><head><title> Plain </title></head><body>
            <span class="user">bob</span><a rel="author">alice</a>
            <time datetime="2023-05-06T00:00:00Z">May 6</time>
        </body></html>"#;

        let meta = Document::parse(html).hunt_metadata();
        assert_eq!(meta.source, MetaSource::Heuristics);
        assert_eq!(meta.headline.as_deref(), Some("Plain"));
        assert_eq!(meta.author.as_deref(), Some("alice"));
        assert_eq!(meta.date.as_deref(), Some("2023-05-06T00:00:00Z"));
    }

    #[test]
    fn test_hunt_author_attribute() {
        let doc = Document::parse(r#"<div id="c"><span author="carol">ignored</span></div>"#);
        let scope = doc.select_first("#c").unwrap();
        assert_eq!(hunt_author(&scope).as_deref(), Some("carol"));

        let doc = Document::parse(r#"<div id="c"><p>no author here</p></div>"#);
        let scope = doc.select_first("#c").unwrap();
        assert_eq!(hunt_author(&scope), None);
    }
}
