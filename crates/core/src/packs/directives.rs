use crate::error::{PageDocError, Result};
use regex::Regex;

/// How a thread item's depth is computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthMethod {
    /// Read a named attribute on the item
    Attr,
    /// Query a sub-element and read its text or `width`, optionally scaled
    Query,
    /// Count ancestors matching the item selector
    Nested,
}

impl DepthMethod {
    fn parse(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "attr" => Ok(DepthMethod::Attr),
            "query" => Ok(DepthMethod::Query),
            "nested" => Ok(DepthMethod::Nested),
            _ => Err(PageDocError::PackError(format!("Invalid depth method: {}", value))),
        }
    }
}

/// A single pack directive line
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Domain(String),

    /// Selectors
    Root(String),
    Item(String),
    Author(String),
    Body(String),
    Depth(String),
    DepthMethod(DepthMethod),
    DepthMath(String),

    /// Blacklist selectors
    Filter(String),

    /// URL rewrite (paired)
    TransformSearch(String),
    TransformReplace(String),
}

/// Extraction selectors declared by a pack
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackSelectors {
    pub root: Option<String>,
    pub item: Option<String>,
    /// `attr:NAME` reads an attribute, anything else is a descendant query
    pub author: Option<String>,
    pub body: Option<String>,
    pub depth: Option<String>,
    pub depth_method: Option<DepthMethod>,
    /// e.g. `x / 40`
    pub depth_math: Option<String>,
}

/// Regex URL rewrite applied before ingestion
#[derive(Debug, Clone)]
pub struct UrlTransform {
    pub search: String,
    pub replace: String,
    regex: Regex,
}

impl UrlTransform {
    pub fn new(search: &str, replace: &str) -> Result<Self> {
        let regex = Regex::new(search)
            .map_err(|e| PageDocError::PackError(format!("Invalid transform pattern {}: {}", search, e)))?;
        Ok(Self { search: search.to_string(), replace: replace.to_string(), regex })
    }

    /// Rewrites `url` when the search pattern matches, otherwise `None`.
    pub fn apply(&self, url: &str) -> Option<String> {
        if self.regex.is_match(url) { Some(self.regex.replace(url, self.replace.as_str()).into_owned()) } else { None }
    }
}

impl PartialEq for UrlTransform {
    fn eq(&self, other: &Self) -> bool {
        self.search == other.search && self.replace == other.replace
    }
}

/// Per-domain extraction hints
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatternPack {
    pub domain: String,
    pub selectors: PackSelectors,
    pub transform: Option<UrlTransform>,
    pub filters: Vec<String>,
    pending_search: Option<String>,
    pending_replace: Option<String>,
}

impl PatternPack {
    /// Create an empty pack for a domain
    pub fn new(domain: impl Into<String>) -> Self {
        Self { domain: domain.into(), ..Default::default() }
    }

    /// Add a directive to this pack
    ///
    /// Later selector directives replace earlier ones; filters accumulate.
    pub fn add_directive(&mut self, directive: Directive) -> Result<()> {
        match directive {
            Directive::Domain(domain) => self.domain = domain,
            Directive::Root(selector) => self.selectors.root = Some(selector),
            Directive::Item(selector) => self.selectors.item = Some(selector),
            Directive::Author(selector) => self.selectors.author = Some(selector),
            Directive::Body(selector) => self.selectors.body = Some(selector),
            Directive::Depth(selector) => self.selectors.depth = Some(selector),
            Directive::DepthMethod(method) => self.selectors.depth_method = Some(method),
            Directive::DepthMath(expr) => self.selectors.depth_math = Some(expr),
            Directive::Filter(selector) => self.filters.push(selector),
            Directive::TransformSearch(search) => self.pending_search = Some(search),
            Directive::TransformReplace(replace) => self.pending_replace = Some(replace),
        }
        Ok(())
    }

    /// Validate a fully-parsed pack
    ///
    /// The transform pair may appear in either order; it is compiled here.
    /// An empty replacement strips the matched text.
    pub fn finish(mut self) -> Result<Self> {
        if self.domain.is_empty() {
            return Err(PageDocError::PackError("Missing domain directive".to_string()));
        }
        match (self.pending_search.take(), self.pending_replace.take()) {
            (Some(search), Some(replace)) => self.transform = Some(UrlTransform::new(&search, &replace)?),
            (Some(search), None) => {
                return Err(PageDocError::PackError(format!("transform_search without transform_replace: {}", search)));
            }
            (None, Some(replace)) => {
                return Err(PageDocError::PackError(format!("transform_replace without transform_search: {}", replace)));
            }
            (None, None) => {}
        }
        Ok(self)
    }

    /// Builder-style setters used by tests and programmatic packs
    pub fn with_item(mut self, selector: &str) -> Self {
        self.selectors.item = Some(selector.to_string());
        self
    }

    pub fn with_root(mut self, selector: &str) -> Self {
        self.selectors.root = Some(selector.to_string());
        self
    }

    pub fn with_filter(mut self, selector: &str) -> Self {
        self.filters.push(selector.to_string());
        self
    }

    /// Rewrites `url` through this pack's transform, if any matches
    pub fn transform_url(&self, url: &str) -> Option<String> {
        self.transform.as_ref().and_then(|t| t.apply(url))
    }

    /// Scale a raw depth value through `depth_math`
    ///
    /// `x / N` floors the division; any other expression is identity.
    pub fn apply_depth_math(&self, raw: u32) -> u32 {
        let Some(expr) = &self.selectors.depth_math else {
            return raw;
        };

        expr.split_once('/')
            .filter(|(lhs, _)| lhs.trim() == "x")
            .and_then(|(_, rhs)| rhs.trim().parse::<u32>().ok())
            .filter(|divisor| *divisor > 0)
            .map_or(raw, |divisor| raw / divisor)
    }
}

/// Parse a directive line from the pack format
pub fn parse_directive(line: &str) -> Result<Directive> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Err(PageDocError::PackError("Empty or comment line".to_string()));
    }

    let Some((key, value)) = line.split_once(':') else {
        return Err(PageDocError::PackError(format!("Invalid directive format: {}", line)));
    };

    let key = key.trim();
    let value = value.trim().to_string();

    if value.is_empty() && key != "transform_replace" {
        return Err(PageDocError::PackError(format!("Empty value for directive: {}", key)));
    }

    match key {
        "domain" => Ok(Directive::Domain(value.to_lowercase())),
        "root" => Ok(Directive::Root(value)),
        "item" => Ok(Directive::Item(value)),
        "author" => Ok(Directive::Author(value)),
        "body" => Ok(Directive::Body(value)),
        "depth" => Ok(Directive::Depth(value)),
        "depth_method" => Ok(Directive::DepthMethod(DepthMethod::parse(&value)?)),
        "depth_math" => Ok(Directive::DepthMath(value)),
        "filter" => Ok(Directive::Filter(value)),
        "transform_search" => Ok(Directive::TransformSearch(value)),
        "transform_replace" => Ok(Directive::TransformReplace(value)),
        _ => Err(PageDocError::PackError(format!("Unknown directive: {}", key))),
    }
}
