//! Minimal selector matching for pattern packs.
//!
//! A selector string is a comma-separated OR of simple patterns: `tag`,
//! `tag.class1.class2`, `.class`, `[attr=value]`, or a combination such as
//! `div.comment[role=article]`. There are no combinators and no pseudo-classes.
//! Packs still use full CSS (via `scraper`) for descendant queries; this matcher
//! only answers "is this element one of those?".

use crate::parse::Element;

/// One alternative of a selector list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimpleSelector {
    pub tag: Option<String>,
    pub classes: Vec<String>,
    pub attr: Option<(String, String)>,
}

impl SimpleSelector {
    /// Parses one alternative. Returns `None` for an empty or malformed pattern.
    pub fn parse(pattern: &str) -> Option<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return None;
        }

        let (head, attr) = match pattern.find('[') {
            Some(start) => {
                let clause = pattern[start..].strip_prefix('[')?.strip_suffix(']')?;
                let (name, value) = clause.split_once('=')?;
                let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                (&pattern[..start], Some((name.trim().to_string(), value.to_string())))
            }
            None => (pattern, None),
        };

        let mut parts = head.split('.');
        let tag = parts.next().filter(|t| !t.is_empty()).map(|t| t.to_lowercase());
        let classes: Vec<String> = parts.filter(|c| !c.is_empty()).map(str::to_string).collect();

        if tag.is_none() && classes.is_empty() && attr.is_none() {
            return None;
        }

        Some(Self { tag, classes, attr })
    }

    pub fn matches(&self, element: &Element<'_>) -> bool {
        if let Some(tag) = &self.tag
            && *tag != element.tag_name()
        {
            return false;
        }

        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }

        match &self.attr {
            Some((name, value)) => element.attr(name) == Some(value.as_str()),
            None => true,
        }
    }
}

/// A parsed comma-separated selector list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectorList {
    alternatives: Vec<SimpleSelector>,
}

impl SelectorList {
    pub fn parse(selector: &str) -> Self {
        Self { alternatives: selector.split(',').filter_map(SimpleSelector::parse).collect() }
    }

    /// True when any alternative matches.
    pub fn matches(&self, element: &Element<'_>) -> bool {
        self.alternatives.iter().any(|alt| alt.matches(element))
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }
}

/// Convenience for one-off checks against an unparsed selector string.
pub fn matches(element: &Element<'_>, selector: &str) -> bool {
    SelectorList::parse(selector).matches(element)
}
