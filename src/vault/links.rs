//! Relation link parsing
//!
//! Relation values are written either as wikilinks (`[[Note]]`, `[[Note|alias]]`,
//! `[[Note#Heading]]`) or as markdown links (`[Note](Note.md)`). Anything else is a
//! bare name.

use regex::Regex;
use serde_json::Value;

use crate::error::Result;
use crate::schema::LinkFormat;

/// A parsed relation value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRef {
    /// Link target without extension, possibly a vault-relative path
    pub target: String,
    /// Link style it was written in; `None` for a bare name
    pub format: Option<LinkFormat>,
}

impl LinkRef {
    /// Final path segment of the target
    pub fn note_name(&self) -> &str {
        self.target.rsplit('/').next().unwrap_or(&self.target)
    }
}

/// Compiled link patterns
#[derive(Debug, Clone)]
pub struct LinkSyntax {
    wikilink: Regex,
    markdown: Regex,
}

impl LinkSyntax {
    pub fn new() -> Result<Self> {
        Ok(Self {
            wikilink: Regex::new(r"^\[\[([^\]|#]+)(?:#[^\]|]*)?(?:\|[^\]]*)?\]\]$")?,
            markdown: Regex::new(r"^\[([^\]]*)\]\(([^)]+)\)$")?,
        })
    }

    /// Parse one relation value; empty strings yield `None`
    pub fn parse(&self, raw: &str) -> Option<LinkRef> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Some(caps) = self.wikilink.captures(raw) {
            return Some(LinkRef {
                target: caps[1].trim().to_string(),
                format: Some(LinkFormat::Wikilink),
            });
        }

        if let Some(caps) = self.markdown.captures(raw) {
            let href = caps[2].trim().replace("%20", " ");
            let href = href.strip_prefix("./").unwrap_or(&href);
            let target = href.strip_suffix(".md").unwrap_or(href);
            return Some(LinkRef {
                target: target.to_string(),
                format: Some(LinkFormat::Markdown),
            });
        }

        Some(LinkRef {
            target: raw.to_string(),
            format: None,
        })
    }

    /// Parse every relation value held by a frontmatter value
    pub fn parse_value(&self, value: &Value) -> Vec<(String, LinkRef)> {
        relation_strings(value)
            .into_iter()
            .filter_map(|raw| self.parse(&raw).map(|link| (raw, link)))
            .collect()
    }
}

/// Flatten a frontmatter value into relation strings.
///
/// An unquoted `[[Note]]` in YAML parses as a nested list `[["Note"]]`; that shape is
/// turned back into wikilink text.
pub fn relation_strings(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => {
            if let Some(inner) = unquoted_wikilink(value) {
                return vec![inner];
            }
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Array(_) => unquoted_wikilink(item),
                    _ => None,
                })
                .collect()
        }
        _ => Vec::new(),
    }
}

fn unquoted_wikilink(value: &Value) -> Option<String> {
    let outer = value.as_array()?;
    if outer.len() != 1 {
        return None;
    }
    let inner = outer[0].as_array()?;
    match inner.as_slice() {
        [Value::String(name)] => Some(format!("[[{}]]", name)),
        _ => None,
    }
}
