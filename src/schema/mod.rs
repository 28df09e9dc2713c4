//! Raw schema documents
//!
//! The persisted shape of a vault schema: type declarations (which may extend each
//! other), shared enums and vault-wide settings. Nothing here is resolved; see
//! [`crate::resolver`] for inheritance merging.
//!
//! ```json
//! {
//!   "version": "1.2.0",
//!   "config": { "link_format": "wikilink" },
//!   "enums": { "status": ["raw", "backlog", "done"] },
//!   "types": {
//!     "objective": { "fields": { "status": { "prompt": "select", "enum": "status" } } },
//!     "task": { "extends": "objective", "fields": { "due": { "prompt": "date" } } }
//!   }
//! }
//! ```

pub mod field;
pub mod plural;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::checksum::Checksum;
use crate::error::{Result, SchemaError};

pub use field::{Field, FieldKind, PromptKind, SourceSpec};
pub use plural::pluralize;

/// Name of the implicit root type every parentless type extends.
pub const ROOT_TYPE: &str = "meta";

/// How relation values are rendered in frontmatter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkFormat {
    /// `"[[Note Name]]"`
    #[default]
    Wikilink,
    /// `"[Note Name](Note Name.md)"`
    Markdown,
}

impl LinkFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkFormat::Wikilink => "wikilink",
            LinkFormat::Markdown => "markdown",
        }
    }

    /// Render a note name in this format
    pub fn render(&self, target: &str) -> String {
        match self {
            LinkFormat::Wikilink => format!("[[{}]]", target),
            LinkFormat::Markdown => format!("[{}]({}.md)", target, target),
        }
    }
}

impl fmt::Display for LinkFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vault-wide settings carried by the schema document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSettings {
    #[serde(default)]
    pub link_format: LinkFormat,
}

/// A template section for the body of new documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySection {
    pub title: String,
    #[serde(default = "default_section_level")]
    pub level: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

fn default_section_level() -> u8 {
    2
}

/// Field declarations in declaration order.
///
/// Order matters for field ordering of resolved types, so this keeps the
/// sequence the document was written in. A repeated key replaces the earlier
/// declaration in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap(Vec<(String, Field)>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field, keeping the position of an existing entry
    pub fn insert(&mut self, name: impl Into<String>, field: Field) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = field,
            None => self.0.push((name, field)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.0.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Field)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, Field)>>(iter: I) -> Self {
        let mut map = FieldMap::new();
        for (name, field) in iter {
            map.insert(name, field);
        }
        map
    }
}

impl Serialize for FieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(n, f)| (n, f)))
    }
}

impl<'de> Deserialize<'de> for FieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct FieldMapVisitor;

        impl<'de> Visitor<'de> for FieldMapVisitor {
            type Value = FieldMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of field names to field declarations")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<FieldMap, A::Error> {
                let mut map = FieldMap::new();
                while let Some((name, field)) = access.next_entry::<String, Field>()? {
                    map.insert(name, field);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(FieldMapVisitor)
    }
}

/// A type declaration as written in the schema document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawType {
    /// Parent type; absent means the implicit root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default, skip_serializing_if = "FieldMap::is_empty")]
    pub fields: FieldMap,
    /// Explicit field order, trusted as-is when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_order: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub body_sections: Vec<BodySection>,
    /// Documents of this type may nest under other documents of this type
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub recursive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    /// Filename pattern for new documents, e.g. `"{date} {title}"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plural: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RawType {
    /// Parent name, treating a missing `extends` as the root
    pub fn parent_name(&self) -> &str {
        self.extends.as_deref().unwrap_or(ROOT_TYPE)
    }
}

/// A complete schema document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Keyed by name; iteration is in name order whatever the document's order
    #[serde(default)]
    pub types: BTreeMap<String, RawType>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub enums: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub config: SchemaSettings,
}

impl RawSchema {
    /// Parse a JSON schema document
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Parse a TOML schema document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a schema document, choosing the format by file extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            other => Err(SchemaError::InvalidFormat(format!(
                "unsupported schema file extension {:?} for {}",
                other.unwrap_or(""),
                path.display()
            ))),
        }
    }

    /// Serialize back to pretty JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checksum of the canonical JSON form of this snapshot
    pub fn checksum(&self) -> Result<Checksum> {
        Ok(Checksum::from_json(&serde_json::to_value(self)?))
    }

    /// Options of a shared enum
    pub fn enum_values(&self, name: &str) -> Option<&[String]> {
        self.enums.get(name).map(Vec::as_slice)
    }
}
