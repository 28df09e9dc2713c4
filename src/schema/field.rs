//! Field declarations

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Target for the `source` of a relation field meaning "any type"
pub const ANY_SOURCE: &str = "any";

/// How a field is filled in when a document is created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    #[serde(alias = "input")]
    Text,
    Select,
    #[serde(alias = "multi-input")]
    List,
    Date,
    #[serde(alias = "dynamic")]
    Relation,
    Boolean,
    Number,
}

/// The kind of a field, derived from its declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Fixed value written on creation, never prompted
    Static,
    Text,
    Select,
    List,
    Date,
    Relation,
    Boolean,
    Number,
}

/// Type constraint of a relation field: one type, several, or `"any"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceSpec {
    One(String),
    Many(Vec<String>),
}

impl SourceSpec {
    /// True when any type is accepted
    pub fn is_any(&self) -> bool {
        match self {
            SourceSpec::One(name) => name == ANY_SOURCE,
            SourceSpec::Many(names) => names.iter().any(|n| n == ANY_SOURCE),
        }
    }

    /// Declared type names, excluding `"any"`
    pub fn types(&self) -> Vec<&str> {
        match self {
            SourceSpec::One(name) if name != ANY_SOURCE => vec![name.as_str()],
            SourceSpec::One(_) => Vec::new(),
            SourceSpec::Many(names) => names
                .iter()
                .map(String::as_str)
                .filter(|n| *n != ANY_SOURCE)
                .collect(),
        }
    }
}

/// A single field declaration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<PromptKind>,
    /// Static value; a field with a value and no prompt is never asked for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    /// Shared enum providing the options
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceSpec>,
    /// The referenced documents live under the referencing document
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub owned: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub multiple: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Field {
    pub fn kind(&self) -> FieldKind {
        match self.prompt {
            Some(PromptKind::Text) => FieldKind::Text,
            Some(PromptKind::Select) => FieldKind::Select,
            Some(PromptKind::List) => FieldKind::List,
            Some(PromptKind::Date) => FieldKind::Date,
            Some(PromptKind::Relation) => FieldKind::Relation,
            Some(PromptKind::Boolean) => FieldKind::Boolean,
            Some(PromptKind::Number) => FieldKind::Number,
            None if self.value.is_some() => FieldKind::Static,
            None => FieldKind::Text,
        }
    }

    /// Relation field builder
    pub fn relation(source: SourceSpec) -> Self {
        Self {
            prompt: Some(PromptKind::Relation),
            source: Some(source),
            ..Default::default()
        }
    }

    pub fn is_relation(&self) -> bool {
        self.kind() == FieldKind::Relation
    }

    /// Whether the field holds a list of values
    pub fn accepts_many(&self) -> bool {
        self.multiple || self.kind() == FieldKind::List
    }

    /// Whether the field is restricted to a fixed set of options
    pub fn has_options(&self) -> bool {
        !self.options.is_empty() || self.enum_ref.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_from_declaration() {
        let stat: Field = serde_json::from_value(json!({"value": "meeting"})).unwrap();
        assert_eq!(stat.kind(), FieldKind::Static);

        let plain: Field = serde_json::from_value(json!({})).unwrap();
        assert_eq!(plain.kind(), FieldKind::Text);

        let legacy: Field = serde_json::from_value(json!({"prompt": "dynamic", "source": "task"})).unwrap();
        assert_eq!(legacy.kind(), FieldKind::Relation);
    }

    #[test]
    fn test_source_spec_any() {
        let one: SourceSpec = serde_json::from_value(json!("any")).unwrap();
        assert!(one.is_any());
        assert!(one.types().is_empty());

        let many: SourceSpec = serde_json::from_value(json!(["task", "idea"])).unwrap();
        assert!(!many.is_any());
        assert_eq!(many.types(), vec!["task", "idea"]);
    }

    #[test]
    fn test_accepts_many() {
        let list = Field { prompt: Some(PromptKind::List), ..Default::default() };
        assert!(list.accepts_many());
        let rel = Field { multiple: true, ..Field::relation(SourceSpec::One("task".into())) };
        assert!(rel.accepts_many());
    }
}
