//! Error types for schema loading, resolution and diffing

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema errors
///
/// Resolution errors are fatal: a schema that produces any of them never yields a
/// partial model.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Type '{type_name}' extends unknown type '{parent}'")]
    UnknownParent { type_name: String, parent: String },

    #[error("Extends cycle detected: {}", .cycle.join(" -> "))]
    ExtendsCycle { cycle: Vec<String> },

    #[error("Field '{field}' on type '{type_name}' has unknown source type '{source_type}'")]
    UnknownSourceType {
        type_name: String,
        field: String,
        source_type: String,
    },

    #[error("Owned field '{field}' on type '{type_name}' must declare a concrete source type")]
    OwnedWithoutSource { type_name: String, field: String },

    #[error("Field '{field}' on type '{type_name}' references unknown enum '{enum_name}'")]
    UnknownEnum {
        type_name: String,
        field: String,
        enum_name: String,
    },

    #[error("Type not found: {0}")]
    TypeNotFound(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("Invalid schema format: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Semver error: {0}")]
    Semver(#[from] semver::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl SchemaError {
    /// Name of the type the error is about, when there is one
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::UnknownParent { type_name, .. }
            | Self::UnknownSourceType { type_name, .. }
            | Self::OwnedWithoutSource { type_name, .. }
            | Self::UnknownEnum { type_name, .. } => Some(type_name),
            Self::ExtendsCycle { cycle } => cycle.first().map(String::as_str),
            Self::TypeNotFound(name) => Some(name),
            _ => None,
        }
    }
}
