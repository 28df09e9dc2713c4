//! Migration plan types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::checksum::Checksum;
use crate::schema::LinkFormat;
use crate::version::VersionBump;

/// One schema change, tagged by `op`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum MigrationOp {
    AddType {
        type_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        extends: Option<String>,
    },
    RemoveType {
        type_name: String,
    },
    AddField {
        type_name: String,
        field: String,
        /// Value an executor can backfill existing documents with
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<Value>,
    },
    RemoveField {
        type_name: String,
        field: String,
        /// Added field on the same type that this one may have been renamed to
        #[serde(default, skip_serializing_if = "Option::is_none")]
        possible_rename: Option<String>,
    },
    /// A common type now inherits from a different parent
    ChangeExtends {
        type_name: String,
        from: String,
        to: String,
        /// Inherited fields the type no longer has
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        dropped_fields: Vec<String>,
    },
    AddEnumValue {
        enum_name: String,
        value: String,
    },
    RemoveEnumValue {
        enum_name: String,
        value: String,
    },
    AddFieldOption {
        type_name: String,
        field: String,
        value: String,
    },
    RemoveFieldOption {
        type_name: String,
        field: String,
        value: String,
    },
    ChangeLinkFormat {
        from: LinkFormat,
        to: LinkFormat,
    },
}

impl MigrationOp {
    /// Stable operation name
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddType { .. } => "add-type",
            Self::RemoveType { .. } => "remove-type",
            Self::AddField { .. } => "add-field",
            Self::RemoveField { .. } => "remove-field",
            Self::ChangeExtends { .. } => "change-extends",
            Self::AddEnumValue { .. } => "add-enum-value",
            Self::RemoveEnumValue { .. } => "remove-enum-value",
            Self::AddFieldOption { .. } => "add-field-option",
            Self::RemoveFieldOption { .. } => "remove-field-option",
            Self::ChangeLinkFormat { .. } => "change-link-format",
        }
    }

    /// Whether existing documents can be rewritten mechanically and losslessly
    pub fn is_deterministic(&self) -> bool {
        match self {
            Self::AddType { .. }
            | Self::AddField { .. }
            | Self::AddEnumValue { .. }
            | Self::AddFieldOption { .. }
            | Self::ChangeLinkFormat { .. } => true,
            Self::ChangeExtends { dropped_fields, .. } => dropped_fields.is_empty(),
            Self::RemoveType { .. }
            | Self::RemoveField { .. }
            | Self::RemoveEnumValue { .. }
            | Self::RemoveFieldOption { .. } => false,
        }
    }

    /// Type the operation touches, if any
    pub fn type_name(&self) -> Option<&str> {
        match self {
            Self::AddType { type_name, .. }
            | Self::RemoveType { type_name }
            | Self::AddField { type_name, .. }
            | Self::RemoveField { type_name, .. }
            | Self::ChangeExtends { type_name, .. }
            | Self::AddFieldOption { type_name, .. }
            | Self::RemoveFieldOption { type_name, .. } => Some(type_name),
            _ => None,
        }
    }
}

impl fmt::Display for MigrationOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddType { type_name, extends } => match extends {
                Some(parent) => write!(f, "add type '{}' (extends '{}')", type_name, parent),
                None => write!(f, "add type '{}'", type_name),
            },
            Self::RemoveType { type_name } => write!(f, "remove type '{}'", type_name),
            Self::AddField { type_name, field, .. } => {
                write!(f, "add field '{}.{}'", type_name, field)
            }
            Self::RemoveField { type_name, field, possible_rename } => {
                write!(f, "remove field '{}.{}'", type_name, field)?;
                if let Some(new_name) = possible_rename {
                    write!(f, " (renamed to '{}'?)", new_name)?;
                }
                Ok(())
            }
            Self::ChangeExtends { type_name, from, to, dropped_fields } => {
                write!(f, "move type '{}' from '{}' to '{}'", type_name, from, to)?;
                if !dropped_fields.is_empty() {
                    write!(f, " (drops {})", dropped_fields.join(", "))?;
                }
                Ok(())
            }
            Self::AddEnumValue { enum_name, value } => {
                write!(f, "add '{}' to enum '{}'", value, enum_name)
            }
            Self::RemoveEnumValue { enum_name, value } => {
                write!(f, "remove '{}' from enum '{}'", value, enum_name)
            }
            Self::AddFieldOption { type_name, field, value } => {
                write!(f, "add option '{}' to '{}.{}'", value, type_name, field)
            }
            Self::RemoveFieldOption { type_name, field, value } => {
                write!(f, "remove option '{}' from '{}.{}'", value, type_name, field)
            }
            Self::ChangeLinkFormat { from, to } => {
                write!(f, "change link format from {} to {}", from, to)
            }
        }
    }
}

/// Classified changes between two schema snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationPlan {
    pub from_version: String,
    pub to_version: String,
    pub has_changes: bool,
    pub deterministic: Vec<MigrationOp>,
    /// Changes that drop previously valid data and need a human decision
    pub non_deterministic: Vec<MigrationOp>,
    pub suggested_bump: VersionBump,
    /// `from_version` with the suggested bump applied, when it parses as semver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_version: Option<String>,
    pub from_checksum: Checksum,
    pub to_checksum: Checksum,
}

impl MigrationPlan {
    /// All operations, deterministic first
    pub fn ops(&self) -> impl Iterator<Item = &MigrationOp> {
        self.deterministic.iter().chain(self.non_deterministic.iter())
    }

    pub fn len(&self) -> usize {
        self.deterministic.len() + self.non_deterministic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn requires_review(&self) -> bool {
        !self.non_deterministic.is_empty()
    }

    /// Whether `to_version` moves far enough for the changes found
    pub fn declared_version_sufficient(&self) -> bool {
        match (
            crate::version::SchemaVersion::parse(&self.from_version),
            crate::version::SchemaVersion::parse(&self.to_version),
        ) {
            (Ok(from), Ok(to)) => to.satisfies_bump_from(&from, self.suggested_bump),
            _ => false,
        }
    }
}

impl fmt::Display for MigrationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Migration {} -> {}", self.from_version, self.to_version)?;
        if !self.has_changes {
            return writeln!(f, "  no changes");
        }
        if !self.deterministic.is_empty() {
            writeln!(f, "  deterministic ({}):", self.deterministic.len())?;
            for op in &self.deterministic {
                writeln!(f, "    + {}", op)?;
            }
        }
        if !self.non_deterministic.is_empty() {
            writeln!(f, "  needs review ({}):", self.non_deterministic.len())?;
            for op in &self.non_deterministic {
                writeln!(f, "    ! {}", op)?;
            }
        }
        write!(f, "  suggested bump: {}", self.suggested_bump)?;
        if let Some(version) = &self.suggested_version {
            write!(f, " ({})", version)?;
        }
        writeln!(f)
    }
}
