//! Audit issues
//!
//! An [`AuditIssue`] is a severity, a message and a fixability flag wrapped around
//! an [`IssueKind`]. The kind is a tagged union keyed by the stable issue code, and
//! every variant carries only its own payload.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

// =============================================================================
// Severity
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// =============================================================================
// Issue Kinds
// =============================================================================

/// What is wrong, keyed by issue code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "kebab-case")]
pub enum IssueKind {
    /// No usable frontmatter or no type discriminator
    OrphanFile { reason: String },
    InvalidType {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },
    WrongDirectory { expected: PathBuf, actual: PathBuf },
    MissingRequired {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<serde_json::Value>,
    },
    InvalidOption {
        field: String,
        value: String,
        options: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },
    /// Relation value not rendered in the configured link style
    FormatViolation {
        field: String,
        value: String,
        expected: String,
    },
    StaleReference {
        field: String,
        target: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        similar: Vec<String>,
    },
    InvalidSourceType {
        field: String,
        target: String,
        actual_type: String,
        expected_types: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },
    UnknownField {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        suggestion: Option<String>,
    },
    OwnedWrongLocation {
        owner: String,
        owner_path: PathBuf,
        expected: PathBuf,
        actual: PathBuf,
    },
    OwnedNoteReferenced {
        field: String,
        target: String,
        owner: String,
    },
    ParentCycle { cycle: Vec<String> },
    InvalidDate { field: String, value: String },
    InvalidBoolean { field: String, value: String },
    InvalidNumber { field: String, value: String },
    /// Multi-valued field holding a single scalar
    InvalidList { field: String },
    SelfReference { field: String },
    TrailingWhitespace { field: String },
}

impl IssueKind {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::OrphanFile { .. } => "orphan-file",
            Self::InvalidType { .. } => "invalid-type",
            Self::WrongDirectory { .. } => "wrong-directory",
            Self::MissingRequired { .. } => "missing-required",
            Self::InvalidOption { .. } => "invalid-option",
            Self::FormatViolation { .. } => "format-violation",
            Self::StaleReference { .. } => "stale-reference",
            Self::InvalidSourceType { .. } => "invalid-source-type",
            Self::UnknownField { .. } => "unknown-field",
            Self::OwnedWrongLocation { .. } => "owned-wrong-location",
            Self::OwnedNoteReferenced { .. } => "owned-note-referenced",
            Self::ParentCycle { .. } => "parent-cycle",
            Self::InvalidDate { .. } => "invalid-date",
            Self::InvalidBoolean { .. } => "invalid-boolean",
            Self::InvalidNumber { .. } => "invalid-number",
            Self::InvalidList { .. } => "invalid-list",
            Self::SelfReference { .. } => "self-reference",
            Self::TrailingWhitespace { .. } => "trailing-whitespace",
        }
    }

    /// Severity outside strict mode
    pub fn default_severity(&self) -> Severity {
        match self {
            Self::FormatViolation { .. }
            | Self::StaleReference { .. }
            | Self::UnknownField { .. }
            | Self::InvalidList { .. }
            | Self::TrailingWhitespace { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Whether a fixer can repair this without asking
    pub fn auto_fixable(&self) -> bool {
        match self {
            Self::WrongDirectory { .. }
            | Self::FormatViolation { .. }
            | Self::OwnedWrongLocation { .. }
            | Self::InvalidList { .. }
            | Self::TrailingWhitespace { .. } => true,
            Self::MissingRequired { default, .. } => default.is_some(),
            _ => false,
        }
    }

    /// Field the issue is about, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingRequired { field, .. }
            | Self::InvalidOption { field, .. }
            | Self::FormatViolation { field, .. }
            | Self::StaleReference { field, .. }
            | Self::InvalidSourceType { field, .. }
            | Self::UnknownField { field, .. }
            | Self::OwnedNoteReferenced { field, .. }
            | Self::InvalidDate { field, .. }
            | Self::InvalidBoolean { field, .. }
            | Self::InvalidNumber { field, .. }
            | Self::InvalidList { field }
            | Self::SelfReference { field }
            | Self::TrailingWhitespace { field } => Some(field),
            _ => None,
        }
    }

    /// Advisory replacement, if one was found
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::InvalidType { suggestion, .. }
            | Self::InvalidOption { suggestion, .. }
            | Self::InvalidSourceType { suggestion, .. }
            | Self::UnknownField { suggestion, .. } => suggestion.as_deref(),
            Self::StaleReference { similar, .. } => similar.first().map(String::as_str),
            _ => None,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::OrphanFile { reason } => format!("Orphan file: {}", reason),
            Self::InvalidType { value, suggestion } => {
                with_hint(format!("Unknown type '{}'", value), suggestion.as_deref())
            }
            Self::WrongDirectory { expected, actual } => format!(
                "File is in '{}' but its type lives in '{}'",
                actual.display(),
                expected.display()
            ),
            Self::MissingRequired { field, default } => match default {
                Some(d) => format!("Missing required field '{}' (default: {})", field, d),
                None => format!("Missing required field '{}'", field),
            },
            Self::InvalidOption { field, value, options, suggestion } => with_hint(
                format!(
                    "Invalid value '{}' for '{}' (expected one of: {})",
                    value,
                    field,
                    options.join(", ")
                ),
                suggestion.as_deref(),
            ),
            Self::FormatViolation { field, value, expected } => {
                format!("'{}' value '{}' is not a {} link", field, value, expected)
            }
            Self::StaleReference { field, target, similar } => with_hint(
                format!("'{}' links to missing note '{}'", field, target),
                similar.first().map(String::as_str),
            ),
            Self::InvalidSourceType { field, target, actual_type, expected_types, .. } => format!(
                "'{}' links to '{}' of type '{}' (expected {})",
                field,
                target,
                actual_type,
                expected_types.join(" or ")
            ),
            Self::UnknownField { field, suggestion } => {
                with_hint(format!("Unknown field '{}'", field), suggestion.as_deref())
            }
            Self::OwnedWrongLocation { owner, expected, actual, .. } => format!(
                "Owned by '{}' and should live in '{}', found in '{}'",
                owner,
                expected.display(),
                actual.display()
            ),
            Self::OwnedNoteReferenced { field, target, owner } => format!(
                "'{}' links to '{}', which is owned by '{}'",
                field, target, owner
            ),
            Self::ParentCycle { cycle } => format!("Parent cycle: {}", cycle.join(" -> ")),
            Self::InvalidDate { field, value } => {
                format!("'{}' value '{}' is not a YYYY-MM-DD date", field, value)
            }
            Self::InvalidBoolean { field, value } => {
                format!("'{}' value '{}' is not a boolean", field, value)
            }
            Self::InvalidNumber { field, value } => {
                format!("'{}' value '{}' is not a number", field, value)
            }
            Self::InvalidList { field } => format!("'{}' should be a list", field),
            Self::SelfReference { field } => format!("'{}' links to the note itself", field),
            Self::TrailingWhitespace { field } => format!("'{}' has trailing whitespace", field),
        }
    }
}

fn with_hint(message: String, suggestion: Option<&str>) -> String {
    match suggestion {
        Some(s) => format!("{} (did you mean '{}'?)", message, s),
        None => message,
    }
}

// =============================================================================
// Audit Issue
// =============================================================================

/// A single problem found in one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditIssue {
    pub severity: Severity,
    pub message: String,
    pub auto_fixable: bool,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl AuditIssue {
    pub fn new(kind: IssueKind) -> Self {
        Self {
            severity: kind.default_severity(),
            message: kind.message(),
            auto_fixable: kind.auto_fixable(),
            kind,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn field(&self) -> Option<&str> {
        self.kind.field()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for AuditIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code(), self.severity, self.message)?;
        if self.auto_fixable {
            write!(f, " (fixable)")?;
        }
        Ok(())
    }
}
