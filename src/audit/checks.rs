//! Per-document checks
//!
//! Each check reads the resolved type, the document and the shared index, and pushes
//! onto the document's own issue list. Checks are independent of each other.

use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use super::cycle::find_parent_cycle;
use super::issue::{AuditIssue, IssueKind, Severity};
use super::{AuditOptions, NATIVE_FIELDS};
use crate::resolver::{ResolvedSchema, ResolvedType};
use crate::schema::{Field, FieldKind};
use crate::suggest::{self, MAX_SIMILAR};
use crate::vault::{Document, LinkSyntax, VaultIndex};

/// Everything a check needs about the document under audit
pub(crate) struct DocContext<'a> {
    pub schema: &'a ResolvedSchema,
    pub index: &'a VaultIndex,
    pub options: &'a AuditOptions,
    pub syntax: &'a LinkSyntax,
    pub doc: &'a Document,
    pub ty: &'a ResolvedType,
    pub name: String,
}

impl DocContext<'_> {
    fn present(&self, field: &str) -> Option<&Value> {
        self.doc.get(field).filter(|v| is_present(v))
    }
}

/// A value counts as present unless it is null, blank or an empty list
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

/// Scalar values of a field as strings, flattening one level of lists
fn scalar_strings(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Number(n) => vec![n.to_string()],
        Value::Bool(b) => vec![b.to_string()],
        Value::Array(items) => items.iter().flat_map(scalar_strings).collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn check_location(ctx: &DocContext<'_>, issues: &mut Vec<AuditIssue>) {
    // Owned notes live with their owner
    if ctx.index.owner_of(&ctx.name).is_some() {
        return;
    }
    let expected = std::path::Path::new(&ctx.ty.output_dir);
    if !ctx.doc.dir().starts_with(expected) {
        issues.push(AuditIssue::new(IssueKind::WrongDirectory {
            expected: expected.to_path_buf(),
            actual: ctx.doc.dir().to_path_buf(),
        }));
    }
}

pub(crate) fn check_required(ctx: &DocContext<'_>, issues: &mut Vec<AuditIssue>) {
    for (name, field) in ctx.ty.fields.iter() {
        if !field.required || ctx.present(name).is_some() {
            continue;
        }
        let default = field.default.clone().or_else(|| field.value.clone());
        issues.push(AuditIssue::new(IssueKind::MissingRequired {
            field: name.to_string(),
            default,
        }));
    }
}

pub(crate) fn check_options(ctx: &DocContext<'_>, issues: &mut Vec<AuditIssue>) {
    for (name, field) in ctx.ty.fields.iter() {
        let Some(options) = ctx.schema.options_for(field) else {
            continue;
        };
        let Some(value) = ctx.present(name) else {
            continue;
        };
        for actual in scalar_strings(value) {
            if actual.trim().is_empty() || options.iter().any(|o| *o == actual) {
                continue;
            }
            let suggestion = suggest::closest(&actual, options.iter().map(String::as_str)).map(String::from);
            issues.push(AuditIssue::new(IssueKind::InvalidOption {
                field: name.to_string(),
                value: actual,
                options: options.to_vec(),
                suggestion,
            }));
        }
    }
}

/// Format, stale-reference, source-type, self-reference and owned-reference checks
/// for every relation value
pub(crate) fn check_relations(ctx: &DocContext<'_>, issues: &mut Vec<AuditIssue>) {
    let expected_format = ctx.options.link_format;

    for (name, field) in ctx.ty.fields.iter() {
        if field.kind() != FieldKind::Relation {
            continue;
        }
        let Some(value) = ctx.present(name) else {
            continue;
        };

        for (raw, link) in ctx.syntax.parse_value(value) {
            if link.format != Some(expected_format) {
                issues.push(AuditIssue::new(IssueKind::FormatViolation {
                    field: name.to_string(),
                    value: raw.clone(),
                    expected: expected_format.as_str().to_string(),
                }));
            }

            let note = link.note_name();
            if note == ctx.name {
                issues.push(AuditIssue::new(IssueKind::SelfReference { field: name.to_string() }));
                continue;
            }

            if !ctx.index.contains(&link.target) && !ctx.index.contains(note) {
                let similar = suggest::rank_similar(note, ctx.index.note_names(), MAX_SIMILAR);
                issues.push(AuditIssue::new(IssueKind::StaleReference {
                    field: name.to_string(),
                    target: link.target.clone(),
                    similar,
                }));
                continue;
            }

            check_source_type(ctx, name, field, note, issues);

            if let Some(owner) = ctx.index.owner_of(note) {
                if owner.owner != ctx.name {
                    issues.push(AuditIssue::new(IssueKind::OwnedNoteReferenced {
                        field: name.to_string(),
                        target: note.to_string(),
                        owner: owner.owner.clone(),
                    }));
                }
            }
        }
    }
}

fn check_source_type(
    ctx: &DocContext<'_>,
    field_name: &str,
    field: &Field,
    target: &str,
    issues: &mut Vec<AuditIssue>,
) {
    let Some(source) = &field.source else {
        return;
    };
    if source.is_any() {
        return;
    }
    let expected = source.types();
    if expected.is_empty() {
        return;
    }
    let Some(actual) = ctx.index.type_of(target) else {
        return;
    };
    if expected.iter().any(|s| ctx.schema.is_descendant_of(actual, s)) {
        return;
    }
    issues.push(AuditIssue::new(IssueKind::InvalidSourceType {
        field: field_name.to_string(),
        target: target.to_string(),
        actual_type: actual.to_string(),
        expected_types: expected.iter().map(|s| s.to_string()).collect(),
        suggestion: expected.first().map(|s| s.to_string()),
    }));
}

pub(crate) fn check_unknown_fields(ctx: &DocContext<'_>, issues: &mut Vec<AuditIssue>) {
    let severity = if ctx.options.strict {
        Severity::Error
    } else {
        Severity::Warning
    };
    for key in ctx.doc.frontmatter.keys() {
        if key == &ctx.options.discriminator
            || ctx.ty.fields.contains(key)
            || NATIVE_FIELDS.contains(&key.as_str())
            || ctx.options.allowed_fields.contains(key)
        {
            continue;
        }
        let suggestion = suggest::closest(key, ctx.ty.fields.names()).map(String::from);
        issues.push(
            AuditIssue::new(IssueKind::UnknownField {
                field: key.clone(),
                suggestion,
            })
            .with_severity(severity),
        );
    }
}

pub(crate) fn check_ownership(ctx: &DocContext<'_>, issues: &mut Vec<AuditIssue>) {
    let Some(owner) = ctx.index.owner_of(&ctx.name) else {
        return;
    };

    // Only a note the owning field may actually hold is governed by it
    let governed = ctx
        .schema
        .ownership()
        .owned_by(&owner.owner_type)
        .iter()
        .filter(|f| f.field == owner.field)
        .flat_map(|f| f.child_types.iter())
        .any(|child| ctx.schema.is_descendant_of(&ctx.ty.name, child));
    if !governed {
        return;
    }

    let expected = owner.expected_dir(&ctx.ty.plural);
    if !ctx.doc.dir().starts_with(&expected) {
        issues.push(AuditIssue::new(IssueKind::OwnedWrongLocation {
            owner: owner.owner.clone(),
            owner_path: owner.owner_path.clone(),
            expected,
            actual: ctx.doc.dir().to_path_buf(),
        }));
    }
}

pub(crate) fn check_parent_cycle(ctx: &DocContext<'_>, issues: &mut Vec<AuditIssue>) {
    if !ctx.ty.recursive {
        return;
    }
    if let Some(cycle) = find_parent_cycle(&ctx.name, ctx.index.parents()) {
        issues.push(AuditIssue::new(IssueKind::ParentCycle { cycle }));
    }
}

/// Shape checks for date, boolean, number and list fields, and trailing whitespace
pub(crate) fn check_values(ctx: &DocContext<'_>, issues: &mut Vec<AuditIssue>) {
    for (name, field) in ctx.ty.fields.iter() {
        let Some(value) = ctx.present(name) else {
            continue;
        };

        if field.accepts_many() && !value.is_array() {
            issues.push(AuditIssue::new(IssueKind::InvalidList { field: name.to_string() }));
        }

        match field.kind() {
            FieldKind::Date => {
                for actual in scalar_strings(value) {
                    if !is_date(&actual) {
                        issues.push(AuditIssue::new(IssueKind::InvalidDate {
                            field: name.to_string(),
                            value: actual,
                        }));
                    }
                }
            }
            FieldKind::Boolean => {
                let valid = match value {
                    Value::Bool(_) => true,
                    Value::String(s) => matches!(s.trim(), "true" | "false"),
                    _ => false,
                };
                if !valid {
                    issues.push(AuditIssue::new(IssueKind::InvalidBoolean {
                        field: name.to_string(),
                        value: display_value(value),
                    }));
                }
            }
            FieldKind::Number => {
                let valid = match value {
                    Value::Number(_) => true,
                    Value::String(s) => s.trim().parse::<f64>().is_ok(),
                    _ => false,
                };
                if !valid {
                    issues.push(AuditIssue::new(IssueKind::InvalidNumber {
                        field: name.to_string(),
                        value: display_value(value),
                    }));
                }
            }
            _ => {}
        }

        let trailing = match value {
            Value::String(s) => s != s.trim_end(),
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .any(|s| s != s.trim_end()),
            _ => false,
        };
        if trailing {
            issues.push(AuditIssue::new(IssueKind::TrailingWhitespace { field: name.to_string() }));
        }
    }
}

fn is_date(value: &str) -> bool {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").is_ok()
        || NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M").is_ok()
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
