//! Migration Diff
//!
//! Compares two raw schema snapshots and classifies every change. Additive changes
//! (new types, fields, enum values, options, a new link format) have a total rewrite
//! rule and are deterministic; anything that removes previously valid data needs a
//! human decision.
//!
//! Field diffs are structural: they look at each type's own declared fields, not
//! the merged ones, so a field moved from a child to its parent shows up as a
//! removal and an addition. Re-parenting a type is reported on its own, with the
//! inherited fields it loses. Options are compared by their effective values, so
//! pointing a field at a different enum counts. Both snapshots must still resolve.

pub mod plan;

use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::error::Result;
use crate::resolver::{resolve, ResolvedSchema};
use crate::schema::{RawSchema, RawType};
use crate::suggest::bounded_edit_distance;
use crate::version::{SchemaVersion, VersionBump};

pub use plan::{MigrationOp, MigrationPlan};

/// Largest edit distance between a removed and an added field still reported as a
/// possible rename
pub const RENAME_DISTANCE: usize = 2;

/// Version assumed for a snapshot that does not declare one
pub const INITIAL_VERSION: &str = "0.0.0";

/// Diff two snapshots under explicit version strings.
///
/// Fails only when one of the snapshots does not resolve.
pub fn diff(old: &RawSchema, new: &RawSchema, from_version: &str, to_version: &str) -> Result<MigrationPlan> {
    let old_resolved = resolve(old)?;
    let new_resolved = resolve(new)?;

    let mut ops = Vec::new();
    diff_types(old, new, &mut ops);
    diff_fields(old, new, &mut ops);
    diff_extends(old, new, &old_resolved, &new_resolved, &mut ops);
    diff_enums(old, new, &mut ops);
    diff_field_options(old, new, &old_resolved, &new_resolved, &mut ops);
    if old.config.link_format != new.config.link_format {
        ops.push(MigrationOp::ChangeLinkFormat {
            from: old.config.link_format,
            to: new.config.link_format,
        });
    }

    let (deterministic, non_deterministic): (Vec<_>, Vec<_>) =
        ops.into_iter().partition(MigrationOp::is_deterministic);

    let suggested_bump = if !non_deterministic.is_empty() {
        VersionBump::Major
    } else if !deterministic.is_empty() {
        VersionBump::Minor
    } else {
        VersionBump::None
    };

    let suggested_version = match SchemaVersion::parse(from_version) {
        Ok(version) => Some(version.bump(suggested_bump).version_string()),
        Err(e) => {
            warn!(version = %from_version, error = %e, "source version is not semver");
            None
        }
    };

    let plan = MigrationPlan {
        from_version: from_version.to_string(),
        to_version: to_version.to_string(),
        has_changes: !deterministic.is_empty() || !non_deterministic.is_empty(),
        deterministic,
        non_deterministic,
        suggested_bump,
        suggested_version,
        from_checksum: old.checksum()?,
        to_checksum: new.checksum()?,
    };

    info!(
        from = %plan.from_version,
        to = %plan.to_version,
        deterministic = plan.deterministic.len(),
        non_deterministic = plan.non_deterministic.len(),
        bump = %plan.suggested_bump,
        "migration plan computed"
    );
    Ok(plan)
}

/// Diff two snapshots using the versions they declare themselves
pub fn diff_snapshots(old: &RawSchema, new: &RawSchema) -> Result<MigrationPlan> {
    let from = old.version.as_deref().unwrap_or(INITIAL_VERSION);
    let to = new.version.as_deref().unwrap_or(from);
    diff(old, new, from, to)
}

fn diff_types(old: &RawSchema, new: &RawSchema, ops: &mut Vec<MigrationOp>) {
    for (name, ty) in &new.types {
        if !old.types.contains_key(name) {
            ops.push(MigrationOp::AddType {
                type_name: name.clone(),
                extends: ty.extends.clone(),
            });
        }
    }
    for name in old.types.keys() {
        if !new.types.contains_key(name) {
            ops.push(MigrationOp::RemoveType { type_name: name.clone() });
        }
    }
}

fn common_types<'a>(old: &'a RawSchema, new: &'a RawSchema) -> impl Iterator<Item = (&'a str, &'a RawType, &'a RawType)> {
    old.types.iter().filter_map(move |(name, old_ty)| {
        new.types
            .get(name)
            .map(|new_ty| (name.as_str(), old_ty, new_ty))
    })
}

fn diff_fields(old: &RawSchema, new: &RawSchema, ops: &mut Vec<MigrationOp>) {
    for (type_name, old_ty, new_ty) in common_types(old, new) {
        let added: Vec<&str> = new_ty
            .fields
            .names()
            .filter(|f| !old_ty.fields.contains(f))
            .collect();
        let removed: Vec<&str> = old_ty
            .fields
            .names()
            .filter(|f| !new_ty.fields.contains(f))
            .collect();

        for field in &added {
            let default = new_ty
                .fields
                .get(field)
                .and_then(|f| f.default.clone().or_else(|| f.value.clone()));
            ops.push(MigrationOp::AddField {
                type_name: type_name.to_string(),
                field: field.to_string(),
                default,
            });
        }

        for field in &removed {
            ops.push(MigrationOp::RemoveField {
                type_name: type_name.to_string(),
                field: field.to_string(),
                possible_rename: possible_rename(field, &added),
            });
        }
    }
}

/// Closest added field within [`RENAME_DISTANCE`]; ties go to declaration order
fn possible_rename(removed: &str, added: &[&str]) -> Option<String> {
    let mut best: Option<(usize, &str)> = None;
    for &candidate in added {
        let Some(d) = bounded_edit_distance(removed, candidate, RENAME_DISTANCE) else {
            continue;
        };
        if best.map(|(bd, _)| d < bd).unwrap_or(true) {
            best = Some((d, candidate));
        }
    }
    best.map(|(_, name)| name.to_string())
}

fn diff_extends(
    old: &RawSchema,
    new: &RawSchema,
    old_resolved: &ResolvedSchema,
    new_resolved: &ResolvedSchema,
    ops: &mut Vec<MigrationOp>,
) {
    for (type_name, old_ty, new_ty) in common_types(old, new) {
        if old_ty.parent_name() == new_ty.parent_name() {
            continue;
        }
        let (Some(before), Some(after)) = (old_resolved.get(type_name), new_resolved.get(type_name)) else {
            continue;
        };
        // Own fields that went away are already reported as removals
        let mut dropped_fields: Vec<String> = before
            .fields
            .names()
            .filter(|f| !after.fields.contains(f) && !old_ty.fields.contains(f))
            .map(String::from)
            .collect();
        dropped_fields.sort();

        ops.push(MigrationOp::ChangeExtends {
            type_name: type_name.to_string(),
            from: old_ty.parent_name().to_string(),
            to: new_ty.parent_name().to_string(),
            dropped_fields,
        });
    }
}

fn diff_enums(old: &RawSchema, new: &RawSchema, ops: &mut Vec<MigrationOp>) {
    let names: BTreeSet<&String> = old.enums.keys().chain(new.enums.keys()).collect();
    let empty: Vec<String> = Vec::new();

    for name in names {
        let before = old.enums.get(name).unwrap_or(&empty);
        let after = new.enums.get(name).unwrap_or(&empty);
        for value in after.iter().filter(|v| !before.contains(v)) {
            ops.push(MigrationOp::AddEnumValue {
                enum_name: name.clone(),
                value: value.clone(),
            });
        }
        for value in before.iter().filter(|v| !after.contains(v)) {
            ops.push(MigrationOp::RemoveEnumValue {
                enum_name: name.clone(),
                value: value.clone(),
            });
        }
    }
}

fn diff_field_options(
    old: &RawSchema,
    new: &RawSchema,
    old_resolved: &ResolvedSchema,
    new_resolved: &ResolvedSchema,
    ops: &mut Vec<MigrationOp>,
) {
    for (type_name, old_ty, new_ty) in common_types(old, new) {
        for (field_name, old_field) in old_ty.fields.iter() {
            let Some(new_field) = new_ty.fields.get(field_name) else {
                continue;
            };
            // Same enum on both sides: value changes are reported on the enum
            if old_field.options.is_empty() && new_field.options.is_empty() && old_field.enum_ref == new_field.enum_ref {
                continue;
            }
            let before = old_resolved.options_for(old_field).unwrap_or(&[]);
            let after = new_resolved.options_for(new_field).unwrap_or(&[]);

            for value in after.iter().filter(|v| !before.contains(v)) {
                ops.push(MigrationOp::AddFieldOption {
                    type_name: type_name.to_string(),
                    field: field_name.to_string(),
                    value: value.clone(),
                });
            }
            for value in before.iter().filter(|v| !after.contains(v)) {
                ops.push(MigrationOp::RemoveFieldOption {
                    type_name: type_name.to_string(),
                    field: field_name.to_string(),
                    value: value.clone(),
                });
            }
        }
    }
}
