//! Ownership map
//!
//! An owned relation field declares that the documents it points at live inside
//! the owning document's folder and may only be referenced by that owner. The map
//! is purely schema-level: which types *may* own which. Whether a particular note
//! *is* owned is decided against the vault (see [`crate::vault::VaultIndex`]).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ResolvedType;

/// One way a child type can be owned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSlot {
    pub owner_type: String,
    pub field: String,
    pub multiple: bool,
}

/// A field an owner type uses to own children
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwningField {
    pub field: String,
    pub child_types: Vec<String>,
    pub multiple: bool,
}

/// Which types may own which, in both directions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnershipMap {
    by_child: BTreeMap<String, Vec<OwnerSlot>>,
    by_owner: BTreeMap<String, Vec<OwningField>>,
}

impl OwnershipMap {
    /// Scan every resolved field of every type for the `owned` marker
    pub fn build(types: &[ResolvedType]) -> Self {
        let mut map = Self::default();
        for ty in types {
            for (field_name, field) in ty.fields.iter() {
                if !field.owned {
                    continue;
                }
                let Some(source) = &field.source else {
                    continue;
                };
                let child_types: Vec<String> = source.types().into_iter().map(String::from).collect();
                for child in &child_types {
                    map.by_child.entry(child.clone()).or_default().push(OwnerSlot {
                        owner_type: ty.name.clone(),
                        field: field_name.to_string(),
                        multiple: field.multiple,
                    });
                }
                map.by_owner.entry(ty.name.clone()).or_default().push(OwningField {
                    field: field_name.to_string(),
                    child_types,
                    multiple: field.multiple,
                });
            }
        }
        map
    }

    /// Potential owners of a child type
    pub fn owners_of(&self, child_type: &str) -> &[OwnerSlot] {
        self.by_child.get(child_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fields an owner type uses to own children
    pub fn owned_by(&self, owner_type: &str) -> &[OwningField] {
        self.by_owner.get(owner_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `field` on `owner_type` is an owning field
    pub fn is_owning_field(&self, owner_type: &str, field: &str) -> bool {
        self.owned_by(owner_type).iter().any(|f| f.field == field)
    }

    pub fn is_ownable(&self, child_type: &str) -> bool {
        self.by_child.contains_key(child_type)
    }

    pub fn by_child(&self) -> impl Iterator<Item = (&str, &[OwnerSlot])> {
        self.by_child.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn by_owner(&self) -> impl Iterator<Item = (&str, &[OwningField])> {
        self.by_owner.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.by_owner.is_empty()
    }
}
