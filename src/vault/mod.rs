//! Vault documents and vault-wide indices
//!
//! The audit engine never touches the filesystem. It sees each document as a
//! vault-relative path plus parsed frontmatter, and answers cross-document questions
//! from a [`VaultIndex`] that is built completely before the first check runs.

pub mod discovery;
pub mod links;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::Result;
use crate::resolver::{ResolvedSchema, PARENT_FIELD};

pub use discovery::{discover, split_frontmatter, DiscoveryOptions};
pub use links::{LinkRef, LinkSyntax};

/// One markdown document as seen by the audit engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Vault-relative path, including the `.md` extension
    pub path: PathBuf,
    #[serde(default)]
    pub frontmatter: Map<String, Value>,
    /// Set when the frontmatter could not be parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_error: Option<String>,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>, frontmatter: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            frontmatter,
            parse_error: None,
        }
    }

    /// A document whose frontmatter failed to parse
    pub fn unparsable(path: impl Into<PathBuf>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            frontmatter: Map::new(),
            parse_error: Some(error.into()),
        }
    }

    /// Build from a JSON object; non-objects give an empty frontmatter
    pub fn from_json(path: impl Into<PathBuf>, frontmatter: Value) -> Self {
        match frontmatter {
            Value::Object(map) => Self::new(path, map),
            _ => Self::new(path, Map::new()),
        }
    }

    /// Note name: the file stem
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Directory containing the document
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Path without extension, `/`-separated
    pub fn link_path(&self) -> String {
        slash_path(&self.path.with_extension(""))
    }

    /// Value of the type discriminator, if it is a string
    pub fn type_name(&self, discriminator: &str) -> Option<&str> {
        self.frontmatter.get(discriminator).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.frontmatter.get(key)
    }
}

/// Render a path with forward slashes
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Who owns an owned note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRecord {
    /// Owner note name
    pub owner: String,
    pub owner_path: PathBuf,
    pub owner_type: String,
    /// Owning field on the owner
    pub field: String,
}

impl OwnerRecord {
    /// Folder owned notes are colocated in.
    ///
    /// A folder note (`projects/Alpha/Alpha.md`) owns its own folder; a plain note
    /// (`projects/Alpha.md`) owns a sibling folder named after it.
    pub fn owner_folder(&self) -> PathBuf {
        let parent = self.owner_path.parent().unwrap_or_else(|| Path::new(""));
        let is_folder_note = parent
            .file_name()
            .map(|n| n.to_string_lossy() == self.owner)
            .unwrap_or(false);
        if is_folder_note {
            parent.to_path_buf()
        } else {
            parent.join(&self.owner)
        }
    }

    /// Directory an owned note of the given plural type name belongs in
    pub fn expected_dir(&self, child_plural: &str) -> PathBuf {
        self.owner_folder().join(child_plural)
    }
}

/// Vault-wide lookups shared by every document check
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultIndex {
    /// Note name → path
    names: BTreeMap<String, PathBuf>,
    /// `/`-separated paths without extension
    paths: BTreeSet<String>,
    /// Note name → type name
    types: BTreeMap<String, String>,
    /// Owned note name → owner
    ownership: BTreeMap<String, OwnerRecord>,
    /// Note name → parent note name, recursive types only
    parents: BTreeMap<String, String>,
}

impl VaultIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every index from the full document set
    pub fn build(schema: &ResolvedSchema, documents: &[Document], discriminator: &str) -> Result<Self> {
        let syntax = LinkSyntax::new()?;
        let mut sorted: Vec<&Document> = documents.iter().collect();
        sorted.sort_by(|a, b| a.path.cmp(&b.path));

        let mut index = Self::new();
        for doc in &sorted {
            index.add_note(doc.name(), doc.path.clone(), doc.type_name(discriminator));
        }

        for doc in &sorted {
            let Some(type_name) = doc.type_name(discriminator) else {
                continue;
            };
            let Some(ty) = schema.get(type_name) else {
                continue;
            };
            let name = doc.name();

            for owning in schema.ownership().owned_by(type_name) {
                let Some(value) = doc.get(&owning.field) else {
                    continue;
                };
                for (_, link) in syntax.parse_value(value) {
                    let fits = index
                        .type_of(link.note_name())
                        .map(|t| owning.child_types.iter().any(|c| schema.is_descendant_of(t, c)))
                        .unwrap_or(false);
                    if !fits {
                        continue;
                    }
                    let record = OwnerRecord {
                        owner: name.clone(),
                        owner_path: doc.path.clone(),
                        owner_type: type_name.to_string(),
                        field: owning.field.clone(),
                    };
                    index.record_owner(link.note_name(), record);
                }
            }

            if ty.recursive {
                let parent = doc
                    .get(PARENT_FIELD)
                    .map(|v| syntax.parse_value(v))
                    .and_then(|links| links.into_iter().next());
                if let Some((_, link)) = parent {
                    index.set_parent(name.clone(), link.note_name());
                }
            }
        }

        debug!(
            notes = index.names.len(),
            owned = index.ownership.len(),
            parents = index.parents.len(),
            "vault index built"
        );
        Ok(index)
    }

    /// Register a note; the first path registered for a name wins
    pub fn add_note(&mut self, name: impl Into<String>, path: impl Into<PathBuf>, type_name: Option<&str>) {
        let name = name.into();
        let path = path.into();
        self.paths.insert(slash_path(&path.with_extension("")));
        if let Some(t) = type_name {
            self.types.entry(name.clone()).or_insert_with(|| t.to_string());
        }
        self.names.entry(name).or_insert(path);
    }

    /// Record an owner; a second owner for the same note is ignored
    pub fn record_owner(&mut self, owned: impl Into<String>, record: OwnerRecord) {
        let owned = owned.into();
        if let Some(existing) = self.ownership.get(&owned) {
            if existing.owner != record.owner {
                warn!(
                    note = %owned,
                    owner = %existing.owner,
                    other = %record.owner,
                    "note claimed by more than one owner"
                );
            }
            return;
        }
        self.ownership.insert(owned, record);
    }

    pub fn set_parent(&mut self, child: impl Into<String>, parent: impl Into<String>) {
        self.parents.insert(child.into(), parent.into());
    }

    /// Whether a link target names a known note, by name or by path
    pub fn contains(&self, target: &str) -> bool {
        self.names.contains_key(target) || self.paths.contains(target.trim_start_matches('/'))
    }

    pub fn path_of(&self, name: &str) -> Option<&Path> {
        self.names.get(name).map(PathBuf::as_path)
    }

    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.types.get(name).map(String::as_str)
    }

    pub fn owner_of(&self, name: &str) -> Option<&OwnerRecord> {
        self.ownership.get(name)
    }

    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.parents.get(name).map(String::as_str)
    }

    pub fn parents(&self) -> &BTreeMap<String, String> {
        &self.parents
    }

    /// All note names, sorted
    pub fn note_names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve;
    use crate::schema::RawSchema;
    use serde_json::json;

    fn schema() -> ResolvedSchema {
        let raw: RawSchema = serde_json::from_value(json!({"types": {
            "project": {"fields": {
                "research": {"prompt": "relation", "source": "research", "owned": true, "multiple": true}
            }},
            "research": {"plural": "research"},
            "idea": {"recursive": true}
        }}))
        .unwrap();
        resolve(&raw).unwrap()
    }

    #[test]
    fn test_build_indices() {
        let docs = vec![
            Document::from_json("projects/Alpha/Alpha.md", json!({"type": "project", "research": ["[[Findings]]"]})),
            Document::from_json("projects/Alpha/research/Findings.md", json!({"type": "research"})),
            Document::from_json("ideas/Seed.md", json!({"type": "idea", "parent": "[[Tree]]"})),
            Document::from_json("ideas/Tree.md", json!({"type": "idea"})),
        ];
        let index = VaultIndex::build(&schema(), &docs, "type").unwrap();

        assert_eq!(index.len(), 4);
        assert_eq!(index.type_of("Findings"), Some("research"));
        assert!(index.contains("Alpha"));
        assert!(index.contains("projects/Alpha/Alpha"));
        assert!(!index.contains("Nope"));

        let owner = index.owner_of("Findings").unwrap();
        assert_eq!(owner.owner, "Alpha");
        assert_eq!(owner.field, "research");
        assert_eq!(index.parent_of("Seed"), Some("Tree"));
        assert_eq!(index.parent_of("Tree"), None);
    }

    #[test]
    fn test_ownership_requires_source_type() {
        let docs = vec![
            Document::from_json("projects/Alpha.md", json!({"type": "project", "research": ["[[Ship]]", "[[Ghost]]"]})),
            Document::from_json("wrong/place/Ship.md", json!({"type": "idea"})),
        ];
        let index = VaultIndex::build(&schema(), &docs, "type").unwrap();

        assert!(index.owner_of("Ship").is_none());
        assert!(index.owner_of("Ghost").is_none());
    }

    #[test]
    fn test_owner_folder() {
        let folder_note = OwnerRecord {
            owner: "Alpha".into(),
            owner_path: "projects/Alpha/Alpha.md".into(),
            owner_type: "project".into(),
            field: "research".into(),
        };
        assert_eq!(folder_note.expected_dir("research"), PathBuf::from("projects/Alpha/research"));

        let plain = OwnerRecord { owner_path: "projects/Alpha.md".into(), ..folder_note };
        assert_eq!(plain.expected_dir("research"), PathBuf::from("projects/Alpha/research"));
    }

    #[test]
    fn test_document_accessors() {
        let doc = Document::from_json("objectives/tasks/Ship it.md", json!({"type": "task"}));
        assert_eq!(doc.name(), "Ship it");
        assert_eq!(doc.dir(), Path::new("objectives/tasks"));
        assert_eq!(doc.link_path(), "objectives/tasks/Ship it");
        assert_eq!(doc.type_name("type"), Some("task"));
    }
}
