//! Schema Resolver
//!
//! Turns a [`RawSchema`] into a [`ResolvedSchema`]: every type with its merged
//! fields, field order, storage directory and ancestor chain, plus the
//! [`OwnershipMap`].
//!
//! The extends relation is loaded into a petgraph `DiGraph` (parent → child). Cycles
//! are found with Kosaraju SCCs before anything is merged, and merging walks the
//! graph in topological order so a parent is always complete before its children.
//! Resolution either succeeds for every type or fails with the first structural
//! error; no partial model is ever returned.

pub mod ownership;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use petgraph::algo::{kosaraju_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::error::{Result, SchemaError};
use crate::schema::{
    pluralize, BodySection, Field, FieldMap, LinkFormat, RawSchema, RawType, SchemaSettings,
    SourceSpec, ROOT_TYPE,
};
use crate::suggest;

pub use ownership::{OwnerSlot, OwningField, OwnershipMap};

/// Name of the field linking a document of a recursive type to its parent document
pub const PARENT_FIELD: &str = "parent";

/// Index of a type in the resolved arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(usize);

impl TypeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A type after inheritance merging
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedType {
    pub name: String,
    /// `None` only for the implicit root
    pub parent: Option<String>,
    /// Direct children, sorted by name
    pub children: Vec<String>,
    /// Merged fields; a descendant's declaration replaces its ancestor's
    pub fields: FieldMap,
    pub field_order: Vec<String>,
    pub body_sections: Vec<BodySection>,
    pub recursive: bool,
    /// Vault-relative directory new documents of this type go to
    pub output_dir: String,
    pub filename: Option<String>,
    pub plural: String,
    /// Parent first, root last
    pub ancestors: Vec<String>,
}

impl ResolvedType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Fields in resolved order
    pub fn ordered_fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.field_order
            .iter()
            .filter_map(move |name| self.fields.get(name).map(|f| (name.as_str(), f)))
    }
}

/// Result of a fuzzy type search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMatch {
    pub name: String,
    pub score: i64,
}

/// The fully merged, read-only type model
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSchema {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    /// Arena: root first, then declared types by name
    types: Vec<ResolvedType>,
    #[serde(skip)]
    by_name: HashMap<String, TypeId>,
    enums: BTreeMap<String, Vec<String>>,
    settings: SchemaSettings,
    ownership: OwnershipMap,
}

impl ResolvedSchema {
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn id(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn type_at(&self, id: TypeId) -> &ResolvedType {
        &self.types[id.0]
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedType> {
        self.id(name).map(|id| self.type_at(id))
    }

    /// Look up a type, failing with [`SchemaError::TypeNotFound`]
    pub fn require(&self, name: &str) -> Result<&ResolvedType> {
        self.get(name)
            .ok_or_else(|| SchemaError::TypeNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn root(&self) -> &ResolvedType {
        &self.types[0]
    }

    /// All types including the root, root first then by name
    pub fn types(&self) -> impl Iterator<Item = &ResolvedType> {
        self.types.iter()
    }

    /// Names of all types including the root
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.iter().map(|t| t.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn settings(&self) -> &SchemaSettings {
        &self.settings
    }

    pub fn link_format(&self) -> LinkFormat {
        self.settings.link_format
    }

    pub fn ownership(&self) -> &OwnershipMap {
        &self.ownership
    }

    pub fn enum_values(&self, name: &str) -> Option<&[String]> {
        self.enums.get(name).map(Vec::as_slice)
    }

    /// True when `name` is `ancestor` or inherits from it
    pub fn is_descendant_of(&self, name: &str, ancestor: &str) -> bool {
        if name == ancestor {
            return self.contains(name);
        }
        self.get(name)
            .map(|t| t.ancestors.iter().any(|a| a == ancestor))
            .unwrap_or(false)
    }

    /// All transitive descendants of a type, sorted by name
    pub fn descendants(&self, name: &str) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .types
            .iter()
            .filter(|t| t.ancestors.iter().any(|a| a == name))
            .map(|t| t.name.as_str())
            .collect();
        out.sort_unstable();
        out
    }

    /// Allowed values of a field: inline options, else the referenced enum
    pub fn options_for<'a>(&'a self, field: &'a Field) -> Option<&'a [String]> {
        if !field.options.is_empty() {
            return Some(&field.options);
        }
        field.enum_ref.as_deref().and_then(|e| self.enum_values(e))
    }

    /// Nearest type name by bounded edit distance
    pub fn suggest_type(&self, value: &str) -> Option<&str> {
        suggest::closest(value, self.type_names())
    }

    /// Fuzzy search over type names, best first
    pub fn search_types(&self, query: &str, limit: usize) -> Vec<TypeMatch> {
        let matcher = SkimMatcherV2::default();
        let mut results: Vec<TypeMatch> = self
            .types
            .iter()
            .filter_map(|t| {
                matcher.fuzzy_match(&t.name, query).map(|score| TypeMatch {
                    name: t.name.clone(),
                    score,
                })
            })
            .collect();
        results.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
        results.truncate(limit);
        results
    }
}

/// Resolve a raw schema into the merged type model
pub fn resolve(raw: &RawSchema) -> Result<ResolvedSchema> {
    let root_decl = raw.types.get(ROOT_TYPE).cloned().unwrap_or_default();
    if let Some(parent) = &root_decl.extends {
        return Err(SchemaError::UnknownParent {
            type_name: ROOT_TYPE.to_string(),
            parent: parent.clone(),
        });
    }

    let declared: BTreeMap<&str, &RawType> = raw
        .types
        .iter()
        .filter(|(name, _)| name.as_str() != ROOT_TYPE)
        .map(|(name, t)| (name.as_str(), t))
        .collect();

    // Extends graph, parent -> child
    let mut graph: DiGraph<&str, ()> = DiGraph::with_capacity(declared.len() + 1, declared.len());
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::with_capacity(declared.len() + 1);
    nodes.insert(ROOT_TYPE, graph.add_node(ROOT_TYPE));
    for &name in declared.keys() {
        nodes.insert(name, graph.add_node(name));
    }
    for (&name, decl) in &declared {
        let parent = decl.parent_name();
        let Some(&parent_idx) = nodes.get(parent) else {
            return Err(SchemaError::UnknownParent {
                type_name: name.to_string(),
                parent: parent.to_string(),
            });
        };
        graph.add_edge(parent_idx, nodes[name], ());
    }

    check_cycles(&graph, &declared)?;
    validate_fields(raw)?;

    let order = toposort(&graph, None).map_err(|cycle| SchemaError::ExtendsCycle {
        cycle: vec![graph[cycle.node_id()].to_string()],
    })?;

    let mut resolved: HashMap<&str, ResolvedType> = HashMap::with_capacity(order.len());
    for idx in order {
        let name = graph[idx];
        let ty = if name == ROOT_TYPE {
            resolve_root(&root_decl)
        } else {
            let decl = declared[name];
            let parent = &resolved[decl.parent_name()];
            resolve_child(name, decl, parent)
        };
        resolved.insert(name, ty);
    }

    // Children lists, then the arena: root first, then by name
    let mut children: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, decl) in &declared {
        children
            .entry(decl.parent_name().to_string())
            .or_default()
            .push(name.to_string());
    }

    let mut types = Vec::with_capacity(resolved.len());
    let mut by_name = HashMap::with_capacity(resolved.len());
    let names = std::iter::once(ROOT_TYPE).chain(declared.keys().copied());
    for name in names {
        let Some(mut ty) = resolved.remove(name) else {
            continue;
        };
        ty.children = children.remove(name).unwrap_or_default();
        ty.children.sort();
        by_name.insert(ty.name.clone(), TypeId(types.len()));
        types.push(ty);
    }

    let ownership = OwnershipMap::build(&types);
    for (child, owners) in ownership.by_child() {
        if owners.len() > 1 {
            warn!(child = %child, owners = owners.len(), "type has more than one potential owner");
        }
    }

    debug!(types = types.len(), enums = raw.enums.len(), "schema resolved");

    Ok(ResolvedSchema {
        version: raw.version.clone(),
        types,
        by_name,
        enums: raw.enums.clone(),
        settings: raw.config.clone(),
        ownership,
    })
}

/// Reject extends cycles, naming the cycle in extends order
fn check_cycles(graph: &DiGraph<&str, ()>, declared: &BTreeMap<&str, &RawType>) -> Result<()> {
    let mut cycles: Vec<Vec<String>> = Vec::new();
    for scc in kosaraju_scc(graph) {
        let is_cycle = scc.len() > 1 || graph.contains_edge(scc[0], scc[0]);
        if !is_cycle {
            continue;
        }
        let Some(start) = scc.iter().map(|idx| graph[*idx]).min() else {
            continue;
        };

        // Follow extends pointers from the smallest member until it comes back
        let mut cycle = vec![start.to_string()];
        let mut current = start;
        while let Some(decl) = declared.get(current) {
            current = decl.parent_name();
            cycle.push(current.to_string());
            if current == start || cycle.len() > scc.len() + 1 {
                break;
            }
        }
        cycles.push(cycle);
    }

    cycles.sort();
    match cycles.into_iter().next() {
        Some(cycle) => Err(SchemaError::ExtendsCycle { cycle }),
        None => Ok(()),
    }
}

/// Cross-reference checks on every declared field
fn validate_fields(raw: &RawSchema) -> Result<()> {
    let type_exists = |name: &str| name == ROOT_TYPE || raw.types.contains_key(name);

    for (type_name, decl) in &raw.types {
        for (field_name, field) in decl.fields.iter() {
            if let Some(source) = &field.source {
                for source_type in source.types() {
                    if !type_exists(source_type) {
                        return Err(SchemaError::UnknownSourceType {
                            type_name: type_name.clone(),
                            field: field_name.to_string(),
                            source_type: source_type.to_string(),
                        });
                    }
                }
            }

            if field.owned {
                let concrete = field
                    .source
                    .as_ref()
                    .map(|s| !s.is_any() && !s.types().is_empty())
                    .unwrap_or(false);
                if !concrete {
                    return Err(SchemaError::OwnedWithoutSource {
                        type_name: type_name.clone(),
                        field: field_name.to_string(),
                    });
                }
            }

            if let Some(enum_name) = &field.enum_ref {
                if !raw.enums.contains_key(enum_name) {
                    return Err(SchemaError::UnknownEnum {
                        type_name: type_name.clone(),
                        field: field_name.to_string(),
                        enum_name: enum_name.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn resolve_root(decl: &RawType) -> ResolvedType {
    let field_order = decl
        .field_order
        .clone()
        .unwrap_or_else(|| decl.fields.names().map(String::from).collect());
    ResolvedType {
        name: ROOT_TYPE.to_string(),
        parent: None,
        children: Vec::new(),
        fields: decl.fields.clone(),
        field_order,
        body_sections: decl.body_sections.clone(),
        recursive: decl.recursive,
        output_dir: decl.output_dir.clone().map(normalize_dir).unwrap_or_default(),
        filename: decl.filename.clone(),
        plural: decl.plural.clone().unwrap_or_else(|| pluralize(ROOT_TYPE)),
        ancestors: Vec::new(),
    }
}

fn resolve_child(name: &str, decl: &RawType, parent: &ResolvedType) -> ResolvedType {
    let mut ancestors = Vec::with_capacity(parent.ancestors.len() + 1);
    ancestors.push(parent.name.clone());
    ancestors.extend(parent.ancestors.iter().cloned());

    // Own declarations replace inherited ones in place; new fields append
    let mut fields = parent.fields.clone();
    for (field_name, field) in decl.fields.iter() {
        fields.insert(field_name, field.clone());
    }

    let mut implicit_parent = false;
    if decl.recursive && !fields.contains(PARENT_FIELD) {
        fields.insert(
            PARENT_FIELD,
            Field::relation(SourceSpec::One(name.to_string())),
        );
        implicit_parent = true;
    }

    let field_order = match &decl.field_order {
        Some(explicit) => {
            for listed in explicit {
                if !fields.contains(listed) {
                    warn!(type_name = %name, field = %listed, "field order names a field the type does not have");
                }
            }
            explicit.clone()
        }
        None => {
            let mut order = parent.field_order.clone();
            let own = decl.fields.names().map(String::from);
            let implicit = implicit_parent.then(|| PARENT_FIELD.to_string());
            for field_name in own.chain(implicit) {
                if !order.contains(&field_name) {
                    order.push(field_name);
                }
            }
            order
        }
    };

    let plural = decl.plural.clone().unwrap_or_else(|| pluralize(name));
    let output_dir = match &decl.output_dir {
        Some(dir) => normalize_dir(dir.clone()),
        None if parent.is_root() || parent.output_dir.is_empty() => plural.clone(),
        None => format!("{}/{}", parent.output_dir, plural),
    };

    let body_sections = if decl.body_sections.is_empty() {
        parent.body_sections.clone()
    } else {
        decl.body_sections.clone()
    };

    ResolvedType {
        name: name.to_string(),
        parent: Some(parent.name.clone()),
        children: Vec::new(),
        fields,
        field_order,
        body_sections,
        recursive: decl.recursive,
        output_dir,
        filename: decl.filename.clone().or_else(|| parent.filename.clone()),
        plural,
        ancestors,
    }
}

fn normalize_dir(dir: String) -> String {
    dir.trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;
    use serde_json::json;

    fn schema(value: serde_json::Value) -> RawSchema {
        serde_json::from_value(value).unwrap()
    }

    fn sample() -> RawSchema {
        schema(json!({
            "enums": {"status": ["raw", "backlog", "done"]},
            "types": {
                "meta": {"fields": {"created": {"prompt": "date"}}},
                "objective": {
                    "fields": {
                        "status": {"prompt": "select", "enum": "status", "default": "raw"},
                        "summary": {"prompt": "text"}
                    }
                },
                "task": {
                    "extends": "objective",
                    "fields": {
                        "status": {"prompt": "select", "enum": "status", "required": true},
                        "due": {"prompt": "date"}
                    }
                },
                "project": {
                    "fields": {
                        "research": {"prompt": "relation", "source": "research", "owned": true, "multiple": true}
                    }
                },
                "research": {"plural": "research"},
                "idea": {"recursive": true, "output_dir": "/Ideas/"}
            }
        }))
    }

    #[test]
    fn test_ancestor_chain_parent_first() {
        let resolved = resolve(&sample()).unwrap();
        let task = resolved.get("task").unwrap();
        assert_eq!(task.ancestors, vec!["objective", "meta"]);
        assert_eq!(task.parent.as_deref(), Some("objective"));
        assert!(resolved.root().is_root());
        assert_eq!(resolved.root().children, vec!["idea", "objective", "project", "research"]);
    }

    #[test]
    fn test_fields_superset_of_parent() {
        let resolved = resolve(&sample()).unwrap();
        for ty in resolved.types() {
            let Some(parent) = ty.parent.as_deref().and_then(|p| resolved.get(p)) else {
                continue;
            };
            for name in parent.fields.names() {
                assert!(ty.fields.contains(name), "{} lost {}", ty.name, name);
            }
        }
        let task = resolved.get("task").unwrap();
        let status = task.field("status").unwrap();
        assert!(status.required);
        assert!(status.default.is_none());
    }

    #[test]
    fn test_field_order_inherited_then_own() {
        let resolved = resolve(&sample()).unwrap();
        let task = resolved.get("task").unwrap();
        assert_eq!(task.field_order, vec!["created", "status", "summary", "due"]);
    }

    #[test]
    fn test_explicit_field_order_trusted() {
        let raw = schema(json!({"types": {
            "note": {"fields": {"a": {}, "b": {}}, "field_order": ["b", "a"]}
        }}));
        let resolved = resolve(&raw).unwrap();
        assert_eq!(resolved.get("note").unwrap().field_order, vec!["b", "a"]);
    }

    #[test]
    fn test_output_dirs() {
        let resolved = resolve(&sample()).unwrap();
        assert_eq!(resolved.get("objective").unwrap().output_dir, "objectives");
        assert_eq!(resolved.get("task").unwrap().output_dir, "objectives/tasks");
        assert_eq!(resolved.get("research").unwrap().output_dir, "research");
        assert_eq!(resolved.get("idea").unwrap().output_dir, "Ideas");
    }

    #[test]
    fn test_recursive_type_gets_parent_field() {
        let resolved = resolve(&sample()).unwrap();
        let idea = resolved.get("idea").unwrap();
        let parent = idea.field(PARENT_FIELD).unwrap();
        assert_eq!(parent.kind(), FieldKind::Relation);
        assert_eq!(parent.source, Some(SourceSpec::One("idea".into())));
        assert!(idea.field_order.contains(&PARENT_FIELD.to_string()));
    }

    #[test]
    fn test_extends_cycle_rejected() {
        let raw = schema(json!({"types": {
            "a": {"extends": "b"},
            "b": {"extends": "a"}
        }}));
        match resolve(&raw) {
            Err(SchemaError::ExtendsCycle { cycle }) => assert_eq!(cycle, vec!["a", "b", "a"]),
            other => panic!("expected cycle error, got {:?}", other),
        }
    }

    #[test]
    fn test_self_extends_rejected() {
        let raw = schema(json!({"types": {"a": {"extends": "a"}}}));
        assert!(matches!(resolve(&raw), Err(SchemaError::ExtendsCycle { .. })));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let raw = schema(json!({"types": {"task": {"extends": "objectiv"}}}));
        let err = resolve(&raw).unwrap_err();
        assert!(matches!(err, SchemaError::UnknownParent { .. }));
        assert_eq!(err.type_name(), Some("task"));
    }

    #[test]
    fn test_unknown_source_rejected() {
        let raw = schema(json!({"types": {
            "task": {"fields": {"milestone": {"prompt": "relation", "source": "milestone"}}}
        }}));
        assert!(matches!(resolve(&raw), Err(SchemaError::UnknownSourceType { .. })));
    }

    #[test]
    fn test_owned_without_source_rejected() {
        let raw = schema(json!({"types": {
            "project": {"fields": {"notes": {"prompt": "relation", "owned": true}}}
        }}));
        assert!(matches!(resolve(&raw), Err(SchemaError::OwnedWithoutSource { .. })));

        let any = schema(json!({"types": {
            "project": {"fields": {"notes": {"prompt": "relation", "source": "any", "owned": true}}}
        }}));
        assert!(matches!(resolve(&any), Err(SchemaError::OwnedWithoutSource { .. })));
    }

    #[test]
    fn test_unknown_enum_rejected() {
        let raw = schema(json!({"types": {
            "task": {"fields": {"status": {"prompt": "select", "enum": "nope"}}}
        }}));
        assert!(matches!(resolve(&raw), Err(SchemaError::UnknownEnum { .. })));
    }

    #[test]
    fn test_resolution_is_pure() {
        let raw = sample();
        let first = resolve(&raw).unwrap();
        let second = resolve(&raw).unwrap();
        assert_eq!(first.get("task"), second.get("task"));
        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }

    #[test]
    fn test_descendant_queries() {
        let resolved = resolve(&sample()).unwrap();
        assert!(resolved.is_descendant_of("task", "objective"));
        assert!(resolved.is_descendant_of("task", "task"));
        assert!(!resolved.is_descendant_of("objective", "task"));
        assert_eq!(resolved.descendants("objective"), vec!["task"]);
    }

    #[test]
    fn test_options_and_suggestions() {
        let resolved = resolve(&sample()).unwrap();
        let status = resolved.get("task").unwrap().field("status").unwrap();
        assert_eq!(resolved.options_for(status).unwrap().len(), 3);
        assert_eq!(resolved.suggest_type("tsk"), Some("task"));
        let hits = resolved.search_types("obj", 3);
        assert_eq!(hits[0].name, "objective");
    }
}
