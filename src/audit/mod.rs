//! Vault Audit
//!
//! Checks every document in a vault against the resolved schema and reports what is
//! wrong with it. Data defects are never errors: each one becomes an [`AuditIssue`]
//! on the document it was found in.
//!
//! ## Pipeline
//! 1. **Type**: no frontmatter or no discriminator is an orphan; an unknown type is
//!    reported with the nearest known name and stops the remaining checks
//! 2. **Location**: the document must live under its type's storage directory
//! 3. **Fields**: required values, option membership, value shapes, unknown keys
//! 4. **Relations**: link style, stale targets, source types, self links
//! 5. **Ownership**: owned notes live with their owner and are linked only by it
//! 6. **Parents**: recursive types must not loop back on themselves
//!
//! Cross-document questions are answered by a [`VaultIndex`] built once, before any
//! document is checked.

mod checks;
pub mod cycle;
pub mod issue;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::Result;
use crate::resolver::ResolvedSchema;
use crate::schema::LinkFormat;
use crate::vault::{Document, LinkSyntax, VaultIndex};

pub use checks::is_present;
pub use cycle::find_parent_cycle;
pub use issue::{AuditIssue, IssueKind, Severity};

/// Frontmatter keys every note may carry regardless of its type
pub const NATIVE_FIELDS: &[&str] = &[
    "type",
    "tags",
    "aliases",
    "cssclasses",
    "id",
    "name",
    "created",
    "modified",
];

/// Default frontmatter key holding a document's type
pub const DEFAULT_DISCRIMINATOR: &str = "type";

// =============================================================================
// Options
// =============================================================================

/// Audit settings, passed explicitly to every run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditOptions {
    /// Unknown fields are errors instead of warnings
    pub strict: bool,
    /// Extra frontmatter keys tolerated on every type
    pub allowed_fields: BTreeSet<String>,
    /// Link style relation values must use
    pub link_format: LinkFormat,
    pub discriminator: String,
    /// Issue codes dropped from reports
    pub ignore_codes: BTreeSet<String>,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            strict: false,
            allowed_fields: BTreeSet::new(),
            link_format: LinkFormat::default(),
            discriminator: DEFAULT_DISCRIMINATOR.to_string(),
            ignore_codes: BTreeSet::new(),
        }
    }
}

impl AuditOptions {
    /// Defaults, with the link style taken from the schema's settings
    pub fn for_schema(schema: &ResolvedSchema) -> Self {
        Self {
            link_format: schema.link_format(),
            ..Self::default()
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn allow_field(mut self, field: impl Into<String>) -> Self {
        self.allowed_fields.insert(field.into());
        self
    }

    pub fn ignore_code(mut self, code: impl Into<String>) -> Self {
        self.ignore_codes.insert(code.into());
        self
    }
}

// =============================================================================
// Report
// =============================================================================

/// Issues found in one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub issues: Vec<AuditIssue>,
}

impl FileReport {
    pub fn errors(&self) -> usize {
        self.issues.iter().filter(|i| i.is_error()).count()
    }

    pub fn warnings(&self) -> usize {
        self.issues.len() - self.errors()
    }
}

/// Result of auditing a set of documents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    pub files_checked: usize,
    /// Documents with at least one issue, ordered by path
    pub files: Vec<FileReport>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.files.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.files.iter().any(|f| f.errors() > 0)
    }

    pub fn issue_count(&self) -> usize {
        self.files.iter().map(|f| f.issues.len()).sum()
    }

    pub fn error_count(&self) -> usize {
        self.files.iter().map(FileReport::errors).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.files.iter().map(FileReport::warnings).sum()
    }

    pub fn fixable_count(&self) -> usize {
        self.issues().filter(|i| i.auto_fixable).count()
    }

    /// Every issue, in report order
    pub fn issues(&self) -> impl Iterator<Item = &AuditIssue> {
        self.files.iter().flat_map(|f| f.issues.iter())
    }

    /// Issue count per code
    pub fn by_code(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for issue in self.issues() {
            *counts.entry(issue.code()).or_insert(0) += 1;
        }
        counts
    }

    pub fn file(&self, path: impl Into<PathBuf>) -> Option<&FileReport> {
        let path = path.into();
        self.files.iter().find(|f| f.path == path)
    }
}

// =============================================================================
// Auditor
// =============================================================================

/// Checks documents against a resolved schema and a prebuilt vault index
pub struct Auditor<'a> {
    schema: &'a ResolvedSchema,
    index: &'a VaultIndex,
    options: AuditOptions,
    syntax: LinkSyntax,
}

impl<'a> Auditor<'a> {
    pub fn new(schema: &'a ResolvedSchema, index: &'a VaultIndex, options: AuditOptions) -> Result<Self> {
        Ok(Self {
            schema,
            index,
            options,
            syntax: LinkSyntax::new()?,
        })
    }

    pub fn options(&self) -> &AuditOptions {
        &self.options
    }

    /// Every issue found in one document, in check order
    pub fn audit_document(&self, doc: &Document) -> Vec<AuditIssue> {
        let mut issues = Vec::new();
        self.check(doc, &mut issues);
        if !self.options.ignore_codes.is_empty() {
            issues.retain(|i| !self.options.ignore_codes.contains(i.code()));
        }
        issues
    }

    fn check(&self, doc: &Document, issues: &mut Vec<AuditIssue>) {
        if let Some(error) = &doc.parse_error {
            issues.push(AuditIssue::new(IssueKind::OrphanFile {
                reason: format!("frontmatter could not be parsed: {}", error),
            }));
            return;
        }

        let discriminator = self.options.discriminator.as_str();
        let type_name = match doc.get(discriminator) {
            None => {
                let reason = if doc.frontmatter.is_empty() {
                    "no frontmatter".to_string()
                } else {
                    format!("no '{}' field", discriminator)
                };
                issues.push(AuditIssue::new(IssueKind::OrphanFile { reason }));
                return;
            }
            Some(value) => match value.as_str().map(str::trim) {
                Some(name) if !name.is_empty() => name,
                Some(_) => {
                    issues.push(AuditIssue::new(IssueKind::OrphanFile {
                        reason: format!("empty '{}' field", discriminator),
                    }));
                    return;
                }
                None => {
                    issues.push(AuditIssue::new(IssueKind::InvalidType {
                        value: value.to_string(),
                        suggestion: None,
                    }));
                    return;
                }
            },
        };

        let Some(ty) = self.schema.get(type_name) else {
            issues.push(AuditIssue::new(IssueKind::InvalidType {
                value: type_name.to_string(),
                suggestion: self.schema.suggest_type(type_name).map(String::from),
            }));
            return;
        };

        let ctx = checks::DocContext {
            schema: self.schema,
            index: self.index,
            options: &self.options,
            syntax: &self.syntax,
            doc,
            ty,
            name: doc.name(),
        };

        checks::check_location(&ctx, issues);
        checks::check_required(&ctx, issues);
        checks::check_options(&ctx, issues);
        checks::check_relations(&ctx, issues);
        checks::check_unknown_fields(&ctx, issues);
        checks::check_ownership(&ctx, issues);
        checks::check_parent_cycle(&ctx, issues);
        checks::check_values(&ctx, issues);
    }

    /// Audit every document in parallel; the report is ordered by path
    pub fn audit_all(&self, documents: &[Document]) -> AuditReport {
        let mut files: Vec<FileReport> = documents
            .par_iter()
            .map(|doc| FileReport {
                path: doc.path.clone(),
                issues: self.audit_document(doc),
            })
            .filter(|report| !report.issues.is_empty())
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let report = AuditReport {
            files_checked: documents.len(),
            files,
        };
        info!(
            files = report.files_checked,
            errors = report.error_count(),
            warnings = report.warning_count(),
            "audit complete"
        );
        debug!(by_code = ?report.by_code(), "issue breakdown");
        report
    }
}

/// Build the index from `documents` and audit them all
pub fn audit_vault(schema: &ResolvedSchema, documents: &[Document], options: AuditOptions) -> Result<AuditReport> {
    let index = VaultIndex::build(schema, documents, &options.discriminator)?;
    let auditor = Auditor::new(schema, &index, options)?;
    Ok(auditor.audit_all(documents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::resolve;
    use crate::schema::RawSchema;
    use serde_json::{json, Value};

    fn schema() -> ResolvedSchema {
        let raw: RawSchema = serde_json::from_value(json!({
            "enums": {"status": ["raw", "backlog", "in-progress", "done"]},
            "types": {
                "meta": {"fields": {
                    "created": {"prompt": "date", "required": true}
                }},
                "objective": {"fields": {
                    "status": {"prompt": "select", "enum": "status", "default": "raw"}
                }},
                "task": {
                    "extends": "objective",
                    "fields": {
                        "status": {"prompt": "select", "enum": "status", "required": true, "default": "raw"},
                        "priority": {"prompt": "select", "options": ["low", "high"]},
                        "milestone": {"prompt": "relation", "source": "milestone"},
                        "related": {"prompt": "relation", "source": ["objective", "project"], "multiple": true},
                        "estimate": {"prompt": "number"},
                        "blocked": {"prompt": "boolean"},
                        "owner": {"prompt": "text", "required": true}
                    }
                },
                "milestone": {"extends": "objective"},
                "project": {"fields": {
                    "research": {"prompt": "relation", "source": "research", "owned": true, "multiple": true},
                    "notes": {"prompt": "relation", "source": "any", "multiple": true}
                }},
                "research": {"plural": "research"},
                "idea": {"recursive": true}
            }
        }))
        .unwrap();
        resolve(&raw).unwrap()
    }

    fn doc(path: &str, frontmatter: Value) -> Document {
        Document::from_json(path, frontmatter)
    }

    fn audit(docs: &[Document], options: AuditOptions) -> AuditReport {
        audit_vault(&schema(), docs, options).unwrap()
    }

    fn codes(report: &AuditReport, path: &str) -> Vec<&'static str> {
        report
            .file(path)
            .map(|f| f.issues.iter().map(AuditIssue::code).collect())
            .unwrap_or_default()
    }

    fn valid_task() -> Value {
        json!({
            "type": "task",
            "created": "2024-05-01",
            "status": "backlog",
            "owner": "me"
        })
    }

    #[test]
    fn test_clean_document_has_no_issues() {
        let report = audit(&[doc("objectives/tasks/Ship.md", valid_task())], AuditOptions::default());
        assert!(report.is_clean(), "{:?}", report);
        assert_eq!(report.files_checked, 1);
    }

    #[test]
    fn test_orphan_and_invalid_type_short_circuit() {
        let docs = vec![
            doc("inbox/Loose.md", json!({})),
            doc("inbox/Typo.md", json!({"type": "tsak", "bogus": 1})),
            Document::unparsable("inbox/Broken.md", "bad yaml"),
        ];
        let report = audit(&docs, AuditOptions::default());
        assert_eq!(codes(&report, "inbox/Loose.md"), vec!["orphan-file"]);
        assert_eq!(codes(&report, "inbox/Broken.md"), vec!["orphan-file"]);

        let typo = &report.file("inbox/Typo.md").unwrap().issues;
        assert_eq!(typo.len(), 1);
        assert_eq!(typo[0].kind.suggestion(), Some("task"));
    }

    #[test]
    fn test_wrong_directory() {
        let report = audit(&[doc("tasks/Ship.md", valid_task())], AuditOptions::default());
        let issues = &report.file("tasks/Ship.md").unwrap().issues;
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].kind,
            IssueKind::WrongDirectory {
                expected: PathBuf::from("objectives/tasks"),
                actual: PathBuf::from("tasks"),
            }
        );
        assert!(issues[0].auto_fixable);

        // Nested below the storage directory is fine
        let nested = audit(&[doc("objectives/tasks/2024/Ship.md", valid_task())], AuditOptions::default());
        assert!(nested.is_clean());
    }

    #[test]
    fn test_missing_required_with_and_without_default() {
        let mut fm = valid_task();
        fm.as_object_mut().unwrap().remove("status");
        fm.as_object_mut().unwrap().remove("owner");
        let report = audit(&[doc("objectives/tasks/Ship.md", fm)], AuditOptions::default());
        let issues = &report.file("objectives/tasks/Ship.md").unwrap().issues;

        let status = issues.iter().find(|i| i.field() == Some("status")).unwrap();
        assert_eq!(status.code(), "missing-required");
        assert!(status.auto_fixable);

        let owner = issues.iter().find(|i| i.field() == Some("owner")).unwrap();
        assert_eq!(owner.code(), "missing-required");
        assert!(!owner.auto_fixable);
        assert!(owner.is_error());
    }

    #[test]
    fn test_required_without_default_reported_once() {
        let raw: RawSchema = serde_json::from_value(json!({"types": {
            "task": {"fields": {
                "status": {"prompt": "select", "options": ["raw", "done"], "required": true}
            }}
        }}))
        .unwrap();
        let schema = resolve(&raw).unwrap();
        let docs = vec![doc("tasks/Ship.md", json!({"type": "task"}))];
        let report = audit_vault(&schema, &docs, AuditOptions::default()).unwrap();

        let issues = &report.file("tasks/Ship.md").unwrap().issues;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::MissingRequired { field: "status".into(), default: None });
        assert!(!issues[0].auto_fixable);
    }

    #[test]
    fn test_invalid_option_suggests_nearest() {
        let mut fm = valid_task();
        fm["status"] = json!("don");
        let report = audit(&[doc("objectives/tasks/Ship.md", fm)], AuditOptions::default());
        let issues = &report.file("objectives/tasks/Ship.md").unwrap().issues;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code(), "invalid-option");
        assert_eq!(issues[0].kind.suggestion(), Some("done"));
    }

    #[test]
    fn test_relation_checks() {
        let mut fm = valid_task();
        fm["milestone"] = json!("[[Roadmap]]");
        fm["related"] = json!(["[[Missing Note]]", "[Ship](objectives/tasks/Ship.md)"]);
        let docs = vec![
            doc("objectives/tasks/Ship.md", fm),
            doc("objectives/tasks/Roadmap.md", valid_task()),
        ];
        let report = audit(&docs, AuditOptions::default());
        let codes = codes(&report, "objectives/tasks/Ship.md");
        assert!(codes.contains(&"invalid-source-type"));
        assert!(codes.contains(&"stale-reference"));
        assert!(codes.contains(&"format-violation"));
        assert!(codes.contains(&"self-reference"));
    }

    #[test]
    fn test_source_accepts_descendants() {
        let mut fm = valid_task();
        fm["related"] = json!(["[[Roadmap]]"]);
        let docs = vec![
            doc("objectives/tasks/Ship.md", fm),
            doc("objectives/milestones/Roadmap.md", json!({"type": "milestone", "created": "2024-01-01"})),
        ];
        assert!(audit(&docs, AuditOptions::default()).is_clean());
    }

    #[test]
    fn test_unknown_field_severity_follows_strict() {
        let mut fm = valid_task();
        fm["stauts"] = json!("done");
        fm["tags"] = json!(["work"]);
        fm["source"] = json!("web");
        let docs = vec![doc("objectives/tasks/Ship.md", fm)];

        let lenient = audit(&docs, AuditOptions::default().allow_field("source"));
        let issues = &lenient.file("objectives/tasks/Ship.md").unwrap().issues;
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code(), "unknown-field");
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].kind.suggestion(), Some("status"));

        let strict = audit(&docs, AuditOptions::default().strict(true));
        assert_eq!(strict.error_count(), 2);
    }

    #[test]
    fn test_owned_location_checked_only_for_recorded_notes() {
        let docs = vec![
            doc("projects/Alpha/Alpha.md", json!({
                "type": "project", "created": "2024-01-01", "research": ["[[Findings]]"]
            })),
            doc("research/Findings.md", json!({"type": "research", "created": "2024-01-01"})),
            doc("research/Unowned.md", json!({"type": "research", "created": "2024-01-01"})),
        ];
        let report = audit(&docs, AuditOptions::default());
        assert_eq!(codes(&report, "research/Findings.md"), vec!["owned-wrong-location"]);
        assert!(report.file("research/Unowned.md").is_none());

        let moved = vec![
            docs[0].clone(),
            doc("projects/Alpha/research/Findings.md", json!({"type": "research", "created": "2024-01-01"})),
        ];
        assert!(audit(&moved, AuditOptions::default()).is_clean());
    }

    #[test]
    fn test_owning_link_to_wrong_type_is_not_ownership() {
        let mut other = valid_task();
        other["related"] = json!(["[[Ship]]"]);
        let docs = vec![
            doc("projects/Alpha.md", json!({
                "type": "project", "created": "2024-01-01", "research": ["[[Ship]]"]
            })),
            doc("wrong/place/Ship.md", valid_task()),
            doc("objectives/tasks/Other.md", other),
        ];
        let report = audit(&docs, AuditOptions::default());
        assert_eq!(codes(&report, "wrong/place/Ship.md"), vec!["wrong-directory"]);
        assert!(report.file("objectives/tasks/Other.md").is_none());
        assert_eq!(codes(&report, "projects/Alpha.md"), vec!["invalid-source-type"]);
    }

    #[test]
    fn test_owned_note_referenced_by_other_note() {
        let docs = vec![
            doc("projects/Alpha/Alpha.md", json!({
                "type": "project", "created": "2024-01-01", "research": ["[[Findings]]"]
            })),
            doc("projects/Beta.md", json!({
                "type": "project", "created": "2024-01-01", "notes": ["[[Findings]]"]
            })),
            doc("projects/Alpha/research/Findings.md", json!({"type": "research", "created": "2024-01-01"})),
        ];
        let report = audit(&docs, AuditOptions::default());
        let issues = &report.file("projects/Beta.md").unwrap().issues;
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].kind,
            IssueKind::OwnedNoteReferenced {
                field: "notes".into(),
                target: "Findings".into(),
                owner: "Alpha".into(),
            }
        );
    }

    #[test]
    fn test_parent_cycle() {
        let idea = |parent: &str| json!({"type": "idea", "created": "2024-01-01", "parent": format!("[[{}]]", parent)});
        let docs = vec![
            doc("ideas/A.md", idea("B")),
            doc("ideas/B.md", idea("C")),
            doc("ideas/C.md", idea("A")),
            doc("ideas/D.md", json!({"type": "idea", "created": "2024-01-01"})),
        ];
        let report = audit(&docs, AuditOptions::default());
        let a = &report.file("ideas/A.md").unwrap().issues;
        assert_eq!(
            a[0].kind,
            IssueKind::ParentCycle {
                cycle: vec!["A".into(), "B".into(), "C".into(), "A".into()]
            }
        );
        assert!(report.file("ideas/D.md").is_none());
    }

    #[test]
    fn test_value_shapes() {
        let mut fm = valid_task();
        fm["created"] = json!("yesterday");
        fm["estimate"] = json!("lots");
        fm["blocked"] = json!("maybe");
        fm["related"] = json!("[[Ship]]");
        fm["owner"] = json!("me ");
        let report = audit(&[doc("objectives/tasks/Ship.md", fm)], AuditOptions::default());
        let codes = codes(&report, "objectives/tasks/Ship.md");
        for code in ["invalid-date", "invalid-number", "invalid-boolean", "invalid-list", "trailing-whitespace"] {
            assert!(codes.contains(&code), "missing {} in {:?}", code, codes);
        }
    }

    #[test]
    fn test_ignore_codes() {
        let report = audit(
            &[doc("tasks/Ship.md", valid_task())],
            AuditOptions::default().ignore_code("wrong-directory"),
        );
        assert!(report.is_clean());
    }

    #[test]
    fn test_audit_is_idempotent_and_sorted() {
        let docs = vec![
            doc("z/Z.md", json!({"type": "task"})),
            doc("a/A.md", json!({})),
            doc("objectives/tasks/Ship.md", valid_task()),
        ];
        let first = audit(&docs, AuditOptions::default());
        let second = audit(&docs, AuditOptions::default());
        assert_eq!(first, second);
        let paths: Vec<_> = first.files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("a/A.md"), PathBuf::from("z/Z.md")]);
    }
}
