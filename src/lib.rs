//! Vault Schemas
//!
//! Typed schemas for a markdown vault: every note carries a `type` in its YAML
//! frontmatter, and the schema says which fields that type has, where its notes live
//! and how they link to each other.
//!
//! ## Engines
//!
//! - **Resolver**: turns raw, inheriting type declarations into a merged, queryable
//!   type model with storage directories and an ownership map
//! - **Audit**: checks documents against the resolved model and reports structural,
//!   referential and ownership defects as coded issues
//! - **Migrate**: diffs two schema snapshots into deterministic and
//!   review-required operations with a suggested version bump
//!
//! ## Architecture
//!
//! ```text
//! RawSchema ──resolve──▶ ResolvedSchema ──┐
//!                                         ├──▶ Auditor ──▶ AuditReport
//! vault/*.md ──discover──▶ Documents ──▶ VaultIndex
//!
//! RawSchema (old) ─┐
//!                  ├──diff──▶ MigrationPlan
//! RawSchema (new) ─┘
//! ```

pub mod audit;
pub mod checksum;
pub mod config;
pub mod error;
pub mod migrate;
pub mod resolver;
pub mod schema;
pub mod suggest;
pub mod vault;
pub mod version;

pub use audit::{audit_vault, AuditIssue, AuditOptions, AuditReport, Auditor, FileReport, IssueKind, Severity};
pub use checksum::Checksum;
pub use config::VaultConfig;
pub use error::{Result, SchemaError};
pub use migrate::{diff, diff_snapshots, MigrationOp, MigrationPlan};
pub use resolver::{resolve, ResolvedSchema, ResolvedType};
pub use schema::{Field, FieldKind, LinkFormat, RawSchema, RawType};
pub use vault::{discover, Document, VaultIndex};
pub use version::{SchemaVersion, VersionBump};
