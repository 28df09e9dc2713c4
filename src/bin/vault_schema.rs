//! Vault Schema CLI
//!
//! Resolves vault schemas, audits vaults against them and plans schema migrations.
//!
//! Usage:
//!   vault-schema resolve --schema .schema.json
//!   vault-schema audit --vault ~/notes --strict
//!   vault-schema diff old.schema.json new.schema.json --format json
//!   vault-schema --help

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use vault_schemas::config::VaultConfig;
use vault_schemas::{audit_vault, diff, discover, resolve, AuditReport, MigrationPlan, RawSchema, ResolvedSchema};

#[derive(Parser)]
#[command(name = "vault-schema")]
#[command(about = "Resolve, audit and migrate typed markdown vault schemas")]
struct Cli {
    /// Config file layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text, global = true)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the schema and print the merged type model
    Resolve {
        /// Schema document (JSON or TOML)
        #[arg(short, long)]
        schema: Option<PathBuf>,
    },

    /// List types, or fuzzy-search them by name
    Types {
        /// Search query
        query: Option<String>,

        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Maximum number of matches
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Audit every document in the vault
    Audit {
        /// Vault root
        #[arg(short, long)]
        vault: Option<PathBuf>,

        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Unknown fields are errors
        #[arg(long)]
        strict: bool,

        /// Extra allowed frontmatter field (repeatable)
        #[arg(long = "allow")]
        allow: Vec<String>,

        /// Issue code to leave out (repeatable)
        #[arg(long = "ignore")]
        ignore: Vec<String>,
    },

    /// Plan a migration between two schema snapshots
    Diff {
        /// Current schema
        old: PathBuf,

        /// Proposed schema
        new: PathBuf,

        /// Version of the current schema (default: its declared version)
        #[arg(long)]
        from: Option<String>,

        /// Version of the proposed schema (default: its declared version)
        #[arg(long)]
        to: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = VaultConfig::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    let format = cli.format;
    let json_format = config.output.format;

    match cli.command {
        Commands::Resolve { schema } => {
            let resolved = load_resolved(&schema_path(&config, schema.as_deref()))?;
            match format {
                Format::Json => println!("{}", json_format.to_json(&resolved)?),
                Format::Text => print_resolved(&resolved),
            }
            Ok(0)
        }

        Commands::Types { query, schema, limit } => {
            let resolved = load_resolved(&schema_path(&config, schema.as_deref()))?;
            let names: Vec<String> = match &query {
                Some(q) => resolved
                    .search_types(q, limit)
                    .into_iter()
                    .map(|m| m.name)
                    .collect(),
                None => resolved.type_names().map(String::from).collect(),
            };
            match format {
                Format::Json => println!("{}", json_format.to_json(&names)?),
                Format::Text => {
                    for name in &names {
                        println!("{}", name);
                    }
                }
            }
            Ok(0)
        }

        Commands::Audit { vault, schema, strict, allow, ignore } => {
            if let Some(root) = vault {
                config.vault.root = root;
            }
            config.audit.strict |= strict;
            config.audit.allowed_fields.extend(allow);
            config.audit.ignore.extend(ignore);

            let resolved = load_resolved(&schema_path(&config, schema.as_deref()))?;
            let root = config.vault_root();
            let documents = discover(&root, &config.discovery_options())
                .with_context(|| format!("failed to scan vault {}", root.display()))?;
            debug!(documents = documents.len(), "vault scanned");

            let report = audit_vault(&resolved, &documents, config.audit_options(&resolved))?;
            match format {
                Format::Json => println!("{}", json_format.to_json(&report)?),
                Format::Text => print_report(&report),
            }
            Ok(if report.has_errors() { 1 } else { 0 })
        }

        Commands::Diff { old, new, from, to } => {
            let old_raw = load_raw(&old)?;
            let new_raw = load_raw(&new)?;
            let from = from
                .or_else(|| old_raw.version.clone())
                .unwrap_or_else(|| vault_schemas::migrate::INITIAL_VERSION.to_string());
            let to = to
                .or_else(|| new_raw.version.clone())
                .unwrap_or_else(|| from.clone());

            let plan = diff(&old_raw, &new_raw, &from, &to).context("schema snapshots do not resolve")?;
            match format {
                Format::Json => println!("{}", json_format.to_json(&plan)?),
                Format::Text => print_plan(&plan),
            }
            Ok(if plan.requires_review() { 2 } else { 0 })
        }
    }
}

fn schema_path(config: &VaultConfig, explicit: Option<&Path>) -> PathBuf {
    explicit.map(Path::to_path_buf).unwrap_or_else(|| config.schema_path())
}

fn load_raw(path: &Path) -> Result<RawSchema> {
    RawSchema::load(path).with_context(|| format!("failed to load schema {}", path.display()))
}

fn load_resolved(path: &Path) -> Result<ResolvedSchema> {
    let raw = load_raw(path)?;
    resolve(&raw).with_context(|| format!("schema {} does not resolve", path.display()))
}

fn print_resolved(schema: &ResolvedSchema) {
    println!("Schema {} ({} types)", schema.version().unwrap_or("unversioned"), schema.len());
    for ty in schema.types() {
        let parent = ty.parent.as_deref().unwrap_or("-");
        let dir = if ty.output_dir.is_empty() { "." } else { ty.output_dir.as_str() };
        println!("\n{} (extends {}) -> {}/", ty.name, parent, dir);
        for (name, field) in ty.ordered_fields() {
            let mut flags = Vec::new();
            if field.required {
                flags.push("required");
            }
            if field.multiple {
                flags.push("multiple");
            }
            if field.owned {
                flags.push("owned");
            }
            let kind = format!("{:?}", field.kind()).to_lowercase();
            if flags.is_empty() {
                println!("  {}: {}", name, kind);
            } else {
                println!("  {}: {} [{}]", name, kind, flags.join(", "));
            }
        }
    }
}

fn print_report(report: &AuditReport) {
    for file in &report.files {
        println!("{}", file.path.display());
        for issue in &file.issues {
            println!("  {}", issue);
        }
    }

    println!(
        "\n{} files checked: {} errors, {} warnings ({} fixable)",
        report.files_checked,
        report.error_count(),
        report.warning_count(),
        report.fixable_count()
    );
    for (code, count) in report.by_code() {
        println!("  {:<24} {}", code, count);
    }
}

fn print_plan(plan: &MigrationPlan) {
    print!("{}", plan);
    println!("  checksums: {} -> {}", plan.from_checksum.short(), plan.to_checksum.short());
}
