//! Configuration management for vault tooling
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (vault-schemas.toml)
//! - Environment variables (VAULT_SCHEMAS__*)
//!
//! ## Example config file (vault-schemas.toml):
//! ```toml
//! [vault]
//! root = "~/notes"
//! schema = ".schema.json"
//! exclude_dirs = ["_templates/", "archive/"]
//!
//! [audit]
//! strict = false
//! allowed_fields = ["source", "rating"]
//! discriminator = "type"
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::audit::{AuditOptions, DEFAULT_DISCRIMINATOR};
use crate::resolver::ResolvedSchema;
use crate::vault::DiscoveryOptions;

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VaultConfig {
    #[serde(default)]
    pub vault: VaultSection,

    #[serde(default)]
    pub audit: AuditSection,

    #[serde(default)]
    pub output: OutputSection,
}

/// Where the vault and its schema live
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultSection {
    /// Vault root directory
    #[serde(default = "default_vault_root")]
    pub root: PathBuf,

    /// Schema document, relative to the vault root unless absolute
    #[serde(default = "default_schema_path")]
    pub schema: PathBuf,

    /// Vault-relative prefixes skipped during discovery
    #[serde(default = "default_exclude_dirs")]
    pub exclude_dirs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditSection {
    /// Treat unknown fields as errors
    #[serde(default)]
    pub strict: bool,

    /// Extra frontmatter keys allowed on every type
    #[serde(default)]
    pub allowed_fields: BTreeSet<String>,

    /// Frontmatter key naming a document's type
    #[serde(default = "default_discriminator")]
    pub discriminator: String,

    /// Issue codes left out of reports
    #[serde(default)]
    pub ignore: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSection {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    pub fn to_json<T: Serialize>(&self, value: &T) -> serde_json::Result<String> {
        match self {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}

// Default value functions
fn default_vault_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_schema_path() -> PathBuf {
    PathBuf::from(".schema.json")
}

fn default_exclude_dirs() -> Vec<String> {
    DiscoveryOptions::default().exclude_prefixes
}

fn default_discriminator() -> String {
    DEFAULT_DISCRIMINATOR.to_string()
}

impl Default for VaultSection {
    fn default() -> Self {
        Self {
            root: default_vault_root(),
            schema: default_schema_path(),
            exclude_dirs: default_exclude_dirs(),
        }
    }
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            strict: false,
            allowed_fields: BTreeSet::new(),
            discriminator: default_discriminator(),
            ignore: BTreeSet::new(),
        }
    }
}

impl VaultConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, layering an explicit file over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "vault-schemas.toml",
            ".vault-schemas.toml",
            "config/vault-schemas.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "vault", "vault-schemas") {
            let xdg_config = config_dir.config_dir().join("vault-schemas.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // VAULT_SCHEMAS__AUDIT__STRICT=true
        builder = builder.add_source(
            Environment::with_prefix("VAULT_SCHEMAS")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Vault root (resolves relative paths)
    pub fn vault_root(&self) -> PathBuf {
        if self.vault.root.is_absolute() {
            self.vault.root.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.vault.root)
        }
    }

    /// Schema document path, relative paths taken from the vault root
    pub fn schema_path(&self) -> PathBuf {
        if self.vault.schema.is_absolute() {
            self.vault.schema.clone()
        } else {
            self.vault_root().join(&self.vault.schema)
        }
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            exclude_prefixes: self.vault.exclude_dirs.clone(),
            ..DiscoveryOptions::default()
        }
    }

    /// Audit options for a schema; the link style always comes from the schema
    pub fn audit_options(&self, schema: &ResolvedSchema) -> AuditOptions {
        AuditOptions {
            strict: self.audit.strict,
            allowed_fields: self.audit.allowed_fields.clone(),
            discriminator: self.audit.discriminator.clone(),
            ignore_codes: self.audit.ignore.clone(),
            ..AuditOptions::for_schema(schema)
        }
    }
}
