//! Schema versioning utilities

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SchemaError};

/// Size of a suggested version change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
    /// Nothing changed
    None,
    /// Additive, mechanically applicable changes only
    Minor,
    /// Something previously valid is gone
    Major,
}

impl fmt::Display for VersionBump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Minor => write!(f, "minor"),
            Self::Major => write!(f, "major"),
        }
    }
}

/// A schema version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Semantic version (e.g., "1.2.3")
    pub version: Version,
    /// Version this one was bumped from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
}

impl SchemaVersion {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            previous_version: None,
        }
    }

    /// Create from a version string; a leading `v` is tolerated
    pub fn parse(version_str: &str) -> Result<Self> {
        let trimmed = version_str.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let version = Version::parse(trimmed)
            .map_err(|e| SchemaError::InvalidVersion(format!("'{}': {}", version_str, e)))?;
        Ok(Self::new(version))
    }

    /// Get the version string (e.g., "1.2.3")
    pub fn version_string(&self) -> String {
        self.version.to_string()
    }

    /// Check if this is a major version bump from another version
    pub fn is_major_bump_from(&self, other: &SchemaVersion) -> bool {
        self.version.major > other.version.major
    }

    /// Check if this is a minor version bump from another version
    pub fn is_minor_bump_from(&self, other: &SchemaVersion) -> bool {
        self.version.major == other.version.major && self.version.minor > other.version.minor
    }

    /// Whether this version moves at least as far as `bump` requires from `other`
    pub fn satisfies_bump_from(&self, other: &SchemaVersion, bump: VersionBump) -> bool {
        match bump {
            VersionBump::None => self.version >= other.version,
            VersionBump::Minor => {
                self.is_major_bump_from(other) || self.is_minor_bump_from(other)
            }
            VersionBump::Major => self.is_major_bump_from(other),
        }
    }

    pub fn bump_major(&self) -> Self {
        self.bumped(Version::new(self.version.major + 1, 0, 0))
    }

    pub fn bump_minor(&self) -> Self {
        self.bumped(Version::new(self.version.major, self.version.minor + 1, 0))
    }

    /// Apply a bump; `None` returns an unchanged copy
    pub fn bump(&self, bump: VersionBump) -> Self {
        match bump {
            VersionBump::None => self.clone(),
            VersionBump::Minor => self.bump_minor(),
            VersionBump::Major => self.bump_major(),
        }
    }

    fn bumped(&self, version: Version) -> Self {
        Self {
            version,
            previous_version: Some(self.version_string()),
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.version)
    }
}

impl PartialEq for SchemaVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for SchemaVersion {}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.version.cmp(&other.version)
    }
}
