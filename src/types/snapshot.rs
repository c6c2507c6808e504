//! Repository facts needed for selection and planning.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::perspective::Perspective;

/// Repository size class, derived from the tracked file count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    /// < 50 files
    Small,
    /// 50-199 files
    #[default]
    Medium,
    /// 200-499 files
    Large,
    /// 500+ files
    Enterprise,
}

impl SizeClass {
    pub fn from_file_count(count: usize) -> Self {
        match count {
            0..=49 => SizeClass::Small,
            50..=199 => SizeClass::Medium,
            200..=499 => SizeClass::Large,
            _ => SizeClass::Enterprise,
        }
    }

    /// Distinct top-level source directories a change must touch to count as
    /// an architecture shift
    pub fn architecture_breadth(&self) -> usize {
        match self {
            SizeClass::Small => 2,
            SizeClass::Medium => 3,
            SizeClass::Large => 4,
            SizeClass::Enterprise => 5,
        }
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeClass::Small => write!(f, "small"),
            SizeClass::Medium => write!(f, "medium"),
            SizeClass::Large => write!(f, "large"),
            SizeClass::Enterprise => write!(f, "enterprise"),
        }
    }
}

impl FromStr for SizeClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "small" => Ok(SizeClass::Small),
            "medium" => Ok(SizeClass::Medium),
            "large" => Ok(SizeClass::Large),
            "enterprise" => Ok(SizeClass::Enterprise),
            _ => Err(format!("Unknown size class: '{}'", s)),
        }
    }
}

/// Facts about one repository revision. Built once per run, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySnapshot {
    pub repository_id: String,
    pub revision_id: String,
    pub primary_language: Option<String>,
    pub size_class: SizeClass,
    pub file_count: usize,
    /// Every documentation file in the repository
    pub documentation: Vec<String>,
    /// Known document location per perspective
    pub targets: BTreeMap<Perspective, String>,
}

impl RepositorySnapshot {
    /// Placeholder used when the facts provider cannot answer
    pub fn unknown(repository_id: impl Into<String>, revision_id: impl Into<String>) -> Self {
        Self {
            repository_id: repository_id.into(),
            revision_id: revision_id.into(),
            ..Default::default()
        }
    }

    pub fn target_for(&self, perspective: Perspective) -> Option<&str> {
        self.targets.get(&perspective).map(String::as_str)
    }

    pub fn has_documentation(&self, path: &str) -> bool {
        self.documentation.iter().any(|d| d == path)
    }
}
