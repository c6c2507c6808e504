//! Change input and the typed event produced by the classifier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use super::error::Result;

// =============================================================================
// Raw Input
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    #[default]
    Modified,
    Deleted,
    Renamed,
}

impl FileStatus {
    /// Added, deleted, or renamed: the path set itself changed
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Modified)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangedFile {
    pub path: String,
    pub status: FileStatus,
    pub previous_path: Option<String>,
    pub additions: u32,
    pub deletions: u32,
}

impl ChangedFile {
    pub fn modified(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_status(path: impl Into<String>, status: FileStatus) -> Self {
        Self {
            path: path.into(),
            status,
            ..Default::default()
        }
    }
}

/// Commit and pull-request metadata attached to a change
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeMetadata {
    pub commit_message: Option<String>,
    pub pr_title: Option<String>,
    pub pr_body: Option<String>,
    pub author: Option<String>,
    pub branch: Option<String>,
    pub labels: Vec<String>,
}

impl ChangeMetadata {
    /// All free text (commit, PR title/body, labels) joined for keyword scans
    pub fn text(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        parts.extend(self.commit_message.as_deref());
        parts.extend(self.pr_title.as_deref());
        parts.extend(self.pr_body.as_deref());
        parts.extend(self.labels.iter().map(String::as_str));
        parts.join("\n")
    }
}

/// Raw change description as handed to the engine
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawChange {
    pub repository_id: String,
    pub revision_id: String,
    pub files: Vec<ChangedFile>,
    pub diff: Option<String>,
    pub metadata: ChangeMetadata,
}

impl RawChange {
    /// Load a change description from a JSON or YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        if is_yaml {
            Ok(serde_yaml::from_str(&raw)?)
        } else {
            Ok(serde_json::from_str(&raw)?)
        }
    }
}

// =============================================================================
// Classified Event
// =============================================================================

/// Role a touched path plays in the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathClass {
    /// README, CONTRIBUTING, guides, usage docs
    EngagementDoc,
    /// ADRs and decision logs
    DecisionRecord,
    /// Any other documentation
    Documentation,
    /// Binaries, CLI definitions, route tables
    EntryPoint,
    /// Public APIs, schemas, exported modules
    PublicInterface,
    /// Manifests, CI, deployment descriptors
    Build,
    Test,
    Source,
}

impl PathClass {
    pub fn is_documentation(&self) -> bool {
        matches!(
            self,
            Self::EngagementDoc | Self::DecisionRecord | Self::Documentation
        )
    }

    /// Paths whose changes alter what the system is or does
    pub fn is_system(&self) -> bool {
        matches!(
            self,
            Self::EntryPoint | Self::PublicInterface | Self::Build | Self::Source
        )
    }
}

impl fmt::Display for PathClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::EngagementDoc => "engagement-doc",
            Self::DecisionRecord => "decision-record",
            Self::Documentation => "documentation",
            Self::EntryPoint => "entry-point",
            Self::PublicInterface => "public-interface",
            Self::Build => "build",
            Self::Test => "test",
            Self::Source => "source",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedPath {
    pub path: String,
    pub status: FileStatus,
    pub class: PathClass,
    /// Module area the path belongs to (`src/auth`, `web`, or `.` for root files)
    pub area: String,
}

/// Coarse change-type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    InterfaceAffecting,
    DecisionAffecting,
    Structural,
    Cosmetic,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::InterfaceAffecting => "interface-affecting",
            Self::DecisionAffecting => "decision-affecting",
            Self::Structural => "structural",
            Self::Cosmetic => "cosmetic",
        };
        f.write_str(s)
    }
}

/// Parsed conventional-commit header
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommitInfo {
    /// `feat`, `fix`, `revert`, ... when the header is conventional
    pub kind: Option<String>,
    pub scope: Option<String>,
    pub breaking: bool,
    pub subject: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffSummary {
    pub files_changed: usize,
    pub additions: u64,
    pub deletions: u64,
    pub added: usize,
    pub deleted: usize,
    pub renamed: usize,
    /// Sorted, distinct areas of source paths
    pub areas: Vec<String>,
    pub excerpt: Option<String>,
}

/// Immutable, typed description of one change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub id: String,
    pub repository_id: String,
    pub revision_id: String,
    pub paths: Vec<ClassifiedPath>,
    pub metadata: ChangeMetadata,
    pub commit: CommitInfo,
    pub decision_markers: Vec<String>,
    pub kind: ChangeKind,
    pub diff: DiffSummary,
}

impl ChangeEvent {
    pub fn path_strings(&self) -> Vec<String> {
        self.paths.iter().map(|p| p.path.clone()).collect()
    }

    pub fn has_class(&self, class: PathClass) -> bool {
        self.paths.iter().any(|p| p.class == class)
    }

    pub fn with_class(&self, class: PathClass) -> impl Iterator<Item = &ClassifiedPath> {
        self.paths.iter().filter(move |p| p.class == class)
    }

    pub fn is_breaking(&self) -> bool {
        self.commit.breaking
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_change_from_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("change.yaml");
        std::fs::write(
            &path,
            "repository_id: acme/api\nrevision_id: abc123\nfiles:\n  - path: src/lib.rs\n  - path: docs/old.md\n    status: deleted\nmetadata:\n  commit_message: \"feat: add search\"\n",
        )
        .unwrap();

        let raw = RawChange::from_file(&path).unwrap();
        assert_eq!(raw.files.len(), 2);
        assert_eq!(raw.files[0].status, FileStatus::Modified);
        assert_eq!(raw.files[1].status, FileStatus::Deleted);
        assert_eq!(raw.metadata.commit_message.as_deref(), Some("feat: add search"));
    }

    #[test]
    fn test_raw_change_from_json_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("change.json");
        std::fs::write(&path, r#"{"files":[{"path":"README.md","status":"added"}]}"#).unwrap();

        let raw = RawChange::from_file(&path).unwrap();
        assert_eq!(raw.repository_id, "");
        assert_eq!(raw.files[0].status, FileStatus::Added);
        assert!(raw.metadata.labels.is_empty());
    }

    #[test]
    fn test_metadata_text_joins_fields() {
        let meta = ChangeMetadata {
            commit_message: Some("revert: old cache".into()),
            pr_title: Some("Switch to redis".into()),
            labels: vec!["architecture".into()],
            ..Default::default()
        };
        let text = meta.text();
        assert!(text.contains("revert: old cache"));
        assert!(text.contains("Switch to redis"));
        assert!(text.contains("architecture"));
    }
}
