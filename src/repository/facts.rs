use async_trait::async_trait;
use ignore::WalkBuilder;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::orchestration::ports::RepositoryFacts;
use crate::types::{DocweaveError, Perspective, RepositorySnapshot, Result, SizeClass};

const DOC_EXTENSIONS: &[&str] = &["md", "mdx", "markdown", "rst", "adoc", "txt"];

/// Well-known locations per perspective, in preference order
const KNOWN_TARGETS: &[(Perspective, &[&str])] = &[
    (Perspective::Engagement, &["README.md", "readme.md", "Readme.md", "docs/README.md"]),
    (
        Perspective::CurrentState,
        &[
            "docs/current-state.md",
            "docs/architecture.md",
            "ARCHITECTURE.md",
            "docs/overview.md",
        ],
    ),
    (
        Perspective::DecisionHistory,
        &[
            "docs/decisions.md",
            "docs/decision-log.md",
            "DECISIONS.md",
            "docs/adr/README.md",
        ],
    ),
];

fn language_for(ext: &str) -> Option<&'static str> {
    let lang = match ext {
        "rs" => "rust",
        "ts" | "tsx" => "typescript",
        "js" | "jsx" | "mjs" | "cjs" => "javascript",
        "py" => "python",
        "go" => "go",
        "java" => "java",
        "kt" | "kts" => "kotlin",
        "rb" => "ruby",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" => "cpp",
        "cs" => "csharp",
        "swift" => "swift",
        "scala" => "scala",
        "php" => "php",
        "sh" | "bash" => "bash",
        _ => return None,
    };
    Some(lang)
}

// =============================================================================
// Filesystem
// =============================================================================

/// Builds snapshots by walking a checkout, honoring `.gitignore`
pub struct FsRepositoryFacts {
    root: PathBuf,
}

impl FsRepositoryFacts {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn scan(root: &Path) -> Result<ScanSummary> {
        if !root.is_dir() {
            return Err(DocweaveError::RepositoryFacts(format!(
                "not a directory: {}",
                root.display()
            )));
        }

        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .git_exclude(true)
            .follow_links(false)
            .filter_entry(|e| e.file_name() != ".git")
            .build();

        let mut summary = ScanSummary::default();
        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(root) else {
                continue;
            };
            let rel = rel.to_string_lossy().replace('\\', "/");
            let ext = entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .unwrap_or_default();

            summary.file_count += 1;
            if DOC_EXTENSIONS.contains(&ext.as_str()) {
                summary.documentation.push(rel);
            } else if let Some(lang) = language_for(&ext) {
                *summary.languages.entry(lang).or_default() += 1;
            }
        }
        summary.documentation.sort();
        Ok(summary)
    }
}

#[derive(Default)]
struct ScanSummary {
    file_count: usize,
    documentation: Vec<String>,
    languages: HashMap<&'static str, usize>,
}

impl ScanSummary {
    fn primary_language(&self) -> Option<String> {
        self.languages
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(lang, _)| lang.to_string())
    }

    fn targets(&self) -> BTreeMap<Perspective, String> {
        KNOWN_TARGETS
            .iter()
            .filter_map(|(perspective, candidates)| {
                candidates
                    .iter()
                    .find(|c| self.documentation.iter().any(|d| d == *c))
                    .map(|c| (*perspective, c.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl RepositoryFacts for FsRepositoryFacts {
    async fn get_snapshot(
        &self,
        repository_id: &str,
        revision_id: &str,
    ) -> Result<RepositorySnapshot> {
        let root = self.root.clone();
        let summary = tokio::task::spawn_blocking(move || Self::scan(&root))
            .await
            .map_err(|e| DocweaveError::RepositoryFacts(format!("scan task failed: {}", e)))??;

        debug!(
            "Scanned {} files, {} documents",
            summary.file_count,
            summary.documentation.len()
        );

        Ok(RepositorySnapshot {
            repository_id: repository_id.to_string(),
            revision_id: revision_id.to_string(),
            primary_language: summary.primary_language(),
            size_class: SizeClass::from_file_count(summary.file_count),
            file_count: summary.file_count,
            targets: summary.targets(),
            documentation: summary.documentation,
        })
    }
}

// =============================================================================
// Static
// =============================================================================

/// Serves a fixed snapshot, e.g. one exported by an upstream pipeline stage
pub struct StaticRepositoryFacts {
    snapshot: RepositorySnapshot,
}

impl StaticRepositoryFacts {
    pub fn new(snapshot: RepositorySnapshot) -> Self {
        Self { snapshot }
    }

    /// Load a snapshot from a JSON or YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| matches!(e, "yaml" | "yml"));
        let snapshot = if is_yaml {
            serde_yaml::from_str(&raw)?
        } else {
            serde_json::from_str(&raw)?
        };
        Ok(Self::new(snapshot))
    }
}

#[async_trait]
impl RepositoryFacts for StaticRepositoryFacts {
    async fn get_snapshot(
        &self,
        repository_id: &str,
        revision_id: &str,
    ) -> Result<RepositorySnapshot> {
        let mut snapshot = self.snapshot.clone();
        if snapshot.repository_id.is_empty() {
            snapshot.repository_id = repository_id.to_string();
        }
        if snapshot.revision_id.is_empty() {
            snapshot.revision_id = revision_id.to_string();
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[tokio::test]
    async fn test_fs_snapshot() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "README.md", "# App\n");
        write(dir.path(), "docs/architecture.md", "# Arch\n");
        write(dir.path(), "src/main.rs", "fn main() {}\n");
        write(dir.path(), "src/lib.rs", "\n");
        write(dir.path(), "scripts/build.py", "\n");

        let facts = FsRepositoryFacts::new(dir.path());
        let snap = facts.get_snapshot("acme/app", "abc").await.unwrap();

        assert_eq!(snap.file_count, 5);
        assert_eq!(snap.size_class, SizeClass::Small);
        assert_eq!(snap.primary_language.as_deref(), Some("rust"));
        assert_eq!(snap.target_for(Perspective::Engagement), Some("README.md"));
        assert_eq!(
            snap.target_for(Perspective::CurrentState),
            Some("docs/architecture.md")
        );
        assert_eq!(snap.target_for(Perspective::DecisionHistory), None);
        assert!(snap.has_documentation("docs/architecture.md"));
    }

    #[tokio::test]
    async fn test_fs_snapshot_missing_root() {
        let facts = FsRepositoryFacts::new("/definitely/not/here");
        assert!(matches!(
            facts.get_snapshot("r", "v").await,
            Err(DocweaveError::RepositoryFacts(_))
        ));
    }

    #[tokio::test]
    async fn test_static_fills_ids() {
        let facts = StaticRepositoryFacts::new(RepositorySnapshot::default());
        let snap = facts.get_snapshot("acme/app", "rev1").await.unwrap();
        assert_eq!(snap.repository_id, "acme/app");
        assert_eq!(snap.revision_id, "rev1");
    }
}
