//! Document store adapters
//!
//! - `FsDocumentStore`: documents under a checkout root
//! - `MemoryDocumentStore`: in-memory documents for tests and dry runs

use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Component, Path, PathBuf};

use crate::orchestration::ports::DocumentStore;
use crate::types::{DocumentTarget, DocweaveError, Perspective, Result};

// =============================================================================
// Filesystem
// =============================================================================

pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a repository-relative path, refusing escapes from the root
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let rel = Path::new(path);
        let escapes = rel
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
        if escapes || path.trim().is_empty() {
            return Err(DocweaveError::document_store(path, "path must stay inside the repository"));
        }
        Ok(self.root.join(rel))
    }

    /// Write content for a target, creating parent directories
    pub async fn write(&self, path: &str, content: &str) -> Result<PathBuf> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut body = content.trim_end().to_string();
        body.push('\n');
        tokio::fs::write(&full, body).await?;
        Ok(full)
    }
}

#[async_trait]
impl DocumentStore for FsDocumentStore {
    async fn get_target(&self, perspective: Perspective, path: &str) -> Result<DocumentTarget> {
        let full = self.resolve(path)?;
        match tokio::fs::read_to_string(&full).await {
            Ok(content) => Ok(DocumentTarget::existing(perspective, path, content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(DocumentTarget::missing(perspective, path))
            }
            Err(e) => Err(DocweaveError::document_store(path, e.to_string())),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&full).await.unwrap_or(false))
    }
}

// =============================================================================
// In-memory
// =============================================================================

#[derive(Default)]
pub struct MemoryDocumentStore {
    documents: DashMap<String, String>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.documents.insert(path.into(), content.into());
        self
    }

    pub fn insert(&self, path: impl Into<String>, content: impl Into<String>) {
        self.documents.insert(path.into(), content.into());
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get_target(&self, perspective: Perspective, path: &str) -> Result<DocumentTarget> {
        Ok(match self.documents.get(path) {
            Some(content) => DocumentTarget::existing(perspective, path, content.clone()),
            None => DocumentTarget::missing(perspective, path),
        })
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.documents.contains_key(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fs_store_missing_and_existing() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/current-state.md"), "# Overview\ntext\n").unwrap();
        let store = FsDocumentStore::new(dir.path());

        let existing = store
            .get_target(Perspective::CurrentState, "docs/current-state.md")
            .await
            .unwrap();
        assert!(existing.exists);
        assert_eq!(existing.summary.unwrap().section_count, 1);

        let missing = store.get_target(Perspective::Engagement, "README.md").await.unwrap();
        assert!(!missing.exists);
        assert!(!store.exists("README.md").await.unwrap());
    }

    #[tokio::test]
    async fn test_fs_store_rejects_escape() {
        let dir = TempDir::new().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let err = store
            .get_target(Perspective::Engagement, "../outside.md")
            .await
            .unwrap_err();
        assert!(matches!(err, DocweaveError::DocumentStore { .. }));
    }

    #[tokio::test]
    async fn test_fs_store_write_creates_dirs() {
        let dir = TempDir::new().unwrap();
        let store = FsDocumentStore::new(dir.path());
        store.write("docs/decisions.md", "# Decisions\n\n").await.unwrap();
        let written = std::fs::read_to_string(dir.path().join("docs/decisions.md")).unwrap();
        assert_eq!(written, "# Decisions\n");
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryDocumentStore::new().with_document("README.md", "# App\n");
        assert!(store.exists("README.md").await.unwrap());
        let target = store.get_target(Perspective::Engagement, "README.md").await.unwrap();
        assert!(target.has_content());
    }
}
