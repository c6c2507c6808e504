//! CLI Common Utilities
//!
//! Shared setup for the `plan` and `run` commands: configuration, change
//! input, and the collaborator adapters an orchestrator is built from.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::ai::{LlmGenerator, ProviderConfig, create_provider};
use crate::config::{Config, ConfigLoader};
use crate::document::FsDocumentStore;
use crate::orchestration::{Orchestrator, SharedCapability, SharedFacts};
use crate::repository::{FsRepositoryFacts, StaticRepositoryFacts};
use crate::types::{DocweaveError, RawChange, Result};

/// Inputs shared by commands that orchestrate a change
#[derive(Debug, Clone)]
pub struct ChangeArgs {
    /// JSON or YAML change description
    pub change: PathBuf,
    /// Repository checkout the documents live in
    pub repo: PathBuf,
    /// Pre-computed repository snapshot, instead of scanning `repo`
    pub snapshot: Option<PathBuf>,
}

/// Command execution context
pub struct CommandContext {
    pub config: Config,
    pub raw: RawChange,
    pub repo: PathBuf,
    facts: SharedFacts,
}

impl CommandContext {
    pub fn load(args: &ChangeArgs, config: Config) -> Result<Self> {
        let repo = canonical_repo(&args.repo)?;
        let raw = RawChange::from_file(&args.change)?;
        let facts: SharedFacts = match &args.snapshot {
            Some(path) => Arc::new(StaticRepositoryFacts::from_file(path)?),
            None => Arc::new(FsRepositoryFacts::new(&repo)),
        };
        Ok(Self {
            config,
            raw,
            repo,
            facts,
        })
    }

    pub fn store(&self) -> FsDocumentStore {
        FsDocumentStore::new(&self.repo)
    }

    /// Orchestrator backed by the configured LLM provider
    pub fn orchestrator(&self) -> Result<Orchestrator> {
        let provider = create_provider(&ProviderConfig::from(&self.config.llm))?;
        let capability: SharedCapability = Arc::new(LlmGenerator::new(provider));
        Ok(self.orchestrator_with(capability))
    }

    pub fn orchestrator_with(&self, capability: SharedCapability) -> Orchestrator {
        Orchestrator::new(
            self.config.clone(),
            capability,
            Arc::clone(&self.facts),
            Arc::new(self.store()),
        )
    }
}

/// Load configuration, or a single explicit file when given
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(p) => ConfigLoader::load_from_file(p),
        None => ConfigLoader::load(),
    }
}

fn canonical_repo(repo: &Path) -> Result<PathBuf> {
    if !repo.is_dir() {
        return Err(DocweaveError::Config(format!(
            "Repository path is not a directory: {}",
            repo.display()
        )));
    }
    Ok(repo.canonicalize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_context_loads_change_and_rejects_missing_repo() {
        let dir = TempDir::new().unwrap();
        let change = dir.path().join("change.yaml");
        std::fs::write(
            &change,
            "repository_id: acme/app\nrevision_id: abc123\nfiles:\n  - path: README.md\n",
        )
        .unwrap();

        let args = ChangeArgs {
            change: change.clone(),
            repo: dir.path().to_path_buf(),
            snapshot: None,
        };
        let ctx = CommandContext::load(&args, Config::default()).unwrap();
        assert_eq!(ctx.raw.files.len(), 1);

        let missing = ChangeArgs {
            repo: dir.path().join("nope"),
            ..args
        };
        assert!(matches!(
            CommandContext::load(&missing, Config::default()),
            Err(DocweaveError::Config(_))
        ));
    }
}
