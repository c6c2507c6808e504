//! Run Command
//!
//! Full orchestration for one change description.
//!
//! Usage:
//!   docweave run --change change.yaml [--repo .] [--snapshot snap.json]
//!                [--output result.json] [--write [--include-partial]]
//!                [--mode deep] [--threshold 0.8] [--max-attempts 4]
//!                [--provider ollama] [--model llama3.1]

use std::path::{Path, PathBuf};

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::ui::Output;
use crate::cli::util::{ChangeArgs, CommandContext};
use crate::config::{Config, QualityMode};
use crate::document::FsDocumentStore;
use crate::types::{OrchestrationResult, Result};

/// Run options (consolidated parameters)
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub change: ChangeArgs,
    /// Where to save the result; `.md` renders the summary, anything else JSON
    pub output: Option<PathBuf>,
    /// Write accepted documents into the checkout
    pub write: bool,
    /// With `write`, also write partial results
    pub include_partial: bool,
    pub mode: Option<QualityMode>,
    pub threshold: Option<f64>,
    pub max_attempts: Option<u32>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

pub fn run(options: RunOptions, config: Config) -> Result<()> {
    let config = apply_overrides(config, &options)?;
    let ctx = CommandContext::load(&options.change, config)?;
    let orchestrator = ctx.orchestrator()?;
    let output = Output::new();

    let rt = Runtime::new()?;
    let result = rt.block_on(async {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted; finishing in-flight attempts");
                on_interrupt.cancel();
            }
        });
        orchestrator.start_with_cancel(&ctx.raw, cancel).await
    })?;

    output.result(&result);

    if let Some(path) = &options.output {
        save_result(&result, path)?;
        output.info(&format!("Result written to {}", path.display()));
    }

    if options.write {
        let written = rt.block_on(write_documents(
            &ctx.store(),
            &result,
            options.include_partial,
        ))?;
        if written.is_empty() {
            output.info("No documents written");
        }
        for path in written {
            output.success(&format!("Wrote {}", path.display()));
        }
    }

    Ok(())
}

/// CLI flags take precedence over loaded configuration
fn apply_overrides(mut config: Config, options: &RunOptions) -> Result<Config> {
    if let Some(mode) = options.mode {
        config.apply_mode(mode);
    }
    if let Some(threshold) = options.threshold {
        config.quality.pass_threshold = threshold;
    }
    if let Some(max_attempts) = options.max_attempts {
        config.orchestration.max_attempts = max_attempts;
    }
    if let Some(provider) = &options.provider {
        config.llm.provider = provider.clone();
    }
    if let Some(model) = &options.model {
        config.llm.model = model.clone();
    }
    config.validate()?;
    Ok(config)
}

fn save_result(result: &OrchestrationResult, path: &Path) -> Result<()> {
    let is_markdown = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("md"));
    let body = if is_markdown {
        result.to_markdown()
    } else {
        serde_json::to_string_pretty(result)?
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, body)?;
    Ok(())
}

/// Deliver result contents into the checkout
async fn write_documents(
    store: &FsDocumentStore,
    result: &OrchestrationResult,
    include_partial: bool,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for target in result.deliverable(include_partial) {
        let Some(content) = &target.content else {
            continue;
        };
        let path = store.write(&target.path, content).await?;
        info!("Wrote {} ({})", target.path, target.outcome);
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ChangeKind, OutcomeCounts, Perspective, TargetOutcome, UpdateStrategy,
    };
    use tempfile::TempDir;

    fn options() -> RunOptions {
        RunOptions {
            change: ChangeArgs {
                change: PathBuf::from("change.yaml"),
                repo: PathBuf::from("."),
                snapshot: None,
            },
            output: None,
            write: false,
            include_partial: false,
            mode: None,
            threshold: None,
            max_attempts: None,
            provider: None,
            model: None,
        }
    }

    fn result_with(targets: Vec<TargetOutcome>) -> OrchestrationResult {
        OrchestrationResult {
            run_id: "run-1".into(),
            change_id: "chg-1".into(),
            repository_id: "acme/app".into(),
            revision_id: "abc".into(),
            change_kind: ChangeKind::Structural,
            decisions: Vec::new(),
            targets,
            counts: OutcomeCounts::default(),
            cancelled: false,
            metrics: Default::default(),
        }
    }

    fn with_content(path: &str, outcome: crate::types::Outcome) -> TargetOutcome {
        TargetOutcome {
            outcome,
            content: Some(format!("# {}\n", path)),
            ..TargetOutcome::failed_without_attempt(
                Perspective::Engagement,
                path,
                Some(UpdateStrategy::Create),
                "",
            )
        }
    }

    #[test]
    fn test_overrides_apply_after_mode() {
        let opts = RunOptions {
            mode: Some(QualityMode::Deep),
            max_attempts: Some(5),
            model: Some("llama3.1".into()),
            ..options()
        };
        let config = apply_overrides(Config::default(), &opts).unwrap();
        assert_eq!(config.quality.pass_threshold, 0.80);
        assert_eq!(config.orchestration.max_attempts, 5);
        assert_eq!(config.llm.model, "llama3.1");
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let opts = RunOptions {
            threshold: Some(1.5),
            ..options()
        };
        assert!(apply_overrides(Config::default(), &opts).is_err());
    }

    #[test]
    fn test_save_result_formats() {
        let dir = TempDir::new().unwrap();
        let result = result_with(Vec::new());

        let json = dir.path().join("out/result.json");
        save_result(&result, &json).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(parsed["run_id"], "run-1");

        let md = dir.path().join("result.md");
        save_result(&result, &md).unwrap();
        assert!(std::fs::read_to_string(&md).unwrap().starts_with("# Documentation Run run-1"));
    }

    #[tokio::test]
    async fn test_write_documents_respects_partial_flag() {
        use crate::types::Outcome;

        let dir = TempDir::new().unwrap();
        let store = FsDocumentStore::new(dir.path());
        let result = result_with(vec![
            with_content("README.md", Outcome::Accepted),
            with_content("docs/decisions.md", Outcome::Partial),
        ]);

        let written = write_documents(&store, &result, false).await.unwrap();
        assert_eq!(written.len(), 1);
        assert!(!dir.path().join("docs/decisions.md").exists());

        let written = write_documents(&store, &result, true).await.unwrap();
        assert_eq!(written.len(), 2);
        assert!(dir.path().join("docs/decisions.md").exists());
    }
}
