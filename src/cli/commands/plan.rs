//! Plan Command
//!
//! Classify, select, and plan a change without generating anything.
//!
//! Usage:
//!   docweave plan --change change.yaml [--repo .] [--snapshot snap.json] [-f json]

use async_trait::async_trait;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::cli::ui::Output;
use crate::cli::util::{ChangeArgs, CommandContext};
use crate::config::Config;
use crate::orchestration::{GenerationCapability, PlanReport};
use crate::types::{DocweaveError, GenerationRequest, GenerationResult, Result};

pub fn run(args: &ChangeArgs, config: Config, format: &str) -> Result<()> {
    let ctx = CommandContext::load(args, config)?;
    let orchestrator = ctx.orchestrator_with(Arc::new(NoGeneration));

    let rt = Runtime::new()?;
    let report = rt.block_on(orchestrator.plan(&ctx.raw))?;
    render(&report, format)
}

fn render(report: &PlanReport, format: &str) -> Result<()> {
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(report)?),
        "yaml" => println!("{}", serde_yaml::to_string(report)?),
        _ => Output::new().plan_report(report),
    }
    Ok(())
}

/// Stand-in capability; planning never dispatches
struct NoGeneration;

#[async_trait]
impl GenerationCapability for NoGeneration {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResult> {
        Err(DocweaveError::unavailable(
            request.target_label(),
            "generation is disabled while planning",
        ))
    }

    fn name(&self) -> &str {
        "none"
    }
}
