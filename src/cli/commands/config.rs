//! Config Command
//!
//! Manage docweave configuration.
//!
//! Usage:
//!   docweave config show [-f json]
//!   docweave config path
//!   docweave config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::{Config, ConfigLoader};
use crate::types::Result;

/// Show the effective configuration
pub fn show(config: &Config, format: &str) -> Result<()> {
    println!("{}", ConfigLoader::render(config, format == "json")?);
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    let output = Output::new();
    match ConfigLoader::global_config_path() {
        Some(global) => output.info(&format!(
            "Global:  {}{}",
            global.display(),
            if global.exists() { "" } else { " (not found)" }
        )),
        None => output.warning("Global:  cannot determine config directory"),
    }
    let project = ConfigLoader::project_config_path();
    output.info(&format!(
        "Project: {}{}",
        project.display(),
        if project.exists() { "" } else { " (not found)" }
    ));
    Ok(())
}

/// Write a default configuration file
pub fn init(global: bool, force: bool) -> Result<()> {
    let path = ConfigLoader::init(global, force)?;
    Output::new().success(&format!(
        "Initialized {} configuration",
        if global { "global" } else { "project" }
    ));
    println!("  Config:    {}", path.display());
    Ok(())
}
