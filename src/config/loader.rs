//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (platform config dir, e.g. ~/.config/docweave/config.toml)
//! 3. Project config (.docweave/config.toml)
//! 4. Environment variables (DOCWEAVE_* prefix, `__` between nested keys)

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::{Config, QualityMode};
use crate::types::{DocweaveError, Result};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        Self::load_with(Self::global_config_path(), Self::project_config_path())
    }

    /// Same chain with explicit file locations
    pub fn load_with(global: Option<PathBuf>, project: PathBuf) -> Result<Config> {
        let mut layers = Figment::new();

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            layers = layers.merge(Toml::file(&global_path));
        }

        if project.exists() {
            debug!("Loading project config from: {}", project.display());
            layers = layers.merge(Toml::file(&project));
        }

        // DOCWEAVE_QUALITY__PASS_THRESHOLD -> quality.pass_threshold
        layers = layers.merge(Env::prefixed("DOCWEAVE_").split("__").lowercase(true));

        Self::resolve(layers)
    }

    /// Load configuration from a specific file only
    pub fn load_from_file(path: &Path) -> Result<Config> {
        Self::resolve(Figment::new().merge(Toml::file(path)))
    }

    /// Defaults, shifted by the selected mode preset, under the given layers.
    /// Values the layers set explicitly win over the preset.
    fn resolve(layers: Figment) -> Result<Config> {
        let mode = layers
            .extract_inner::<QualityMode>("orchestration.mode")
            .unwrap_or_default();
        let mut defaults = Config::default();
        if mode != QualityMode::default() {
            debug!("Applying {} quality preset", mode);
            defaults.apply_mode(mode);
        }

        let config: Config = Figment::from(Serialized::defaults(defaults))
            .merge(layers)
            .extract()
            .map_err(|e| DocweaveError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    pub fn global_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "docweave").map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn project_config_path() -> PathBuf {
        PathBuf::from(".docweave/config.toml")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Render the effective configuration as TOML or JSON
    pub fn render(config: &Config, as_json: bool) -> Result<String> {
        if as_json {
            Ok(serde_json::to_string_pretty(config)?)
        } else {
            toml::to_string_pretty(config).map_err(|e| DocweaveError::Config(e.to_string()))
        }
    }

    /// Write a commented default config; returns the written path
    pub fn init(global: bool, force: bool) -> Result<PathBuf> {
        let path = if global {
            Self::global_config_path().ok_or_else(|| {
                DocweaveError::Config("Cannot determine global config directory".to_string())
            })?
        } else {
            Self::project_config_path()
        };

        if path.exists() && !force {
            info!("Config exists: {}", path.display());
            return Ok(path);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, Self::default_config_file()?)?;
        info!("Created config: {}", path.display());
        Ok(path)
    }

    fn default_config_file() -> Result<String> {
        let mut value = toml::Value::try_from(Config::default())
            .map_err(|e| DocweaveError::Config(e.to_string()))?;
        // Left to the mode preset unless the user pins them
        for (section, key) in [("orchestration", "max_attempts"), ("quality", "pass_threshold")] {
            if let Some(table) = value.get_mut(section).and_then(|v| v.as_table_mut()) {
                table.remove(key);
            }
        }
        let body =
            toml::to_string_pretty(&value).map_err(|e| DocweaveError::Config(e.to_string()))?;
        Ok(format!(
            "# docweave configuration\n\
             # Project settings in .docweave/config.toml override the global file.\n\
             # orchestration.mode picks quality.pass_threshold and orchestration.max_attempts\n\
             # unless they are set explicitly.\n\
             # Environment: DOCWEAVE_<SECTION>__<KEY>, e.g. DOCWEAVE_QUALITY__PASS_THRESHOLD=0.8\n\n{}",
            body
        ))
    }
}
