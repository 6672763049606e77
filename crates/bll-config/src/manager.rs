//! Settings loader

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use tracing::debug;

use crate::{error::Result, types::BllSettings};

const ENV_PREFIX: &str = "BLL";

/// Loads [`BllSettings`] from a TOML file and the environment
///
/// Environment variables win over the file. Nested keys use a double
/// underscore, e.g. `BLL_HOOKS__FAILURE_POLICY=abort`.
pub struct SettingsLoader {
    config_path: PathBuf,
    env_prefix: String,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Create with custom config path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Override the environment prefix
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bll")
            .join("settings.toml")
    }

    /// Load, merge and validate settings. A missing file is not an error.
    pub fn load(&self) -> Result<BllSettings> {
        debug!(path = %self.config_path.display(), prefix = %self.env_prefix, "Loading settings");

        let settings: BllSettings = Config::builder()
            .add_source(
                File::from(self.config_path.clone())
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Write settings as TOML, creating parent directories
    pub fn save(&self, settings: &BllSettings) -> Result<()> {
        let toml = toml::to_string_pretty(settings)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, toml)?;
        Ok(())
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}
