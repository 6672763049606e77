//! Settings types and their defaults

use serde::{Deserialize, Serialize};

/// Top-level settings for the manager layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct BllSettings {
    /// Hook pipeline behaviour
    pub hooks: HookSettings,
    /// Manager defaults
    pub managers: ManagerSettings,
    /// External resource client behaviour
    pub external: ExternalSettings,
    /// Log output
    pub logging: LoggingSettings,
}

/// What the engine does when a hook fails and the hook declares no policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicySetting {
    /// Log the failure and keep going
    #[default]
    Isolate,
    /// Fail the call
    Abort,
}

/// Representation returned when a caller does not ask for one
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReturnTypeSetting {
    Db,
    #[default]
    Dict,
    Model,
}

/// Hook pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HookSettings {
    /// Default failure policy
    pub failure_policy: FailurePolicySetting,
    /// Treat a panicking hook as a failed hook instead of unwinding the call
    pub catch_panics: bool,
}

impl Default for HookSettings {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicySetting::Isolate,
            catch_panics: true,
        }
    }
}

/// Manager settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ManagerSettings {
    pub default_return_type: ReturnTypeSetting,
    /// Upper bound applied to every `limit`
    pub max_page_size: usize,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            default_return_type: ReturnTypeSetting::Dict,
            max_page_size: 1000,
        }
    }
}

/// External client settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ExternalSettings {
    /// Envelope error string that means "the entity does not exist"
    pub not_found_marker: String,
}

impl Default for ExternalSettings {
    fn default() -> Self {
        Self {
            // same text as bll_resources::NOT_FOUND_MARKER
            not_found_marker: "Not found".to_string(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive, e.g. `info` or `bll_hooks=debug,info`
    pub level: String,
    /// Emit target module paths
    pub with_target: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            with_target: false,
        }
    }
}

impl BllSettings {
    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.managers.max_page_size == 0 {
            return Err(crate::ConfigError::Validation(
                "managers.max_page_size must be greater than 0".to_string(),
            ));
        }
        if self.external.not_found_marker.trim().is_empty() {
            return Err(crate::ConfigError::Validation(
                "external.not_found_marker must not be empty".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(crate::ConfigError::Validation(
                "logging.level must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
