//! Settings for the BLL manager layer
//!
//! Loads [`BllSettings`] from an optional TOML file and `BLL__`-style
//! environment variables, validates them, and installs the tracing subscriber
//! used by the other crates.

pub mod error;
pub mod logging;
pub mod manager;
pub mod types;

pub use error::{ConfigError, Result};
pub use logging::init_logging;
pub use manager::SettingsLoader;
pub use types::{
    BllSettings, ExternalSettings, FailurePolicySetting, HookSettings, LoggingSettings,
    ManagerSettings, ReturnTypeSetting,
};
