//! # capstone-config
//!
//! Layered configuration loading for Capstone using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`CAPSTONE_*` prefix, `__` as separator)
//! 2. Project-level `.capstone/config.toml`
//! 3. User-level `~/.config/capstone/config.toml`
//! 4. Built-in defaults
//!
//! Figment maps `CAPSTONE_WORKFLOW__TEAM_CAPACITY` -> `workflow.team_capacity`,
//! `CAPSTONE_DATABASE__PATH` -> `database.path`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use capstone_config::CapstoneConfig;
//!
//! let config = CapstoneConfig::load_with_dotenv().expect("config");
//! println!("database at {}", config.database.path);
//! ```

mod database;
mod error;
mod notify;
mod workflow;

pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use notify::NotifyConfig;
pub use workflow::WorkflowConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CapstoneConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl CapstoneConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` on malformed sources and
    /// `ConfigError::InvalidValue` when [`Self::validate`] fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Build the figment provider chain.
    ///
    /// Public so tests and the CLI can add providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = PathBuf::from(".capstone/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment.merge(Env::prefixed("CAPSTONE_").split("__"))
    }

    /// Reject values the workflow cannot run with.
    ///
    /// # Errors
    ///
    /// `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workflow.team_capacity == 0 {
            return Err(ConfigError::invalid(
                "workflow.team_capacity",
                "must be at least 1",
            ));
        }
        if self.workflow.invitation_ttl_secs == 0 {
            return Err(ConfigError::invalid(
                "workflow.invitation_ttl_secs",
                "must be greater than zero",
            ));
        }
        if self.workflow.sweep_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "workflow.sweep_interval_secs",
                "must be greater than zero",
            ));
        }
        if self.workflow.title_max_chars == 0 || self.workflow.abstract_max_chars == 0 {
            return Err(ConfigError::invalid(
                "workflow.title_max_chars",
                "text limits must be greater than zero",
            ));
        }
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::invalid("database.path", "cannot be empty"));
        }
        Ok(())
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("capstone").join("config.toml"))
    }

    /// Load `.env` from the workspace root, falling back to the current dir.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = CapstoneConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.workflow.team_capacity, 2);
        assert!(!config.notify.has_outbox());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut config = CapstoneConfig::default();
        config.workflow.team_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("workflow.team_capacity"));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let mut config = CapstoneConfig::default();
        config.workflow.invitation_ttl_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
