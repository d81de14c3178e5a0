use std::path::PathBuf;
use thiserror::Error;
pub use turnlog_types::AppConfig;

pub const APP_NAME: &str = "turnlog";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(#[source] confy::ConfyError),
    #[error("failed to save config: {0}")]
    Save(#[source] confy::ConfyError),
    #[error("failed to locate config file: {0}")]
    Locate(#[source] confy::ConfyError),
}

/// Persistence for [`AppConfig`] through confy.
pub trait AppConfigExt: Sized {
    /// Load the stored config, falling back to defaults when it is unreadable.
    fn load() -> Self;
    fn try_load() -> Result<Self, ConfigError>;
    fn save(&self) -> Result<(), ConfigError>;
    fn config_path() -> Result<PathBuf, ConfigError>;
}

impl AppConfigExt for AppConfig {
    fn load() -> Self {
        Self::try_load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Using default configuration");
            AppConfig::default()
        })
    }

    fn try_load() -> Result<Self, ConfigError> {
        confy::load(APP_NAME, None).map_err(ConfigError::Load)
    }

    fn save(&self) -> Result<(), ConfigError> {
        confy::store(APP_NAME, None, self).map_err(ConfigError::Save)
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        confy::get_configuration_file_path(APP_NAME, None).map_err(ConfigError::Locate)
    }
}
