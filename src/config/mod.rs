//! Configuration loading and validation.
//!
//! All settings come from environment variables with sensible defaults;
//! missing or unparseable values silently fall back so the server always
//! starts with a usable configuration. Validation is a separate step that
//! rejects configurations which cannot work (zero or colliding ports).

mod settings;

pub use settings::ServerConfig;

use crate::error::ConfigError;

/// Loads the configuration from the environment and validates it.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when the resulting configuration is
/// unusable.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
    let config = ServerConfig::from_env();
    config.validate()?;
    Ok(config)
}
