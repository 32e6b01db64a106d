//! Configuration validation utilities.
//!
//! These checks reject documents the dispatcher could not run at all. Entries
//! the dispatcher merely skips (a bad trigger, an unknown method) are left to
//! it, since it logs them with more context.

use std::collections::HashSet;

use jibber_framework::ClientConfig;
use tracing::warn;

use super::error::{ConfigError, ConfigResult};
use super::schema::{JibberConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &JibberConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_client_config(&config.client)?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(config: &LoggingConfig) -> ConfigResult<()> {
    if config.output == LogOutput::File && config.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    for module in config.filters.keys() {
        if module.is_empty() || module.contains(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Invalid log filter target: '{module}'"
            )));
        }
    }

    Ok(())
}

/// Validates dispatcher settings.
fn validate_client_config(config: &ClientConfig) -> ConfigResult<()> {
    if config.nickname.is_empty() {
        return Err(ConfigError::missing_field("client.nickname"));
    }

    if config.commentary_qsize == 0 {
        return Err(ConfigError::validation(
            "commentary_qsize must be greater than 0",
        ));
    }

    if config.commands_max_match == 0 {
        return Err(ConfigError::validation(
            "commands_max_match must be greater than 0",
        ));
    }

    let mut seen_aliases = HashSet::new();
    for (index, package) in config.packages.iter().enumerate() {
        if package.package.is_empty() {
            return Err(ConfigError::missing_field(format!(
                "client.packages[{index}].package"
            )));
        }

        if !seen_aliases.insert(package.alias()) {
            warn!(
                alias = package.alias(),
                "Duplicate handler alias; the later package replaces the earlier one"
            );
        }
    }

    Ok(())
}
