//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{ChimeConfig, DispatcherConfig, LogOutput, LoggingConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &ChimeConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_dispatcher_config(&config.dispatcher)?;
    Ok(())
}

fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when logging.output is 'file'",
        ));
    }

    if let Some(module) = logging.filters.keys().find(|m| m.trim().is_empty()) {
        return Err(ConfigError::validation(format!(
            "Invalid logging filter module: {module:?}"
        )));
    }

    Ok(())
}

fn validate_dispatcher_config(dispatcher: &DispatcherConfig) -> ConfigResult<()> {
    for prefix in &dispatcher.prefixes {
        if prefix.is_empty() {
            return Err(ConfigError::validation("Command prefixes cannot be empty"));
        }
        if prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::validation(format!(
                "Command prefix {prefix:?} cannot contain whitespace"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        assert!(validate_config(&ChimeConfig::default()).is_ok());
    }

    #[test]
    fn test_file_output_requires_path() {
        let mut config = ChimeConfig::default();
        config.logging.output = LogOutput::File;
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError { .. })
        ));

        config.logging.file_path = Some("logs/chime.log".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_bad_prefixes() {
        let mut config = ChimeConfig::default();
        config.dispatcher.prefixes = vec![String::new()];
        assert!(validate_config(&config).is_err());

        config.dispatcher.prefixes = vec!["! ".into()];
        assert!(validate_config(&config).is_err());

        // No prefixes at all is fine: only slash commands are served.
        config.dispatcher.prefixes.clear();
        assert!(validate_config(&config).is_ok());
    }
}
