//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ServerConfig, ConfigError> {
    let config: ServerConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Replace the listener address and revalidate the result.
pub fn override_bind(mut config: ServerConfig, bind: String) -> Result<ServerConfig, ConfigError> {
    config.listener.bind_address = bind;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let config = parse_config(
            r#"
            [listener]
            bind_address = "127.0.0.1:3000"
            "#,
        )
        .unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:3000");
    }

    #[test]
    fn test_parse_reports_validation_errors() {
        let err = parse_config(
            r#"
            [dispatch]
            api_prefix = "api"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if e.len() == 1));
        assert!(err.to_string().starts_with("Validation failed: dispatch.api_prefix"));
    }

    #[test]
    fn test_parse_reports_syntax_errors() {
        assert!(matches!(parse_config("listener = ["), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_bind_override_is_validated() {
        let err = override_bind(ServerConfig::default(), "nowhere".into()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref e) if *e == vec![ValidationError::BindAddress("nowhere".into())]));

        let config = override_bind(ServerConfig::default(), "127.0.0.1:4100".into()).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:4100");
    }
}
