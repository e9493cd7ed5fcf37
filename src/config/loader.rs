//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::CaptureConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Shared secret; an empty value disables authentication.
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_DB_PATH: &str = "CAPTURE_DB_PATH";
pub const ENV_BIND_ADDRESS: &str = "CAPTURE_BIND_ADDRESS";

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

/// Parse a TOML document into a config (no validation).
pub fn parse_config(content: &str) -> Result<CaptureConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Overlay environment variables on top of `config`.
pub fn apply_env_overrides<F>(config: &mut CaptureConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(ENV_API_KEY) {
        config.auth.api_key = key;
    }
    if let Some(path) = lookup(ENV_DB_PATH) {
        config.storage.path = path;
    }
    if let Some(addr) = lookup(ENV_BIND_ADDRESS) {
        config.listener.bind_address = addr;
    }
}

/// Load from an optional TOML file, apply process environment, validate.
pub fn load_config(path: Option<&Path>) -> Result<CaptureConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => CaptureConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config(
            r#"
            [auth]
            api_key = "abc123"

            [limits]
            max_body_bytes = 2048
            "#,
        )
        .unwrap();

        assert_eq!(config.auth.api_key, "abc123");
        assert_eq!(config.limits.max_body_bytes, 2048);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.storage.path, "./requests.db");
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = parse_config("[auth]\napi_key = \"from-file\"\n").unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_KEY, ""),
            (ENV_DB_PATH, "/tmp/other.db"),
        ]);

        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.auth.api_key, "");
        assert_eq!(config.storage.path, "/tmp/other.db");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        assert!(matches!(parse_config("[limits\n"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_from_file_validates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener]\nbind_address = \"not-an-address\"").unwrap();

        let err = load_config(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
