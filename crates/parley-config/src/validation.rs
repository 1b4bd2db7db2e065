// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde attributes cannot express: non-empty addresses
//! and paths, chunk sizes aligned to the base64 quantum, and an upstream URL
//! whenever the relay runs live.

use crate::diagnostic::ConfigError;
use crate::model::ParleyConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every violation instead of failing fast.
pub fn validate_config(config: &ParleyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("server.host must not be empty"));
    } else if host.parse::<std::net::IpAddr>().is_err()
        && !host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        errors.push(ConfigError::validation(format!(
            "server.host `{host}` is not a valid IP address or hostname"
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let chunk_size = config.storage.chunk_size;
    if chunk_size == 0 || chunk_size % 4 != 0 {
        errors.push(ConfigError::validation(format!(
            "storage.chunk_size must be a positive multiple of 4, got {chunk_size}"
        )));
    }

    if config.storage.max_upload_bytes == 0 {
        errors.push(ConfigError::validation(
            "storage.max_upload_bytes must be greater than 0",
        ));
    }

    if config.storage.insert_retries < 1 {
        errors.push(ConfigError::validation(
            "storage.insert_retries must be at least 1",
        ));
    }

    if !config.relay.mock_mode {
        let base_url = config.agent.base_url.trim();
        if base_url.is_empty() {
            errors.push(ConfigError::validation(
                "agent.base_url is required unless relay.mock_mode = true",
            ));
        } else if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            errors.push(ConfigError::validation(format!(
                "agent.base_url `{base_url}` must start with http:// or https://"
            )));
        }
    }

    if config.relay.origin_application.trim().is_empty() {
        errors.push(ConfigError::validation(
            "relay.origin_application must not be empty",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_config() -> ParleyConfig {
        let mut config = ParleyConfig::default();
        config.relay.mock_mode = true;
        config
    }

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn mock_mode_defaults_validate() {
        assert!(validate_config(&mock_config()).is_ok());
    }

    #[test]
    fn live_mode_requires_base_url() {
        let errors = validate_config(&ParleyConfig::default()).unwrap_err();
        assert!(has_error(&errors, "agent.base_url"));
    }

    #[test]
    fn live_mode_with_base_url_validates() {
        let mut config = ParleyConfig::default();
        config.agent.base_url = "https://agents.example.com/v1".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn base_url_without_scheme_fails() {
        let mut config = ParleyConfig::default();
        config.agent.base_url = "agents.example.com".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "http://"));
    }

    #[test]
    fn chunk_size_must_align_to_base64_quantum() {
        let mut config = mock_config();
        config.storage.chunk_size = 299_999;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "chunk_size"));

        config.storage.chunk_size = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = mock_config();
        config.storage.database_path = "  ".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }

    #[test]
    fn all_violations_are_collected() {
        let mut config = ParleyConfig::default();
        config.server.host = String::new();
        config.storage.max_upload_bytes = 0;
        config.storage.insert_retries = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4, "got: {errors:?}");
    }

    #[test]
    fn hostname_with_slash_is_rejected() {
        let mut config = mock_config();
        config.server.host = "local/host".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "server.host"));
    }
}
