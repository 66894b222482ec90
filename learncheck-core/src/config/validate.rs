//! Configuration validation rules.

use super::schema::Config;

/// Validate configuration and return aggregated validation errors.
pub fn validate_config(config: &Config) -> crate::Result<()> {
    let mut errors = Vec::new();

    if config.session.base_url.trim().is_empty() {
        errors.push("session.base_url must not be empty".to_string());
    }
    if config.session.api_key.trim().is_empty() {
        errors.push("session.api_key is required".to_string());
    }
    if config.learning_check.default_time_limit_secs == 0 {
        errors.push("learning_check.default_time_limit_secs must be > 0".to_string());
    }
    if !config.devices.require_camera && !config.devices.require_microphone {
        errors.push(
            "devices: at least one of require_camera or require_microphone must be enabled"
                .to_string(),
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::Error::Validation(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.session.api_key = "sk-test".to_string();
        config
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let config = Config::default();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("session.api_key"));
    }

    #[test]
    fn test_zero_time_limit_rejected() {
        let mut config = valid_config();
        config.learning_check.default_time_limit_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("default_time_limit_secs"));
    }

    #[test]
    fn test_no_device_requirement_rejected() {
        let mut config = valid_config();
        config.devices.require_camera = false;
        config.devices.require_microphone = false;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("require_camera"));
    }

    #[test]
    fn test_errors_are_aggregated() {
        let mut config = Config::default();
        config.session.base_url = "  ".to_string();
        config.learning_check.default_time_limit_secs = 0;
        let err = validate_config(&config).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("session.base_url"));
        assert!(text.contains("session.api_key"));
        assert!(text.contains("default_time_limit_secs"));
    }
}
