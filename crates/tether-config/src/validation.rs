//! Configuration validation.
//!
//! Collects every problem into a single `ConfigError` instead of stopping
//! at the first one.

use crate::schema::TetherConfig;
use tether_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &TetherConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    validate_window(&mut errors, config);
    validate_bridge(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

fn validate_window(errors: &mut Vec<String>, config: &TetherConfig) {
    validate_positive(errors, "window.width", config.window.width as i64);
    validate_positive(errors, "window.height", config.window.height as i64);
}

fn validate_bridge(errors: &mut Vec<String>, config: &TetherConfig) {
    validate_positive(
        errors,
        "bridge.first_child_id",
        config.bridge.first_child_id as i64,
    );
    if config.bridge.call_timeout_ms == 0 {
        errors.push("bridge.call_timeout_ms must be > 0".into());
    }
}

/// Push an error if `value` is not strictly positive.
fn validate_positive(errors: &mut Vec<String>, name: &str, value: i64) {
    if value <= 0 {
        errors.push(format!("{name} = {value} must be > 0"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&TetherConfig::default()).is_ok());
    }

    #[test]
    fn zero_size_is_invalid() {
        let mut config = TetherConfig::default();
        config.window.width = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("window.width"));
    }

    #[test]
    fn non_positive_first_child_id_is_invalid() {
        let mut config = TetherConfig::default();
        config.bridge.first_child_id = -1;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("bridge.first_child_id = -1"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = TetherConfig::default();
        config.window.height = 0;
        config.bridge.first_child_id = 0;
        config.bridge.call_timeout_ms = 0;

        let msg = validate(&config).unwrap_err().to_string();
        assert!(msg.contains("window.height"));
        assert!(msg.contains("bridge.first_child_id"));
        assert!(msg.contains("bridge.call_timeout_ms"));
    }
}
