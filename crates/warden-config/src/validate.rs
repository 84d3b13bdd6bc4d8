//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Longest approval lifetime accepted (24 hours).
pub const MAX_APPROVAL_TTL_SECS: u64 = 86_400;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_approval(config)?;
    validate_rate_limit(config)?;
    validate_sweeper(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_approval(config: &Config) -> ConfigResult<()> {
    let ttl = config.approval.ttl_secs;
    if ttl == 0 || ttl > MAX_APPROVAL_TTL_SECS {
        return Err(invalid(
            "approval.ttl_secs",
            format!("ttl_secs must be between 1 and {MAX_APPROVAL_TTL_SECS}, got {ttl}"),
        ));
    }
    Ok(())
}

fn validate_rate_limit(config: &Config) -> ConfigResult<()> {
    let r = &config.rate_limit;
    if r.max_requests == 0 {
        return Err(invalid("rate_limit.max_requests", "max_requests must be at least 1"));
    }
    if r.window_secs == 0 {
        return Err(invalid("rate_limit.window_secs", "window_secs must be at least 1"));
    }
    Ok(())
}

fn validate_sweeper(config: &Config) -> ConfigResult<()> {
    let s = &config.sweeper;
    if s.interval_secs == 0 {
        return Err(invalid("sweeper.interval_secs", "interval_secs must be at least 1"));
    }
    if s.bucket_idle_secs == 0 {
        return Err(invalid(
            "sweeper.bucket_idle_secs",
            "bucket_idle_secs must be at least 1",
        ));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;
    if !matches!(
        l.level.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}'; expected one of: trace, debug, info, warn, error",
                l.level
            ),
        ));
    }
    if !matches!(l.format.as_str(), "pretty" | "compact" | "json") {
        return Err(invalid(
            "logging.format",
            format!(
                "unknown format '{}'; expected one of: pretty, compact, json",
                l.format
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        validate(&Config::default()).unwrap();
    }

    #[test]
    fn test_ttl_bounds() {
        let mut config = Config::default();
        config.approval.ttl_secs = 0;
        assert!(validate(&config).is_err());

        config.approval.ttl_secs = MAX_APPROVAL_TTL_SECS;
        assert!(validate(&config).is_ok());

        config.approval.ttl_secs = MAX_APPROVAL_TTL_SECS + 1;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("approval.ttl_secs"));
    }

    #[test]
    fn test_zero_rate_limit_rejected() {
        let mut config = Config::default();
        config.rate_limit.max_requests = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.rate_limit.window_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_sweeper_interval_rejected() {
        let mut config = Config::default();
        config.sweeper.interval_secs = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_logging_values() {
        let mut config = Config::default();
        config.logging.level = "WARN".into();
        assert!(validate(&config).is_ok());

        config.logging.level = "loud".into();
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.logging.format = "xml".into();
        assert!(validate(&config).is_err());
    }
}
