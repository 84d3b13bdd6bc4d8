//! Bridge from `warden_config::Config` to domain types.
//!
//! The config crate knows nothing about ledgers, governors or keys. This
//! module turns its plain sections into the types the safety layer takes,
//! and resolves the vault key, which never lives in the TOML itself.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use warden_approval::{RateLimitConfig, SweepConfig};
use warden_config::Config;
use warden_core::WardenHome;
use warden_crypto::{Keyring, SealingKey};
use warden_telemetry::{LogConfig, LogFormat};
use warden_vault::CredentialVault;

/// Environment variable holding the vault key as 64 hex characters.
pub const VAULT_KEY_VAR: &str = "WARDEN_VAULT_KEY";

/// Older name for [`VAULT_KEY_VAR`], still honored.
pub const LEGACY_VAULT_KEY_VAR: &str = "TOKEN_ENCRYPTION_KEY";

/// Where the vault key came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// An environment variable.
    Env(&'static str),
    /// A key file, created on first use.
    File(PathBuf),
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Env(var) => write!(f, "${var}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Convert the `[logging]` section, falling back to compact output on an
/// unknown format.
#[must_use]
pub fn to_log_config(config: &Config) -> LogConfig {
    LogConfig::from_section(&config.logging).unwrap_or_else(|_| {
        LogConfig::new(config.logging.level.clone()).with_format(LogFormat::Compact)
    })
}

/// Convert the `[rate_limit]` section.
#[must_use]
pub fn to_rate_limit_config(config: &Config) -> RateLimitConfig {
    RateLimitConfig::per_window(config.rate_limit.max_requests, config.rate_limit.window())
}

/// Convert the `[sweeper]` section.
#[must_use]
pub fn to_sweep_config(config: &Config) -> SweepConfig {
    SweepConfig {
        interval: config.sweeper.interval(),
        bucket_idle: config.sweeper.bucket_idle(),
    }
}

/// Approval lifetime from the `[approval]` section.
#[must_use]
pub fn approval_ttl(config: &Config) -> Duration {
    config.approval.ttl()
}

/// Vault directory: `[vault] dir`, else `<home>/vault`.
#[must_use]
pub fn vault_dir(config: &Config, home: &WardenHome) -> PathBuf {
    config.vault.dir.clone().unwrap_or_else(|| home.vault_dir())
}

/// Key file: `[vault] key_file`, else `<home>/keys/vault.key`.
#[must_use]
pub fn key_file(config: &Config, home: &WardenHome) -> PathBuf {
    config
        .vault
        .key_file
        .clone()
        .unwrap_or_else(|| home.vault_key_path())
}

/// Resolve the vault key from `env`, then the key file.
///
/// The key file is generated with owner-only permissions when missing.
///
/// # Errors
///
/// Fails if an environment key is malformed or the key file cannot be
/// read or created.
pub fn resolve_vault_key<S: ::std::hash::BuildHasher>(
    config: &Config,
    home: &WardenHome,
    env: &HashMap<String, String, S>,
) -> Result<(SealingKey, KeySource)> {
    for var in [VAULT_KEY_VAR, LEGACY_VAULT_KEY_VAR] {
        if let Some(value) = env.get(var).filter(|v| !v.trim().is_empty()) {
            let key = SealingKey::from_hex(value)
                .with_context(|| format!("{var} must be 64 hex characters"))?;
            return Ok((key, KeySource::Env(var)));
        }
    }

    let path = key_file(config, home);
    let key = SealingKey::load_or_generate(&path)
        .with_context(|| format!("failed to load vault key from {}", path.display()))?;
    Ok((key, KeySource::File(path)))
}

/// Open the vault with the resolved key as the only key.
///
/// # Errors
///
/// Fails if the key cannot be resolved or the vault directory cannot be
/// created.
pub fn open_vault<S: ::std::hash::BuildHasher>(
    config: &Config,
    home: &WardenHome,
    env: &HashMap<String, String, S>,
) -> Result<(CredentialVault, KeySource)> {
    let (key, source) = resolve_vault_key(config, home, env)?;
    let vault = open_vault_with(config, home, Keyring::new(key))?;
    Ok((vault, source))
}

/// Open the vault with an explicit keyring.
///
/// # Errors
///
/// Fails if the vault directory cannot be created.
pub fn open_vault_with(
    config: &Config,
    home: &WardenHome,
    keyring: Keyring,
) -> Result<CredentialVault> {
    let dir = vault_dir(config, home);
    CredentialVault::open(&dir, keyring)
        .with_context(|| format!("failed to open vault at {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_home() -> (tempfile::TempDir, WardenHome) {
        let dir = tempfile::tempdir().unwrap();
        let home = WardenHome::from_path(dir.path().join(".warden"));
        (dir, home)
    }

    #[test]
    fn test_section_conversions() {
        let mut config = Config::default();
        config.rate_limit.max_requests = 5;
        config.rate_limit.window_secs = 60;
        config.sweeper.interval_secs = 30;

        let limits = to_rate_limit_config(&config);
        assert_eq!(limits.capacity, 5);
        assert_eq!(limits.refill_tokens, 5);
        assert_eq!(limits.refill_period, Duration::from_secs(60));

        let sweep = to_sweep_config(&config);
        assert_eq!(sweep.interval, Duration::from_secs(30));
        assert_eq!(sweep.bucket_idle, Duration::from_secs(3600));

        assert_eq!(approval_ttl(&config), Duration::from_secs(300));
    }

    #[test]
    fn test_log_config_from_section() {
        let mut config = Config::default();
        config.logging.format = "json".into();
        config.logging.directives = vec!["warden_vault=debug".into()];

        let log = to_log_config(&config);
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.directives, vec!["warden_vault=debug"]);
    }

    #[test]
    fn test_paths_default_under_home() {
        let (_dir, home) = make_home();
        let config = Config::default();
        assert_eq!(vault_dir(&config, &home), home.vault_dir());
        assert_eq!(key_file(&config, &home), home.vault_key_path());

        let mut config = Config::default();
        config.vault.dir = Some(PathBuf::from("/srv/vault"));
        assert_eq!(vault_dir(&config, &home), PathBuf::from("/srv/vault"));
    }

    #[test]
    fn test_env_key_wins_over_file() {
        let (_dir, home) = make_home();
        let key = SealingKey::generate();
        let mut env = HashMap::new();
        env.insert(VAULT_KEY_VAR.to_owned(), key.expose_hex().to_string());
        env.insert(LEGACY_VAULT_KEY_VAR.to_owned(), "not hex".to_owned());

        let (resolved, source) = resolve_vault_key(&Config::default(), &home, &env).unwrap();
        assert_eq!(resolved.key_id(), key.key_id());
        assert_eq!(source, KeySource::Env(VAULT_KEY_VAR));
        assert!(!home.vault_key_path().exists());
    }

    #[test]
    fn test_legacy_env_key() {
        let (_dir, home) = make_home();
        let key = SealingKey::generate();
        let mut env = HashMap::new();
        env.insert(LEGACY_VAULT_KEY_VAR.to_owned(), key.expose_hex().to_string());

        let (_, source) = resolve_vault_key(&Config::default(), &home, &env).unwrap();
        assert_eq!(source, KeySource::Env(LEGACY_VAULT_KEY_VAR));
    }

    #[test]
    fn test_malformed_env_key_is_an_error() {
        let (_dir, home) = make_home();
        let mut env = HashMap::new();
        env.insert(VAULT_KEY_VAR.to_owned(), "abcd".to_owned());

        let err = resolve_vault_key(&Config::default(), &home, &env).unwrap_err();
        assert!(err.to_string().contains(VAULT_KEY_VAR));
    }

    #[test]
    fn test_key_file_generated_once() {
        let (_dir, home) = make_home();
        let env: HashMap<String, String> = HashMap::new();

        let (first, source) = resolve_vault_key(&Config::default(), &home, &env).unwrap();
        assert_eq!(source, KeySource::File(home.vault_key_path()));
        let (second, _) = resolve_vault_key(&Config::default(), &home, &env).unwrap();
        assert_eq!(first.key_id(), second.key_id());
    }

    #[test]
    fn test_open_vault_roundtrip() {
        let (_dir, home) = make_home();
        let env: HashMap<String, String> = HashMap::new();
        let principal = warden_core::PrincipalId::new("alice");

        let (vault, _) = open_vault(&Config::default(), &home, &env).unwrap();
        vault.save(&principal, b"token").unwrap();

        let (again, _) = open_vault(&Config::default(), &home, &env).unwrap();
        assert_eq!(&again.load(&principal).unwrap()[..], b"token");
    }
}
