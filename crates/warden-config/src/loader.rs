//! Config file discovery and layered loading.
//!
//! 1. Parse `defaults.toml` into the base tree
//! 2. Merge the user file (`~/.warden/config.toml`, `$WARDEN_HOME/config.toml`
//!    or an explicit path)
//! 3. Apply environment overrides
//! 4. Deserialize the merged tree into [`Config`] and validate it

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::env::{apply_env_overrides, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, record_layer};
use crate::show::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load configuration with the standard user file location.
///
/// `warden_home_override` is treated as the `.warden` directory itself and
/// bypasses `$WARDEN_HOME` and home directory discovery.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the user file is malformed, an environment
/// override does not parse, or the merged configuration fails validation.
pub fn load(warden_home_override: Option<&Path>) -> ConfigResult<ResolvedConfig> {
    let env_vars = collect_env_vars();
    let user_path = match warden_home_override {
        Some(h) => h.join("config.toml"),
        None => user_config_path(&env_vars)?,
    };
    load_layered(Some(&user_path), &env_vars)
}

/// Load configuration with an explicit user file in place of the standard
/// location. The file must exist.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, or the
/// merged configuration fails validation.
pub fn load_from(path: &Path) -> ConfigResult<ResolvedConfig> {
    if !path.exists() {
        return Err(ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
        });
    }
    load_layered(Some(path), &collect_env_vars())
}

/// Layered load with an explicit environment, for callers that must not
/// read the process environment.
///
/// # Errors
///
/// Same as [`load`].
pub fn load_layered<S: ::std::hash::BuildHasher>(
    user_path: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged = parse_defaults()?;
    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();

    record_layer(&merged, "", ConfigLayer::Defaults, &mut field_sources);

    if let Some(path) = user_path
        && let Some(overlay) = try_load_file(path)?
    {
        deep_merge_tracking(&mut merged, &overlay, "", ConfigLayer::User, &mut field_sources);
        loaded_files.push(path.display().to_string());
        info!(path = %path.display(), "loaded user config");
    }

    let env_count = apply_env_overrides(&mut merged, &mut field_sources, env_vars)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable overrides");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

/// Load a config from a specific file path (no layering).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let metadata = std::fs::metadata(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    check_size(path, metadata.len())?;

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

fn parse_defaults() -> ConfigResult<toml::Value> {
    toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
        path: "<embedded defaults>".to_owned(),
        source: e,
    })
}

fn check_size(path: &Path, len: u64) -> ConfigResult<()> {
    if len > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {len} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit"
            ),
        });
    }
    Ok(())
}

/// Try to load a file, returning `None` if the file doesn't exist.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    check_size(path, u64::try_from(content.len()).unwrap_or(u64::MAX))?;

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

/// `$WARDEN_HOME/config.toml` when set to an absolute path, otherwise
/// `~/.warden/config.toml`.
fn user_config_path<S: ::std::hash::BuildHasher>(
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<PathBuf> {
    if let Some(custom) = env_vars.get("WARDEN_HOME") {
        let p = PathBuf::from(custom);
        if p.is_absolute() {
            return Ok(p.join("config.toml"));
        }
        warn!(path = %custom, "WARDEN_HOME is not an absolute path; ignoring");
    }
    Ok(home_directory()?.join(".warden").join("config.toml"))
}

/// Determine the user's home directory.
fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}
