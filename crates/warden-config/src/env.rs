//! Environment variable overrides.
//!
//! `WARDEN_*` variables override whatever the config files set. The legacy
//! `HITL_TIMEOUT_MS` and `RATE_LIMIT_MAX` are fallbacks: they only apply to
//! fields that neither a config file nor a `WARDEN_*` variable set.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// `WARDEN_*` overrides.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "WARDEN_APPROVAL_TTL_SECS",
        field_path: "approval.ttl_secs",
    },
    EnvMapping {
        var_name: "WARDEN_RATE_LIMIT_MAX",
        field_path: "rate_limit.max_requests",
    },
    EnvMapping {
        var_name: "WARDEN_RATE_LIMIT_WINDOW_SECS",
        field_path: "rate_limit.window_secs",
    },
    EnvMapping {
        var_name: "WARDEN_VAULT_DIR",
        field_path: "vault.dir",
    },
    EnvMapping {
        var_name: "WARDEN_VAULT_KEY_FILE",
        field_path: "vault.key_file",
    },
    EnvMapping {
        var_name: "WARDEN_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "WARDEN_LOG_FORMAT",
        field_path: "logging.format",
    },
];

/// Legacy variables, applied only to fields nothing else set.
const LEGACY_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "HITL_TIMEOUT_MS",
        field_path: "approval.ttl_secs",
    },
    EnvMapping {
        var_name: "RATE_LIMIT_MAX",
        field_path: "rate_limit.max_requests",
    },
];

/// Apply environment overrides, then legacy fallbacks.
///
/// Returns the number of variables applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a numeric variable does not parse.
pub fn apply_env_overrides<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var override"
            );
            apply(merged, sources, mapping, val)?;
            count = count.saturating_add(1);
        }
    }

    for mapping in LEGACY_MAPPINGS {
        let already_set = sources
            .get(mapping.field_path)
            .is_some_and(|layer| *layer != ConfigLayer::Defaults);
        if already_set {
            continue;
        }
        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying legacy env var fallback"
            );
            apply(merged, sources, mapping, val)?;
            count = count.saturating_add(1);
        }
    }

    Ok(count)
}

fn apply(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    mapping: &EnvMapping,
    val: &str,
) -> ConfigResult<()> {
    let toml_val = coerce_to_toml_value(mapping, val)?;
    set_field(merged, mapping.field_path, toml_val);
    sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
    Ok(())
}

/// Set a dotted field in the TOML tree, creating intermediate tables.
fn set_field(root: &mut toml::Value, path: &str, val: toml::Value) {
    let mut segments: Vec<&str> = path.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };

    let mut current = root;
    for segment in segments {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry(segment)
            .or_insert(toml::Value::Table(toml::map::Map::new()));
    }

    if let Some(table) = current.as_table_mut() {
        table.insert(leaf.to_owned(), val);
    }
}

/// Coerce a string env var value to the TOML type of its field.
fn coerce_to_toml_value(mapping: &EnvMapping, val: &str) -> ConfigResult<toml::Value> {
    let val = val.trim();
    let parse_int = || {
        val.parse::<u64>().map_err(|e| ConfigError::EnvError {
            var_name: mapping.var_name.to_owned(),
            message: format!("expected a non-negative integer, got '{val}': {e}"),
        })
    };

    match mapping.var_name {
        // Milliseconds, rounded up to whole seconds.
        "HITL_TIMEOUT_MS" => to_integer(mapping, parse_int()?.div_ceil(1000)),
        _ => match mapping.field_path {
            "approval.ttl_secs"
            | "rate_limit.max_requests"
            | "rate_limit.window_secs" => to_integer(mapping, parse_int()?),
            _ => Ok(toml::Value::String(val.to_owned())),
        },
    }
}

fn to_integer(mapping: &EnvMapping, n: u64) -> ConfigResult<toml::Value> {
    i64::try_from(n)
        .map(toml::Value::Integer)
        .map_err(|_| ConfigError::EnvError {
            var_name: mapping.var_name.to_owned(),
            message: format!("value {n} is out of range"),
        })
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
