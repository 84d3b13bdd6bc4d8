//! Layer tracking and deep merge of TOML trees.

use std::collections::HashMap;
use std::fmt;

/// Which layer set a configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    /// Compiled-in defaults (`defaults.toml`).
    Defaults,
    /// User configuration file.
    User,
    /// Environment variable override.
    Environment,
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Defaults => "defaults",
            Self::User => "user",
            Self::Environment => "env",
        })
    }
}

/// Dotted field path to the layer that last set it.
pub type FieldSources = HashMap<String, ConfigLayer>;

/// Recursively merge `overlay` into `base`, recording the layer of every
/// leaf the overlay sets.
///
/// Tables merge per key; scalars and arrays from the overlay replace the base.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join_path(prefix, key);
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                    record_layer(overlay_val, &path, layer, sources);
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            sources.insert(prefix.to_owned(), layer);
        },
    }
}

/// Mark every leaf under `val` as set by `layer`.
pub fn record_layer(val: &toml::Value, prefix: &str, layer: ConfigLayer, sources: &mut FieldSources) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            record_layer(child, &join_path(prefix, key), layer, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), layer);
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}
