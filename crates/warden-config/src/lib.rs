#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Layered configuration for Warden.
//!
//! # Usage
//!
//! ```rust,no_run
//! use warden_config::Config;
//!
//! let resolved = Config::load().unwrap();
//! println!("approvals live for {}s", resolved.config.approval.ttl_secs);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment variables** (`WARDEN_*`)
//! 2. **User file** (`~/.warden/config.toml` or `$WARDEN_HOME/config.toml`)
//! 3. **Legacy variables** (`HITL_TIMEOUT_MS`, `RATE_LIMIT_MAX`)
//! 4. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! # Design
//!
//! This crate has no dependencies on other warden crates. Conversion from
//! config sections to ledger, governor and vault types happens in the binary.

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// Layered configuration merging.
pub mod merge;
/// Resolved configuration display.
pub mod show;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use merge::ConfigLayer;
pub use show::{ResolvedConfig, ShowFormat};
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the user file is malformed or the final
    /// configuration fails validation.
    pub fn load() -> ConfigResult<ResolvedConfig> {
        loader::load(None)
    }

    /// Load configuration treating `home_dir` as the `.warden` directory.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the user file is malformed or the final
    /// configuration fails validation.
    pub fn load_with_home(home_dir: &std::path::Path) -> ConfigResult<ResolvedConfig> {
        loader::load(Some(home_dir))
    }

    /// Load configuration with `path` as the user file. The file must exist.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is missing or malformed, or the
    /// final configuration fails validation.
    pub fn load_from(path: &std::path::Path) -> ConfigResult<ResolvedConfig> {
        loader::load_from(path)
    }

    /// Load configuration from a single file (no layering).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
    /// validation.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
