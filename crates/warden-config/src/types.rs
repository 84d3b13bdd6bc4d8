//! Configuration types.
//!
//! Plain data with no dependency on the other warden crates; conversion to
//! domain types happens where the binary wires components together. Every
//! section implements [`Default`] with the same values as `defaults.toml`.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Approval lifetime.
    pub approval: ApprovalSection,
    /// Per-principal rate limit.
    pub rate_limit: RateLimitSection,
    /// Background reclamation.
    pub sweeper: SweeperSection,
    /// Credential vault location.
    pub vault: VaultSection,
    /// Log output.
    pub logging: LoggingSection,
}

/// `[approval]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalSection {
    /// Seconds an approval stays valid.
    pub ttl_secs: u64,
}

impl ApprovalSection {
    /// Approval lifetime.
    #[must_use]
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for ApprovalSection {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

/// `[rate_limit]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    /// Requests allowed per window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimitSection {
    /// Window length.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 60,
        }
    }
}

/// `[sweeper]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperSection {
    /// Seconds between sweeps.
    pub interval_secs: u64,
    /// Seconds after which an untouched rate bucket is dropped.
    pub bucket_idle_secs: u64,
}

impl SweeperSection {
    /// Time between sweeps.
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Idle time before a rate bucket is dropped.
    #[must_use]
    pub fn bucket_idle(&self) -> Duration {
        Duration::from_secs(self.bucket_idle_secs)
    }
}

impl Default for SweeperSection {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            bucket_idle_secs: 3600,
        }
    }
}

/// `[vault]`
///
/// Only locations live here. The key itself is never read from TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultSection {
    /// Vault directory. Defaults to `<warden home>/vault`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Key file. Defaults to `<warden home>/keys/vault.key`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Default level: trace, debug, info, warn or error.
    pub level: String,
    /// Output format: pretty, compact or json.
    pub format: String,
    /// Extra filter directives such as `warden_vault=debug`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
