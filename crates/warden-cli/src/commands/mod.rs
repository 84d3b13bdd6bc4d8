//! Subcommand handlers.

pub(crate) mod config;
pub(crate) mod keys;
pub(crate) mod vault;

use std::collections::HashMap;

use warden_config::Config;
use warden_core::WardenHome;

/// Everything a handler needs: the resolved config, the home directory and
/// a snapshot of the environment.
pub(crate) struct CliContext {
    pub(crate) config: Config,
    pub(crate) home: WardenHome,
    pub(crate) env: HashMap<String, String>,
}

impl CliContext {
    /// Create the home directory layout if it is missing.
    pub(crate) fn ensure_home(&self) -> anyhow::Result<()> {
        self.home.ensure().map_err(|e| {
            anyhow::anyhow!(
                "failed to create warden home at {}: {e}",
                self.home.root().display()
            )
        })
    }
}
