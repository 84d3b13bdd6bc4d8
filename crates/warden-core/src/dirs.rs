//! Directory layout for Warden state.
//!
//! ```text
//! ~/.warden/                      (WardenHome, or $WARDEN_HOME)
//! ├── keys/
//! │   └── vault.key                 (AES-256 vault key, 0600)
//! ├── vault/                        (one encrypted record per principal, 0700)
//! └── config.toml                   (user configuration)
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// Global Warden home directory (`~/.warden/` or `$WARDEN_HOME`).
#[derive(Debug, Clone)]
pub struct WardenHome {
    root: PathBuf,
}

impl WardenHome {
    /// Resolve the home directory.
    ///
    /// Checks `$WARDEN_HOME` first, then falls back to `$HOME/.warden/`.
    ///
    /// # Errors
    ///
    /// Returns an error if `$WARDEN_HOME` is relative or neither variable is set.
    pub fn resolve() -> io::Result<Self> {
        let root = if let Ok(custom) = std::env::var("WARDEN_HOME") {
            let p = PathBuf::from(&custom);
            if !p.is_absolute() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "WARDEN_HOME must be an absolute path",
                ));
            }
            p
        } else {
            let home = std::env::var("HOME").map_err(|_| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    "neither WARDEN_HOME nor HOME environment variable is set",
                )
            })?;
            PathBuf::from(home).join(".warden")
        };

        Ok(Self { root })
    }

    /// Create from an explicit path (useful for testing).
    #[must_use]
    pub fn from_path(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Ensure the directory structure exists with owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation or permission setting fails.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(self.keys_dir())?;
        std::fs::create_dir_all(self.vault_dir())?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            std::fs::set_permissions(self.root(), perms.clone())?;
            std::fs::set_permissions(self.keys_dir(), perms.clone())?;
            std::fs::set_permissions(self.vault_dir(), perms)?;
        }
        Ok(())
    }

    /// Root directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys directory (`~/.warden/keys/`).
    #[must_use]
    pub fn keys_dir(&self) -> PathBuf {
        self.root.join("keys")
    }

    /// Path to the vault encryption key file.
    #[must_use]
    pub fn vault_key_path(&self) -> PathBuf {
        self.keys_dir().join("vault.key")
    }

    /// Credential vault directory (`~/.warden/vault/`).
    #[must_use]
    pub fn vault_dir(&self) -> PathBuf {
        self.root.join("vault")
    }

    /// Path to the user configuration file.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let home = WardenHome::from_path("/tmp/warden-test");
        assert_eq!(home.vault_dir(), PathBuf::from("/tmp/warden-test/vault"));
        assert_eq!(
            home.vault_key_path(),
            PathBuf::from("/tmp/warden-test/keys/vault.key")
        );
        assert_eq!(
            home.config_path(),
            PathBuf::from("/tmp/warden-test/config.toml")
        );
    }

    #[test]
    fn test_ensure_creates_private_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let home = WardenHome::from_path(dir.path().join("home"));
        home.ensure().unwrap();
        assert!(home.keys_dir().is_dir());
        assert!(home.vault_dir().is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(home.vault_dir())
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }
}
