//! Vault error types.

use std::path::PathBuf;

/// Errors from credential vault operations.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// No credential is stored for the principal.
    #[error("no credential stored for principal {principal}")]
    CredentialNotFound {
        /// The principal that was looked up.
        principal: String,
    },

    /// The stored record could not be authenticated or parsed.
    #[error("failed to decrypt credential for {principal}: {reason}")]
    Decryption {
        /// The principal whose record failed.
        principal: String,
        /// What went wrong, without any plaintext or key detail.
        reason: String,
    },

    /// Sealing the credential failed.
    #[error("failed to encrypt credential for {principal}")]
    Encryption {
        /// The principal being saved.
        principal: String,
    },

    /// The principal id cannot be stored.
    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),

    /// Filesystem failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl VaultError {
    /// Whether the caller should send the user through authentication again.
    ///
    /// Only a missing credential is fixed by re-authenticating; decryption
    /// failures point at key configuration or on-disk corruption.
    #[must_use]
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, Self::CredentialNotFound { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;
