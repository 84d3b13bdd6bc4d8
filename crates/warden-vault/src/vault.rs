//! The credential vault.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use dashmap::DashMap;
use tracing::{debug, info, warn};
use warden_core::PrincipalId;
use warden_crypto::{CryptoError, KeyId, Keyring};
use zeroize::Zeroizing;

use crate::error::{VaultError, VaultResult};
use crate::record::EncryptedRecord;

/// File extension for credential records.
const RECORD_EXT: &str = "cred";

/// Hex characters of the principal digest used as the file stem.
const FILE_STEM_BYTES: usize = 16;

/// Encrypted per-principal credential store rooted at a directory.
///
/// Each principal maps to one file named after a digest of the principal id,
/// so arbitrary principal strings can never escape the vault directory.
/// Saves and deletes for the same principal are serialized; loads take the
/// same lock so they never observe a half-written record.
pub struct CredentialVault {
    root: PathBuf,
    keyring: Keyring,
    locks: DashMap<PrincipalId, Arc<Mutex<()>>>,
}

impl CredentialVault {
    /// Open (creating if needed) a vault directory.
    ///
    /// On Unix the directory is restricted to mode `0o700`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Io`] if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>, keyring: Keyring) -> VaultResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| VaultError::io(&root, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&root, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| VaultError::io(&root, e))?;
        }

        debug!(root = %root.display(), primary_key = %keyring.primary_id(), "Opened credential vault");

        Ok(Self {
            root,
            keyring,
            locks: DashMap::new(),
        })
    }

    /// The vault directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Id of the key new records are sealed with.
    #[must_use]
    pub fn primary_key_id(&self) -> KeyId {
        self.keyring.primary_id()
    }

    /// Encrypt and store `plaintext`, replacing any existing credential.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidPrincipal`] for a blank or oversized
    /// principal, [`VaultError::Encryption`] if sealing fails, or
    /// [`VaultError::Io`] if the record cannot be written.
    pub fn save(&self, principal: &PrincipalId, plaintext: &[u8]) -> VaultResult<()> {
        let path = self.record_path(principal)?;
        self.locked(principal, || self.write_record(principal, &path, plaintext))?;
        info!(principal = %principal, "Saved credential");
        Ok(())
    }

    /// Load and decrypt the credential for `principal`.
    ///
    /// The returned buffer is zeroized on drop.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::CredentialNotFound`] if nothing is stored, or
    /// [`VaultError::Decryption`] if the record is corrupt, was sealed by an
    /// unknown key, or fails authentication.
    pub fn load(&self, principal: &PrincipalId) -> VaultResult<Zeroizing<Vec<u8>>> {
        let path = self.record_path(principal)?;
        let (_, plaintext) = self.locked(principal, || self.read_record(principal, &path))?;
        debug!(principal = %principal, "Loaded credential");
        Ok(plaintext)
    }

    /// Remove the credential for `principal`.
    ///
    /// Returns `true` if a record was removed, `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Io`] if an existing record cannot be removed.
    pub fn delete(&self, principal: &PrincipalId) -> VaultResult<bool> {
        let path = self.record_path(principal)?;
        let removed = self.locked(principal, || match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(VaultError::io(&path, e)),
        })?;
        if removed {
            info!(principal = %principal, "Deleted credential");
        }
        Ok(removed)
    }

    /// Whether a record exists for `principal`. Does not decrypt it.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidPrincipal`] for an unusable principal or
    /// [`VaultError::Io`] if the file cannot be inspected.
    pub fn exists(&self, principal: &PrincipalId) -> VaultResult<bool> {
        let path = self.record_path(principal)?;
        match std::fs::symlink_metadata(&path) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(VaultError::io(&path, e)),
        }
    }

    /// Principals with a stored record, sorted.
    ///
    /// Reads each record header; the ciphertext is not decrypted. Files that
    /// do not parse as records are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Io`] if the vault directory cannot be read.
    pub fn list_principals(&self) -> VaultResult<Vec<PrincipalId>> {
        let mut principals = Vec::new();
        for path in self.record_files()? {
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable credential file");
                    continue;
                },
            };
            match EncryptedRecord::decode(&bytes) {
                Ok(record) => principals.push(record.principal),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping malformed credential file");
                },
            }
        }
        principals.sort();
        principals.dedup();
        Ok(principals)
    }

    /// Re-seal every record not already under the primary key.
    ///
    /// Used after rotating keys: configure the new key as primary and the old
    /// one as retired, call this, then drop the retired key. Returns the
    /// number of records rewritten.
    ///
    /// # Errors
    ///
    /// Stops at the first record that cannot be decrypted or rewritten.
    pub fn reencrypt_all(&self) -> VaultResult<usize> {
        let primary = self.keyring.primary_id();
        let mut rewritten: usize = 0;

        for principal in self.list_principals()? {
            let path = self.record_path(&principal)?;
            let resealed = self.locked(&principal, || {
                let (record, plaintext) = match self.read_record(&principal, &path) {
                    Ok(found) => found,
                    // Deleted since listing.
                    Err(VaultError::CredentialNotFound { .. }) => return Ok(false),
                    Err(e) => return Err(e),
                };
                if record.key_id == Some(primary) {
                    return Ok(false);
                }
                self.write_record(&principal, &path, &plaintext)?;
                Ok(true)
            })?;
            if resealed {
                rewritten = rewritten.saturating_add(1);
                debug!(principal = %principal, "Re-encrypted credential under primary key");
            }
        }

        info!(rewritten, primary_key = %primary, "Vault re-encryption complete");
        Ok(rewritten)
    }

    /// Path of the record file for `principal`.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidPrincipal`] for a blank or oversized id.
    pub fn record_path(&self, principal: &PrincipalId) -> VaultResult<PathBuf> {
        if principal.is_blank() {
            return Err(VaultError::InvalidPrincipal(
                "principal id must not be blank".into(),
            ));
        }
        if principal.as_str().len() > usize::from(u16::MAX) {
            return Err(VaultError::InvalidPrincipal(
                "principal id is too long".into(),
            ));
        }
        let digest = blake3::hash(principal.as_str().as_bytes());
        let stem = hex::encode(&digest.as_bytes()[..FILE_STEM_BYTES]);
        Ok(self.root.join(format!("{stem}.{RECORD_EXT}")))
    }

    /// Run `f` holding the lock for `principal`.
    ///
    /// The lock entry is dropped afterwards unless another caller holds it,
    /// so the map only grows with in-flight operations.
    fn locked<T>(&self, principal: &PrincipalId, f: impl FnOnce() -> T) -> T {
        let lock = Arc::clone(self.locks.entry(principal.clone()).or_default().value());
        let out = {
            let _guard = acquire(&lock);
            f()
        };
        drop(lock);
        // Clones are only taken under the shard lock `remove_if` holds.
        self.locks.remove_if(principal, |_, l| Arc::strong_count(l) == 1);
        out
    }

    #[cfg(test)]
    fn lock_count(&self) -> usize {
        self.locks.len()
    }

    fn read_record(
        &self,
        principal: &PrincipalId,
        path: &Path,
    ) -> VaultResult<(EncryptedRecord, Zeroizing<Vec<u8>>)> {
        let meta = match std::fs::symlink_metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VaultError::CredentialNotFound {
                    principal: principal.to_string(),
                });
            },
            Err(e) => return Err(VaultError::io(path, e)),
        };
        if meta.file_type().is_symlink() {
            return Err(VaultError::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "refusing to read credential: path is a symlink",
                ),
            ));
        }

        let bytes = std::fs::read(path).map_err(|e| VaultError::io(path, e))?;
        let decryption = |reason: String| VaultError::Decryption {
            principal: principal.to_string(),
            reason,
        };

        let record = EncryptedRecord::decode(&bytes).map_err(|e| decryption(e.to_string()))?;
        if record.principal != *principal {
            return Err(decryption("record belongs to another principal".into()));
        }

        let plaintext = record.open(&self.keyring).map_err(|e| match e {
            CryptoError::UnknownKeyId { key_id } => {
                decryption(format!("record sealed by unknown key {key_id}"))
            },
            _ => decryption("authentication failed".into()),
        })?;

        Ok((record, plaintext))
    }

    fn write_record(
        &self,
        principal: &PrincipalId,
        path: &Path,
        plaintext: &[u8],
    ) -> VaultResult<()> {
        let encryption = || VaultError::Encryption {
            principal: principal.to_string(),
        };
        let record = EncryptedRecord::seal(principal, plaintext, self.keyring.primary())
            .map_err(|_| encryption())?;
        let bytes = record.encode().map_err(|_| encryption())?;

        // Temp files are created 0600 in the vault directory so the rename
        // stays on one filesystem.
        let mut tmp =
            tempfile::NamedTempFile::new_in(&self.root).map_err(|e| VaultError::io(&self.root, e))?;
        tmp.write_all(&bytes)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| VaultError::io(tmp.path(), e))?;
        tmp.persist(path)
            .map_err(|e| VaultError::io(path, e.error))?;

        #[cfg(unix)]
        if let Ok(dir) = std::fs::File::open(&self.root) {
            // Best effort: make the rename durable.
            let _ = dir.sync_all();
        }

        Ok(())
    }

    fn record_files(&self) -> VaultResult<Vec<PathBuf>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| VaultError::io(&self.root, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| VaultError::io(&self.root, e))?;
            let path = entry.path();
            let is_record = path.extension().is_some_and(|ext| ext == RECORD_EXT);
            let is_file = entry.file_type().is_ok_and(|t| t.is_file());
            if is_record && is_file {
                files.push(path);
            }
        }
        Ok(files)
    }
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("root", &self.root)
            .field("keyring", &self.keyring)
            .finish_non_exhaustive()
    }
}

fn acquire(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|e| {
        warn!("Vault principal lock poisoned, recovering");
        e.into_inner()
    })
}
