//! AES-256 sealing keys with secure memory handling.

use std::fmt;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptoError, CryptoResult};

/// Key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Context string for deriving key fingerprints.
const KEY_ID_CONTEXT: &str = "warden-crypto sealing key id v1";

/// Short, non-secret key identifier (8 bytes).
///
/// Derived from the key with a BLAKE3 KDF, so it can be written next to
/// ciphertext and shown in logs without revealing key material.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyId([u8; 8]);

impl KeyId {
    /// Length of a key id in bytes.
    pub const LEN: usize = 8;

    /// Create from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Try to create from a slice.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] if the slice is not exactly 8 bytes.
    pub fn try_from_slice(slice: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; 8] = slice
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: Self::LEN,
                actual: slice.len(),
            })?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Encode as hex string.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", self.to_hex())
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for KeyId {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| CryptoError::InvalidHexEncoding)?;
        Self::try_from_slice(&bytes)
    }
}

/// A 256-bit symmetric key for sealing credential records.
///
/// The key bytes are zeroized on drop and never printed by `Debug`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SealingKey {
    bytes: [u8; KEY_LEN],
}

impl SealingKey {
    /// Generate a new random key from the OS CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Create from raw key bytes (32 bytes).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] if the slice is not exactly 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_LEN,
                actual: bytes.len(),
            });
        }
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(bytes);
        Ok(Self { bytes: key })
    }

    /// Parse a key from a 64-character hex string.
    ///
    /// Surrounding whitespace is ignored so values pasted into environment
    /// variables or files with a trailing newline still load.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidHexEncoding`] for non-hex input, or
    /// [`CryptoError::InvalidKeyLength`] if it does not decode to 32 bytes.
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let bytes =
            Zeroizing::new(hex::decode(s.trim()).map_err(|_| CryptoError::InvalidHexEncoding)?);
        Self::from_bytes(&bytes)
    }

    /// Export the key as hex (careful - sensitive!).
    #[must_use]
    pub fn expose_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.bytes))
    }

    /// Key identifier derived from the key material.
    #[must_use]
    pub fn key_id(&self) -> KeyId {
        let derived = Zeroizing::new(blake3::derive_key(KEY_ID_CONTEXT, &self.bytes));
        let mut id = [0u8; KeyId::LEN];
        id.copy_from_slice(&derived[..KeyId::LEN]);
        KeyId(id)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Load an existing key from a file, or generate and save a new one.
    ///
    /// The file holds the 32 raw key bytes. New files are created atomically
    /// with mode `0o600` on Unix; parent directories are created as needed.
    /// Symlinked key files are refused.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::IoError`] on I/O failures or symlink detection,
    /// or [`CryptoError::InvalidKeyLength`] if the file has the wrong length.
    pub fn load_or_generate(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CryptoError::IoError(e.to_string()))?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(0o600)
                .open(path)
            {
                Ok(mut file) => {
                    let key = Self::generate();
                    file.write_all(key.as_bytes())
                        .and_then(|()| file.sync_all())
                        .map_err(|e| CryptoError::IoError(e.to_string()))?;
                    return Ok(key);
                },
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {},
                Err(e) => return Err(CryptoError::IoError(e.to_string())),
            }
        }

        #[cfg(not(unix))]
        if !path.exists() {
            let key = Self::generate();
            std::fs::File::create(path)
                .and_then(|mut f| f.write_all(key.as_bytes()))
                .map_err(|e| CryptoError::IoError(e.to_string()))?;
            return Ok(key);
        }

        Self::load(path)
    }

    /// Load a key from an existing file.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::IoError`] if the file is missing, unreadable or
    /// a symlink, or [`CryptoError::InvalidKeyLength`] on a wrong-length file.
    pub fn load(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let path = path.as_ref();
        let meta =
            std::fs::symlink_metadata(path).map_err(|e| CryptoError::IoError(e.to_string()))?;
        if meta.file_type().is_symlink() {
            return Err(CryptoError::IoError(
                "refusing to read key file: path is a symlink".into(),
            ));
        }

        let bytes =
            Zeroizing::new(std::fs::read(path).map_err(|e| CryptoError::IoError(e.to_string()))?);
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SealingKey")
            .field("key_id", &self.key_id().to_hex())
            .finish_non_exhaustive()
    }
}
