//! Key selection by key id.
//!
//! A [`Keyring`] holds exactly one primary key, which seals every new record,
//! plus any number of retired keys that may only open records tagged with
//! their id. Selection is strict: a record is opened with the single key its
//! id names, never by trying keys in turn.

use std::fmt;

use crate::error::{CryptoError, CryptoResult};
use crate::key::{KeyId, SealingKey};

/// The set of keys available to a vault.
pub struct Keyring {
    primary: SealingKey,
    retired: Vec<SealingKey>,
}

impl Keyring {
    /// Create a keyring with a single primary key.
    #[must_use]
    pub fn new(primary: SealingKey) -> Self {
        Self {
            primary,
            retired: Vec::new(),
        }
    }

    /// Add a retired (decrypt-only) key.
    ///
    /// A retired key with the same id as the primary key is ignored.
    #[must_use]
    pub fn with_retired(mut self, key: SealingKey) -> Self {
        let id = key.key_id();
        if id != self.primary.key_id() && !self.retired.iter().any(|k| k.key_id() == id) {
            self.retired.push(key);
        }
        self
    }

    /// The key used for all new encryptions.
    #[must_use]
    pub fn primary(&self) -> &SealingKey {
        &self.primary
    }

    /// Id of the primary key.
    #[must_use]
    pub fn primary_id(&self) -> KeyId {
        self.primary.key_id()
    }

    /// Select the key for a record.
    ///
    /// Untagged records (`None`) belong to the primary key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UnknownKeyId`] when no configured key has the id.
    pub fn select(&self, key_id: Option<&KeyId>) -> CryptoResult<&SealingKey> {
        let Some(wanted) = key_id else {
            return Ok(&self.primary);
        };
        if self.primary.key_id() == *wanted {
            return Ok(&self.primary);
        }
        self.retired
            .iter()
            .find(|k| k.key_id() == *wanted)
            .ok_or_else(|| CryptoError::UnknownKeyId {
                key_id: wanted.to_hex(),
            })
    }

    /// Number of keys (primary plus retired).
    #[must_use]
    pub fn len(&self) -> usize {
        self.retired.len().saturating_add(1)
    }

    /// Always `false`: a keyring has a primary key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Debug for Keyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let retired: Vec<String> = self.retired.iter().map(|k| k.key_id().to_hex()).collect();
        f.debug_struct("Keyring")
            .field("primary", &self.primary_id().to_hex())
            .field("retired", &retired)
            .finish()
    }
}
