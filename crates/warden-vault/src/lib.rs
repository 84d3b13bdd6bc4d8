//! Warden Vault - Encrypted credential storage.
//!
//! Persists long-lived authorization material (typically serialized OAuth
//! tokens) as one AES-256-GCM sealed record per principal. The vault never
//! interprets the plaintext; its format belongs to the caller.
//!
//! # Guarantees
//!
//! - Every save draws a fresh nonce and fully replaces the previous record
//!   via write-to-temp-then-rename.
//! - Loads fail closed: a missing record is [`VaultError::CredentialNotFound`]
//!   (re-authenticate), anything unreadable is [`VaultError::Decryption`]
//!   (configuration or corruption problem).
//! - Operations for one principal are serialized; different principals never
//!   wait on each other.
//!
//! # Example
//!
//! ```
//! use warden_core::PrincipalId;
//! use warden_crypto::{Keyring, SealingKey};
//! use warden_vault::{CredentialVault, VaultError};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let vault = CredentialVault::open(dir.path(), Keyring::new(SealingKey::generate())).unwrap();
//!
//! let u1 = PrincipalId::new("u1");
//! vault.save(&u1, b"secret").unwrap();
//! assert_eq!(vault.load(&u1).unwrap().as_slice(), b"secret");
//!
//! let missing = vault.load(&PrincipalId::new("u2"));
//! assert!(matches!(missing, Err(VaultError::CredentialNotFound { .. })));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod record;
pub mod vault;

pub use error::{VaultError, VaultResult};
pub use record::{EncryptedRecord, RecordError};
pub use vault::CredentialVault;
