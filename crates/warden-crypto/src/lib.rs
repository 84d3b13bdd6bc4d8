//! Warden Crypto - Authenticated encryption for credentials at rest.
//!
//! This crate provides:
//! - AES-256-GCM sealing with a fresh random nonce on every call
//! - [`SealingKey`] with zeroize-on-drop key material and file loading
//! - [`Keyring`] for selecting a key by id during rotation
//!
//! Decryption fails closed: any authentication failure, wrong key, or
//! malformed input yields [`CryptoError::DecryptionFailed`] and no plaintext.
//!
//! # Example
//!
//! ```
//! use warden_crypto::{SealingKey, decrypt, encrypt};
//!
//! let key = SealingKey::generate();
//! let (nonce, ciphertext) = encrypt(b"refresh-token", &key).unwrap();
//!
//! let plaintext = decrypt(nonce.as_bytes(), &ciphertext, &key).unwrap();
//! assert_eq!(plaintext.as_slice(), b"refresh-token");
//!
//! let other = SealingKey::generate();
//! assert!(decrypt(nonce.as_bytes(), &ciphertext, &other).is_err());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod aead;
mod error;
mod key;
mod keyring;

pub use aead::{NONCE_LEN, Nonce, Sealed, TAG_LEN, decrypt, encrypt};
pub use error::{CryptoError, CryptoResult};
pub use key::{KEY_LEN, KeyId, SealingKey};
pub use keyring::Keyring;
