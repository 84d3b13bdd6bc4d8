//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_crypto::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use warden_crypto::prelude::*;
//!
//! let key = SealingKey::generate();
//! let sealed = key.seal(b"token", b"context").unwrap();
//! let opened = key.open(&sealed.nonce, &sealed.ciphertext, b"context").unwrap();
//! assert_eq!(opened.as_slice(), b"token");
//! ```

// Errors
pub use crate::{CryptoError, CryptoResult};

// Keys
pub use crate::{KeyId, Keyring, SealingKey};

// Sealing
pub use crate::{Nonce, Sealed, decrypt, encrypt};
