//! Cryptographic error types.

use thiserror::Error;

/// Errors that can occur during cryptographic operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Invalid nonce length.
    #[error("invalid nonce length: expected {expected}, got {actual}")]
    InvalidNonceLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Invalid hex encoding.
    #[error("invalid hex encoding")]
    InvalidHexEncoding,

    /// Encryption failed.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Decryption or authentication failed.
    ///
    /// Deliberately carries no detail: wrong key, tampered ciphertext and
    /// truncated input are indistinguishable to the caller.
    #[error("decryption failed")]
    DecryptionFailed,

    /// No configured key matches the requested key id.
    #[error("no key configured for key id {key_id}")]
    UnknownKeyId {
        /// Hex-encoded key id.
        key_id: String,
    },

    /// I/O error (e.g. reading/writing key files).
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
