//! AES-256-GCM sealing.
//!
//! Every call to [`SealingKey::seal`] draws a fresh 96-bit nonce from the OS
//! CSPRNG. Nonces are never derived from the plaintext, the principal, or a
//! counter, so two sealings of the same input under the same key never share
//! a nonce (up to the random-collision bound of GCM).

use std::fmt;

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::error::{CryptoError, CryptoResult};
use crate::key::SealingKey;

/// Nonce length in bytes (96-bit GCM nonce).
pub const NONCE_LEN: usize = 12;

/// Authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// A per-record GCM nonce.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce([u8; NONCE_LEN]);

impl Nonce {
    fn random() -> Self {
        let mut bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Try to create from a slice read back from storage.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidNonceLength`] if the slice is not 12 bytes.
    pub fn try_from_slice(slice: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; NONCE_LEN] =
            slice
                .try_into()
                .map_err(|_| CryptoError::InvalidNonceLength {
                    expected: NONCE_LEN,
                    actual: slice.len(),
                })?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce({})", hex::encode(self.0))
    }
}

/// Output of a sealing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Nonce used for this ciphertext.
    pub nonce: Nonce,
    /// Ciphertext followed by the 16-byte authentication tag.
    pub ciphertext: Vec<u8>,
}

impl SealingKey {
    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.as_bytes()))
    }

    /// Encrypt and authenticate `plaintext`, binding `aad` into the tag.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::EncryptionFailed`] if the cipher rejects the input.
    pub fn seal(&self, plaintext: &[u8], aad: &[u8]) -> CryptoResult<Sealed> {
        let nonce = Nonce::random();
        let ciphertext = self
            .cipher()
            .encrypt(
                aes_gcm::Nonce::from_slice(nonce.as_bytes()),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| CryptoError::EncryptionFailed)?;
        Ok(Sealed { nonce, ciphertext })
    }

    /// Verify and decrypt `ciphertext` sealed with [`seal`](Self::seal).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::DecryptionFailed`] on any authentication failure:
    /// wrong key, modified ciphertext or tag, different `aad`, or input too
    /// short to contain a tag. No plaintext is returned in that case.
    pub fn open(
        &self,
        nonce: &Nonce,
        ciphertext: &[u8],
        aad: &[u8],
    ) -> CryptoResult<Zeroizing<Vec<u8>>> {
        if ciphertext.len() < TAG_LEN {
            return Err(CryptoError::DecryptionFailed);
        }
        self.cipher()
            .decrypt(
                aes_gcm::Nonce::from_slice(nonce.as_bytes()),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::DecryptionFailed)
    }
}

/// Encrypt `plaintext` under `key` with a fresh random nonce.
///
/// Returns the nonce and the ciphertext with its appended tag.
///
/// # Errors
///
/// Returns [`CryptoError::EncryptionFailed`] if the cipher rejects the input.
pub fn encrypt(plaintext: &[u8], key: &SealingKey) -> CryptoResult<(Nonce, Vec<u8>)> {
    let sealed = key.seal(plaintext, &[])?;
    Ok((sealed.nonce, sealed.ciphertext))
}

/// Decrypt a ciphertext produced by [`encrypt`].
///
/// # Errors
///
/// Returns [`CryptoError::DecryptionFailed`] for a malformed nonce, a wrong
/// key, or any tampering.
pub fn decrypt(
    nonce: &[u8],
    ciphertext: &[u8],
    key: &SealingKey,
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let nonce = Nonce::try_from_slice(nonce).map_err(|_| CryptoError::DecryptionFailed)?;
    key.open(&nonce, ciphertext, &[])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let key = SealingKey::generate();
        for plaintext in [&b""[..], b"x", b"{\"refresh_token\":\"1//abc\"}", &[0u8; 4096]] {
            let (nonce, ciphertext) = encrypt(plaintext, &key).unwrap();
            assert_eq!(ciphertext.len(), plaintext.len() + TAG_LEN);
            let opened = decrypt(nonce.as_bytes(), &ciphertext, &key).unwrap();
            assert_eq!(opened.as_slice(), plaintext);
        }
    }

    #[test]
    fn test_fresh_nonce_every_call() {
        let key = SealingKey::generate();
        let (n1, c1) = encrypt(b"same plaintext", &key).unwrap();
        let (n2, c2) = encrypt(b"same plaintext", &key).unwrap();
        assert_ne!(n1, n2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_wrong_key_fails() {
        let key = SealingKey::generate();
        let other = SealingKey::generate();
        let (nonce, ciphertext) = encrypt(b"secret", &key).unwrap();
        assert!(matches!(
            decrypt(nonce.as_bytes(), &ciphertext, &other),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_every_single_bit_flip_fails() {
        let key = SealingKey::generate();
        let (nonce, ciphertext) = encrypt(b"oauth refresh token", &key).unwrap();

        for byte in 0..ciphertext.len() {
            for bit in 0..8 {
                let mut tampered = ciphertext.clone();
                tampered[byte] ^= 1 << bit;
                assert!(
                    decrypt(nonce.as_bytes(), &tampered, &key).is_err(),
                    "flip of byte {byte} bit {bit} was accepted"
                );
            }
        }
    }

    #[test]
    fn test_nonce_tamper_fails() {
        let key = SealingKey::generate();
        let (nonce, ciphertext) = encrypt(b"secret", &key).unwrap();
        let mut bad = *nonce.as_bytes();
        bad[0] ^= 0x01;
        assert!(decrypt(&bad, &ciphertext, &key).is_err());
    }

    #[test]
    fn test_malformed_input_fails_closed() {
        let key = SealingKey::generate();
        let (nonce, ciphertext) = encrypt(b"secret", &key).unwrap();

        // Short nonce
        assert!(matches!(
            decrypt(&nonce.as_bytes()[..8], &ciphertext, &key),
            Err(CryptoError::DecryptionFailed)
        ));
        // Truncated below tag length
        assert!(matches!(
            decrypt(nonce.as_bytes(), &ciphertext[..TAG_LEN - 1], &key),
            Err(CryptoError::DecryptionFailed)
        ));
        // Truncated plaintext portion
        assert!(decrypt(nonce.as_bytes(), &ciphertext[1..], &key).is_err());
        // Empty
        assert!(decrypt(nonce.as_bytes(), &[], &key).is_err());
    }

    #[test]
    fn test_associated_data_is_bound() {
        let key = SealingKey::generate();
        let sealed = key.seal(b"token", b"principal:u1").unwrap();

        assert!(key.open(&sealed.nonce, &sealed.ciphertext, b"principal:u1").is_ok());
        assert!(matches!(
            key.open(&sealed.nonce, &sealed.ciphertext, b"principal:u2"),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_nonce_from_slice() {
        assert!(Nonce::try_from_slice(&[0u8; NONCE_LEN]).is_ok());
        assert!(matches!(
            Nonce::try_from_slice(&[0u8; 24]),
            Err(CryptoError::InvalidNonceLength {
                expected: 12,
                actual: 24
            })
        ));
    }
}
