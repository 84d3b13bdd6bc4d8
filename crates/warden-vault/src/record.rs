//! On-disk credential record format.
//!
//! ```text
//! magic      4 bytes   "WDNV"
//! version    1 byte    0x01
//! principal  u16 BE length + UTF-8 bytes
//! key_id     u8 length (0 or `KeyId::LEN`) + bytes
//! nonce      12 bytes
//! ciphertext u32 BE length + bytes (includes the 16-byte GCM tag)
//! ```
//!
//! Everything before the nonce is the record header and is bound into the
//! ciphertext as associated data. A record copied to another principal's
//! path, or relabelled with a different key id, fails authentication.

use warden_core::PrincipalId;
use warden_crypto::{CryptoResult, KeyId, Keyring, NONCE_LEN, Nonce, SealingKey};
use zeroize::Zeroizing;

/// File magic.
pub const MAGIC: &[u8; 4] = b"WDNV";

/// Current record format version.
pub const VERSION: u8 = 1;

/// Errors parsing or serializing a record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The file does not start with the record magic.
    #[error("not a credential record")]
    BadMagic,
    /// The record was written by an unknown format version.
    #[error("unsupported record version {0}")]
    UnsupportedVersion(u8),
    /// The record ended before a field was complete.
    #[error("record truncated")]
    Truncated,
    /// Bytes remain after the ciphertext.
    #[error("trailing bytes after record")]
    TrailingBytes,
    /// A field has an impossible value.
    #[error("malformed record field: {0}")]
    Malformed(&'static str),
    /// A field is too large for its length prefix.
    #[error("{0} too large to encode")]
    TooLarge(&'static str),
}

/// A sealed credential with its authenticated header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRecord {
    /// Principal the credential belongs to.
    pub principal: PrincipalId,
    /// Key that sealed the record. `None` means the keyring's primary key.
    pub key_id: Option<KeyId>,
    /// Per-record nonce.
    pub nonce: Nonce,
    /// Ciphertext with appended tag.
    pub ciphertext: Vec<u8>,
}

impl EncryptedRecord {
    /// Seal `plaintext` for `principal` under `key`, tagging the record with
    /// the key's id.
    ///
    /// # Errors
    ///
    /// Returns a crypto error if sealing fails, or
    /// [`CryptoError::EncryptionFailed`](warden_crypto::CryptoError::EncryptionFailed)
    /// if the principal is too long for the header.
    pub fn seal(principal: &PrincipalId, plaintext: &[u8], key: &SealingKey) -> CryptoResult<Self> {
        let key_id = Some(key.key_id());
        let aad = header(principal, key_id.as_ref())
            .map_err(|_| warden_crypto::CryptoError::EncryptionFailed)?;
        let sealed = key.seal(plaintext, &aad)?;
        Ok(Self {
            principal: principal.clone(),
            key_id,
            nonce: sealed.nonce,
            ciphertext: sealed.ciphertext,
        })
    }

    /// Open the record with the key its id names.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UnknownKeyId`](warden_crypto::CryptoError::UnknownKeyId)
    /// if the keyring has no such key, or
    /// [`CryptoError::DecryptionFailed`](warden_crypto::CryptoError::DecryptionFailed)
    /// if authentication fails.
    pub fn open(&self, keyring: &Keyring) -> CryptoResult<Zeroizing<Vec<u8>>> {
        let key = keyring.select(self.key_id.as_ref())?;
        let aad = header(&self.principal, self.key_id.as_ref())
            .map_err(|_| warden_crypto::CryptoError::DecryptionFailed)?;
        key.open(&self.nonce, &self.ciphertext, &aad)
    }

    /// Serialize to the on-disk layout.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::TooLarge`] when a field overflows its length prefix.
    pub fn encode(&self) -> Result<Vec<u8>, RecordError> {
        let mut out = header(&self.principal, self.key_id.as_ref())?;
        let ct_len =
            u32::try_from(self.ciphertext.len()).map_err(|_| RecordError::TooLarge("ciphertext"))?;
        out.reserve(
            NONCE_LEN
                .saturating_add(4)
                .saturating_add(self.ciphertext.len()),
        );
        out.extend_from_slice(self.nonce.as_bytes());
        out.extend_from_slice(&ct_len.to_be_bytes());
        out.extend_from_slice(&self.ciphertext);
        Ok(out)
    }

    /// Parse the on-disk layout.
    ///
    /// # Errors
    ///
    /// Returns a [`RecordError`] describing the first structural problem found.
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        let mut reader = Reader::new(bytes);

        if reader.take(MAGIC.len())? != MAGIC {
            return Err(RecordError::BadMagic);
        }
        let version = reader.u8()?;
        if version != VERSION {
            return Err(RecordError::UnsupportedVersion(version));
        }

        let principal_len = usize::from(reader.u16()?);
        let principal = std::str::from_utf8(reader.take(principal_len)?)
            .map_err(|_| RecordError::Malformed("principal is not UTF-8"))?;
        let principal = PrincipalId::new(principal);
        if principal.is_blank() {
            return Err(RecordError::Malformed("empty principal"));
        }

        let key_id = match usize::from(reader.u8()?) {
            0 => None,
            KeyId::LEN => Some(
                KeyId::try_from_slice(reader.take(KeyId::LEN)?)
                    .map_err(|_| RecordError::Malformed("key id"))?,
            ),
            _ => return Err(RecordError::Malformed("key id length")),
        };

        let nonce = Nonce::try_from_slice(reader.take(NONCE_LEN)?)
            .map_err(|_| RecordError::Malformed("nonce"))?;

        let ct_len = usize::try_from(reader.u32()?).map_err(|_| RecordError::Truncated)?;
        let ciphertext = reader.take(ct_len)?.to_vec();

        if !reader.is_empty() {
            return Err(RecordError::TrailingBytes);
        }

        Ok(Self {
            principal,
            key_id,
            nonce,
            ciphertext,
        })
    }
}

/// Build the authenticated header: magic, version, principal and key id.
fn header(principal: &PrincipalId, key_id: Option<&KeyId>) -> Result<Vec<u8>, RecordError> {
    let name = principal.as_str().as_bytes();
    let name_len = u16::try_from(name.len()).map_err(|_| RecordError::TooLarge("principal"))?;

    let mut out = Vec::with_capacity(
        MAGIC
            .len()
            .saturating_add(4)
            .saturating_add(name.len())
            .saturating_add(KeyId::LEN),
    );
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&name_len.to_be_bytes());
    out.extend_from_slice(name);
    match key_id {
        Some(id) => {
            let id_len = u8::try_from(KeyId::LEN).map_err(|_| RecordError::TooLarge("key id"))?;
            out.push(id_len);
            out.extend_from_slice(id.as_bytes());
        },
        None => out.push(0),
    }
    Ok(out)
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], RecordError> {
        let (head, rest) = self.buf.split_at_checked(n).ok_or(RecordError::Truncated)?;
        self.buf = rest;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], RecordError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, RecordError> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, RecordError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    fn u32(&mut self) -> Result<u32, RecordError> {
        Ok(u32::from_be_bytes(self.array()?))
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use warden_crypto::CryptoError;

    use super::*;

    fn sealed(principal: &str) -> (EncryptedRecord, Keyring) {
        let key = SealingKey::generate();
        let record = EncryptedRecord::seal(&PrincipalId::new(principal), b"token", &key).unwrap();
        (record, Keyring::new(key))
    }

    #[test]
    fn test_encode_layout() {
        let (record, _) = sealed("u1");
        let bytes = record.encode().unwrap();

        assert_eq!(&bytes[..4], b"WDNV");
        assert_eq!(bytes[4], VERSION);
        assert_eq!(&bytes[5..7], &2u16.to_be_bytes());
        assert_eq!(&bytes[7..9], b"u1");
        assert_eq!(usize::from(bytes[9]), KeyId::LEN);
        assert_eq!(&bytes[10..10 + KeyId::LEN], record.key_id.as_ref().unwrap().as_bytes());
        // header + key id + nonce + len + (5 plaintext + 16 tag)
        assert_eq!(bytes.len(), 10 + KeyId::LEN + NONCE_LEN + 4 + 21);
    }

    #[test]
    fn test_decode_then_open() {
        let (record, ring) = sealed("alice@example.com");
        let parsed = EncryptedRecord::decode(&record.encode().unwrap()).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(parsed.open(&ring).unwrap().as_slice(), b"token");
    }

    #[test]
    fn test_decode_rejects_structural_damage() {
        let (record, _) = sealed("u1");
        let bytes = record.encode().unwrap();

        assert_eq!(
            EncryptedRecord::decode(b"NOPE"),
            Err(RecordError::BadMagic)
        );
        assert_eq!(EncryptedRecord::decode(&bytes[..3]), Err(RecordError::Truncated));
        assert_eq!(
            EncryptedRecord::decode(&bytes[..bytes.len() - 1]),
            Err(RecordError::Truncated)
        );

        let mut versioned = bytes.clone();
        versioned[4] = 9;
        assert_eq!(
            EncryptedRecord::decode(&versioned),
            Err(RecordError::UnsupportedVersion(9))
        );

        let mut trailing = bytes.clone();
        trailing.push(0);
        assert_eq!(
            EncryptedRecord::decode(&trailing),
            Err(RecordError::TrailingBytes)
        );

        let mut bad_key_len = bytes;
        bad_key_len[9] = 3;
        assert!(matches!(
            EncryptedRecord::decode(&bad_key_len),
            Err(RecordError::Malformed(_))
        ));
    }

    #[test]
    fn test_header_is_authenticated() {
        let (record, ring) = sealed("u1");

        let mut moved = record.clone();
        moved.principal = PrincipalId::new("u2");
        assert!(matches!(moved.open(&ring), Err(CryptoError::DecryptionFailed)));

        let mut untagged = record;
        untagged.key_id = None;
        assert!(matches!(
            untagged.open(&ring),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_open_with_unknown_key_id() {
        let (record, _) = sealed("u1");
        let other = Keyring::new(SealingKey::generate());
        assert!(matches!(
            record.open(&other),
            Err(CryptoError::UnknownKeyId { .. })
        ));
    }
}
