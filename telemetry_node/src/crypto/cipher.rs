use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::{AeadInPlace, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce, Tag};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;
/// GCM nonce length in bytes
pub const NONCE_LEN: usize = 12;
/// GCM authentication tag length in bytes
pub const TAG_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CipherError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),
}

/// Ciphertext (with trailing tag) and nonce as stored on the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload {
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
}

/// Shared-key cipher for reading payloads.
///
/// Opening is a pure function of `(ciphertext, nonce, key)`: no partial
/// plaintext is ever returned, and a tag mismatch, a malformed nonce, a
/// truncated ciphertext or a non-JSON plaintext are all `DecryptionFailed`.
#[derive(Clone)]
pub struct ReadingCipher {
    cipher: Aes256Gcm,
}

impl fmt::Debug for ReadingCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReadingCipher { key: <redacted> }")
    }
}

impl ReadingCipher {
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// Build a cipher from a hex-encoded 32-byte key (an optional `0x` prefix is accepted)
    pub fn from_hex(key_hex: &str) -> Result<Self, CipherError> {
        let trimmed = key_hex.trim();
        let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let bytes = Zeroizing::new(hex::decode(digits).map_err(|e| {
            CipherError::InvalidKey(format!("key must contain only hex characters: {e}"))
        })?);

        if bytes.len() != KEY_LEN {
            return Err(CipherError::InvalidKey(format!(
                "key must be {KEY_LEN} bytes ({} hex characters), got {} bytes",
                KEY_LEN * 2,
                bytes.len()
            )));
        }

        let cipher = Aes256Gcm::new_from_slice(&bytes)
            .map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Generate a fresh random key, hex-encoded
    pub fn generate_key_hex() -> String {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        OsRng.fill_bytes(&mut key[..]);
        hex::encode(&key[..])
    }

    /// Verify the trailing tag and recover the raw plaintext bytes
    pub fn open_bytes(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<Vec<u8>, CipherError> {
        if nonce.len() != NONCE_LEN {
            return Err(CipherError::DecryptionFailed(format!(
                "nonce must be {NONCE_LEN} bytes, got {}",
                nonce.len()
            )));
        }
        if ciphertext.len() <= TAG_LEN {
            return Err(CipherError::DecryptionFailed(format!(
                "ciphertext of {} bytes cannot hold a {TAG_LEN}-byte tag and a body",
                ciphertext.len()
            )));
        }

        let (body, tag) = ciphertext.split_at(ciphertext.len() - TAG_LEN);
        let mut buffer = body.to_vec();
        self.cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                b"",
                &mut buffer,
                Tag::from_slice(tag),
            )
            .map_err(|_| CipherError::DecryptionFailed("authentication tag mismatch".to_string()))?;

        Ok(buffer)
    }

    /// Verify, decrypt and parse the plaintext as a UTF-8 JSON document
    pub fn open<T: DeserializeOwned>(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<T, CipherError> {
        let plaintext = Zeroizing::new(self.open_bytes(ciphertext, nonce)?);
        let text = std::str::from_utf8(&plaintext)
            .map_err(|e| CipherError::DecryptionFailed(format!("plaintext is not UTF-8: {e}")))?;
        serde_json::from_str(text)
            .map_err(|e| CipherError::DecryptionFailed(format!("plaintext is not a valid reading: {e}")))
    }

    /// Serialize `value` as JSON and seal it under a fresh random nonce
    pub fn seal<T: Serialize>(&self, value: &T) -> Result<SealedPayload, CipherError> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        self.seal_with_nonce(value, &nonce)
    }

    /// Seal under a caller-chosen nonce. The caller must never reuse a nonce with the same key.
    pub fn seal_with_nonce<T: Serialize>(
        &self,
        value: &T,
        nonce: &[u8; NONCE_LEN],
    ) -> Result<SealedPayload, CipherError> {
        let mut buffer = serde_json::to_vec(value)
            .map_err(|e| CipherError::EncryptionFailed(format!("serialization failed: {e}")))?;

        let tag = self
            .cipher
            .encrypt_in_place_detached(Nonce::from_slice(nonce), b"", &mut buffer)
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;
        buffer.extend_from_slice(&tag);

        Ok(SealedPayload {
            ciphertext: buffer,
            nonce: nonce.to_vec(),
        })
    }
}
