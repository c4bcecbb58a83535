//! At-rest encryption for sensitive journal fields.
//!
//! ChaCha20-Poly1305 with a fresh random 96-bit nonce per call; the sealed
//! form is `base64(nonce || ciphertext)`. The nonce travels with the
//! ciphertext, so no per-row key material is stored anywhere else.

use crate::error::{InsightError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::rngs::OsRng;

const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

#[derive(Clone)]
pub struct FieldCipher {
    cipher: ChaCha20Poly1305,
}

impl FieldCipher {
    /// Build from a base64-encoded 32-byte key.
    pub fn from_base64(key_b64: &str) -> Result<Self> {
        let key_bytes = BASE64
            .decode(key_b64.trim())
            .map_err(|e| InsightError::Crypto(format!("field key is not valid base64: {e}")))?;
        if key_bytes.len() != KEY_LEN {
            return Err(InsightError::Crypto(format!(
                "field key must be {KEY_LEN} bytes, got {}",
                key_bytes.len()
            )));
        }
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key_bytes)),
        })
    }

    /// Generate a random key. Returns the cipher and the base64 key so the
    /// caller can persist it; sealed data is unreadable without it.
    pub fn generate() -> (Self, String) {
        let key = ChaCha20Poly1305::generate_key(&mut OsRng);
        let cipher = Self {
            cipher: ChaCha20Poly1305::new(&key),
        };
        (cipher, BASE64.encode(key))
    }

    pub fn seal(&self, plaintext: &str) -> Result<String> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| InsightError::Crypto(format!("encryption failed: {e}")))?;
        let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(sealed))
    }

    pub fn open(&self, sealed: &str) -> Result<String> {
        let bytes = BASE64
            .decode(sealed)
            .map_err(|e| InsightError::Crypto(format!("sealed field is not valid base64: {e}")))?;
        if bytes.len() < NONCE_LEN {
            return Err(InsightError::Crypto("sealed field too short".to_string()));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|e| InsightError::Crypto(format!("decryption failed: {e}")))?;
        String::from_utf8(plaintext)
            .map_err(|e| InsightError::Crypto(format!("decrypted field is not UTF-8: {e}")))
    }
}

impl std::fmt::Debug for FieldCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FieldCipher")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_open_round_trip() {
        let (cipher, _) = FieldCipher::generate();
        let sealed = cipher.seal("Today I wrote about the ocean.").unwrap();
        assert_ne!(sealed, "Today I wrote about the ocean.");
        assert_eq!(cipher.open(&sealed).unwrap(), "Today I wrote about the ocean.");
    }

    #[test]
    fn nonces_differ_between_calls() {
        let (cipher, _) = FieldCipher::generate();
        let a = cipher.seal("same plaintext").unwrap();
        let b = cipher.seal("same plaintext").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn key_round_trips_through_base64() {
        let (cipher, key) = FieldCipher::generate();
        let sealed = cipher.seal("persisted").unwrap();
        let reloaded = FieldCipher::from_base64(&key).unwrap();
        assert_eq!(reloaded.open(&sealed).unwrap(), "persisted");
    }

    #[test]
    fn wrong_key_fails_to_open() {
        let (cipher, _) = FieldCipher::generate();
        let (other, _) = FieldCipher::generate();
        let sealed = cipher.seal("secret").unwrap();
        assert!(other.open(&sealed).is_err());
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let (cipher, _) = FieldCipher::generate();
        let sealed = cipher.seal("secret").unwrap();
        let mut bytes = BASE64.decode(&sealed).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = BASE64.encode(bytes);
        assert!(cipher.open(&tampered).is_err());
    }

    #[test]
    fn bad_keys_are_rejected() {
        assert!(FieldCipher::from_base64("not base64!!!").is_err());
        assert!(FieldCipher::from_base64(&BASE64.encode([0u8; 16])).is_err());
    }
}
