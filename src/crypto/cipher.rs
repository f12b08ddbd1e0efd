use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::crypto::error::CryptoError;

/// AES-256 key size in bytes.
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce size in bytes.
pub const NONCE_LEN: usize = 12;

/// AES-256-GCM cipher for sensitive columns.
///
/// Produced blobs are self-contained: nonce ‖ sealed payload (ciphertext +
/// authentication tag). That byte layout is the only structure the database
/// ever sees.
///
/// The cipher is an explicitly constructed, immutable context. Anything that
/// needs to encrypt or decrypt takes a `&FieldCipher`; there is no global
/// initialization.
pub struct FieldCipher {
    cipher: Aes256Gcm,
}

impl FieldCipher {
    /// Build a cipher from 32 bytes of key material.
    pub fn new(key: &[u8]) -> Result<Self, CryptoError> {
        if key.len() != KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: KEY_LEN,
                got: key.len(),
            });
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        Ok(Self { cipher })
    }

    /// Encrypt plaintext under a fresh random nonce.
    ///
    /// Returns nonce ‖ sealed. Encrypting the same plaintext twice yields
    /// different blobs.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + sealed.len());
        blob.extend_from_slice(&nonce_bytes);
        blob.extend_from_slice(&sealed);
        Ok(blob)
    }

    /// Decrypt a nonce ‖ sealed blob.
    ///
    /// A blob shorter than the nonce is `Format`; a failed tag check
    /// (tampering, truncation past the nonce, wrong key) is `Authentication`.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if blob.len() < NONCE_LEN {
            return Err(CryptoError::Format("ciphertext shorter than nonce"));
        }
        let (nonce_bytes, sealed) = blob.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, sealed)
            .map_err(|_| CryptoError::Authentication)
    }
}

/// Fill a fresh 256-bit key from the OS RNG.
pub fn random_key() -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    OsRng.fill_bytes(&mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let cipher = FieldCipher::new(&random_key()).unwrap();
        let plaintext = b"AAPL";
        let blob = cipher.encrypt(plaintext).unwrap();
        assert_eq!(cipher.decrypt(&blob).unwrap(), plaintext);
    }

    #[test]
    fn nonce_uniqueness() {
        let cipher = FieldCipher::new(&random_key()).unwrap();
        let a = cipher.encrypt(b"100.00").unwrap();
        let b = cipher.encrypt(b"100.00").unwrap();
        assert_ne!(a, b);
        assert_eq!(cipher.decrypt(&a).unwrap(), b"100.00");
        assert_eq!(cipher.decrypt(&b).unwrap(), b"100.00");
    }

    #[test]
    fn tamper_detection() {
        let cipher = FieldCipher::new(&random_key()).unwrap();
        let blob = cipher.encrypt(b"secret quantity").unwrap();

        // Flipping any single bit must fail authentication, never decrypt
        // to different plaintext.
        for byte in 0..blob.len() {
            for bit in 0..8 {
                let mut tampered = blob.clone();
                tampered[byte] ^= 1 << bit;
                match cipher.decrypt(&tampered) {
                    Err(CryptoError::Authentication) => {}
                    other => panic!("expected authentication failure, got {:?}", other),
                }
            }
        }
    }

    #[test]
    fn truncated_blob_is_format_error() {
        let cipher = FieldCipher::new(&random_key()).unwrap();
        let short = vec![0u8; NONCE_LEN - 1];
        assert!(matches!(
            cipher.decrypt(&short),
            Err(CryptoError::Format(_))
        ));
    }

    #[test]
    fn wrong_key_fails() {
        let a = FieldCipher::new(&random_key()).unwrap();
        let b = FieldCipher::new(&random_key()).unwrap();
        let blob = a.encrypt(b"data").unwrap();
        assert!(matches!(b.decrypt(&blob), Err(CryptoError::Authentication)));
    }

    #[test]
    fn rejects_short_key() {
        assert!(matches!(
            FieldCipher::new(&[0u8; 16]),
            Err(CryptoError::InvalidKeyLength { expected: 32, got: 16 })
        ));
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let cipher = FieldCipher::new(&random_key()).unwrap();
        let blob = cipher.encrypt(b"").unwrap();
        assert!(cipher.decrypt(&blob).unwrap().is_empty());
    }
}
