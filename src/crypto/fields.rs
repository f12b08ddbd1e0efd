use rust_decimal::Decimal;

use crate::crypto::cipher::FieldCipher;
use crate::crypto::error::CryptoError;

/// Typed wrappers for sensitive columns.
///
/// Encoding happens explicitly at the data-access boundary: `encode` before
/// binding a write parameter, `decode` immediately after scanning a read
/// column. The stored representation is always a nonce ‖ sealed blob or SQL
/// NULL.
///
/// Empty string and absent decimal map to NULL rather than to an encrypted
/// empty value, so ciphertext presence does not reveal whether a field is
/// populated. The mapping stays unambiguous: NULL decodes back to the
/// empty/absent sentinel without a decrypt call.

/// An opaque string column (e.g. ticker symbol).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptedString(pub String);

impl EncryptedString {
    /// Empty string stores as NULL; anything else encrypts the UTF-8 bytes.
    pub fn encode(&self, cipher: &FieldCipher) -> Result<Option<Vec<u8>>, CryptoError> {
        if self.0.is_empty() {
            return Ok(None);
        }
        cipher.encrypt(self.0.as_bytes()).map(Some)
    }

    pub fn decode(cipher: &FieldCipher, stored: Option<&[u8]>) -> Result<Self, CryptoError> {
        match stored {
            None => Ok(Self(String::new())),
            Some(blob) => {
                let plaintext = cipher.decrypt(blob)?;
                let s = String::from_utf8(plaintext)
                    .map_err(|_| CryptoError::TypeMismatch("decrypted string is not UTF-8"))?;
                Ok(Self(s))
            }
        }
    }
}

impl From<String> for EncryptedString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A required exact-decimal column (quantity, price).
///
/// The canonical string representation is what gets encrypted, so round-trips
/// are exact for every representable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptedDecimal(pub Decimal);

impl EncryptedDecimal {
    pub fn encode(&self, cipher: &FieldCipher) -> Result<Vec<u8>, CryptoError> {
        cipher.encrypt(self.0.to_string().as_bytes())
    }

    pub fn decode(cipher: &FieldCipher, stored: &[u8]) -> Result<Self, CryptoError> {
        let plaintext = cipher.decrypt(stored)?;
        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| CryptoError::TypeMismatch("decrypted decimal is not UTF-8"))?;
        // Only reachable under data corruption: we never encrypt a
        // non-canonical decimal string.
        let value = text
            .parse::<Decimal>()
            .map_err(|e| CryptoError::DecimalParse(e.to_string()))?;
        Ok(Self(value))
    }
}

impl From<Decimal> for EncryptedDecimal {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// A nullable exact-decimal column (fees).
///
/// `None` stores NULL and reads back as absent, never as zero; zero and
/// absent are distinct states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncryptedNullableDecimal(pub Option<Decimal>);

impl EncryptedNullableDecimal {
    pub fn encode(&self, cipher: &FieldCipher) -> Result<Option<Vec<u8>>, CryptoError> {
        match self.0 {
            None => Ok(None),
            Some(d) => cipher.encrypt(d.to_string().as_bytes()).map(Some),
        }
    }

    pub fn decode(cipher: &FieldCipher, stored: Option<&[u8]>) -> Result<Self, CryptoError> {
        match stored {
            None => Ok(Self(None)),
            Some(blob) => {
                let inner = EncryptedDecimal::decode(cipher, blob)?;
                Ok(Self(Some(inner.0)))
            }
        }
    }
}

impl From<Option<Decimal>> for EncryptedNullableDecimal {
    fn from(d: Option<Decimal>) -> Self {
        Self(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::cipher::random_key;
    use std::str::FromStr;

    fn cipher() -> FieldCipher {
        FieldCipher::new(&random_key()).unwrap()
    }

    #[test]
    fn string_round_trip() {
        let c = cipher();
        let field = EncryptedString("NVDA".to_string());
        let stored = field.encode(&c).unwrap().unwrap();
        assert_eq!(EncryptedString::decode(&c, Some(&stored)).unwrap(), field);
    }

    #[test]
    fn empty_string_collapses_to_null() {
        let c = cipher();
        let field = EncryptedString::default();
        assert!(field.encode(&c).unwrap().is_none());
        // Decoding a stored NULL yields empty without a decrypt call.
        assert_eq!(
            EncryptedString::decode(&c, None).unwrap(),
            EncryptedString(String::new())
        );
    }

    #[test]
    fn decimal_round_trip_is_exact() {
        let c = cipher();
        for text in ["100.00", "-0.000001", "79228162514264337593543950335", "0"] {
            let d = Decimal::from_str(text).unwrap();
            let stored = EncryptedDecimal(d).encode(&c).unwrap();
            let back = EncryptedDecimal::decode(&c, &stored).unwrap();
            assert_eq!(back.0, d);
            // Scale survives too: "100.00" must not come back as "100".
            assert_eq!(back.0.to_string(), text);
        }
    }

    #[test]
    fn corrupt_plaintext_is_decimal_parse_error() {
        let c = cipher();
        let stored = c.encrypt(b"not a number").unwrap();
        assert!(matches!(
            EncryptedDecimal::decode(&c, &stored),
            Err(CryptoError::DecimalParse(_))
        ));
    }

    #[test]
    fn tampered_decimal_is_authentication_error() {
        let c = cipher();
        let mut stored = EncryptedDecimal(Decimal::ONE).encode(&c).unwrap();
        let last = stored.len() - 1;
        stored[last] ^= 0x01;
        assert!(matches!(
            EncryptedDecimal::decode(&c, &stored),
            Err(CryptoError::Authentication)
        ));
    }

    #[test]
    fn absent_decimal_is_not_zero() {
        let c = cipher();
        let absent = EncryptedNullableDecimal(None);
        assert!(absent.encode(&c).unwrap().is_none());

        let decoded = EncryptedNullableDecimal::decode(&c, None).unwrap();
        assert_eq!(decoded.0, None);

        let zero = EncryptedNullableDecimal(Some(Decimal::ZERO));
        let stored = zero.encode(&c).unwrap();
        assert!(stored.is_some());
        let back = EncryptedNullableDecimal::decode(&c, stored.as_deref()).unwrap();
        assert_eq!(back.0, Some(Decimal::ZERO));
    }
}
