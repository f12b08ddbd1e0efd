use thiserror::Error;

/// Errors from the field-encryption layer.
///
/// `Authentication` is always fatal to the current operation: a failed tag
/// check means tampered data or the wrong key, and must never be degraded to
/// partial plaintext. `KeyService` may be retried by the caller with backoff;
/// this layer does not retry.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("ciphertext failed authentication")]
    Authentication,

    #[error("malformed ciphertext blob: {0}")]
    Format(&'static str),

    #[error("failed to parse decrypted decimal: {0}")]
    DecimalParse(String),

    #[error("unexpected storage representation: {0}")]
    TypeMismatch(&'static str),

    #[error("key service error: {0}")]
    KeyService(String),

    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
}
