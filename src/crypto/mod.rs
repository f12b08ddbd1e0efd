pub mod cipher;
pub mod envelope;
pub mod error;
pub mod fields;

pub use cipher::FieldCipher;
pub use envelope::{EnvelopeKeyManager, GoogleKmsService, KeyService, LocalKeyService};
pub use error::CryptoError;
pub use fields::{EncryptedDecimal, EncryptedNullableDecimal, EncryptedString};
