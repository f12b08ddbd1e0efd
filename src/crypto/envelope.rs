use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use moka::sync::Cache;
use serde::Deserialize;
use serde_json::json;

use crate::crypto::cipher::{random_key, FieldCipher, KEY_LEN};
use crate::crypto::error::CryptoError;

/// Default ceiling on cached plaintext DEKs.
pub const DEK_CACHE_CAPACITY: u64 = 1000;

/// How long a cached DEK stays usable after insertion. Expire-after-write,
/// not after-read: this bounds the staleness window after a key is revoked
/// upstream no matter how hot the entry is.
pub const DEK_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// The remote owner of the master key material. Implementations wrap and
/// unwrap data encryption keys; network and auth failures are opaque
/// `KeyService` errors to the rest of the crate.
#[async_trait]
pub trait KeyService: Send + Sync {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError>;
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError>;
}

/// Key service backed by Google Cloud KMS over its REST surface.
///
/// `key_name` is the full key resource name
/// (`projects/../locations/../keyRings/../cryptoKeys/..`).
pub struct GoogleKmsService {
    http: reqwest::Client,
    key_name: String,
    access_token: String,
}

#[derive(Deserialize)]
struct KmsEncryptResponse {
    ciphertext: String,
}

#[derive(Deserialize)]
struct KmsDecryptResponse {
    plaintext: String,
}

impl GoogleKmsService {
    pub fn new(key_name: String, access_token: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            key_name,
            access_token,
        }
    }

    async fn call(&self, verb: &str, field: &str, data: &[u8]) -> Result<serde_json::Value, CryptoError> {
        let url = format!("https://cloudkms.googleapis.com/v1/{}:{}", self.key_name, verb);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&json!({ field: BASE64.encode(data) }))
            .send()
            .await
            .map_err(|e| CryptoError::KeyService(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CryptoError::KeyService(format!(
                "kms {} returned {}",
                verb,
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| CryptoError::KeyService(e.to_string()))
    }
}

#[async_trait]
impl KeyService for GoogleKmsService {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let body = self.call("encrypt", "plaintext", plaintext).await?;
        let parsed: KmsEncryptResponse = serde_json::from_value(body)
            .map_err(|e| CryptoError::KeyService(e.to_string()))?;
        BASE64
            .decode(parsed.ciphertext)
            .map_err(|e| CryptoError::KeyService(e.to_string()))
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let body = self.call("decrypt", "ciphertext", ciphertext).await?;
        let parsed: KmsDecryptResponse = serde_json::from_value(body)
            .map_err(|e| CryptoError::KeyService(e.to_string()))?;
        BASE64
            .decode(parsed.plaintext)
            .map_err(|e| CryptoError::KeyService(e.to_string()))
    }
}

/// Key service that wraps DEKs with a local master key instead of a remote
/// KMS. This is the direct master-key deployment mode: the same envelope code
/// path, with the master cipher doing the wrapping.
pub struct LocalKeyService {
    master: FieldCipher,
}

impl LocalKeyService {
    pub fn new(master: FieldCipher) -> Self {
        Self { master }
    }
}

#[async_trait]
impl KeyService for LocalKeyService {
    async fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.master.encrypt(plaintext)
    }

    async fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        // Unwrap failures surface as key-service errors: the caller cannot
        // distinguish local from remote wrapping, and must abort either way.
        self.master
            .decrypt(ciphertext)
            .map_err(|e| CryptoError::KeyService(e.to_string()))
    }
}

/// Second encryption tier: per-tradebook DEKs wrapped by the key service,
/// with a bounded expire-after-write cache of unwrapped keys so that reading
/// a tradebook's trades does not call the key service per row.
///
/// The cache is keyed by exact ciphertext bytes. Concurrent misses for the
/// same key may each call the service; the service is idempotent and the
/// duplicate call is cheaper than single-flight locking here.
pub struct EnvelopeKeyManager {
    service: Arc<dyn KeyService>,
    cache: Cache<Vec<u8>, Vec<u8>>,
}

impl EnvelopeKeyManager {
    pub fn new(service: Arc<dyn KeyService>) -> Self {
        Self::with_cache_policy(service, DEK_CACHE_CAPACITY, DEK_CACHE_TTL)
    }

    pub fn with_cache_policy(service: Arc<dyn KeyService>, capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self { service, cache }
    }

    /// Fresh random 256-bit DEK for a new tradebook.
    pub fn generate_dek() -> [u8; KEY_LEN] {
        random_key()
    }

    /// Wrap a DEK. Never cached: the wrapping scheme is randomized, so the
    /// same plaintext does not reproduce prior ciphertext.
    pub async fn encrypt_dek(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        self.service.encrypt(plaintext).await
    }

    /// Unwrap a DEK, consulting the cache first. A hit returns the plaintext
    /// with zero remote calls; a miss calls the service and caches the result
    /// for the TTL window.
    pub async fn decrypt_dek(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if let Some(dek) = self.cache.get(ciphertext) {
            return Ok(dek);
        }
        let dek = self.service.decrypt(ciphertext).await?;
        self.cache.insert(ciphertext.to_vec(), dek.clone());
        Ok(dek)
    }

    /// Unwrap a tradebook DEK and build the field cipher for it.
    pub async fn field_cipher(&self, dek_ciphertext: &[u8]) -> Result<FieldCipher, CryptoError> {
        let dek = self.decrypt_dek(dek_ciphertext).await?;
        FieldCipher::new(&dek)
    }
}
