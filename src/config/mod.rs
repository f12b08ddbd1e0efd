use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

use crate::crypto::cipher::KEY_LEN;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),

    #[error("TRADEBOOK_DB_KEY is not valid base64")]
    KeyNotBase64,

    #[error("encryption key must be {expected} bytes, got {got}")]
    KeyWrongLength { expected: usize, got: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub encryption: EncryptionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Pool ceilings. Defaults are deliberately small: the deployment target is
/// many short-lived serverless instances, so each process keeps at most a
/// couple of connections and recycles them on a bounded lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub webhook_secret: String,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

/// Key material configuration. Exactly one wrapping mode is active:
/// a KMS key resource name (remote envelope), or a base64 master key
/// (local wrapping).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionConfig {
    pub kms_key_name: Option<String>,
    pub kms_access_token: Option<String>,
    pub master_key_b64: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_MIN_CONNECTIONS") {
            self.database.min_connections = v.parse().unwrap_or(self.database.min_connections);
        }
        if let Ok(v) = env::var("DATABASE_ACQUIRE_TIMEOUT_SECS") {
            self.database.acquire_timeout_secs =
                v.parse().unwrap_or(self.database.acquire_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_IDLE_TIMEOUT_SECS") {
            self.database.idle_timeout_secs = v.parse().unwrap_or(self.database.idle_timeout_secs);
        }
        if let Ok(v) = env::var("DATABASE_MAX_LIFETIME_SECS") {
            self.database.max_lifetime_secs = v.parse().unwrap_or(self.database.max_lifetime_secs);
        }

        if let Ok(v) = env::var("AUTH_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("WEBHOOK_SECRET") {
            self.security.webhook_secret = v;
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self.encryption.kms_key_name = env::var("TRADEBOOK_KMS_KEY").ok();
        self.encryption.kms_access_token = env::var("TRADEBOOK_KMS_TOKEN").ok();
        self.encryption.master_key_b64 = env::var("TRADEBOOK_DB_KEY").ok();

        self
    }

    /// Decode and validate the local master key.
    pub fn master_key(&self) -> Result<[u8; KEY_LEN], ConfigError> {
        let b64 = self
            .encryption
            .master_key_b64
            .as_deref()
            .ok_or(ConfigError::Missing("TRADEBOOK_DB_KEY"))?;
        let bytes = BASE64.decode(b64).map_err(|_| ConfigError::KeyNotBase64)?;
        let got = bytes.len();
        bytes
            .try_into()
            .map_err(|_| ConfigError::KeyWrongLength {
                expected: KEY_LEN,
                got,
            })
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                max_connections: 2,
                min_connections: 1,
                acquire_timeout_secs: 30,
                idle_timeout_secs: 300,
                max_lifetime_secs: 1800,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                webhook_secret: String::new(),
                enable_cors: true,
                cors_origins: vec![
                    "http://localhost:3000".to_string(),
                    "http://localhost:5173".to_string(),
                ],
            },
            encryption: EncryptionConfig {
                kms_key_name: None,
                kms_access_token: None,
                master_key_b64: None,
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                max_connections: 2,
                min_connections: 1,
                acquire_timeout_secs: 10,
                idle_timeout_secs: 120,
                max_lifetime_secs: 1800,
            },
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                max_connections: 2,
                min_connections: 1,
                acquire_timeout_secs: 5,
                idle_timeout_secs: 60,
                max_lifetime_secs: 900,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                webhook_secret: String::new(),
                enable_cors: true,
                cors_origins: vec![],
            },
            encryption: EncryptionConfig {
                kms_key_name: None,
                kms_access_token: None,
                master_key_b64: None,
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
