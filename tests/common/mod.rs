#![allow(dead_code)]

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use tradebook_api::crypto::cipher::random_key;
use tradebook_api::crypto::{EnvelopeKeyManager, FieldCipher, LocalKeyService};

/// Connect to DATABASE_URL and run migrations. Returns `None` when the
/// variable is unset so the suite passes on machines without a database.
pub async fn maybe_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("failed to connect to DATABASE_URL");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations failed");
    Some(pool)
}

/// Key manager over an in-process master key; no external key service needed.
pub fn key_manager() -> EnvelopeKeyManager {
    let master = FieldCipher::new(&random_key()).expect("master cipher");
    EnvelopeKeyManager::new(Arc::new(LocalKeyService::new(master)))
}

/// Fresh user id per call so tests never collide across runs.
pub fn unique_user(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}
