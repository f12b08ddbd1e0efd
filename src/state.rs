use std::sync::Arc;

use sqlx::PgPool;

use crate::crypto::envelope::EnvelopeKeyManager;

/// Shared application state. The key manager (and through it the cipher
/// context) is constructed once at startup and injected everywhere it is
/// needed; nothing in the crate reaches for global crypto state.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub keys: Arc<EnvelopeKeyManager>,
}
