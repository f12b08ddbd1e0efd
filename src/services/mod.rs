pub mod tradebook;
pub mod trade;
pub mod user;

use thiserror::Error;

use crate::crypto::CryptoError;
use crate::database::manager::DatabaseError;
use crate::database::tx::{classify, Outcome};

/// Operation-level errors. Everything here aborts the current transaction;
/// nothing is fatal to the process.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Covers both true absence and rows hidden by row-level security.
    /// Callers cannot distinguish the two, so no error ever confirms that a
    /// resource exists.
    #[error("not found or access denied")]
    NotFound,

    #[error("already exists")]
    Conflict,

    #[error("invalid stored value: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("query failed: {0}")]
    Query(sqlx::Error),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match classify(&err) {
            Outcome::Conflict => ServiceError::Conflict,
            Outcome::NotFound => ServiceError::NotFound,
            Outcome::Other => ServiceError::Query(err),
        }
    }
}
