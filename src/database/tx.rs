use sqlx::postgres::PgConnection;
use sqlx::{PgPool, Postgres, Transaction};

use crate::database::manager::DatabaseError;

/// A transaction bound to one caller's identity for row-level security.
///
/// Opening the transaction and binding the identity are one step: no
/// statement ever runs against an unbound transaction. The binding uses
/// `set_config(.., true)`, which scopes it to this transaction only; the
/// pooled connection carries nothing once the transaction ends.
///
/// Dropping a `ScopedTx` without calling [`commit`](Self::commit) rolls the
/// transaction back. That covers every error path, panics, and request
/// cancellation, so a failed transaction is never left open with a stale
/// identity on a connection the pool will hand to a different caller.
pub struct ScopedTx<'a> {
    tx: Transaction<'a, Postgres>,
}

impl<'a> ScopedTx<'a> {
    /// Open a transaction and bind `user_id` as the RLS identity.
    ///
    /// A failure to open surfaces as `StoreUnavailable` before any binding;
    /// a failure to bind surfaces as `SecurityContext` and the transaction is
    /// rolled back on drop.
    pub async fn begin(pool: &'a PgPool, user_id: &str) -> Result<ScopedTx<'a>, DatabaseError> {
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| DatabaseError::StoreUnavailable(e.to_string()))?;

        sqlx::query("SELECT set_config('app.current_user_id', $1, true)")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::SecurityContext(e.to_string()))?;

        Ok(Self { tx })
    }

    /// Executor for statements within this transaction.
    pub fn conn(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    /// Commit. Success path only; every other exit rolls back via drop.
    pub async fn commit(self) -> Result<(), DatabaseError> {
        self.tx
            .commit()
            .await
            .map_err(|e| DatabaseError::StoreUnavailable(e.to_string()))
    }
}

/// Semantic outcome of a failed statement. The store classifies driver
/// errors once; the rest of the crate never inspects driver error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Conflict,
    NotFound,
    Other,
}

/// Classify a driver error into the closed outcome set.
pub fn classify(err: &sqlx::Error) -> Outcome {
    match err {
        sqlx::Error::RowNotFound => Outcome::NotFound,
        _ => classify_code(err.as_database_error().and_then(|db| db.code()).as_deref()),
    }
}

// 23505 = unique_violation
fn classify_code(code: Option<&str>) -> Outcome {
    match code {
        Some("23505") => Outcome::Conflict,
        _ => Outcome::Other,
    }
}
