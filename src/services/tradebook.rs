use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::crypto::envelope::EnvelopeKeyManager;
use crate::database::tx::ScopedTx;
use crate::models::{Role, TradebookResponse};
use crate::services::ServiceError;

const DEFAULT_TITLE: &str = "Untitled Tradebook";

fn tradebook_from_row(row: &PgRow) -> Result<TradebookResponse, ServiceError> {
    let role_text: String = row.try_get("role")?;
    Ok(TradebookResponse {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        role: Role::try_from(role_text.as_str()).map_err(ServiceError::Corrupt)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Create a tradebook: user upsert, tradebook row with its wrapped DEK, and
/// the owner membership, all in one identity-scoped transaction. If any step
/// fails the tradebook row does not survive.
pub async fn create_tradebook(
    pool: &PgPool,
    keys: &EnvelopeKeyManager,
    user_id: &str,
) -> Result<Uuid, ServiceError> {
    // Wrap the DEK before touching the database; a key-service failure
    // aborts with no transaction open.
    let dek = EnvelopeKeyManager::generate_dek();
    let wrapped = keys.encrypt_dek(&dek).await?;

    let mut tx = ScopedTx::begin(pool, user_id).await?;

    sqlx::query(
        "INSERT INTO users (id) VALUES ($1) \
         ON CONFLICT (id) DO UPDATE SET updated_at = NOW()",
    )
    .bind(user_id)
    .execute(tx.conn())
    .await?;

    let row = sqlx::query(
        "INSERT INTO tradebooks (owner_id, title, dek_ciphertext) \
         VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(user_id)
    .bind(DEFAULT_TITLE)
    .bind(&wrapped[..])
    .fetch_one(tx.conn())
    .await?;
    let id: Uuid = row.try_get("id")?;

    sqlx::query(
        "INSERT INTO tradebook_members (tradebook_id, user_id, role) \
         VALUES ($1, $2, 'owner')",
    )
    .bind(id)
    .bind(user_id)
    .execute(tx.conn())
    .await?;

    tx.commit().await?;
    Ok(id)
}

/// Fetch one tradebook with the caller's role. Rows the policies hide and
/// rows that do not exist are the same `NotFound`.
pub async fn get_tradebook(
    pool: &PgPool,
    user_id: &str,
    tradebook_id: Uuid,
) -> Result<TradebookResponse, ServiceError> {
    let mut tx = ScopedTx::begin(pool, user_id).await?;

    let row = sqlx::query(
        "SELECT t.id, t.title, t.created_at, t.updated_at, tm.role \
         FROM tradebooks t \
         JOIN tradebook_members tm ON tm.tradebook_id = t.id \
         WHERE t.id = $1 AND tm.user_id = $2",
    )
    .bind(tradebook_id)
    .bind(user_id)
    .fetch_optional(tx.conn())
    .await?
    .ok_or(ServiceError::NotFound)?;

    let response = tradebook_from_row(&row)?;
    tx.commit().await?;
    Ok(response)
}

/// List visible tradebooks, newest activity first.
pub async fn list_tradebooks(
    pool: &PgPool,
    user_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<TradebookResponse>, ServiceError> {
    let mut tx = ScopedTx::begin(pool, user_id).await?;

    let rows = sqlx::query(
        "SELECT t.id, t.title, t.created_at, t.updated_at, tm.role \
         FROM tradebooks t \
         JOIN tradebook_members tm ON tm.tradebook_id = t.id \
         WHERE tm.user_id = $1 \
         ORDER BY t.updated_at DESC \
         LIMIT $2 OFFSET $3",
    )
    .bind(user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(tx.conn())
    .await?;

    let mut list = Vec::with_capacity(rows.len());
    for row in &rows {
        list.push(tradebook_from_row(row)?);
    }

    tx.commit().await?;
    Ok(list)
}

/// Rename a tradebook. The explicit role predicate keeps update owner/editor
/// only even if the row policies are ever loosened.
pub async fn update_tradebook(
    pool: &PgPool,
    user_id: &str,
    tradebook_id: Uuid,
    title: &str,
) -> Result<TradebookResponse, ServiceError> {
    let mut tx = ScopedTx::begin(pool, user_id).await?;

    let result = sqlx::query(
        "UPDATE tradebooks SET title = $1, updated_at = NOW() \
         WHERE id = $2 \
         AND EXISTS (SELECT 1 FROM tradebook_members \
                     WHERE tradebook_id = $2 AND user_id = $3 \
                     AND role IN ('owner', 'editor'))",
    )
    .bind(title.trim())
    .bind(tradebook_id)
    .bind(user_id)
    .execute(tx.conn())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound);
    }

    let row = sqlx::query(
        "SELECT t.id, t.title, t.created_at, t.updated_at, tm.role \
         FROM tradebooks t \
         JOIN tradebook_members tm ON tm.tradebook_id = t.id \
         WHERE t.id = $1 AND tm.user_id = $2",
    )
    .bind(tradebook_id)
    .bind(user_id)
    .fetch_one(tx.conn())
    .await?;

    let response = tradebook_from_row(&row)?;
    tx.commit().await?;
    Ok(response)
}

/// Delete a tradebook. Owner only; zero rows affected reads the same as a
/// tradebook that never existed.
pub async fn delete_tradebook(
    pool: &PgPool,
    user_id: &str,
    tradebook_id: Uuid,
) -> Result<(), ServiceError> {
    let mut tx = ScopedTx::begin(pool, user_id).await?;

    let result = sqlx::query("DELETE FROM tradebooks WHERE id = $1 AND owner_id = $2")
        .bind(tradebook_id)
        .bind(user_id)
        .execute(tx.conn())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound);
    }

    tx.commit().await?;
    Ok(())
}

/// Delete every tradebook the caller owns.
pub async fn delete_all_tradebooks(pool: &PgPool, user_id: &str) -> Result<u64, ServiceError> {
    let mut tx = ScopedTx::begin(pool, user_id).await?;

    let result = sqlx::query("DELETE FROM tradebooks WHERE owner_id = $1")
        .bind(user_id)
        .execute(tx.conn())
        .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound);
    }

    let deleted = result.rows_affected();
    tx.commit().await?;
    Ok(deleted)
}

/// Add or re-role a member. Only the owner can manage membership; for anyone
/// else the statement matches zero rows.
pub async fn add_member(
    pool: &PgPool,
    user_id: &str,
    tradebook_id: Uuid,
    member_id: &str,
    role: Role,
) -> Result<(), ServiceError> {
    let mut tx = ScopedTx::begin(pool, user_id).await?;

    // The member may not have hit the webhook yet; satisfy the FK.
    sqlx::query("INSERT INTO users (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
        .bind(member_id)
        .execute(tx.conn())
        .await?;

    let result = sqlx::query(
        "INSERT INTO tradebook_members (tradebook_id, user_id, role) \
         SELECT $1, $2, $3 \
         WHERE EXISTS (SELECT 1 FROM tradebooks WHERE id = $1 AND owner_id = $4) \
         ON CONFLICT (tradebook_id, user_id) DO UPDATE SET role = EXCLUDED.role",
    )
    .bind(tradebook_id)
    .bind(member_id)
    .bind(role.as_str())
    .bind(user_id)
    .execute(tx.conn())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound);
    }

    tx.commit().await?;
    Ok(())
}
