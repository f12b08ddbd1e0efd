use sqlx::PgPool;

use crate::services::ServiceError;

/// Upsert a user from the identity-provider webhook. This is an admin
/// channel, not tenant data, so it runs outside the RLS protocol.
pub async fn upsert_user(pool: &PgPool, user_id: &str) -> Result<(), ServiceError> {
    sqlx::query(
        "INSERT INTO users (id) VALUES ($1) \
         ON CONFLICT (id) DO UPDATE SET updated_at = NOW()",
    )
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete a user; owned tradebooks cascade.
pub async fn delete_user(pool: &PgPool, user_id: &str) -> Result<(), ServiceError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound);
    }
    Ok(())
}
