use std::collections::HashMap;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::crypto::envelope::EnvelopeKeyManager;
use crate::crypto::fields::{EncryptedDecimal, EncryptedNullableDecimal, EncryptedString};
use crate::crypto::FieldCipher;
use crate::database::tx::ScopedTx;
use crate::models::{
    AssetClass, ExitLegResponse, NewTradeRequest, OrderType, PurchaseType, Role, TradeResponse,
    UpdateTradeRequest,
};
use crate::services::ServiceError;

/// The tradebook's unwrapped field cipher plus the caller's role, resolved
/// inside the scoped transaction so RLS vouches for the membership row.
struct TradebookKey {
    cipher: FieldCipher,
    role: Role,
}

async fn tradebook_key(
    tx: &mut ScopedTx<'_>,
    keys: &EnvelopeKeyManager,
    user_id: &str,
    tradebook_id: Uuid,
) -> Result<TradebookKey, ServiceError> {
    let row = sqlx::query(
        "SELECT t.dek_ciphertext, tm.role \
         FROM tradebooks t \
         JOIN tradebook_members tm ON tm.tradebook_id = t.id \
         WHERE t.id = $1 AND tm.user_id = $2",
    )
    .bind(tradebook_id)
    .bind(user_id)
    .fetch_optional(tx.conn())
    .await?
    .ok_or(ServiceError::NotFound)?;

    let wrapped: Vec<u8> = row.try_get("dek_ciphertext")?;
    let role_text: String = row.try_get("role")?;
    let role = Role::try_from(role_text.as_str()).map_err(ServiceError::Corrupt)?;
    let cipher = keys.field_cipher(&wrapped).await?;
    Ok(TradebookKey { cipher, role })
}

fn trade_from_row(
    row: &PgRow,
    cipher: &FieldCipher,
    legs: Vec<ExitLegResponse>,
) -> Result<TradeResponse, ServiceError> {
    let asset_class: String = row.try_get("asset_class")?;
    let purchase_type: String = row.try_get("purchase_type")?;
    let order_type: String = row.try_get("order_type")?;

    let symbol: Option<Vec<u8>> = row.try_get("symbol")?;
    let entry_quantity: Vec<u8> = row.try_get("entry_quantity")?;
    let entry_price: Vec<u8> = row.try_get("entry_price")?;
    let entry_fees: Option<Vec<u8>> = row.try_get("entry_fees")?;

    Ok(TradeResponse {
        id: row.try_get("id")?,
        tradebook_id: row.try_get("tradebook_id")?,
        asset_class: AssetClass::try_from(asset_class.as_str()).map_err(ServiceError::Corrupt)?,
        purchase_type: PurchaseType::try_from(purchase_type.as_str())
            .map_err(ServiceError::Corrupt)?,
        order_type: OrderType::try_from(order_type.as_str()).map_err(ServiceError::Corrupt)?,
        entry_date: row.try_get("entry_date")?,
        symbol: EncryptedString::decode(cipher, symbol.as_deref())?.0,
        entry_quantity: EncryptedDecimal::decode(cipher, &entry_quantity)?.0,
        entry_price: EncryptedDecimal::decode(cipher, &entry_price)?.0,
        entry_fees: EncryptedNullableDecimal::decode(cipher, entry_fees.as_deref())?.0,
        exit_legs: legs,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn leg_from_row(row: &PgRow, cipher: &FieldCipher) -> Result<ExitLegResponse, ServiceError> {
    let exit_quantity: Vec<u8> = row.try_get("exit_quantity")?;
    let exit_price: Vec<u8> = row.try_get("exit_price")?;
    let exit_fees: Option<Vec<u8>> = row.try_get("exit_fees")?;

    Ok(ExitLegResponse {
        id: row.try_get("id")?,
        trade_id: row.try_get("trade_id")?,
        exit_date: row.try_get("exit_date")?,
        exit_quantity: EncryptedDecimal::decode(cipher, &exit_quantity)?.0,
        exit_price: EncryptedDecimal::decode(cipher, &exit_price)?.0,
        exit_fees: EncryptedNullableDecimal::decode(cipher, exit_fees.as_deref())?.0,
        created_at: row.try_get("created_at")?,
    })
}

/// Create trades (with exit legs) under the tradebook's DEK. All inserts
/// share one transaction; a failure anywhere leaves nothing behind.
pub async fn create_trades(
    pool: &PgPool,
    keys: &EnvelopeKeyManager,
    user_id: &str,
    tradebook_id: Uuid,
    trades: Vec<NewTradeRequest>,
) -> Result<Vec<Uuid>, ServiceError> {
    let mut tx = ScopedTx::begin(pool, user_id).await?;

    let key = tradebook_key(&mut tx, keys, user_id, tradebook_id).await?;
    if !key.role.can_edit() {
        return Err(ServiceError::NotFound);
    }

    let mut ids = Vec::with_capacity(trades.len());
    for trade in &trades {
        let symbol = EncryptedString(trade.symbol.clone()).encode(&key.cipher)?;
        let quantity = EncryptedDecimal(trade.entry_quantity).encode(&key.cipher)?;
        let price = EncryptedDecimal(trade.entry_price).encode(&key.cipher)?;
        let fees = EncryptedNullableDecimal(trade.entry_fees).encode(&key.cipher)?;

        let row = sqlx::query(
            "INSERT INTO trades \
             (tradebook_id, asset_class, purchase_type, order_type, entry_date, \
              symbol, entry_quantity, entry_price, entry_fees) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .bind(tradebook_id)
        .bind(trade.asset_class.as_str())
        .bind(trade.purchase_type.as_str())
        .bind(trade.order_type.as_str())
        .bind(trade.entry_date)
        .bind(symbol)
        .bind(quantity)
        .bind(price)
        .bind(fees)
        .fetch_one(tx.conn())
        .await?;
        let trade_id: Uuid = row.try_get("id")?;

        for leg in &trade.exit_legs {
            let quantity = EncryptedDecimal(leg.exit_quantity).encode(&key.cipher)?;
            let price = EncryptedDecimal(leg.exit_price).encode(&key.cipher)?;
            let fees = EncryptedNullableDecimal(leg.exit_fees).encode(&key.cipher)?;

            sqlx::query(
                "INSERT INTO exit_legs (trade_id, exit_date, exit_quantity, exit_price, exit_fees) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(trade_id)
            .bind(leg.exit_date)
            .bind(quantity)
            .bind(price)
            .bind(fees)
            .execute(tx.conn())
            .await?;
        }

        ids.push(trade_id);
    }

    tx.commit().await?;
    Ok(ids)
}

/// List a tradebook's trades with their exit legs, decrypted.
pub async fn list_trades(
    pool: &PgPool,
    keys: &EnvelopeKeyManager,
    user_id: &str,
    tradebook_id: Uuid,
) -> Result<Vec<TradeResponse>, ServiceError> {
    let mut tx = ScopedTx::begin(pool, user_id).await?;

    let key = tradebook_key(&mut tx, keys, user_id, tradebook_id).await?;

    let trade_rows = sqlx::query(
        "SELECT id, tradebook_id, asset_class, purchase_type, order_type, entry_date, \
                symbol, entry_quantity, entry_price, entry_fees, created_at, updated_at \
         FROM trades WHERE tradebook_id = $1 \
         ORDER BY entry_date DESC",
    )
    .bind(tradebook_id)
    .fetch_all(tx.conn())
    .await?;

    let trade_ids: Vec<Uuid> = trade_rows
        .iter()
        .map(|row| row.try_get("id"))
        .collect::<Result<_, _>>()?;

    let leg_rows = sqlx::query(
        "SELECT id, trade_id, exit_date, exit_quantity, exit_price, exit_fees, created_at \
         FROM exit_legs WHERE trade_id = ANY($1) \
         ORDER BY exit_date ASC",
    )
    .bind(&trade_ids)
    .fetch_all(tx.conn())
    .await?;

    tx.commit().await?;

    let mut legs_by_trade: HashMap<Uuid, Vec<ExitLegResponse>> = HashMap::new();
    for row in &leg_rows {
        let leg = leg_from_row(row, &key.cipher)?;
        legs_by_trade.entry(leg.trade_id).or_default().push(leg);
    }

    let mut trades = Vec::with_capacity(trade_rows.len());
    for row in &trade_rows {
        let id: Uuid = row.try_get("id")?;
        let legs = legs_by_trade.remove(&id).unwrap_or_default();
        trades.push(trade_from_row(row, &key.cipher, legs)?);
    }
    Ok(trades)
}

/// Partial update of one trade. Absent request fields keep their stored
/// values; changed fields are re-encrypted under the tradebook DEK.
pub async fn update_trade(
    pool: &PgPool,
    keys: &EnvelopeKeyManager,
    user_id: &str,
    tradebook_id: Uuid,
    trade_id: Uuid,
    update: UpdateTradeRequest,
) -> Result<TradeResponse, ServiceError> {
    let mut tx = ScopedTx::begin(pool, user_id).await?;

    let key = tradebook_key(&mut tx, keys, user_id, tradebook_id).await?;
    if !key.role.can_edit() {
        return Err(ServiceError::NotFound);
    }

    let row = sqlx::query(
        "SELECT id, tradebook_id, asset_class, purchase_type, order_type, entry_date, \
                symbol, entry_quantity, entry_price, entry_fees, created_at, updated_at \
         FROM trades WHERE id = $1 AND tradebook_id = $2 FOR UPDATE",
    )
    .bind(trade_id)
    .bind(tradebook_id)
    .fetch_optional(tx.conn())
    .await?
    .ok_or(ServiceError::NotFound)?;

    let current = trade_from_row(&row, &key.cipher, Vec::new())?;

    let asset_class = update.asset_class.unwrap_or(current.asset_class);
    let purchase_type = update.purchase_type.unwrap_or(current.purchase_type);
    let order_type = update.order_type.unwrap_or(current.order_type);
    let entry_date = update.entry_date.unwrap_or(current.entry_date);
    let symbol = update.symbol.unwrap_or(current.symbol);
    let entry_quantity = update.entry_quantity.unwrap_or(current.entry_quantity);
    let entry_price = update.entry_price.unwrap_or(current.entry_price);
    let entry_fees = update.entry_fees.or(current.entry_fees);

    let symbol_blob = EncryptedString(symbol).encode(&key.cipher)?;
    let quantity_blob = EncryptedDecimal(entry_quantity).encode(&key.cipher)?;
    let price_blob = EncryptedDecimal(entry_price).encode(&key.cipher)?;
    let fees_blob = EncryptedNullableDecimal(entry_fees).encode(&key.cipher)?;

    let result = sqlx::query(
        "UPDATE trades \
         SET asset_class = $1, purchase_type = $2, order_type = $3, entry_date = $4, \
             symbol = $5, entry_quantity = $6, entry_price = $7, entry_fees = $8, \
             updated_at = NOW() \
         WHERE id = $9 AND tradebook_id = $10 \
         AND EXISTS (SELECT 1 FROM tradebook_members \
                     WHERE tradebook_id = $10 AND user_id = $11 \
                     AND role IN ('owner', 'editor'))",
    )
    .bind(asset_class.as_str())
    .bind(purchase_type.as_str())
    .bind(order_type.as_str())
    .bind(entry_date)
    .bind(symbol_blob)
    .bind(quantity_blob)
    .bind(price_blob)
    .bind(fees_blob)
    .bind(trade_id)
    .bind(tradebook_id)
    .bind(user_id)
    .execute(tx.conn())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ServiceError::NotFound);
    }

    let row = sqlx::query(
        "SELECT id, tradebook_id, asset_class, purchase_type, order_type, entry_date, \
                symbol, entry_quantity, entry_price, entry_fees, created_at, updated_at \
         FROM trades WHERE id = $1",
    )
    .bind(trade_id)
    .fetch_one(tx.conn())
    .await?;

    let leg_rows = sqlx::query(
        "SELECT id, trade_id, exit_date, exit_quantity, exit_price, exit_fees, created_at \
         FROM exit_legs WHERE trade_id = $1 ORDER BY exit_date ASC",
    )
    .bind(trade_id)
    .fetch_all(tx.conn())
    .await?;

    tx.commit().await?;

    let mut legs = Vec::with_capacity(leg_rows.len());
    for leg_row in &leg_rows {
        legs.push(leg_from_row(leg_row, &key.cipher)?);
    }
    trade_from_row(&row, &key.cipher, legs)
}

/// Delete all trades in a tradebook. Owner or editor; zero rows reads as
/// not found.
pub async fn delete_trades(
    pool: &PgPool,
    user_id: &str,
    tradebook_id: Uuid,
) -> Result<u64, ServiceError> {
    let mut tx = ScopedTx::begin(pool, user_id).await?;

    let result = sqlx::query(
        "DELETE FROM trades WHERE tradebook_id = $1 \
         AND EXISTS (SELECT 1 FROM tradebook_members \
                     WHERE tradebook_id = $1 AND user_id = $2 \
                     AND role IN ('owner', 'editor'))",
    )
    .bind(tradebook_id)
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
