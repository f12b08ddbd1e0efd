mod common;

use anyhow::Result;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use tradebook_api::models::{
    AssetClass, NewExitLegRequest, NewTradeRequest, OrderType, PurchaseType, Role,
    UpdateTradeRequest,
};
use tradebook_api::services::{trade, tradebook, ServiceError};

fn sample_trade() -> NewTradeRequest {
    NewTradeRequest {
        asset_class: AssetClass::Equities,
        purchase_type: PurchaseType::Cash,
        order_type: OrderType::Limit,
        entry_date: Utc.with_ymd_and_hms(2026, 3, 2, 14, 30, 0).unwrap(),
        symbol: "AAPL".to_string(),
        entry_quantity: "100".parse().unwrap(),
        entry_price: "187.25".parse().unwrap(),
        entry_fees: Some("1.50".parse().unwrap()),
        exit_legs: vec![NewExitLegRequest {
            exit_date: Utc.with_ymd_and_hms(2026, 3, 9, 15, 0, 0).unwrap(),
            exit_quantity: "40".parse().unwrap(),
            exit_price: "192.10".parse().unwrap(),
            exit_fees: None,
        }],
    }
}

#[tokio::test]
async fn trade_round_trip_preserves_exact_values() -> Result<()> {
    let Some(pool) = common::maybe_pool().await else {
        return Ok(());
    };
    let keys = common::key_manager();
    let user = common::unique_user("trader");

    let book = tradebook::create_tradebook(&pool, &keys, &user).await?;
    let ids = trade::create_trades(&pool, &keys, &user, book, vec![sample_trade()]).await?;
    assert_eq!(ids.len(), 1);

    let trades = trade::list_trades(&pool, &keys, &user, book).await?;
    assert_eq!(trades.len(), 1);

    let t = &trades[0];
    assert_eq!(t.symbol, "AAPL");
    // Decimals survive encryption exactly, scale included.
    assert_eq!(t.entry_quantity, "100".parse::<Decimal>().unwrap());
    assert_eq!(t.entry_price, "187.25".parse::<Decimal>().unwrap());
    assert_eq!(t.entry_fees, Some("1.50".parse::<Decimal>().unwrap()));
    assert_eq!(t.exit_legs.len(), 1);
    assert_eq!(t.exit_legs[0].exit_price, "192.10".parse::<Decimal>().unwrap());
    assert_eq!(t.exit_legs[0].exit_fees, None);
    Ok(())
}

#[tokio::test]
async fn stored_fields_are_ciphertext_not_plaintext() -> Result<()> {
    let Some(pool) = common::maybe_pool().await else {
        return Ok(());
    };
    let keys = common::key_manager();
    let user = common::unique_user("trader");

    let book = tradebook::create_tradebook(&pool, &keys, &user).await?;
    trade::create_trades(&pool, &keys, &user, book, vec![sample_trade()]).await?;

    // Read the raw column bytes inside an identity-bound transaction.
    let mut tx = tradebook_api::database::tx::ScopedTx::begin(&pool, &user).await?;
    let row: (Vec<u8>, Vec<u8>) = sqlx::query_as(
        "SELECT symbol, entry_price FROM trades WHERE tradebook_id = $1",
    )
    .bind(book)
    .fetch_one(tx.conn())
    .await?;
    tx.commit().await?;

    assert_ne!(row.0, b"AAPL");
    assert_ne!(row.1, b"187.25");
    // Nonce prefix plus tag means the blob is always longer than the text.
    assert!(row.1.len() > "187.25".len() + 12);
    Ok(())
}

#[tokio::test]
async fn partial_update_keeps_unmentioned_fields() -> Result<()> {
    let Some(pool) = common::maybe_pool().await else {
        return Ok(());
    };
    let keys = common::key_manager();
    let user = common::unique_user("trader");

    let book = tradebook::create_tradebook(&pool, &keys, &user).await?;
    let ids = trade::create_trades(&pool, &keys, &user, book, vec![sample_trade()]).await?;

    let update = UpdateTradeRequest {
        entry_price: Some("190.00".parse().unwrap()),
        ..Default::default()
    };
    let updated = trade::update_trade(&pool, &keys, &user, book, ids[0], update).await?;

    assert_eq!(updated.entry_price, "190.00".parse::<Decimal>().unwrap());
    assert_eq!(updated.symbol, "AAPL");
    assert_eq!(updated.entry_quantity, "100".parse::<Decimal>().unwrap());
    assert_eq!(updated.exit_legs.len(), 1);
    Ok(())
}

#[tokio::test]
async fn readers_cannot_write_trades() -> Result<()> {
    let Some(pool) = common::maybe_pool().await else {
        return Ok(());
    };
    let keys = common::key_manager();
    let owner = common::unique_user("owner");
    let reader = common::unique_user("reader");

    let book = tradebook::create_tradebook(&pool, &keys, &owner).await?;
    let ids = trade::create_trades(&pool, &keys, &owner, book, vec![sample_trade()]).await?;
    tradebook::add_member(&pool, &owner, book, &reader, Role::Reader).await?;

    // Reading works...
    let seen = trade::list_trades(&pool, &keys, &reader, book).await?;
    assert_eq!(seen.len(), 1);

    // ...but every mutation reads as not found.
    assert!(matches!(
        trade::create_trades(&pool, &keys, &reader, book, vec![sample_trade()]).await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        trade::update_trade(
            &pool,
            &keys,
            &reader,
            book,
            ids[0],
            UpdateTradeRequest::default()
        )
        .await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        trade::delete_trades(&pool, &reader, book).await,
        Err(ServiceError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn outsiders_cannot_read_trades() -> Result<()> {
    let Some(pool) = common::maybe_pool().await else {
        return Ok(());
    };
    let keys = common::key_manager();
    let owner = common::unique_user("owner");
    let outsider = common::unique_user("outsider");

    let book = tradebook::create_tradebook(&pool, &keys, &owner).await?;
    trade::create_trades(&pool, &keys, &owner, book, vec![sample_trade()]).await?;

    assert!(matches!(
        trade::list_trades(&pool, &keys, &outsider, book).await,
        Err(ServiceError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn delete_trades_is_idempotent_not_found() -> Result<()> {
    let Some(pool) = common::maybe_pool().await else {
        return Ok(());
    };
    let keys = common::key_manager();
    let user = common::unique_user("trader");

    let book = tradebook::create_tradebook(&pool, &keys, &user).await?;
    trade::create_trades(
        &pool,
        &keys,
        &user,
        book,
        vec![sample_trade(), sample_trade()],
    )
    .await?;

    let deleted = trade::delete_trades(&pool, &user, book).await?;
    assert_eq!(deleted, 2);

    assert!(matches!(
        trade::delete_trades(&pool, &user, book).await,
        Err(ServiceError::NotFound)
    ));
    Ok(())
}
