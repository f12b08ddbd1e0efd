mod common;

use anyhow::Result;

use tradebook_api::models::Role;
use tradebook_api::services::{tradebook, ServiceError};

#[tokio::test]
async fn create_get_update_delete_lifecycle() -> Result<()> {
    let Some(pool) = common::maybe_pool().await else {
        return Ok(());
    };
    let keys = common::key_manager();
    let user = common::unique_user("owner");

    let id = tradebook::create_tradebook(&pool, &keys, &user).await?;

    let fetched = tradebook::get_tradebook(&pool, &user, id).await?;
    assert_eq!(fetched.id, id);
    assert_eq!(fetched.title, "Untitled Tradebook");
    assert_eq!(fetched.role, Role::Owner);

    let renamed = tradebook::update_tradebook(&pool, &user, id, "Q3 swing trades").await?;
    assert_eq!(renamed.title, "Q3 swing trades");

    tradebook::delete_tradebook(&pool, &user, id).await?;

    // Deleting again reads exactly like a tradebook that never existed.
    assert!(matches!(
        tradebook::delete_tradebook(&pool, &user, id).await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        tradebook::get_tradebook(&pool, &user, id).await,
        Err(ServiceError::NotFound)
    ));
    Ok(())
}

#[tokio::test]
async fn listing_is_scoped_to_the_caller() -> Result<()> {
    let Some(pool) = common::maybe_pool().await else {
        return Ok(());
    };
    let keys = common::key_manager();
    let alice = common::unique_user("alice");
    let bob = common::unique_user("bob");

    let alice_book = tradebook::create_tradebook(&pool, &keys, &alice).await?;
    tradebook::create_tradebook(&pool, &keys, &bob).await?;

    let alice_list = tradebook::list_tradebooks(&pool, &alice, 100, 0).await?;
    assert!(alice_list.iter().any(|t| t.id == alice_book));

    let bob_list = tradebook::list_tradebooks(&pool, &bob, 100, 0).await?;
    assert!(bob_list.iter().all(|t| t.id != alice_book));
    Ok(())
}

#[tokio::test]
async fn another_users_tradebook_is_not_found() -> Result<()> {
    let Some(pool) = common::maybe_pool().await else {
        return Ok(());
    };
    let keys = common::key_manager();
    let alice = common::unique_user("alice");
    let mallory = common::unique_user("mallory");

    let id = tradebook::create_tradebook(&pool, &keys, &alice).await?;

    // Existence is not disclosed: fetch, rename and delete all read the same.
    assert!(matches!(
        tradebook::get_tradebook(&pool, &mallory, id).await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        tradebook::update_tradebook(&pool, &mallory, id, "hijacked").await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        tradebook::delete_tradebook(&pool, &mallory, id).await,
        Err(ServiceError::NotFound)
    ));

    let untouched = tradebook::get_tradebook(&pool, &alice, id).await?;
    assert_eq!(untouched.title, "Untitled Tradebook");
    Ok(())
}

#[tokio::test]
async fn delete_all_removes_only_owned_books() -> Result<()> {
    let Some(pool) = common::maybe_pool().await else {
        return Ok(());
    };
    let keys = common::key_manager();
    let owner = common::unique_user("owner");
    let member = common::unique_user("member");

    tradebook::create_tradebook(&pool, &keys, &owner).await?;
    tradebook::create_tradebook(&pool, &keys, &owner).await?;
    let shared = tradebook::create_tradebook(&pool, &keys, &member).await?;
    tradebook::add_member(&pool, &member, shared, &owner, Role::Editor).await?;

    let deleted = tradebook::delete_all_tradebooks(&pool, &owner).await?;
    assert_eq!(deleted, 2);

    // Editor membership on someone else's book does not make it deletable.
    let remaining = tradebook::get_tradebook(&pool, &member, shared).await?;
    assert_eq!(remaining.id, shared);
    Ok(())
}

#[tokio::test]
async fn member_roles_gate_renames() -> Result<()> {
    let Some(pool) = common::maybe_pool().await else {
        return Ok(());
    };
    let keys = common::key_manager();
    let owner = common::unique_user("owner");
    let reader = common::unique_user("reader");

    let id = tradebook::create_tradebook(&pool, &keys, &owner).await?;
    tradebook::add_member(&pool, &owner, id, &reader, Role::Reader).await?;

    // Readers can see the book but not rename it.
    let visible = tradebook::get_tradebook(&pool, &reader, id).await?;
    assert_eq!(visible.role, Role::Reader);
    assert!(matches!(
        tradebook::update_tradebook(&pool, &reader, id, "nope").await,
        Err(ServiceError::NotFound)
    ));

    // Promote to editor and the rename goes through.
    tradebook::add_member(&pool, &owner, id, &reader, Role::Editor).await?;
    let renamed = tradebook::update_tradebook(&pool, &reader, id, "shared notes").await?;
    assert_eq!(renamed.title, "shared notes");
    Ok(())
}

#[tokio::test]
async fn only_the_owner_manages_membership() -> Result<()> {
    let Some(pool) = common::maybe_pool().await else {
        return Ok(());
    };
    let keys = common::key_manager();
    let owner = common::unique_user("owner");
    let editor = common::unique_user("editor");
    let interloper = common::unique_user("interloper");

    let id = tradebook::create_tradebook(&pool, &keys, &owner).await?;
    tradebook::add_member(&pool, &owner, id, &editor, Role::Editor).await?;

    assert!(matches!(
        tradebook::add_member(&pool, &editor, id, &interloper, Role::Editor).await,
        Err(ServiceError::NotFound)
    ));
    assert!(matches!(
        tradebook::get_tradebook(&pool, &interloper, id).await,
        Err(ServiceError::NotFound)
    ));
    Ok(())
}
