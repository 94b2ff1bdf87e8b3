//! SeaORM organization store against in-memory SQLite.

#![cfg(feature = "database")]

use axum::response::IntoResponse;
use orgward::OrgwardError;
use orgward::organizations::{
    Invite, InvitationStore, MembershipStore, NewOrganization, OrganizationStore,
    OwnerGrantPolicy, SeaOrmOrgStore,
};
use orgward::permissions::{ActionPermissions, Permission};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};

/// One pooled connection, so every query sees the same in-memory database.
async fn store() -> (DatabaseConnection, SeaOrmOrgStore) {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.unwrap();

    let store = SeaOrmOrgStore::new(db.clone());
    store.create_tables().await.unwrap();
    (db, store)
}

async fn soft_delete(db: &DatabaseConnection, org_id: &str) {
    db.execute_unprepared(&format!(
        "UPDATE organizations SET deleted_at = '2026-01-01 00:00:00+00:00' WHERE id = '{}'",
        org_id
    ))
    .await
    .unwrap();
}

fn new_org(id: &str, owner: u32) -> NewOrganization {
    NewOrganization {
        id: id.into(),
        name: format!("Org {}", id),
        owner_user_id: owner,
    }
}

fn invite(otp: &str, user_id: u32, expires_at: u64) -> Invite {
    Invite {
        organization_id: "abcde".into(),
        user_id,
        perms: ActionPermissions::new().with("admin", Permission::READ_WRITE),
        otp: otp.into(),
        expires_at,
    }
}

// =============================================================================
// Organizations
// =============================================================================

#[tokio::test]
async fn test_create_grants_owner_and_admin() {
    let (_db, store) = store().await;
    let org = store.create_organization(&new_org("abcde", 1)).await.unwrap();
    assert_eq!(org.owner_user_id, 1);
    assert!(org.deleted_at.is_none());

    assert!(store.is_member("abcde", 1).await.unwrap());
    let perms = store.permissions("abcde", 1).await.unwrap();
    assert_eq!(perms.get("owner"), Permission::ALL);
    assert_eq!(perms.get("admin"), Permission::ALL);

    let found = store.find_by_id("abcde").await.unwrap().unwrap();
    assert_eq!(found.name, "Org abcde");
    assert!(store.find_by_id("zzzzz").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_id_conflicts_without_side_effects() {
    let (_db, store) = store().await;
    store.create_organization(&new_org("abcde", 1)).await.unwrap();

    let err = store.create_organization(&new_org("abcde", 2)).await.unwrap_err();
    assert!(matches!(err, OrgwardError::Conflict(_)));
    assert!(!store.is_member("abcde", 2).await.unwrap());
    assert_eq!(store.find_by_id("abcde").await.unwrap().unwrap().owner_user_id, 1);
}

#[tokio::test]
async fn test_list_skips_deleted_organizations() {
    let (db, store) = store().await;
    store.create_organization(&new_org("aaaaa", 1)).await.unwrap();
    store.create_organization(&new_org("bbbbb", 1)).await.unwrap();
    soft_delete(&db, "bbbbb").await;

    let listed = store.list_for_user(1).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].organization_id, "aaaaa");
    assert!(listed[0].is_owner);
    assert_eq!(listed[0].perms.get("owner"), Permission::ALL);

    assert!(store.list_for_user(2).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_id_hides_constraint_text() {
    let (_db, store) = store().await;
    store.create_organization(&new_org("abcde", 1)).await.unwrap();

    let err = store.create_organization(&new_org("abcde", 2)).await.unwrap_err();
    assert_eq!(err.safe_message(), "Conflict: duplicate record");

    let response = err.into_response();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = String::from_utf8_lossy(&body);
    assert!(body.contains("duplicate record"));
    for leaked in ["organizations", "UNIQUE", ".id"] {
        assert!(!body.contains(leaked), "response body leaks {leaked:?}: {body}");
    }
}

// =============================================================================
// Ownership
// =============================================================================

#[tokio::test]
async fn test_owner_change_requires_membership() {
    let (_db, store) = store().await;
    store.create_organization(&new_org("abcde", 1)).await.unwrap();

    assert!(matches!(
        store
            .set_organization_owner("abcde", 9, OwnerGrantPolicy::RevokePrevious)
            .await,
        Err(OrgwardError::Conflict(_))
    ));

    // Rolled back: owner record and grants untouched.
    assert_eq!(store.find_by_id("abcde").await.unwrap().unwrap().owner_user_id, 1);
    assert_eq!(store.permissions("abcde", 1).await.unwrap().get("owner"), Permission::ALL);
    assert!(store.permissions("abcde", 9).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_removal_and_transfer_keep_owner_a_member() {
    let (_db, store) = store().await;
    store.create_organization(&new_org("abcde", 1)).await.unwrap();
    store.create_invite(&invite("otp1", 2, 1000)).await.unwrap();
    store.accept_invite("otp1", 50).await.unwrap();

    let (removed, transferred) = tokio::join!(
        store.remove_user_from_org("abcde", 2),
        store.set_organization_owner("abcde", 2, OwnerGrantPolicy::RevokePrevious),
    );
    // Whichever commits second sees the first and refuses.
    assert!(removed.is_ok() != transferred.is_ok());
    assert!(matches!(
        removed.err().or(transferred.err()),
        Some(OrgwardError::Conflict(_))
    ));

    let owner = store.find_by_id("abcde").await.unwrap().unwrap().owner_user_id;
    assert!(store.is_member("abcde", owner).await.unwrap());
    assert_eq!(store.permissions("abcde", owner).await.unwrap().get("owner"), Permission::ALL);
}

#[tokio::test]
async fn test_owner_cannot_be_removed() {
    let (_db, store) = store().await;
    store.create_organization(&new_org("abcde", 1)).await.unwrap();

    assert!(matches!(
        store.remove_user_from_org("abcde", 1).await,
        Err(OrgwardError::Conflict(_))
    ));
    assert!(store.is_member("abcde", 1).await.unwrap());
    assert_eq!(
        store.permissions("abcde", 1).await.unwrap().get("owner"),
        Permission::ALL
    );
}

#[tokio::test]
async fn test_transfer_with_revoke_leaves_single_owner_grant() {
    let (_db, store) = store().await;
    store.create_organization(&new_org("abcde", 1)).await.unwrap();
    store.create_invite(&invite("otp1", 2, 1000)).await.unwrap();
    store.accept_invite("otp1", 50).await.unwrap();

    store
        .set_organization_owner("abcde", 2, OwnerGrantPolicy::RevokePrevious)
        .await
        .unwrap();

    let org = store.find_by_id("abcde").await.unwrap().unwrap();
    assert_eq!(org.owner_user_id, 2);
    assert_eq!(store.permissions("abcde", 2).await.unwrap().get("owner"), Permission::ALL);
    assert!(store.permissions("abcde", 1).await.unwrap().get("owner").is_none());
    // Other grants of the previous owner stay.
    assert_eq!(store.permissions("abcde", 1).await.unwrap().get("admin"), Permission::ALL);

    // The previous owner can now be removed.
    store.remove_user_from_org("abcde", 1).await.unwrap();
    assert!(!store.is_member("abcde", 1).await.unwrap());
    assert!(store.permissions("abcde", 1).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_transfer_keep_previous_and_missing_org() {
    let (_db, store) = store().await;
    store.create_organization(&new_org("abcde", 1)).await.unwrap();

    store
        .set_organization_owner("abcde", 1, OwnerGrantPolicy::KeepPrevious)
        .await
        .unwrap();
    assert_eq!(store.permissions("abcde", 1).await.unwrap().get("owner"), Permission::ALL);

    assert!(matches!(
        store
            .set_organization_owner("zzzzz", 1, OwnerGrantPolicy::KeepPrevious)
            .await,
        Err(OrgwardError::NotFound(_))
    ));
}

// =============================================================================
// Grants
// =============================================================================

#[tokio::test]
async fn test_set_and_revoke_permission() {
    let (_db, store) = store().await;
    store.create_organization(&new_org("abcde", 1)).await.unwrap();

    store
        .set_permission("abcde", 1, "billing", Permission::READ)
        .await
        .unwrap();
    store
        .set_permission("abcde", 1, "billing", Permission::READ_WRITE)
        .await
        .unwrap();
    assert_eq!(
        store.permissions("abcde", 1).await.unwrap().get("billing"),
        Permission::READ_WRITE
    );

    assert!(store.revoke_permission("abcde", 1, "billing").await.unwrap());
    assert!(!store.revoke_permission("abcde", 1, "billing").await.unwrap());

    assert!(matches!(
        store.set_permission("abcde", 9, "billing", Permission::READ).await,
        Err(OrgwardError::NotFound(_))
    ));
}

// =============================================================================
// Invitations
// =============================================================================

#[tokio::test]
async fn test_accept_is_single_use() {
    let (_db, store) = store().await;
    store.create_organization(&new_org("abcde", 1)).await.unwrap();
    store.create_invite(&invite("otp1", 2, 100)).await.unwrap();

    let accepted = store.accept_invite("otp1", 50).await.unwrap();
    assert_eq!(accepted.organization_id, "abcde");
    assert_eq!(accepted.perms.get("admin"), Permission::READ_WRITE);
    assert!(store.is_member("abcde", 2).await.unwrap());

    assert!(matches!(
        store.accept_invite("otp1", 50).await,
        Err(OrgwardError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_expired_invite_not_found() {
    let (_db, store) = store().await;
    store.create_organization(&new_org("abcde", 1)).await.unwrap();
    store.create_invite(&invite("otp1", 2, 100)).await.unwrap();

    assert!(matches!(
        store.accept_invite("otp1", 100).await,
        Err(OrgwardError::NotFound(_))
    ));
    assert!(!store.is_member("abcde", 2).await.unwrap());
}

#[tokio::test]
async fn test_accept_by_member_conflicts_and_keeps_invite() {
    let (_db, store) = store().await;
    store.create_organization(&new_org("abcde", 1)).await.unwrap();
    store.create_invite(&invite("otp1", 1, 100)).await.unwrap();

    assert!(matches!(
        store.accept_invite("otp1", 50).await,
        Err(OrgwardError::Conflict(_))
    ));
    // Grants untouched and the invite still there.
    assert_eq!(store.permissions("abcde", 1).await.unwrap().get("admin"), Permission::ALL);
    assert_eq!(store.delete_expired_invites(1000).await.unwrap(), 1);
}

#[tokio::test]
async fn test_invite_to_deleted_organization_not_accepted() {
    let (db, store) = store().await;
    store.create_organization(&new_org("abcde", 1)).await.unwrap();
    store.create_invite(&invite("otp1", 2, 1000)).await.unwrap();
    soft_delete(&db, "abcde").await;

    assert!(matches!(
        store.accept_invite("otp1", 50).await,
        Err(OrgwardError::NotFound(_))
    ));
    assert!(!store.is_member("abcde", 2).await.unwrap());
}

#[tokio::test]
async fn test_delete_expired_invites() {
    let (_db, store) = store().await;
    store.create_organization(&new_org("abcde", 1)).await.unwrap();
    store.create_invite(&invite("old", 2, 10)).await.unwrap();
    store.create_invite(&invite("new", 3, 1000)).await.unwrap();

    assert_eq!(store.delete_expired_invites(500).await.unwrap(), 1);
    assert!(store.accept_invite("new", 500).await.is_ok());
}

// =============================================================================
// TestDb
// =============================================================================

#[cfg(feature = "test-helpers")]
#[tokio::test]
async fn test_test_db_has_org_tables() {
    let db = orgward::testing::TestDb::with_org_tables().await.unwrap();
    let store = db.org_store();
    store.create_organization(&new_org("abcde", 1)).await.unwrap();

    db.seed(&["UPDATE organizations SET name = 'Renamed' WHERE id = 'abcde'"])
        .await
        .unwrap();
    assert_eq!(store.find_by_id("abcde").await.unwrap().unwrap().name, "Renamed");
}
