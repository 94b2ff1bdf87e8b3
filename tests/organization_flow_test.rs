//! End-to-end organization workflows over the in-memory store.
//!
//! Covers creating an organization, inviting and accepting, scoping a session
//! to the organization, owner protection, and ownership transfer.

use std::sync::Arc;

use orgward::AuthConfig;
use orgward::auth::{AuthError, AuthPipeline, SessionService, SessionSubject, TokenCodec};
use orgward::email::Notifier;
use orgward::organizations::{
    InMemoryOrgStore, InvitationManager, MembershipManager, MembershipStore, OrgConfig,
    OrganizationError, OrganizationManager, OwnerGrantPolicy,
};
use orgward::permissions::{ActionPermissions, Permission};
use orgward::testing::{InMemoryResetStore, InMemoryUserStore, RecordingEmailSender, SentEmailKind};
use orgward::traits::User;

const SECRET: &str = "0123456789abcdef0123456789abcdef";

struct Harness {
    users: InMemoryUserStore,
    store: InMemoryOrgStore,
    mail: RecordingEmailSender,
    orgs: OrganizationManager<InMemoryOrgStore, InMemoryOrgStore>,
    invites: InvitationManager<InMemoryOrgStore, InMemoryOrgStore>,
    members: MembershipManager<InMemoryOrgStore>,
    sessions: SessionService<InMemoryUserStore, InMemoryOrgStore, InMemoryResetStore>,
    pipeline: AuthPipeline,
}

fn harness(config: OrgConfig) -> Harness {
    let auth = AuthConfig {
        jwt_secret: SECRET.to_string(),
        ..AuthConfig::default()
    };
    let users = InMemoryUserStore::new();
    let store = InMemoryOrgStore::new();
    let mail = RecordingEmailSender::new();
    let notifier = Notifier::new(Arc::new(mail.clone()));

    Harness {
        orgs: OrganizationManager::new(store.clone(), store.clone(), config.clone()),
        invites: InvitationManager::new(store.clone(), store.clone(), config)
            .with_notifier(notifier.clone()),
        members: MembershipManager::new(store.clone()),
        sessions: SessionService::from_config(
            &auth,
            users.clone(),
            store.clone(),
            InMemoryResetStore::new(),
        )
        .unwrap()
        .with_notifier(notifier),
        pipeline: AuthPipeline::new(TokenCodec::new(&auth).unwrap()),
        users,
        store,
        mail,
    }
}

impl Harness {
    fn user(&self, email: &str) -> User {
        self.users.insert(email, "Test", "User", "!oauth")
    }

    /// A session for `user` scoped to `org_id`, as the client would hold it.
    async fn scoped_session(&self, user: &User, org_id: &str) -> orgward::Result<String> {
        let unscoped = self
            .sessions
            .codec()
            .issue_session(SessionSubject::new(user.id, &user.email))?;
        let scoped = self
            .sessions
            .set_active_organization(&unscoped.claims, org_id)
            .await?;
        Ok(scoped.token)
    }
}

fn owner_rw() -> ActionPermissions {
    ActionPermissions::new().with("owner", Permission::READ_WRITE)
}

#[tokio::test]
async fn test_creator_is_authorized_as_owner_and_others_are_not() {
    let h = harness(OrgConfig::default());
    let alice = h.user("alice@example.com");
    let bob = h.user("bob@example.com");

    let org = h.orgs.create_organization(alice.id, "Acme").await.unwrap();

    let token = h.scoped_session(&alice, &org.id).await.unwrap();
    h.pipeline
        .authorize_for_organization(Some(&token), &org.id, &owner_rw())
        .unwrap();

    // Bob is not a member, so he cannot even scope a session to the org.
    assert!(h.scoped_session(&bob, &org.id).await.is_err());
}

#[tokio::test]
async fn test_invite_accept_scenario() {
    let h = harness(OrgConfig::default());
    let alice = h.user("alice@example.com");
    let bob = h.user("bob@example.com");
    let org = h.orgs.create_organization(alice.id, "Acme").await.unwrap();

    h.invites
        .create_invite(
            &org.id,
            &bob,
            ActionPermissions::new().with("admin", Permission::READ_WRITE),
        )
        .await
        .unwrap();

    let sent = h.mail.wait_for(1).await;
    assert_eq!(
        sent[0].kind,
        SentEmailKind::OrganizationInvite {
            organization_name: "Acme".into()
        }
    );
    assert_eq!(sent[0].to.email, "bob@example.com");
    let otp = sent[0].otp.clone().unwrap();

    let accepted = h.invites.accept_invite(&otp).await.unwrap();
    assert_eq!(accepted.user_id, bob.id);
    assert!(matches!(
        h.invites.accept_invite(&otp).await,
        Err(OrganizationError::InvitationNotFound)
    ));

    let token = h.scoped_session(&bob, &org.id).await.unwrap();
    let claims = h.sessions.codec().parse_session(&token).unwrap();
    assert!(claims.perms.get("admin").satisfies(Permission::WRITE));
    assert!(!claims.perms.get("admin").satisfies(Permission::ALL));

    // Bob holds admin but not owner.
    let err = h
        .pipeline
        .authorize_for_organization(Some(&token), &org.id, &owner_rw())
        .unwrap_err();
    assert!(matches!(err, AuthError::InsufficientPermission { .. }));
}

#[tokio::test]
async fn test_owner_removal_refused_and_state_unchanged() {
    let h = harness(OrgConfig::default());
    let alice = h.user("alice@example.com");
    let org = h.orgs.create_organization(alice.id, "Acme").await.unwrap();
    let before = h.store.permissions(&org.id, alice.id).await.unwrap();

    assert!(matches!(
        h.members.remove_user_from_org(&org.id, alice.id).await,
        Err(OrganizationError::CannotRemoveOwner)
    ));
    assert!(h.members.is_member(&org.id, alice.id).await.unwrap());
    assert_eq!(h.store.permissions(&org.id, alice.id).await.unwrap(), before);
}

#[tokio::test]
async fn test_removed_member_loses_grants() {
    let h = harness(OrgConfig::default());
    let alice = h.user("alice@example.com");
    let bob = h.user("bob@example.com");
    let org = h.orgs.create_organization(alice.id, "Acme").await.unwrap();
    let invite = h
        .invites
        .create_invite(&org.id, &bob, ActionPermissions::new().with("admin", Permission::READ))
        .await
        .unwrap();
    h.invites.accept_invite(&invite.otp).await.unwrap();

    h.members.remove_user_from_org(&org.id, bob.id).await.unwrap();

    assert!(!h.members.is_member(&org.id, bob.id).await.unwrap());
    assert!(h.members.permissions(&org.id, bob.id).await.unwrap().is_empty());
    assert!(h.orgs.list_user_organizations(bob.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_transfer_with_revoke_leaves_one_owner_grant() {
    let h = harness(OrgConfig::default().with_owner_grant_policy(OwnerGrantPolicy::RevokePrevious));
    let alice = h.user("alice@example.com");
    let bob = h.user("bob@example.com");
    let org = h.orgs.create_organization(alice.id, "Acme").await.unwrap();
    let invite = h
        .invites
        .create_invite(&org.id, &bob, ActionPermissions::new())
        .await
        .unwrap();
    h.invites.accept_invite(&invite.otp).await.unwrap();

    h.orgs.transfer_ownership(alice.id, &org.id, bob.id).await.unwrap();

    let mut owner_grants = 0;
    for user_id in [alice.id, bob.id] {
        if !h.members.permissions(&org.id, user_id).await.unwrap().get("owner").is_none() {
            owner_grants += 1;
        }
    }
    assert_eq!(owner_grants, 1);
    assert!(h.orgs.get_organization(&org.id).await.unwrap().is_owned_by(bob.id));

    // The old owner can now be removed; the new one cannot.
    h.members.remove_user_from_org(&org.id, alice.id).await.unwrap();
    assert!(matches!(
        h.members.remove_user_from_org(&org.id, bob.id).await,
        Err(OrganizationError::CannotRemoveOwner)
    ));
}

#[tokio::test]
async fn test_list_user_organizations() {
    let h = harness(OrgConfig::default());
    let alice = h.user("alice@example.com");
    let first = h.orgs.create_organization(alice.id, "First").await.unwrap();
    let second = h.orgs.create_organization(alice.id, "Second").await.unwrap();
    h.store.soft_delete(&second.id).unwrap();

    let summaries = h.orgs.list_user_organizations(alice.id).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].organization_id, first.id);
    assert!(summaries[0].is_owner);
    assert_eq!(summaries[0].perms.get("owner"), Permission::ALL);

    let json = serde_json::to_value(&summaries[0]).unwrap();
    assert_eq!(json["isOwner"], true);
    assert_eq!(json["organizationId"], first.id);
}
