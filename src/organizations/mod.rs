//! Organizations, memberships, per-action permission grants, and invites.
//!
//! Storage is trait-based: [`OrganizationStore`], [`MembershipStore`] and
//! [`InvitationStore`] are implemented by [`SeaOrmOrgStore`] (feature
//! `database`) and by [`InMemoryOrgStore`]. Every multi-row workflow is atomic
//! inside the store. The managers layer id generation, business rules, and
//! notifications on top.
//!
//! # Example
//!
//! ```rust,ignore
//! use orgward::organizations::{
//!     InMemoryOrgStore, InvitationManager, OrgConfig, OrganizationManager,
//! };
//! use orgward::permissions::{ActionPermissions, Permission};
//!
//! let store = InMemoryOrgStore::new();
//! let orgs = OrganizationManager::new(store.clone(), store.clone(), OrgConfig::default());
//! let invites = InvitationManager::new(store.clone(), store, OrgConfig::default());
//!
//! let org = orgs.create_organization(owner.id, "Acme").await?;
//! let perms = ActionPermissions::new().with("admin", Permission::READ_WRITE);
//! let invite = invites.create_invite(&org.id, &invitee, perms).await?;
//! invites.accept_invite(&invite.otp).await?;
//! ```

mod config;
mod error;
mod invitation_manager;
mod manager;
mod membership_manager;
mod memory;
pub mod storage;
mod types;

#[cfg(feature = "database")]
mod sea_orm_store;

pub use config::OrgConfig;
pub use error::OrganizationError;
pub use invitation_manager::InvitationManager;
pub use manager::OrganizationManager;
pub use membership_manager::MembershipManager;
pub use memory::InMemoryOrgStore;
pub use storage::{InvitationStore, MembershipStore, OrganizationStore};
pub use types::{
    ADMIN_ACTION, AcceptedInvite, Invite, NewOrganization, OWNER_ACTION, Organization,
    OrganizationSummary, OwnerGrantPolicy,
};

#[cfg(feature = "database")]
pub use sea_orm_store::SeaOrmOrgStore;
