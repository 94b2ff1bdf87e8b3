//! SeaORM-backed organization storage.
//!
//! Every multi-row workflow runs in one database transaction. A transaction
//! dropped on an early `?` return rolls back, so partial workflows are never
//! visible.
//!
//! # Example
//!
//! ```rust,ignore
//! use orgward::organizations::{OrgConfig, OrganizationManager, SeaOrmOrgStore};
//!
//! let store = SeaOrmOrgStore::new(db.clone());
//! let manager = OrganizationManager::new(store.clone(), store.clone(), OrgConfig::default());
//! ```
//!
//! # Database Schema
//!
//! [`SeaOrmOrgStore::create_tables`] creates these from the entities. For
//! production, manage them with migrations:
//!
//! ```sql
//! CREATE TABLE organizations (
//!     id VARCHAR PRIMARY KEY,
//!     name VARCHAR NOT NULL,
//!     owner_user_id BIGINT NOT NULL,
//!     billing_plan_id VARCHAR,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     deleted_at TIMESTAMPTZ
//! );
//!
//! CREATE TABLE organizations_users (
//!     organization_id VARCHAR NOT NULL,
//!     user_id BIGINT NOT NULL,
//!     joined_at TIMESTAMPTZ NOT NULL,
//!     PRIMARY KEY (organization_id, user_id)
//! );
//!
//! CREATE TABLE organization_user_permissions (
//!     organization_id VARCHAR NOT NULL,
//!     user_id BIGINT NOT NULL,
//!     action VARCHAR NOT NULL,
//!     permission BIGINT NOT NULL,
//!     PRIMARY KEY (organization_id, user_id, action)
//! );
//!
//! CREATE TABLE organization_invites (
//!     otp VARCHAR PRIMARY KEY,
//!     organization_id VARCHAR NOT NULL,
//!     user_id BIGINT NOT NULL,
//!     perms TEXT NOT NULL,        -- {"v":1,"perms":{"admin":3}}
//!     expires_at BIGINT NOT NULL
//! );
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Schema, Set, TransactionTrait,
    sea_query::OnConflict,
};
use std::collections::HashMap;

use super::storage::{InvitationStore, MembershipStore, OrganizationStore};
use super::types::{
    ADMIN_ACTION, AcceptedInvite, Invite, NEW_OWNER_NOT_MEMBER, NewOrganization, OWNER_ACTION,
    Organization, OrganizationSummary, OwnerGrantPolicy,
};
use crate::UserId;
use crate::error::{OrgwardError, Result};
use crate::permissions::{ActionPermissions, Permission};

// =============================================================================
// SeaORM Entities
// =============================================================================

mod entity {
    pub mod organization {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "organizations")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub id: String,
            pub name: String,
            pub owner_user_id: i64,
            pub billing_plan_id: Option<String>,
            pub created_at: DateTimeUtc,
            pub deleted_at: Option<DateTimeUtc>,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod member {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "organizations_users")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub organization_id: String,
            #[sea_orm(primary_key, auto_increment = false)]
            pub user_id: i64,
            pub joined_at: DateTimeUtc,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod grant {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "organization_user_permissions")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub organization_id: String,
            #[sea_orm(primary_key, auto_increment = false)]
            pub user_id: i64,
            #[sea_orm(primary_key, auto_increment = false)]
            pub action: String,
            pub permission: i64,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }

    pub mod invite {
        use sea_orm::entity::prelude::*;

        #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
        #[sea_orm(table_name = "organization_invites")]
        pub struct Model {
            #[sea_orm(primary_key, auto_increment = false)]
            pub otp: String,
            pub organization_id: String,
            pub user_id: i64,
            /// Versioned permission map.
            #[sea_orm(column_type = "Text")]
            pub perms: String,
            pub expires_at: i64,
        }

        #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
        pub enum Relation {}

        impl ActiveModelBehavior for ActiveModel {}
    }
}

use entity::{grant, invite, member, organization};

// =============================================================================
// Helper Functions
// =============================================================================

#[inline]
fn user_id_to_db(id: UserId) -> i64 {
    i64::from(id)
}

fn user_id_from_db(value: i64) -> Result<UserId> {
    UserId::try_from(value)
        .map_err(|_| OrgwardError::internal(format!("stored user id {} out of range", value)))
}

#[inline]
fn permission_to_db(permission: Permission) -> i64 {
    i64::from(permission.bits())
}

fn permission_from_db(value: i64) -> Result<Permission> {
    u32::try_from(value)
        .map(Permission::from_bits)
        .map_err(|_| OrgwardError::internal(format!("stored permission {} out of range", value)))
}

/// Convert u64 to i64 safely (values > i64::MAX become i64::MAX).
#[inline]
fn u64_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn model_to_organization(model: organization::Model) -> Result<Organization> {
    Ok(Organization {
        id: model.id,
        name: model.name,
        owner_user_id: user_id_from_db(model.owner_user_id)?,
        billing_plan_id: model.billing_plan_id,
        created_at: model.created_at,
        deleted_at: model.deleted_at,
    })
}

fn collect_grants(models: Vec<grant::Model>) -> Result<ActionPermissions> {
    let mut perms = ActionPermissions::new();
    for model in models {
        perms.grant(model.action, permission_from_db(model.permission)?);
    }
    Ok(perms)
}

fn org_not_found(org_id: &str) -> OrgwardError {
    OrgwardError::not_found(format!("organization {}", org_id))
}

/// Read the organization row with `SELECT ... FOR UPDATE`.
///
/// Owner changes and member removals both take this lock first, so each sees
/// the other's committed owner. SQLite ignores the clause and serializes
/// writers instead.
async fn lock_organization(txn: &DatabaseTransaction, org_id: &str) -> Result<organization::Model> {
    organization::Entity::find_by_id(org_id)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| org_not_found(org_id))
}

async fn find_membership<C: ConnectionTrait>(
    conn: &C,
    org_id: &str,
    user_id: UserId,
) -> Result<Option<member::Model>> {
    member::Entity::find()
        .filter(member::Column::OrganizationId.eq(org_id))
        .filter(member::Column::UserId.eq(user_id_to_db(user_id)))
        .one(conn)
        .await
        .map_err(Into::into)
}

async fn upsert_grant<C: ConnectionTrait>(
    conn: &C,
    org_id: &str,
    user_id: UserId,
    action: &str,
    permission: Permission,
) -> Result<()> {
    let model = grant::ActiveModel {
        organization_id: Set(org_id.to_string()),
        user_id: Set(user_id_to_db(user_id)),
        action: Set(action.to_string()),
        permission: Set(permission_to_db(permission)),
    };

    grant::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([
                grant::Column::OrganizationId,
                grant::Column::UserId,
                grant::Column::Action,
            ])
            .update_column(grant::Column::Permission)
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    Ok(())
}

// =============================================================================
// SeaOrmOrgStore
// =============================================================================

/// SeaORM-backed store implementing all organization storage traits.
#[derive(Clone, Debug)]
pub struct SeaOrmOrgStore {
    db: DatabaseConnection,
}

impl SeaOrmOrgStore {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Create the four tables if they do not exist.
    pub async fn create_tables(&self) -> Result<()> {
        let backend = self.db.get_database_backend();
        let schema = Schema::new(backend);

        let mut statements = [
            schema.create_table_from_entity(organization::Entity),
            schema.create_table_from_entity(member::Entity),
            schema.create_table_from_entity(grant::Entity),
            schema.create_table_from_entity(invite::Entity),
        ];
        for statement in statements.iter_mut() {
            statement.if_not_exists();
            self.db.execute(backend.build(&*statement)).await?;
        }

        tracing::info!("organization tables ready");
        Ok(())
    }

    async fn begin(&self) -> Result<DatabaseTransaction> {
        self.db
            .begin()
            .await
            .map_err(|e| OrgwardError::transaction_failed(format!("begin: {}", e)))
    }

    async fn commit(txn: DatabaseTransaction) -> Result<()> {
        txn.commit()
            .await
            .map_err(|e| OrgwardError::transaction_failed(format!("commit: {}", e)))
    }
}

// =============================================================================
// OrganizationStore Implementation
// =============================================================================

#[async_trait]
impl OrganizationStore for SeaOrmOrgStore {
    async fn create_organization(&self, new: &NewOrganization) -> Result<Organization> {
        tracing::debug!(org_id = %new.id, owner = new.owner_user_id, "creating organization");

        let now = Utc::now();
        let txn = self.begin().await?;

        organization::Entity::insert(organization::ActiveModel {
            id: Set(new.id.clone()),
            name: Set(new.name.clone()),
            owner_user_id: Set(user_id_to_db(new.owner_user_id)),
            billing_plan_id: Set(None),
            created_at: Set(now),
            deleted_at: Set(None),
        })
        .exec_without_returning(&txn)
        .await?;

        member::Entity::insert(member::ActiveModel {
            organization_id: Set(new.id.clone()),
            user_id: Set(user_id_to_db(new.owner_user_id)),
            joined_at: Set(now),
        })
        .exec_without_returning(&txn)
        .await?;

        for action in [ADMIN_ACTION, OWNER_ACTION] {
            upsert_grant(&txn, &new.id, new.owner_user_id, action, Permission::ALL).await?;
        }

        Self::commit(txn).await?;

        tracing::info!(org_id = %new.id, owner = new.owner_user_id, "organization created");

        Ok(Organization {
            id: new.id.clone(),
            name: new.name.clone(),
            owner_user_id: new.owner_user_id,
            billing_plan_id: None,
            created_at: now,
            deleted_at: None,
        })
    }

    async fn find_by_id(&self, org_id: &str) -> Result<Option<Organization>> {
        organization::Entity::find_by_id(org_id)
            .one(&self.db)
            .await?
            .map(model_to_organization)
            .transpose()
    }

    async fn set_organization_owner(
        &self,
        org_id: &str,
        new_owner: UserId,
        policy: OwnerGrantPolicy,
    ) -> Result<()> {
        let txn = self.begin().await?;

        let model = lock_organization(&txn, org_id).await?;
        if find_membership(&txn, org_id, new_owner).await?.is_none() {
            return Err(OrgwardError::conflict(NEW_OWNER_NOT_MEMBER));
        }
        let previous = user_id_from_db(model.owner_user_id)?;

        let mut active: organization::ActiveModel = model.into();
        active.owner_user_id = Set(user_id_to_db(new_owner));
        active.update(&txn).await?;

        upsert_grant(&txn, org_id, new_owner, OWNER_ACTION, Permission::ALL).await?;

        if policy == OwnerGrantPolicy::RevokePrevious && previous != new_owner {
            grant::Entity::delete_many()
                .filter(grant::Column::OrganizationId.eq(org_id))
                .filter(grant::Column::UserId.eq(user_id_to_db(previous)))
                .filter(grant::Column::Action.eq(OWNER_ACTION))
                .exec(&txn)
                .await?;
        }

        Self::commit(txn).await?;

        tracing::info!(org_id = %org_id, previous, new_owner, ?policy, "organization owner changed");
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<OrganizationSummary>> {
        let uid = user_id_to_db(user_id);

        let org_ids: Vec<String> = member::Entity::find()
            .filter(member::Column::UserId.eq(uid))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| m.organization_id)
            .collect();

        if org_ids.is_empty() {
            return Ok(vec![]);
        }

        let orgs = organization::Entity::find()
            .filter(organization::Column::Id.is_in(org_ids.clone()))
            .filter(organization::Column::DeletedAt.is_null())
            .order_by_asc(organization::Column::Id)
            .all(&self.db)
            .await?;

        let mut grants_by_org: HashMap<String, Vec<grant::Model>> = HashMap::new();
        for model in grant::Entity::find()
            .filter(grant::Column::UserId.eq(uid))
            .filter(grant::Column::OrganizationId.is_in(org_ids))
            .all(&self.db)
            .await?
        {
            grants_by_org
                .entry(model.organization_id.clone())
                .or_default()
                .push(model);
        }

        orgs.into_iter()
            .map(|org| {
                let perms = collect_grants(grants_by_org.remove(&org.id).unwrap_or_default())?;
                Ok(OrganizationSummary {
                    is_owner: org.owner_user_id == uid,
                    organization_id: org.id,
                    name: org.name,
                    perms,
                })
            })
            .collect()
    }
}

// =============================================================================
// MembershipStore Implementation
// =============================================================================

#[async_trait]
impl MembershipStore for SeaOrmOrgStore {
    async fn is_member(&self, org_id: &str, user_id: UserId) -> Result<bool> {
        let found = member::Entity::find()
            .filter(member::Column::OrganizationId.eq(org_id))
            .filter(member::Column::UserId.eq(user_id_to_db(user_id)))
            .one(&self.db)
            .await?;
        Ok(found.is_some())
    }

    async fn permissions(&self, org_id: &str, user_id: UserId) -> Result<ActionPermissions> {
        let models = grant::Entity::find()
            .filter(grant::Column::OrganizationId.eq(org_id))
            .filter(grant::Column::UserId.eq(user_id_to_db(user_id)))
            .all(&self.db)
            .await?;
        collect_grants(models)
    }

    async fn set_permission(
        &self,
        org_id: &str,
        user_id: UserId,
        action: &str,
        permission: Permission,
    ) -> Result<()> {
        let txn = self.begin().await?;

        if find_membership(&txn, org_id, user_id).await?.is_none() {
            return Err(OrgwardError::not_found("membership"));
        }

        upsert_grant(&txn, org_id, user_id, action, permission).await?;
        Self::commit(txn).await?;

        tracing::info!(org_id = %org_id, user_id, action, %permission, "permission set");
        Ok(())
    }

    async fn revoke_permission(&self, org_id: &str, user_id: UserId, action: &str) -> Result<bool> {
        let result = grant::Entity::delete_many()
            .filter(grant::Column::OrganizationId.eq(org_id))
            .filter(grant::Column::UserId.eq(user_id_to_db(user_id)))
            .filter(grant::Column::Action.eq(action))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    async fn remove_user_from_org(&self, org_id: &str, user_id: UserId) -> Result<()> {
        let uid = user_id_to_db(user_id);
        let txn = self.begin().await?;

        let org = lock_organization(&txn, org_id).await?;
        if org.owner_user_id == uid {
            return Err(OrgwardError::conflict("cannot remove the organization owner"));
        }

        let removed = member::Entity::delete_many()
            .filter(member::Column::OrganizationId.eq(org_id))
            .filter(member::Column::UserId.eq(uid))
            .exec(&txn)
            .await?;
        if removed.rows_affected == 0 {
            return Err(OrgwardError::not_found("membership"));
        }

        grant::Entity::delete_many()
            .filter(grant::Column::OrganizationId.eq(org_id))
            .filter(grant::Column::UserId.eq(uid))
            .exec(&txn)
            .await?;

        Self::commit(txn).await?;

        tracing::info!(org_id = %org_id, user_id, "user removed from organization");
        Ok(())
    }
}

// =============================================================================
// InvitationStore Implementation
// =============================================================================

#[async_trait]
impl InvitationStore for SeaOrmOrgStore {
    async fn create_invite(&self, inv: &Invite) -> Result<()> {
        invite::Entity::insert(invite::ActiveModel {
            otp: Set(inv.otp.clone()),
            organization_id: Set(inv.organization_id.clone()),
            user_id: Set(user_id_to_db(inv.user_id)),
            perms: Set(inv.perms.to_versioned_json()?),
            expires_at: Set(u64_to_i64(inv.expires_at)),
        })
        .exec_without_returning(&self.db)
        .await?;

        tracing::debug!(org_id = %inv.organization_id, user_id = inv.user_id, "invite stored");
        Ok(())
    }

    async fn accept_invite(&self, otp: &str, now: u64) -> Result<AcceptedInvite> {
        let txn = self.begin().await?;

        let model = invite::Entity::find_by_id(otp)
            .filter(invite::Column::ExpiresAt.gt(u64_to_i64(now)))
            .one(&txn)
            .await?
            .ok_or_else(|| OrgwardError::not_found("invitation"))?;

        // Invites outlive soft deletion; a deleted organization takes no members.
        let org = organization::Entity::find_by_id(model.organization_id.as_str())
            .lock_shared()
            .one(&txn)
            .await?;
        if !org.is_some_and(|org| org.deleted_at.is_none()) {
            return Err(OrgwardError::not_found("invitation"));
        }

        let perms = ActionPermissions::from_versioned_json(&model.perms)?;
        let user_id = user_id_from_db(model.user_id)?;

        // Primary key violation here means the user is already a member.
        member::Entity::insert(member::ActiveModel {
            organization_id: Set(model.organization_id.clone()),
            user_id: Set(model.user_id),
            joined_at: Set(Utc::now()),
        })
        .exec_without_returning(&txn)
        .await?;

        for (action, permission) in perms.iter() {
            upsert_grant(&txn, &model.organization_id, user_id, action, permission).await?;
        }

        let deleted = invite::Entity::delete_by_id(otp).exec(&txn).await?;
        if deleted.rows_affected == 0 {
            return Err(OrgwardError::not_found("invitation"));
        }

        Self::commit(txn).await?;

        tracing::info!(org_id = %model.organization_id, user_id, "invite accepted");

        Ok(AcceptedInvite {
            organization_id: model.organization_id,
            user_id,
            perms,
        })
    }

    async fn delete_expired_invites(&self, now: u64) -> Result<u64> {
        let result = invite::Entity::delete_many()
            .filter(invite::Column::ExpiresAt.lte(u64_to_i64(now)))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
