//! Repository port over the internal user and organization tables.

use crate::types::{
    InternalOrganization, InternalUser, NewOrganization, NewUser, OrganizationPatch, UserPatch,
};
use crate::BridgeResult;
use async_trait::async_trait;

/// CRUD access to the internal `users` and `organizations` tables.
///
/// The backing store must enforce uniqueness of `external_user_id` and
/// `external_org_id`; `insert_user`/`insert_org` signal a violated
/// constraint with `BridgeError::Conflict` so the bridge can retry the
/// reconciliation as an update.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Look up a user by the provider-scoped identifier.
    async fn find_by_external_id(&self, external_user_id: &str)
        -> BridgeResult<Option<InternalUser>>;

    /// Look up a user by the internal surrogate key.
    async fn find_by_id(&self, id: i64) -> BridgeResult<Option<InternalUser>>;

    /// Insert a new user. Fails with `Conflict` when a concurrent insert
    /// already created the row for that external id.
    async fn insert_user(&self, fields: NewUser) -> BridgeResult<InternalUser>;

    /// Update an existing user, returning the stored record.
    async fn update_user(&self, id: i64, patch: UserPatch) -> BridgeResult<InternalUser>;

    /// Set the user's organization association.
    async fn set_user_organization(
        &self,
        user_id: i64,
        organization_id: i64,
    ) -> BridgeResult<InternalUser>;

    /// Look up an organization by the provider-scoped identifier.
    async fn find_org_by_external_id(
        &self,
        external_org_id: &str,
    ) -> BridgeResult<Option<InternalOrganization>>;

    /// Insert a new organization. Same conflict contract as `insert_user`.
    async fn insert_org(&self, fields: NewOrganization) -> BridgeResult<InternalOrganization>;

    /// Update an existing organization, returning the stored record.
    async fn update_org(
        &self,
        id: i64,
        patch: OrganizationPatch,
    ) -> BridgeResult<InternalOrganization>;
}
