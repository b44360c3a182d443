//! Reconciliation between external identities and internal records.

use crate::repository::UserRepository;
use crate::types::{
    ExternalIdentity, ExternalOrganization, InternalOrganization, InternalUser, NewOrganization,
    NewUser, OrganizationPatch, UserPatch,
};
use crate::{BridgeError, BridgeResult};
use chrono::Utc;
use claim_store::{ClaimStore, SessionClaims, UserRole};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Bridges the external identity provider and the internal user table.
///
/// One bridge instance per running application context; it is the only
/// writer to the claim store. All reconciliation errors surface to the
/// caller; a failed reconcile means the user stays unauthenticated.
pub struct IdentityBridge {
    repository: Arc<dyn UserRepository>,
    claims: ClaimStore,
}

impl IdentityBridge {
    /// Create a bridge over a repository and a claim store.
    pub fn new(repository: Arc<dyn UserRepository>, claims: ClaimStore) -> Self {
        Self { repository, claims }
    }

    /// Create-or-update the internal user for an external identity.
    ///
    /// Looks up by external user id. On a hit the record is merged and
    /// updated; on a miss a new record is inserted with the default role
    /// and no organization. A `Conflict` from the insert means a concurrent
    /// reconciliation created the row first, so the call retries once as an
    /// update. Persistence failures propagate untouched.
    pub async fn reconcile(&self, identity: &ExternalIdentity) -> BridgeResult<InternalUser> {
        let existing = self
            .repository
            .find_by_external_id(&identity.external_user_id)
            .await?;

        if let Some(existing) = existing {
            return self.apply_update(existing, identity).await;
        }

        let fields = NewUser {
            external_user_id: identity.external_user_id.clone(),
            email: identity.primary_email().unwrap_or_default().to_string(),
            name: identity.derived_name(),
            organization_id: None,
            role: UserRole::default(),
            metadata: provider_metadata(&identity.raw_metadata),
            last_login_at: Utc::now(),
        };

        match self.repository.insert_user(fields).await {
            Ok(created) => {
                info!(
                    internal_user_id = created.id,
                    external_user_id = %created.external_user_id,
                    "Created internal user"
                );
                Ok(created)
            }
            Err(BridgeError::Conflict(_)) => {
                // Lost the insert race; the winner's row must be visible now.
                debug!(
                    external_user_id = %identity.external_user_id,
                    "Concurrent insert detected, retrying reconciliation as update"
                );
                let existing = self
                    .repository
                    .find_by_external_id(&identity.external_user_id)
                    .await?
                    .ok_or_else(|| {
                        BridgeError::Persistence(format!(
                            "insert conflicted but no row found for external id {}",
                            identity.external_user_id
                        ))
                    })?;
                self.apply_update(existing, identity).await
            }
            Err(err) => Err(err),
        }
    }

    async fn apply_update(
        &self,
        existing: InternalUser,
        identity: &ExternalIdentity,
    ) -> BridgeResult<InternalUser> {
        let incoming_email = identity.primary_email().unwrap_or_default();
        let patch = UserPatch {
            email: merge_field(&existing.email, incoming_email),
            name: merge_field(&existing.name, &identity.derived_name()),
            metadata: merge_metadata(&existing.metadata, &provider_metadata(&identity.raw_metadata)),
            last_login_at: Utc::now(),
        };

        let updated = self.repository.update_user(existing.id, patch).await?;
        info!(
            internal_user_id = updated.id,
            external_user_id = %updated.external_user_id,
            "Updated internal user"
        );
        Ok(updated)
    }

    /// Create-or-update the internal organization for an external one.
    ///
    /// Same pattern as `reconcile`, keyed on the external organization id.
    pub async fn reconcile_organization(
        &self,
        org: &ExternalOrganization,
    ) -> BridgeResult<InternalOrganization> {
        let existing = self
            .repository
            .find_org_by_external_id(&org.external_org_id)
            .await?;

        if let Some(existing) = existing {
            return self.apply_org_update(existing, org).await;
        }

        let fields = NewOrganization {
            external_org_id: org.external_org_id.clone(),
            name: org.name.clone(),
            slug: org.slug.clone(),
            domain: org.email_allowed_domains.first().cloned(),
            settings: provider_metadata(&org.raw_metadata),
        };

        match self.repository.insert_org(fields).await {
            Ok(created) => {
                info!(
                    organization_id = created.id,
                    external_org_id = %created.external_org_id,
                    "Created internal organization"
                );
                Ok(created)
            }
            Err(BridgeError::Conflict(_)) => {
                debug!(
                    external_org_id = %org.external_org_id,
                    "Concurrent organization insert detected, retrying as update"
                );
                let existing = self
                    .repository
                    .find_org_by_external_id(&org.external_org_id)
                    .await?
                    .ok_or_else(|| {
                        BridgeError::Persistence(format!(
                            "insert conflicted but no row found for external org id {}",
                            org.external_org_id
                        ))
                    })?;
                self.apply_org_update(existing, org).await
            }
            Err(err) => Err(err),
        }
    }

    async fn apply_org_update(
        &self,
        existing: InternalOrganization,
        org: &ExternalOrganization,
    ) -> BridgeResult<InternalOrganization> {
        let patch = OrganizationPatch {
            name: merge_field(&existing.name, &org.name),
            slug: merge_field(&existing.slug, &org.slug),
            domain: org.email_allowed_domains.first().cloned(),
            settings: merge_metadata(&existing.settings, &provider_metadata(&org.raw_metadata)),
        };
        self.repository.update_org(existing.id, patch).await
    }

    /// Link a user to an organization.
    pub async fn link_user_organization(
        &self,
        user_id: i64,
        organization_id: i64,
    ) -> BridgeResult<InternalUser> {
        let updated = self
            .repository
            .set_user_organization(user_id, organization_id)
            .await?;
        info!(
            internal_user_id = user_id,
            organization_id, "Linked user to organization"
        );
        Ok(updated)
    }

    /// Derive session claims from a reconciled user and persist them.
    ///
    /// Pure derivation plus one claim-store write; no external calls.
    pub fn issue_claims(
        &self,
        user: &InternalUser,
        external_session_id: &str,
    ) -> BridgeResult<SessionClaims> {
        let claims = SessionClaims {
            internal_user_id: user.id,
            external_user_id: user.external_user_id.clone(),
            organization_id: user.organization_id,
            role: user.role,
            email: user.email.clone(),
            external_session_id: external_session_id.to_string(),
            issued_at: Utc::now(),
        };
        self.claims.write(&claims)?;
        Ok(claims)
    }

    /// Read the currently cached claims, if any.
    pub fn current_claims(&self) -> BridgeResult<Option<SessionClaims>> {
        Ok(self.claims.read()?)
    }

    /// Re-fetch the user behind a set of claims.
    ///
    /// Claims may be stale relative to administrative changes (role or
    /// organization edits made elsewhere). Returns `None` when the row no
    /// longer exists; callers must treat that as a forced sign-out.
    pub async fn refresh_user(&self, claims: &SessionClaims) -> BridgeResult<Option<InternalUser>> {
        let user = self.repository.find_by_id(claims.internal_user_id).await?;
        if user.is_none() {
            warn!(
                internal_user_id = claims.internal_user_id,
                "User behind cached claims no longer exists"
            );
        }
        Ok(user)
    }

    /// Remove all cached claims. Idempotent.
    pub fn clear(&self) -> BridgeResult<()> {
        Ok(self.claims.clear()?)
    }
}

/// Overwrite only if the existing value is empty, or the incoming value is
/// non-empty and different.
fn merge_field(existing: &str, incoming: &str) -> String {
    if existing.is_empty() || (!incoming.is_empty() && incoming != existing) {
        incoming.to_string()
    } else {
        existing.to_string()
    }
}

/// Key-by-key superset merge; incoming values win. Non-object sides fall
/// back to whichever side carries data.
fn merge_metadata(existing: &serde_json::Value, incoming: &serde_json::Value) -> serde_json::Value {
    match (existing, incoming) {
        (serde_json::Value::Object(a), serde_json::Value::Object(b)) => {
            let mut merged = a.clone();
            for (key, value) in b {
                merged.insert(key.clone(), value.clone());
            }
            serde_json::Value::Object(merged)
        }
        (_, incoming) if !incoming.is_null() => incoming.clone(),
        (existing, _) => existing.clone(),
    }
}

/// Fold the provider's opaque metadata blob into a mergeable object.
fn provider_metadata(raw: &serde_json::Value) -> serde_json::Value {
    match raw {
        serde_json::Value::Object(_) => raw.clone(),
        serde_json::Value::Null => serde_json::json!({}),
        other => serde_json::json!({ "provider": other }),
    }
}
