//! Session runtime: the login/verify/logout authority.

use crate::{RuntimeError, RuntimeResult};
use chrono::Utc;
use claim_store::SessionClaims;
use identity_bridge::{IdentityBridge, IdentityProvider, RevalidationPolicy};
use realtime_channels::ChannelRegistry;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared authority for session flows.
///
/// Centralizes login, cached-identity reads, revalidation, and teardown so
/// every consumer goes through one lifecycle. A reconciliation failure
/// anywhere in `login` aborts the flow; without a successful login the
/// caller must treat the user as unauthenticated.
pub struct SessionRuntime {
    bridge: Arc<IdentityBridge>,
    registry: Arc<ChannelRegistry>,
    provider: Arc<dyn IdentityProvider>,
    policy: RevalidationPolicy,
    session_duration_minutes: u32,
}

impl SessionRuntime {
    /// Create a runtime over shared collaborators.
    pub fn new(
        bridge: Arc<IdentityBridge>,
        registry: Arc<ChannelRegistry>,
        provider: Arc<dyn IdentityProvider>,
        session_duration_minutes: u32,
    ) -> Self {
        Self {
            bridge,
            registry,
            provider,
            policy: RevalidationPolicy::default(),
            session_duration_minutes,
        }
    }

    /// Replace the default revalidation policy.
    pub fn with_policy(mut self, policy: RevalidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Exchange a login token for reconciled session claims.
    ///
    /// Authenticates against the provider, reconciles the external identity
    /// into the user table, and caches the resulting claims.
    pub async fn login(&self, token: &str) -> RuntimeResult<SessionClaims> {
        let session = self
            .provider
            .authenticate(token, self.session_duration_minutes)
            .await?;

        if !(200..300).contains(&session.status_code) {
            warn!(status = session.status_code, "Provider rejected login token");
            return Err(RuntimeError::AuthRejected(session.status_code));
        }

        let user = self.bridge.reconcile(&session.user).await?;
        let claims = self.bridge.issue_claims(&user, &session.session_id)?;

        info!(
            internal_user_id = user.id,
            external_user_id = %user.external_user_id,
            "Login completed"
        );
        Ok(claims)
    }

    /// Read the cached claims without any revalidation.
    pub fn current_claims(&self) -> RuntimeResult<Option<SessionClaims>> {
        Ok(self.bridge.current_claims()?)
    }

    /// Validate the cached session per the revalidation policy.
    ///
    /// Fresh-enough claims are returned as-is. Stale claims trigger a
    /// re-fetch of the user row; on success the claims are reissued with
    /// current role and organization values. A missing row is a forced
    /// sign-out: claims are cleared and `None` is returned.
    pub async fn verify_session(&self) -> RuntimeResult<Option<SessionClaims>> {
        let Some(claims) = self.bridge.current_claims()? else {
            return Ok(None);
        };

        if !self.policy.needs_refresh(&claims, Utc::now()) {
            return Ok(Some(claims));
        }

        match self.bridge.refresh_user(&claims).await? {
            Some(user) => {
                let fresh = self
                    .bridge
                    .issue_claims(&user, &claims.external_session_id)?;
                info!(internal_user_id = user.id, "Session revalidated");
                Ok(Some(fresh))
            }
            None => {
                warn!(
                    internal_user_id = claims.internal_user_id,
                    "User gone, forcing sign-out"
                );
                self.bridge.clear()?;
                Ok(None)
            }
        }
    }

    /// Tear down the session: close every realtime feed, drop all claims.
    pub async fn logout(&self) -> RuntimeResult<()> {
        self.registry.unsubscribe_all().await;
        self.bridge.clear()?;
        info!("Session terminated");
        Ok(())
    }

    /// The identity bridge behind this runtime.
    pub fn bridge(&self) -> &Arc<IdentityBridge> {
        &self.bridge
    }

    /// The channel registry behind this runtime.
    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }
}
