//! Typed session claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role assigned to an internal user.
///
/// New users always start at the least-privileged tier; promotion is an
/// administrative action outside the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Organization administrator.
    Admin,
    /// Regular user (default for newly reconciled identities).
    #[default]
    User,
}

/// Locally cached identity assertion produced by a successful reconciliation.
///
/// Claims are a snapshot of the internal user record plus the external
/// session identifier used to correlate with the identity provider. They
/// carry no TTL; staleness is bounded only by explicit re-reconciliation
/// or a revalidation policy applied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Internal user ID (database surrogate key)
    pub internal_user_id: i64,
    /// Provider-scoped user ID
    pub external_user_id: String,
    /// Organization the user belongs to, if linked
    #[serde(default)]
    pub organization_id: Option<i64>,
    /// Role as of the last reconciliation
    pub role: UserRole,
    /// Email as of the last reconciliation
    pub email: String,
    /// External session identifier from the identity provider
    pub external_session_id: String,
    /// When these claims were issued
    pub issued_at: DateTime<Utc>,
}

impl SessionClaims {
    /// Age of these claims relative to `now`.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        now.signed_duration_since(self.issued_at)
    }
}
