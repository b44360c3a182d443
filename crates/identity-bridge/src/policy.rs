//! Claim revalidation policy.

use chrono::{DateTime, Duration, Utc};
use claim_store::SessionClaims;

/// When cached claims must be revalidated against the user table.
///
/// Cached claims are a snapshot; administrative changes (role revocation,
/// organization moves, user deletion) are only observed through a refresh.
/// The policy makes that trade-off explicit instead of trusting the cache
/// indefinitely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevalidationPolicy {
    /// Never refresh automatically; callers refresh explicitly.
    TrustCache,
    /// Refresh on every identity read.
    AlwaysRefresh,
    /// Refresh once the claims are older than the given duration.
    MaxClaimsAge(Duration),
}

/// Default maximum claim age, matching the provider session duration.
const DEFAULT_MAX_CLAIMS_AGE_MINUTES: i64 = 480;

impl Default for RevalidationPolicy {
    fn default() -> Self {
        RevalidationPolicy::MaxClaimsAge(Duration::minutes(DEFAULT_MAX_CLAIMS_AGE_MINUTES))
    }
}

impl RevalidationPolicy {
    /// Whether the given claims require a refresh at `now`.
    pub fn needs_refresh(&self, claims: &SessionClaims, now: DateTime<Utc>) -> bool {
        match self {
            RevalidationPolicy::TrustCache => false,
            RevalidationPolicy::AlwaysRefresh => true,
            RevalidationPolicy::MaxClaimsAge(max_age) => claims.age(now) >= *max_age,
        }
    }
}
