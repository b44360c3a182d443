//! Identity reconciliation between an external provider and the application database.
//!
//! The identity provider owns authentication (magic links, OAuth); the
//! application database owns users and organizations. This crate maps a
//! provider-scoped identity onto an internal user record:
//!
//! ```text
//! provider session → IdentityBridge::reconcile → internal user row
//!                  → IdentityBridge::issue_claims → claim store
//! ```
//!
//! Reconciliation is create-or-update keyed on the external user ID, with
//! uniqueness enforced by the backing store. A conflict on insert means a
//! concurrent reconciliation won the race; the loser retries as an update,
//! so duplicate callback delivery can never mint a second user row.

mod bridge;
mod error;
mod policy;
mod postgrest;
mod provider;
mod repository;
mod types;

pub use bridge::IdentityBridge;
pub use error::{BridgeError, BridgeResult};
pub use policy::RevalidationPolicy;
pub use postgrest::PostgrestUserRepository;
pub use provider::{HttpIdentityProvider, IdentityProvider, ProviderSession};
pub use repository::UserRepository;
pub use types::{
    ExternalIdentity, ExternalOrganization, InternalOrganization, InternalUser, NewOrganization,
    NewUser, OrganizationPatch, UserPatch,
};

// Claims live in the storage crate; re-export the types callers need.
pub use claim_store::{ClaimStore, SessionClaims, UserRole};
