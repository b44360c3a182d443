//! Identity and user record types.

use chrono::{DateTime, Utc};
use claim_store::UserRole;
use serde::{Deserialize, Serialize};

/// Identity as received from the external provider.
///
/// Immutable once received. Never persisted verbatim; the bridge folds
/// `raw_metadata` into the internal user's metadata during reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalIdentity {
    /// Provider-scoped stable user identifier
    pub external_user_id: String,
    /// Verified email addresses, primary first
    #[serde(default)]
    pub emails: Vec<String>,
    /// Display name, if the provider has one
    #[serde(default)]
    pub display_name: Option<String>,
    /// Opaque provider metadata blob
    #[serde(default)]
    pub raw_metadata: serde_json::Value,
}

impl ExternalIdentity {
    /// Primary email address, if any.
    pub fn primary_email(&self) -> Option<&str> {
        self.emails.first().map(String::as_str)
    }

    /// Display name with fallback to the email local part, then `"User"`.
    pub fn derived_name(&self) -> String {
        if let Some(name) = self.display_name.as_deref() {
            let trimmed = name.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
        self.primary_email()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or("User")
            .to_string()
    }
}

/// Organization as received from the external provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalOrganization {
    /// Provider-scoped stable organization identifier
    pub external_org_id: String,
    /// Organization display name
    pub name: String,
    /// URL-safe slug
    pub slug: String,
    /// Email domains allowed to join, if restricted
    #[serde(default)]
    pub email_allowed_domains: Vec<String>,
    /// Opaque provider metadata blob
    #[serde(default)]
    pub raw_metadata: serde_json::Value,
}

/// Reconciled user record owned by the application database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalUser {
    /// Database surrogate key
    pub id: i64,
    /// Unique link to the external identity; never reused across users
    pub external_user_id: String,
    /// Current email
    pub email: String,
    /// Current display name
    pub name: String,
    /// Linked organization, if any
    #[serde(default)]
    pub organization_id: Option<i64>,
    /// Role; defaults to the least-privileged tier on creation
    pub role: UserRole,
    /// Superset-merged metadata, last write wins per key
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// Updated on every successful reconciliation
    pub last_login_at: DateTime<Utc>,
}

/// Reconciled organization record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InternalOrganization {
    /// Database surrogate key
    pub id: i64,
    /// Unique link to the external organization
    pub external_org_id: String,
    /// Display name
    pub name: String,
    /// URL-safe slug
    pub slug: String,
    /// Primary allowed email domain, if restricted
    #[serde(default)]
    pub domain: Option<String>,
    /// Superset-merged settings
    #[serde(default)]
    pub settings: serde_json::Value,
}

/// Fields for inserting a new user.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub external_user_id: String,
    pub email: String,
    pub name: String,
    pub organization_id: Option<i64>,
    pub role: UserRole,
    pub metadata: serde_json::Value,
    pub last_login_at: DateTime<Utc>,
}

/// Fields written when updating an existing user during reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct UserPatch {
    pub email: String,
    pub name: String,
    pub metadata: serde_json::Value,
    pub last_login_at: DateTime<Utc>,
}

/// Fields for inserting a new organization.
#[derive(Debug, Clone, Serialize)]
pub struct NewOrganization {
    pub external_org_id: String,
    pub name: String,
    pub slug: String,
    pub domain: Option<String>,
    pub settings: serde_json::Value,
}

/// Fields written when updating an existing organization.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationPatch {
    pub name: String,
    pub slug: String,
    pub domain: Option<String>,
    pub settings: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_email_is_first() {
        let identity = ExternalIdentity {
            external_user_id: "u1".to_string(),
            emails: vec!["a@x.com".to_string(), "b@x.com".to_string()],
            display_name: None,
            raw_metadata: serde_json::Value::Null,
        };
        assert_eq!(identity.primary_email(), Some("a@x.com"));
    }

    #[test]
    fn test_derived_name_prefers_display_name() {
        let identity = ExternalIdentity {
            external_user_id: "u1".to_string(),
            emails: vec!["ada@x.com".to_string()],
            display_name: Some("Ada Lovelace".to_string()),
            raw_metadata: serde_json::Value::Null,
        };
        assert_eq!(identity.derived_name(), "Ada Lovelace");
    }

    #[test]
    fn test_derived_name_falls_back_to_email_local_part() {
        let identity = ExternalIdentity {
            external_user_id: "u1".to_string(),
            emails: vec!["ada@x.com".to_string()],
            display_name: None,
            raw_metadata: serde_json::Value::Null,
        };
        assert_eq!(identity.derived_name(), "ada");
    }

    #[test]
    fn test_derived_name_blank_display_name_falls_through() {
        let identity = ExternalIdentity {
            external_user_id: "u1".to_string(),
            emails: vec!["ada@x.com".to_string()],
            display_name: Some("   ".to_string()),
            raw_metadata: serde_json::Value::Null,
        };
        assert_eq!(identity.derived_name(), "ada");
    }

    #[test]
    fn test_derived_name_defaults_to_user() {
        let identity = ExternalIdentity {
            external_user_id: "u1".to_string(),
            emails: vec![],
            display_name: None,
            raw_metadata: serde_json::Value::Null,
        };
        assert_eq!(identity.derived_name(), "User");
    }

    #[test]
    fn test_internal_user_round_trip() {
        let user = InternalUser {
            id: 3,
            external_user_id: "u3".to_string(),
            email: "c@x.com".to_string(),
            name: "c".to_string(),
            organization_id: Some(1),
            role: UserRole::User,
            metadata: serde_json::json!({"plan": "free"}),
            last_login_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        let parsed: InternalUser = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, user);
    }
}
