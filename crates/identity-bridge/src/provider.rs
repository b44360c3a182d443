//! Identity provider port and HTTP client.

use crate::types::ExternalIdentity;
use crate::{BridgeError, BridgeResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use url::Url;

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Result of exchanging a login token with the identity provider.
#[derive(Debug, Clone)]
pub struct ProviderSession {
    /// HTTP status code reported by the provider
    pub status_code: u16,
    /// The authenticated external identity
    pub user: ExternalIdentity,
    /// Provider session identifier, used to correlate claims
    pub session_id: String,
}

/// Opaque client for the external identity provider.
///
/// The bridge never parses provider token formats; it only consumes this
/// structured result.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Exchange a magic-link or OAuth token for an authenticated session.
    async fn authenticate(
        &self,
        token: &str,
        session_duration_minutes: u32,
    ) -> BridgeResult<ProviderSession>;
}

/// Request body for the provider's authenticate endpoint.
#[derive(Debug, Serialize)]
struct AuthenticateRequest<'a> {
    token: &'a str,
    session_duration_minutes: u32,
}

#[derive(Debug, Deserialize)]
struct AuthenticateResponse {
    user: WireUser,
    session: WireSession,
}

#[derive(Debug, Deserialize)]
struct WireUser {
    user_id: String,
    #[serde(default)]
    emails: Vec<String>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    metadata: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct WireSession {
    session_id: String,
}

/// HTTP implementation of the identity provider port.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    http_client: reqwest::Client,
    api_url: String,
    public_token: String,
}

impl HttpIdentityProvider {
    /// Create a new provider client.
    ///
    /// # Arguments
    /// * `api_url` - The provider API base URL
    /// * `public_token` - The provider's public (publishable) token
    pub fn new(api_url: &str, public_token: impl Into<String>) -> BridgeResult<Self> {
        let parsed = Url::parse(api_url)?;
        Ok(Self {
            http_client: reqwest::Client::new(),
            api_url: parsed.as_str().trim_end_matches('/').to_string(),
            public_token: public_token.into(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn authenticate(
        &self,
        token: &str,
        session_duration_minutes: u32,
    ) -> BridgeResult<ProviderSession> {
        let url = format!("{}/sessions/authenticate", self.api_url);

        tracing::debug!(session_duration_minutes, "Authenticating with identity provider");

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.public_token))
            .header("Content-Type", "application/json")
            .json(&AuthenticateRequest {
                token,
                session_duration_minutes,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body_summary = summarize_response_body(&body);
            tracing::error!(status = %status, body_summary = %body_summary, "Provider authentication failed");
            return Err(BridgeError::Provider {
                status: status.as_u16(),
                message: body_summary,
            });
        }

        let parsed: AuthenticateResponse = response.json().await?;
        tracing::info!(
            external_user_id = %parsed.user.user_id,
            "Provider authentication succeeded"
        );

        Ok(ProviderSession {
            status_code: status.as_u16(),
            user: ExternalIdentity {
                external_user_id: parsed.user.user_id,
                emails: parsed.user.emails,
                display_name: parsed.user.display_name,
                raw_metadata: parsed.user.metadata,
            },
            session_id: parsed.session.session_id,
        })
    }
}
