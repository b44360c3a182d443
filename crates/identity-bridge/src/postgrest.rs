//! PostgREST-backed repository over the internal user and organization tables.

use crate::repository::UserRepository;
use crate::types::{
    InternalOrganization, InternalUser, NewOrganization, NewUser, OrganizationPatch, UserPatch,
};
use crate::{BridgeError, BridgeResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use url::Url;

fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Repository implementation over a PostgREST-style REST API.
///
/// Uses a service-role key for both the `apikey` header and the bearer
/// token, since reconciliation runs server-side and must bypass row-level
/// policies the way the original admin client did. Unique constraints on
/// `users.external_user_id` and `organizations.external_org_id` surface as
/// HTTP 409, which maps to `BridgeError::Conflict`.
#[derive(Clone)]
pub struct PostgrestUserRepository {
    http_client: reqwest::Client,
    api_url: String,
    service_key: String,
}

impl PostgrestUserRepository {
    /// Create a new repository client.
    ///
    /// # Arguments
    /// * `api_url` - The database project API URL (e.g., `https://xyz.example.co`)
    /// * `service_key` - The service-role API key
    pub fn new(api_url: &str, service_key: impl Into<String>) -> BridgeResult<Self> {
        let parsed = Url::parse(api_url)?;
        Ok(Self {
            http_client: reqwest::Client::new(),
            api_url: parsed.as_str().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
        })
    }

    /// Build the REST API URL for a table.
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.api_url, table)
    }

    async fn fetch_rows<T: DeserializeOwned>(&self, url: &str) -> BridgeResult<Vec<T>> {
        let response = self
            .http_client
            .get(url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let body_summary = summarize_response_body(&body);
            tracing::error!(status = %status, body_summary = %body_summary, "Row fetch failed");
            return Err(BridgeError::Persistence(format!(
                "fetch failed: {} ({})",
                status, body_summary
            )));
        }

        Ok(response.json().await?)
    }

    async fn insert_row<T: DeserializeOwned, B: Serialize>(
        &self,
        table: &str,
        body: &B,
    ) -> BridgeResult<T> {
        let response = self
            .http_client
            .post(self.rest_url(table))
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::CONFLICT {
            let body = response.text().await.unwrap_or_default();
            let body_summary = summarize_response_body(&body);
            tracing::debug!(table, body_summary = %body_summary, "Insert hit unique constraint");
            return Err(BridgeError::Conflict(format!(
                "unique constraint on {}",
                table
            )));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body_summary = summarize_response_body(&body);
            tracing::error!(status = %status, table, body_summary = %body_summary, "Insert failed");
            return Err(BridgeError::Persistence(format!(
                "insert into {} failed: {} ({})",
                table, status, body_summary
            )));
        }

        let mut rows: Vec<T> = response.json().await?;
        rows.pop().ok_or_else(|| {
            BridgeError::Persistence(format!("insert into {} returned no rows", table))
        })
    }

    async fn patch_row<T: DeserializeOwned, B: Serialize>(
        &self,
        table: &str,
        id: i64,
        body: &B,
    ) -> BridgeResult<T> {
        let url = format!("{}?id=eq.{}", self.rest_url(table), id);

        let response = self
            .http_client
            .patch(&url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body_summary = summarize_response_body(&body);
            tracing::error!(status = %status, table, id, body_summary = %body_summary, "Update failed");
            return Err(BridgeError::Persistence(format!(
                "update of {} {} failed: {} ({})",
                table, id, status, body_summary
            )));
        }

        let mut rows: Vec<T> = response.json().await?;
        rows.pop()
            .ok_or_else(|| BridgeError::NotFound(format!("{} {}", table, id)))
    }
}

#[async_trait]
impl UserRepository for PostgrestUserRepository {
    async fn find_by_external_id(
        &self,
        external_user_id: &str,
    ) -> BridgeResult<Option<InternalUser>> {
        let url = format!(
            "{}?external_user_id=eq.{}&limit=1",
            self.rest_url("users"),
            external_user_id
        );
        let rows: Vec<InternalUser> = self.fetch_rows(&url).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_by_id(&self, id: i64) -> BridgeResult<Option<InternalUser>> {
        let url = format!("{}?id=eq.{}&limit=1", self.rest_url("users"), id);
        let rows: Vec<InternalUser> = self.fetch_rows(&url).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_user(&self, fields: NewUser) -> BridgeResult<InternalUser> {
        self.insert_row("users", &fields).await
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> BridgeResult<InternalUser> {
        self.patch_row("users", id, &patch).await
    }

    async fn set_user_organization(
        &self,
        user_id: i64,
        organization_id: i64,
    ) -> BridgeResult<InternalUser> {
        self.patch_row(
            "users",
            user_id,
            &serde_json::json!({ "organization_id": organization_id }),
        )
        .await
    }

    async fn find_org_by_external_id(
        &self,
        external_org_id: &str,
    ) -> BridgeResult<Option<InternalOrganization>> {
        let url = format!(
            "{}?external_org_id=eq.{}&limit=1",
            self.rest_url("organizations"),
            external_org_id
        );
        let rows: Vec<InternalOrganization> = self.fetch_rows(&url).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_org(&self, fields: NewOrganization) -> BridgeResult<InternalOrganization> {
        self.insert_row("organizations", &fields).await
    }

    async fn update_org(
        &self,
        id: i64,
        patch: OrganizationPatch,
    ) -> BridgeResult<InternalOrganization> {
        self.patch_row("organizations", id, &patch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let repo = PostgrestUserRepository::new("https://test.example.co", "test-key").unwrap();
        assert_eq!(repo.api_url, "https://test.example.co");
        assert_eq!(repo.service_key, "test-key");
    }

    #[test]
    fn test_rest_url() {
        let repo = PostgrestUserRepository::new("https://test.example.co", "test-key").unwrap();
        assert_eq!(
            repo.rest_url("users"),
            "https://test.example.co/rest/v1/users"
        );
    }

    #[test]
    fn test_client_rejects_invalid_url() {
        assert!(PostgrestUserRepository::new("/rest/v1", "key").is_err());
    }

    #[test]
    fn test_summarize_response_body() {
        let summary = summarize_response_body("duplicate key value");
        assert!(summary.starts_with("len=19,digest="));
        assert!(!summary.contains("duplicate"));
    }
}
