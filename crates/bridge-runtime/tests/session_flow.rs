//! End-to-end session flows against in-memory collaborators.

use async_trait::async_trait;
use bridge_runtime::{RuntimeError, SessionRuntime};
use claim_store::{ClaimStore, MemoryClaimStorage, UserRole};
use identity_bridge::{
    BridgeError, BridgeResult, ExternalIdentity, IdentityBridge, IdentityProvider,
    InternalOrganization, InternalUser, NewOrganization, NewUser, OrganizationPatch,
    ProviderSession, RevalidationPolicy, UserPatch, UserRepository,
};
use realtime_channels::{
    ChangeEvent, ChangeFeedTransport, ChangeKind, ChannelCallbacks, ChannelRegistry, EventSink,
    FeedHandle, SubscriptionKey, TransportError,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// =========================================================================
// Fakes
// =========================================================================

#[derive(Default)]
struct FakeRepository {
    users: Mutex<Vec<InternalUser>>,
    next_id: AtomicI64,
}

impl FakeRepository {
    fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    fn remove_user(&self, id: i64) {
        self.users.lock().unwrap().retain(|u| u.id != id);
    }
}

#[async_trait]
impl UserRepository for FakeRepository {
    async fn find_by_external_id(
        &self,
        external_user_id: &str,
    ) -> BridgeResult<Option<InternalUser>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.external_user_id == external_user_id)
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> BridgeResult<Option<InternalUser>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }

    async fn insert_user(&self, fields: NewUser) -> BridgeResult<InternalUser> {
        let mut users = self.users.lock().unwrap();
        if users
            .iter()
            .any(|u| u.external_user_id == fields.external_user_id)
        {
            return Err(BridgeError::Conflict("users".to_string()));
        }
        let user = InternalUser {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            external_user_id: fields.external_user_id,
            email: fields.email,
            name: fields.name,
            organization_id: fields.organization_id,
            role: fields.role,
            metadata: fields.metadata,
            last_login_at: fields.last_login_at,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: i64, patch: UserPatch) -> BridgeResult<InternalUser> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| BridgeError::NotFound(format!("user {}", id)))?;
        user.email = patch.email;
        user.name = patch.name;
        user.metadata = patch.metadata;
        user.last_login_at = patch.last_login_at;
        Ok(user.clone())
    }

    async fn set_user_organization(
        &self,
        user_id: i64,
        organization_id: i64,
    ) -> BridgeResult<InternalUser> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| BridgeError::NotFound(format!("user {}", user_id)))?;
        user.organization_id = Some(organization_id);
        Ok(user.clone())
    }

    async fn find_org_by_external_id(
        &self,
        _external_org_id: &str,
    ) -> BridgeResult<Option<InternalOrganization>> {
        Ok(None)
    }

    async fn insert_org(&self, fields: NewOrganization) -> BridgeResult<InternalOrganization> {
        Ok(InternalOrganization {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            external_org_id: fields.external_org_id,
            name: fields.name,
            slug: fields.slug,
            domain: fields.domain,
            settings: fields.settings,
        })
    }

    async fn update_org(
        &self,
        id: i64,
        _patch: OrganizationPatch,
    ) -> BridgeResult<InternalOrganization> {
        Err(BridgeError::NotFound(format!("organization {}", id)))
    }
}

struct FakeProvider {
    status_code: u16,
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn authenticate(
        &self,
        token: &str,
        _session_duration_minutes: u32,
    ) -> BridgeResult<ProviderSession> {
        Ok(ProviderSession {
            status_code: self.status_code,
            user: ExternalIdentity {
                external_user_id: format!("user-for-{}", token),
                emails: vec![format!("{}@x.com", token)],
                display_name: None,
                raw_metadata: serde_json::Value::Null,
            },
            session_id: format!("session-for-{}", token),
        })
    }
}

#[derive(Default)]
struct FakeTransport {
    sinks: Mutex<HashMap<String, Arc<dyn EventSink>>>,
    open_count: AtomicUsize,
    close_count: AtomicUsize,
}

impl FakeTransport {
    fn emit(&self, key: &SubscriptionKey, event: ChangeEvent) {
        if let Some(sink) = self.sinks.lock().unwrap().get(&key.channel_name()) {
            sink.deliver(&event);
        }
    }
}

#[async_trait]
impl ChangeFeedTransport for FakeTransport {
    async fn open(
        &self,
        key: &SubscriptionKey,
        sink: Arc<dyn EventSink>,
    ) -> Result<FeedHandle, TransportError> {
        self.open_count.fetch_add(1, Ordering::SeqCst);
        self.sinks.lock().unwrap().insert(key.channel_name(), sink);
        Ok(FeedHandle::new())
    }

    async fn close(&self, _handle: FeedHandle) {
        self.close_count.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    runtime: SessionRuntime,
    repo: Arc<FakeRepository>,
    transport: Arc<FakeTransport>,
}

fn harness(status_code: u16, policy: RevalidationPolicy) -> Harness {
    let repo = Arc::new(FakeRepository::new());
    let claims = ClaimStore::new(Arc::new(MemoryClaimStorage::new()));
    let bridge = Arc::new(IdentityBridge::new(repo.clone(), claims));
    let transport = Arc::new(FakeTransport::default());
    let registry = Arc::new(ChannelRegistry::new(transport.clone()));
    let provider = Arc::new(FakeProvider { status_code });
    let runtime =
        SessionRuntime::new(bridge, registry, provider, 480).with_policy(policy);
    Harness {
        runtime,
        repo,
        transport,
    }
}

// =========================================================================
// Flows
// =========================================================================

#[tokio::test]
async fn login_reconciles_and_caches_claims() {
    let h = harness(200, RevalidationPolicy::TrustCache);

    let claims = h.runtime.login("magic-token").await.unwrap();

    assert_eq!(claims.email, "magic-token@x.com");
    assert_eq!(claims.role, UserRole::User);
    assert_eq!(claims.external_session_id, "session-for-magic-token");
    assert_eq!(h.runtime.current_claims().unwrap(), Some(claims));
}

#[tokio::test]
async fn login_twice_reuses_the_same_user() {
    let h = harness(200, RevalidationPolicy::TrustCache);

    let first = h.runtime.login("tok").await.unwrap();
    let second = h.runtime.login("tok").await.unwrap();

    assert_eq!(first.internal_user_id, second.internal_user_id);
    assert_eq!(h.repo.users.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn rejected_login_grants_no_identity() {
    let h = harness(401, RevalidationPolicy::TrustCache);

    let result = h.runtime.login("bad-token").await;

    assert!(matches!(result, Err(RuntimeError::AuthRejected(401))));
    assert_eq!(h.runtime.current_claims().unwrap(), None);
    assert!(h.repo.users.lock().unwrap().is_empty());
}

#[tokio::test]
async fn verify_session_trusts_fresh_claims() {
    let h = harness(200, RevalidationPolicy::TrustCache);

    let issued = h.runtime.login("tok").await.unwrap();
    let verified = h.runtime.verify_session().await.unwrap().unwrap();

    assert_eq!(verified, issued);
}

#[tokio::test]
async fn verify_session_refreshes_under_always_policy() {
    let h = harness(200, RevalidationPolicy::AlwaysRefresh);

    let issued = h.runtime.login("tok").await.unwrap();
    let verified = h.runtime.verify_session().await.unwrap().unwrap();

    // Reissued claims: same identity, newer issuance.
    assert_eq!(verified.internal_user_id, issued.internal_user_id);
    assert_eq!(verified.external_session_id, issued.external_session_id);
    assert!(verified.issued_at >= issued.issued_at);
}

#[tokio::test]
async fn verify_session_forces_sign_out_when_user_deleted() {
    let h = harness(200, RevalidationPolicy::AlwaysRefresh);

    let claims = h.runtime.login("tok").await.unwrap();
    h.repo.remove_user(claims.internal_user_id);

    assert_eq!(h.runtime.verify_session().await.unwrap(), None);
    // Claims were cleared; subsequent reads stay signed out.
    assert_eq!(h.runtime.current_claims().unwrap(), None);
}

#[tokio::test]
async fn verify_session_without_login_is_none() {
    let h = harness(200, RevalidationPolicy::AlwaysRefresh);
    assert_eq!(h.runtime.verify_session().await.unwrap(), None);
}

#[tokio::test]
async fn logout_clears_claims_and_closes_feeds() {
    let h = harness(200, RevalidationPolicy::TrustCache);
    h.runtime.login("tok").await.unwrap();

    let key = SubscriptionKey::filtered("tasks", "project_id", 7);
    let received = Arc::new(AtomicUsize::new(0));
    let received_cb = received.clone();
    h.runtime
        .registry()
        .subscribe(
            &key,
            ChannelCallbacks::new().on_insert(move |_| {
                received_cb.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        )
        .await
        .unwrap();

    h.transport.emit(
        &key,
        ChangeEvent {
            kind: ChangeKind::Insert,
            record: serde_json::json!({"id": 1, "project_id": 7}),
        },
    );
    assert_eq!(received.load(Ordering::SeqCst), 1);

    h.runtime.logout().await.unwrap();

    assert_eq!(h.runtime.current_claims().unwrap(), None);
    assert_eq!(h.transport.close_count.load(Ordering::SeqCst), 1);
    assert!(h.runtime.registry().active_keys().await.is_empty());
}

#[tokio::test]
async fn logout_is_safe_without_login() {
    let h = harness(200, RevalidationPolicy::TrustCache);
    h.runtime.logout().await.unwrap();
    assert_eq!(h.runtime.current_claims().unwrap(), None);
}
