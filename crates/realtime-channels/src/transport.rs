//! Change-feed transport port.

use crate::key::SubscriptionKey;
use crate::TransportError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Kind of row change carried by an event.
///
/// Serialized uppercase to match the upstream change-feed payload tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A single row change delivered by the upstream feed.
///
/// For deletes the record holds the old row; for inserts and updates the
/// new one. Filter enforcement happens upstream; the multiplexer never
/// drops or re-filters events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// What happened to the row
    pub kind: ChangeKind,
    /// The affected row as delivered upstream
    pub record: serde_json::Value,
}

/// Opaque handle for one open upstream feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedHandle(Uuid);

impl FeedHandle {
    /// Mint a fresh handle. Called by transport implementations on open.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FeedHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Receives events from an open upstream feed.
///
/// Implementations must not block; delivery happens on the transport's
/// event loop.
pub trait EventSink: Send + Sync {
    /// Deliver one change event.
    fn deliver(&self, event: &ChangeEvent);
}

/// Opens and closes streaming subscriptions against the upstream
/// change-feed service.
///
/// `open` suspends until the upstream acknowledges the subscription; events
/// start flowing into the sink only after it returns. One sink per feed.
#[async_trait]
pub trait ChangeFeedTransport: Send + Sync {
    /// Open a feed for the given key, delivering events to `sink`.
    async fn open(
        &self,
        key: &SubscriptionKey,
        sink: Arc<dyn EventSink>,
    ) -> Result<FeedHandle, TransportError>;

    /// Close a previously opened feed.
    async fn close(&self, handle: FeedHandle);
}
