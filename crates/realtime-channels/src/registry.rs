//! Channel registry: subscription deduplication and event dispatch.

use crate::error::{CallbackError, ChannelError, ChannelResult};
use crate::key::SubscriptionKey;
use crate::transport::{ChangeEvent, ChangeFeedTransport, ChangeKind, EventSink, FeedHandle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Callback invoked with the changed row. Returning an error routes it to
/// this subscriber's `on_error` without affecting co-subscribers.
pub type EventCallback = Box<dyn Fn(&serde_json::Value) -> Result<(), CallbackError> + Send + Sync>;

/// Callback invoked with errors scoped to this subscriber.
pub type ErrorCallback = Box<dyn Fn(&ChannelError) + Send + Sync>;

/// One subscriber's callback set.
#[derive(Default)]
pub struct ChannelCallbacks {
    on_insert: Option<EventCallback>,
    on_update: Option<EventCallback>,
    on_delete: Option<EventCallback>,
    on_error: Option<ErrorCallback>,
}

impl ChannelCallbacks {
    /// Empty callback set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the insert callback.
    pub fn on_insert(
        mut self,
        f: impl Fn(&serde_json::Value) -> Result<(), CallbackError> + Send + Sync + 'static,
    ) -> Self {
        self.on_insert = Some(Box::new(f));
        self
    }

    /// Set the update callback.
    pub fn on_update(
        mut self,
        f: impl Fn(&serde_json::Value) -> Result<(), CallbackError> + Send + Sync + 'static,
    ) -> Self {
        self.on_update = Some(Box::new(f));
        self
    }

    /// Set the delete callback.
    pub fn on_delete(
        mut self,
        f: impl Fn(&serde_json::Value) -> Result<(), CallbackError> + Send + Sync + 'static,
    ) -> Self {
        self.on_delete = Some(Box::new(f));
        self
    }

    /// Set the error callback.
    pub fn on_error(mut self, f: impl Fn(&ChannelError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    fn callback_for(&self, kind: ChangeKind) -> Option<&EventCallback> {
        match kind {
            ChangeKind::Insert => self.on_insert.as_ref(),
            ChangeKind::Update => self.on_update.as_ref(),
            ChangeKind::Delete => self.on_delete.as_ref(),
        }
    }

    fn notify_error(&self, error: &ChannelError) {
        if let Some(on_error) = self.on_error.as_ref() {
            on_error(error);
        }
    }
}

/// Identifies one subscriber's registration on a channel.
///
/// Unsubscribing through a handle removes only that subscriber's callback
/// set; co-subscribers sharing the upstream feed are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelHandle {
    id: Uuid,
    channel: String,
}

impl ChannelHandle {
    /// Canonical name of the channel this handle subscribes to.
    pub fn channel_name(&self) -> &str {
        &self.channel
    }
}

struct Subscriber {
    id: Uuid,
    callbacks: ChannelCallbacks,
}

/// Subscriber list for one channel, shared with its dispatch sink.
#[derive(Default)]
struct SubscriberSet {
    inner: Mutex<Vec<Subscriber>>,
}

impl SubscriberSet {
    fn push(&self, id: Uuid, callbacks: ChannelCallbacks) {
        self.inner
            .lock()
            .expect("lock poisoned")
            .push(Subscriber { id, callbacks });
    }

    fn remove(&self, id: Uuid) -> bool {
        let mut subscribers = self.inner.lock().expect("lock poisoned");
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() < before
    }

    fn is_empty(&self) -> bool {
        self.inner.lock().expect("lock poisoned").is_empty()
    }

    fn notify_error(&self, error: &ChannelError) {
        let subscribers = self.inner.lock().expect("lock poisoned");
        for subscriber in subscribers.iter() {
            subscriber.callbacks.notify_error(error);
        }
    }

    /// Dispatch one event to every subscriber in registration order.
    ///
    /// Each invocation is isolated: a failing callback reports to its own
    /// `on_error` and the loop continues.
    fn dispatch(&self, channel: &str, event: &ChangeEvent) {
        let subscribers = self.inner.lock().expect("lock poisoned");
        for subscriber in subscribers.iter() {
            let Some(callback) = subscriber.callbacks.callback_for(event.kind) else {
                continue;
            };
            if let Err(err) = callback(&event.record) {
                warn!(
                    channel,
                    subscriber_id = %subscriber.id,
                    error = %err,
                    "Subscriber callback failed"
                );
                subscriber.callbacks.notify_error(&ChannelError::Callback(err));
            }
        }
    }
}

/// Event sink registered with the transport for one channel.
struct DispatchSink {
    channel: String,
    subscribers: Arc<SubscriberSet>,
}

impl EventSink for DispatchSink {
    fn deliver(&self, event: &ChangeEvent) {
        self.subscribers.dispatch(&self.channel, event);
    }
}

struct ChannelState {
    feed: FeedHandle,
    subscribers: Arc<SubscriberSet>,
}

/// Multiplexes many subscribers onto one upstream feed per subscription key.
///
/// One registry instance per running application context. The channel map
/// lives behind a single async mutex held across transport open/close, so a
/// subscribe and an unsubscribe racing on the same key can never observe a
/// stale subscriber count: exactly one open per key transition to OPEN,
/// exactly one close per transition back to CLOSED.
pub struct ChannelRegistry {
    transport: Arc<dyn ChangeFeedTransport>,
    channels: AsyncMutex<HashMap<String, ChannelState>>,
}

impl ChannelRegistry {
    /// Create a registry over the given transport.
    pub fn new(transport: Arc<dyn ChangeFeedTransport>) -> Self {
        Self {
            transport,
            channels: AsyncMutex::new(HashMap::new()),
        }
    }

    /// Register a callback set for a subscription key.
    ///
    /// The first subscriber for a key opens the upstream feed and suspends
    /// until the transport acknowledges it; later subscribers attach to the
    /// existing feed without any new upstream subscription. If the open
    /// fails, the error is reported to the registered callback set's
    /// `on_error`, the key stays closed, and the caller gets the error back
    /// (re-subscribing retries the open).
    pub async fn subscribe(
        &self,
        key: &SubscriptionKey,
        callbacks: ChannelCallbacks,
    ) -> ChannelResult<ChannelHandle> {
        let channel = key.channel_name();
        let subscriber_id = Uuid::new_v4();
        let mut channels = self.channels.lock().await;

        if let Some(state) = channels.get(&channel) {
            state.subscribers.push(subscriber_id, callbacks);
            debug!(channel = %channel, "Attached subscriber to existing feed");
            return Ok(ChannelHandle {
                id: subscriber_id,
                channel,
            });
        }

        let subscribers = Arc::new(SubscriberSet::default());
        subscribers.push(subscriber_id, callbacks);
        let sink = Arc::new(DispatchSink {
            channel: channel.clone(),
            subscribers: subscribers.clone(),
        });

        match self.transport.open(key, sink).await {
            Ok(feed) => {
                channels.insert(
                    channel.clone(),
                    ChannelState {
                        feed,
                        subscribers,
                    },
                );
                info!(channel = %channel, "Opened upstream feed");
                Ok(ChannelHandle {
                    id: subscriber_id,
                    channel,
                })
            }
            Err(err) => {
                warn!(channel = %channel, error = %err, "Upstream feed open failed");
                let error = ChannelError::Transport(err);
                subscribers.notify_error(&error);
                Err(error)
            }
        }
    }

    /// Remove one subscriber's callback set.
    ///
    /// Closes the upstream feed when the last subscriber leaves. Safe to
    /// call repeatedly with the same handle; later calls are no-ops.
    pub async fn unsubscribe(&self, handle: &ChannelHandle) {
        let mut channels = self.channels.lock().await;
        let Some(state) = channels.get(&handle.channel) else {
            return;
        };
        if !state.subscribers.remove(handle.id) {
            return;
        }
        debug!(channel = %handle.channel, "Removed subscriber");

        if state.subscribers.is_empty() {
            let state = channels
                .remove(&handle.channel)
                .expect("channel present above");
            self.transport.close(state.feed).await;
            info!(channel = %handle.channel, "Closed upstream feed (last subscriber left)");
        }
    }

    /// Close every upstream feed and clear all bookkeeping.
    pub async fn unsubscribe_all(&self) {
        let mut channels = self.channels.lock().await;
        for (channel, state) in channels.drain() {
            self.transport.close(state.feed).await;
            info!(channel = %channel, "Closed upstream feed (teardown)");
        }
    }

    /// Canonical names of every key with an open feed.
    pub async fn active_keys(&self) -> Vec<String> {
        let channels = self.channels.lock().await;
        channels.keys().cloned().collect()
    }
}
