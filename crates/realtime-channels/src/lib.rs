//! Realtime change-feed multiplexing.
//!
//! One upstream feed per unique `(table, filter)` key, shared by every
//! subscriber interested in that key:
//!
//! ```text
//! transport feed ──► dispatch sink ──► subscriber callbacks (in order)
//!       ▲                                      │
//!       └── opened once per key ◄── ChannelRegistry::subscribe
//! ```
//!
//! UI components mount and unmount repeatedly; without deduplication every
//! mount would open another upstream subscription. The registry trades a
//! small amount of bookkeeping for a bounded upstream connection count: the
//! feed opens with the first subscriber and closes with the last.

mod error;
mod key;
mod registry;
mod transport;

pub use error::{CallbackError, ChannelError, ChannelResult, TransportError};
pub use key::{ColumnFilter, FilterValue, SubscriptionKey};
pub use registry::{ChannelCallbacks, ChannelHandle, ChannelRegistry};
pub use transport::{ChangeEvent, ChangeFeedTransport, ChangeKind, EventSink, FeedHandle};
