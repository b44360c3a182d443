//! Process-wide runtime wiring for the identity bridge and channel registry.
//!
//! One `SessionRuntime` per running application context, constructed at
//! startup and torn down on shutdown or sign-out. Consumers receive it by
//! reference; there is no implicit global.

mod config;
mod error;
mod logging;
mod runtime;

pub use config::{BridgeConfig, DEFAULT_SESSION_DURATION_MINUTES};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::init_logging;
pub use runtime::SessionRuntime;
