//! Tandem session runtime.
//!
//! Wraps the Sans-IO [`Session`](tandem_core::Session) with everything a
//! game layer needs to drive it: a [`Transport`] seam, an [`Inbox`] that
//! serializes transport callbacks onto the owning thread, and observer
//! registries for flag, readiness, coordinator and transition events.
//!
//! ## Architecture
//!
//! ```text
//! tandem-client
//!   ├─ SessionContext   (owns Session + Transport, executes actions)
//!   ├─ Inbox            (queued inbound events, drained by pump())
//!   ├─ Observers        (subscribe / unsubscribe / notify)
//!   ├─ Transport        (send, close room, leave room, membership)
//!   └─ SystemEnv        (production Environment impl)
//! ```
//!
//! Transport callbacks only enqueue. All state changes happen inside
//! [`SessionContext::pump`] and the local API calls, one at a time.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod error;
mod inbox;
mod observer;
mod system_env;
mod transport;

pub use context::{SessionContext, Teardown, TransitionNotice};
pub use error::{ClientError, TransportError};
pub use inbox::Inbox;
pub use observer::{Observers, Subscription};
pub use system_env::SystemEnv;
pub use transport::Transport;
