//! Tandem core.
//!
//! Sans-IO state machines that keep two peers' boolean state converged and
//! decide, exactly once, when both are ready to move on.
//!
//! # Architecture
//!
//! ```text
//! Session
//!   ├─ SessionRoster       (current two-party membership)
//!   ├─ FlagNamespace       (ReplicatedStore<FlagId>)
//!   ├─ ReadyNamespace      (ReplicatedStore<PeerId>)
//!   ├─ SessionCoordinator  (Waiting → AllReady → Transitioned)
//!   └─ churn               (peer-left purge and local reset)
//! ```
//!
//! `Session::handle` consumes one [`SessionEvent`] and returns the
//! [`SessionAction`]s the caller must execute. Nothing here performs I/O.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod churn;
pub mod coordinator;
pub mod env;
mod error;
pub mod flags;
pub mod ready;
pub mod roster;
pub mod session;
pub mod store;

pub use coordinator::{CoordinatorState, Evaluation, SessionCoordinator};
pub use env::Environment;
pub use error::{ReplicationError, RosterError};
pub use flags::FlagNamespace;
pub use ready::ReadyNamespace;
pub use roster::{ROSTER_CAPACITY, SessionRoster};
pub use session::{Membership, Session, SessionAction, SessionConfig, SessionEvent};
pub use store::{Change, Origin, ReplicatedStore, StateEntry};
pub use tandem_proto::{FlagId, Mutation, Namespace, Payload, PeerId};
