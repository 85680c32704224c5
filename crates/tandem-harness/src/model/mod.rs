//! Reference model for model-based testing.
//!
//! The model is a simplified implementation that captures the intended
//! behavior of a two-peer session without messages, queues or elections:
//! every operation takes effect on both peers at once. It serves as the
//! oracle against which [`SimWorld`](crate::SimWorld) is verified after the
//! real system has settled.
//!
//! # Design Principles
//!
//! - Simplicity: The model should be obviously correct
//! - Observable behavior only: Captures WHAT, not HOW
//! - Deterministic: Same inputs produce same outputs

pub mod operation;
mod peer;
mod world;

pub use operation::{
    Operation, OperationError, OperationResult, SLOTS, Slot, flag_for_seed,
};
pub use peer::ModelPeer;
pub use world::{ModelWorld, ObservableState, PeerView};
