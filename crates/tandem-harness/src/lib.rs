//! Deterministic simulation harness for Tandem session testing.
//!
//! In-memory and turmoil-based implementations of the Environment and
//! Transport seams, for deterministic, reproducible testing of two-peer
//! sessions under duplicate delivery, churn and network faults.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and a [`SimWorld`], and
//! their observable states are compared.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod model;
pub mod sim_env;
pub mod sim_relay;
pub mod sim_transport;
pub mod sim_world;

pub use model::{
    ModelPeer, ModelWorld, ObservableState, Operation, OperationError, OperationResult, PeerView,
    SLOTS, Slot, flag_for_seed,
};
pub use sim_env::{SimEnv, SimInstant};
pub use sim_relay::{SimRelay, SimTransport};
pub use sim_transport::{StreamPeer, StreamTransport};
pub use sim_world::{SimContext, SimWorld};
