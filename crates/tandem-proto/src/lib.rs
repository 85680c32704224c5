//! Tandem protocol vocabulary.
//!
//! Identifiers and payloads exchanged between the two peers of a session.
//! The only thing that crosses the wire is the abstract
//! `{namespace, key, value}` triple ([`Mutation`]) plus the one-shot
//! [`Payload::Transition`] announcement.
//!
//! # Encoding
//!
//! Payloads are CBOR-encoded. For byte streams a 4-byte big-endian length
//! prefix delimits each payload (see [`frame`]).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
pub mod frame;
mod ids;
mod payload;

pub use error::ProtocolError;
pub use frame::{FrameDecoder, MAX_FRAME_SIZE, encode_frame};
pub use ids::{FlagId, Namespace, PeerId};
pub use payload::{Mutation, Payload};
