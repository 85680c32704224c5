//! Transport adapter seam.
//!
//! A `Transport` connects one peer to a two-party room. Delivery is the
//! adapter's concern: it must deliver payloads to the other peer in order,
//! reliably and at least once while both peers stay connected. Inbound
//! traffic and roster changes are reported by pushing into the session's
//! [`Inbox`](crate::Inbox), never by calling into the session directly.

use tandem_core::Membership;
use tandem_proto::{Payload, PeerId};

use crate::error::TransportError;

/// Outbound half of the transport adapter plus membership queries.
pub trait Transport: Membership {
    /// Identity of this peer in the room.
    fn local_peer(&self) -> PeerId;

    /// Hand `payload` to every other peer in the room.
    ///
    /// Fire-and-forget from the session's perspective: a failure is logged
    /// by the caller and never retried at this layer.
    fn send_to_peers(&mut self, payload: &Payload) -> Result<(), TransportError>;

    /// Stop the room from accepting new peers.
    fn close_room(&mut self) -> Result<(), TransportError>;

    /// Leave the room.
    fn leave_room(&mut self) -> Result<(), TransportError>;
}
