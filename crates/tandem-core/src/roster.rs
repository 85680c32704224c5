//! Session roster.
//!
//! Current room membership as last reported by the transport. The local peer
//! is a member from construction until the session is torn down; only the
//! remote slot changes.

use tandem_proto::PeerId;

use crate::error::RosterError;

/// Number of participants in a live session.
pub const ROSTER_CAPACITY: usize = 2;

/// Ordered membership of the session, capacity [`ROSTER_CAPACITY`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRoster {
    local: PeerId,
    peers: Vec<PeerId>,
}

impl SessionRoster {
    /// Roster containing only the local peer.
    pub fn new(local: PeerId) -> Self {
        let mut peers = Vec::with_capacity(ROSTER_CAPACITY);
        peers.push(local);
        Self { local, peers }
    }

    /// The local peer.
    pub fn local(&self) -> PeerId {
        self.local
    }

    /// The remote peer, if one is present.
    pub fn remote(&self) -> Option<PeerId> {
        self.peers.iter().copied().find(|&peer| peer != self.local)
    }

    /// Members in join order.
    pub fn peers(&self) -> &[PeerId] {
        &self.peers
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Never true: the local peer is always present.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Whether the roster holds [`ROSTER_CAPACITY`] members.
    pub fn is_full(&self) -> bool {
        self.peers.len() >= ROSTER_CAPACITY
    }

    /// Whether `peer` is a member.
    pub fn contains(&self, peer: PeerId) -> bool {
        self.peers.contains(&peer)
    }

    /// Add a remote peer.
    pub fn join(&mut self, peer: PeerId) -> Result<(), RosterError> {
        if self.contains(peer) {
            return Err(RosterError::AlreadyPresent(peer));
        }
        if self.is_full() {
            return Err(RosterError::Full { capacity: ROSTER_CAPACITY });
        }

        self.peers.push(peer);
        Ok(())
    }

    /// Remove a remote peer. Returns whether it was a member.
    ///
    /// The local peer cannot be removed; leaving is session teardown.
    pub fn leave(&mut self, peer: PeerId) -> bool {
        if peer == self.local {
            return false;
        }

        let before = self.peers.len();
        self.peers.retain(|&member| member != peer);
        self.peers.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: PeerId = PeerId(1);
    const REMOTE: PeerId = PeerId(2);

    #[test]
    fn starts_with_local_peer_only() {
        let roster = SessionRoster::new(LOCAL);
        assert_eq!(roster.peers(), &[LOCAL]);
        assert_eq!(roster.remote(), None);
        assert!(!roster.is_full());
    }

    #[test]
    fn join_fills_remote_slot() {
        let mut roster = SessionRoster::new(LOCAL);
        roster.join(REMOTE).expect("room for one more");

        assert!(roster.is_full());
        assert_eq!(roster.remote(), Some(REMOTE));
    }

    #[test]
    fn third_peer_is_rejected() {
        let mut roster = SessionRoster::new(LOCAL);
        roster.join(REMOTE).expect("room for one more");

        assert_eq!(roster.join(PeerId(3)), Err(RosterError::Full { capacity: 2 }));
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn duplicate_join_is_rejected() {
        let mut roster = SessionRoster::new(LOCAL);
        assert_eq!(roster.join(LOCAL), Err(RosterError::AlreadyPresent(LOCAL)));
    }

    #[test]
    fn leave_frees_slot_for_rejoin() {
        let mut roster = SessionRoster::new(LOCAL);
        roster.join(REMOTE).expect("join");

        assert!(roster.leave(REMOTE));
        assert!(!roster.leave(REMOTE));
        assert_eq!(roster.len(), 1);

        roster.join(PeerId(3)).expect("slot is free again");
        assert_eq!(roster.remote(), Some(PeerId(3)));
    }

    #[test]
    fn local_peer_cannot_leave() {
        let mut roster = SessionRoster::new(LOCAL);
        assert!(!roster.leave(LOCAL));
        assert!(roster.contains(LOCAL));
    }
}
