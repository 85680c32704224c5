//! Model peer.

use std::collections::BTreeSet;

use tandem_proto::FlagId;

/// One peer's view of the session, updated instantly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelPeer {
    /// Flags this peer set to true.
    pub local_flags: BTreeSet<FlagId>,
    /// Flags the other peer was last seen setting to true.
    pub remote_flags: BTreeSet<FlagId>,
    /// This peer's readiness.
    pub local_ready: bool,
    /// The current other peer's readiness.
    pub remote_ready: bool,
    /// Whether the session transitioned.
    pub transitioned: bool,
    /// Transition notifications observed.
    pub transitions: usize,
}

impl ModelPeer {
    /// Fresh peer: nothing set, nobody ready.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a local flag. Returns whether the value changed.
    pub fn set_flag(&mut self, flag: FlagId, value: bool) -> bool {
        if flag.is_sentinel() {
            return false;
        }
        if value { self.local_flags.insert(flag) } else { self.local_flags.remove(&flag) }
    }

    /// Record the other peer's flag write.
    pub fn mirror_flag(&mut self, flag: FlagId, value: bool) {
        if value {
            self.remote_flags.insert(flag);
        } else {
            self.remote_flags.remove(&flag);
        }
    }

    /// Enter the transitioned state.
    pub fn transition(&mut self) {
        if !self.transitioned {
            self.transitioned = true;
            self.transitions += 1;
        }
    }

    /// React to a new peer taking the other seat.
    pub fn peer_joined(&mut self) {
        self.remote_flags.clear();
        self.remote_ready = false;
    }

    /// React to the other peer leaving.
    pub fn peer_left(&mut self) {
        self.remote_ready = false;
        if !self.transitioned {
            self.local_ready = false;
        }
    }
}
