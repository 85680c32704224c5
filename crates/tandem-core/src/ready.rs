//! Ready-status namespace.
//!
//! Readiness keyed by [`PeerId`]. The local peer writes only its own key;
//! the mirror holds the remote peer's key. The key domain follows the roster:
//! entries of departed peers are purged, not set to false, so a peer that
//! rejoins starts from "unknown".

use tandem_proto::{Mutation, Namespace, PeerId};

use crate::{
    error::ReplicationError,
    store::{Change, Origin, ReplicatedStore},
};

/// Replicated readiness state for one session.
#[derive(Debug, Clone)]
pub struct ReadyNamespace {
    store: ReplicatedStore<PeerId>,
}

impl ReadyNamespace {
    /// Create an empty namespace owned by `local_peer`.
    pub fn new(local_peer: PeerId) -> Self {
        Self { store: ReplicatedStore::new(local_peer) }
    }

    /// The peer whose readiness this namespace writes.
    pub fn local_peer(&self) -> PeerId {
        self.store.local_peer()
    }

    /// Flip local readiness. Always produces a change.
    pub fn toggle_local_ready(&mut self) -> Change<PeerId> {
        let local = self.local_peer();
        let value = !self.store.get_local(local);
        // a flipped value always differs, so set_local always reports
        self.store
            .set_local(local, value)
            .unwrap_or(Change { key: local, value, origin: Origin::Local })
    }

    /// Set local readiness. `None` if unchanged.
    pub fn set_local_ready(&mut self, ready: bool) -> Option<Change<PeerId>> {
        let local = self.local_peer();
        self.store.set_local(local, ready)
    }

    /// Local readiness.
    pub fn local_ready(&self) -> bool {
        self.store.get_local(self.local_peer())
    }

    /// Readiness of `peer`, `false` if it has no recorded entry.
    pub fn readiness(&self, peer: PeerId) -> bool {
        if peer == self.local_peer() {
            self.store.get_local(peer)
        } else {
            self.store.get_remote(peer)
        }
    }

    /// Whether any entry (true or false) is recorded for `peer`.
    pub fn has_entry(&self, peer: PeerId) -> bool {
        self.store.contains(peer)
    }

    /// Apply a readiness mutation received from `from`.
    ///
    /// A peer may only write its own key, and never the local peer's.
    pub fn apply_remote(
        &mut self,
        from: PeerId,
        mutation: &Mutation,
    ) -> Result<Option<Change<PeerId>>, ReplicationError> {
        debug_assert_eq!(mutation.namespace, Namespace::Ready);

        let key = mutation.peer_key();
        if key != from || key == self.local_peer() {
            return Err(ReplicationError::NotOwner { from, key });
        }
        Ok(self.store.apply_remote(from, key, mutation.value))
    }

    /// Remove every entry for `peer`. Returns whether anything was removed.
    pub fn purge(&mut self, peer: PeerId) -> bool {
        let local = self.store.remove_local(peer).is_some();
        let remote = self.store.remove_remote(peer).is_some();
        local || remote
    }

    /// Mutation re-announcing local readiness if it is set.
    pub fn replay(&self) -> Option<Mutation> {
        self.local_ready().then(|| Mutation::ready(self.local_peer(), true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: PeerId = PeerId(1);
    const REMOTE: PeerId = PeerId(2);

    #[test]
    fn toggle_flips_and_reports() {
        let mut ready = ReadyNamespace::new(LOCAL);

        let first = ready.toggle_local_ready();
        assert_eq!(first, Change { key: LOCAL, value: true, origin: Origin::Local });
        assert!(ready.local_ready());

        let second = ready.toggle_local_ready();
        assert!(!second.value);
        assert!(!ready.readiness(LOCAL));
    }

    #[test]
    fn unknown_peer_reads_not_ready() {
        let ready = ReadyNamespace::new(LOCAL);
        assert!(!ready.readiness(PeerId(99)));
        assert!(!ready.has_entry(PeerId(99)));
    }

    #[test]
    fn remote_peer_writes_own_key() {
        let mut ready = ReadyNamespace::new(LOCAL);
        let change = ready.apply_remote(REMOTE, &Mutation::ready(REMOTE, true)).expect("owner");

        assert_eq!(change.map(|c| c.origin), Some(Origin::Remote));
        assert!(ready.readiness(REMOTE));
        assert!(!ready.local_ready());
    }

    #[test]
    fn remote_cannot_write_foreign_keys() {
        let mut ready = ReadyNamespace::new(LOCAL);

        let forged_local = ready.apply_remote(REMOTE, &Mutation::ready(LOCAL, true));
        assert!(matches!(forged_local, Err(ReplicationError::NotOwner { .. })));

        let forged_third = ready.apply_remote(REMOTE, &Mutation::ready(PeerId(3), true));
        assert!(matches!(forged_third, Err(ReplicationError::NotOwner { .. })));

        assert!(!ready.readiness(LOCAL));
        assert!(!ready.readiness(PeerId(3)));
    }

    #[test]
    fn purge_removes_entry_entirely() {
        let mut ready = ReadyNamespace::new(LOCAL);
        ready.apply_remote(REMOTE, &Mutation::ready(REMOTE, true)).expect("owner");
        ready.apply_remote(REMOTE, &Mutation::ready(REMOTE, false)).expect("owner");
        assert!(ready.has_entry(REMOTE));

        assert!(ready.purge(REMOTE));
        assert!(!ready.has_entry(REMOTE));
        assert!(!ready.purge(REMOTE));
    }

    #[test]
    fn replay_only_when_ready() {
        let mut ready = ReadyNamespace::new(LOCAL);
        assert_eq!(ready.replay(), None);

        ready.toggle_local_ready();
        assert_eq!(ready.replay(), Some(Mutation::ready(LOCAL, true)));
    }
}
