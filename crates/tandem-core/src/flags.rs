//! Flag namespace.
//!
//! Puzzle/story state keyed by [`FlagId`]. Behaves exactly like the
//! underlying [`ReplicatedStore`] except that the `None` sentinel is inert:
//! writing it is a silent no-op, so an uninitialized selector can never
//! signal the other peer.

use tandem_proto::{FlagId, Mutation, Namespace, PeerId};

use crate::{
    error::ReplicationError,
    store::{Change, ReplicatedStore},
};

/// Replicated flag state for one session.
#[derive(Debug, Clone)]
pub struct FlagNamespace {
    store: ReplicatedStore<FlagId>,
}

impl FlagNamespace {
    /// Create an empty namespace owned by `local_peer`.
    pub fn new(local_peer: PeerId) -> Self {
        Self { store: ReplicatedStore::new(local_peer) }
    }

    /// Set a local flag. `None` for the sentinel or an unchanged value.
    pub fn set_flag(&mut self, flag: FlagId, value: bool) -> Option<Change<FlagId>> {
        if flag.is_sentinel() {
            return None;
        }
        self.store.set_local(flag, value)
    }

    /// Local value of `flag`.
    pub fn local_flag(&self, flag: FlagId) -> bool {
        self.store.get_local(flag)
    }

    /// Remote peer's value of `flag`.
    pub fn remote_flag(&self, flag: FlagId) -> bool {
        self.store.get_remote(flag)
    }

    /// Apply a flag mutation received from `from`.
    pub fn apply_remote(
        &mut self,
        from: PeerId,
        mutation: &Mutation,
    ) -> Result<Option<Change<FlagId>>, ReplicationError> {
        debug_assert_eq!(mutation.namespace, Namespace::Flags);

        let flag = mutation.flag_key()?;
        if flag.is_sentinel() {
            return Err(ReplicationError::SentinelFlag);
        }
        Ok(self.store.apply_remote(from, flag, mutation.value))
    }

    /// Forget mirrored flags written by anyone but `peer`, in flag order.
    pub fn retain_remote_from(&mut self, peer: PeerId) -> Vec<Change<FlagId>> {
        let mut dropped = self.store.retain_remote_from(peer);
        dropped.sort_by_key(|change| change.key);
        dropped
    }

    /// Mutations re-announcing every local flag that is set.
    pub fn replay(&self) -> Vec<Mutation> {
        let mut flags: Vec<FlagId> = self.store.local_truths().collect();
        flags.sort();
        flags.into_iter().map(|flag| Mutation::flag(flag, true)).collect()
    }

    /// Underlying store.
    pub fn store(&self) -> &ReplicatedStore<FlagId> {
        &self.store
    }
}
