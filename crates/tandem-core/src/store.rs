//! Replicated key-value store.
//!
//! Generic engine behind both namespaces. Each store holds two maps over the
//! same key domain:
//!
//! - authoritative: values written by the local peer
//! - mirror: last-known values written by the remote peer
//!
//! The maps are never merged, so a peer's own writes are never overwritten by
//! remote echoes. Every key has exactly one writer, which makes last write
//! wins per key sufficient without clocks or conflict resolution.
//!
//! # Invariants
//!
//! - Default-false: a key never written reads as `false`
//! - Idempotence: writing the current value is a no-op and produces no
//!   [`Change`]
//! - Separation: `set_local` never touches the mirror, `apply_remote` never
//!   touches the authoritative map
//!
//! Local writes and remote applies to the same store are serialized by
//! `&mut self`; there is no finer-grained locking.

use std::{collections::HashMap, hash::Hash};

use tandem_proto::PeerId;

/// Which side of the session produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Written by this peer.
    Local,
    /// Written by the other peer and applied to the mirror.
    Remote,
}

/// A stored value together with the peer that wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateEntry<K> {
    /// Key within the namespace.
    pub key: K,
    /// Current value.
    pub value: bool,
    /// Peer that wrote the value.
    pub origin: PeerId,
}

/// An actual change of value, raised only when the value differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Change<K> {
    /// Key that changed.
    pub key: K,
    /// New value.
    pub value: bool,
    /// Map that changed.
    pub origin: Origin,
}

impl<K> Change<K> {
    /// Whether the local peer made this change.
    pub fn is_local(&self) -> bool {
        self.origin == Origin::Local
    }
}

/// Two-map replicated store over key type `K`.
#[derive(Debug, Clone)]
pub struct ReplicatedStore<K> {
    local_peer: PeerId,
    authoritative: HashMap<K, StateEntry<K>>,
    mirror: HashMap<K, StateEntry<K>>,
}

impl<K> ReplicatedStore<K>
where
    K: Copy + Eq + Hash,
{
    /// Create an empty store owned by `local_peer`.
    pub fn new(local_peer: PeerId) -> Self {
        Self { local_peer, authoritative: HashMap::new(), mirror: HashMap::new() }
    }

    /// Peer that owns the authoritative map.
    pub fn local_peer(&self) -> PeerId {
        self.local_peer
    }

    /// Local value of `key`, `false` if never written.
    pub fn get_local(&self, key: K) -> bool {
        self.authoritative.get(&key).is_some_and(|entry| entry.value)
    }

    /// Remote value of `key`, `false` if never received.
    pub fn get_remote(&self, key: K) -> bool {
        self.mirror.get(&key).is_some_and(|entry| entry.value)
    }

    /// Mirror entry for `key`, including the peer that wrote it.
    pub fn remote_entry(&self, key: K) -> Option<&StateEntry<K>> {
        self.mirror.get(&key)
    }

    /// Write the local value of `key`.
    ///
    /// Returns the change to notify and replicate, or `None` if the value is
    /// already current.
    pub fn set_local(&mut self, key: K, value: bool) -> Option<Change<K>> {
        if self.get_local(key) == value {
            return None;
        }

        let entry = StateEntry { key, value, origin: self.local_peer };
        self.authoritative.insert(key, entry);
        Some(Change { key, value, origin: Origin::Local })
    }

    /// Apply a value written by `from` to the mirror.
    ///
    /// Duplicate deliveries of the current value return `None`.
    pub fn apply_remote(&mut self, from: PeerId, key: K, value: bool) -> Option<Change<K>> {
        if self.get_remote(key) == value {
            return None;
        }

        self.mirror.insert(key, StateEntry { key, value, origin: from });
        Some(Change { key, value, origin: Origin::Remote })
    }

    /// Remove `key` from the authoritative map, returning its last value.
    pub fn remove_local(&mut self, key: K) -> Option<bool> {
        self.authoritative.remove(&key).map(|entry| entry.value)
    }

    /// Remove `key` from the mirror, returning its last value.
    pub fn remove_remote(&mut self, key: K) -> Option<bool> {
        self.mirror.remove(&key).map(|entry| entry.value)
    }

    /// Drop every mirror entry not written by `peer`.
    ///
    /// Returns a change for each dropped entry that read `true`, since the
    /// key falls back to the default `false`.
    pub fn retain_remote_from(&mut self, peer: PeerId) -> Vec<Change<K>> {
        let mut dropped = Vec::new();
        self.mirror.retain(|_, entry| {
            if entry.origin == peer {
                return true;
            }
            if entry.value {
                dropped.push(Change { key: entry.key, value: false, origin: Origin::Remote });
            }
            false
        });
        dropped
    }

    /// Whether either map holds an entry for `key`.
    pub fn contains(&self, key: K) -> bool {
        self.authoritative.contains_key(&key) || self.mirror.contains_key(&key)
    }

    /// Authoritative entries currently set to `true`.
    pub fn local_truths(&self) -> impl Iterator<Item = K> + '_ {
        self.authoritative.values().filter(|entry| entry.value).map(|entry| entry.key)
    }
}
