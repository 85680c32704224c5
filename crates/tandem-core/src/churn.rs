//! Churn handling.
//!
//! Reaction to roster changes. When the remote peer leaves, its readiness
//! entry is purged and local readiness is reset, so neither a stale `true`
//! from the departed peer nor our own earlier `true` can satisfy the
//! predicate once someone new arrives.
//!
//! A joining peer needs nothing here: its key is absent, which already reads
//! as not ready.

use tandem_proto::PeerId;

use crate::{ready::ReadyNamespace, store::Change};

/// What `handle_peer_left` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChurnOutcome {
    /// Whether the departed peer had an entry to purge.
    pub purged: bool,
    /// Reset of local readiness, to be notified and re-propagated.
    pub local_reset: Option<Change<PeerId>>,
}

/// React to `peer` leaving before the session transitioned.
pub fn handle_peer_left(ready: &mut ReadyNamespace, peer: PeerId) -> ChurnOutcome {
    let purged = ready.purge(peer);
    let local_reset = ready.set_local_ready(false);
    ChurnOutcome { purged, local_reset }
}

/// React to `peer` leaving after the session transitioned.
///
/// Only the departed entry is purged; teardown of a running session belongs
/// to the layer above.
pub fn handle_peer_left_after_transition(ready: &mut ReadyNamespace, peer: PeerId) -> ChurnOutcome {
    ChurnOutcome { purged: ready.purge(peer), local_reset: None }
}
