//! Core error types.
//!
//! None of these escape `Session::handle`. They describe why an event was
//! absorbed without effect, and end up in the log.

use tandem_proto::{PeerId, ProtocolError};
use thiserror::Error;

/// Errors from roster membership changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    /// The roster already holds its maximum number of peers.
    #[error("roster full (capacity {capacity})")]
    Full {
        /// Roster capacity.
        capacity: usize,
    },

    /// The peer is already a member.
    #[error("{0} already in roster")]
    AlreadyPresent(PeerId),
}

/// Errors from applying a remote write.
#[derive(Debug, Error)]
pub enum ReplicationError {
    /// A peer tried to write a key owned by someone else.
    #[error("{from} does not own ready key {key}")]
    NotOwner {
        /// Sender of the write.
        from: PeerId,
        /// Key the sender tried to write.
        key: PeerId,
    },

    /// The `None` flag sentinel is never replicated.
    #[error("sentinel flag is not replicable")]
    SentinelFlag,

    /// The sender is not a member of the current roster.
    #[error("{0} is not a roster member")]
    NotMember(PeerId),

    /// The write could not be interpreted.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ReplicationError::NotOwner { from: PeerId(2), key: PeerId(1) };
        assert_eq!(err.to_string(), "peer#2 does not own ready key peer#1");

        let err = RosterError::Full { capacity: 2 };
        assert_eq!(err.to_string(), "roster full (capacity 2)");
    }

    #[test]
    fn protocol_errors_convert() {
        let err: ReplicationError = ProtocolError::UnknownFlag(77).into();
        assert!(matches!(err, ReplicationError::Protocol(ProtocolError::UnknownFlag(77))));
    }
}
