//! Client error types.

use tandem_proto::ProtocolError;
use thiserror::Error;

/// Failures reported by a [`Transport`](crate::Transport) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection to the room is gone.
    #[error("transport disconnected")]
    Disconnected,

    /// The room refused the operation.
    #[error("rejected by room: {0}")]
    Rejected(String),
}

/// Errors from client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Inbound bytes could not be decoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl ClientError {
    /// Returns true if this error is fatal (unrecoverable).
    ///
    /// Fatal errors mean the byte stream or the connection can no longer be
    /// trusted. A single undecodable message is transient.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Protocol(e) => e.is_fatal(),
            Self::Transport(TransportError::Disconnected) => true,
            Self::Transport(TransportError::Rejected(_)) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnect_is_fatal() {
        let err = ClientError::from(TransportError::Disconnected);
        assert!(err.is_fatal());
    }

    #[test]
    fn rejection_is_transient() {
        let err = ClientError::from(TransportError::Rejected("room closed".to_string()));
        assert!(!err.is_fatal());
    }

    #[test]
    fn unknown_flag_is_transient() {
        let err = ClientError::from(ProtocolError::UnknownFlag(99));
        assert!(!err.is_fatal());
    }

    #[test]
    fn oversized_frame_is_fatal() {
        let err = ClientError::from(ProtocolError::FrameTooLarge { size: 9000, max: 4096 });
        assert!(err.is_fatal());
    }

    #[test]
    fn error_display() {
        let err = ClientError::from(TransportError::Rejected("full".to_string()));
        assert_eq!(err.to_string(), "transport error: rejected by room: full");
    }
}
