//! Protocol error types.

use thiserror::Error;

/// Errors produced while encoding or decoding protocol data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// CBOR serialization failed.
    #[error("CBOR encode failed: {0}")]
    Encode(String),

    /// CBOR deserialization failed.
    #[error("CBOR decode failed: {0}")]
    Decode(String),

    /// Flag identifier outside the closed flag domain.
    #[error("unknown flag id: {0}")]
    UnknownFlag(u32),

    /// Frame length prefix exceeds [`crate::MAX_FRAME_SIZE`].
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge {
        /// Declared frame size.
        size: usize,
        /// Maximum accepted size.
        max: usize,
    },
}

impl ProtocolError {
    /// Returns true if the stream that produced this error cannot be resumed.
    ///
    /// A malformed payload can be skipped because framing is still intact.
    /// An oversized length prefix means the framing itself is untrustworthy.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FrameTooLarge { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_frame_is_fatal() {
        let err = ProtocolError::FrameTooLarge { size: 1 << 20, max: 4096 };
        assert!(err.is_fatal());
    }

    #[test]
    fn unknown_flag_is_recoverable() {
        assert!(!ProtocolError::UnknownFlag(99).is_fatal());
    }

    #[test]
    fn error_display() {
        let err = ProtocolError::UnknownFlag(7);
        assert_eq!(err.to_string(), "unknown flag id: 7");
    }
}
