//! Length-prefixed stream framing.
//!
//! Each frame is a 4-byte big-endian length followed by that many bytes of
//! CBOR-encoded [`Payload`]. Used by byte-stream transports; message-oriented
//! transports can exchange [`Payload::encode`] output directly.

use bytes::{Buf, BufMut, BytesMut};

use crate::{Payload, ProtocolError};

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest payload body accepted by [`FrameDecoder`].
///
/// Payloads are a handful of small integers; anything near this size is a
/// corrupted or hostile stream.
pub const MAX_FRAME_SIZE: usize = 4096;

/// Append one framed payload to `dst`.
pub fn encode_frame(payload: &Payload, dst: &mut BytesMut) -> Result<(), ProtocolError> {
    let body = payload.encode()?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge { size: body.len(), max: MAX_FRAME_SIZE });
    }

    dst.reserve(LENGTH_PREFIX_SIZE + body.len());
    // MAX_FRAME_SIZE fits in u32
    dst.put_u32(body.len() as u32);
    dst.put_slice(&body);
    Ok(())
}

/// Incremental decoder for a stream of framed payloads.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: BytesMut,
}

impl FrameDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes read from the stream.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of buffered bytes not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Pop the next complete payload, if one is buffered.
    ///
    /// A body that fails to decode is consumed before the error is returned,
    /// so the caller may skip it and keep reading.
    pub fn next_payload(&mut self) -> Result<Option<Payload>, ProtocolError> {
        if self.buf.len() < LENGTH_PREFIX_SIZE {
            return Ok(None);
        }

        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        prefix.copy_from_slice(&self.buf[..LENGTH_PREFIX_SIZE]);
        let size = u32::from_be_bytes(prefix) as usize;

        if size > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge { size, max: MAX_FRAME_SIZE });
        }

        if self.buf.len() < LENGTH_PREFIX_SIZE + size {
            return Ok(None);
        }

        self.buf.advance(LENGTH_PREFIX_SIZE);
        let body = self.buf.split_to(size);
        Payload::decode(&body).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FlagId, Mutation, PeerId};

    fn framed(payloads: &[Payload]) -> BytesMut {
        let mut buf = BytesMut::new();
        for payload in payloads {
            encode_frame(payload, &mut buf).expect("encode");
        }
        buf
    }

    #[test]
    fn decodes_back_to_back_frames() {
        let payloads = vec![
            Payload::from(Mutation::flag(FlagId::TestFlagB, true)),
            Payload::from(Mutation::ready(PeerId(1), true)),
            Payload::Transition { initiated_by: PeerId(1) },
        ];
        let bytes = framed(&payloads);

        let mut decoder = FrameDecoder::new();
        decoder.extend(&bytes);

        let mut decoded = Vec::new();
        while let Some(payload) = decoder.next_payload().expect("decode") {
            decoded.push(payload);
        }

        assert_eq!(decoded, payloads);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn waits_for_partial_frame() {
        let bytes = framed(&[Payload::from(Mutation::flag(FlagId::TestFlagA, false))]);
        let (head, tail) = bytes.split_at(bytes.len() - 1);

        let mut decoder = FrameDecoder::new();
        decoder.extend(head);
        assert_eq!(decoder.next_payload().expect("partial"), None);

        decoder.extend(tail);
        assert!(decoder.next_payload().expect("complete").is_some());
    }

    #[test]
    fn rejects_oversized_prefix() {
        let mut decoder = FrameDecoder::new();
        decoder.extend(&u32::MAX.to_be_bytes());

        let err = decoder.next_payload().expect_err("oversized");
        assert!(err.is_fatal());
    }

    #[test]
    fn skips_corrupt_body() {
        let mut buf = BytesMut::new();
        buf.put_u32(2);
        buf.put_slice(&[0xff, 0xff]);
        let good = framed(&[Payload::Transition { initiated_by: PeerId(9) }]);
        buf.extend_from_slice(&good);

        let mut decoder = FrameDecoder::new();
        decoder.extend(&buf);

        assert!(matches!(decoder.next_payload(), Err(ProtocolError::Decode(_))));
        assert_eq!(
            decoder.next_payload().expect("next frame"),
            Some(Payload::Transition { initiated_by: PeerId(9) })
        );
    }
}
