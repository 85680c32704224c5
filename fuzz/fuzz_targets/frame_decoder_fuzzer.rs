//! Fuzz target for [`FrameDecoder`] and CBOR payload decoding
//!
//! Prevent crashes and desync on hostile byte streams
//!
//! # Strategy
//!
//! - Raw bytes: Arbitrary input split into arbitrary chunks
//! - Length prefixes: Oversized, zero and truncated frames
//! - CBOR attacks: Malformed maps, unknown variants, wrong types
//!
//! # Invariants
//!
//! - NEVER panic on any input
//! - A fatal error is only reported for an oversized length prefix
//! - Every decoded payload re-encodes and decodes to itself
//! - Chunking does not change the decoded payload sequence

#![no_main]

use arbitrary::Arbitrary;
use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tandem_proto::{encode_frame, FrameDecoder, Payload, ProtocolError};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    bytes: Vec<u8>,
    chunk_sizes: Vec<u8>,
}

/// Decode everything, stopping at the first fatal error.
fn decode_all(chunks: &[&[u8]]) -> (Vec<Payload>, Option<ProtocolError>) {
    let mut decoder = FrameDecoder::new();
    let mut payloads = Vec::new();

    for chunk in chunks {
        decoder.extend(chunk);
        loop {
            match decoder.next_payload() {
                Ok(Some(payload)) => payloads.push(payload),
                Ok(None) => break,
                Err(e) if e.is_fatal() => return (payloads, Some(e)),
                Err(_) => {},
            }
        }
    }
    (payloads, None)
}

fuzz_target!(|input: FuzzInput| {
    // Single-shot CBOR decode must not panic
    if let Ok(payload) = Payload::decode(&input.bytes) {
        let encoded = payload.encode().expect("decoded payload must re-encode");
        assert_eq!(Payload::decode(&encoded).expect("re-encoded payload must decode"), payload);
    }

    let (whole, whole_err) = decode_all(&[&input.bytes]);
    if let Some(e) = &whole_err {
        assert!(matches!(e, ProtocolError::FrameTooLarge { .. }));
    }

    let mut chunks = Vec::new();
    let mut rest = input.bytes.as_slice();
    for size in input.chunk_sizes.iter().map(|s| usize::from(*s).max(1)) {
        if rest.is_empty() {
            break;
        }
        let (head, tail) = rest.split_at(size.min(rest.len()));
        chunks.push(head);
        rest = tail;
    }
    chunks.push(rest);

    let (chunked, chunked_err) = decode_all(&chunks);
    assert_eq!(whole, chunked, "chunking changed the decoded sequence");
    assert_eq!(whole_err.is_some(), chunked_err.is_some());

    for payload in &whole {
        let mut buf = BytesMut::new();
        encode_frame(payload, &mut buf).expect("decoded payload must frame");
        let (again, err) = decode_all(&[&buf]);
        assert!(err.is_none());
        assert_eq!(again.as_slice(), std::slice::from_ref(payload));
    }
});
