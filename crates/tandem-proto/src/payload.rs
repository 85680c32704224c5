//! Replicated payloads.

use serde::{Deserialize, Serialize};

use crate::{FlagId, Namespace, PeerId, ProtocolError};

/// A single replicated write: `{namespace, key, value}`.
///
/// The key is carried as a raw `u32` so both key domains share one shape on
/// the wire. Use [`Mutation::flag_key`] / [`Mutation::peer_key`] to recover
/// the typed key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mutation {
    /// Namespace the key belongs to.
    pub namespace: Namespace,
    /// Raw key within the namespace.
    pub key: u32,
    /// New value.
    pub value: bool,
}

impl Mutation {
    /// Mutation of a flag.
    pub fn flag(flag: FlagId, value: bool) -> Self {
        Self { namespace: Namespace::Flags, key: u32::from(flag), value }
    }

    /// Mutation of a peer's readiness.
    pub fn ready(peer: PeerId, value: bool) -> Self {
        Self { namespace: Namespace::Ready, key: peer.0, value }
    }

    /// Interpret the key as a flag identifier.
    pub fn flag_key(&self) -> Result<FlagId, ProtocolError> {
        FlagId::try_from(self.key)
    }

    /// Interpret the key as a peer identifier.
    pub fn peer_key(&self) -> PeerId {
        PeerId(self.key)
    }
}

/// Everything one peer sends to the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// A write to the sender's authoritative map.
    Replicate(Mutation),

    /// The authority peer has started the session transition.
    Transition {
        /// Peer that executed the transition.
        initiated_by: PeerId,
    },
}

impl Payload {
    /// Serialize to CBOR.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let mut bytes = Vec::new();
        ciborium::ser::into_writer(self, &mut bytes)
            .map_err(|e| ProtocolError::Encode(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize from CBOR.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        ciborium::de::from_reader(bytes).map_err(|e| ProtocolError::Decode(e.to_string()))
    }

    /// Namespace of a replicated write, `None` for control payloads.
    pub fn namespace(&self) -> Option<Namespace> {
        match self {
            Self::Replicate(mutation) => Some(mutation.namespace),
            Self::Transition { .. } => None,
        }
    }
}

impl From<Mutation> for Payload {
    fn from(mutation: Mutation) -> Self {
        Self::Replicate(mutation)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn flag_mutation_wire_shape() {
        let payload = Payload::from(Mutation::flag(FlagId::TestFlagA, true));
        let bytes = payload.encode().expect("encode");

        insta::assert_snapshot!(
            hex::encode(&bytes),
            @"a1695265706c6963617465a3696e616d65737061636500636b6579016576616c7565f5"
        );
    }

    #[test]
    fn transition_wire_shape() {
        let payload = Payload::Transition { initiated_by: PeerId(2) };
        let bytes = payload.encode().expect("encode");

        insta::assert_snapshot!(
            hex::encode(&bytes),
            @"a16a5472616e736974696f6ea16c696e697469617465645f627902"
        );
    }

    #[test]
    fn ready_mutation_keys_by_peer() {
        let mutation = Mutation::ready(PeerId(42), true);
        assert_eq!(mutation.namespace, Namespace::Ready);
        assert_eq!(mutation.peer_key(), PeerId(42));
    }

    #[test]
    fn unknown_flag_key_is_rejected() {
        let mutation = Mutation { namespace: Namespace::Flags, key: 4096, value: true };
        assert!(matches!(mutation.flag_key(), Err(ProtocolError::UnknownFlag(4096))));
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(matches!(Payload::decode(&[0xff, 0x00, 0x13]), Err(ProtocolError::Decode(_))));
    }

    proptest! {
        #[test]
        fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
            let _ = Payload::decode(&bytes);
        }

        #[test]
        fn ready_mutation_survives_encoding(peer in any::<u32>(), value in any::<bool>()) {
            let payload = Payload::from(Mutation::ready(PeerId(peer), value));
            let decoded = Payload::decode(&payload.encode().expect("encode")).expect("decode");
            prop_assert_eq!(decoded, payload);
        }
    }
}
