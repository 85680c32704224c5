//! Serialized inbound event queue.
//!
//! Transport callbacks may run on any thread. They push into the `Inbox`;
//! the owning thread drains it through `SessionContext::pump`, so the session
//! only ever sees one event at a time.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tandem_core::SessionEvent;
use tandem_proto::{Payload, PeerId};

use crate::ClientError;

/// Cloneable handle to a session's inbound queue.
#[derive(Debug, Clone, Default)]
pub struct Inbox {
    queue: Arc<Mutex<VecDeque<SessionEvent>>>,
}

impl Inbox {
    /// Empty inbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a payload delivered from `from`.
    pub fn push_message(&self, from: PeerId, payload: Payload) {
        self.push(SessionEvent::MessageReceived { from, payload });
    }

    /// Decode one CBOR payload from `from` and queue it.
    ///
    /// Undecodable bytes are rejected here and never reach the session.
    pub fn push_bytes(&self, from: PeerId, bytes: &[u8]) -> Result<(), ClientError> {
        let payload = Payload::decode(bytes)?;
        self.push_message(from, payload);
        Ok(())
    }

    /// Queue a roster join.
    pub fn push_peer_joined(&self, peer: PeerId) {
        self.push(SessionEvent::PeerJoined { peer });
    }

    /// Queue a roster departure.
    pub fn push_peer_left(&self, peer: PeerId) {
        self.push(SessionEvent::PeerLeft { peer });
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Take the oldest queued event.
    pub fn pop(&self) -> Option<SessionEvent> {
        self.lock().pop_front()
    }

    fn push(&self, event: SessionEvent) {
        self.lock().push_back(event);
    }

    // A panic while holding the lock cannot leave the queue half-updated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<SessionEvent>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use tandem_proto::{FlagId, Mutation};

    use super::*;

    const BOB: PeerId = PeerId(2);

    #[test]
    fn events_drain_in_arrival_order() {
        let inbox = Inbox::new();
        inbox.push_peer_joined(BOB);
        inbox.push_message(BOB, Mutation::ready(BOB, true).into());
        inbox.push_peer_left(BOB);

        assert_eq!(inbox.len(), 3);
        assert_eq!(inbox.pop(), Some(SessionEvent::PeerJoined { peer: BOB }));
        assert!(matches!(inbox.pop(), Some(SessionEvent::MessageReceived { from: BOB, .. })));
        assert_eq!(inbox.pop(), Some(SessionEvent::PeerLeft { peer: BOB }));
        assert_eq!(inbox.pop(), None);
    }

    #[test]
    fn clones_share_the_queue() {
        let inbox = Inbox::new();
        let handle = inbox.clone();

        handle.push_peer_joined(BOB);

        assert_eq!(inbox.len(), 1);
    }

    #[test]
    fn push_bytes_decodes() {
        let inbox = Inbox::new();
        let payload = Payload::from(Mutation::flag(FlagId::TestFlagB, true));

        inbox.push_bytes(BOB, &payload.encode().unwrap()).unwrap();

        assert_eq!(inbox.pop(), Some(SessionEvent::MessageReceived { from: BOB, payload }));
    }

    #[test]
    fn push_bytes_rejects_garbage() {
        let inbox = Inbox::new();

        let err = inbox.push_bytes(BOB, &[0xff, 0x00, 0x13]).unwrap_err();

        assert!(matches!(err, ClientError::Protocol(_)));
        assert!(!err.is_fatal(), "one bad message does not poison the stream");
        assert!(inbox.is_empty());
    }

    #[test]
    fn pushes_from_other_threads_are_serialized() {
        let inbox = Inbox::new();
        let workers: Vec<_> = (0..4)
            .map(|i| {
                let inbox = inbox.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        inbox.push_peer_joined(PeerId(i));
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert_eq!(inbox.len(), 100);
    }
}
