//! In-memory transport adapter.
//!
//! `SimRelay` plays the role of the room service: it assigns peer ids, elects
//! the coordinator (the longest-standing member), and keeps one FIFO delivery
//! queue per recipient. Nothing is delivered until the test asks for it, so
//! tests control every interleaving.
//!
//! # Delivery guarantees
//!
//! Matches what the session expects from a real adapter: per-sender order is
//! preserved and delivery is at least once. A seeded RNG injects adjacent
//! duplicates at a configurable rate.
//!
//! Membership queries ([`Membership`]) read the relay's live roster, which
//! may run ahead of the join/leave notifications still queued for a peer.

use std::{
    cell::RefCell,
    collections::{HashMap, VecDeque},
    rc::Rc,
};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tandem_client::{Inbox, Transport, TransportError};
use tandem_core::{Membership, ROSTER_CAPACITY};
use tandem_proto::{Payload, PeerId};

/// Item waiting in a recipient's delivery queue.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Delivery {
    Message { from: PeerId, payload: Payload },
    Joined(PeerId),
    Left(PeerId),
}

#[derive(Debug)]
struct RelayState {
    next_peer: u32,
    members: Vec<PeerId>,
    queues: HashMap<PeerId, VecDeque<Delivery>>,
    inboxes: HashMap<PeerId, Inbox>,
    open: bool,
    duplicate_rate: f64,
    rng: ChaCha8Rng,
}

impl RelayState {
    fn enqueue(&mut self, to: PeerId, delivery: Delivery) {
        if let Some(queue) = self.queues.get_mut(&to) {
            queue.push_back(delivery);
        }
    }

    fn broadcast(&mut self, from: PeerId, payload: &Payload) {
        let recipients: Vec<PeerId> =
            self.members.iter().copied().filter(|&peer| peer != from).collect();

        for to in recipients {
            let copies = if self.rng.gen_bool(self.duplicate_rate) { 2 } else { 1 };
            for _ in 0..copies {
                self.enqueue(to, Delivery::Message { from, payload: payload.clone() });
            }
        }
    }

    fn remove(&mut self, peer: PeerId) -> bool {
        let Some(index) = self.members.iter().position(|&p| p == peer) else {
            return false;
        };
        self.members.remove(index);
        self.queues.remove(&peer);
        self.inboxes.remove(&peer);

        let remaining = self.members.clone();
        for other in remaining {
            self.enqueue(other, Delivery::Left(peer));
        }
        true
    }
}

/// Shared handle to the simulated room.
#[derive(Debug, Clone)]
pub struct SimRelay {
    state: Rc<RefCell<RelayState>>,
}

impl SimRelay {
    /// Open room with exact-once delivery.
    pub fn new(seed: u64) -> Self {
        Self::with_duplicate_rate(seed, 0.0)
    }

    /// Open room that duplicates each message with probability `rate`.
    pub fn with_duplicate_rate(seed: u64, rate: f64) -> Self {
        let state = RelayState {
            next_peer: 1,
            members: Vec::new(),
            queues: HashMap::new(),
            inboxes: HashMap::new(),
            open: true,
            duplicate_rate: rate.clamp(0.0, 1.0),
            rng: ChaCha8Rng::seed_from_u64(seed),
        };
        Self { state: Rc::new(RefCell::new(state)) }
    }

    /// Join the room as a new peer.
    ///
    /// Existing members are told about the newcomer and the newcomer about
    /// them, through the delivery queues.
    pub fn connect(&self) -> Result<SimTransport, TransportError> {
        let mut state = self.state.borrow_mut();
        if !state.open {
            return Err(TransportError::Rejected("room closed".to_string()));
        }
        if state.members.len() >= ROSTER_CAPACITY {
            return Err(TransportError::Rejected("room full".to_string()));
        }

        let peer = PeerId(state.next_peer);
        state.next_peer += 1;

        let existing = state.members.clone();
        state.queues.insert(peer, existing.iter().map(|&p| Delivery::Joined(p)).collect());
        for other in existing {
            state.enqueue(other, Delivery::Joined(peer));
        }
        state.members.push(peer);

        Ok(SimTransport { peer, relay: Rc::clone(&self.state) })
    }

    /// Route `peer`'s deliveries into `inbox`.
    pub fn attach(&self, peer: PeerId, inbox: Inbox) {
        self.state.borrow_mut().inboxes.insert(peer, inbox);
    }

    /// Move the next queued item for `peer` into its inbox.
    ///
    /// Returns false if nothing is queued or no inbox is attached.
    pub fn deliver_next(&self, peer: PeerId) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(inbox) = state.inboxes.get(&peer).cloned() else {
            return false;
        };
        let Some(delivery) = state.queues.get_mut(&peer).and_then(VecDeque::pop_front) else {
            return false;
        };
        drop(state);

        match delivery {
            Delivery::Message { from, payload } => inbox.push_message(from, payload),
            Delivery::Joined(other) => inbox.push_peer_joined(other),
            Delivery::Left(other) => inbox.push_peer_left(other),
        }
        true
    }

    /// Number of items queued for `peer`.
    pub fn pending(&self, peer: PeerId) -> usize {
        self.state.borrow().queues.get(&peer).map_or(0, VecDeque::len)
    }

    /// Current members in join order. The first is the authority.
    pub fn members(&self) -> Vec<PeerId> {
        self.state.borrow().members.clone()
    }

    /// Whether the room still accepts new peers.
    pub fn is_open(&self) -> bool {
        self.state.borrow().open
    }
}

/// One peer's connection to a [`SimRelay`].
#[derive(Debug)]
pub struct SimTransport {
    peer: PeerId,
    relay: Rc<RefCell<RelayState>>,
}

impl SimTransport {
    fn is_member(&self) -> bool {
        self.relay.borrow().members.contains(&self.peer)
    }
}

impl Membership for SimTransport {
    fn is_authority(&self) -> bool {
        self.relay.borrow().members.first() == Some(&self.peer)
    }

    fn current_roster_size(&self) -> usize {
        self.relay.borrow().members.len()
    }
}

impl Transport for SimTransport {
    fn local_peer(&self) -> PeerId {
        self.peer
    }

    fn send_to_peers(&mut self, payload: &Payload) -> Result<(), TransportError> {
        if !self.is_member() {
            return Err(TransportError::Disconnected);
        }
        self.relay.borrow_mut().broadcast(self.peer, payload);
        Ok(())
    }

    fn close_room(&mut self) -> Result<(), TransportError> {
        if !self.is_member() {
            return Err(TransportError::Disconnected);
        }
        self.relay.borrow_mut().open = false;
        Ok(())
    }

    fn leave_room(&mut self) -> Result<(), TransportError> {
        if self.relay.borrow_mut().remove(self.peer) {
            Ok(())
        } else {
            Err(TransportError::Disconnected)
        }
    }
}

#[cfg(test)]
mod tests {
    use tandem_core::SessionEvent;
    use tandem_proto::{FlagId, Mutation};

    use super::*;

    fn drain(inbox: &Inbox, relay: &SimRelay, peer: PeerId) -> usize {
        let mut n = 0;
        while relay.deliver_next(peer) {
            n += 1;
        }
        assert_eq!(inbox.len(), n);
        n
    }

    #[test]
    fn first_member_is_authority() {
        let relay = SimRelay::new(0);
        let a = relay.connect().unwrap();
        let b = relay.connect().unwrap();

        assert!(a.is_authority());
        assert!(!b.is_authority());
        assert_eq!(a.current_roster_size(), 2);
    }

    #[test]
    fn authority_passes_on_departure() {
        let relay = SimRelay::new(0);
        let mut a = relay.connect().unwrap();
        let b = relay.connect().unwrap();

        a.leave_room().unwrap();

        assert!(b.is_authority());
        assert_eq!(b.current_roster_size(), 1);
        assert_eq!(
            a.send_to_peers(&Mutation::flag(FlagId::TestFlagA, true).into()),
            Err(TransportError::Disconnected)
        );
    }

    #[test]
    fn third_peer_is_rejected() {
        let relay = SimRelay::new(0);
        let _a = relay.connect().unwrap();
        let _b = relay.connect().unwrap();

        assert!(matches!(relay.connect(), Err(TransportError::Rejected(_))));
    }

    #[test]
    fn closed_room_rejects_joins() {
        let relay = SimRelay::new(0);
        let mut a = relay.connect().unwrap();

        a.close_room().unwrap();

        assert!(!relay.is_open());
        assert!(relay.connect().is_err());
    }

    #[test]
    fn join_notifications_are_queued_both_ways() {
        let relay = SimRelay::new(0);
        let a = relay.connect().unwrap();
        let b = relay.connect().unwrap();
        let (inbox_a, inbox_b) = (Inbox::new(), Inbox::new());
        relay.attach(a.local_peer(), inbox_a.clone());
        relay.attach(b.local_peer(), inbox_b.clone());

        assert_eq!(drain(&inbox_a, &relay, a.local_peer()), 1);
        assert_eq!(drain(&inbox_b, &relay, b.local_peer()), 1);
    }

    #[test]
    fn messages_keep_sender_order() {
        let relay = SimRelay::new(0);
        let mut a = relay.connect().unwrap();
        let b = relay.connect().unwrap();
        let inbox = Inbox::new();
        relay.attach(b.local_peer(), inbox.clone());

        a.send_to_peers(&Mutation::flag(FlagId::TestFlagA, true).into()).unwrap();
        a.send_to_peers(&Mutation::flag(FlagId::TestFlagA, false).into()).unwrap();
        // join notification plus both messages
        assert_eq!(relay.pending(b.local_peer()), 3);
        assert_eq!(relay.pending(a.local_peer()), 1);

        drain(&inbox, &relay, b.local_peer());
        let values: Vec<bool> = std::iter::from_fn(|| inbox.pop())
            .filter_map(|e| match e {
                SessionEvent::MessageReceived { payload: Payload::Replicate(m), .. } => {
                    Some(m.value)
                },
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![true, false]);
    }

    #[test]
    fn duplicates_are_seeded() {
        let run = |seed| {
            let relay = SimRelay::with_duplicate_rate(seed, 0.5);
            let mut a = relay.connect().unwrap();
            let b = relay.connect().unwrap();
            for _ in 0..32 {
                a.send_to_peers(&Mutation::ready(a.local_peer(), true).into()).unwrap();
            }
            relay.pending(b.local_peer())
        };

        assert_eq!(run(7), run(7));
        assert!(run(7) > 33);
    }
}
