//! Two real session contexts wired through a [`SimRelay`].
//!
//! `SimWorld` mirrors [`ModelWorld`](crate::ModelWorld)'s interface so the
//! same [`Operation`]s drive both. Each seat holds at most one
//! `SessionContext`; leaving tears the context down, rejoining builds a new
//! one with a fresh peer id.

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use tandem_client::{ClientError, SessionContext, Teardown, Transport, TransportError};
use tandem_core::{CoordinatorState, SessionConfig};
use tandem_proto::{FlagId, PeerId};

use crate::{
    model::{
        ObservableState, Operation, OperationError, OperationResult, PeerView, SLOTS, Slot,
        flag_for_seed,
    },
    sim_env::SimEnv,
    sim_relay::{SimRelay, SimTransport},
};

/// Context type used by the simulation.
pub type SimContext = SessionContext<SimEnv, SimTransport>;

struct Seat {
    ctx: SimContext,
    transitions: Arc<AtomicUsize>,
}

/// Real two-peer system with controllable delivery.
pub struct SimWorld {
    env: SimEnv,
    relay: SimRelay,
    config: SessionConfig,
    seats: [Option<Seat>; SLOTS],
}

impl SimWorld {
    /// Both seats connected and settled, exact-once delivery.
    pub fn new(seed: u64) -> Self {
        Self::with_duplicate_rate(seed, 0.0)
    }

    /// Both seats connected and settled, with duplicate injection.
    pub fn with_duplicate_rate(seed: u64, rate: f64) -> Self {
        Self::with_config(seed, rate, SessionConfig::default())
    }

    /// Both seats connected and settled, with a custom session config.
    pub fn with_config(seed: u64, rate: f64, config: SessionConfig) -> Self {
        let mut world = Self {
            env: SimEnv::new(),
            relay: SimRelay::with_duplicate_rate(seed, rate),
            config,
            seats: [None, None],
        };
        for slot in 0..SLOTS {
            if let Err(e) = world.connect(slot) {
                tracing::warn!(slot, "seat left empty: {e}");
            }
        }
        world.settle();
        world
    }

    /// Shared virtual clock.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Underlying relay.
    pub fn relay(&self) -> &SimRelay {
        &self.relay
    }

    /// Context in `slot`, if occupied.
    pub fn peer(&self, slot: usize) -> Option<&SimContext> {
        self.seats.get(slot)?.as_ref().map(|seat| &seat.ctx)
    }

    /// Context in `slot`, mutably.
    pub fn peer_mut(&mut self, slot: usize) -> Option<&mut SimContext> {
        self.seats.get_mut(slot)?.as_mut().map(|seat| &mut seat.ctx)
    }

    /// Peer id in `slot`.
    pub fn peer_id(&self, slot: usize) -> Option<PeerId> {
        self.peer(slot).map(|ctx| ctx.local_peer())
    }

    /// Transition notifications observed by the peer in `slot`.
    pub fn transitions(&self, slot: usize) -> usize {
        self.seats
            .get(slot)
            .and_then(Option::as_ref)
            .map_or(0, |seat| seat.transitions.load(Ordering::SeqCst))
    }

    /// Put a new peer in `slot`. Queued notifications are not delivered.
    pub fn connect(&mut self, slot: usize) -> Result<PeerId, TransportError> {
        if slot >= SLOTS {
            return Err(TransportError::Rejected(format!("no seat {slot}")));
        }
        let transport = self.relay.connect()?;
        let peer = transport.local_peer();

        let mut ctx = SessionContext::new(self.env.clone(), transport, self.config);
        self.relay.attach(peer, ctx.inbox());

        let transitions = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&transitions);
        ctx.subscribe_transition(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        self.seats[slot] = Some(Seat { ctx, transitions });
        Ok(peer)
    }

    /// Tear down the peer in `slot`. Returns `None` for an empty seat.
    pub fn leave(&mut self, slot: usize) -> Option<Result<Teardown, ClientError>> {
        let seat = self.seats.get_mut(slot)?.take()?;
        Some(seat.ctx.leave())
    }

    /// Deliver one queued item to `slot` and process it.
    pub fn deliver_one(&mut self, slot: usize) -> bool {
        let Some(seat) = self.seats.get_mut(slot).and_then(Option::as_mut) else {
            return false;
        };
        let delivered = self.relay.deliver_next(seat.ctx.local_peer());
        seat.ctx.pump();
        delivered
    }

    /// Items queued for `slot`.
    pub fn pending(&self, slot: usize) -> usize {
        self.peer_id(slot).map_or(0, |peer| self.relay.pending(peer))
    }

    /// Deliver until every queue is empty. Returns the number of deliveries.
    pub fn settle(&mut self) -> usize {
        let mut total = 0;
        loop {
            let mut progressed = false;
            for slot in 0..SLOTS {
                if self.deliver_one(slot) {
                    progressed = true;
                    total += 1;
                }
            }
            if !progressed {
                return total;
            }
        }
    }

    /// Apply an operation and settle.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        let result = self.apply_unsettled(op);
        self.settle();
        result
    }

    /// Apply an operation, leaving its messages queued.
    pub fn apply_unsettled(&mut self, op: &Operation) -> OperationResult {
        if op.slot().is_some_and(|slot| usize::from(slot) >= SLOTS) {
            return OperationResult::Error(OperationError::InvalidSlot);
        }

        match *op {
            Operation::SetFlag { slot, flag, value } => {
                self.with_peer(slot, |ctx| ctx.set_flag(flag_for_seed(flag), value))
            },
            Operation::ToggleReady { slot } => self.with_peer(slot, |ctx| ctx.toggle_local_ready()),
            Operation::SetReady { slot, ready } => {
                self.with_peer(slot, |ctx| ctx.set_local_ready(ready))
            },
            Operation::Leave { slot } => match self.leave(usize::from(slot)) {
                Some(Ok(_)) => OperationResult::Ok,
                Some(Err(_)) | None => OperationResult::Error(OperationError::NotConnected),
            },
            Operation::Rejoin { slot } => {
                if self.peer(usize::from(slot)).is_some() {
                    return OperationResult::Error(OperationError::AlreadyConnected);
                }
                match self.connect(usize::from(slot)) {
                    Ok(_) => OperationResult::Ok,
                    Err(_) => OperationResult::Error(OperationError::RoomClosed),
                }
            },
            Operation::DeliverPending => {
                self.settle();
                OperationResult::Ok
            },
        }
    }

    /// Extract observable state for comparison with the model.
    pub fn observable_state(&self) -> ObservableState {
        let peers = (0..SLOTS)
            .map(|slot| {
                self.peer(slot).map(|ctx| PeerView {
                    local_flags: FlagId::ALL.into_iter().filter(|&f| ctx.local_flag(f)).collect(),
                    remote_flags: FlagId::ALL.into_iter().filter(|&f| ctx.remote_flag(f)).collect(),
                    local_ready: ctx.local_ready(),
                    remote_ready: ctx
                        .session()
                        .roster()
                        .remote()
                        .is_some_and(|peer| ctx.readiness(peer)),
                    transitioned: ctx.coordinator_state() == CoordinatorState::Transitioned,
                    transitions: self.transitions(slot),
                })
            })
            .collect();

        ObservableState { peers, room_open: self.relay.is_open() }
    }

    fn with_peer(&mut self, slot: Slot, f: impl FnOnce(&mut SimContext)) -> OperationResult {
        match self.peer_mut(usize::from(slot)) {
            Some(ctx) => {
                f(ctx);
                OperationResult::Ok
            },
            None => OperationResult::Error(OperationError::NotConnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_world_is_paired_and_quiet() {
        let world = SimWorld::new(1);

        assert_eq!(world.peer_id(0), Some(PeerId(1)));
        assert_eq!(world.peer_id(1), Some(PeerId(2)));
        assert_eq!(world.pending(0) + world.pending(1), 0);
        assert_eq!(world.peer(0).unwrap().session().roster().remote(), Some(PeerId(2)));
        assert_eq!(world.peer(1).unwrap().session().roster().remote(), Some(PeerId(1)));
    }

    #[test]
    fn rejoin_gets_a_new_id() {
        let mut world = SimWorld::new(1);

        world.apply(&Operation::Leave { slot: 1 });
        world.apply(&Operation::Rejoin { slot: 1 });

        assert_eq!(world.peer_id(1), Some(PeerId(3)));
    }

    #[test]
    fn transition_closes_room() {
        let mut world = SimWorld::new(1);

        world.apply(&Operation::ToggleReady { slot: 1 });
        world.apply(&Operation::ToggleReady { slot: 0 });

        assert!(!world.relay().is_open());
        assert_eq!(world.transitions(0), 1);
        assert_eq!(world.transitions(1), 1);
    }
}
