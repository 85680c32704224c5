//! Model world - the two seats of a room.
//!
//! The world is the top-level container that manages the model state
//! and applies operations. It's the oracle against which the real
//! implementation is verified.

use tandem_proto::FlagId;

use super::{
    operation::{Operation, OperationError, OperationResult, SLOTS, Slot, flag_for_seed},
    peer::ModelPeer,
};

/// One seat's observable state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerView {
    /// Flags set locally, in flag order.
    pub local_flags: Vec<FlagId>,
    /// Flags mirrored from the other peer, in flag order.
    pub remote_flags: Vec<FlagId>,
    /// This peer's readiness.
    pub local_ready: bool,
    /// The current other peer's readiness, false when alone.
    pub remote_ready: bool,
    /// Whether the session transitioned.
    pub transitioned: bool,
    /// Transition notifications observed by this peer.
    pub transitions: usize,
}

/// Observable state for oracle comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// Per-seat view, `None` for an empty seat.
    pub peers: Vec<Option<PeerView>>,
    /// Whether the room accepts new peers.
    pub room_open: bool,
}

/// Model world - the reference implementation.
#[derive(Debug, Clone)]
pub struct ModelWorld {
    peers: [Option<ModelPeer>; SLOTS],
    room_open: bool,
}

impl ModelWorld {
    /// Both seats occupied by fresh peers.
    pub fn new() -> Self {
        Self { peers: [Some(ModelPeer::new()), Some(ModelPeer::new())], room_open: true }
    }

    /// Peer in `slot`, if any.
    pub fn peer(&self, slot: Slot) -> Option<&ModelPeer> {
        self.peers.get(usize::from(slot)).and_then(Option::as_ref)
    }

    /// Apply an operation and return the result.
    ///
    /// This is the main entry point for model-based testing.
    /// The result should match the real implementation's result.
    pub fn apply(&mut self, op: &Operation) -> OperationResult {
        if op.slot().is_some_and(|slot| usize::from(slot) >= SLOTS) {
            return OperationResult::Error(OperationError::InvalidSlot);
        }

        match *op {
            Operation::SetFlag { slot, flag, value } => {
                self.apply_set_flag(slot, flag_for_seed(flag), value)
            },
            Operation::ToggleReady { slot } => match self.peer(slot) {
                Some(peer) => {
                    let ready = !peer.local_ready;
                    self.apply_set_ready(slot, ready)
                },
                None => OperationResult::Error(OperationError::NotConnected),
            },
            Operation::SetReady { slot, ready } => self.apply_set_ready(slot, ready),
            Operation::Leave { slot } => self.apply_leave(slot),
            Operation::Rejoin { slot } => self.apply_rejoin(slot),
            Operation::DeliverPending => {
                // Model has instant delivery - no-op
                OperationResult::Ok
            },
        }
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        let peers = self
            .peers
            .iter()
            .map(|peer| {
                peer.as_ref().map(|p| PeerView {
                    local_flags: p.local_flags.iter().copied().collect(),
                    remote_flags: p.remote_flags.iter().copied().collect(),
                    local_ready: p.local_ready,
                    remote_ready: p.remote_ready,
                    transitioned: p.transitioned,
                    transitions: p.transitions,
                })
            })
            .collect();

        ObservableState { peers, room_open: self.room_open }
    }

    fn apply_set_flag(&mut self, slot: Slot, flag: FlagId, value: bool) -> OperationResult {
        let Some(peer) = self.slot_mut(slot) else {
            return OperationResult::Error(OperationError::NotConnected);
        };

        if peer.set_flag(flag, value) {
            if let Some(other) = self.other_mut(slot) {
                other.mirror_flag(flag, value);
            }
        }
        OperationResult::Ok
    }

    fn apply_set_ready(&mut self, slot: Slot, ready: bool) -> OperationResult {
        let Some(peer) = self.slot_mut(slot) else {
            return OperationResult::Error(OperationError::NotConnected);
        };
        if peer.local_ready == ready {
            return OperationResult::Ok;
        }
        peer.local_ready = ready;

        if let Some(other) = self.other_mut(slot) {
            other.remote_ready = ready;
        }
        self.check_transition();
        OperationResult::Ok
    }

    fn apply_leave(&mut self, slot: Slot) -> OperationResult {
        if self.slot_mut(slot).take().is_none() {
            return OperationResult::Error(OperationError::NotConnected);
        }
        if let Some(other) = self.other_mut(slot) {
            other.peer_left();
        }
        OperationResult::Ok
    }

    fn apply_rejoin(&mut self, slot: Slot) -> OperationResult {
        if self.peer(slot).is_some() {
            return OperationResult::Error(OperationError::AlreadyConnected);
        }
        if !self.room_open {
            return OperationResult::Error(OperationError::RoomClosed);
        }

        // The newcomer receives the other peer's replayed truths
        let mut newcomer = ModelPeer::new();
        if let Some(other) = self.other_mut(slot) {
            other.peer_joined();
            newcomer.remote_flags = other.local_flags.clone();
            newcomer.remote_ready = other.local_ready;
        }
        self.peers[usize::from(slot)] = Some(newcomer);
        OperationResult::Ok
    }

    /// Both seats occupied and ready: the session transitions and the room
    /// closes.
    fn check_transition(&mut self) {
        let [Some(a), Some(b)] = &mut self.peers else {
            return;
        };
        if a.local_ready && b.local_ready && !a.transitioned {
            a.transition();
            b.transition();
            self.room_open = false;
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<ModelPeer> {
        &mut self.peers[usize::from(slot)]
    }

    fn other_mut(&mut self, slot: Slot) -> Option<&mut ModelPeer> {
        let other = (usize::from(slot) + 1) % SLOTS;
        self.peers[other].as_mut()
    }
}

impl Default for ModelWorld {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(world: &ModelWorld, slot: usize) -> PeerView {
        world.observable_state().peers[slot].clone().unwrap()
    }

    #[test]
    fn flags_mirror_instantly() {
        let mut world = ModelWorld::new();

        world.apply(&Operation::SetFlag { slot: 0, flag: 3, value: true });

        assert_eq!(view(&world, 0).local_flags, vec![FlagId::Room1DoorOpen]);
        assert_eq!(view(&world, 1).remote_flags, vec![FlagId::Room1DoorOpen]);
    }

    #[test]
    fn both_ready_transitions_once() {
        let mut world = ModelWorld::new();

        world.apply(&Operation::ToggleReady { slot: 0 });
        world.apply(&Operation::ToggleReady { slot: 1 });
        world.apply(&Operation::ToggleReady { slot: 1 });
        world.apply(&Operation::ToggleReady { slot: 1 });

        let state = world.observable_state();
        assert!(!state.room_open);
        for peer in state.peers.iter().flatten() {
            assert!(peer.transitioned);
            assert_eq!(peer.transitions, 1);
        }
    }

    #[test]
    fn departure_resets_survivor() {
        let mut world = ModelWorld::new();
        world.apply(&Operation::ToggleReady { slot: 0 });

        world.apply(&Operation::Leave { slot: 1 });

        let survivor = view(&world, 0);
        assert!(!survivor.local_ready);
        assert!(!survivor.remote_ready);
    }

    #[test]
    fn newcomer_receives_replay() {
        let mut world = ModelWorld::new();
        world.apply(&Operation::Leave { slot: 1 });
        world.apply(&Operation::SetFlag { slot: 0, flag: 1, value: true });
        world.apply(&Operation::SetReady { slot: 0, ready: true });

        assert!(world.apply(&Operation::Rejoin { slot: 1 }).is_ok());

        let newcomer = view(&world, 1);
        assert_eq!(newcomer.remote_flags, vec![FlagId::TestFlagA]);
        assert!(newcomer.remote_ready);
        assert!(!newcomer.local_ready);
    }

    #[test]
    fn survivor_forgets_departed_flags_on_rejoin() {
        let mut world = ModelWorld::new();
        world.apply(&Operation::SetFlag { slot: 1, flag: 1, value: true });
        world.apply(&Operation::Leave { slot: 1 });
        assert_eq!(view(&world, 0).remote_flags, vec![FlagId::TestFlagA]);

        world.apply(&Operation::Rejoin { slot: 1 });

        assert!(view(&world, 0).remote_flags.is_empty());
        assert!(view(&world, 1).local_flags.is_empty());
    }

    #[test]
    fn closed_room_rejects_rejoin() {
        let mut world = ModelWorld::new();
        world.apply(&Operation::ToggleReady { slot: 0 });
        world.apply(&Operation::ToggleReady { slot: 1 });
        world.apply(&Operation::Leave { slot: 1 });

        assert_eq!(
            world.apply(&Operation::Rejoin { slot: 1 }),
            OperationResult::Error(OperationError::RoomClosed)
        );
        assert!(view(&world, 0).transitioned);
        assert!(view(&world, 0).local_ready);
    }

    #[test]
    fn invalid_and_empty_slots() {
        let mut world = ModelWorld::new();
        world.apply(&Operation::Leave { slot: 0 });

        assert_eq!(
            world.apply(&Operation::ToggleReady { slot: 0 }),
            OperationResult::Error(OperationError::NotConnected)
        );
        assert_eq!(
            world.apply(&Operation::Rejoin { slot: 1 }),
            OperationResult::Error(OperationError::AlreadyConnected)
        );
        assert_eq!(
            world.apply(&Operation::Leave { slot: 9 }),
            OperationResult::Error(OperationError::InvalidSlot)
        );
    }
}
