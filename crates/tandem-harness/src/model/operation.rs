//! Operations for model-based testing.
//!
//! Operations represent everything a player or the network can do to a
//! session. They are generated randomly by proptest (or the fuzzer) and
//! applied to both the model and the real implementation.

use arbitrary::Arbitrary;
use tandem_core::ROSTER_CAPACITY;
use tandem_proto::FlagId;

/// Seat in the two-player room (0-indexed).
///
/// A seat outlives the peers that occupy it: leaving and rejoining puts a new
/// peer, with a new id, in the same seat.
pub type Slot = u8;

/// Number of seats.
pub const SLOTS: usize = ROSTER_CAPACITY;

/// Operations that can be applied to the system.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Peer in `slot` writes a flag.
    SetFlag {
        /// Seat performing the operation.
        slot: Slot,
        /// Flag selector, see [`flag_for_seed`].
        flag: u8,
        /// New value.
        value: bool,
    },

    /// Peer in `slot` flips its readiness.
    ToggleReady {
        /// Seat performing the operation.
        slot: Slot,
    },

    /// Peer in `slot` sets its readiness.
    SetReady {
        /// Seat performing the operation.
        slot: Slot,
        /// New readiness.
        ready: bool,
    },

    /// Peer in `slot` leaves the room.
    Leave {
        /// Seat being vacated.
        slot: Slot,
    },

    /// A new peer takes the empty `slot`.
    Rejoin {
        /// Seat being filled.
        slot: Slot,
    },

    /// Deliver pending messages.
    ///
    /// In the real system, this drains the relay queues.
    /// In the model, this is a no-op (instant delivery).
    DeliverPending,
}

impl Operation {
    /// Seat targeted by this operation, if any.
    pub fn slot(&self) -> Option<Slot> {
        match *self {
            Self::SetFlag { slot, .. }
            | Self::ToggleReady { slot }
            | Self::SetReady { slot, .. }
            | Self::Leave { slot }
            | Self::Rejoin { slot } => Some(slot),
            Self::DeliverPending => None,
        }
    }
}

/// Map a selector byte onto the flag domain, sentinel included.
pub fn flag_for_seed(seed: u8) -> FlagId {
    match seed % 5 {
        0 => FlagId::None,
        n => FlagId::ALL[usize::from(n - 1)],
    }
}

/// Result of applying an operation.
///
/// Used to compare model and real system behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation succeeded.
    Ok,

    /// Operation failed with expected error.
    Error(OperationError),
}

/// Expected errors that can occur during operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// Seat index out of range.
    InvalidSlot,

    /// No peer in the seat.
    NotConnected,

    /// The seat is already occupied.
    AlreadyConnected,

    /// The room no longer accepts peers.
    RoomClosed,
}

impl OperationResult {
    /// Check if operation succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Check if operation failed.
    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_flag_is_reachable() {
        let reached: Vec<FlagId> = (0..5).map(flag_for_seed).collect();

        assert_eq!(reached[0], FlagId::None);
        assert_eq!(&reached[1..], &FlagId::ALL);
    }
}
