//! Identifier domains.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::ProtocolError;

/// Session participant identifier.
///
/// Assigned by the transport when the peer joins and stable for the lifetime
/// of the session. A rejoining participant may or may not get the same id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PeerId(pub u32);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

impl From<u32> for PeerId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Puzzle/story flag identifier.
///
/// Closed domain fixed at compile time. `None` is the sentinel for an
/// uninitialized selector and is never replicated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize_repr, Deserialize_repr,
)]
#[repr(u16)]
pub enum FlagId {
    /// Sentinel: no flag selected.
    None = 0,
    /// Test flag A.
    TestFlagA = 1,
    /// Test flag B.
    TestFlagB = 2,
    /// First room: the door is open.
    Room1DoorOpen = 3,
    /// First room: the switch is on.
    Room1SwitchOn = 4,
}

impl FlagId {
    /// Every replicable flag (excludes the `None` sentinel).
    pub const ALL: [Self; 4] =
        [Self::TestFlagA, Self::TestFlagB, Self::Room1DoorOpen, Self::Room1SwitchOn];

    /// Whether this is the `None` sentinel.
    pub fn is_sentinel(self) -> bool {
        self == Self::None
    }
}

impl TryFrom<u32> for FlagId {
    type Error = ProtocolError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::TestFlagA),
            2 => Ok(Self::TestFlagB),
            3 => Ok(Self::Room1DoorOpen),
            4 => Ok(Self::Room1SwitchOn),
            other => Err(ProtocolError::UnknownFlag(other)),
        }
    }
}

impl From<FlagId> for u32 {
    fn from(flag: FlagId) -> Self {
        Self::from(flag as u16)
    }
}

/// Replicated namespace a mutation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum Namespace {
    /// Puzzle/story flags keyed by [`FlagId`].
    Flags = 0,
    /// Per-participant readiness keyed by [`PeerId`].
    Ready = 1,
}
