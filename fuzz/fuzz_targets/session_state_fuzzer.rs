//! Fuzz target for the [`Session`] state machine
//!
//! Prevent double transitions and forged state via hostile event sequences
//!
//! # Strategy
//!
//! - Event sequences: Arbitrary local writes, inbound mutations, transition
//!   announcements and roster changes
//! - Forged writes: Readiness keys that do not belong to the sender, flag
//!   ids outside the domain, senders outside the roster
//! - Membership probing: Authority and room size flip between events
//!
//! # Invariants
//!
//! - `Transitioned` is terminal
//! - `TransitionStarted` is emitted at most once
//! - Local readiness only changes through local events or churn
//! - The sentinel flag is never set
//! - The roster never exceeds capacity
//! - NEVER panic on any input

#![no_main]

use std::{future::Future, time::Duration};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tandem_core::{
    CoordinatorState, Environment, Membership, Mutation, Namespace, Payload, PeerId, Session,
    SessionAction, SessionConfig, SessionEvent, ROSTER_CAPACITY,
};
use tandem_proto::FlagId;

const LOCAL: PeerId = PeerId(1);

#[derive(Clone)]
struct FuzzEnv;

impl Environment for FuzzEnv {
    type Instant = u64;

    fn now(&self) -> u64 {
        0
    }

    fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
        std::future::ready(())
    }
}

struct FuzzMembership {
    authority: bool,
    size: usize,
}

impl Membership for FuzzMembership {
    fn is_authority(&self) -> bool {
        self.authority
    }

    fn current_roster_size(&self) -> usize {
        self.size
    }
}

#[derive(Debug, Clone, Arbitrary)]
enum FuzzEvent {
    SetFlag { flag: u8, value: bool },
    ToggleReady,
    SetReady { ready: bool },
    Replicate { from: u8, namespace: bool, key: u32, value: bool },
    Transition { from: u8, initiated_by: u8 },
    PeerJoined { peer: u8 },
    PeerLeft { peer: u8 },
}

#[derive(Debug, Clone, Arbitrary)]
struct FuzzInput {
    config_bits: u8,
    steps: Vec<(FuzzEvent, bool, u8)>,
}

fn peer(n: u8) -> PeerId {
    // keep ids small so joins and writes collide
    PeerId(u32::from(n % 4))
}

fn to_event(event: &FuzzEvent) -> SessionEvent {
    match *event {
        FuzzEvent::SetFlag { flag, value } => {
            let flag = FlagId::try_from(u32::from(flag % 6)).unwrap_or(FlagId::None);
            SessionEvent::SetFlag { flag, value }
        },
        FuzzEvent::ToggleReady => SessionEvent::ToggleReady,
        FuzzEvent::SetReady { ready } => SessionEvent::SetReady { ready },
        FuzzEvent::Replicate { from, namespace, key, value } => {
            let namespace = if namespace { Namespace::Ready } else { Namespace::Flags };
            SessionEvent::MessageReceived {
                from: peer(from),
                payload: Payload::Replicate(Mutation { namespace, key: key % 8, value }),
            }
        },
        FuzzEvent::Transition { from, initiated_by } => SessionEvent::MessageReceived {
            from: peer(from),
            payload: Payload::Transition { initiated_by: peer(initiated_by) },
        },
        FuzzEvent::PeerJoined { peer: p } => SessionEvent::PeerJoined { peer: peer(p) },
        FuzzEvent::PeerLeft { peer: p } => SessionEvent::PeerLeft { peer: peer(p) },
    }
}

fuzz_target!(|input: FuzzInput| {
    let config = SessionConfig {
        replay_on_join: input.config_bits & 1 != 0,
        close_room_on_transition: input.config_bits & 2 != 0,
    };
    let mut session = Session::new(FuzzEnv, LOCAL, config);
    let mut transitions = 0;

    for (event, authority, size) in &input.steps {
        let membership = FuzzMembership { authority: *authority, size: usize::from(size % 4) };
        let before = session.coordinator_state();
        let ready_before = session.ready().local_ready();
        let local_event = matches!(
            event,
            FuzzEvent::ToggleReady | FuzzEvent::SetReady { .. } | FuzzEvent::PeerLeft { .. }
        );

        let actions = session.handle(to_event(event), &membership);

        if before == CoordinatorState::Transitioned {
            assert_eq!(session.coordinator_state(), CoordinatorState::Transitioned);
        }
        if !local_event {
            let ready_after = session.ready().local_ready();
            assert_eq!(ready_after, ready_before, "{event:?} changed local readiness");
        }
        assert!(!session.flags().local_flag(FlagId::None));
        assert!(!session.flags().remote_flag(FlagId::None));
        assert!(session.roster().len() <= ROSTER_CAPACITY);
        assert!(session.roster().contains(LOCAL));

        for action in &actions {
            match action {
                SessionAction::TransitionStarted { .. } => transitions += 1,
                SessionAction::CloseRoom => {
                    assert!(*authority && config.close_room_on_transition);
                },
                SessionAction::Send(Payload::Transition { initiated_by }) => {
                    assert_eq!(*initiated_by, LOCAL);
                    assert!(*authority);
                },
                SessionAction::CoordinatorChanged { from, to, .. } => assert_ne!(from, to),
                _ => {},
            }
        }
        assert!(transitions <= 1, "transition fired twice");
    }
});
