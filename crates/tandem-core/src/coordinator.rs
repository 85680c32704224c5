//! Session coordinator.
//!
//! Decides when both peers are ready. The decision is derived, never stored:
//! it is recomputed from the roster and the ready namespace after every
//! relevant event.
//!
//! ```text
//!            predicate true                 authority commits
//!  Waiting ─────────────────▶ AllReady ─────────────────────▶ Transitioned
//!     ▲                           │          (or remote Transition)
//!     └───────────────────────────┘
//!      predicate false / peer left
//! ```
//!
//! `Transitioned` is terminal: every later evaluation is suppressed, which is
//! what makes the transition fire at most once even when readiness messages
//! keep arriving after the decision.

use crate::{ready::ReadyNamespace, roster::SessionRoster};

/// Coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinatorState {
    /// Not every peer is ready, or a peer is missing.
    Waiting,
    /// Every peer in a full roster is ready; the transition is pending.
    AllReady,
    /// The session transition has been executed. Terminal.
    Transitioned,
}

/// Outcome of one evaluation of the transition predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    /// State did not change.
    Unchanged,
    /// `Waiting → AllReady`.
    Entered,
    /// `AllReady → Waiting`.
    Regressed,
    /// Already `Transitioned`; the evaluation was ignored.
    Suppressed,
}

/// Transition predicate: the roster is full and every member is ready.
///
/// A roster below capacity always evaluates false, regardless of readiness.
pub fn transition_predicate(roster: &SessionRoster, ready: &ReadyNamespace) -> bool {
    roster.is_full() && roster.peers().iter().all(|&peer| ready.readiness(peer))
}

/// One-shot transition state machine.
#[derive(Debug, Clone)]
pub struct SessionCoordinator {
    state: CoordinatorState,
}

impl SessionCoordinator {
    /// Coordinator in `Waiting`.
    pub fn new() -> Self {
        Self { state: CoordinatorState::Waiting }
    }

    /// Current state.
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Whether the transition has been executed.
    pub fn is_transitioned(&self) -> bool {
        self.state == CoordinatorState::Transitioned
    }

    /// Re-evaluate the predicate against current membership and readiness.
    pub fn evaluate(&mut self, roster: &SessionRoster, ready: &ReadyNamespace) -> Evaluation {
        if self.is_transitioned() {
            return Evaluation::Suppressed;
        }

        match (self.state, transition_predicate(roster, ready)) {
            (CoordinatorState::Waiting, true) => {
                self.state = CoordinatorState::AllReady;
                Evaluation::Entered
            },
            (CoordinatorState::AllReady, false) => {
                self.state = CoordinatorState::Waiting;
                Evaluation::Regressed
            },
            _ => Evaluation::Unchanged,
        }
    }

    /// Execute the pending transition: `AllReady → Transitioned`.
    ///
    /// Returns false, leaving the state untouched, from any other state.
    pub fn commit(&mut self) -> bool {
        if self.state != CoordinatorState::AllReady {
            return false;
        }
        self.state = CoordinatorState::Transitioned;
        true
    }

    /// Abandon a pending transition: `AllReady → Waiting`.
    pub fn abort(&mut self) -> bool {
        if self.state != CoordinatorState::AllReady {
            return false;
        }
        self.state = CoordinatorState::Waiting;
        true
    }

    /// Adopt a transition executed by the authority peer.
    ///
    /// The authority's decision is final, so this is accepted from `Waiting`
    /// as well as `AllReady`. Returns false if already transitioned.
    pub fn adopt_remote(&mut self) -> bool {
        if self.is_transitioned() {
            return false;
        }
        self.state = CoordinatorState::Transitioned;
        true
    }
}

impl Default for SessionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use tandem_proto::{Mutation, PeerId};

    use super::*;

    const LOCAL: PeerId = PeerId(1);
    const REMOTE: PeerId = PeerId(2);

    fn full_roster() -> SessionRoster {
        let mut roster = SessionRoster::new(LOCAL);
        roster.join(REMOTE).expect("join");
        roster
    }

    fn both_ready() -> ReadyNamespace {
        let mut ready = ReadyNamespace::new(LOCAL);
        ready.toggle_local_ready();
        ready.apply_remote(REMOTE, &Mutation::ready(REMOTE, true)).expect("owner");
        ready
    }

    #[test]
    fn single_peer_never_satisfies_predicate() {
        let roster = SessionRoster::new(LOCAL);
        let mut ready = ReadyNamespace::new(LOCAL);
        ready.toggle_local_ready();

        assert!(!transition_predicate(&roster, &ready));
    }

    #[test]
    fn predicate_requires_every_member() {
        let roster = full_roster();
        let mut ready = both_ready();
        assert!(transition_predicate(&roster, &ready));

        ready.toggle_local_ready();
        assert!(!transition_predicate(&roster, &ready));

        ready.toggle_local_ready();
        ready.apply_remote(REMOTE, &Mutation::ready(REMOTE, false)).expect("owner");
        assert!(!transition_predicate(&roster, &ready));
    }

    #[test]
    fn enters_and_regresses() {
        let roster = full_roster();
        let mut ready = both_ready();
        let mut coordinator = SessionCoordinator::new();

        assert_eq!(coordinator.evaluate(&roster, &ready), Evaluation::Entered);
        assert_eq!(coordinator.evaluate(&roster, &ready), Evaluation::Unchanged);

        ready.toggle_local_ready();
        assert_eq!(coordinator.evaluate(&roster, &ready), Evaluation::Regressed);
        assert_eq!(coordinator.state(), CoordinatorState::Waiting);
    }

    #[test]
    fn transitioned_suppresses_reevaluation() {
        let roster = full_roster();
        let mut ready = both_ready();
        let mut coordinator = SessionCoordinator::new();

        coordinator.evaluate(&roster, &ready);
        assert!(coordinator.commit());
        assert!(!coordinator.commit());

        ready.toggle_local_ready();
        assert_eq!(coordinator.evaluate(&roster, &ready), Evaluation::Suppressed);
        assert_eq!(coordinator.state(), CoordinatorState::Transitioned);
    }

    #[test]
    fn commit_requires_all_ready() {
        let mut coordinator = SessionCoordinator::new();
        assert!(!coordinator.commit());
        assert_eq!(coordinator.state(), CoordinatorState::Waiting);
    }

    #[test]
    fn abort_returns_to_waiting() {
        let mut coordinator = SessionCoordinator::new();
        coordinator.evaluate(&full_roster(), &both_ready());

        assert!(coordinator.abort());
        assert_eq!(coordinator.state(), CoordinatorState::Waiting);
        assert!(!coordinator.abort());
    }

    #[test]
    fn remote_transition_adopted_once() {
        let mut coordinator = SessionCoordinator::new();
        assert!(coordinator.adopt_remote());
        assert!(!coordinator.adopt_remote());
        assert!(coordinator.is_transitioned());
    }
}
