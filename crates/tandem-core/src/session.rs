//! Session state machine.
//!
//! Ties the namespaces, roster and coordinator together behind a single
//! event-in, actions-out entry point.
//!
//! ## Responsibilities
//!
//! - Replication: local writes become `Send` actions, inbound mutations land
//!   in the mirror maps
//! - Churn: peer-left purges readiness and resets local readiness
//! - Coordination: the predicate is re-evaluated after every readiness change
//!   and every roster change; only the authority executes the transition
//!
//! ## Design
//!
//! - Action-based: `handle` returns actions, the caller performs the I/O
//! - Infallible: anomalies (duplicates, forged writes, roster overflow,
//!   stale transitions) are logged and absorbed, never surfaced
//! - Single-threaded: one event at a time, so "check predicate, then act" is
//!   atomic with respect to every other mutation

use tandem_proto::{FlagId, Mutation, Namespace, Payload, PeerId};

use crate::{
    churn::{self, ChurnOutcome},
    coordinator::{CoordinatorState, Evaluation, SessionCoordinator},
    env::Environment,
    error::ReplicationError,
    flags::FlagNamespace,
    ready::ReadyNamespace,
    roster::{ROSTER_CAPACITY, SessionRoster},
    store::Change,
};

/// Read side of the transport adapter.
///
/// Queried at decision time. The transport's roster count may run ahead of
/// the membership events the session has processed so far.
pub trait Membership {
    /// Whether this peer is the session's elected coordinator.
    fn is_authority(&self) -> bool;

    /// Number of participants currently in the room.
    fn current_roster_size(&self) -> usize;
}

/// Session behavior switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Re-send every local `true` when a peer joins.
    pub replay_on_join: bool,
    /// Close the room to new joiners as part of the transition.
    pub close_room_on_transition: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { replay_on_join: true, close_room_on_transition: true }
    }
}

/// Inputs to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Set a local flag.
    SetFlag {
        /// Flag to set.
        flag: FlagId,
        /// New value.
        value: bool,
    },

    /// Flip local readiness.
    ToggleReady,

    /// Set local readiness.
    SetReady {
        /// New readiness.
        ready: bool,
    },

    /// The transport delivered a payload.
    MessageReceived {
        /// Sender.
        from: PeerId,
        /// Delivered payload.
        payload: Payload,
    },

    /// A peer entered the room.
    PeerJoined {
        /// The new peer.
        peer: PeerId,
    },

    /// A peer left the room.
    PeerLeft {
        /// The departed peer.
        peer: PeerId,
    },
}

/// Outputs of the session, for the caller to execute in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction<I> {
    /// Hand this payload to the transport for the other peer.
    Send(Payload),

    /// A flag changed.
    FlagChanged(Change<FlagId>),

    /// A peer's readiness changed.
    ReadinessChanged(Change<PeerId>),

    /// The coordinator changed state.
    CoordinatorChanged {
        /// Previous state.
        from: CoordinatorState,
        /// New state.
        to: CoordinatorState,
        /// When the change happened.
        at: I,
    },

    /// Close the room to new joiners.
    CloseRoom,

    /// The session-wide transition has started.
    TransitionStarted {
        /// Authority peer that executed it.
        initiated_by: PeerId,
        /// When this peer learned of it.
        at: I,
    },
}

/// Two-party replicated session.
///
/// # Type Parameters
///
/// - `E`: Environment implementation for timestamps
#[derive(Debug)]
pub struct Session<E: Environment> {
    env: E,
    config: SessionConfig,
    roster: SessionRoster,
    flags: FlagNamespace,
    ready: ReadyNamespace,
    coordinator: SessionCoordinator,
}

impl<E: Environment> Session<E> {
    /// Start a session in which only `local_peer` is present.
    pub fn new(env: E, local_peer: PeerId, config: SessionConfig) -> Self {
        Self {
            env,
            config,
            roster: SessionRoster::new(local_peer),
            flags: FlagNamespace::new(local_peer),
            ready: ReadyNamespace::new(local_peer),
            coordinator: SessionCoordinator::new(),
        }
    }

    /// This peer.
    pub fn local_peer(&self) -> PeerId {
        self.roster.local()
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current membership.
    pub fn roster(&self) -> &SessionRoster {
        &self.roster
    }

    /// Flag namespace.
    pub fn flags(&self) -> &FlagNamespace {
        &self.flags
    }

    /// Ready-status namespace.
    pub fn ready(&self) -> &ReadyNamespace {
        &self.ready
    }

    /// Coordinator state.
    pub fn coordinator_state(&self) -> CoordinatorState {
        self.coordinator.state()
    }

    /// Process one event and return the actions to execute.
    pub fn handle(
        &mut self,
        event: SessionEvent,
        membership: &impl Membership,
    ) -> Vec<SessionAction<E::Instant>> {
        let mut actions = Vec::new();

        match event {
            SessionEvent::SetFlag { flag, value } => {
                self.handle_set_flag(flag, value, &mut actions);
            },
            SessionEvent::ToggleReady => {
                let change = self.ready.toggle_local_ready();
                self.push_local_ready(change, &mut actions);
                self.reevaluate(membership, &mut actions);
            },
            SessionEvent::SetReady { ready } => {
                if let Some(change) = self.ready.set_local_ready(ready) {
                    self.push_local_ready(change, &mut actions);
                    self.reevaluate(membership, &mut actions);
                }
            },
            SessionEvent::MessageReceived { from, payload } => {
                self.handle_message(from, payload, membership, &mut actions);
            },
            SessionEvent::PeerJoined { peer } => {
                self.handle_peer_joined(peer, membership, &mut actions);
            },
            SessionEvent::PeerLeft { peer } => {
                self.handle_peer_left(peer, membership, &mut actions);
            },
        }

        actions
    }

    fn handle_set_flag(
        &mut self,
        flag: FlagId,
        value: bool,
        actions: &mut Vec<SessionAction<E::Instant>>,
    ) {
        match self.flags.set_flag(flag, value) {
            Some(change) => {
                tracing::debug!(?flag, value, "local flag changed");
                actions.push(SessionAction::FlagChanged(change));
                actions.push(SessionAction::Send(Mutation::flag(flag, value).into()));
            },
            None if flag.is_sentinel() => tracing::debug!("ignoring write to sentinel flag"),
            None => {},
        }
    }

    fn push_local_ready(
        &self,
        change: Change<PeerId>,
        actions: &mut Vec<SessionAction<E::Instant>>,
    ) {
        tracing::debug!(peer = %change.key, ready = change.value, "local readiness changed");
        actions.push(SessionAction::ReadinessChanged(change));
        actions.push(SessionAction::Send(Mutation::ready(change.key, change.value).into()));
    }

    fn handle_message(
        &mut self,
        from: PeerId,
        payload: Payload,
        membership: &impl Membership,
        actions: &mut Vec<SessionAction<E::Instant>>,
    ) {
        match payload {
            Payload::Replicate(mutation) => {
                if let Err(e) = self.apply_remote(from, &mutation, membership, actions) {
                    tracing::warn!(%from, ?mutation, "dropping remote write: {e}");
                }
            },
            Payload::Transition { initiated_by } => {
                self.handle_remote_transition(from, initiated_by, membership, actions);
            },
        }
    }

    fn apply_remote(
        &mut self,
        from: PeerId,
        mutation: &Mutation,
        membership: &impl Membership,
        actions: &mut Vec<SessionAction<E::Instant>>,
    ) -> Result<(), ReplicationError> {
        if from == self.local_peer() || !self.roster.contains(from) {
            return Err(ReplicationError::NotMember(from));
        }

        match mutation.namespace {
            Namespace::Flags => {
                if let Some(change) = self.flags.apply_remote(from, mutation)? {
                    tracing::debug!(flag = ?change.key, value = change.value, "remote flag");
                    actions.push(SessionAction::FlagChanged(change));
                }
            },
            Namespace::Ready => {
                if let Some(change) = self.ready.apply_remote(from, mutation)? {
                    tracing::debug!(peer = %from, ready = change.value, "remote readiness changed");
                    actions.push(SessionAction::ReadinessChanged(change));
                    self.reevaluate(membership, actions);
                }
            },
        }

        Ok(())
    }

    fn handle_peer_joined(
        &mut self,
        peer: PeerId,
        membership: &impl Membership,
        actions: &mut Vec<SessionAction<E::Instant>>,
    ) {
        if let Err(e) = self.roster.join(peer) {
            tracing::warn!(%peer, "ignoring join: {e}");
            return;
        }
        tracing::info!(%peer, roster = self.roster.len(), "peer joined");

        for change in self.flags.retain_remote_from(peer) {
            tracing::debug!(flag = ?change.key, "stale remote flag cleared");
            actions.push(SessionAction::FlagChanged(change));
        }

        if self.config.replay_on_join {
            let replay = self.flags.replay().into_iter().chain(self.ready.replay());
            for mutation in replay {
                actions.push(SessionAction::Send(mutation.into()));
            }
        }

        self.reevaluate(membership, actions);
    }

    fn handle_peer_left(
        &mut self,
        peer: PeerId,
        membership: &impl Membership,
        actions: &mut Vec<SessionAction<E::Instant>>,
    ) {
        if !self.roster.leave(peer) {
            tracing::warn!(%peer, "ignoring departure of non-member");
            return;
        }
        tracing::info!(%peer, roster = self.roster.len(), "peer left");

        let outcome = if self.coordinator.is_transitioned() {
            churn::handle_peer_left_after_transition(&mut self.ready, peer)
        } else {
            churn::handle_peer_left(&mut self.ready, peer)
        };

        let ChurnOutcome { purged, local_reset } = outcome;
        if purged {
            tracing::debug!(%peer, "purged readiness of departed peer");
        }
        if let Some(change) = local_reset {
            self.push_local_ready(change, actions);
        }

        self.reevaluate(membership, actions);
    }

    fn handle_remote_transition(
        &mut self,
        from: PeerId,
        initiated_by: PeerId,
        membership: &impl Membership,
        actions: &mut Vec<SessionAction<E::Instant>>,
    ) {
        if membership.is_authority() {
            tracing::warn!(%from, "authority ignoring transition announced by another peer");
            return;
        }
        if from != initiated_by || !self.roster.contains(from) {
            tracing::warn!(%from, %initiated_by, "ignoring transition from non-member");
            return;
        }

        let before = self.coordinator.state();
        if !self.coordinator.adopt_remote() {
            tracing::debug!(%from, "duplicate transition announcement ignored");
            return;
        }

        tracing::info!(%initiated_by, "session transition adopted");
        let at = self.env.now();
        actions.push(SessionAction::CoordinatorChanged {
            from: before,
            to: CoordinatorState::Transitioned,
            at,
        });
        actions.push(SessionAction::TransitionStarted { initiated_by, at });
    }

    /// Re-run the predicate; the authority executes a pending transition.
    fn reevaluate(
        &mut self,
        membership: &impl Membership,
        actions: &mut Vec<SessionAction<E::Instant>>,
    ) {
        let before = self.coordinator.state();

        match self.coordinator.evaluate(&self.roster, &self.ready) {
            Evaluation::Suppressed => {
                tracing::debug!("already transitioned, re-evaluation is a no-op");
                return;
            },
            Evaluation::Entered | Evaluation::Regressed => {
                let to = self.coordinator.state();
                tracing::debug!(?before, ?to, "coordinator state changed");
                let at = self.env.now();
                actions.push(SessionAction::CoordinatorChanged { from: before, to, at });
            },
            Evaluation::Unchanged => {},
        }

        if self.coordinator.state() == CoordinatorState::AllReady && membership.is_authority() {
            self.execute_transition(membership, actions);
        }
    }

    fn execute_transition(
        &mut self,
        membership: &impl Membership,
        actions: &mut Vec<SessionAction<E::Instant>>,
    ) {
        let room_size = membership.current_roster_size();
        if room_size < ROSTER_CAPACITY {
            tracing::warn!(room_size, "peer departed before transition, aborting");
            if self.coordinator.abort() {
                actions.push(SessionAction::CoordinatorChanged {
                    from: CoordinatorState::AllReady,
                    to: CoordinatorState::Waiting,
                    at: self.env.now(),
                });
            }
            return;
        }

        if !self.coordinator.commit() {
            return;
        }

        let local = self.local_peer();
        let at = self.env.now();
        tracing::info!(initiated_by = %local, "all peers ready, starting session transition");

        if self.config.close_room_on_transition {
            actions.push(SessionAction::CloseRoom);
        }
        actions.push(SessionAction::Send(Payload::Transition { initiated_by: local }));
        actions.push(SessionAction::CoordinatorChanged {
            from: CoordinatorState::AllReady,
            to: CoordinatorState::Transitioned,
            at,
        });
        actions.push(SessionAction::TransitionStarted { initiated_by: local, at });
    }
}
