//! Session runtime context.
//!
//! `SessionContext` owns one [`Session`] and its [`Transport`] for the
//! lifetime of a room membership. Local API calls and queued inbound events
//! both go through `Session::handle`; the resulting actions are executed here
//! in order: payloads go to the transport, changes go to observers.

use tandem_core::{
    Change, CoordinatorState, Environment, Session, SessionAction, SessionConfig, SessionEvent,
};
use tandem_proto::{FlagId, PeerId};

use crate::{
    error::ClientError,
    inbox::Inbox,
    observer::{Channel, Observers, Subscription},
    transport::Transport,
};

/// Delivered to transition observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionNotice<I> {
    /// Authority peer that executed the transition.
    pub initiated_by: PeerId,
    /// When this peer learned of it.
    pub at: I,
}

/// Result of [`SessionContext::leave`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Teardown {
    /// Subscriptions dropped during teardown.
    pub released: usize,
    /// Events still queued in the inbox, discarded unprocessed.
    pub discarded: usize,
}

/// Per-room session runtime.
///
/// # Type Parameters
///
/// - `E`: Environment implementation for timestamps
/// - `T`: Transport adapter for this room
pub struct SessionContext<E: Environment, T: Transport> {
    session: Session<E>,
    transport: T,
    inbox: Inbox,
    flag_observers: Observers<Change<FlagId>>,
    ready_observers: Observers<Change<PeerId>>,
    coordinator_observers: Observers<CoordinatorState>,
    transition_observers: Observers<TransitionNotice<E::Instant>>,
}

impl<E: Environment, T: Transport> SessionContext<E, T> {
    /// Create a context for `transport`'s local peer.
    ///
    /// The transport's inbound side must push into [`Self::inbox`].
    pub fn new(env: E, transport: T, config: SessionConfig) -> Self {
        let local = transport.local_peer();
        tracing::debug!(peer = %local, ?config, "session context created");

        Self {
            session: Session::new(env, local, config),
            transport,
            inbox: Inbox::new(),
            flag_observers: Observers::new(),
            ready_observers: Observers::new(),
            coordinator_observers: Observers::new(),
            transition_observers: Observers::new(),
        }
    }

    /// This peer.
    pub fn local_peer(&self) -> PeerId {
        self.session.local_peer()
    }

    /// Set a local flag and replicate it.
    pub fn set_flag(&mut self, flag: FlagId, value: bool) {
        self.dispatch(SessionEvent::SetFlag { flag, value });
    }

    /// This peer's value of `flag`.
    pub fn local_flag(&self, flag: FlagId) -> bool {
        self.session.flags().local_flag(flag)
    }

    /// The other peer's value of `flag`, as last replicated.
    pub fn remote_flag(&self, flag: FlagId) -> bool {
        self.session.flags().remote_flag(flag)
    }

    /// Flip local readiness and replicate it.
    pub fn toggle_local_ready(&mut self) {
        self.dispatch(SessionEvent::ToggleReady);
    }

    /// Set local readiness and replicate it if it changed.
    pub fn set_local_ready(&mut self, ready: bool) {
        self.dispatch(SessionEvent::SetReady { ready });
    }

    /// Readiness of `peer`. Unknown peers are not ready.
    pub fn readiness(&self, peer: PeerId) -> bool {
        self.session.ready().readiness(peer)
    }

    /// Readiness of this peer.
    pub fn local_ready(&self) -> bool {
        self.session.ready().local_ready()
    }

    /// Current coordinator state.
    pub fn coordinator_state(&self) -> CoordinatorState {
        self.session.coordinator_state()
    }

    /// Observe flag changes, local and remote.
    pub fn subscribe_flags(
        &mut self,
        callback: impl FnMut(&Change<FlagId>) + Send + 'static,
    ) -> Subscription {
        Subscription { channel: Channel::Flags, id: self.flag_observers.subscribe(callback) }
    }

    /// Observe readiness changes of any peer.
    pub fn subscribe_readiness(
        &mut self,
        callback: impl FnMut(&Change<PeerId>) + Send + 'static,
    ) -> Subscription {
        Subscription { channel: Channel::Readiness, id: self.ready_observers.subscribe(callback) }
    }

    /// Observe coordinator state changes.
    pub fn subscribe_coordinator(
        &mut self,
        callback: impl FnMut(&CoordinatorState) + Send + 'static,
    ) -> Subscription {
        Subscription {
            channel: Channel::Coordinator,
            id: self.coordinator_observers.subscribe(callback),
        }
    }

    /// Observe the session transition. Fires at most once per session.
    pub fn subscribe_transition(
        &mut self,
        callback: impl FnMut(&TransitionNotice<E::Instant>) + Send + 'static,
    ) -> Subscription {
        Subscription {
            channel: Channel::Transition,
            id: self.transition_observers.subscribe(callback),
        }
    }

    /// Remove a subscription. Returns whether it was still registered.
    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let Subscription { channel, id } = subscription;
        match channel {
            Channel::Flags => self.flag_observers.unsubscribe(id),
            Channel::Readiness => self.ready_observers.unsubscribe(id),
            Channel::Coordinator => self.coordinator_observers.unsubscribe(id),
            Channel::Transition => self.transition_observers.unsubscribe(id),
        }
    }

    /// Handle to the inbound queue, for the transport's callbacks.
    pub fn inbox(&self) -> Inbox {
        self.inbox.clone()
    }

    /// Process every queued inbound event. Returns how many were processed.
    pub fn pump(&mut self) -> usize {
        let mut processed = 0;
        while let Some(event) = self.inbox.pop() {
            self.dispatch(event);
            processed += 1;
        }
        processed
    }

    /// Underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Underlying session state machine.
    pub fn session(&self) -> &Session<E> {
        &self.session
    }

    /// Leave the room and release every subscription.
    ///
    /// Observers are dropped before the transport is asked to leave, so no
    /// callback can fire after this call regardless of the outcome.
    pub fn leave(mut self) -> Result<Teardown, ClientError> {
        let released = self.flag_observers.clear()
            + self.ready_observers.clear()
            + self.coordinator_observers.clear()
            + self.transition_observers.clear();
        let discarded = self.inbox.len();

        self.transport.leave_room()?;
        tracing::info!(peer = %self.local_peer(), released, discarded, "left session");

        Ok(Teardown { released, discarded })
    }

    fn dispatch(&mut self, event: SessionEvent) {
        let actions = self.session.handle(event, &self.transport);
        for action in actions {
            self.execute(action);
        }
    }

    fn execute(&mut self, action: SessionAction<E::Instant>) {
        match action {
            SessionAction::Send(payload) => {
                if let Err(e) = self.transport.send_to_peers(&payload) {
                    tracing::warn!(?payload, "send failed: {e}");
                }
            },
            SessionAction::FlagChanged(change) => self.flag_observers.notify(&change),
            SessionAction::ReadinessChanged(change) => self.ready_observers.notify(&change),
            SessionAction::CoordinatorChanged { to, .. } => self.coordinator_observers.notify(&to),
            SessionAction::CloseRoom => {
                if let Err(e) = self.transport.close_room() {
                    tracing::error!("failed to close room: {e}");
                }
            },
            SessionAction::TransitionStarted { initiated_by, at } => {
                self.transition_observers.notify(&TransitionNotice { initiated_by, at });
            },
        }
    }
}
