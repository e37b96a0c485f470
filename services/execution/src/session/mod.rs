//! Connection session state
//!
//! A single [`Session`] is shared by the connect flow, the event sink, the
//! watchdog, the reconnect coordinator and order placement. All of its
//! mutable state sits behind one lock so readers never observe a readiness
//! flag that disagrees with the state or the connection handle.
//!
//! ```text
//! Disconnected ─► Connecting ─► AwaitingSync ─► Ready
//!                                     │            │
//!                                     ▼            ▼
//!                 Reconnecting ◄──── Degraded ◄────┘
//!                      │
//!                      └──► AwaitingSync ─► Ready
//! ```
//!
//! Promotion to [`SessionState::Ready`] needs both the synchronization
//! event from the gateway and a post-sync health confirmation from the
//! connect flow, against the same attached connection. Each attach bumps a
//! generation counter; events and confirmations carry the generation they
//! belong to and are dropped once it is stale.

pub mod stream;

pub use stream::StreamSession;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::gateway::{AccountCredentials, StreamingConnection};

/// Lifecycle state of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No connection handle
    Disconnected,
    /// Initial connect in progress
    Connecting,
    /// Connection attached, waiting for synchronization
    AwaitingSync,
    /// Verified healthy and synchronized; orders may flow
    Ready,
    /// Health check failed; waiting for recovery
    Degraded,
    /// Recovery in progress
    Reconnecting,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::AwaitingSync => "awaiting_sync",
            SessionState::Ready => "ready",
            SessionState::Degraded => "degraded",
            SessionState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

struct SessionInner {
    state: SessionState,
    connection: Option<Arc<dyn StreamingConnection>>,
    generation: u64,
    sync_observed: bool,
    stream_confirmed: bool,
}

impl SessionInner {
    fn try_promote(&mut self) -> bool {
        if self.state == SessionState::AwaitingSync && self.sync_observed && self.stream_confirmed {
            self.state = SessionState::Ready;
            true
        } else {
            false
        }
    }

    fn reset_flags(&mut self) {
        self.sync_observed = false;
        self.stream_confirmed = false;
    }
}

/// Shared connection session
pub struct Session {
    credentials: AccountCredentials,
    inner: RwLock<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Session")
            .field("credentials", &self.credentials)
            .field("state", &inner.state)
            .field("generation", &inner.generation)
            .field("has_connection", &inner.connection.is_some())
            .finish()
    }
}

impl Session {
    /// New session in [`SessionState::Disconnected`]
    pub fn new(credentials: AccountCredentials) -> Self {
        Self {
            credentials,
            inner: RwLock::new(SessionInner {
                state: SessionState::Disconnected,
                connection: None,
                generation: 0,
                sync_observed: false,
                stream_confirmed: false,
            }),
        }
    }

    /// Account this session belongs to
    pub fn account_id(&self) -> &str {
        &self.credentials.account_id
    }

    /// Credentials used for account acquisition
    pub fn credentials(&self) -> &AccountCredentials {
        &self.credentials
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.inner.read().state
    }

    /// Whether orders may be sent
    pub fn is_ready(&self) -> bool {
        self.inner.read().state == SessionState::Ready
    }

    /// Current connection handle, if any
    pub fn connection(&self) -> Option<Arc<dyn StreamingConnection>> {
        self.inner.read().connection.clone()
    }

    /// Connection handle, only when the session is ready
    ///
    /// State and handle are read under the same lock.
    pub fn ready_connection(&self) -> Option<Arc<dyn StreamingConnection>> {
        let inner = self.inner.read();
        match inner.state {
            SessionState::Ready => inner.connection.clone(),
            _ => None,
        }
    }

    /// Times a connection has been attached
    pub fn generation(&self) -> u64 {
        self.inner.read().generation
    }

    /// Record a synchronization-completed event from the connection
    /// attached as `generation`
    ///
    /// Accepted only while awaiting sync on that same connection; repeats
    /// while ready and events from replaced connections are no-ops.
    /// Returns `true` when this call promoted the session to ready.
    pub fn mark_synchronized(&self, generation: u64) -> bool {
        let mut inner = self.inner.write();
        if inner.generation != generation {
            debug!(
                "Ignoring synchronization event from stale connection (generation {}, current {})",
                generation, inner.generation
            );
            return false;
        }
        match inner.state {
            SessionState::AwaitingSync => {
                inner.sync_observed = true;
                inner.try_promote()
            }
            state => {
                debug!("Ignoring synchronization event in state {}", state);
                false
            }
        }
    }

    pub(crate) fn begin_connecting(&self) {
        let mut inner = self.inner.write();
        inner.state = SessionState::Connecting;
        inner.reset_flags();
    }

    /// Enter reconnecting and hand back the stale handle for teardown
    pub(crate) fn begin_reconnecting(&self) -> Option<Arc<dyn StreamingConnection>> {
        let mut inner = self.inner.write();
        inner.state = SessionState::Reconnecting;
        inner.reset_flags();
        inner.connection.take()
    }

    /// Store a fresh handle and await synchronization on it
    pub(crate) fn attach(&self, connection: Arc<dyn StreamingConnection>) -> u64 {
        let mut inner = self.inner.write();
        inner.connection = Some(connection);
        inner.generation += 1;
        inner.state = SessionState::AwaitingSync;
        inner.reset_flags();
        inner.generation
    }

    /// Record that the connection of `generation` passed its post-sync
    /// health check. Returns the resulting state.
    pub(crate) fn confirm_stream(&self, generation: u64) -> SessionState {
        let mut inner = self.inner.write();
        if inner.generation == generation && inner.state == SessionState::AwaitingSync {
            inner.stream_confirmed = true;
            inner.try_promote();
        }
        inner.state
    }

    /// Drop readiness after a failed health check or recovery step.
    /// Returns `true` if the session was ready.
    pub(crate) fn mark_degraded(&self) -> bool {
        let mut inner = self.inner.write();
        let was_ready = inner.state == SessionState::Ready;
        inner.state = SessionState::Degraded;
        inner.reset_flags();
        was_ready
    }

    /// Forget the handle entirely and hand it back for teardown
    pub(crate) fn mark_disconnected(&self) -> Option<Arc<dyn StreamingConnection>> {
        let mut inner = self.inner.write();
        inner.state = SessionState::Disconnected;
        inner.reset_flags();
        inner.connection.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{PaperGateway, TradingGateway};

    async fn connection(gateway: &PaperGateway) -> Arc<dyn StreamingConnection> {
        let account = gateway
            .account(&AccountCredentials::new("acc-1", "token"))
            .await
            .unwrap();
        account.streaming_connection()
    }

    fn session() -> Session {
        Session::new(AccountCredentials::new("acc-1", "token"))
    }

    #[tokio::test]
    async fn test_ready_needs_event_and_confirmation() {
        let gateway = PaperGateway::new();
        let session = session();
        session.begin_connecting();
        let generation = session.attach(connection(&gateway).await);

        assert!(!session.mark_synchronized(generation));
        assert!(!session.is_ready());
        assert_eq!(session.confirm_stream(generation), SessionState::Ready);
        assert!(session.is_ready());
        assert!(session.ready_connection().is_some());
    }

    #[tokio::test]
    async fn test_confirmation_before_event() {
        let gateway = PaperGateway::new();
        let session = session();
        let generation = session.attach(connection(&gateway).await);

        assert_eq!(session.confirm_stream(generation), SessionState::AwaitingSync);
        assert!(session.mark_synchronized(generation));
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_repeated_sync_event_is_idempotent() {
        let gateway = PaperGateway::new();
        let session = session();
        let generation = session.attach(connection(&gateway).await);
        session.confirm_stream(generation);
        session.mark_synchronized(generation);

        assert!(!session.mark_synchronized(generation));
        assert!(session.is_ready());
    }

    #[test]
    fn test_sync_event_without_connection_is_ignored() {
        let session = session();
        assert!(!session.mark_synchronized(session.generation()));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_stale_confirmation_is_ignored() {
        let gateway = PaperGateway::new();
        let session = session();
        let stale = session.attach(connection(&gateway).await);
        let current = session.attach(connection(&gateway).await);
        session.mark_synchronized(current);

        assert_eq!(session.confirm_stream(stale), SessionState::AwaitingSync);
        assert!(!session.is_ready());
    }

    #[tokio::test]
    async fn test_stale_sync_event_does_not_promote() {
        let gateway = PaperGateway::new();
        let session = session();
        let stale = session.attach(connection(&gateway).await);
        let current = session.attach(connection(&gateway).await);
        assert_eq!(session.generation(), current);

        session.confirm_stream(current);
        assert!(!session.mark_synchronized(stale));
        assert_eq!(session.state(), SessionState::AwaitingSync);

        assert!(session.mark_synchronized(current));
        assert!(session.is_ready());
    }

    #[tokio::test]
    async fn test_degrade_and_reconnect_clear_readiness() {
        let gateway = PaperGateway::new();
        let session = session();
        let generation = session.attach(connection(&gateway).await);
        session.mark_synchronized(generation);
        session.confirm_stream(generation);

        assert!(session.mark_degraded());
        assert!(!session.is_ready());
        assert!(session.connection().is_some());

        assert!(session.begin_reconnecting().is_some());
        assert!(session.connection().is_none());
        assert_eq!(session.state(), SessionState::Reconnecting);
        assert!(session.ready_connection().is_none());
    }
}
