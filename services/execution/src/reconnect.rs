//! Mutually exclusive session recovery
//!
//! At most one recovery runs at a time. A trigger that finds one in flight
//! returns immediately without touching the session.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::session::{SessionState, StreamSession};
use crate::GatewayError;

/// Result of a reconnect trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconnectOutcome {
    /// Fresh stream attached, synchronized and ready
    Recovered,
    /// Fresh stream synchronized; readiness follows the gateway's event
    AwaitingSyncEvent,
    /// Another recovery was already running; nothing was done
    AlreadyInProgress,
    /// Recovery failed; the next watchdog tick retries
    Failed {
        /// Failure text
        reason: String,
    },
}

/// Reconnect counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconnectStats {
    /// Recoveries started
    pub attempts: u64,
    /// Recoveries that ended ready or awaiting the event
    pub successes: u64,
    /// Triggers dropped because one was in flight
    pub skipped: u64,
}

/// Serializes recovery of a [`StreamSession`]
pub struct ReconnectCoordinator {
    stream: Arc<StreamSession>,
    cooldown: Duration,
    guard: Mutex<()>,
    attempts: AtomicU64,
    successes: AtomicU64,
    skipped: AtomicU64,
}

impl ReconnectCoordinator {
    /// Coordinator waiting `cooldown` between teardown and reconnect
    pub fn new(stream: Arc<StreamSession>, cooldown: Duration) -> Self {
        Self {
            stream,
            cooldown,
            guard: Mutex::new(()),
            attempts: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    /// Whether a recovery is running right now
    pub fn in_progress(&self) -> bool {
        self.guard.try_lock().is_err()
    }

    /// Counter snapshot
    pub fn stats(&self) -> ReconnectStats {
        ReconnectStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    /// Tear down the stale stream and build a new one
    ///
    /// Steps, in order: drop readiness and disconnect the old handle
    /// (best effort, bounded by the connect timeout), wait out the cooldown, acquire a fresh account
    /// handle and wait for connectivity, attach a new stream with the event
    /// sink registered and connect it, wait for synchronization and confirm
    /// health. Any failure leaves the session not ready and ends the attempt.
    pub async fn reconnect(&self) -> ReconnectOutcome {
        let _guard = match self.guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Reconnect already in progress, skipping trigger");
                return ReconnectOutcome::AlreadyInProgress;
            }
        };

        let attempt = self.attempts.fetch_add(1, Ordering::Relaxed) + 1;
        let session = self.stream.session();
        tracing::info!(account_id = %session.account_id(), attempt, "🔄 Reconnecting");

        if let Some(stale) = session.begin_reconnecting() {
            self.stream.release(stale).await;
        }

        if !self.cooldown.is_zero() {
            tokio::time::sleep(self.cooldown).await;
        }

        match self.stream.reestablish().await {
            Ok(SessionState::Ready) => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                tracing::info!("✅ Reconnected account {}", session.account_id());
                ReconnectOutcome::Recovered
            }
            Ok(state) => {
                self.successes.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    "Reconnected account {}, session {}",
                    session.account_id(),
                    state
                );
                ReconnectOutcome::AwaitingSyncEvent
            }
            Err(e @ GatewayError::AccountNotFound { .. }) => {
                tracing::error!("Reconnect failed, account unavailable: {}", e);
                if let Some(orphan) = session.mark_disconnected() {
                    self.stream.release(orphan).await;
                }
                ReconnectOutcome::Failed {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                if e.is_recoverable() {
                    tracing::warn!("Reconnect failed for account {}: {}", session.account_id(), e);
                } else {
                    tracing::error!("Reconnect failed for account {}: {}", session.account_id(), e);
                }
                session.mark_degraded();
                ReconnectOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{AccountCredentials, PanicPoint, PaperGateway, RemoteCall};
    use crate::notifier::TracingNotifier;
    use crate::session::Session;
    use crate::sink::EventSink;

    fn coordinator(gateway: &PaperGateway, cooldown: Duration) -> ReconnectCoordinator {
        let session = Arc::new(Session::new(AccountCredentials::new("acc-1", "token")));
        let sink = Arc::new(EventSink::new(session.clone(), Arc::new(TracingNotifier)));
        let stream = Arc::new(StreamSession::new(
            Arc::new(gateway.clone()),
            session,
            sink,
            Duration::from_secs(60),
        ));
        ReconnectCoordinator::new(stream, cooldown)
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_runs_steps_in_order() {
        let gateway = PaperGateway::new();
        let coordinator = coordinator(&gateway, Duration::from_secs(10));
        coordinator.stream.connect().await.unwrap();
        gateway.drop_stream();

        let started = tokio::time::Instant::now();
        assert_eq!(coordinator.reconnect().await, ReconnectOutcome::Recovered);
        assert!(started.elapsed() >= Duration::from_secs(10));

        let calls = gateway.calls();
        assert_eq!(
            calls[calls.len() - 5..].to_vec(),
            vec![
                RemoteCall::Disconnect,
                RemoteCall::AcquireAccount {
                    account_id: "acc-1".to_string()
                },
                RemoteCall::WaitConnected,
                RemoteCall::Connect,
                RemoteCall::WaitSynchronized,
            ]
        );
        assert_eq!(gateway.connection_count(), 2);
        assert!(coordinator.stream.session().is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_account_disconnects() {
        let gateway = PaperGateway::new();
        let coordinator = coordinator(&gateway, Duration::ZERO);
        coordinator.stream.connect().await.unwrap();

        gateway.set_account_error(Some(GatewayError::AccountNotFound {
            account_id: "acc-1".to_string(),
            reason: "deleted".to_string(),
        }));
        let outcome = coordinator.reconnect().await;

        assert!(matches!(outcome, ReconnectOutcome::Failed { .. }));
        assert_eq!(coordinator.stream.session().state(), SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_failure_degrades_and_next_attempt_recovers() {
        let gateway = PaperGateway::new();
        let coordinator = coordinator(&gateway, Duration::ZERO);
        coordinator.stream.connect().await.unwrap();

        gateway.set_sync_error(Some(GatewayError::ConnectionFailed("reset".to_string())));
        assert!(matches!(
            coordinator.reconnect().await,
            ReconnectOutcome::Failed { .. }
        ));
        assert_eq!(coordinator.stream.session().state(), SessionState::Degraded);

        gateway.clear_faults();
        assert_eq!(coordinator.reconnect().await, ReconnectOutcome::Recovered);
        assert_eq!(coordinator.stats().attempts, 2);
        assert_eq!(coordinator.stats().successes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_stale_disconnect_does_not_block_recovery() {
        let gateway = PaperGateway::new();
        let coordinator = coordinator(&gateway, Duration::from_secs(10));
        coordinator.stream.connect().await.unwrap();
        gateway.drop_stream();
        gateway.stall_disconnect(true);

        let started = tokio::time::Instant::now();
        assert_eq!(coordinator.reconnect().await, ReconnectOutcome::Recovered);
        assert!(started.elapsed() >= Duration::from_secs(70));
        assert!(!coordinator.in_progress());
        assert!(coordinator.stream.session().is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_stream_connect_fails_attempt() {
        let gateway = PaperGateway::new();
        let coordinator = coordinator(&gateway, Duration::ZERO);
        coordinator.stream.connect().await.unwrap();
        gateway.stall_connect(true);

        match coordinator.reconnect().await {
            ReconnectOutcome::Failed { reason } => assert!(reason.contains("stream connect")),
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(!coordinator.in_progress());
        assert_eq!(coordinator.stream.session().state(), SessionState::Degraded);

        gateway.clear_faults();
        assert_eq!(coordinator.reconnect().await, ReconnectOutcome::Recovered);
    }

    #[tokio::test]
    async fn test_panicking_stale_disconnect_is_contained() {
        let gateway = PaperGateway::new();
        let coordinator = coordinator(&gateway, Duration::ZERO);
        coordinator.stream.connect().await.unwrap();
        gateway.panic_once(PanicPoint::Disconnect);

        assert_eq!(coordinator.reconnect().await, ReconnectOutcome::Recovered);
        assert_eq!(gateway.connection_count(), 2);
    }
}
