//! Periodic health watchdog
//!
//! Polls stream health at a fixed interval and triggers recovery when the
//! stream is not connected and synchronized. A failing or panicking tick is
//! logged and the loop carries on.

use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::reconnect::{ReconnectCoordinator, ReconnectOutcome};
use crate::session::{SessionState, StreamSession};

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickOutcome {
    /// Stream healthy, nothing to do
    Healthy,
    /// Stream unhealthy, but a recovery was already running
    RecoveryInFlight,
    /// Stream unhealthy, recovery triggered
    Reconnect(ReconnectOutcome),
}

/// Watchdog counters
#[derive(Debug, Default)]
pub struct WatchdogStats {
    ticks: AtomicU64,
    failed_ticks: AtomicU64,
    reconnects_triggered: AtomicU64,
}

impl WatchdogStats {
    /// Completed ticks, failed ones included
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Ticks that panicked
    pub fn failed_ticks(&self) -> u64 {
        self.failed_ticks.load(Ordering::Relaxed)
    }

    /// Ticks that triggered recovery
    pub fn reconnects_triggered(&self) -> u64 {
        self.reconnects_triggered.load(Ordering::Relaxed)
    }
}

/// Health polling loop
pub struct HealthWatchdog {
    stream: Arc<StreamSession>,
    coordinator: Arc<ReconnectCoordinator>,
    interval: Duration,
    stats: Arc<WatchdogStats>,
}

/// Handle to a spawned watchdog
pub struct WatchdogHandle {
    stop: Arc<AtomicBool>,
    stats: Arc<WatchdogStats>,
    task: JoinHandle<()>,
}

impl WatchdogHandle {
    /// Ask the loop to end after its current sleep
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Counters of the running loop
    pub fn stats(&self) -> &Arc<WatchdogStats> {
        &self.stats
    }

    /// Stop and wait for the loop to exit
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.task.await {
            error!("Watchdog task ended abnormally: {}", e);
        }
    }
}

impl HealthWatchdog {
    /// Watchdog polling every `interval`
    pub fn new(
        stream: Arc<StreamSession>,
        coordinator: Arc<ReconnectCoordinator>,
        interval: Duration,
    ) -> Self {
        Self {
            stream,
            coordinator,
            interval,
            stats: Arc::new(WatchdogStats::default()),
        }
    }

    /// Counters
    pub fn stats(&self) -> &Arc<WatchdogStats> {
        &self.stats
    }

    /// Run the loop on its own task
    pub fn spawn(self) -> WatchdogHandle {
        let stop = Arc::new(AtomicBool::new(false));
        let stats = self.stats.clone();
        let task = tokio::spawn(self.run(stop.clone()));
        WatchdogHandle { stop, stats, task }
    }

    /// Tick every interval until `stop` is set
    ///
    /// The first tick fires one full interval after start.
    pub async fn run(self, stop: Arc<AtomicBool>) {
        info!("🐕 Health watchdog started (interval: {:?})", self.interval);
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if stop.load(Ordering::Acquire) {
                break;
            }

            match AssertUnwindSafe(self.tick()).catch_unwind().await {
                Ok(outcome) => debug!("Watchdog tick: {:?}", outcome),
                Err(panic) => {
                    self.stats.failed_ticks.fetch_add(1, Ordering::Relaxed);
                    error!("Watchdog tick failed: {}", panic_message(panic.as_ref()));
                }
            }
            self.stats.ticks.fetch_add(1, Ordering::Relaxed);
        }

        info!("Health watchdog stopped after {} ticks", self.stats.ticks());
    }

    /// One health check, triggering recovery when unhealthy
    pub async fn tick(&self) -> TickOutcome {
        let session = self.stream.session();
        let health = self.stream.health();

        if health.is_healthy() {
            if session.state() == SessionState::AwaitingSync {
                warn!(
                    "Stream for account {} is synchronized but no synchronization event arrived yet",
                    session.account_id()
                );
            } else {
                info!(
                    generation = session.generation(),
                    "💓 Heartbeat: account {} {}",
                    session.account_id(),
                    session.state()
                );
            }
            return TickOutcome::Healthy;
        }

        if self.coordinator.in_progress() {
            debug!("Stream unhealthy, recovery already running");
            return TickOutcome::RecoveryInFlight;
        }

        let was_ready = session.mark_degraded();
        warn!(
            "⚠️ Stream unhealthy for account {} (connected: {}, synchronized: {}, was ready: {}), reconnecting",
            session.account_id(),
            health.connected,
            health.synchronized,
            was_ready
        );
        self.stats.reconnects_triggered.fetch_add(1, Ordering::Relaxed);
        TickOutcome::Reconnect(self.coordinator.reconnect().await)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{AccountCredentials, PaperGateway};
    use crate::notifier::TracingNotifier;
    use crate::session::Session;
    use crate::sink::EventSink;

    fn watchdog(gateway: &PaperGateway) -> HealthWatchdog {
        let session = Arc::new(Session::new(AccountCredentials::new("acc-1", "token")));
        let sink = Arc::new(EventSink::new(session.clone(), Arc::new(TracingNotifier)));
        let stream = Arc::new(StreamSession::new(
            Arc::new(gateway.clone()),
            session,
            sink,
            Duration::from_secs(60),
        ));
        let coordinator = Arc::new(ReconnectCoordinator::new(stream.clone(), Duration::ZERO));
        HealthWatchdog::new(stream, coordinator, Duration::from_secs(30))
    }

    #[tokio::test]
    async fn test_healthy_tick_does_nothing() {
        let gateway = PaperGateway::new();
        let watchdog = watchdog(&gateway);
        watchdog.stream.connect().await.unwrap();

        assert_eq!(watchdog.tick().await, TickOutcome::Healthy);
        assert_eq!(gateway.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_unhealthy_tick_recovers() {
        let gateway = PaperGateway::new();
        let watchdog = watchdog(&gateway);
        watchdog.stream.connect().await.unwrap();
        gateway.drop_stream();

        assert_eq!(
            watchdog.tick().await,
            TickOutcome::Reconnect(ReconnectOutcome::Recovered)
        );
        assert!(watchdog.stream.session().is_ready());
        assert_eq!(watchdog.stats().reconnects_triggered(), 1);
    }

    #[tokio::test]
    async fn test_awaiting_event_but_healthy_only_warns() {
        let gateway = PaperGateway::new();
        gateway.suppress_sync_events(true);
        let watchdog = watchdog(&gateway);
        watchdog.stream.connect().await.unwrap();

        assert_eq!(watchdog.tick().await, TickOutcome::Healthy);
        assert_eq!(watchdog.stream.session().state(), SessionState::AwaitingSync);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_loop() {
        let gateway = PaperGateway::new();
        let watchdog = watchdog(&gateway);
        watchdog.stream.connect().await.unwrap();
        let handle = watchdog.spawn();

        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(handle.stats().ticks(), 3);

        let stats = handle.stats().clone();
        handle.shutdown().await;
        assert_eq!(stats.ticks(), 3);
    }

    #[test]
    fn test_panic_message_extraction() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
    }
}
