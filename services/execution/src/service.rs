//! Execution service composition
//!
//! Wires one session, its stream, the reconnect coordinator, the watchdog,
//! order placement and signal intake around a gateway and a notifier.

use std::sync::Arc;
use tracing::info;

use crate::config::ExecutorConfig;
use crate::gateway::{AccountCredentials, TradingGateway};
use crate::intake::SignalIntake;
use crate::notifier::Notifier;
use crate::orders::OrderGateway;
use crate::reconnect::ReconnectCoordinator;
use crate::session::{Session, SessionState, StreamSession};
use crate::sink::EventSink;
use crate::watchdog::{HealthWatchdog, WatchdogHandle, WatchdogStats};
use crate::Result;

/// Execution core for one trading account
pub struct ExecutionService {
    config: ExecutorConfig,
    session: Arc<Session>,
    sink: Arc<EventSink>,
    stream: Arc<StreamSession>,
    coordinator: Arc<ReconnectCoordinator>,
    orders: Arc<OrderGateway>,
    intake: SignalIntake,
    watchdog: Option<WatchdogHandle>,
}

impl ExecutionService {
    /// Build the service; nothing is contacted until [`start`](Self::start)
    pub fn new(
        config: ExecutorConfig,
        gateway: Arc<dyn TradingGateway>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let session = Arc::new(Session::new(AccountCredentials::new(
            config.account_id.clone(),
            config.api_token.clone(),
        )));
        let sink = Arc::new(EventSink::new(session.clone(), notifier.clone()));
        let stream = Arc::new(StreamSession::new(
            gateway,
            session.clone(),
            sink.clone(),
            config.connect_timeout,
        ));
        let coordinator = Arc::new(ReconnectCoordinator::new(
            stream.clone(),
            config.reconnect_cooldown,
        ));
        let orders = Arc::new(OrderGateway::new(
            session.clone(),
            config.symbol_map.clone(),
            config.default_lot,
            notifier.clone(),
        ));
        let intake = SignalIntake::new(orders.clone(), notifier, config.order_mode);

        Self {
            config,
            session,
            sink,
            stream,
            coordinator,
            orders,
            intake,
            watchdog: None,
        }
    }

    /// Initial connect, then start the watchdog
    ///
    /// Only account acquisition or connectivity failure is returned as an
    /// error; a degraded stream is left to the watchdog.
    pub async fn start(&mut self) -> Result<SessionState> {
        let state = self.stream.connect().await?;

        if self.watchdog.is_none() {
            let watchdog = HealthWatchdog::new(
                self.stream.clone(),
                self.coordinator.clone(),
                self.config.watchdog_interval,
            );
            self.watchdog = Some(watchdog.spawn());
        }

        info!(
            "Execution service started for account {} ({})",
            self.session.account_id(),
            state
        );
        Ok(state)
    }

    /// Stop the watchdog, then close the stream
    pub async fn shutdown(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.shutdown().await;
        }
        self.stream.disconnect().await;
        info!(
            "Execution service stopped ({} gateway events seen)",
            self.sink.events_received()
        );
    }

    /// Configuration in use
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Shared session
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Stream session
    pub fn stream(&self) -> &Arc<StreamSession> {
        &self.stream
    }

    /// Reconnect coordinator
    pub fn coordinator(&self) -> &Arc<ReconnectCoordinator> {
        &self.coordinator
    }

    /// Order placement
    pub fn orders(&self) -> &Arc<OrderGateway> {
        &self.orders
    }

    /// Signal intake
    pub fn intake(&self) -> &SignalIntake {
        &self.intake
    }

    /// Watchdog counters, once started
    pub fn watchdog_stats(&self) -> Option<Arc<WatchdogStats>> {
        self.watchdog.as_ref().map(|handle| handle.stats().clone())
    }
}
