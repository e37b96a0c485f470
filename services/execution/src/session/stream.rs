//! Streaming session: account acquisition, stream setup and health checks

use chrono::Utc;
use futures_util::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use types::{HealthStatus, STATUS_CONNECTED};

use super::{Session, SessionState};
use crate::gateway::{
    ConnectionStatus, GatewayResult, StreamingConnection, TradingAccount, TradingGateway,
};
use crate::sink::EventSink;
use crate::{ExecutionError, GatewayError, Result};

/// Drives a [`Session`] through connect, sync confirmation and teardown
///
/// Every remote call that can hang is bounded by the connect timeout.
pub struct StreamSession {
    gateway: Arc<dyn TradingGateway>,
    session: Arc<Session>,
    sink: Arc<EventSink>,
    connect_timeout: Duration,
}

impl StreamSession {
    /// Create a stream session; `sink` is bound to every new stream
    pub fn new(
        gateway: Arc<dyn TradingGateway>,
        session: Arc<Session>,
        sink: Arc<EventSink>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            gateway,
            session,
            sink,
            connect_timeout,
        }
    }

    /// Shared session
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Initial connect
    ///
    /// Account acquisition and the connectivity wait are fatal: they fail
    /// with [`ExecutionError::InitialConnect`]. Stream or synchronization
    /// trouble after that leaves the session degraded for the watchdog to
    /// recover, and still returns `Ok`.
    pub async fn connect(&self) -> Result<SessionState> {
        let account_id = self.session.account_id().to_string();
        tracing::info!(account_id = %account_id, "Connecting to trading account");
        self.session.begin_connecting();

        let account = match self.acquire_account().await {
            Ok(account) => account,
            Err(source) => {
                tracing::error!(account_id = %account_id, error = %source, "Initial connect failed");
                self.session.mark_disconnected();
                return Err(ExecutionError::InitialConnect { account_id, source });
            }
        };

        match self.open_stream(account.as_ref()).await {
            Ok(state) => Ok(state),
            Err(e) => {
                tracing::warn!(
                    "Stream setup failed for account {}: {}; watchdog will retry",
                    account_id,
                    e
                );
                self.session.mark_degraded();
                Ok(SessionState::Degraded)
            }
        }
    }

    /// Acquire a fresh account handle and open a new stream on it
    pub(crate) async fn reestablish(&self) -> GatewayResult<SessionState> {
        let account = self.acquire_account().await?;
        self.open_stream(account.as_ref()).await
    }

    async fn acquire_account(&self) -> GatewayResult<Arc<dyn TradingAccount>> {
        let account = self
            .bounded(
                "account acquisition",
                self.gateway.account(self.session.credentials()),
            )
            .await?;
        self.bounded("account connection", account.wait_connected())
            .await?;
        tracing::debug!("Account {} connected to gateway", account.id());
        Ok(account)
    }

    async fn open_stream(&self, account: &dyn TradingAccount) -> GatewayResult<SessionState> {
        let connection = account.streaming_connection();

        // Attach before connecting so early sync events land on this handle
        let generation = self.session.attach(connection.clone());
        connection.add_listener(self.sink.bind(generation));

        self.bounded("stream connect", connection.connect()).await?;
        self.bounded("synchronization", connection.wait_synchronized())
            .await?;

        let health = read_health(connection.as_ref());
        if !health.is_healthy() {
            return Err(GatewayError::ConnectionFailed(format!(
                "stream unhealthy after synchronization (connected: {}, synchronized: {})",
                health.connected, health.synchronized
            )));
        }

        let state = self.session.confirm_stream(generation);
        match state {
            SessionState::Ready => tracing::info!(
                "🚀 Session ready for account {}",
                self.session.account_id()
            ),
            _ => tracing::info!(
                "Stream synchronized for account {}, awaiting synchronization event",
                self.session.account_id()
            ),
        }
        Ok(state)
    }

    async fn bounded<F, T>(&self, operation: &'static str, wait: F) -> GatewayResult<T>
    where
        F: Future<Output = GatewayResult<T>>,
    {
        match timeout(self.connect_timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout {
                operation,
                timeout_ms: self.connect_timeout.as_millis() as u64,
            }),
        }
    }

    /// Health snapshot of the current connection
    ///
    /// No handle, a status error or a panicking status read all count as
    /// unhealthy.
    pub fn health(&self) -> HealthStatus {
        match self.session.connection() {
            Some(connection) => read_health(connection.as_ref()),
            None => HealthStatus::disconnected(),
        }
    }

    /// Connected and synchronized
    pub fn is_healthy(&self) -> bool {
        self.health().is_healthy()
    }

    /// Close the stream and forget it
    pub async fn disconnect(&self) {
        if let Some(connection) = self.session.mark_disconnected() {
            tracing::info!("Disconnecting stream for account {}", self.session.account_id());
            self.release(connection).await;
        }
    }

    /// Best-effort teardown of a handle the session no longer holds
    ///
    /// An error, a panic or a disconnect outliving the connect timeout is
    /// logged and the handle is abandoned.
    pub(crate) async fn release(&self, connection: Arc<dyn StreamingConnection>) {
        let teardown = AssertUnwindSafe(connection.disconnect()).catch_unwind();
        match timeout(self.connect_timeout, teardown).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::warn!("Stream disconnect failed: {}", e),
            Ok(Err(_)) => tracing::warn!("Stream disconnect panicked, abandoning handle"),
            Err(_) => tracing::warn!(
                timeout_ms = self.connect_timeout.as_millis() as u64,
                "Stream disconnect timed out, abandoning handle"
            ),
        }
    }
}

fn read_health(connection: &dyn StreamingConnection) -> HealthStatus {
    let status = std::panic::catch_unwind(AssertUnwindSafe(|| connection.status()));
    match status {
        Ok(Ok(status)) => health_from(&status),
        Ok(Err(e)) => {
            tracing::debug!("Status read failed: {}", e);
            HealthStatus::disconnected()
        }
        Err(_) => {
            tracing::warn!("Status read panicked, treating stream as unhealthy");
            HealthStatus::disconnected()
        }
    }
}

fn health_from(status: &ConnectionStatus) -> HealthStatus {
    HealthStatus {
        connected: status.connection_status == STATUS_CONNECTED,
        connected_to_broker: status.connected_to_broker,
        synchronized: status.synchronized,
        observed_at: Utc::now(),
    }
}
