//! Signal intake: parsed signals in, orders out

use std::sync::Arc;
use tracing::{info, warn};
use types::{OrderHandle, TradeSignal};

use crate::config::SignalOrderMode;
use crate::notifier::{Notification, Notifier};
use crate::orders::OrderGateway;
use crate::{ExecutionError, Result};

/// Turns parsed [`TradeSignal`]s into orders
pub struct SignalIntake {
    orders: Arc<OrderGateway>,
    notifier: Arc<dyn Notifier>,
    mode: SignalOrderMode,
}

impl SignalIntake {
    /// Intake placing orders through `orders` in `mode`
    pub fn new(orders: Arc<OrderGateway>, notifier: Arc<dyn Notifier>, mode: SignalOrderMode) -> Self {
        Self {
            orders,
            notifier,
            mode,
        }
    }

    /// Execution mode
    pub fn mode(&self) -> SignalOrderMode {
        self.mode
    }

    /// Announce `signal` and execute it
    ///
    /// Target becomes take-profit and stop becomes stop-loss. In limit mode
    /// the entry price is the pending price. Volume is left to the default
    /// lot.
    pub async fn handle(&self, channel: &str, signal: &TradeSignal) -> Result<OrderHandle> {
        info!(
            "📨 Signal from {}: {} {} @ {}",
            channel, signal.action, signal.symbol, signal.entry
        );
        self.notifier.notify(Notification::SignalReceived {
            channel: channel.to_string(),
            signal: signal.clone(),
        });

        let request = match self.mode {
            SignalOrderMode::Market => signal.to_market_request(),
            SignalOrderMode::Limit => signal.to_limit_request(),
        }
        .map_err(|e| {
            warn!("Dropping signal from {}: {}", channel, e);
            ExecutionError::InvalidOrder(e.to_string())
        })?;

        match self.mode {
            SignalOrderMode::Market => self.orders.place_market_order(&request).await,
            SignalOrderMode::Limit => self.orders.place_limit_order(&request).await,
        }
    }
}
