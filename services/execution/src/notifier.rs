//! Outbound operator notifications
//!
//! The core only hands structured notifications to a [`Notifier`]; message
//! formatting and transport live behind it.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use types::{ClosedTrade, TradeSignal};

/// Something an operator wants to hear about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notification {
    /// A signal arrived on an intake channel
    SignalReceived {
        /// Source channel name
        channel: String,
        /// Parsed signal
        signal: TradeSignal,
    },
    /// The gateway accepted an order
    OrderPlaced {
        /// Broker symbol
        symbol: String,
        /// Limit price, `None` for market orders
        price: Option<Decimal>,
        /// Gateway order id
        order_id: String,
    },
    /// A position was closed
    TradeClosed(ClosedTrade),
}

impl Notification {
    /// One-line human summary
    pub fn summary(&self) -> String {
        match self {
            Notification::SignalReceived { channel, signal } => format!(
                "signal from {}: {} {} entry {} tp {} sl {}",
                channel, signal.action, signal.symbol, signal.entry, signal.target, signal.stop_loss
            ),
            Notification::OrderPlaced {
                symbol,
                price: Some(price),
                order_id,
            } => format!("order {} placed: {} @ {}", order_id, symbol, price),
            Notification::OrderPlaced {
                symbol, order_id, ..
            } => format!("order {} placed: {} @ market", order_id, symbol),
            Notification::TradeClosed(trade) => {
                format!("trade closed: {} {} {}", trade.symbol, trade.outcome, trade.pnl)
            }
        }
    }
}

/// Sink for notifications. Must not block: called from gateway event handlers.
pub trait Notifier: Send + Sync {
    /// Deliver `notification`; failures are the notifier's own concern
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        info!("📣 {}", notification.summary());
    }
}

/// Forwards notifications into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Notifier plus the receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            warn!("Notification receiver dropped");
        }
    }
}
