//! Event sink registered on every streaming connection
//!
//! Turns the synchronization-completed event into session promotion and
//! closed positions into trade notifications. Everything else is logged.
//! Each connection gets its own listener bound to the generation it was
//! attached as, so a torn-down stream can still deliver trade events but
//! can no longer promote the session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use types::{ClosedTrade, DealInfo, OrderInfo, PositionInfo};

use crate::gateway::SyncListener;
use crate::notifier::{Notification, Notifier};
use crate::session::Session;

/// Listener feeding the shared session and the notifier
pub struct EventSink {
    session: Arc<Session>,
    notifier: Arc<dyn Notifier>,
    events_received: AtomicU64,
}

impl EventSink {
    /// Create a sink for `session`
    pub fn new(session: Arc<Session>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            session,
            notifier,
            events_received: AtomicU64::new(0),
        }
    }

    /// Events delivered to this sink so far
    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::Relaxed)
    }

    /// Listener for the connection attached as `generation`
    pub fn bind(self: &Arc<Self>, generation: u64) -> Arc<dyn SyncListener> {
        Arc::new(BoundSink {
            sink: self.clone(),
            generation,
        })
    }

    fn count(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }
}

struct BoundSink {
    sink: Arc<EventSink>,
    generation: u64,
}

impl SyncListener for BoundSink {
    fn on_synchronization_started(&self) {
        self.sink.count();
        info!(
            account_id = %self.sink.session.account_id(),
            generation = self.generation,
            "🔄 Synchronization started"
        );
    }

    fn on_synchronization_completed(&self) {
        self.sink.count();
        if self.sink.session.mark_synchronized(self.generation) {
            info!("🚀 Session ready for account {}", self.sink.session.account_id());
        } else {
            info!(
                "✅ Synchronization completed for account {} (generation {}, state: {})",
                self.sink.session.account_id(),
                self.generation,
                self.sink.session.state()
            );
        }
    }

    fn on_order_added(&self, order: &OrderInfo) {
        self.sink.count();
        info!("Order added: {} {} {}", order.id, order.symbol, order.volume);
    }

    fn on_order_updated(&self, order: &OrderInfo) {
        self.sink.count();
        debug!("Order updated: {} {}", order.id, order.symbol);
    }

    fn on_order_removed(&self, order: &OrderInfo) {
        self.sink.count();
        info!("Order removed: {} {}", order.id, order.symbol);
    }

    fn on_position_added(&self, position: &PositionInfo) {
        self.sink.count();
        info!(
            "Position opened: {} {} {}",
            position.id, position.symbol, position.volume
        );
    }

    fn on_position_updated(&self, position: &PositionInfo) {
        self.sink.count();
        debug!("Position updated: {} {}", position.id, position.symbol);
    }

    fn on_position_removed(&self, position: &PositionInfo) {
        self.sink.count();
        let closed = ClosedTrade::from_position(position);
        info!(
            "Position closed: {} {} {} {}",
            position.id, closed.symbol, closed.outcome, closed.pnl
        );
        self.sink.notifier.notify(Notification::TradeClosed(closed));
    }

    fn on_deal_added(&self, deal: &DealInfo) {
        self.sink.count();
        debug!("Deal added: {} {} {}", deal.id, deal.symbol, deal.volume);
    }
}
