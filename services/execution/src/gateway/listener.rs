//! Listener surface the gateway pushes events into

use serde::{Deserialize, Serialize};
use types::{DealInfo, OrderInfo, PositionInfo, TradeEvent};

/// Everything a streaming connection can push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GatewayEvent {
    /// Bulk state transfer began
    SynchronizationStarted,
    /// Bulk state transfer finished; may repeat after gateway-side reconnects
    SynchronizationCompleted,
    /// Order, position or deal lifecycle change
    Trade(TradeEvent),
}

/// Named handlers, one per event kind
///
/// Implementors provide every handler. Gateways deliver events through
/// [`dispatch`](SyncListener::dispatch), which calls exactly one of them.
/// Handlers run on the gateway's delivery task and must not block.
pub trait SyncListener: Send + Sync {
    /// Synchronization started
    fn on_synchronization_started(&self);

    /// Synchronization completed
    fn on_synchronization_completed(&self);

    /// Pending order placed
    fn on_order_added(&self, order: &OrderInfo);

    /// Pending order changed
    fn on_order_updated(&self, order: &OrderInfo);

    /// Pending order gone
    fn on_order_removed(&self, order: &OrderInfo);

    /// Position opened
    fn on_position_added(&self, position: &PositionInfo);

    /// Position changed
    fn on_position_updated(&self, position: &PositionInfo);

    /// Position closed
    fn on_position_removed(&self, position: &PositionInfo);

    /// Deal executed
    fn on_deal_added(&self, deal: &DealInfo);

    /// Route `event` to its handler
    fn dispatch(&self, event: &GatewayEvent) {
        match event {
            GatewayEvent::SynchronizationStarted => self.on_synchronization_started(),
            GatewayEvent::SynchronizationCompleted => self.on_synchronization_completed(),
            GatewayEvent::Trade(trade) => match trade {
                TradeEvent::OrderAdded(order) => self.on_order_added(order),
                TradeEvent::OrderUpdated(order) => self.on_order_updated(order),
                TradeEvent::OrderRemoved(order) => self.on_order_removed(order),
                TradeEvent::PositionAdded(position) => self.on_position_added(position),
                TradeEvent::PositionUpdated(position) => self.on_position_updated(position),
                TradeEvent::PositionRemoved(position) => self.on_position_removed(position),
                TradeEvent::DealAdded(deal) => self.on_deal_added(deal),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<&'static str>>,
    }

    impl Recorder {
        fn push(&self, name: &'static str) {
            self.seen.lock().push(name);
        }
    }

    impl SyncListener for Recorder {
        fn on_synchronization_started(&self) {
            self.push("sync_started");
        }
        fn on_synchronization_completed(&self) {
            self.push("sync_completed");
        }
        fn on_order_added(&self, _: &OrderInfo) {
            self.push("order_added");
        }
        fn on_order_updated(&self, _: &OrderInfo) {
            self.push("order_updated");
        }
        fn on_order_removed(&self, _: &OrderInfo) {
            self.push("order_removed");
        }
        fn on_position_added(&self, _: &PositionInfo) {
            self.push("position_added");
        }
        fn on_position_updated(&self, _: &PositionInfo) {
            self.push("position_updated");
        }
        fn on_position_removed(&self, _: &PositionInfo) {
            self.push("position_removed");
        }
        fn on_deal_added(&self, _: &DealInfo) {
            self.push("deal_added");
        }
    }

    #[test]
    fn test_dispatch_invokes_exactly_one_handler() {
        let recorder = Recorder::default();
        let order = OrderInfo {
            id: "1".to_string(),
            symbol: "XAUUSD_i".to_string(),
            volume: dec!(0.01),
            price: Some(dec!(2300)),
        };

        recorder.dispatch(&GatewayEvent::SynchronizationCompleted);
        recorder.dispatch(&GatewayEvent::Trade(TradeEvent::OrderRemoved(order)));

        assert_eq!(*recorder.seen.lock(), vec!["sync_completed", "order_removed"]);
    }
}
