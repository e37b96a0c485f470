//! In-process paper gateway
//!
//! Simulates a broker bridge without any network. Remote calls are
//! recorded in order, and faults can be injected per step so the
//! connection lifecycle can be driven through its failure paths. Only the
//! newest streaming connection and the last [`MAX_RECORDED_CALLS`] calls
//! are retained, so a long-running process does not grow without bound.

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;
use types::{
    DealInfo, Direction, OrderHandle, OrderInfo, PositionInfo, TradeEvent, STATUS_CONNECTED,
};

use super::{
    AccountCredentials, ConnectionStatus, GatewayEvent, GatewayResult, OrderParams,
    StreamingConnection, SyncListener, TradingAccount, TradingGateway,
};
use crate::GatewayError;

const RETCODE_DONE: &str = "TRADE_RETCODE_DONE";
const STATUS_DISCONNECTED: &str = "DISCONNECTED";

/// Size of the call log; the oldest calls are dropped first
pub const MAX_RECORDED_CALLS: usize = 1024;

/// One recorded call into the gateway
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    /// Account handle requested
    AcquireAccount {
        /// Requested account
        account_id: String,
    },
    /// Account connectivity wait
    WaitConnected,
    /// Stream connect
    Connect,
    /// Stream disconnect
    Disconnect,
    /// Synchronization wait
    WaitSynchronized,
    /// Market order submitted
    MarketOrder {
        /// Side
        direction: Direction,
        /// Order parameters
        params: OrderParams,
    },
    /// Limit order submitted
    LimitOrder {
        /// Side
        direction: Direction,
        /// Order parameters
        params: OrderParams,
        /// Pending price
        open_price: Decimal,
    },
}

impl RemoteCall {
    /// Whether this call submitted an order
    pub fn is_order(&self) -> bool {
        matches!(self, RemoteCall::MarketOrder { .. } | RemoteCall::LimitOrder { .. })
    }
}

/// Where a one-shot injected panic fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicPoint {
    /// Inside account acquisition
    AcquireAccount,
    /// Inside a status read
    Status,
    /// Inside a stream disconnect
    Disconnect,
}

#[derive(Debug, Default)]
struct Faults {
    account: Option<GatewayError>,
    stall_account: bool,
    wait_connected: Option<GatewayError>,
    stall_wait_connected: bool,
    connect: Option<GatewayError>,
    stall_connect: bool,
    stall_disconnect: bool,
    synchronize: Option<GatewayError>,
    order_rejection: Option<String>,
    suppress_sync_events: bool,
    report_unsynchronized: bool,
    panic_at: Option<PanicPoint>,
}

#[derive(Default)]
struct PaperState {
    faults: Mutex<Faults>,
    calls: Mutex<VecDeque<RemoteCall>>,
    latest: Mutex<Option<Arc<PaperConnection>>>,
    connections_opened: AtomicUsize,
    next_id: AtomicU64,
}

impl PaperState {
    fn record(&self, call: RemoteCall) {
        debug!("paper gateway call: {:?}", call);
        let mut calls = self.calls.lock();
        if calls.len() == MAX_RECORDED_CALLS {
            calls.pop_front();
        }
        calls.push_back(call);
    }

    async fn stall_if<F>(&self, pick: F)
    where
        F: FnOnce(&Faults) -> bool,
    {
        let stall = pick(&self.faults.lock());
        if stall {
            std::future::pending::<()>().await;
        }
    }

    fn check<F>(&self, pick: F) -> GatewayResult<()>
    where
        F: FnOnce(&Faults) -> Option<GatewayError>,
    {
        match pick(&self.faults.lock()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn maybe_panic(&self, point: PanicPoint) {
        let hit = {
            let mut faults = self.faults.lock();
            if faults.panic_at == Some(point) {
                faults.panic_at = None;
                true
            } else {
                false
            }
        };
        if hit {
            panic!("injected paper gateway panic at {:?}", point);
        }
    }

    fn next_id(&self) -> String {
        (self.next_id.fetch_add(1, Ordering::Relaxed) + 1000).to_string()
    }
}

/// Simulated gateway
#[derive(Clone, Default)]
pub struct PaperGateway {
    state: Arc<PaperState>,
}

impl PaperGateway {
    /// Healthy gateway with no faults
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded calls, oldest first
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.calls.lock().iter().cloned().collect()
    }

    /// Order submissions so far
    pub fn order_calls(&self) -> Vec<RemoteCall> {
        self.state
            .calls
            .lock()
            .iter()
            .filter(|call| call.is_order())
            .cloned()
            .collect()
    }

    /// Number of recorded calls matching `pred`
    pub fn count_calls<F>(&self, pred: F) -> usize
    where
        F: Fn(&RemoteCall) -> bool,
    {
        self.state.calls.lock().iter().filter(|call| pred(call)).count()
    }

    /// Streaming connections created so far
    pub fn connection_count(&self) -> usize {
        self.state.connections_opened.load(Ordering::Relaxed)
    }

    /// Fail account acquisition with `err`
    pub fn set_account_error(&self, err: Option<GatewayError>) {
        self.state.faults.lock().account = err;
    }

    /// Make account acquisition never resolve
    pub fn stall_account(&self, stall: bool) {
        self.state.faults.lock().stall_account = stall;
    }

    /// Fail the account connectivity wait with `err`
    pub fn set_wait_connected_error(&self, err: Option<GatewayError>) {
        self.state.faults.lock().wait_connected = err;
    }

    /// Make the account connectivity wait never resolve
    pub fn stall_wait_connected(&self, stall: bool) {
        self.state.faults.lock().stall_wait_connected = stall;
    }

    /// Fail stream connect with `err`
    pub fn set_connect_error(&self, err: Option<GatewayError>) {
        self.state.faults.lock().connect = err;
    }

    /// Make stream connect never resolve
    pub fn stall_connect(&self, stall: bool) {
        self.state.faults.lock().stall_connect = stall;
    }

    /// Make stream disconnect never resolve
    pub fn stall_disconnect(&self, stall: bool) {
        self.state.faults.lock().stall_disconnect = stall;
    }

    /// Fail the synchronization wait with `err`
    pub fn set_sync_error(&self, err: Option<GatewayError>) {
        self.state.faults.lock().synchronize = err;
    }

    /// Reject every order with `reason`
    pub fn reject_orders(&self, reason: Option<String>) {
        self.state.faults.lock().order_rejection = reason;
    }

    /// Complete synchronization without emitting the completion event
    pub fn suppress_sync_events(&self, suppress: bool) {
        self.state.faults.lock().suppress_sync_events = suppress;
    }

    /// Report `synchronized = false` even after the synchronization wait
    pub fn report_unsynchronized(&self, unsynchronized: bool) {
        self.state.faults.lock().report_unsynchronized = unsynchronized;
    }

    /// Panic once, the next time `point` is reached
    pub fn panic_once(&self, point: PanicPoint) {
        self.state.faults.lock().panic_at = Some(point);
    }

    /// Remove every injected fault
    pub fn clear_faults(&self) {
        *self.state.faults.lock() = Faults::default();
    }

    /// Drop the link of the newest connection, as a network fault would
    pub fn drop_stream(&self) {
        if let Some(connection) = self.latest() {
            let mut link = connection.link.lock();
            link.connected = false;
            link.synchronized = false;
        }
    }

    /// Push `event` to the listeners of the newest connection
    pub fn emit(&self, event: GatewayEvent) {
        if let GatewayEvent::Trade(trade) = &event {
            debug!(kind = ?trade.kind(), symbol = trade.symbol(), "paper gateway trade event");
        }
        if let Some(connection) = self.latest() {
            connection.deliver(&event);
        }
    }

    fn latest(&self) -> Option<Arc<PaperConnection>> {
        self.state.latest.lock().clone()
    }
}

#[async_trait]
impl TradingGateway for PaperGateway {
    async fn account(
        &self,
        credentials: &AccountCredentials,
    ) -> GatewayResult<Arc<dyn TradingAccount>> {
        self.state.record(RemoteCall::AcquireAccount {
            account_id: credentials.account_id.clone(),
        });
        self.state.maybe_panic(PanicPoint::AcquireAccount);
        self.state.stall_if(|f| f.stall_account).await;
        self.state.check(|f| f.account.clone())?;

        Ok(Arc::new(PaperAccount {
            id: credentials.account_id.clone(),
            state: self.state.clone(),
        }))
    }
}

struct PaperAccount {
    id: String,
    state: Arc<PaperState>,
}

#[async_trait]
impl TradingAccount for PaperAccount {
    fn id(&self) -> &str {
        &self.id
    }

    async fn wait_connected(&self) -> GatewayResult<()> {
        self.state.record(RemoteCall::WaitConnected);
        self.state.stall_if(|f| f.stall_wait_connected).await;
        self.state.check(|f| f.wait_connected.clone())
    }

    fn streaming_connection(&self) -> Arc<dyn StreamingConnection> {
        let connection = Arc::new(PaperConnection {
            state: self.state.clone(),
            listeners: Mutex::new(Vec::new()),
            link: Mutex::new(Link::default()),
        });
        *self.state.latest.lock() = Some(connection.clone());
        self.state.connections_opened.fetch_add(1, Ordering::Relaxed);
        connection
    }
}

#[derive(Debug, Default)]
struct Link {
    connected: bool,
    synchronized: bool,
}

struct PaperConnection {
    state: Arc<PaperState>,
    listeners: Mutex<Vec<Arc<dyn SyncListener>>>,
    link: Mutex<Link>,
}

impl PaperConnection {
    fn deliver(&self, event: &GatewayEvent) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener.dispatch(event);
        }
    }

    fn ensure_connected(&self) -> GatewayResult<()> {
        if self.link.lock().connected {
            Ok(())
        } else {
            Err(GatewayError::NotConnected)
        }
    }

    fn ensure_accepting_orders(&self) -> GatewayResult<()> {
        self.ensure_connected()?;
        match self.state.faults.lock().order_rejection.clone() {
            Some(reason) => Err(GatewayError::Rejected(reason)),
            None => Ok(()),
        }
    }

    fn fill_market(&self, direction: Direction, params: &OrderParams) -> OrderHandle {
        let id = self.state.next_id();
        self.deliver(&GatewayEvent::Trade(TradeEvent::PositionAdded(PositionInfo {
            id: id.clone(),
            symbol: params.symbol.clone(),
            volume: params.volume,
            price: None,
            realized_profit: None,
            unrealized_profit: None,
        })));
        self.deliver(&GatewayEvent::Trade(TradeEvent::DealAdded(DealInfo {
            id: self.state.next_id(),
            symbol: params.symbol.clone(),
            volume: params.volume,
            price: None,
            profit: None,
        })));

        OrderHandle {
            order_id: id.clone(),
            position_id: Some(id),
            string_code: RETCODE_DONE.to_string(),
            message: format!("{} {} {} filled", direction, params.volume, params.symbol),
        }
    }

    fn rest_limit(&self, direction: Direction, params: &OrderParams, open_price: Decimal) -> OrderHandle {
        let id = self.state.next_id();
        self.deliver(&GatewayEvent::Trade(TradeEvent::OrderAdded(OrderInfo {
            id: id.clone(),
            symbol: params.symbol.clone(),
            volume: params.volume,
            price: Some(open_price),
        })));

        OrderHandle {
            order_id: id,
            position_id: None,
            string_code: RETCODE_DONE.to_string(),
            message: format!(
                "{} limit {} {} @ {} placed",
                direction, params.volume, params.symbol, open_price
            ),
        }
    }

    async fn market(&self, direction: Direction, params: &OrderParams) -> GatewayResult<OrderHandle> {
        self.state.record(RemoteCall::MarketOrder {
            direction,
            params: params.clone(),
        });
        self.ensure_accepting_orders()?;
        Ok(self.fill_market(direction, params))
    }

    async fn limit(
        &self,
        direction: Direction,
        params: &OrderParams,
        open_price: Decimal,
    ) -> GatewayResult<OrderHandle> {
        self.state.record(RemoteCall::LimitOrder {
            direction,
            params: params.clone(),
            open_price,
        });
        self.ensure_accepting_orders()?;
        Ok(self.rest_limit(direction, params, open_price))
    }
}

#[async_trait]
impl StreamingConnection for PaperConnection {
    fn add_listener(&self, listener: Arc<dyn SyncListener>) {
        self.listeners.lock().push(listener);
    }

    async fn connect(&self) -> GatewayResult<()> {
        self.state.record(RemoteCall::Connect);
        self.state.stall_if(|f| f.stall_connect).await;
        self.state.check(|f| f.connect.clone())?;
        self.link.lock().connected = true;
        Ok(())
    }

    async fn disconnect(&self) -> GatewayResult<()> {
        self.state.record(RemoteCall::Disconnect);
        self.state.maybe_panic(PanicPoint::Disconnect);
        self.state.stall_if(|f| f.stall_disconnect).await;
        let mut link = self.link.lock();
        link.connected = false;
        link.synchronized = false;
        Ok(())
    }

    async fn wait_synchronized(&self) -> GatewayResult<()> {
        self.state.record(RemoteCall::WaitSynchronized);
        self.ensure_connected()?;
        self.state.check(|f| f.synchronize.clone())?;

        let (suppress, unsynchronized) = {
            let faults = self.state.faults.lock();
            (faults.suppress_sync_events, faults.report_unsynchronized)
        };

        self.deliver(&GatewayEvent::SynchronizationStarted);
        self.link.lock().synchronized = !unsynchronized;
        if !suppress {
            self.deliver(&GatewayEvent::SynchronizationCompleted);
        }
        Ok(())
    }

    fn status(&self) -> GatewayResult<ConnectionStatus> {
        self.state.maybe_panic(PanicPoint::Status);
        let link = self.link.lock();
        Ok(ConnectionStatus {
            connection_status: if link.connected {
                STATUS_CONNECTED.to_string()
            } else {
                STATUS_DISCONNECTED.to_string()
            },
            connected_to_broker: link.connected,
            synchronized: link.synchronized,
        })
    }

    async fn create_market_buy_order(&self, params: &OrderParams) -> GatewayResult<OrderHandle> {
        self.market(Direction::Buy, params).await
    }

    async fn create_market_sell_order(&self, params: &OrderParams) -> GatewayResult<OrderHandle> {
        self.market(Direction::Sell, params).await
    }

    async fn create_limit_buy_order(
        &self,
        params: &OrderParams,
        open_price: Decimal,
    ) -> GatewayResult<OrderHandle> {
        self.limit(Direction::Buy, params, open_price).await
    }

    async fn create_limit_sell_order(
        &self,
        params: &OrderParams,
        open_price: Decimal,
    ) -> GatewayResult<OrderHandle> {
        self.limit(Direction::Sell, params, open_price).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn credentials() -> AccountCredentials {
        AccountCredentials::new("acc-1", "token")
    }

    fn params() -> OrderParams {
        OrderParams {
            symbol: "XAUUSD_i".to_string(),
            volume: dec!(0.01),
            stop_loss: None,
            take_profit: None,
        }
    }

    #[tokio::test]
    async fn test_stream_lifecycle_reports_health() {
        let gateway = PaperGateway::new();
        let account = gateway.account(&credentials()).await.unwrap();
        account.wait_connected().await.unwrap();

        let connection = account.streaming_connection();
        assert_eq!(connection.status().unwrap().connection_status, "DISCONNECTED");

        connection.connect().await.unwrap();
        connection.wait_synchronized().await.unwrap();
        let status = connection.status().unwrap();
        assert_eq!(status.connection_status, STATUS_CONNECTED);
        assert!(status.synchronized);

        gateway.drop_stream();
        assert!(!connection.status().unwrap().synchronized);
    }

    #[tokio::test]
    async fn test_orders_need_connected_stream() {
        let gateway = PaperGateway::new();
        let account = gateway.account(&credentials()).await.unwrap();
        let connection = account.streaming_connection();

        let err = connection.create_market_buy_order(&params()).await.unwrap_err();
        assert_eq!(err, GatewayError::NotConnected);

        connection.connect().await.unwrap();
        let handle = connection.create_market_buy_order(&params()).await.unwrap();
        assert_eq!(handle.string_code, RETCODE_DONE);
        assert!(handle.position_id.is_some());
        assert_eq!(gateway.order_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_account_fault_is_reported() {
        let gateway = PaperGateway::new();
        gateway.set_account_error(Some(GatewayError::AccountNotFound {
            account_id: "acc-1".to_string(),
            reason: "unknown".to_string(),
        }));

        assert!(gateway.account(&credentials()).await.is_err());
        assert_eq!(
            gateway.calls(),
            vec![RemoteCall::AcquireAccount {
                account_id: "acc-1".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_call_log_and_connections_stay_bounded() {
        let gateway = PaperGateway::new();
        let account = gateway.account(&credentials()).await.unwrap();

        let mut first = None;
        for _ in 0..3 {
            let connection = account.streaming_connection();
            connection.connect().await.unwrap();
            first.get_or_insert(connection);
        }
        for _ in 0..MAX_RECORDED_CALLS {
            account.wait_connected().await.unwrap();
        }

        let calls = gateway.calls();
        assert_eq!(calls.len(), MAX_RECORDED_CALLS);
        assert!(calls.iter().all(|call| *call == RemoteCall::WaitConnected));
        assert_eq!(gateway.connection_count(), 3);

        // Only the newest connection is still driven by the gateway
        gateway.drop_stream();
        let first = first.unwrap();
        assert_eq!(first.status().unwrap().connection_status, STATUS_CONNECTED);
    }
}
