//! Remote trading-account gateway collaborator
//!
//! The gateway is opaque: these traits describe only what the core needs from
//! it. Account acquisition, a connectivity wait, a streaming connection that
//! accepts listeners and pushes events, order submission and a status
//! snapshot.

pub mod listener;
pub mod paper;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use types::OrderHandle;

use crate::GatewayError;

pub use listener::{GatewayEvent, SyncListener};
pub use paper::{PaperGateway, PanicPoint, RemoteCall};

/// Result type for gateway calls
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Identity used to acquire the trading account
#[derive(Clone, PartialEq, Eq)]
pub struct AccountCredentials {
    /// Account identifier
    pub account_id: String,
    /// Credential token
    pub token: String,
}

impl AccountCredentials {
    /// Build credentials
    pub fn new(account_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            token: token.into(),
        }
    }
}

impl fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountCredentials")
            .field("account_id", &self.account_id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Status snapshot reported by a streaming connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// `CONNECTED`, `DISCONNECTED`, ...
    pub connection_status: String,
    /// Gateway to broker link is up
    pub connected_to_broker: bool,
    /// Terminal state synchronized
    pub synchronized: bool,
}

/// Parameters shared by every order submission call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderParams {
    /// Broker symbol (already remapped)
    pub symbol: String,
    /// Lot size (already resolved)
    pub volume: Decimal,
    /// Protective stop
    pub stop_loss: Option<Decimal>,
    /// Profit target
    pub take_profit: Option<Decimal>,
}

/// Entry point of the gateway: hands out account handles
#[async_trait]
pub trait TradingGateway: Send + Sync {
    /// Acquire the account handle for `credentials`
    async fn account(
        &self,
        credentials: &AccountCredentials,
    ) -> GatewayResult<Arc<dyn TradingAccount>>;
}

/// A trading account handle
#[async_trait]
pub trait TradingAccount: Send + Sync {
    /// Account identifier
    fn id(&self) -> &str;

    /// Resolve once the account is connected to the gateway
    async fn wait_connected(&self) -> GatewayResult<()>;

    /// Create a new streaming connection object (not yet connected)
    fn streaming_connection(&self) -> Arc<dyn StreamingConnection>;
}

/// Long-lived connection over which the gateway pushes account events
#[async_trait]
pub trait StreamingConnection: Send + Sync {
    /// Register a listener; must happen before [`connect`](Self::connect)
    fn add_listener(&self, listener: Arc<dyn SyncListener>);

    /// Open the stream
    async fn connect(&self) -> GatewayResult<()>;

    /// Close the stream
    async fn disconnect(&self) -> GatewayResult<()>;

    /// Resolve once the initial (or post-reconnect) synchronization finished
    async fn wait_synchronized(&self) -> GatewayResult<()>;

    /// Current health snapshot
    fn status(&self) -> GatewayResult<ConnectionStatus>;

    /// Market buy
    async fn create_market_buy_order(&self, params: &OrderParams) -> GatewayResult<OrderHandle>;

    /// Market sell
    async fn create_market_sell_order(&self, params: &OrderParams) -> GatewayResult<OrderHandle>;

    /// Pending buy limit at `open_price`
    async fn create_limit_buy_order(
        &self,
        params: &OrderParams,
        open_price: Decimal,
    ) -> GatewayResult<OrderHandle>;

    /// Pending sell limit at `open_price`
    async fn create_limit_sell_order(
        &self,
        params: &OrderParams,
        open_price: Decimal,
    ) -> GatewayResult<OrderHandle>;
}
