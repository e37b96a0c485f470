//! Readiness-gated order placement
//!
//! Every call checks readiness first. A session that is not ready rejects
//! locally and the gateway is never contacted. Symbols are remapped and
//! missing volumes defaulted before submission.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};
use types::{Direction, OrderHandle, OrderRequest, SymbolMap};

use crate::gateway::{GatewayResult, OrderParams, StreamingConnection};
use crate::notifier::{Notification, Notifier};
use crate::session::Session;
use crate::{ExecutionError, Result};

/// Order entry point
pub struct OrderGateway {
    session: Arc<Session>,
    symbols: SymbolMap,
    default_lot: Decimal,
    notifier: Arc<dyn Notifier>,
}

impl OrderGateway {
    /// Create the order gateway
    pub fn new(
        session: Arc<Session>,
        symbols: SymbolMap,
        default_lot: Decimal,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            session,
            symbols,
            default_lot,
            notifier,
        }
    }

    /// Submit a market order
    pub async fn place_market_order(&self, request: &OrderRequest) -> Result<OrderHandle> {
        let connection = self.ready_connection(request)?;
        let params = self.params(request);

        info!(
            "📤 Market {} {} {} (sl: {:?}, tp: {:?})",
            request.direction, params.volume, params.symbol, params.stop_loss, params.take_profit
        );

        let submitted = match request.direction {
            Direction::Buy => connection.create_market_buy_order(&params).await,
            Direction::Sell => connection.create_market_sell_order(&params).await,
        };
        self.settle(submitted, params.symbol, None)
    }

    /// Submit a pending limit order at `request.limit_price`
    pub async fn place_limit_order(&self, request: &OrderRequest) -> Result<OrderHandle> {
        let connection = self.ready_connection(request)?;
        let price = request.limit_price.ok_or_else(|| {
            ExecutionError::InvalidOrder(format!("limit order for {} has no price", request.symbol))
        })?;
        let params = self.params(request);

        info!(
            "📤 Limit {} {} {} @ {} (sl: {:?}, tp: {:?})",
            request.direction, params.volume, params.symbol, price, params.stop_loss, params.take_profit
        );

        let submitted = match request.direction {
            Direction::Buy => connection.create_limit_buy_order(&params, price).await,
            Direction::Sell => connection.create_limit_sell_order(&params, price).await,
        };
        self.settle(submitted, params.symbol, Some(price))
    }

    fn ready_connection(&self, request: &OrderRequest) -> Result<Arc<dyn StreamingConnection>> {
        self.session.ready_connection().ok_or_else(|| {
            warn!(
                "Session {} not ready, {} {} order not sent",
                self.session.state(),
                request.direction,
                request.symbol
            );
            ExecutionError::NotReady
        })
    }

    fn params(&self, request: &OrderRequest) -> OrderParams {
        OrderParams {
            symbol: self.symbols.resolve(&request.symbol).to_string(),
            volume: request.resolved_volume(self.default_lot),
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
        }
    }

    fn settle(
        &self,
        submitted: GatewayResult<OrderHandle>,
        symbol: String,
        price: Option<Decimal>,
    ) -> Result<OrderHandle> {
        match submitted {
            Ok(handle) => {
                info!(
                    "✅ Order {} accepted for {}: {} {}",
                    handle.order_id, symbol, handle.string_code, handle.message
                );
                self.notifier.notify(Notification::OrderPlaced {
                    symbol,
                    price,
                    order_id: handle.order_id.clone(),
                });
                Ok(handle)
            }
            Err(e) => {
                warn!("❌ Order for {} rejected: {}", symbol, e);
                Err(ExecutionError::Rejected {
                    symbol,
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{AccountCredentials, PaperGateway, RemoteCall};
    use crate::notifier::{ChannelNotifier, TracingNotifier};
    use crate::session::StreamSession;
    use crate::sink::EventSink;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    async fn ready(gateway: &PaperGateway) -> Arc<Session> {
        let session = Arc::new(Session::new(AccountCredentials::new("acc-1", "token")));
        let sink = Arc::new(EventSink::new(session.clone(), Arc::new(TracingNotifier)));
        let stream = StreamSession::new(
            Arc::new(gateway.clone()),
            session.clone(),
            sink,
            Duration::from_secs(60),
        );
        stream.connect().await.unwrap();
        session
    }

    fn orders(session: Arc<Session>) -> OrderGateway {
        OrderGateway::new(session, SymbolMap::default(), dec!(0.01), Arc::new(TracingNotifier))
    }

    #[tokio::test]
    async fn test_not_ready_makes_no_remote_call() {
        let gateway = PaperGateway::new();
        let session = ready(&gateway).await;
        let orders = orders(session.clone());

        // The link stays up; only the session gate stands in the way
        session.mark_degraded();
        assert!(session.connection().is_some());

        let err = orders
            .place_market_order(&OrderRequest::market("XAUUSD", Direction::Buy))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::NotReady));

        let err = orders
            .place_limit_order(&OrderRequest::limit("XAUUSD", Direction::Buy, dec!(2300)))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::NotReady));

        assert!(gateway.order_calls().is_empty());
        assert_eq!(gateway.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_market_order_remaps_and_defaults_volume() {
        let gateway = PaperGateway::new();
        let orders = orders(ready(&gateway).await);

        let handle = orders
            .place_market_order(
                &OrderRequest::market("XAUUSD", Direction::Sell).with_volume(Decimal::ZERO),
            )
            .await
            .unwrap();

        assert!(handle.position_id.is_some());
        assert_eq!(
            gateway.order_calls(),
            vec![RemoteCall::MarketOrder {
                direction: Direction::Sell,
                params: OrderParams {
                    symbol: "XAUUSD_i".to_string(),
                    volume: dec!(0.01),
                    stop_loss: None,
                    take_profit: None,
                },
            }]
        );
    }

    #[tokio::test]
    async fn test_limit_order_passes_price() {
        let gateway = PaperGateway::new();
        let orders = orders(ready(&gateway).await);

        orders
            .place_limit_order(
                &OrderRequest::limit("EURUSD", Direction::Buy, dec!(1.0850))
                    .with_volume(dec!(0.2))
                    .with_stop_loss(dec!(1.0800)),
            )
            .await
            .unwrap();

        match &gateway.order_calls()[..] {
            [RemoteCall::LimitOrder {
                direction,
                params,
                open_price,
            }] => {
                assert_eq!(*direction, Direction::Buy);
                assert_eq!(params.symbol, "EURUSD");
                assert_eq!(params.volume, dec!(0.2));
                assert_eq!(params.stop_loss, Some(dec!(1.0800)));
                assert_eq!(*open_price, dec!(1.0850));
            }
            other => panic!("unexpected calls {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_limit_without_price_is_invalid() {
        let gateway = PaperGateway::new();
        let orders = orders(ready(&gateway).await);

        let err = orders
            .place_limit_order(&OrderRequest::market("XAUUSD", Direction::Buy))
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutionError::InvalidOrder(_)));
        assert!(gateway.order_calls().is_empty());
    }

    #[tokio::test]
    async fn test_gateway_rejection_is_reported() {
        let gateway = PaperGateway::new();
        let session = ready(&gateway).await;
        let (notifier, mut rx) = ChannelNotifier::channel();
        let orders = OrderGateway::new(session, SymbolMap::default(), dec!(0.01), Arc::new(notifier));
        gateway.reject_orders(Some("not enough money".to_string()));

        let err = orders
            .place_market_order(&OrderRequest::market("XAUUSD", Direction::Buy))
            .await
            .unwrap_err();

        match err {
            ExecutionError::Rejected { symbol, reason } => {
                assert_eq!(symbol, "XAUUSD_i");
                assert!(reason.contains("not enough money"));
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_accepted_order_notifies() {
        let gateway = PaperGateway::new();
        let session = ready(&gateway).await;
        let (notifier, mut rx) = ChannelNotifier::channel();
        let orders = OrderGateway::new(session, SymbolMap::default(), dec!(0.01), Arc::new(notifier));

        let handle = orders
            .place_market_order(&OrderRequest::market("XAUUSD", Direction::Buy))
            .await
            .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            Notification::OrderPlaced {
                symbol: "XAUUSD_i".to_string(),
                price: None,
                order_id: handle.order_id,
            }
        );
    }
}
