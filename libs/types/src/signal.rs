//! Parsed trading signals handed over by the message source

use crate::order::{Direction, OrderRequest, ParseDirectionError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A signal already extracted from a channel message
///
/// The core makes no assumption about how the fields were parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSignal {
    /// Canonical symbol, e.g. `XAUUSD`
    pub symbol: String,
    /// `BUY` or `SELL`
    pub action: String,
    /// Suggested entry price
    pub entry: Decimal,
    /// First profit target
    pub target: Decimal,
    /// Protective stop
    #[serde(alias = "stopLoss")]
    pub stop_loss: Decimal,
}

impl TradeSignal {
    /// Direction encoded in `action`
    pub fn direction(&self) -> Result<Direction, ParseDirectionError> {
        self.action.parse()
    }

    /// Market order carrying the signal's stop and target
    pub fn to_market_request(&self) -> Result<OrderRequest, ParseDirectionError> {
        Ok(OrderRequest::market(self.symbol.clone(), self.direction()?)
            .with_stop_loss(self.stop_loss)
            .with_take_profit(self.target))
    }

    /// Pending limit order at the signal's entry price
    pub fn to_limit_request(&self) -> Result<OrderRequest, ParseDirectionError> {
        Ok(
            OrderRequest::limit(self.symbol.clone(), self.direction()?, self.entry)
                .with_stop_loss(self.stop_loss)
                .with_take_profit(self.target),
        )
    }
}
