//! Order requests and the handles the gateway returns for them

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Open or add to a long position
    Buy,
    /// Open or add to a short position
    Sell,
}

impl Direction {
    /// Upper-case label used in logs and notifications
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returned when a signal action is neither buy nor sell
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown trade direction: {0:?}")]
pub struct ParseDirectionError(pub String);

impl FromStr for Direction {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Direction::Buy),
            "sell" => Ok(Direction::Sell),
            _ => Err(ParseDirectionError(s.to_string())),
        }
    }
}

/// A request to place one order
///
/// `volume` is optional and resolved against the configured default lot at
/// submission time. `limit_price` is only meaningful for pending orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Canonical instrument symbol, before broker remapping
    pub symbol: String,
    /// Buy or sell
    pub direction: Direction,
    /// Lot size; `None` means "use the configured default"
    #[serde(default)]
    pub volume: Option<Decimal>,
    /// Protective stop
    #[serde(default)]
    pub stop_loss: Option<Decimal>,
    /// Profit target
    #[serde(default)]
    pub take_profit: Option<Decimal>,
    /// Open price for a pending limit order
    #[serde(default)]
    pub limit_price: Option<Decimal>,
}

impl OrderRequest {
    /// Market order with no volume, stop or target
    pub fn market(symbol: impl Into<String>, direction: Direction) -> Self {
        Self {
            symbol: symbol.into(),
            direction,
            volume: None,
            stop_loss: None,
            take_profit: None,
            limit_price: None,
        }
    }

    /// Pending limit order at `price`
    pub fn limit(symbol: impl Into<String>, direction: Direction, price: Decimal) -> Self {
        Self {
            limit_price: Some(price),
            ..Self::market(symbol, direction)
        }
    }

    /// Set an explicit volume
    pub fn with_volume(mut self, volume: Decimal) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Set the protective stop
    pub fn with_stop_loss(mut self, stop_loss: Decimal) -> Self {
        self.stop_loss = Some(stop_loss);
        self
    }

    /// Set the profit target
    pub fn with_take_profit(mut self, take_profit: Decimal) -> Self {
        self.take_profit = Some(take_profit);
        self
    }

    /// Volume to submit: the explicit one when positive, else `default_lot`
    pub fn resolved_volume(&self, default_lot: Decimal) -> Decimal {
        self.volume
            .filter(|volume| *volume > Decimal::ZERO)
            .unwrap_or(default_lot)
    }
}

/// Gateway acknowledgement of a submitted order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderHandle {
    /// Gateway order identifier
    pub order_id: String,
    /// Position identifier when the order opened a position immediately
    pub position_id: Option<String>,
    /// Gateway result code (e.g. `TRADE_RETCODE_DONE`)
    pub string_code: String,
    /// Human-readable gateway message
    pub message: String,
}
