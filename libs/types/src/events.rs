//! Trade lifecycle events pushed by the gateway

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pending or historical order as reported by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderInfo {
    /// Gateway order id
    pub id: String,
    /// Broker symbol
    pub symbol: String,
    /// Lot size
    pub volume: Decimal,
    /// Open price, absent for market orders still in flight
    pub price: Option<Decimal>,
}

/// Open or closed position as reported by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionInfo {
    /// Gateway position id
    pub id: String,
    /// Broker symbol
    pub symbol: String,
    /// Lot size
    pub volume: Decimal,
    /// Open price
    pub price: Option<Decimal>,
    /// Profit booked so far
    pub realized_profit: Option<Decimal>,
    /// Mark-to-market profit
    pub unrealized_profit: Option<Decimal>,
}

/// Executed deal as reported by the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealInfo {
    /// Gateway deal id
    pub id: String,
    /// Broker symbol
    pub symbol: String,
    /// Lot size
    pub volume: Decimal,
    /// Execution price
    pub price: Option<Decimal>,
    /// Profit attributed to the deal
    pub profit: Option<Decimal>,
}

/// Trade lifecycle notification, consumed once and not retained
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum TradeEvent {
    /// A pending order was placed
    OrderAdded(OrderInfo),
    /// A pending order changed
    OrderUpdated(OrderInfo),
    /// A pending order was filled, cancelled or expired
    OrderRemoved(OrderInfo),
    /// A position was opened
    PositionAdded(PositionInfo),
    /// A position changed (price, SL/TP, partial close)
    PositionUpdated(PositionInfo),
    /// A position was closed
    PositionRemoved(PositionInfo),
    /// A deal was executed
    DealAdded(DealInfo),
}

/// Discriminant of [`TradeEvent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeEventKind {
    /// See [`TradeEvent::OrderAdded`]
    OrderAdded,
    /// See [`TradeEvent::OrderUpdated`]
    OrderUpdated,
    /// See [`TradeEvent::OrderRemoved`]
    OrderRemoved,
    /// See [`TradeEvent::PositionAdded`]
    PositionAdded,
    /// See [`TradeEvent::PositionUpdated`]
    PositionUpdated,
    /// See [`TradeEvent::PositionRemoved`]
    PositionRemoved,
    /// See [`TradeEvent::DealAdded`]
    DealAdded,
}

impl TradeEvent {
    /// Event discriminant
    pub fn kind(&self) -> TradeEventKind {
        match self {
            TradeEvent::OrderAdded(_) => TradeEventKind::OrderAdded,
            TradeEvent::OrderUpdated(_) => TradeEventKind::OrderUpdated,
            TradeEvent::OrderRemoved(_) => TradeEventKind::OrderRemoved,
            TradeEvent::PositionAdded(_) => TradeEventKind::PositionAdded,
            TradeEvent::PositionUpdated(_) => TradeEventKind::PositionUpdated,
            TradeEvent::PositionRemoved(_) => TradeEventKind::PositionRemoved,
            TradeEvent::DealAdded(_) => TradeEventKind::DealAdded,
        }
    }

    /// Broker symbol the event refers to
    pub fn symbol(&self) -> &str {
        match self {
            TradeEvent::OrderAdded(order)
            | TradeEvent::OrderUpdated(order)
            | TradeEvent::OrderRemoved(order) => &order.symbol,
            TradeEvent::PositionAdded(position)
            | TradeEvent::PositionUpdated(position)
            | TradeEvent::PositionRemoved(position) => &position.symbol,
            TradeEvent::DealAdded(deal) => &deal.symbol,
        }
    }
}

/// Sign of a closed trade's PnL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeOutcome {
    /// PnL at or above zero
    Profit,
    /// PnL below zero
    Loss,
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeOutcome::Profit => f.write_str("PROFIT"),
            TradeOutcome::Loss => f.write_str("LOSS"),
        }
    }
}

/// Result of a position that the gateway reported as removed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    /// Broker symbol
    pub symbol: String,
    /// Realized PnL after the fallback chain
    pub pnl: Decimal,
    /// Profit or loss
    pub outcome: TradeOutcome,
}

impl ClosedTrade {
    /// Realized profit when present and non-zero, else unrealized, else zero
    pub fn from_position(position: &PositionInfo) -> Self {
        let pnl = position
            .realized_profit
            .filter(|profit| !profit.is_zero())
            .or(position.unrealized_profit)
            .unwrap_or(Decimal::ZERO);

        let outcome = if pnl >= Decimal::ZERO {
            TradeOutcome::Profit
        } else {
            TradeOutcome::Loss
        };

        Self {
            symbol: position.symbol.clone(),
            pnl,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn position(realized: Option<Decimal>, unrealized: Option<Decimal>) -> PositionInfo {
        PositionInfo {
            id: "42".to_string(),
            symbol: "XAUUSD_i".to_string(),
            volume: dec!(0.01),
            price: Some(dec!(2350.10)),
            realized_profit: realized,
            unrealized_profit: unrealized,
        }
    }

    #[test]
    fn test_zero_realized_falls_back_to_unrealized() {
        let closed = ClosedTrade::from_position(&position(Some(dec!(0)), Some(dec!(5.0))));
        assert_eq!(closed.pnl, dec!(5.0));
        assert_eq!(closed.outcome, TradeOutcome::Profit);
    }

    #[test]
    fn test_negative_realized_ignores_unrealized() {
        let closed = ClosedTrade::from_position(&position(Some(dec!(-2.0)), Some(dec!(7.5))));
        assert_eq!(closed.pnl, dec!(-2.0));
        assert_eq!(closed.outcome, TradeOutcome::Loss);
    }

    #[test]
    fn test_no_profit_fields_is_breakeven_profit() {
        let closed = ClosedTrade::from_position(&position(None, None));
        assert_eq!(closed.pnl, Decimal::ZERO);
        assert_eq!(closed.outcome, TradeOutcome::Profit);
    }

    #[test]
    fn test_event_kind_and_symbol() {
        let event = TradeEvent::PositionRemoved(position(None, None));
        assert_eq!(event.kind(), TradeEventKind::PositionRemoved);
        assert_eq!(event.symbol(), "XAUUSD_i");
    }
}
