//! # Execution Types
//!
//! Plain data model shared by the signal execution service.
//!
//! ## Design Philosophy
//!
//! - **Immutable values**: orders, events and health snapshots are constructed
//!   once and never mutated, so they cross task boundaries without locking
//! - **No precision loss**: prices, volumes and PnL are [`rust_decimal::Decimal`]
//! - **Gateway neutral**: nothing here knows how the remote gateway talks
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{Direction, OrderRequest, SymbolMap};
//!
//! let request = OrderRequest::market("XAUUSD", Direction::Buy);
//! let symbols = SymbolMap::default();
//!
//! assert_eq!(symbols.resolve(&request.symbol), "XAUUSD_i");
//! assert!(request.volume.is_none());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod events;
pub mod health;
pub mod order;
pub mod signal;
pub mod symbol;

pub use events::{
    ClosedTrade, DealInfo, OrderInfo, PositionInfo, TradeEvent, TradeEventKind, TradeOutcome,
};
pub use health::HealthStatus;
pub use order::{Direction, OrderHandle, OrderRequest, ParseDirectionError};
pub use signal::TradeSignal;
pub use symbol::SymbolMap;

/// Connection status string the gateway reports for a live stream
pub const STATUS_CONNECTED: &str = "CONNECTED";
