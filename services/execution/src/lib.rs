//! # Signal Execution Service
//!
//! ## Purpose
//!
//! Keeps one live streaming session to a remote trading-account gateway and
//! places orders through it only while that session is verified healthy and
//! synchronized. Loss of health is detected by a periodic watchdog and
//! repaired by a single, serialized reconnect.
//!
//! ## Integration Points
//!
//! - **Gateway**: [`gateway::TradingGateway`] and friends, an opaque
//!   collaborator; [`gateway::PaperGateway`] simulates it in-process
//! - **Signals**: [`intake::SignalIntake`] takes already-parsed
//!   [`types::TradeSignal`]s from any message source
//! - **Notifications**: [`notifier::Notifier`] receives signal, order and
//!   closed-trade notices
//! - **Configuration**: [`config::ExecutorConfig`] from environment variables
//!
//! ## Architecture Role
//!
//! ```text
//!   signals ──► SignalIntake ──► OrderGateway ──(ready?)──► StreamingConnection
//!                                     │                          │ events
//!                                  Session ◄──── EventSink ◄─────┘
//!                                     ▲
//!   HealthWatchdog ──(unhealthy)──► ReconnectCoordinator ──► StreamSession
//! ```
//!
//! ## Readiness
//!
//! A session is ready only after the gateway reported synchronization and a
//! post-sync health check passed on the same connection. Orders attempted
//! while not ready fail with [`ExecutionError::NotReady`] and never reach
//! the gateway.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod gateway;
pub mod intake;
pub mod notifier;
pub mod orders;
pub mod reconnect;
pub mod service;
pub mod session;
pub mod sink;
pub mod watchdog;

pub use config::{ExecutorConfig, SignalOrderMode};
pub use error::{ExecutionError, GatewayError, Result};
pub use gateway::{
    AccountCredentials, ConnectionStatus, GatewayEvent, OrderParams, PaperGateway,
    StreamingConnection, SyncListener, TradingAccount, TradingGateway,
};
pub use intake::SignalIntake;
pub use notifier::{ChannelNotifier, Notification, Notifier, TracingNotifier};
pub use orders::OrderGateway;
pub use reconnect::{ReconnectCoordinator, ReconnectOutcome, ReconnectStats};
pub use service::ExecutionService;
pub use session::{Session, SessionState, StreamSession};
pub use sink::EventSink;
pub use watchdog::{HealthWatchdog, TickOutcome, WatchdogHandle, WatchdogStats};
