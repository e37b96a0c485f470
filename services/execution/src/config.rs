//! Configuration module for the execution service
//!
//! Provides environment-based configuration, read once at construction.

use rust_decimal::Decimal;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use types::SymbolMap;

use crate::{ExecutionError, Result};

/// Service defaults
pub mod defaults {
    use rust_decimal::Decimal;

    /// Lot size used when a request carries no volume (0.01)
    pub const DEFAULT_LOT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

    /// Watchdog poll interval (seconds)
    pub const WATCHDOG_INTERVAL_SECS: u64 = 30;

    /// Pause between dropping a stale stream and reconnecting (seconds)
    pub const RECONNECT_COOLDOWN_SECS: u64 = 10;

    /// Budget for account connectivity and synchronization waits (seconds)
    pub const CONNECT_TIMEOUT_SECS: u64 = 60;
}

/// How a parsed signal is turned into an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalOrderMode {
    /// Execute immediately at market
    #[default]
    Market,
    /// Rest a pending order at the signal's entry price
    Limit,
}

impl FromStr for SignalOrderMode {
    type Err = ExecutionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "market" => Ok(SignalOrderMode::Market),
            "limit" => Ok(SignalOrderMode::Limit),
            other => Err(ExecutionError::Configuration(format!(
                "SIGNAL_ORDER_MODE must be 'market' or 'limit', got '{}'",
                other
            ))),
        }
    }
}

/// Configuration consumed by the execution core
#[derive(Clone)]
pub struct ExecutorConfig {
    /// Gateway credential token
    pub api_token: String,

    /// Trading account identifier
    pub account_id: String,

    /// Lot size applied when a request has no volume
    pub default_lot: Decimal,

    /// Watchdog poll interval
    pub watchdog_interval: Duration,

    /// Cooldown between disconnecting a stale stream and reconnecting
    pub reconnect_cooldown: Duration,

    /// Upper bound on connectivity and synchronization waits
    pub connect_timeout: Duration,

    /// Canonical to broker symbol translation
    pub symbol_map: SymbolMap,

    /// Market or limit execution of incoming signals
    pub order_mode: SignalOrderMode,
}

impl fmt::Debug for ExecutorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorConfig")
            .field("api_token", &"<redacted>")
            .field("account_id", &self.account_id)
            .field("default_lot", &self.default_lot)
            .field("watchdog_interval", &self.watchdog_interval)
            .field("reconnect_cooldown", &self.reconnect_cooldown)
            .field("connect_timeout", &self.connect_timeout)
            .field("symbol_map", &self.symbol_map)
            .field("order_mode", &self.order_mode)
            .finish()
    }
}

impl ExecutorConfig {
    /// Config with defaults for everything but the credentials
    pub fn new(api_token: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            account_id: account_id.into(),
            default_lot: defaults::DEFAULT_LOT,
            watchdog_interval: Duration::from_secs(defaults::WATCHDOG_INTERVAL_SECS),
            reconnect_cooldown: Duration::from_secs(defaults::RECONNECT_COOLDOWN_SECS),
            connect_timeout: Duration::from_secs(defaults::CONNECT_TIMEOUT_SECS),
            symbol_map: SymbolMap::default(),
            order_mode: SignalOrderMode::Market,
        }
    }

    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ExecutionError::Configuration(format!("{} is not set", key)))
        };

        let mut config = Self::new(required("META_API_TOKEN")?, required("META_API_ACCOUNT_ID")?);

        if let Some(lot) = lookup("DEFAULT_LOT") {
            config.default_lot = Decimal::from_str(lot.trim()).map_err(|e| {
                ExecutionError::Configuration(format!("DEFAULT_LOT '{}': {}", lot, e))
            })?;
        }

        if let Some(secs) = parse_secs(&lookup, "WATCHDOG_INTERVAL_SECS")? {
            config.watchdog_interval = secs;
        }
        if let Some(secs) = parse_secs(&lookup, "RECONNECT_COOLDOWN_SECS")? {
            config.reconnect_cooldown = secs;
        }
        if let Some(secs) = parse_secs(&lookup, "CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = secs;
        }

        if let Some(raw) = lookup("SYMBOL_MAP") {
            config.symbol_map = SymbolMap::default().merged(parse_symbol_map(&raw)?);
        }

        if let Some(mode) = lookup("SIGNAL_ORDER_MODE") {
            config.order_mode = mode.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_token.trim().is_empty() {
            return Err(ExecutionError::Configuration(
                "API token cannot be empty".to_string(),
            ));
        }

        if self.account_id.trim().is_empty() {
            return Err(ExecutionError::Configuration(
                "Account id cannot be empty".to_string(),
            ));
        }

        if self.default_lot <= Decimal::ZERO {
            return Err(ExecutionError::Configuration(format!(
                "Default lot must be positive, got {}",
                self.default_lot
            )));
        }

        if self.watchdog_interval.is_zero() {
            return Err(ExecutionError::Configuration(
                "Watchdog interval must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_secs<F>(lookup: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| ExecutionError::Configuration(format!("{} '{}': {}", key, raw, e)))
        })
        .transpose()
}

/// Parse `XAUUSD=XAUUSD_i,US30=DJ30`
fn parse_symbol_map(raw: &str) -> Result<SymbolMap> {
    let mut pairs = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match entry.split_once('=') {
            Some((canonical, broker)) if !canonical.trim().is_empty() && !broker.trim().is_empty() => {
                pairs.push((canonical.trim().to_string(), broker.trim().to_string()));
            }
            _ => {
                return Err(ExecutionError::Configuration(format!(
                    "SYMBOL_MAP entry '{}' is not CANONICAL=BROKER",
                    entry
                )))
            }
        }
    }
    Ok(SymbolMap::from_pairs(pairs))
}
