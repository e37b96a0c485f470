//! Error types for the execution service

use thiserror::Error;

/// Result type alias for execution operations
pub type Result<T> = std::result::Result<T, ExecutionError>;

/// Failures reported by the remote gateway collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// No account exists for the identifier, or the token was refused
    #[error("Account {account_id} could not be acquired: {reason}")]
    AccountNotFound {
        /// Account identifier that was requested
        account_id: String,
        /// Gateway explanation
        reason: String,
    },

    /// Transport or connectivity failure
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A bounded wait ran out
    #[error("Timed out waiting for {operation} after {timeout_ms}ms")]
    Timeout {
        /// What was being waited for
        operation: &'static str,
        /// Budget that was exceeded
        timeout_ms: u64,
    },

    /// The connection handle is gone or was never connected
    #[error("Streaming connection is not connected")]
    NotConnected,

    /// The gateway refused an order
    #[error("Order rejected by gateway: {0}")]
    Rejected(String),
}

/// Main error type of the execution core
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The account could not be acquired or never reached connected state
    /// during startup. The only error that leaves the core.
    #[error("Initial connect failed for account {account_id}: {source}")]
    InitialConnect {
        /// Account identifier
        account_id: String,
        /// Underlying gateway failure
        #[source]
        source: GatewayError,
    },

    /// Session is not verified healthy and synchronized
    #[error("Session not ready, order not sent")]
    NotReady,

    /// The gateway declined the order
    #[error("Order for {symbol} rejected: {reason}")]
    Rejected {
        /// Broker symbol of the rejected order
        symbol: String,
        /// Gateway error text
        reason: String,
    },

    /// The request cannot be sent as given
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Collaborator failure outside order placement
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl GatewayError {
    /// Whether a later attempt can reasonably succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            GatewayError::ConnectionFailed(_)
                | GatewayError::Timeout { .. }
                | GatewayError::NotConnected
        )
    }
}

impl ExecutionError {
    /// Whether the process cannot continue without a session
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ExecutionError::InitialConnect { .. } | ExecutionError::Configuration(_)
        )
    }

    /// Rejections local to this process: no remote call was made
    pub fn is_local_rejection(&self) -> bool {
        matches!(
            self,
            ExecutionError::NotReady | ExecutionError::InvalidOrder(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_connect_is_fatal() {
        let err = ExecutionError::InitialConnect {
            account_id: "acc-1".to_string(),
            source: GatewayError::Timeout {
                operation: "account connection",
                timeout_ms: 60_000,
            },
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("acc-1"));
    }

    #[test]
    fn test_not_ready_is_local_and_not_fatal() {
        assert!(ExecutionError::NotReady.is_local_rejection());
        assert!(!ExecutionError::NotReady.is_fatal());
    }

    #[test]
    fn test_rejection_is_not_recoverable() {
        assert!(!GatewayError::Rejected("no money".to_string()).is_recoverable());
        assert!(GatewayError::NotConnected.is_recoverable());
    }
}
