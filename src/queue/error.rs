//! Broker Error Types
//!
//! Failures reported by a `MessageBroker` implementation. The routing core
//! wraps these in `RoutingError` before they reach callers.

use crate::core::error_handling::ContextualError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BrokerError {
    #[error("Endpoint not found: {endpoint}")]
    EndpointNotFound { endpoint: String },

    #[error("No endpoint bound for topic '{topic}'")]
    Unroutable { topic: String },

    #[error("Endpoint '{endpoint}' is full (max depth: {max_depth})")]
    QueueFull { endpoint: String, max_depth: usize },

    #[error("Unknown delivery tag {delivery_tag} on endpoint '{endpoint}'")]
    UnknownDelivery { endpoint: String, delivery_tag: u64 },

    #[error("Broker connection is closed")]
    Closed,

    #[error("Message encoding failed: {message}")]
    Encoding { message: String },

    #[error("Transport failure: {message}")]
    Transport { message: String },
}

impl ContextualError for BrokerError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}

/// Result type for broker operations
pub type BrokerResult<T> = Result<T, BrokerError>;
