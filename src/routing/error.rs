//! Routing Error Types
//!
//! Every failure raised by the routing core propagates to the immediate
//! caller. Nothing here is logged-and-swallowed.

use crate::core::error_handling::ContextualError;
use crate::queue::api::BrokerError;
use crate::routing::process_type::ProcessType;
use uuid::Uuid;

/// Error raised by a business handler
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// Malformed routing context or command; rejected at construction
    #[error("Invalid routing context: {message}")]
    InvalidContext { message: String },

    /// Non-positive worker count, unknown strategy or missing instance id; fatal to startup
    #[error("Invalid topology configuration: {message}")]
    InvalidTopologyConfig { message: String },

    /// The broker rejected or failed a publish
    #[error("Failed to publish with routing key '{routing_key}': {source}")]
    PublishFailure {
        routing_key: String,
        #[source]
        source: BrokerError,
    },

    /// A business handler failed; the broker's redelivery policy decides what happens next
    #[error("Handler failed for command {command_id} ({process_type}): {source}")]
    ConsumeFailure {
        command_id: Uuid,
        process_type: ProcessType,
        #[source]
        source: HandlerError,
    },

    /// Broker failure outside of publish (receive, ack, reject, declare)
    #[error("Broker {operation} failed: {source}")]
    Broker {
        operation: &'static str,
        #[source]
        source: BrokerError,
    },

    /// Cancellation was observed before the message reached the transport
    #[error("Operation cancelled before hand-off to the broker")]
    Cancelled,
}

impl RoutingError {
    pub fn invalid_context(message: impl Into<String>) -> Self {
        Self::InvalidContext {
            message: message.into(),
        }
    }

    pub fn invalid_topology(message: impl Into<String>) -> Self {
        Self::InvalidTopologyConfig {
            message: message.into(),
        }
    }

    pub fn broker(operation: &'static str, source: BrokerError) -> Self {
        Self::Broker { operation, source }
    }
}

impl ContextualError for RoutingError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            RoutingError::InvalidContext { .. } | RoutingError::InvalidTopologyConfig { .. }
        )
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            RoutingError::InvalidContext { message }
            | RoutingError::InvalidTopologyConfig { message } => Some(message),
            _ => None,
        }
    }
}

/// Result type for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;
