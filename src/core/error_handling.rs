//! Generic error handling utilities
//!
//! Provides unified error reporting across the routing, queue and topology
//! error types while keeping configuration mistakes readable for operators.

/// Trait for errors that can distinguish between user-actionable and system errors
///
/// User-actionable errors (a malformed routing context, a bad worker count in
/// the configuration file) are shown verbatim. System errors (broker transport
/// failures, handler failures) are reported with generic context and the
/// detail is only emitted at debug level.
///
/// When `is_user_actionable()` returns `true`, `user_message()` must return
/// `Some(message)`; when it returns `false`, `user_message()` returns `None`.
pub trait ContextualError: std::error::Error {
    /// Returns true if this error carries a message the operator can act on directly
    fn is_user_actionable(&self) -> bool;

    /// Returns the specific user message if this is a user-actionable error
    fn user_message(&self) -> Option<&str>;
}

/// Log errors with appropriate detail level based on error specificity
///
/// # Examples
/// ```rust,no_run
/// # use psprouter::core::error_handling::log_error_with_context;
/// # use psprouter::routing::api::RoutingError;
/// let err = RoutingError::invalid_topology("worker count for validation must be positive");
/// log_error_with_context(&err, "Topology setup");
/// // Logs: "FATAL: worker count for validation must be positive"
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    match error.user_message() {
        Some(user_msg) if error.is_user_actionable() => log::error!("FATAL: {}", user_msg),
        _ => log::error!("FATAL: {}", operation_context),
    }
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::api::BrokerError;
    use crate::routing::api::RoutingError;

    #[test]
    fn test_invalid_context_is_user_actionable() {
        let error = RoutingError::invalid_context("client must not be empty");

        assert!(error.is_user_actionable());
        assert_eq!(error.user_message(), Some("client must not be empty"));
    }

    #[test]
    fn test_publish_failure_uses_generic_context() {
        let error = RoutingError::PublishFailure {
            routing_key: "firma.client7.validation".to_string(),
            source: BrokerError::Transport {
                message: "connection reset".to_string(),
            },
        };

        assert!(!error.is_user_actionable());
        assert_eq!(error.user_message(), None);
        // Must not panic for either branch
        log_error_with_context(&error, "Publishing command");
    }
}
