//! Public API for the queue layer
//!
//! External modules should import from here rather than directly from
//! internal modules.

// Queue configuration and policy
pub use crate::queue::config_cache::{
    policy_for, QueueConfiguration, QueueConfigurationCache, QueuePolicy, DEFAULT_MESSAGE_TTL,
    DEFAULT_POLICY,
};

// Broker boundary and in-memory implementation
pub use crate::queue::broker::{
    Delivery, Envelope, MessageBroker, CANONICAL_KEY_HEADER, SCHEMA_HEADER,
};
pub use crate::queue::memory::{
    DeadLetter, DeadLetterReason, EndpointStats, InMemoryBroker, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_REDELIVERIES,
};

// Publishing and consuming
pub use crate::queue::consumer::{
    CommandConsumer, CommandHandler, ConsumerSummary, HandlerRegistry,
};
pub use crate::queue::publisher::CommandPublisher;

// Error handling
pub use crate::queue::error::{BrokerError, BrokerResult};
