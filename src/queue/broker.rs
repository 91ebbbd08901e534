//! Broker boundary
//!
//! The routing core treats the transport as a topic-exchange pub/sub
//! substrate: it declares endpoints with bind patterns, publishes
//! `(topic, envelope)` pairs and consumes deliveries with explicit
//! acknowledgement. `InMemoryBroker` is the bundled implementation.

use crate::queue::error::BrokerResult;
use crate::topology::api::EndpointSpec;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

/// Header carrying the routing schema version
pub const SCHEMA_HEADER: &str = "x-routing-schema";

/// Header carrying the canonical routing key when the wire topic differs
pub const CANONICAL_KEY_HEADER: &str = "x-canonical-routing-key";

/// Message as handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Topic the broker matches against bind patterns
    pub routing_key: String,
    pub correlation_id: Uuid,
    pub message_type: String,
    pub priority: u8,
    pub expiration: Option<Duration>,
    pub headers: BTreeMap<String, String>,
    pub body: Vec<u8>,
    pub published_at: DateTime<Utc>,
}

impl Envelope {
    /// True once the envelope has outlived its expiration at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiration {
            Some(ttl) => match chrono::Duration::from_std(ttl) {
                Ok(ttl) => now - self.published_at > ttl,
                Err(_) => false,
            },
            None => false,
        }
    }
}

/// One delivery of an envelope to an endpoint consumer
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub delivery_tag: u64,
    pub endpoint: String,
    /// Number of earlier deliveries of this message that were rejected
    pub redelivery_count: u32,
    pub envelope: Envelope,
}

impl Delivery {
    pub fn redelivered(&self) -> bool {
        self.redelivery_count > 0
    }
}

#[async_trait]
pub trait MessageBroker: Send + Sync {
    /// Create the endpoint and its bindings; idempotent for an identical spec
    async fn declare_endpoint(&self, endpoint: &EndpointSpec) -> BrokerResult<()>;

    /// Route an envelope to every endpoint with a matching binding
    async fn publish(&self, envelope: Envelope) -> BrokerResult<()>;

    /// Attach a consumer to an endpoint
    async fn subscribe(&self, endpoint: &str) -> BrokerResult<()>;

    /// Wait for the next delivery on an endpoint
    async fn receive(&self, endpoint: &str) -> BrokerResult<Delivery>;

    async fn ack(&self, endpoint: &str, delivery_tag: u64) -> BrokerResult<()>;

    /// Negative acknowledgement; `requeue` asks for redelivery
    async fn reject(&self, endpoint: &str, delivery_tag: u64, requeue: bool)
        -> BrokerResult<()>;

    /// Detach a consumer; auto-delete endpoints go away with their last consumer
    async fn disconnect(&self, endpoint: &str) -> BrokerResult<()>;
}
