//! Queue configuration, broker boundary, publishing and consuming
//!
//! # Overview
//!
//! - **QueueConfigurationCache**: per-routing-key configuration (concurrency,
//!   priority, TTL) resolved once from a static policy table
//! - **MessageBroker**: the transport boundary, a topic exchange with
//!   explicit acknowledgement
//! - **InMemoryBroker**: bundled transport used by the demo and the tests
//! - **CommandPublisher**: single and batch publish with cancellation
//! - **CommandConsumer**: bounded-concurrency dispatch to `CommandHandler`s
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐  register   ┌─────────────────────────┐
//! │ CommandPublisher │────────────▶│ QueueConfigurationCache │
//! └────────┬─────────┘             └─────────────────────────┘
//!          │ publish(topic, envelope)
//!          ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │                 MessageBroker (topic exchange)           │
//! │   psp.validation.1   psp.validation.2   ...  .overflow   │
//! └────────┬───────────────────┬───────────────────┬─────────┘
//!          │ receive/ack       │                   │
//!          ▼                   ▼                   ▼
//!   CommandConsumer     CommandConsumer     CommandConsumer
//! ```

pub mod api;
mod broker;
mod config_cache;
mod consumer;
mod error;
mod memory;
mod publisher;

#[cfg(test)]
mod tests;
