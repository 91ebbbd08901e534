//! Test modules for the queue layer
//!
//! Organised by functional area: configuration cache, in-memory broker,
//! publisher and consumer.

mod helpers;
