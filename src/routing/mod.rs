//! Routing contexts, routing keys and bind patterns
//!
//! Every command carries a `RoutingContext` (firm, client, process type and
//! an optional sub-scope). The context derives the canonical topic key that
//! the rest of the system routes on:
//!
//! ```text
//! <firm>.<client>.<processtype>[.<subscope>]      e.g. firma.client7.validation
//! ```
//!
//! Endpoints subscribe with `BindPattern`s over the same grammar, where `*`
//! stands for exactly one segment.
//!
//! # Example
//!
//! ```rust,no_run
//! use psprouter::routing::api::{ProcessType, RoutingContext};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let context = RoutingContext::new("FirmA", "Client7", ProcessType::SecurityAggregation)?
//!     .with_subscope("UniverseX")?;
//! assert_eq!(context.routing_key(), "firma.client7.securityaggregation.universex");
//! # Ok(())
//! # }
//! ```

pub mod api;
mod command;
mod context;
mod error;
mod pattern;
mod process_type;

#[cfg(test)]
mod tests;
