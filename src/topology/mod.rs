//! Endpoint topology and client partitioning
//!
//! Clients are an unbounded, dynamic set; worker endpoints are a small,
//! operator-configured number. `PartitionAssigner` maps each client to a
//! worker with a stable hash and generates the bind patterns that make the
//! broker deliver the client's commands to that worker only.
//! `TopologyConfigurator` lays out endpoints for one of three strategies
//! selected at startup.

pub mod api;
mod configurator;
mod partition;
mod settings;
mod strategy;

#[cfg(test)]
mod tests;
