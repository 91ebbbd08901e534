//! Core services and infrastructure

pub mod error_handling;
pub mod logging;
pub mod shutdown;
pub mod validation;
pub mod version; // routing schema version stamped on every envelope
