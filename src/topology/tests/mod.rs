//! Test modules for topology configuration
//!
//! Endpoint layouts per strategy, and partition routing against the
//! generated bind patterns.
