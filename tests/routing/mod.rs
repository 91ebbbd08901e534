//! Routing Integration Test Modules

pub mod bind_coverage;
pub mod distribution;
pub mod scenarios;
