//! Test modules for the routing core
//!
//! Organised by type: contexts and keys, bind patterns, commands.

pub mod command_tests;
pub mod pattern_tests;
