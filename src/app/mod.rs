//! Application module

pub mod cli;
pub mod commands;
pub mod producer;
pub mod startup;
