//! Command-line arguments
//!
//! Global flags configure logging and the topology; the subcommand selects
//! what to do with it. Topology flags take precedence over the
//! configuration file (see `config`).

use crate::core::validation::validate_positive_int;
use crate::routing::api::ProcessType;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "psprouter")]
#[command(about = "Multi-tenant command routing for portfolio security processing")]
#[command(version)]
#[command(after_help = " * can be specified multiple times")]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Color output control (unspecified = auto/TTY)
    #[arg(short = 'g', long = "color")]
    pub color: Option<bool>,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Topology strategy
    #[arg(
        short = 's',
        long = "strategy",
        value_name = "STRATEGY",
        help = "Topology strategy (shared-competing, hash-partitioned, per-instance)"
    )]
    pub strategy: Option<String>,

    /// Instance identifier for the per-instance strategy
    #[arg(short = 'i', long = "instance-id", value_name = "ID")]
    pub instance_id: Option<String>,

    /// Worker count override*
    #[arg(
        short = 'w',
        long = "worker-count",
        value_name = "TYPE=COUNT",
        value_parser = parse_worker_count,
        action = ArgAction::Append
    )]
    pub worker_counts: Vec<(ProcessType, usize)>,

    /// Do not bind the overflow endpoints
    #[arg(long = "no-catch-all")]
    pub no_catch_all: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the endpoint layout of the configured topology
    Plan,

    /// Show how a routing context is keyed and which endpoint receives it
    Route {
        #[arg(long = "firm", value_name = "FIRM")]
        firm: String,

        #[arg(long = "client", value_name = "CLIENT")]
        client: String,

        #[arg(short = 't', long = "process-type", value_name = "TYPE")]
        process_type: ProcessType,

        #[arg(long = "subscope", value_name = "SUBSCOPE")]
        subscope: Option<String>,
    },

    /// Run the sample producer and consumers over the in-memory broker
    Demo {
        /// Number of batches to publish
        #[arg(short = 'b', long = "batches", value_name = "N", default_value_t = 3)]
        batches: usize,

        /// Commands per batch
        #[arg(short = 'n', long = "batch-size", value_name = "N", default_value_t = 20)]
        batch_size: usize,

        /// Competing consumers per endpoint
        #[arg(long = "consumers", value_name = "N", default_value_t = 1)]
        consumers: usize,
    },
}

/// Parse `<process-type>=<count>`
pub fn parse_worker_count(value: &str) -> Result<(ProcessType, usize), String> {
    let (name, count) = value
        .split_once('=')
        .ok_or_else(|| format!("expected TYPE=COUNT, got '{}'", value))?;
    let process_type: ProcessType = name.trim().parse().map_err(|e| format!("{}", e))?;
    let count = validate_positive_int(count).map_err(|e| {
        format!("worker count for {}: {}", process_type.token(), e)
    })?;
    Ok((process_type, count))
}
