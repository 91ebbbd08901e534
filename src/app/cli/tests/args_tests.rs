//! Tests for command-line argument parsing

use crate::app::cli::args::*;
use crate::routing::api::ProcessType;
use clap::Parser;
use std::path::PathBuf;

#[test]
fn test_plan_with_global_flags() {
    let args = Args::try_parse_from([
        "psprouter",
        "--log-level",
        "debug",
        "--strategy",
        "shared-competing",
        "--config-file",
        "router.toml",
        "plan",
    ])
    .unwrap();

    assert_eq!(args.log_level, Some("debug".to_string()));
    assert_eq!(args.strategy, Some("shared-competing".to_string()));
    assert_eq!(args.config_file, Some(PathBuf::from("router.toml")));
    assert_eq!(args.command, Command::Plan);
}

#[test]
fn test_worker_count_can_repeat() {
    let args = Args::try_parse_from([
        "psprouter",
        "-w",
        "securityaggregation=8",
        "--worker-count",
        "SecurityMapping=2",
        "plan",
    ])
    .unwrap();

    assert_eq!(
        args.worker_counts,
        vec![
            (ProcessType::SecurityAggregation, 8),
            (ProcessType::SecurityMapping, 2)
        ]
    );
}

#[test]
fn test_worker_count_rejects_zero_and_garbage() {
    assert!(parse_worker_count("securityaggregation=0").is_err());
    assert!(parse_worker_count("securityaggregation=-3").is_err());
    assert!(parse_worker_count("securityaggregation").is_err());
    assert!(parse_worker_count("payroll=4").is_err());

    let result = Args::try_parse_from(["psprouter", "-w", "validation=0", "plan"]);
    assert!(result.is_err());
}

#[test]
fn test_route_subcommand() {
    let args = Args::try_parse_from([
        "psprouter",
        "route",
        "--firm",
        "FirmA",
        "--client",
        "Client7",
        "--process-type",
        "securityaggregation",
        "--subscope",
        "UniverseX",
    ])
    .unwrap();

    assert_eq!(
        args.command,
        Command::Route {
            firm: "FirmA".to_string(),
            client: "Client7".to_string(),
            process_type: ProcessType::SecurityAggregation,
            subscope: Some("UniverseX".to_string()),
        }
    );
}

#[test]
fn test_demo_defaults() {
    let args = Args::try_parse_from(["psprouter", "--no-catch-all", "demo"]).unwrap();

    assert!(args.no_catch_all);
    assert_eq!(
        args.command,
        Command::Demo {
            batches: 3,
            batch_size: 20,
            consumers: 1,
        }
    );
}

#[test]
fn test_subcommand_is_required() {
    assert!(Args::try_parse_from(["psprouter", "--log-level", "info"]).is_err());
}

#[test]
fn test_log_format_is_restricted() {
    assert!(Args::try_parse_from(["psprouter", "-o", "yaml", "plan"]).is_err());
    let args = Args::try_parse_from(["psprouter", "-o", "json", "plan"]).unwrap();
    assert_eq!(args.log_format, Some("json".to_string()));
}
