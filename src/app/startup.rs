//! Application startup
//!
//! Parse the command line, load the configuration file, initialise logging,
//! build the topology and dispatch the subcommand. Returns the process exit
//! code.

use crate::app::cli::args::{Args, Command};
use crate::app::cli::config::RouterConfig;
use crate::app::commands::{
    print_demo_report, print_plan, print_route, route_context, run_demo, DemoOptions,
};
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::core::shutdown::ShutdownCoordinator;
use crate::core::version;
use crate::queue::api::QueueConfigurationCache;
use crate::routing::api::RoutingResult;
use crate::topology::api::TopologyConfigurator;
use clap::Parser;
use std::io::IsTerminal;
use std::sync::Arc;

pub async fn startup() -> i32 {
    let args = Args::parse();

    let mut config = match RouterConfig::load(args.config_file.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };
    if let Err(e) = config.merge_args(&args) {
        eprintln!("Error: {}", e);
        return 1;
    }

    let use_color = config
        .color
        .unwrap_or_else(|| std::io::stdout().is_terminal());
    colored::control::set_override(use_color);

    let log_file = config
        .log_file
        .as_ref()
        .map(|p| p.to_string_lossy().to_string());
    if let Err(e) = init_logging(
        config.log_level.as_deref(),
        config.log_format.as_deref(),
        log_file.as_deref(),
        use_color,
    ) {
        eprintln!("Failed to initialize logging: {}", e);
        return 1;
    }

    log::debug!(
        "psprouter {} (schema {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        version::schema_version(),
        version::build_time(),
        version::git_hash()
    );

    let settings = config.topology_settings(default_instance_id);
    let cache = Arc::new(QueueConfigurationCache::new());
    let topology = match TopologyConfigurator::new(settings, cache) {
        Ok(topology) => Arc::new(topology),
        Err(e) => {
            log_error_with_context(&e, "Topology setup");
            return 1;
        }
    };

    match dispatch(args.command, topology).await {
        Ok(()) => 0,
        Err(e) => {
            log_error_with_context(&e, "Command failed");
            1
        }
    }
}

async fn dispatch(command: Command, topology: Arc<TopologyConfigurator>) -> RoutingResult<()> {
    match command {
        Command::Plan => print_plan(&topology),
        Command::Route {
            firm,
            client,
            process_type,
            subscope,
        } => {
            let context = route_context(&firm, &client, process_type, subscope.as_deref())?;
            print_route(&topology, &context);
        }
        Command::Demo {
            batches,
            batch_size,
            consumers,
        } => {
            let shutdown = ShutdownCoordinator::install();
            let options = DemoOptions {
                batches,
                batch_size,
                consumers,
            };
            let report = run_demo(topology, options, &shutdown.signal()).await?;
            if shutdown.is_shutdown_requested() {
                log::warn!("Demo interrupted by shutdown request");
            }
            print_demo_report(&report);
        }
    }
    Ok(())
}

/// `<hostname>-<pid>`, used when per-instance is selected without an id
pub fn default_instance_id() -> String {
    let host = hostname().unwrap_or_else(|| "localhost".to_string());
    let host: String = host
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect();
    format!("{}-{}", host.to_lowercase(), std::process::id())
}

#[cfg(unix)]
fn hostname() -> Option<String> {
    let mut buf = [0u8; 256];
    // SAFETY: buf is writable for buf.len() bytes
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr() as *mut libc::c_char, buf.len()) };
    if rc != 0 {
        return None;
    }
    let end = buf.iter().position(|b| *b == 0).unwrap_or(buf.len());
    let name = String::from_utf8_lossy(&buf[..end]).trim().to_string();
    (!name.is_empty()).then_some(name)
}

#[cfg(not(unix))]
fn hostname() -> Option<String> {
    None
}
