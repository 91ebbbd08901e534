//! Subcommand implementations: plan, route and demo

use crate::app::producer::SampleProducer;
use crate::core::shutdown::CancellationSignal;
use crate::queue::api::{
    CommandConsumer, CommandHandler, CommandPublisher, ConsumerSummary, EndpointStats,
    HandlerRegistry, InMemoryBroker, MessageBroker,
};
use crate::routing::api::{
    HandlerError, ProcessType, ProcessingCommand, RoutingContext, RoutingError, RoutingResult,
};
use crate::topology::api::{EndpointRole, TopologyConfigurator};
use async_trait::async_trait;
use colored::Colorize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Print the endpoint layout
pub fn print_plan(topology: &TopologyConfigurator) {
    println!(
        "{} {} ({} endpoints)",
        "Strategy:".bold(),
        topology.strategy(),
        topology.endpoints().len()
    );
    if let Some(instance_id) = &topology.settings().instance_id {
        println!("{} {}", "Instance:".bold(), instance_id);
    }
    println!();
    println!(
        "{}",
        format!(
            "{:<32} {:<22} {:>8} {:>5}  {}",
            "ENDPOINT", "ROLE", "PREFETCH", "CONC", "BINDINGS"
        )
        .bold()
    );
    for endpoint in topology.endpoints() {
        let bindings = endpoint
            .bindings
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let name = format!("{:<32}", endpoint.name);
        let name = match endpoint.role {
            EndpointRole::Overflow { .. } => name.yellow(),
            _ => name.cyan(),
        };
        println!(
            "{} {:<22} {:>8} {:>5}  {}{}",
            name,
            endpoint.role.to_string(),
            endpoint.prefetch_count,
            endpoint.concurrency_limit,
            bindings,
            if endpoint.auto_delete { " (auto-delete)" } else { "" }
        );
    }
}

/// Print how a context is keyed and where it is delivered
pub fn print_route(topology: &TopologyConfigurator, context: &RoutingContext) {
    let configuration = topology.register(context);
    let owners = topology.route(context);

    println!("{:<14} {}", "Routing key:".bold(), context.routing_key());
    println!("{:<14} {}", "Queue name:".bold(), context.queue_name());
    println!("{:<14} {}", "Wire topic:".bold(), topology.publish_topic(context));
    if let Some(assigner) = topology.assigner(context.process_type()) {
        println!(
            "{:<14} {} of {}",
            "Worker:".bold(),
            assigner.worker_number(context.client()),
            assigner.worker_count()
        );
    }
    println!(
        "{:<14} concurrency {}, priority {}",
        "Policy:".bold(),
        configuration.max_concurrency,
        configuration.priority
    );
    match owners.as_slice() {
        [] => println!("{:<14} {}", "Endpoint:".bold(), "unroutable".red()),
        endpoints => {
            for endpoint in endpoints {
                println!(
                    "{:<14} {} [{}]",
                    "Endpoint:".bold(),
                    endpoint.name.green(),
                    endpoint.role
                );
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoOptions {
    pub batches: usize,
    pub batch_size: usize,
    /// Competing consumers started per endpoint
    pub consumers: usize,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            batches: 3,
            batch_size: 20,
            consumers: 1,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DemoReport {
    pub published: usize,
    pub consumed: ConsumerSummary,
    pub dead_lettered: usize,
    /// Per-endpoint counters captured before consumers disconnect
    pub endpoints: BTreeMap<String, EndpointStats>,
}

/// Handler used by the demo; counts what it sees
pub struct DemoHandler {
    process_type: ProcessType,
    processed: AtomicU64,
}

impl DemoHandler {
    pub fn new(process_type: ProcessType) -> Arc<Self> {
        Arc::new(Self {
            process_type,
            processed: AtomicU64::new(0),
        })
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl CommandHandler for DemoHandler {
    fn handles(&self, process_type: ProcessType) -> bool {
        process_type == self.process_type
    }

    async fn process(&self, command: &ProcessingCommand) -> Result<(), HandlerError> {
        log::debug!(
            "Processing {} {} for {}",
            command.message_type(),
            command.command_id(),
            command.context()
        );
        self.processed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Registry with one `DemoHandler` per process type
pub fn demo_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    for process_type in ProcessType::all() {
        registry.register(DemoHandler::new(process_type));
    }
    registry
}

/// Run producer and consumers over a fresh in-memory broker
///
/// Publishes every batch, waits for the endpoints to drain (or for `cancel`),
/// then stops the consumers and reports what happened.
pub async fn run_demo(
    topology: Arc<TopologyConfigurator>,
    options: DemoOptions,
    cancel: &CancellationSignal,
) -> RoutingResult<DemoReport> {
    let broker = Arc::new(InMemoryBroker::new());
    topology.declare_all(broker.as_ref()).await?;

    let handlers = Arc::new(demo_registry());
    let stop_consumers = CancellationSignal::new();
    let mut consumers = JoinSet::new();
    for endpoint in topology.endpoints() {
        for _ in 0..options.consumers.max(1) {
            let consumer = CommandConsumer::new(
                broker.clone() as Arc<dyn MessageBroker>,
                endpoint.clone(),
                handlers.clone(),
            );
            let stop = stop_consumers.clone();
            consumers.spawn(async move { consumer.run(&stop).await });
        }
    }
    log::info!("Started {} consumer(s)", consumers.len());

    let publisher = CommandPublisher::new(broker.clone(), topology.clone());
    let mut producer = SampleProducer::new();
    let produced = producer
        .publish_batches(&publisher, options.batches, options.batch_size, cancel)
        .await;

    if produced.is_ok() {
        wait_until_drained(&broker, cancel).await;
    }
    let endpoints = broker.all_stats();
    let dead_lettered = broker.dead_letters().len();

    stop_consumers.cancel();
    let mut consumed = ConsumerSummary::default();
    let mut consumer_error = None;
    while let Some(joined) = consumers.join_next().await {
        match joined {
            Ok(Ok(summary)) => {
                consumed.processed += summary.processed;
                consumed.failed += summary.failed;
                consumed.rejected += summary.rejected;
            }
            Ok(Err(e)) => {
                consumer_error.get_or_insert(e);
            }
            Err(e) => log::warn!("Consumer task ended abnormally: {}", e),
        }
    }

    let published = produced?;
    if let Some(e) = consumer_error {
        return Err(e);
    }
    Ok(DemoReport {
        published,
        consumed,
        dead_lettered,
        endpoints,
    })
}

async fn wait_until_drained(broker: &InMemoryBroker, cancel: &CancellationSignal) {
    let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
    loop {
        let pending: usize = broker
            .endpoint_names()
            .iter()
            .map(|name| broker.depth(name).unwrap_or(0) + broker.in_flight(name).unwrap_or(0))
            .sum();
        if pending == 0 {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            log::warn!("Gave up waiting for {} pending message(s)", pending);
            return;
        }
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(DRAIN_POLL_INTERVAL) => {}
        }
    }
}

pub fn print_demo_report(report: &DemoReport) {
    println!(
        "{} published {}, processed {}, failed {}, rejected {}, dead-lettered {}",
        "Demo:".bold(),
        report.published,
        report.consumed.processed,
        report.consumed.failed,
        report.consumed.rejected,
        report.dead_lettered
    );
    println!();
    println!(
        "{}",
        format!(
            "{:<32} {:>9} {:>9} {:>6} {:>9}",
            "ENDPOINT", "PUBLISHED", "DELIVERED", "ACKED", "REJECTED"
        )
        .bold()
    );
    for (name, stats) in &report.endpoints {
        println!(
            "{} {:>9} {:>9} {:>6} {:>9}",
            format!("{:<32}", name).cyan(),
            stats.published,
            stats.delivered,
            stats.acked,
            stats.rejected
        );
    }
}

/// Build the context named on the command line
pub fn route_context(
    firm: &str,
    client: &str,
    process_type: ProcessType,
    subscope: Option<&str>,
) -> Result<RoutingContext, RoutingError> {
    let context = RoutingContext::new(firm, client, process_type)?;
    match subscope {
        Some(subscope) => context.with_subscope(subscope),
        None => Ok(context),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::api::QueueConfigurationCache;
    use crate::topology::api::{TopologySettings, TopologyStrategy};

    fn topology(settings: TopologySettings) -> Arc<TopologyConfigurator> {
        let cache = Arc::new(QueueConfigurationCache::new());
        Arc::new(TopologyConfigurator::new(settings, cache).unwrap())
    }

    #[test]
    fn test_demo_registry_covers_every_process_type() {
        assert_eq!(demo_registry().process_types(), ProcessType::all());
    }

    #[test]
    fn test_route_context_rejects_empty_client() {
        let result = route_context("FirmA", "", ProcessType::Validation, None);
        assert!(matches!(result, Err(RoutingError::InvalidContext { .. })));
    }

    #[tokio::test]
    async fn test_demo_processes_everything_under_each_strategy() {
        let layouts = [
            TopologySettings::new(TopologyStrategy::SharedCompeting),
            TopologySettings::new(TopologyStrategy::HashPartitioned),
            TopologySettings::new(TopologyStrategy::PerInstance).with_instance_id("node-a"),
        ];
        for settings in layouts {
            let options = DemoOptions {
                batches: 2,
                batch_size: 12,
                consumers: 2,
            };
            let report = run_demo(topology(settings), options, &CancellationSignal::new())
                .await
                .unwrap();

            assert_eq!(report.published, 24);
            assert_eq!(report.consumed.processed, 24);
            assert_eq!(report.consumed.failed, 0);
            assert_eq!(report.dead_lettered, 0);
            let delivered: u64 = report.endpoints.values().map(|s| s.published).sum();
            assert_eq!(delivered, 24);
        }
    }

    #[tokio::test]
    async fn test_cancelled_demo_publishes_nothing() {
        let cancel = CancellationSignal::new();
        cancel.cancel();

        let report = run_demo(
            topology(TopologySettings::default()),
            DemoOptions::default(),
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(report.published, 0);
        assert_eq!(report.consumed, ConsumerSummary::default());
    }
}
