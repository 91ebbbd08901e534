//! Topology configurator
//!
//! Turns `TopologySettings` into the endpoint layout registered with the
//! broker and decides the wire topic each context is published under. The
//! layout is computed once at construction and never changes afterwards.
//!
//! | Strategy         | Endpoints per process type                     | Wire topic       |
//! |------------------|------------------------------------------------|------------------|
//! | shared-competing | `psp.<pt>`                                     | canonical key    |
//! | hash-partitioned | `psp.<pt>.<1..n>` + `psp.<pt>.overflow`        | partition topic  |
//! | per-instance     | `psp.<pt>.<instance-id>` (auto-delete)         | canonical key    |
//!
//! Under hash-partitioned, process types with a single endpoint (universe
//! SOI mapping) use `psp.<pt>` and the canonical key.

use crate::core::validation::validate_segment;
use crate::queue::api::{MessageBroker, QueueConfiguration, QueueConfigurationCache, policy_for};
use crate::routing::api::{
    BindPattern, ProcessType, RoutingContext, RoutingError, RoutingResult, QUEUE_NAME_PREFIX,
};
use crate::topology::partition::PartitionAssigner;
use crate::topology::settings::TopologySettings;
use crate::topology::strategy::{
    scaling_profile, TopologyStrategy, SHARED_CONCURRENCY, SHARED_PREFETCH,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Suffix of the overflow endpoint holding the catch-all bindings
pub const OVERFLOW_SUFFIX: &str = "overflow";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointRole {
    /// Competing consumers across all instances
    Shared,
    /// Exclusive partition of a 1-based worker
    Partition { worker: usize },
    /// Catch-all bindings, consumed by the listed workers
    Overflow { consumers: Vec<usize> },
    /// Private endpoint of one process instance
    Instance { instance_id: String },
}

impl fmt::Display for EndpointRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shared => f.write_str("shared"),
            Self::Partition { worker } => write!(f, "partition {}", worker),
            Self::Overflow { consumers } => write!(
                f,
                "overflow (workers {})",
                consumers
                    .iter()
                    .map(|w| w.to_string())
                    .collect::<Vec<_>>()
                    .join(",")
            ),
            Self::Instance { instance_id } => write!(f, "instance {}", instance_id),
        }
    }
}

/// One endpoint to declare on the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    pub name: String,
    pub process_type: ProcessType,
    pub bindings: Vec<BindPattern>,
    pub prefetch_count: u16,
    pub concurrency_limit: usize,
    pub auto_delete: bool,
    pub role: EndpointRole,
}

impl EndpointSpec {
    pub fn accepts(&self, topic: &str) -> bool {
        self.bindings.iter().any(|pattern| pattern.matches(topic))
    }
}

/// `psp.<processtype>[.<suffix>]`
pub fn endpoint_name(process_type: ProcessType, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{}.{}.{}", QUEUE_NAME_PREFIX, process_type.token(), suffix),
        None => format!("{}.{}", QUEUE_NAME_PREFIX, process_type.token()),
    }
}

#[derive(Debug)]
pub struct TopologyConfigurator {
    settings: TopologySettings,
    cache: Arc<QueueConfigurationCache>,
    assigners: BTreeMap<ProcessType, PartitionAssigner>,
    endpoints: Vec<EndpointSpec>,
}

impl TopologyConfigurator {
    /// Validate settings and compute the endpoint layout
    ///
    /// Fails with `InvalidTopologyConfig` on a zero worker count or a
    /// missing/malformed instance id under the per-instance strategy.
    pub fn new(
        settings: TopologySettings,
        cache: Arc<QueueConfigurationCache>,
    ) -> RoutingResult<Self> {
        for (process_type, count) in &settings.worker_counts {
            if *count == 0 {
                return Err(RoutingError::invalid_topology(format!(
                    "worker count for {} must be positive",
                    process_type.token()
                )));
            }
            if !scaling_profile(*process_type).configurable {
                log::warn!(
                    "Ignoring worker count {} for {}: its endpoint layout is fixed at {}",
                    count,
                    process_type.token(),
                    settings.effective_worker_count(*process_type)
                );
            }
        }

        let instance_id = match settings.strategy {
            TopologyStrategy::PerInstance => {
                let id = settings.instance_id.as_deref().ok_or_else(|| {
                    RoutingError::invalid_topology(
                        "the per-instance strategy requires an instance id",
                    )
                })?;
                validate_segment("instance id", id).map_err(RoutingError::invalid_topology)?;
                Some(id.to_lowercase())
            }
            _ => None,
        };

        let mut assigners = BTreeMap::new();
        if settings.strategy == TopologyStrategy::HashPartitioned {
            for process_type in ProcessType::all() {
                let profile = scaling_profile(process_type);
                if !profile.partitioned {
                    continue;
                }
                let catch_all_workers = if settings.catch_all {
                    profile.catch_all_workers
                } else {
                    0
                };
                assigners.insert(
                    process_type,
                    PartitionAssigner::new(
                        process_type,
                        settings.effective_worker_count(process_type),
                        catch_all_workers,
                    )?,
                );
            }
        }

        let mut endpoints = Vec::new();
        for process_type in ProcessType::all() {
            let layout = match settings.strategy {
                TopologyStrategy::SharedCompeting => vec![shared_endpoint(
                    process_type,
                    SHARED_PREFETCH,
                    SHARED_CONCURRENCY,
                )],
                TopologyStrategy::HashPartitioned => match assigners.get(&process_type) {
                    Some(assigner) => partitioned_endpoints(assigner),
                    None => {
                        let profile = scaling_profile(process_type);
                        vec![shared_endpoint(
                            process_type,
                            profile.prefetch_count,
                            profile.concurrency_limit,
                        )]
                    }
                },
                TopologyStrategy::PerInstance => match &instance_id {
                    Some(id) => vec![instance_endpoint(process_type, id)],
                    None => Vec::new(),
                },
            };
            endpoints.extend(layout);
        }

        for endpoint in &endpoints {
            log::debug!(
                "Endpoint {} [{}] prefetch {} concurrency {} bindings: {}",
                endpoint.name,
                endpoint.role,
                endpoint.prefetch_count,
                endpoint.concurrency_limit,
                endpoint
                    .bindings
                    .iter()
                    .map(|b| b.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        log::info!(
            "Topology configured: strategy {}, {} endpoint(s)",
            settings.strategy,
            endpoints.len()
        );

        Ok(Self {
            settings,
            cache,
            assigners,
            endpoints,
        })
    }

    pub fn strategy(&self) -> TopologyStrategy {
        self.settings.strategy
    }

    pub fn settings(&self) -> &TopologySettings {
        &self.settings
    }

    pub fn cache(&self) -> &Arc<QueueConfigurationCache> {
        &self.cache
    }

    pub fn assigner(&self, process_type: ProcessType) -> Option<&PartitionAssigner> {
        self.assigners.get(&process_type)
    }

    /// Resolve and register the queue configuration of a context
    pub fn register(&self, context: &RoutingContext) -> Arc<QueueConfiguration> {
        self.cache.register(context)
    }

    /// Topic a context is published under
    pub fn publish_topic(&self, context: &RoutingContext) -> String {
        match self.assigners.get(&context.process_type()) {
            Some(assigner) => assigner.partition_topic(context),
            None => context.routing_key(),
        }
    }

    pub fn endpoints(&self) -> &[EndpointSpec] {
        &self.endpoints
    }

    pub fn endpoints_for(&self, process_type: ProcessType) -> Vec<&EndpointSpec> {
        self.endpoints
            .iter()
            .filter(|e| e.process_type == process_type)
            .collect()
    }

    /// Endpoints whose bindings match the context's wire topic
    pub fn route(&self, context: &RoutingContext) -> Vec<&EndpointSpec> {
        let topic = self.publish_topic(context);
        self.endpoints
            .iter()
            .filter(|e| e.accepts(&topic))
            .collect()
    }

    /// Endpoints a 1-based worker consumes for a process type
    ///
    /// Under hash-partitioned this is the worker's partition plus the
    /// overflow endpoint when the worker is a designated consumer. Other
    /// strategies give every worker the same endpoints.
    pub fn worker_endpoints(&self, process_type: ProcessType, worker: usize) -> Vec<&EndpointSpec> {
        self.endpoints_for(process_type)
            .into_iter()
            .filter(|e| match &e.role {
                EndpointRole::Partition { worker: owner } => *owner == worker,
                EndpointRole::Overflow { consumers } => consumers.contains(&worker),
                EndpointRole::Shared | EndpointRole::Instance { .. } => true,
            })
            .collect()
    }

    /// Declare every endpoint on the broker
    pub async fn declare_all(&self, broker: &dyn MessageBroker) -> RoutingResult<()> {
        for endpoint in &self.endpoints {
            broker
                .declare_endpoint(endpoint)
                .await
                .map_err(|e| RoutingError::broker("declare", e))?;
        }
        Ok(())
    }
}

fn shared_endpoint(
    process_type: ProcessType,
    prefetch_count: u16,
    concurrency_limit: usize,
) -> EndpointSpec {
    EndpointSpec {
        name: endpoint_name(process_type, None),
        process_type,
        bindings: BindPattern::canonical_for(process_type).to_vec(),
        prefetch_count,
        concurrency_limit,
        auto_delete: false,
        role: EndpointRole::Shared,
    }
}

/// One endpoint per worker with its exclusive patterns, plus an overflow
/// endpoint carrying the catch-all patterns. The low-index workers consume
/// the overflow endpoint instead of binding the catch-alls on their own
/// queues, so every topic still lands on exactly one endpoint.
fn partitioned_endpoints(assigner: &PartitionAssigner) -> Vec<EndpointSpec> {
    let process_type = assigner.process_type();
    let profile = scaling_profile(process_type);

    let mut endpoints: Vec<EndpointSpec> = (1..=assigner.worker_count())
        .map(|worker| EndpointSpec {
            name: endpoint_name(process_type, Some(&worker.to_string())),
            process_type,
            bindings: assigner.exclusive_patterns(worker).to_vec(),
            prefetch_count: profile.prefetch_count,
            concurrency_limit: profile.concurrency_limit,
            auto_delete: false,
            role: EndpointRole::Partition { worker },
        })
        .collect();

    let consumers = assigner.catch_all_consumers();
    if !consumers.is_empty() {
        endpoints.push(EndpointSpec {
            name: endpoint_name(process_type, Some(OVERFLOW_SUFFIX)),
            process_type,
            bindings: assigner.catch_all_patterns().to_vec(),
            prefetch_count: profile.prefetch_count,
            concurrency_limit: profile.concurrency_limit,
            auto_delete: false,
            role: EndpointRole::Overflow { consumers },
        });
    }
    endpoints
}

fn instance_endpoint(process_type: ProcessType, instance_id: &str) -> EndpointSpec {
    let policy = policy_for(process_type);
    EndpointSpec {
        name: endpoint_name(process_type, Some(instance_id)),
        process_type,
        bindings: BindPattern::canonical_for(process_type).to_vec(),
        prefetch_count: u16::try_from(policy.max_concurrency).unwrap_or(u16::MAX),
        concurrency_limit: policy.max_concurrency,
        auto_delete: true,
        role: EndpointRole::Instance {
            instance_id: instance_id.to_string(),
        },
    }
}
