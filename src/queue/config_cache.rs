//! Queue configuration cache
//!
//! Resolves, per routing key, the queue configuration derived from the
//! process-type policy table and memoises it for the lifetime of the cache.
//! The first resolution of a key wins; concurrent first resolutions all see
//! the same `Arc`.

use crate::routing::api::{ProcessType, RoutingContext};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// Message TTL applied to every resolved configuration
pub const DEFAULT_MESSAGE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Concurrency and priority assigned to a process type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePolicy {
    pub max_concurrency: usize,
    pub priority: u8,
}

/// Policy for anything the table does not list
pub const DEFAULT_POLICY: QueuePolicy = QueuePolicy {
    max_concurrency: 1,
    priority: 1,
};

static POLICY_TABLE: LazyLock<HashMap<ProcessType, QueuePolicy>> = LazyLock::new(|| {
    HashMap::from([
        (
            ProcessType::Validation,
            QueuePolicy {
                max_concurrency: 4,
                priority: 10,
            },
        ),
        (
            ProcessType::SecurityAggregation,
            QueuePolicy {
                max_concurrency: 5,
                priority: 8,
            },
        ),
        (
            ProcessType::UniverseSoiMapping,
            QueuePolicy {
                max_concurrency: 2,
                priority: 6,
            },
        ),
        (
            ProcessType::SecurityMapping,
            QueuePolicy {
                max_concurrency: 3,
                priority: 4,
            },
        ),
    ])
});

pub fn policy_for(process_type: ProcessType) -> QueuePolicy {
    POLICY_TABLE
        .get(&process_type)
        .copied()
        .unwrap_or(DEFAULT_POLICY)
}

/// Resolved configuration for one routing key
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfiguration {
    pub queue_name: String,
    pub routing_key: String,
    pub context: RoutingContext,
    pub max_concurrency: usize,
    pub message_ttl: Option<Duration>,
    pub auto_delete: bool,
    pub priority: u8,
}

impl QueueConfiguration {
    fn for_context(context: &RoutingContext) -> Self {
        let policy = policy_for(context.process_type());
        Self {
            queue_name: context.queue_name(),
            routing_key: context.routing_key(),
            context: context.clone(),
            max_concurrency: policy.max_concurrency,
            message_ttl: Some(DEFAULT_MESSAGE_TTL),
            auto_delete: false,
            priority: policy.priority,
        }
    }

    /// Broker declaration arguments (`x-max-priority`, `x-message-ttl` in ms)
    pub fn broker_arguments(&self) -> BTreeMap<String, Value> {
        let mut arguments = BTreeMap::new();
        arguments.insert("x-max-priority".to_string(), Value::from(self.priority));
        if let Some(ttl) = self.message_ttl {
            arguments.insert(
                "x-message-ttl".to_string(),
                Value::from(ttl.as_millis() as u64),
            );
        }
        arguments
    }
}

/// Memoising store of queue configurations keyed by routing key
///
/// Passed explicitly to the publisher and the topology configurator; there
/// is no process-wide instance.
#[derive(Debug, Default)]
pub struct QueueConfigurationCache {
    entries: RwLock<HashMap<String, Arc<QueueConfiguration>>>,
}

impl QueueConfigurationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or create the configuration for a context's routing key
    pub fn resolve(&self, context: &RoutingContext) -> Arc<QueueConfiguration> {
        self.resolve_inner(context).0
    }

    /// Resolve and log first-time registration of a routing key
    pub fn register(&self, context: &RoutingContext) -> Arc<QueueConfiguration> {
        let (configuration, created) = self.resolve_inner(context);
        if created {
            log::debug!(
                "Registered queue {} for routing key {} (concurrency {}, priority {})",
                configuration.queue_name,
                configuration.routing_key,
                configuration.max_concurrency,
                configuration.priority
            );
        }
        configuration
    }

    pub fn get(&self, routing_key: &str) -> Option<Arc<QueueConfiguration>> {
        self.read_entries().get(routing_key).cloned()
    }

    /// Snapshot of every resolved configuration, ordered by routing key
    pub fn list_active(&self) -> Vec<Arc<QueueConfiguration>> {
        let mut snapshot: Vec<_> = self.read_entries().values().cloned().collect();
        snapshot.sort_by(|a, b| a.routing_key.cmp(&b.routing_key));
        snapshot
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    fn resolve_inner(&self, context: &RoutingContext) -> (Arc<QueueConfiguration>, bool) {
        let routing_key = context.routing_key();

        if let Some(existing) = self.read_entries().get(&routing_key) {
            return (existing.clone(), false);
        }

        // Built outside the write lock; a racing resolver may still win below
        let candidate = Arc::new(QueueConfiguration::for_context(context));

        let mut entries = self.write_entries();
        let stored = entries.entry(routing_key).or_insert_with(|| candidate.clone());
        let created = Arc::ptr_eq(stored, &candidate);
        (stored.clone(), created)
    }

    // A panic while holding the lock cannot leave a half-written entry, so
    // poisoned guards are safe to reuse
    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<QueueConfiguration>>> {
        self.entries
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<QueueConfiguration>>> {
        self.entries
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
