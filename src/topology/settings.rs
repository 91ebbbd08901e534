//! Topology settings supplied by the application layer

use crate::routing::api::ProcessType;
use crate::topology::strategy::{scaling_profile, TopologyStrategy};
use std::collections::BTreeMap;

/// Inputs the topology consumes; the library never reads the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologySettings {
    pub strategy: TopologyStrategy,
    /// Worker-count overrides per process type
    pub worker_counts: BTreeMap<ProcessType, usize>,
    /// Required by the per-instance strategy
    pub instance_id: Option<String>,
    /// Bind the overflow endpoint under the hash-partitioned strategy
    pub catch_all: bool,
}

impl Default for TopologySettings {
    fn default() -> Self {
        Self {
            strategy: TopologyStrategy::default(),
            worker_counts: BTreeMap::new(),
            instance_id: None,
            catch_all: true,
        }
    }
}

impl TopologySettings {
    pub fn new(strategy: TopologyStrategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    pub fn with_worker_count(mut self, process_type: ProcessType, count: usize) -> Self {
        self.worker_counts.insert(process_type, count);
        self
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    pub fn with_catch_all(mut self, enabled: bool) -> Self {
        self.catch_all = enabled;
        self
    }

    /// Worker count actually used for a process type
    ///
    /// Fixed-layout process types ignore overrides.
    pub fn effective_worker_count(&self, process_type: ProcessType) -> usize {
        let profile = scaling_profile(process_type);
        if !profile.partitioned {
            return 1;
        }
        if !profile.configurable {
            return profile.default_workers;
        }
        self.worker_counts
            .get(&process_type)
            .copied()
            .unwrap_or(profile.default_workers)
    }
}
