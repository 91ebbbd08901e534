//! Topology strategies and per-process-type scaling profiles

use crate::routing::api::{ProcessType, RoutingError, RoutingResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Endpoint layout chosen once per deployment
#[derive(
    EnumIter, Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum TopologyStrategy {
    /// One endpoint per process type, every instance competes on it
    SharedCompeting,
    /// `worker_count` endpoints per process type, clients sharded by hash
    #[default]
    HashPartitioned,
    /// One auto-delete endpoint per process type per instance
    PerInstance,
}

impl TopologyStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SharedCompeting => "shared-competing",
            Self::HashPartitioned => "hash-partitioned",
            Self::PerInstance => "per-instance",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::SharedCompeting => &["shared", "competing"],
            Self::HashPartitioned => &["partitioned", "scaled", "hash"],
            Self::PerInstance => &["instance", "exclusive"],
        }
    }
}

impl fmt::Display for TopologyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TopologyStrategy {
    type Err = RoutingError;

    fn from_str(s: &str) -> RoutingResult<Self> {
        let normalised = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::iter()
            .find(|strategy| {
                strategy.name() == normalised || strategy.aliases().contains(&normalised.as_str())
            })
            .ok_or_else(|| {
                RoutingError::invalid_topology(format!(
                    "unknown topology strategy '{}' (expected one of: {})",
                    s,
                    Self::iter()
                        .map(|strategy| strategy.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

/// How a process type scales under the hash-partitioned strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalingProfile {
    /// False means a single endpoint regardless of configuration
    pub partitioned: bool,
    pub default_workers: usize,
    /// Whether the worker count may be overridden by configuration
    pub configurable: bool,
    pub prefetch_count: u16,
    pub concurrency_limit: usize,
    /// Low-index workers that also consume the overflow endpoint
    pub catch_all_workers: usize,
}

/// Prefetch and concurrency under the shared-competing strategy
pub const SHARED_PREFETCH: u16 = 1;
pub const SHARED_CONCURRENCY: usize = 1;

const SINGLE_ENDPOINT: ScalingProfile = ScalingProfile {
    partitioned: false,
    default_workers: 1,
    configurable: false,
    prefetch_count: SHARED_PREFETCH,
    concurrency_limit: SHARED_CONCURRENCY,
    catch_all_workers: 0,
};

static SCALING_PROFILES: LazyLock<HashMap<ProcessType, ScalingProfile>> = LazyLock::new(|| {
    HashMap::from([
        (
            ProcessType::SecurityAggregation,
            ScalingProfile {
                partitioned: true,
                default_workers: 6,
                configurable: true,
                prefetch_count: 15,
                concurrency_limit: 12,
                catch_all_workers: 3,
            },
        ),
        (
            ProcessType::SecurityMapping,
            ScalingProfile {
                partitioned: true,
                default_workers: 6,
                configurable: true,
                prefetch_count: 15,
                concurrency_limit: 12,
                catch_all_workers: 3,
            },
        ),
        (
            ProcessType::UniverseSoiMapping,
            ScalingProfile {
                partitioned: false,
                default_workers: 1,
                configurable: false,
                prefetch_count: 20,
                concurrency_limit: 15,
                catch_all_workers: 0,
            },
        ),
        (
            ProcessType::Validation,
            ScalingProfile {
                partitioned: true,
                default_workers: 4,
                configurable: false,
                prefetch_count: 10,
                concurrency_limit: 8,
                catch_all_workers: 2,
            },
        ),
    ])
});

pub fn scaling_profile(process_type: ProcessType) -> ScalingProfile {
    SCALING_PROFILES
        .get(&process_type)
        .copied()
        .unwrap_or(SINGLE_ENDPOINT)
}
