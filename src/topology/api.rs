//! Public API for topology configuration
//!
//! External modules should import from here rather than directly from
//! internal modules.

pub use crate::topology::configurator::{
    endpoint_name, EndpointRole, EndpointSpec, TopologyConfigurator, OVERFLOW_SUFFIX,
};
pub use crate::topology::partition::{bucket_segment, client_hash, PartitionAssigner};
pub use crate::topology::settings::TopologySettings;
pub use crate::topology::strategy::{
    scaling_profile, ScalingProfile, TopologyStrategy, SHARED_CONCURRENCY, SHARED_PREFETCH,
};
