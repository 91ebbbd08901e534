//! Bind-pattern coverage across strategies

use crate::common::context;
use psprouter::queue::api::QueueConfigurationCache;
use psprouter::routing::api::*;
use psprouter::topology::api::*;
use std::sync::Arc;

fn topology(settings: TopologySettings) -> TopologyConfigurator {
    TopologyConfigurator::new(settings, Arc::new(QueueConfigurationCache::new())).unwrap()
}

fn layouts() -> Vec<TopologySettings> {
    vec![
        TopologySettings::new(TopologyStrategy::SharedCompeting),
        TopologySettings::new(TopologyStrategy::HashPartitioned),
        TopologySettings::new(TopologyStrategy::HashPartitioned)
            .with_worker_count(ProcessType::SecurityAggregation, 11)
            .with_worker_count(ProcessType::SecurityMapping, 2),
        TopologySettings::new(TopologyStrategy::HashPartitioned).with_catch_all(false),
        TopologySettings::new(TopologyStrategy::PerInstance).with_instance_id("Node-A"),
    ]
}

#[test]
fn test_every_context_is_bound_by_exactly_one_endpoint() {
    for settings in layouts() {
        let topology = topology(settings.clone());
        for process_type in ProcessType::all() {
            for i in 0..200 {
                let ctx = context("FirmA", &format!("Client{}", i), process_type);
                let scoped = ctx.clone().with_subscope(format!("Universe{}", i % 7)).unwrap();

                for ctx in [ctx, scoped] {
                    let owners = topology.route(&ctx);
                    assert_eq!(
                        owners.len(),
                        1,
                        "{:?}: {} -> {:?}",
                        settings.strategy,
                        topology.publish_topic(&ctx),
                        owners.iter().map(|e| &e.name).collect::<Vec<_>>()
                    );
                    assert_eq!(owners[0].process_type, process_type);
                }
            }
        }
    }
}

#[test]
fn test_canonical_key_is_always_bound() {
    // Producers that do not know the partition contract publish the canonical key
    for settings in layouts().into_iter().filter(|s| s.catch_all) {
        let topology = topology(settings);
        for process_type in ProcessType::all() {
            let key = context("FirmZ", "LegacyClient", process_type).routing_key();
            let bound = topology
                .endpoints_for(process_type)
                .iter()
                .any(|e| e.accepts(&key));
            assert!(bound, "{} unbound under {}", key, topology.strategy());
        }
    }
}

#[test]
fn test_bindings_never_cross_process_types() {
    for settings in layouts() {
        let topology = topology(settings);
        for endpoint in topology.endpoints() {
            for other in ProcessType::all() {
                if other == endpoint.process_type {
                    continue;
                }
                let ctx = context("FirmA", "Client1", other);
                assert!(!endpoint.accepts(&topology.publish_topic(&ctx)));
                assert!(!endpoint.accepts(&ctx.routing_key()));
            }
        }
    }
}
