//! Documented routing scenarios

use crate::common::context;
use psprouter::queue::api::*;
use psprouter::routing::api::*;
use psprouter::topology::api::*;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_key_and_queue_name_without_subscope() {
    let ctx = context("FirmA", "Client7", ProcessType::SecurityAggregation);

    assert_eq!(ctx.routing_key(), "firma.client7.securityaggregation");
    assert_eq!(ctx.queue_name(), "psp-firma-client7-securityaggregation");
}

#[test]
fn test_key_with_subscope() {
    let ctx = context("FirmA", "Client7", ProcessType::SecurityAggregation)
        .with_subscope("UniverseX")
        .unwrap();

    assert_eq!(ctx.routing_key(), "firma.client7.securityaggregation.universex");
    assert_eq!(
        ctx.queue_name(),
        "psp-firma-client7-securityaggregation-universex"
    );
}

#[test]
fn test_client21_is_delivered_to_its_worker_only() {
    let cache = Arc::new(QueueConfigurationCache::new());
    let topology = TopologyConfigurator::new(TopologySettings::default(), cache).unwrap();
    let ctx = context("FirmA", "Client21", ProcessType::SecurityAggregation);

    let k = (client_hash("client21") % 6) as usize;
    let owners: Vec<&str> = topology
        .route(&ctx)
        .into_iter()
        .map(|e| e.name.as_str())
        .collect();

    assert_eq!(owners, vec![format!("psp.securityaggregation.{}", k + 1)]);

    let topic = topology.publish_topic(&ctx);
    for worker in 1..=6 {
        let assigner = topology.assigner(ProcessType::SecurityAggregation).unwrap();
        let bound = assigner
            .exclusive_patterns(worker)
            .iter()
            .any(|p| p.matches(&topic));
        assert_eq!(bound, worker == k + 1, "worker {}", worker);
    }
}

#[test]
fn test_validation_policy() {
    let cache = QueueConfigurationCache::new();
    let configuration = cache.resolve(&context("FirmA", "Client7", ProcessType::Validation));

    assert_eq!(configuration.max_concurrency, 4);
    assert_eq!(configuration.priority, 10);
    assert_eq!(configuration.message_ttl, Some(Duration::from_secs(24 * 60 * 60)));
}

#[test]
fn test_empty_client_is_rejected() {
    let result = RoutingContext::new("FirmA", "", ProcessType::Validation);
    assert!(matches!(result, Err(RoutingError::InvalidContext { .. })));
}

#[test]
fn test_concurrent_resolution_is_reference_identical() {
    let cache = Arc::new(QueueConfigurationCache::new());
    let ctx = context("FirmB", "Client3", ProcessType::UniverseSoiMapping);

    let resolved: Vec<_> = (0..32)
        .map(|_| {
            let cache = cache.clone();
            let ctx = ctx.clone();
            std::thread::spawn(move || cache.resolve(&ctx))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert!(resolved.iter().all(|c| Arc::ptr_eq(c, &resolved[0])));
    assert_eq!(cache.list_active().len(), 1);
}
