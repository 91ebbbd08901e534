//! Shared fixtures for queue tests

use crate::queue::api::*;
use crate::routing::api::*;
use crate::topology::api::*;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn context(client: &str, process_type: ProcessType) -> RoutingContext {
    RoutingContext::new("FirmA", client, process_type).expect("valid context")
}

pub fn payload_for(process_type: ProcessType) -> CommandPayload {
    match process_type {
        ProcessType::SecurityAggregation => CommandPayload::SecurityAggregation {
            security_id: "AAPL".to_string(),
            processing_date: NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid date"),
            security_groups: vec!["Group1".to_string()],
        },
        ProcessType::SecurityMapping => CommandPayload::SecurityMapping {
            source_security_id: "MSFT".to_string(),
            target_security_id: "GOOGL".to_string(),
            mapping_type: "ISIN_TO_CUSIP".to_string(),
        },
        ProcessType::UniverseSoiMapping => CommandPayload::UniverseSoiMapping {
            universe_id: "equityuniverse1".to_string(),
            security_ids: vec!["AAPL".to_string(), "NVDA".to_string()],
            soi_type: "EQUITY".to_string(),
        },
        ProcessType::Validation => CommandPayload::Validation {
            rule_set: "PriceValidation".to_string(),
            validation_data: BTreeMap::new(),
            severity: ValidationSeverity::Error,
        },
    }
}

pub fn command(client: &str, process_type: ProcessType) -> ProcessingCommand {
    ProcessingCommand::new(context(client, process_type), payload_for(process_type))
        .expect("valid command")
}

/// Broker, topology and publisher wired together with endpoints declared
pub async fn wired(
    settings: TopologySettings,
) -> (Arc<InMemoryBroker>, Arc<TopologyConfigurator>, CommandPublisher) {
    let cache = Arc::new(QueueConfigurationCache::new());
    let topology = Arc::new(TopologyConfigurator::new(settings, cache).expect("valid topology"));
    let broker = Arc::new(InMemoryBroker::new());
    topology
        .declare_all(broker.as_ref())
        .await
        .expect("declare endpoints");
    let publisher = CommandPublisher::new(broker.clone(), topology.clone());
    (broker, topology, publisher)
}

/// Handler that counts calls and fails the first `failures` of them
pub struct CountingHandler {
    pub process_type: ProcessType,
    pub calls: AtomicUsize,
    pub failures: usize,
}

impl CountingHandler {
    pub fn new(process_type: ProcessType) -> Arc<Self> {
        Self::failing(process_type, 0)
    }

    pub fn failing(process_type: ProcessType, failures: usize) -> Arc<Self> {
        Arc::new(Self {
            process_type,
            calls: AtomicUsize::new(0),
            failures,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CommandHandler for CountingHandler {
    fn handles(&self, process_type: ProcessType) -> bool {
        process_type == self.process_type
    }

    async fn process(&self, _command: &ProcessingCommand) -> Result<(), HandlerError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(format!("simulated failure {}", call + 1).into());
        }
        Ok(())
    }
}

/// Broker whose publish always fails
pub struct FailingBroker;

#[async_trait]
impl MessageBroker for FailingBroker {
    async fn declare_endpoint(&self, _endpoint: &EndpointSpec) -> BrokerResult<()> {
        Ok(())
    }

    async fn publish(&self, _envelope: Envelope) -> BrokerResult<()> {
        Err(BrokerError::Transport {
            message: "connection reset".to_string(),
        })
    }

    async fn subscribe(&self, _endpoint: &str) -> BrokerResult<()> {
        Ok(())
    }

    async fn receive(&self, _endpoint: &str) -> BrokerResult<Delivery> {
        Err(BrokerError::Closed)
    }

    async fn ack(&self, _endpoint: &str, _delivery_tag: u64) -> BrokerResult<()> {
        Ok(())
    }

    async fn reject(
        &self,
        _endpoint: &str,
        _delivery_tag: u64,
        _requeue: bool,
    ) -> BrokerResult<()> {
        Ok(())
    }

    async fn disconnect(&self, _endpoint: &str) -> BrokerResult<()> {
        Ok(())
    }
}
