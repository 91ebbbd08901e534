//! Common test utilities and helpers
//!
//! Fixtures shared by the integration tests: contexts, commands and a fully
//! wired in-memory routing stack.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use psprouter::queue::api::*;
use psprouter::routing::api::*;
use psprouter::topology::api::*;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub fn context(firm: &str, client: &str, process_type: ProcessType) -> RoutingContext {
    RoutingContext::new(firm, client, process_type).expect("valid context")
}

pub fn payload_for(process_type: ProcessType) -> CommandPayload {
    match process_type {
        ProcessType::SecurityAggregation => CommandPayload::SecurityAggregation {
            security_id: "TSLA".to_string(),
            processing_date: NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid date"),
            security_groups: vec!["Group2".to_string(), "Group5".to_string()],
        },
        ProcessType::SecurityMapping => CommandPayload::SecurityMapping {
            source_security_id: "AMZN".to_string(),
            target_security_id: "META".to_string(),
            mapping_type: "BLOOMBERG_TO_REUTERS".to_string(),
        },
        ProcessType::UniverseSoiMapping => CommandPayload::UniverseSoiMapping {
            universe_id: "bonduniverse1".to_string(),
            security_ids: vec!["NFLX".to_string()],
            soi_type: "BOND".to_string(),
        },
        ProcessType::Validation => CommandPayload::Validation {
            rule_set: "DATA_QUALITY".to_string(),
            validation_data: BTreeMap::new(),
            severity: ValidationSeverity::Warning,
        },
    }
}

pub fn command(firm: &str, client: &str, process_type: ProcessType) -> ProcessingCommand {
    ProcessingCommand::new(context(firm, client, process_type), payload_for(process_type))
        .expect("valid command")
}

/// Commands for `clients` clients across every process type
pub fn command_grid(clients: usize) -> Vec<ProcessingCommand> {
    let mut commands = Vec::new();
    for process_type in ProcessType::all() {
        for i in 0..clients {
            let firm = format!("Firm{}", i % 3);
            commands.push(command(&firm, &format!("Client{}", i), process_type));
        }
    }
    commands
}

pub struct Stack {
    pub broker: Arc<InMemoryBroker>,
    pub topology: Arc<TopologyConfigurator>,
    pub publisher: CommandPublisher,
}

pub async fn stack(settings: TopologySettings) -> Stack {
    stack_on(Arc::new(InMemoryBroker::new()), settings).await
}

/// Wire another instance onto an existing broker
pub async fn stack_on(broker: Arc<InMemoryBroker>, settings: TopologySettings) -> Stack {
    let cache = Arc::new(QueueConfigurationCache::new());
    let topology = Arc::new(TopologyConfigurator::new(settings, cache).expect("valid topology"));
    topology
        .declare_all(broker.as_ref())
        .await
        .expect("declare endpoints");
    let publisher = CommandPublisher::new(broker.clone(), topology.clone());
    Stack {
        broker,
        topology,
        publisher,
    }
}

/// Records every command it processes, tagged with the endpoint's process type
#[derive(Default)]
pub struct RecordingHandler {
    seen: Mutex<Vec<ProcessingCommand>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<ProcessingCommand> {
        self.seen.lock().expect("handler lock").clone()
    }
}

#[async_trait]
impl CommandHandler for RecordingHandler {
    fn handles(&self, _process_type: ProcessType) -> bool {
        true
    }

    async fn process(&self, command: &ProcessingCommand) -> Result<(), HandlerError> {
        self.seen.lock().expect("handler lock").push(command.clone());
        Ok(())
    }
}
