//! Command publisher
//!
//! Resolves and registers the command's queue configuration, asks the
//! topology for the wire topic of the command's context and hands the
//! envelope to the broker with the command id as correlation id.

use crate::core::shutdown::CancellationSignal;
use crate::core::version::schema_version;
use crate::queue::broker::{Envelope, MessageBroker, CANONICAL_KEY_HEADER, SCHEMA_HEADER};
use crate::queue::config_cache::QueueConfiguration;
use crate::queue::error::BrokerError;
use crate::routing::api::{ProcessingCommand, RoutingError, RoutingResult};
use crate::topology::api::TopologyConfigurator;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Publishes processing commands through a `MessageBroker`
///
/// # Example
///
/// ```rust,no_run
/// # use psprouter::core::shutdown::CancellationSignal;
/// # use psprouter::queue::api::{CommandPublisher, InMemoryBroker, QueueConfigurationCache};
/// # use psprouter::routing::api::*;
/// # use psprouter::topology::api::{TopologyConfigurator, TopologySettings};
/// # use std::sync::Arc;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cache = Arc::new(QueueConfigurationCache::new());
/// let topology = Arc::new(TopologyConfigurator::new(TopologySettings::default(), cache)?);
/// let broker = Arc::new(InMemoryBroker::new());
/// topology.declare_all(broker.as_ref()).await?;
///
/// let publisher = CommandPublisher::new(broker, topology);
/// let context = RoutingContext::new("FirmA", "Client7", ProcessType::Validation)?;
/// let command = ProcessingCommand::new(
///     context,
///     CommandPayload::Validation {
///         rule_set: "PriceValidation".to_string(),
///         validation_data: Default::default(),
///         severity: ValidationSeverity::Error,
///     },
/// )?;
/// publisher.publish(&command, &CancellationSignal::new()).await?;
/// # Ok(())
/// # }
/// ```
pub struct CommandPublisher {
    broker: Arc<dyn MessageBroker>,
    topology: Arc<TopologyConfigurator>,
}

impl CommandPublisher {
    pub fn new(broker: Arc<dyn MessageBroker>, topology: Arc<TopologyConfigurator>) -> Self {
        Self { broker, topology }
    }

    pub fn topology(&self) -> &Arc<TopologyConfigurator> {
        &self.topology
    }

    /// Publish one command
    ///
    /// Returns `Cancelled` if cancellation is observed before the envelope is
    /// handed to the broker. Once handed over the message is not retracted.
    pub async fn publish(
        &self,
        command: &ProcessingCommand,
        cancel: &CancellationSignal,
    ) -> RoutingResult<()> {
        let context = command.context();
        log::info!(
            "Starting publication of {} {} (firm: {}, client: {}, process type: {}, subscope: {})",
            command.message_type(),
            command.command_id(),
            context.firm(),
            context.client(),
            context.process_type(),
            context.subscope().unwrap_or("N/A")
        );

        if cancel.is_cancelled() {
            return Err(RoutingError::Cancelled);
        }

        let configuration = self.topology.register(context);
        let topic = self.topology.publish_topic(context);
        let envelope = build_envelope(command, &configuration, &topic)?;

        if cancel.is_cancelled() {
            return Err(RoutingError::Cancelled);
        }

        log::info!("Publishing with routing key {}", topic);
        match self.broker.publish(envelope).await {
            Ok(()) => {
                log::info!("Command {} published successfully", command.command_id());
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to publish command {}: {}", command.command_id(), e);
                Err(RoutingError::PublishFailure {
                    routing_key: topic,
                    source: e,
                })
            }
        }
    }

    /// Publish every command concurrently
    ///
    /// Completes when all succeed; otherwise fails with the first error
    /// observed. Commands already handed to the broker are not rolled back.
    pub async fn publish_batch(
        &self,
        commands: &[ProcessingCommand],
        cancel: &CancellationSignal,
    ) -> RoutingResult<()> {
        let batch_id = Uuid::new_v4();
        log::info!(
            "Starting batch {} publication of {} commands",
            batch_id,
            commands.len()
        );

        let publishes = commands.iter().map(|command| self.publish(command, cancel));
        match futures::future::try_join_all(publishes).await {
            Ok(_) => {
                log::info!("Batch {} publication completed successfully", batch_id);
                Ok(())
            }
            Err(e) => {
                log::error!("Batch {} publication failed: {}", batch_id, e);
                Err(e)
            }
        }
    }
}

fn build_envelope(
    command: &ProcessingCommand,
    configuration: &QueueConfiguration,
    topic: &str,
) -> RoutingResult<Envelope> {
    let body = serde_json::to_vec(command).map_err(|e| RoutingError::PublishFailure {
        routing_key: topic.to_string(),
        source: BrokerError::Encoding {
            message: e.to_string(),
        },
    })?;

    let mut headers = BTreeMap::new();
    headers.insert(SCHEMA_HEADER.to_string(), schema_version().to_string());
    headers.insert(
        CANONICAL_KEY_HEADER.to_string(),
        configuration.routing_key.clone(),
    );
    headers.insert("x-queue-name".to_string(), configuration.queue_name.clone());

    Ok(Envelope {
        routing_key: topic.to_string(),
        correlation_id: command.command_id(),
        message_type: command.message_type().to_string(),
        priority: configuration.priority,
        expiration: configuration.message_ttl,
        headers,
        body,
        published_at: Utc::now(),
    })
}
