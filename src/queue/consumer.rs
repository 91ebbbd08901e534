//! Command consumer
//!
//! Pulls deliveries from one endpoint and dispatches them to the handler
//! registered for the endpoint's process type. Handlers are capabilities
//! looked up in a map, not subclasses.
//!
//! Acknowledgement policy:
//! - handler success: ack
//! - handler failure: reject with requeue, then raise `ConsumeFailure`
//! - undecodable body, wrong process type, no handler: reject without requeue

use crate::core::shutdown::CancellationSignal;
use crate::queue::broker::{Delivery, MessageBroker};
use crate::queue::error::BrokerError;
use crate::routing::api::{HandlerError, ProcessType, ProcessingCommand, RoutingError, RoutingResult};
use crate::topology::api::EndpointSpec;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Business processing boundary
#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn handles(&self, process_type: ProcessType) -> bool;

    async fn process(&self, command: &ProcessingCommand) -> Result<(), HandlerError>;
}

/// Map from process type to handler
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<ProcessType, Arc<dyn CommandHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for every process type it handles
    ///
    /// Returns the number of process types it was registered for. A later
    /// registration for the same process type replaces the earlier one.
    pub fn register(&mut self, handler: Arc<dyn CommandHandler>) -> usize {
        let mut registered = 0;
        for process_type in ProcessType::all() {
            if handler.handles(process_type) {
                self.handlers.insert(process_type, handler.clone());
                registered += 1;
            }
        }
        registered
    }

    pub fn get(&self, process_type: ProcessType) -> Option<Arc<dyn CommandHandler>> {
        self.handlers.get(&process_type).cloned()
    }

    pub fn process_types(&self) -> Vec<ProcessType> {
        let mut types: Vec<_> = self.handlers.keys().copied().collect();
        types.sort();
        types
    }
}

/// Outcome counts for a consumer run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerSummary {
    /// Handled and acknowledged
    pub processed: u64,
    /// Handler failed; requeued for redelivery
    pub failed: u64,
    /// Discarded without requeue (undecodable, misrouted, unhandled)
    pub rejected: u64,
}

impl ConsumerSummary {
    fn record(&mut self, endpoint: &str, result: RoutingResult<()>) {
        match result {
            Ok(()) => self.processed += 1,
            Err(e @ RoutingError::ConsumeFailure { .. }) => {
                log::warn!("{}: {}", endpoint, e);
                self.failed += 1;
            }
            Err(e) => {
                log::warn!("{}: delivery rejected: {}", endpoint, e);
                self.rejected += 1;
            }
        }
    }
}

pub struct CommandConsumer {
    broker: Arc<dyn MessageBroker>,
    endpoint: EndpointSpec,
    handlers: Arc<HandlerRegistry>,
}

impl CommandConsumer {
    pub fn new(
        broker: Arc<dyn MessageBroker>,
        endpoint: EndpointSpec,
        handlers: Arc<HandlerRegistry>,
    ) -> Self {
        Self {
            broker,
            endpoint,
            handlers,
        }
    }

    pub fn endpoint(&self) -> &EndpointSpec {
        &self.endpoint
    }

    /// Wait for one delivery and handle it
    pub async fn consume_one(&self) -> RoutingResult<()> {
        let delivery = self
            .broker
            .receive(&self.endpoint.name)
            .await
            .map_err(|e| RoutingError::broker("receive", e))?;
        self.handle_delivery(delivery).await
    }

    pub async fn handle_delivery(&self, delivery: Delivery) -> RoutingResult<()> {
        dispatch(
            self.broker.clone(),
            self.handlers.clone(),
            self.endpoint.process_type,
            delivery,
        )
        .await
    }

    /// Consume until cancelled or the endpoint goes away
    ///
    /// At most `concurrency_limit` deliveries are in flight. In-flight
    /// deliveries are drained before returning. Per-delivery failures are
    /// logged and counted; broker failures other than a closed connection
    /// end the run with an error. Use `consume_one` or `handle_delivery`
    /// when the caller needs the `ConsumeFailure` itself.
    pub async fn run(&self, cancel: &CancellationSignal) -> RoutingResult<ConsumerSummary> {
        let name = self.endpoint.name.as_str();
        self.broker
            .subscribe(name)
            .await
            .map_err(|e| RoutingError::broker("subscribe", e))?;

        log::debug!(
            "Consumer started on {} (concurrency {})",
            name,
            self.endpoint.concurrency_limit
        );

        let semaphore = Arc::new(Semaphore::new(self.endpoint.concurrency_limit.max(1)));
        let mut tasks = JoinSet::new();
        let mut summary = ConsumerSummary::default();
        let mut outcome = Ok(());

        loop {
            while let Some(joined) = tasks.try_join_next() {
                summary.record(name, flatten(joined));
            }

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                permit = semaphore.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let delivery = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                received = self.broker.receive(name) => match received {
                    Ok(delivery) => delivery,
                    Err(BrokerError::Closed) | Err(BrokerError::EndpointNotFound { .. }) => {
                        log::debug!("Endpoint {} is gone, stopping consumer", name);
                        break;
                    }
                    Err(e) => {
                        outcome = Err(RoutingError::broker("receive", e));
                        break;
                    }
                },
            };

            let broker = self.broker.clone();
            let handlers = self.handlers.clone();
            let process_type = self.endpoint.process_type;
            tasks.spawn(async move {
                let _permit = permit;
                dispatch(broker, handlers, process_type, delivery).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            summary.record(name, flatten(joined));
        }

        if let Err(e) = self.broker.disconnect(name).await {
            log::debug!("Disconnect from {} failed: {}", name, e);
        }

        log::debug!(
            "Consumer on {} stopped: {} processed, {} failed, {} rejected",
            name,
            summary.processed,
            summary.failed,
            summary.rejected
        );
        outcome.map(|()| summary)
    }
}

fn flatten(joined: Result<RoutingResult<()>, tokio::task::JoinError>) -> RoutingResult<()> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(RoutingError::broker(
            "dispatch",
            BrokerError::Transport {
                message: format!("delivery task aborted: {}", e),
            },
        )),
    }
}

async fn dispatch(
    broker: Arc<dyn MessageBroker>,
    handlers: Arc<HandlerRegistry>,
    endpoint_type: ProcessType,
    delivery: Delivery,
) -> RoutingResult<()> {
    let endpoint = delivery.endpoint.as_str();
    let tag = delivery.delivery_tag;

    let command = match ProcessingCommand::from_slice(&delivery.envelope.body) {
        Ok(command) => command,
        Err(e) => {
            reject(broker.as_ref(), endpoint, tag, false).await?;
            return Err(e);
        }
    };

    if command.process_type() != endpoint_type {
        reject(broker.as_ref(), endpoint, tag, false).await?;
        return Err(RoutingError::invalid_context(format!(
            "{} command {} delivered to {} endpoint {}",
            command.process_type(),
            command.command_id(),
            endpoint_type,
            endpoint
        )));
    }

    let Some(handler) = handlers.get(endpoint_type) else {
        reject(broker.as_ref(), endpoint, tag, false).await?;
        return Err(RoutingError::invalid_topology(format!(
            "no handler registered for {} on {}",
            endpoint_type, endpoint
        )));
    };

    log::debug!(
        "Processing {} {} from {} (redelivery {})",
        command.message_type(),
        command.command_id(),
        endpoint,
        delivery.redelivery_count
    );

    match handler.process(&command).await {
        Ok(()) => broker
            .ack(endpoint, tag)
            .await
            .map_err(|e| RoutingError::broker("ack", e)),
        Err(source) => {
            reject(broker.as_ref(), endpoint, tag, true).await?;
            Err(RoutingError::ConsumeFailure {
                command_id: command.command_id(),
                process_type: endpoint_type,
                source,
            })
        }
    }
}

async fn reject(
    broker: &dyn MessageBroker,
    endpoint: &str,
    delivery_tag: u64,
    requeue: bool,
) -> RoutingResult<()> {
    broker
        .reject(endpoint, delivery_tag, requeue)
        .await
        .map_err(|e| RoutingError::broker("reject", e))
}
