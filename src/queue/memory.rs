//! In-memory topic exchange
//!
//! Endpoints hold a priority-ordered ready list and a set of unacknowledged
//! deliveries. Rejected messages are requeued until the redelivery limit,
//! then moved to the dead-letter list along with expired messages.

use crate::queue::broker::{Delivery, Envelope, MessageBroker};
use crate::queue::error::{BrokerError, BrokerResult};
use crate::routing::api::BindPattern;
use crate::topology::api::EndpointSpec;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

pub const DEFAULT_MAX_DEPTH: usize = 10_000;
pub const DEFAULT_MAX_REDELIVERIES: u32 = 5;

/// Per-endpoint counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointStats {
    pub published: u64,
    pub delivered: u64,
    pub acked: u64,
    pub rejected: u64,
    pub redelivered: u64,
    pub dead_lettered: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadLetterReason {
    Expired,
    Rejected,
    MaxRedeliveries,
}

#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub endpoint: String,
    pub reason: DeadLetterReason,
    pub redelivery_count: u32,
    pub envelope: Envelope,
}

#[derive(Debug, Clone)]
struct Pending {
    envelope: Envelope,
    redelivery_count: u32,
}

#[derive(Debug)]
struct EndpointState {
    bindings: Vec<BindPattern>,
    auto_delete: bool,
    ready: VecDeque<Pending>,
    unacked: HashMap<u64, Pending>,
    consumers: usize,
    notify: Arc<Notify>,
    stats: EndpointStats,
}

impl EndpointState {
    fn accepts(&self, topic: &str) -> bool {
        self.bindings.iter().any(|pattern| pattern.matches(topic))
    }

    // Higher priority first, FIFO within a priority
    fn enqueue(&mut self, pending: Pending) {
        let priority = pending.envelope.priority;
        let position = self
            .ready
            .iter()
            .position(|queued| queued.envelope.priority < priority)
            .unwrap_or(self.ready.len());
        self.ready.insert(position, pending);
        self.notify.notify_one();
    }
}

#[derive(Debug, Default)]
struct BrokerState {
    endpoints: BTreeMap<String, EndpointState>,
    dead_letters: Vec<DeadLetter>,
    next_delivery_tag: u64,
    closed: bool,
}

impl BrokerState {
    fn dead_letter(
        &mut self,
        endpoint: &str,
        reason: DeadLetterReason,
        pending: Pending,
    ) {
        log::debug!(
            "Dead-lettering message {} from {} ({:?})",
            pending.envelope.correlation_id,
            endpoint,
            reason
        );
        if let Some(state) = self.endpoints.get_mut(endpoint) {
            state.stats.dead_lettered += 1;
        }
        self.dead_letters.push(DeadLetter {
            endpoint: endpoint.to_string(),
            reason,
            redelivery_count: pending.redelivery_count,
            envelope: pending.envelope,
        });
    }
}

/// Topic exchange held entirely in process memory
#[derive(Debug)]
pub struct InMemoryBroker {
    state: Mutex<BrokerState>,
    max_depth: usize,
    max_redeliveries: u32,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_DEPTH, DEFAULT_MAX_REDELIVERIES)
    }

    pub fn with_limits(max_depth: usize, max_redeliveries: u32) -> Self {
        Self {
            state: Mutex::new(BrokerState::default()),
            max_depth,
            max_redeliveries,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Take the next ready delivery without waiting
    pub fn try_receive(&self, endpoint: &str) -> BrokerResult<Option<Delivery>> {
        let mut state = self.lock();
        Self::take_ready(&mut state, endpoint)
    }

    fn take_ready(state: &mut BrokerState, endpoint: &str) -> BrokerResult<Option<Delivery>> {
        if state.closed {
            return Err(BrokerError::Closed);
        }

        let now = Utc::now();
        loop {
            let endpoint_state =
                state
                    .endpoints
                    .get_mut(endpoint)
                    .ok_or_else(|| BrokerError::EndpointNotFound {
                        endpoint: endpoint.to_string(),
                    })?;

            let Some(pending) = endpoint_state.ready.pop_front() else {
                return Ok(None);
            };

            if pending.envelope.is_expired_at(now) {
                state.dead_letter(endpoint, DeadLetterReason::Expired, pending);
                continue;
            }

            state.next_delivery_tag += 1;
            let delivery_tag = state.next_delivery_tag;
            let delivery = Delivery {
                delivery_tag,
                endpoint: endpoint.to_string(),
                redelivery_count: pending.redelivery_count,
                envelope: pending.envelope.clone(),
            };

            if let Some(endpoint_state) = state.endpoints.get_mut(endpoint) {
                endpoint_state.stats.delivered += 1;
                endpoint_state.unacked.insert(delivery_tag, pending);
            }
            return Ok(Some(delivery));
        }
    }

    /// Stop the broker; pending and future operations fail with `Closed`
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        for endpoint in state.endpoints.values() {
            endpoint.notify.notify_waiters();
            endpoint.notify.notify_one();
        }
    }

    pub fn endpoint_names(&self) -> Vec<String> {
        self.lock().endpoints.keys().cloned().collect()
    }

    /// Messages waiting for delivery on an endpoint
    pub fn depth(&self, endpoint: &str) -> Option<usize> {
        self.lock().endpoints.get(endpoint).map(|e| e.ready.len())
    }

    /// Delivered but not yet acknowledged
    pub fn in_flight(&self, endpoint: &str) -> Option<usize> {
        self.lock().endpoints.get(endpoint).map(|e| e.unacked.len())
    }

    pub fn consumer_count(&self, endpoint: &str) -> Option<usize> {
        self.lock().endpoints.get(endpoint).map(|e| e.consumers)
    }

    pub fn stats(&self, endpoint: &str) -> Option<EndpointStats> {
        self.lock().endpoints.get(endpoint).map(|e| e.stats)
    }

    pub fn all_stats(&self) -> BTreeMap<String, EndpointStats> {
        self.lock()
            .endpoints
            .iter()
            .map(|(name, e)| (name.clone(), e.stats))
            .collect()
    }

    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.lock().dead_letters.clone()
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn declare_endpoint(&self, endpoint: &EndpointSpec) -> BrokerResult<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(BrokerError::Closed);
        }

        match state.endpoints.get_mut(&endpoint.name) {
            Some(existing) => {
                for binding in &endpoint.bindings {
                    if !existing.bindings.contains(binding) {
                        existing.bindings.push(binding.clone());
                    }
                }
            }
            None => {
                log::debug!(
                    "Declared endpoint {} with {} binding(s)",
                    endpoint.name,
                    endpoint.bindings.len()
                );
                state.endpoints.insert(
                    endpoint.name.clone(),
                    EndpointState {
                        bindings: endpoint.bindings.clone(),
                        auto_delete: endpoint.auto_delete,
                        ready: VecDeque::new(),
                        unacked: HashMap::new(),
                        consumers: 0,
                        notify: Arc::new(Notify::new()),
                        stats: EndpointStats::default(),
                    },
                );
            }
        }
        Ok(())
    }

    async fn publish(&self, envelope: Envelope) -> BrokerResult<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(BrokerError::Closed);
        }

        let targets: Vec<String> = state
            .endpoints
            .iter()
            .filter(|(_, e)| e.accepts(&envelope.routing_key))
            .map(|(name, _)| name.clone())
            .collect();

        if targets.is_empty() {
            return Err(BrokerError::Unroutable {
                topic: envelope.routing_key,
            });
        }

        // All-or-nothing: check every target before enqueueing anywhere
        for name in &targets {
            if let Some(endpoint) = state.endpoints.get(name) {
                if endpoint.ready.len() >= self.max_depth {
                    return Err(BrokerError::QueueFull {
                        endpoint: name.clone(),
                        max_depth: self.max_depth,
                    });
                }
            }
        }

        for name in &targets {
            if let Some(endpoint) = state.endpoints.get_mut(name) {
                endpoint.stats.published += 1;
                endpoint.enqueue(Pending {
                    envelope: envelope.clone(),
                    redelivery_count: 0,
                });
            }
        }
        Ok(())
    }

    async fn subscribe(&self, endpoint: &str) -> BrokerResult<()> {
        let mut state = self.lock();
        let endpoint_state =
            state
                .endpoints
                .get_mut(endpoint)
                .ok_or_else(|| BrokerError::EndpointNotFound {
                    endpoint: endpoint.to_string(),
                })?;
        endpoint_state.consumers += 1;
        Ok(())
    }

    async fn receive(&self, endpoint: &str) -> BrokerResult<Delivery> {
        loop {
            let notify = {
                let mut state = self.lock();
                if let Some(delivery) = Self::take_ready(&mut state, endpoint)? {
                    return Ok(delivery);
                }
                match state.endpoints.get(endpoint) {
                    Some(e) => e.notify.clone(),
                    None => {
                        return Err(BrokerError::EndpointNotFound {
                            endpoint: endpoint.to_string(),
                        })
                    }
                }
            };
            // notify_one stores a permit, so a publish between unlock and here is not lost
            notify.notified().await;
        }
    }

    async fn ack(&self, endpoint: &str, delivery_tag: u64) -> BrokerResult<()> {
        let mut state = self.lock();
        let endpoint_state =
            state
                .endpoints
                .get_mut(endpoint)
                .ok_or_else(|| BrokerError::EndpointNotFound {
                    endpoint: endpoint.to_string(),
                })?;

        match endpoint_state.unacked.remove(&delivery_tag) {
            Some(_) => {
                endpoint_state.stats.acked += 1;
                Ok(())
            }
            None => Err(BrokerError::UnknownDelivery {
                endpoint: endpoint.to_string(),
                delivery_tag,
            }),
        }
    }

    async fn reject(
        &self,
        endpoint: &str,
        delivery_tag: u64,
        requeue: bool,
    ) -> BrokerResult<()> {
        let mut state = self.lock();
        let endpoint_state =
            state
                .endpoints
                .get_mut(endpoint)
                .ok_or_else(|| BrokerError::EndpointNotFound {
                    endpoint: endpoint.to_string(),
                })?;

        let mut pending = endpoint_state.unacked.remove(&delivery_tag).ok_or_else(|| {
            BrokerError::UnknownDelivery {
                endpoint: endpoint.to_string(),
                delivery_tag,
            }
        })?;
        endpoint_state.stats.rejected += 1;

        if !requeue {
            state.dead_letter(endpoint, DeadLetterReason::Rejected, pending);
            return Ok(());
        }

        if pending.redelivery_count >= self.max_redeliveries {
            state.dead_letter(endpoint, DeadLetterReason::MaxRedeliveries, pending);
            return Ok(());
        }

        pending.redelivery_count += 1;
        endpoint_state.stats.redelivered += 1;
        endpoint_state.enqueue(pending);
        Ok(())
    }

    async fn disconnect(&self, endpoint: &str) -> BrokerResult<()> {
        let mut state = self.lock();
        let Some(endpoint_state) = state.endpoints.get_mut(endpoint) else {
            // Already torn down by another consumer of an auto-delete endpoint
            return Ok(());
        };

        endpoint_state.consumers = endpoint_state.consumers.saturating_sub(1);
        if endpoint_state.auto_delete && endpoint_state.consumers == 0 {
            if let Some(removed) = state.endpoints.remove(endpoint) {
                log::debug!(
                    "Auto-deleted endpoint {} ({} message(s) discarded)",
                    endpoint,
                    removed.ready.len() + removed.unacked.len()
                );
                removed.notify.notify_waiters();
                removed.notify.notify_one();
            }
        }
        Ok(())
    }
}
