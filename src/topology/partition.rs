//! Hash partitioning of clients across worker endpoints
//!
//! Wire contract shared by publishers and bind-pattern generation:
//!
//! ```text
//! bucket k      = H(lowercase(client)) mod worker_count
//! bucket segment = client-hash-<k+1>
//! wire topic    = <firm>.client-hash-<k+1>.<client>.<processtype>[.<subscope>]
//! worker i binds  *.client-hash-i.*.<processtype>
//!                 *.client-hash-i.*.<processtype>.*
//! ```
//!
//! `H` is the first eight bytes of SHA-256, read big-endian, so the bucket
//! of a client never depends on the process, host or build.

use crate::routing::api::{
    BindPattern, PatternSegment, ProcessType, RoutingContext, RoutingError, RoutingResult,
    RESERVED_CLIENT_PREFIX,
};
use sha2::{Digest, Sha256};

/// Stable 64-bit hash of a client identifier, case-insensitive
pub fn client_hash(client: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(client.to_lowercase().as_bytes());
    let digest = hasher.finalize();

    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}

/// Topic segment naming a 1-based worker bucket
pub fn bucket_segment(worker_number: usize) -> String {
    format!("{}{}", RESERVED_CLIENT_PREFIX, worker_number)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionAssigner {
    process_type: ProcessType,
    worker_count: usize,
    catch_all_workers: usize,
}

impl PartitionAssigner {
    /// `catch_all_workers` is clamped to `worker_count`
    pub fn new(
        process_type: ProcessType,
        worker_count: usize,
        catch_all_workers: usize,
    ) -> RoutingResult<Self> {
        if worker_count == 0 {
            return Err(RoutingError::invalid_topology(format!(
                "worker count for {} must be positive",
                process_type.token()
            )));
        }

        Ok(Self {
            process_type,
            worker_count,
            catch_all_workers: catch_all_workers.min(worker_count),
        })
    }

    pub fn process_type(&self) -> ProcessType {
        self.process_type
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn catch_all_workers(&self) -> usize {
        self.catch_all_workers
    }

    /// 0-based partition of a client
    pub fn worker_index(&self, client: &str) -> usize {
        (client_hash(client) % self.worker_count as u64) as usize
    }

    /// 1-based worker owning a client
    pub fn worker_number(&self, client: &str) -> usize {
        self.worker_index(client) + 1
    }

    /// Wire topic carrying the client's bucket ahead of the client segment
    pub fn partition_topic(&self, context: &RoutingContext) -> String {
        let mut topic = format!(
            "{}.{}.{}.{}",
            context.firm_segment(),
            bucket_segment(self.worker_number(context.client())),
            context.client_segment(),
            context.process_type().token()
        );
        if let Some(subscope) = context.subscope_segment() {
            topic.push('.');
            topic.push_str(&subscope);
        }
        topic
    }

    /// Patterns owned exclusively by worker `worker_number` (1-based)
    pub fn exclusive_patterns(&self, worker_number: usize) -> [BindPattern; 2] {
        let bucket = PatternSegment::Literal(bucket_segment(worker_number));
        let token = PatternSegment::Literal(self.process_type.token().to_string());
        let plain = vec![
            PatternSegment::AnyOne,
            bucket,
            PatternSegment::AnyOne,
            token,
        ];
        let mut scoped = plain.clone();
        scoped.push(PatternSegment::AnyOne);

        [
            BindPattern::from_segments(plain),
            BindPattern::from_segments(scoped),
        ]
    }

    /// Process-type-wide patterns over the canonical key grammar
    pub fn catch_all_patterns(&self) -> [BindPattern; 2] {
        BindPattern::canonical_for(self.process_type)
    }

    /// 1-based workers that also consume the overflow endpoint
    pub fn catch_all_consumers(&self) -> Vec<usize> {
        (1..=self.catch_all_workers).collect()
    }

    /// Number of clients per 0-based partition
    pub fn distribution<'a, I>(&self, clients: I) -> Vec<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts = vec![0; self.worker_count];
        for client in clients {
            counts[self.worker_index(client)] += 1;
        }
        counts
    }
}
