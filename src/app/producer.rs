//! Deterministic sample command producer
//!
//! Cycles firms, clients, process types and universes so a demo run touches
//! every endpoint. Two producers created with the same seed emit the same
//! contexts in the same order.

use crate::core::shutdown::CancellationSignal;
use crate::queue::api::CommandPublisher;
use crate::routing::api::{
    CommandPayload, ProcessType, ProcessingCommand, RoutingContext, RoutingResult,
    ValidationSeverity,
};
use chrono::Utc;
use serde_json::json;
use std::collections::BTreeMap;

const PRODUCER_NAME: &str = "psprouter";
const CREATED_BY: &str = "SampleProducer";

const FIRMS: &[&str] = &["firm1", "firm2", "firm3"];
const CLIENTS: &[&str] = &["client1", "client2", "client3", "client4"];
const UNIVERSES: &[Option<&str>] = &[
    Some("fxuniverse1"),
    Some("soiuniverse1"),
    Some("equityuniverse1"),
    Some("bonduniverse1"),
    None,
];
const SECURITY_IDS: &[&str] = &["AAPL", "MSFT", "GOOGL", "TSLA", "AMZN", "META", "NFLX", "NVDA"];
const MAPPING_TYPES: &[&str] = &["ISIN_TO_CUSIP", "BLOOMBERG_TO_REUTERS", "INTERNAL_TO_EXTERNAL"];
const SOI_TYPES: &[&str] = &["EQUITY", "BOND", "OPTION", "FUTURE"];
const RULE_SETS: &[&str] = &[
    "BASIC_VALIDATION",
    "EXTENDED_VALIDATION",
    "COMPLIANCE_CHECK",
    "DATA_QUALITY",
];
const SEVERITIES: &[ValidationSeverity] = &[
    ValidationSeverity::Info,
    ValidationSeverity::Warning,
    ValidationSeverity::Error,
    ValidationSeverity::Critical,
];

fn pick<T: Copy>(items: &[T], n: usize) -> T {
    items[n % items.len()]
}

#[derive(Debug, Clone, Default)]
pub struct SampleProducer {
    sequence: usize,
}

impl SampleProducer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the cycle at `seed` instead of zero
    pub fn with_seed(seed: usize) -> Self {
        Self { sequence: seed }
    }

    /// Number of commands produced so far (plus the seed)
    pub fn sequence(&self) -> usize {
        self.sequence
    }

    pub fn next_command(&mut self) -> RoutingResult<ProcessingCommand> {
        let n = self.sequence;
        self.sequence += 1;

        let process_type = pick(&ProcessType::all(), n);
        let firm = pick(FIRMS, n / 4);
        let client = pick(CLIENTS, n / 12);
        let context = RoutingContext::new(firm, client, process_type)?
            .with_subscope(pick(UNIVERSES, n).unwrap_or_default())?;

        let payload = sample_payload(process_type, &context, n);
        Ok(ProcessingCommand::new(context, payload)?
            .with_metadata("Producer", PRODUCER_NAME)
            .with_metadata("CreatedBy", CREATED_BY))
    }

    pub fn batch(&mut self, size: usize) -> RoutingResult<Vec<ProcessingCommand>> {
        (0..size).map(|_| self.next_command()).collect()
    }

    /// Produce and publish `batches` batches of `batch_size` commands
    ///
    /// Stops early, without error, once cancellation is requested between
    /// batches. Returns the number of commands published.
    pub async fn publish_batches(
        &mut self,
        publisher: &CommandPublisher,
        batches: usize,
        batch_size: usize,
        cancel: &CancellationSignal,
    ) -> RoutingResult<usize> {
        let mut published = 0;
        for batch_number in 1..=batches {
            if cancel.is_cancelled() {
                log::info!("Producer stopped after {} batch(es)", batch_number - 1);
                break;
            }
            let commands = self.batch(batch_size)?;
            log::info!(
                "Publishing batch {}/{} of {} messages",
                batch_number,
                batches,
                commands.len()
            );
            publisher.publish_batch(&commands, cancel).await?;
            published += commands.len();
        }
        Ok(published)
    }
}

fn sample_payload(process_type: ProcessType, context: &RoutingContext, n: usize) -> CommandPayload {
    match process_type {
        ProcessType::SecurityAggregation => CommandPayload::SecurityAggregation {
            security_id: pick(SECURITY_IDS, n).to_string(),
            processing_date: Utc::now().date_naive(),
            security_groups: (0..1 + n % 3)
                .map(|g| format!("Group{}", 1 + (n + g * 4) % 9))
                .collect(),
        },
        ProcessType::SecurityMapping => CommandPayload::SecurityMapping {
            source_security_id: pick(SECURITY_IDS, n).to_string(),
            target_security_id: pick(SECURITY_IDS, n + 3).to_string(),
            mapping_type: pick(MAPPING_TYPES, n).to_string(),
        },
        ProcessType::UniverseSoiMapping => CommandPayload::UniverseSoiMapping {
            universe_id: context.subscope().unwrap_or("defaultuniverse").to_string(),
            security_ids: (0..2 + n % 4)
                .map(|i| pick(SECURITY_IDS, n + i).to_string())
                .collect(),
            soi_type: pick(SOI_TYPES, n).to_string(),
        },
        ProcessType::Validation => {
            let mut validation_data = BTreeMap::new();
            validation_data.insert("SecurityId".to_string(), json!(pick(SECURITY_IDS, n)));
            let price = ((n * 3_719) % 100_000) as f64 / 100.0;
            validation_data.insert("Price".to_string(), json!(price));
            validation_data.insert("Volume".to_string(), json!(1_000 + (n * 7_919) % 99_000));
            validation_data.insert("Timestamp".to_string(), json!(Utc::now().to_rfc3339()));
            CommandPayload::Validation {
                rule_set: pick(RULE_SETS, n).to_string(),
                validation_data,
                severity: pick(SEVERITIES, n / 4),
            }
        }
    }
}
