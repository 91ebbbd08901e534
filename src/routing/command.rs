//! Processing commands
//!
//! A command pairs a routing context with a typed payload. The payload's
//! process type must agree with the context's, which is checked on
//! construction and again on decode.

use crate::routing::context::RoutingContext;
use crate::routing::error::{RoutingError, RoutingResult};
use crate::routing::process_type::ProcessType;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationSeverity {
    Info,
    Warning,
    #[default]
    Error,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command_type", rename_all = "snake_case")]
pub enum CommandPayload {
    SecurityAggregation {
        security_id: String,
        processing_date: NaiveDate,
        #[serde(default)]
        security_groups: Vec<String>,
    },
    SecurityMapping {
        source_security_id: String,
        target_security_id: String,
        mapping_type: String,
    },
    UniverseSoiMapping {
        universe_id: String,
        security_ids: Vec<String>,
        soi_type: String,
    },
    Validation {
        rule_set: String,
        validation_data: BTreeMap<String, Value>,
        #[serde(default)]
        severity: ValidationSeverity,
    },
}

impl CommandPayload {
    pub fn process_type(&self) -> ProcessType {
        match self {
            Self::SecurityAggregation { .. } => ProcessType::SecurityAggregation,
            Self::SecurityMapping { .. } => ProcessType::SecurityMapping,
            Self::UniverseSoiMapping { .. } => ProcessType::UniverseSoiMapping,
            Self::Validation { .. } => ProcessType::Validation,
        }
    }

    /// Message type name stamped on the envelope
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::SecurityAggregation { .. } => "SecurityAggregationCommand",
            Self::SecurityMapping { .. } => "SecurityMappingCommand",
            Self::UniverseSoiMapping { .. } => "UniverseSOIMappingCommand",
            Self::Validation { .. } => "ValidationCommand",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingCommand {
    command_id: Uuid,
    context: RoutingContext,
    created_at: DateTime<Utc>,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
    payload: CommandPayload,
}

impl ProcessingCommand {
    pub fn new(context: RoutingContext, payload: CommandPayload) -> RoutingResult<Self> {
        let command = Self {
            command_id: Uuid::new_v4(),
            context,
            created_at: Utc::now(),
            metadata: BTreeMap::new(),
            payload,
        };
        command.validate()?;
        Ok(command)
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Decode a command body and check payload/context agreement
    pub fn from_slice(body: &[u8]) -> RoutingResult<Self> {
        let command: Self = serde_json::from_slice(body).map_err(|e| {
            RoutingError::invalid_context(format!("undecodable command body: {}", e))
        })?;
        command.validate()?;
        Ok(command)
    }

    pub fn validate(&self) -> RoutingResult<()> {
        let payload_type = self.payload.process_type();
        if payload_type != self.context.process_type() {
            return Err(RoutingError::invalid_context(format!(
                "{} payload cannot travel under a {} context ({})",
                payload_type,
                self.context.process_type(),
                self.context.routing_key()
            )));
        }
        Ok(())
    }

    pub fn command_id(&self) -> Uuid {
        self.command_id
    }

    pub fn context(&self) -> &RoutingContext {
        &self.context
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    pub fn payload(&self) -> &CommandPayload {
        &self.payload
    }

    pub fn process_type(&self) -> ProcessType {
        self.context.process_type()
    }

    pub fn message_type(&self) -> &'static str {
        self.payload.message_type()
    }
}
