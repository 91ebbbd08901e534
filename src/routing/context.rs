//! Routing context and routing-key derivation
//!
//! A `RoutingContext` is the immutable (firm, client, process type, optional
//! sub-scope) tuple that decides where a command belongs. The canonical
//! routing key is `<firm>.<client>.<processtype>[.<subscope>]`, lowercase and
//! dot-delimited. Derivation is pure: no I/O, no clock, no randomness.

use crate::core::validation::validate_segment;
use crate::routing::error::{RoutingError, RoutingResult};
use crate::routing::process_type::ProcessType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Client-segment prefix reserved for partition buckets on the wire
pub const RESERVED_CLIENT_PREFIX: &str = "client-hash-";

/// Prefix of every queue and endpoint name
pub const QUEUE_NAME_PREFIX: &str = "psp";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRoutingContext")]
pub struct RoutingContext {
    firm: String,
    client: String,
    process_type: ProcessType,
    #[serde(skip_serializing_if = "Option::is_none")]
    subscope: Option<String>,
}

/// Unvalidated wire form, checked through `RoutingContext::new`
#[derive(Deserialize)]
struct RawRoutingContext {
    firm: String,
    client: String,
    process_type: ProcessType,
    #[serde(default)]
    subscope: Option<String>,
}

impl TryFrom<RawRoutingContext> for RoutingContext {
    type Error = RoutingError;

    fn try_from(raw: RawRoutingContext) -> RoutingResult<Self> {
        let context = RoutingContext::new(raw.firm, raw.client, raw.process_type)?;
        match raw.subscope {
            Some(subscope) => context.with_subscope(subscope),
            None => Ok(context),
        }
    }
}

impl RoutingContext {
    /// Build a context without sub-scope
    ///
    /// Fails with `InvalidContext` when firm or client is empty, contains a
    /// topic-grammar character or whitespace, when the client uses the
    /// reserved `client-hash-` prefix, or when the client equals a process
    /// type token.
    pub fn new(
        firm: impl Into<String>,
        client: impl Into<String>,
        process_type: ProcessType,
    ) -> RoutingResult<Self> {
        let firm = firm.into();
        let client = client.into();

        validate_segment("firm", &firm).map_err(RoutingError::invalid_context)?;
        validate_segment("client", &client).map_err(RoutingError::invalid_context)?;

        if client.to_lowercase().starts_with(RESERVED_CLIENT_PREFIX) {
            return Err(RoutingError::invalid_context(format!(
                "client '{}' uses the reserved prefix '{}'",
                client, RESERVED_CLIENT_PREFIX
            )));
        }

        if ProcessType::is_token(&client) {
            return Err(RoutingError::invalid_context(format!(
                "client '{}' collides with a process type name",
                client
            )));
        }

        Ok(Self {
            firm,
            client,
            process_type,
            subscope: None,
        })
    }

    /// Attach a sub-scope (e.g. a universe identifier)
    ///
    /// An empty sub-scope means "no sub-scope".
    pub fn with_subscope(mut self, subscope: impl Into<String>) -> RoutingResult<Self> {
        let subscope = subscope.into();
        if subscope.is_empty() {
            self.subscope = None;
            return Ok(self);
        }

        validate_segment("subscope", &subscope).map_err(RoutingError::invalid_context)?;
        self.subscope = Some(subscope);
        Ok(self)
    }

    pub fn firm(&self) -> &str {
        &self.firm
    }

    pub fn client(&self) -> &str {
        &self.client
    }

    pub fn process_type(&self) -> ProcessType {
        self.process_type
    }

    pub fn subscope(&self) -> Option<&str> {
        self.subscope.as_deref()
    }

    pub fn firm_segment(&self) -> String {
        self.firm.to_lowercase()
    }

    pub fn client_segment(&self) -> String {
        self.client.to_lowercase()
    }

    pub fn subscope_segment(&self) -> Option<String> {
        self.subscope.as_ref().map(|s| s.to_lowercase())
    }

    /// Canonical routing key: `<firm>.<client>.<processtype>[.<subscope>]`
    pub fn routing_key(&self) -> String {
        let mut key = format!(
            "{}.{}.{}",
            self.firm_segment(),
            self.client_segment(),
            self.process_type.token()
        );
        if let Some(subscope) = self.subscope_segment() {
            key.push('.');
            key.push_str(&subscope);
        }
        key
    }

    /// Queue name for this context: `psp-<routing key with '-' for '.'>`
    pub fn queue_name(&self) -> String {
        format!("{}.{}", QUEUE_NAME_PREFIX, self.routing_key()).replace('.', "-")
    }
}

impl fmt::Display for RoutingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.routing_key())
    }
}
