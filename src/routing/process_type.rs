//! Process types carried by every routing context

use crate::routing::error::{RoutingError, RoutingResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Kind of processing a command asks for
///
/// Serialised as its routing token, which is also the third routing-key segment.
#[derive(
    EnumIter, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ProcessType {
    SecurityAggregation,
    SecurityMapping,
    UniverseSoiMapping,
    Validation,
}

impl ProcessType {
    /// Lowercase token used in routing keys, bind patterns and endpoint names
    pub fn token(&self) -> &'static str {
        match self {
            Self::SecurityAggregation => "securityaggregation",
            Self::SecurityMapping => "securitymapping",
            Self::UniverseSoiMapping => "universesoimapping",
            Self::Validation => "validation",
        }
    }

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::SecurityAggregation => "SecurityAggregation",
            Self::SecurityMapping => "SecurityMapping",
            Self::UniverseSoiMapping => "UniverseSOIMapping",
            Self::Validation => "Validation",
        }
    }

    /// True when `value` equals some process-type token, ignoring case
    pub fn is_token(value: &str) -> bool {
        Self::iter().any(|pt| pt.token().eq_ignore_ascii_case(value))
    }

    pub fn all() -> Vec<ProcessType> {
        Self::iter().collect()
    }
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProcessType {
    type Err = RoutingError;

    /// Accepts the token, the display name or a hyphenated form
    /// ("security-aggregation"), case-insensitively
    fn from_str(s: &str) -> RoutingResult<Self> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();

        Self::iter()
            .find(|pt| pt.token() == folded)
            .ok_or_else(|| {
                RoutingError::invalid_context(format!(
                    "unknown process type '{}' (expected one of: {})",
                    s,
                    Self::iter()
                        .map(|pt| pt.token())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}
