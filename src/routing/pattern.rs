//! Bind pattern grammar
//!
//! A bind pattern is a dot-delimited sequence of segments, each either a
//! literal or `*` (exactly one segment). Multi-segment wildcards (`#`) are
//! not part of the grammar. A pattern matches a topic when both have the
//! same number of segments and every literal segment is equal.

use crate::routing::error::{RoutingError, RoutingResult};
use crate::routing::process_type::ProcessType;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PatternSegment {
    Literal(String),
    AnyOne,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindPattern {
    segments: Vec<PatternSegment>,
}

impl BindPattern {
    pub fn parse(pattern: &str) -> RoutingResult<Self> {
        if pattern.is_empty() {
            return Err(RoutingError::invalid_topology("bind pattern must not be empty"));
        }

        let segments = pattern
            .split('.')
            .map(|segment| match segment {
                "*" => Ok(PatternSegment::AnyOne),
                "" => Err(RoutingError::invalid_topology(format!(
                    "bind pattern '{}' has an empty segment",
                    pattern
                ))),
                s if s.contains('#') => Err(RoutingError::invalid_topology(format!(
                    "bind pattern '{}' uses '#', only '*' is supported",
                    pattern
                ))),
                s if s.contains('*') => Err(RoutingError::invalid_topology(format!(
                    "bind pattern '{}' mixes '*' with literal text in segment '{}'",
                    pattern, s
                ))),
                s => Ok(PatternSegment::Literal(s.to_string())),
            })
            .collect::<RoutingResult<Vec<_>>>()?;

        Ok(Self { segments })
    }

    /// Build from already-validated segments
    pub(crate) fn from_segments(segments: Vec<PatternSegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[PatternSegment] {
        &self.segments
    }

    pub fn matches(&self, topic: &str) -> bool {
        let mut parts = topic.split('.');
        for segment in &self.segments {
            match (segment, parts.next()) {
                (_, None) => return false,
                (_, Some("")) => return false,
                (PatternSegment::AnyOne, Some(_)) => {}
                (PatternSegment::Literal(literal), Some(part)) => {
                    if literal != part {
                        return false;
                    }
                }
            }
        }
        parts.next().is_none()
    }

    /// Patterns matching every canonical routing key of a process type,
    /// with and without sub-scope: `*.*.<pt>` and `*.*.<pt>.*`
    pub fn canonical_for(process_type: ProcessType) -> [BindPattern; 2] {
        let token = PatternSegment::Literal(process_type.token().to_string());
        [
            Self::from_segments(vec![
                PatternSegment::AnyOne,
                PatternSegment::AnyOne,
                token.clone(),
            ]),
            Self::from_segments(vec![
                PatternSegment::AnyOne,
                PatternSegment::AnyOne,
                token,
                PatternSegment::AnyOne,
            ]),
        ]
    }
}

impl FromStr for BindPattern {
    type Err = RoutingError;

    fn from_str(s: &str) -> RoutingResult<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for BindPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PatternSegment::Literal(literal) => f.write_str(literal)?,
                PatternSegment::AnyOne => f.write_str("*")?,
            }
        }
        Ok(())
    }
}
