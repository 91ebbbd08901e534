//! Public API for the routing core
//!
//! External modules should import from here rather than directly from
//! internal modules.

pub use crate::routing::command::{CommandPayload, ProcessingCommand, ValidationSeverity};
pub use crate::routing::context::{RoutingContext, QUEUE_NAME_PREFIX, RESERVED_CLIENT_PREFIX};
pub use crate::routing::error::{HandlerError, RoutingError, RoutingResult};
pub use crate::routing::pattern::{BindPattern, PatternSegment};
pub use crate::routing::process_type::ProcessType;
