//! Build metadata and routing schema version.
//! Includes the generated version.rs from the build script so there is a
//! single source of truth for the binary and for envelope headers.

include!(concat!(env!("OUT_DIR"), "/version.rs"));

/// Parse the routing schema version string from the build script into u32.
/// Falls back to a stable default if parsing fails.
pub fn schema_version() -> u32 {
    ROUTING_SCHEMA_VERSION.parse().unwrap_or(20251019)
}

/// Build time string from the build script (UTC)
pub fn build_time() -> &'static str {
    BUILD_TIME
}

/// Short git hash captured by the build script
pub fn git_hash() -> &'static str {
    GIT_HASH
}
