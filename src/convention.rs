//! Attribute names read and written by the processor.

/// Autonomous system number of the resolved network.
pub const AS_NUMBER: &str = "as.number";

/// Organization owning the autonomous system.
pub const AS_ORGANIZATION_NAME: &str = "as.organization.name";

/// Source address of a network exchange.
pub const SOURCE_ADDRESS: &str = "source.address";

/// Client address of a network exchange.
pub const CLIENT_ADDRESS: &str = "client.address";
