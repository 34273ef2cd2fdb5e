//! Scenario ids shared by the studio fixtures and tests.

/// Lookups answer 404 "Server not found".
pub const NOT_FOUND: &str = "not-found";

/// Lists answer with no items.
pub const EMPTY: &str = "empty";

/// The API answers 500.
pub const SERVER_ERROR: &str = "server-error";

/// The API cannot be reached.
pub const NETWORK_ERROR: &str = "network-error";
