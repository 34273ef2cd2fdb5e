use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Misconfigured mock setup. Always a bug in the test, never in the code under test.
#[derive(Debug, ThisError)]
pub enum MockError {
    #[error(
        "Unknown Scenario Error: '{scenario}' for {operation} (available: {}) {location}",
        .available.join(", ")
    )]
    UnknownScenario {
        operation: String,
        scenario: String,
        available: Vec<String>,
        location: ErrorLocation,
    },

    #[error("Unregistered Operation Error: {operation} has no mock entry {location}")]
    UnregisteredOperation {
        operation: String,
        location: ErrorLocation,
    },

    #[error("Unknown Operation Error: {operation} is not in the registry {location}")]
    UnknownOperation {
        operation: String,
        location: ErrorLocation,
    },
}
