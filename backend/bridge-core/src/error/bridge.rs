use crate::error::registry::RegistryError;

use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum BridgeError {
    #[error("Missing Handlers Error: {} {location}", .names.join(", "))]
    MissingHandlers {
        names: Vec<String>,
        location: ErrorLocation,
    },

    #[error("Unknown Operation Error: {name} {location}")]
    UnknownOperation {
        name: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
