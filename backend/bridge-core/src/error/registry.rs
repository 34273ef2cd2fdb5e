use common::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum RegistryError {
    #[error("Duplicate Operation Error: {message} {location}")]
    Duplicate {
        message: String,
        location: ErrorLocation,
    },

    #[error("Malformed Operation Error: {message} {location}")]
    Malformed {
        message: String,
        location: ErrorLocation,
    },
}
