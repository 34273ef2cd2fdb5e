use bridge_core::error::{BackendError, BridgeError, ConfigError, TransportError};

use common::ErrorLocation;

use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Errors of the privileged host process.
///
/// Serializable so a startup failure can be reported across the boundary;
/// the underlying core error is flattened into its message.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum StudioError {
    /// Error from this App
    #[error("Studio Error: {message} {location}")]
    Studio {
        message: String,
        location: ErrorLocation,
    },

    /// Config missing, unreadable or invalid
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// Bridge construction or server startup failed
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },
}

impl From<ConfigError> for StudioError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        StudioError::Config {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<BridgeError> for StudioError {
    #[track_caller]
    fn from(error: BridgeError) -> Self {
        StudioError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<BackendError> for StudioError {
    #[track_caller]
    fn from(error: BackendError) -> Self {
        StudioError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<TransportError> for StudioError {
    #[track_caller]
    fn from(error: TransportError) -> Self {
        StudioError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
