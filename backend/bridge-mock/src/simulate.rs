//! Simulated failures for mock handlers.
//!
//! Domain failures and transport failures stay distinct [`CallError`]
//! variants, exactly as the real bridge reports them.

use bridge_core::error::{CallError, OperationError, TransportError};

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use serde_json::Value;

/// The API answered with `status` and `error`.
pub fn status(status: HttpStatusCode, error: impl Into<Value>) -> CallError {
    CallError::Operation(OperationError::status(status, error))
}

/// 404 "Server not found".
pub fn not_found() -> CallError {
    CallError::Operation(OperationError::not_found())
}

pub fn server_error() -> CallError {
    status(HttpStatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// The backend API could not be reached by the privileged process.
pub fn network_error() -> CallError {
    CallError::Operation(OperationError::Network {
        message: "Failed to fetch".to_string(),
    })
}

/// The boundary itself dropped the call.
#[track_caller]
pub fn transport_failure(message: impl Into<String>) -> CallError {
    CallError::Transport(TransportError::Delivery {
        message: message.into(),
        location: ErrorLocation::from(Location::caller()),
    })
}
