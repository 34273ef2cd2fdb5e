use common::HttpStatusCode;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error as ThisError;

/// Domain failure reported by a real (or mocked) operation handler.
///
/// Crosses the boundary as-is: `{ "kind": "status", "status": 404, "error": "Server not found" }`.
/// No source location is attached, so the serialized shape is exactly what the
/// handler produced.
#[derive(Debug, Clone, PartialEq, ThisError, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OperationError {
    #[error("Status Error: {status}: {error}")]
    Status { status: HttpStatusCode, error: Value },

    #[error("Network Error: {message}")]
    Network { message: String },

    #[error("Validation Error: {message}")]
    Validation { message: String },

    #[error("Internal Error: {message}")]
    Internal { message: String },
}

impl OperationError {
    pub fn status(status: impl Into<HttpStatusCode>, error: impl Into<Value>) -> Self {
        OperationError::Status {
            status: status.into(),
            error: error.into(),
        }
    }

    /// The workload API's answer for an unknown server name.
    pub fn not_found() -> Self {
        Self::status(HttpStatusCode::NOT_FOUND, "Server not found")
    }

    pub fn status_code(&self) -> Option<HttpStatusCode> {
        match self {
            OperationError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
