use crate::error::operation::OperationError;
use crate::error::transport::TransportError;

use common::ErrorLocation;

use thiserror::Error as ThisError;

/// Caller-facing failure of an [`Invoke`](crate::invoke::Invoke) call.
///
/// One variant per failure kind; nothing converts one kind into another.
#[derive(Debug, ThisError)]
pub enum CallError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    #[error("Unresolved Operation Error: {operation} {location}")]
    Unresolved {
        operation: String,
        location: ErrorLocation,
    },
}

impl CallError {
    pub fn is_transport(&self) -> bool {
        matches!(self, CallError::Transport(_))
    }

    pub fn is_operation(&self) -> bool {
        matches!(self, CallError::Operation(_))
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, CallError::Unresolved { .. })
    }

    pub fn as_operation(&self) -> Option<&OperationError> {
        match self {
            CallError::Operation(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            CallError::Transport(error) => Some(error),
            _ => None,
        }
    }
}
