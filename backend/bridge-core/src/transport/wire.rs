//! Boundary wire protocol.
//!
//! JSON text frames over the WebSocket. The client's first frame must be a
//! [`ClientFrame::Handshake`]; every later frame is a [`ClientFrame::Call`]
//! answered by exactly one [`ServerFrame::Reply`] with the same `request_id`.

use crate::error::call::CallError;
use crate::error::operation::OperationError;
use crate::error::transport::TransportError;

use common::ErrorLocation;

use std::panic::Location;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Handshake { token: String },
    Call(BridgeCall),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    HandshakeAck {
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Reply(BridgeReply),
}

/// One operation call crossing the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeCall {
    pub request_id: u64,
    pub name: String,
    #[serde(default)]
    pub input: Value,
}

impl BridgeCall {
    /// # Errors
    ///
    /// Returns [`TransportError::Serialization`] if `input` cannot be represented as JSON.
    #[track_caller]
    pub fn new(
        request_id: u64,
        name: impl Into<String>,
        input: &impl Serialize,
    ) -> Result<Self, TransportError> {
        let name = name.into();
        let input = serde_json::to_value(input).map_err(|e| TransportError::Serialization {
            message: format!("{name}: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(Self {
            request_id,
            name,
            input,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeReply {
    pub request_id: u64,
    pub outcome: ReplyOutcome,
}

impl BridgeReply {
    pub fn ok(request_id: u64, output: Value) -> Self {
        Self {
            request_id,
            outcome: ReplyOutcome::Ok { output },
        }
    }

    pub fn failed(request_id: u64, error: OperationError) -> Self {
        Self {
            request_id,
            outcome: ReplyOutcome::Failed { error },
        }
    }

    pub fn rejected(request_id: u64, code: RejectCode, message: impl Into<String>) -> Self {
        Self {
            request_id,
            outcome: ReplyOutcome::Rejected {
                code,
                message: message.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// The operation completed.
    Ok {
        #[serde(default)]
        output: Value,
    },
    /// The operation ran and reported a domain failure.
    Failed { error: OperationError },
    /// The call never reached an operation handler.
    Rejected { code: RejectCode, message: String },
}

impl ReplyOutcome {
    #[track_caller]
    pub fn into_result(self) -> Result<Value, CallError> {
        match self {
            ReplyOutcome::Ok { output } => Ok(output),
            ReplyOutcome::Failed { error } => Err(CallError::Operation(error)),
            ReplyOutcome::Rejected { code, message } => {
                Err(CallError::Transport(TransportError::Rejected {
                    code,
                    message,
                    location: ErrorLocation::from(Location::caller()),
                }))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectCode {
    UnknownOperation,
    InvalidMessage,
    AuthRequired,
    /// The operation exists but its handler had nothing to answer with.
    Unresolved,
    /// The handler failed to move the call further, e.g. to an upstream bridge.
    Undeliverable,
}

#[track_caller]
pub fn encode_frame(frame: &impl Serialize) -> Result<Message, TransportError> {
    let text = serde_json::to_string(frame)?;
    Ok(Message::text(text))
}

#[track_caller]
pub fn decode_frame<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, TransportError> {
    Ok(serde_json::from_str(text)?)
}

/// Best-effort `request_id` of a frame that failed to decode, so the
/// rejection can still be correlated. `0` when none is present.
pub fn salvage_request_id(text: &str) -> u64 {
    serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|value| value.get("request_id").and_then(Value::as_u64))
        .unwrap_or(0)
}
