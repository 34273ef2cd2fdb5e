//! Typed operation bridge for the studio workload API.
//!
//! - [`registry`]: the build-time generated operation table
//! - [`dispatch`]: the privileged-side handler table and HTTP backend
//! - [`transport`]: the WebSocket boundary, server and proxy
//! - [`invoke`]: the caller-facing trait shared with the mock engine

pub mod config;
pub mod dispatch;
pub mod error;
pub mod invoke;
pub mod registry;
pub mod transport;

pub use config::BridgeConfig;
pub use dispatch::{Backend, DispatchBridge, DispatchBridgeBuilder, HttpBackend};
pub use error::{CallError, OperationError, TransportError};
pub use invoke::Invoke;
pub use registry::{HttpMethod, Operation, OperationDescriptor, OperationRegistry};
pub use transport::{BridgeProxy, BridgeServerHandle, start_bridge_server};

#[cfg(test)]
mod tests;
