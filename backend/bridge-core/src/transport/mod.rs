//! Boundary transport.
//!
//! A localhost WebSocket carrying JSON frames (see [`wire`]). The privileged
//! side runs [`start_bridge_server`] in front of a
//! [`DispatchBridge`](crate::dispatch::DispatchBridge); the unprivileged side
//! calls through a [`BridgeProxy`].
//!
//! # Security
//!
//! - Binds a loopback address only
//! - Non-loopback peers are dropped without a response
//! - The first frame must be a handshake carrying the server's token

pub(crate) mod connection_state;
mod handle;
mod proxy;
mod server;
pub mod wire;

pub use handle::BridgeServerHandle;
pub use proxy::BridgeProxy;
pub use server::start_bridge_server;
pub use wire::{BridgeCall, BridgeReply, ClientFrame, RejectCode, ReplyOutcome, ServerFrame};
