//! Test helpers for bridge integration tests.
//!
//! - Starting a bridge server on a free port
//! - Connecting a proxy or a raw WebSocket client
//! - An echo backend for pass-through checks

use bridge_core::config::{ProxyConfig, ServerConfig};
use bridge_core::dispatch::{Backend, DispatchBridge};
use bridge_core::error::OperationError;
use bridge_core::registry::{OperationDescriptor, OperationRegistry};
use bridge_core::transport::{BridgeServerHandle, ClientFrame, ServerFrame, start_bridge_server};
use bridge_core::{BridgeProxy, DispatchBridgeBuilder};

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

pub const TEST_AUTH_TOKEN: &str = "test-token-12345";

pub type RawClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Returns every input unchanged.
pub struct EchoBackend;

impl Backend for EchoBackend {
    async fn execute(
        &self,
        _descriptor: &OperationDescriptor,
        input: Value,
    ) -> Result<Value, OperationError> {
        Ok(input)
    }
}

pub fn builtin_registry() -> OperationRegistry {
    OperationRegistry::builtin().clone()
}

pub fn echo_bridge_builder() -> DispatchBridgeBuilder {
    DispatchBridge::builder(builtin_registry()).backend(EchoBackend)
}

pub fn test_server_config() -> ServerConfig {
    ServerConfig {
        port: 0,
        ..ServerConfig::default()
    }
}

pub fn test_proxy_config() -> ProxyConfig {
    ProxyConfig {
        connect_max_elapsed_ms: 3_000,
        call_timeout_ms: 2_000,
    }
}

/// Start a server on a free port with [`TEST_AUTH_TOKEN`].
pub async fn start_test_server(bridge: DispatchBridge) -> BridgeServerHandle {
    start_bridge_server(
        &test_server_config(),
        Some(TEST_AUTH_TOKEN.to_string()),
        Arc::new(bridge),
    )
    .await
    .expect("Failed to start bridge server")
}

/// Start a server and a proxy connected to it.
pub async fn start_connected(bridge: DispatchBridge) -> (BridgeServerHandle, BridgeProxy) {
    let handle = start_test_server(bridge).await;
    let proxy = BridgeProxy::new(builtin_registry(), test_proxy_config());
    proxy
        .connect(&handle.url(), handle.auth_token())
        .await
        .expect("Proxy should connect");
    (handle, proxy)
}

pub async fn connect_raw(handle: &BridgeServerHandle) -> RawClient {
    let (ws_stream, _) = connect_async(handle.url())
        .await
        .expect("Failed to connect to bridge server");
    ws_stream
}

pub async fn send_frame(ws: &mut RawClient, frame: &ClientFrame) {
    let text = serde_json::to_string(frame).expect("Failed to encode frame");
    ws.send(Message::text(text))
        .await
        .expect("Failed to send frame");
}

pub async fn send_text(ws: &mut RawClient, text: &str) {
    ws.send(Message::text(text.to_string()))
        .await
        .expect("Failed to send text");
}

pub async fn receive_frame(ws: &mut RawClient) -> ServerFrame {
    let message = tokio::time::timeout(Duration::from_secs(2), ws.next())
        .await
        .expect("Timed out waiting for a frame")
        .expect("No frame received")
        .expect("Error receiving frame");

    let text = message.into_text().expect("Expected a text frame");
    serde_json::from_str(&text).expect("Failed to decode frame")
}

pub async fn authenticate(ws: &mut RawClient, token: &str) -> ServerFrame {
    send_frame(
        ws,
        &ClientFrame::Handshake {
            token: token.to_string(),
        },
    )
    .await;
    receive_frame(ws).await
}

/// True when the server closed the connection (or sent nothing within 500ms).
pub async fn is_connection_closed(ws: &mut RawClient) -> bool {
    match tokio::time::timeout(Duration::from_millis(500), ws.next()).await {
        Err(_) => true,
        Ok(None) => true,
        Ok(Some(Ok(Message::Close(_)))) => true,
        Ok(Some(Ok(_))) => false,
        Ok(Some(Err(_))) => true,
    }
}
