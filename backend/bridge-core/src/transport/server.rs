//! Bridge WebSocket server.
//!
//! # Protocol
//!
//! 1. The first frame must be `handshake` with the server's token
//! 2. The server answers `handshake_ack` and closes the connection on failure
//! 3. Every later `call` frame is dispatched on its own task and answered by
//!    one `reply` frame carrying the same `request_id`

use crate::config::ServerConfig;
use crate::dispatch::DispatchBridge;
use crate::error::transport::TransportError;
use crate::transport::connection_state::ConnectionState;
use crate::transport::handle::BridgeServerHandle;
use crate::transport::wire::{
    BridgeReply, ClientFrame, RejectCode, ServerFrame, decode_frame, encode_frame,
    salvage_request_id,
};

use common::ErrorLocation;

use std::net::SocketAddr;
use std::panic::Location;
use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn as TokioSpawn;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};
use uuid::Uuid;

type WsSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// Start the bridge server in front of `bridge`.
///
/// Binds `{config.host}:{config.port}`; port `0` picks a free port, reported
/// by [`BridgeServerHandle::port`]. A random token is generated when
/// `auth_token` is `None`.
///
/// # Errors
///
/// - [`TransportError::Handshake`] if `config.host` is not a loopback address
/// - [`TransportError::Io`] if the port cannot be bound
pub async fn start_bridge_server(
    config: &ServerConfig,
    auth_token: Option<String>,
    bridge: Arc<DispatchBridge>,
) -> Result<BridgeServerHandle, TransportError> {
    if !config.host.is_loopback() {
        return Err(TransportError::Handshake {
            message: format!("Refusing to bind non-loopback address {}", config.host),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let auth_token = auth_token.unwrap_or_else(|| {
        let token = Uuid::new_v4().to_string();
        debug!("Generated bridge auth token");
        token
    });

    let listener = TcpListener::bind(SocketAddr::new(config.host, config.port)).await?;
    let local_addr = listener.local_addr()?;

    info!(
        "Bridge server listening on {} ({} operations)",
        local_addr,
        bridge.exposed().len()
    );

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let expected_token: Arc<str> = Arc::from(auth_token.as_str());

    let accept_task = TokioSpawn(async move {
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Bridge server on {} shutting down", local_addr);
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            debug!("Client connecting from {}", addr);
                            let token = Arc::clone(&expected_token);
                            let bridge = Arc::clone(&bridge);
                            let shutdown = shutdown_rx.clone();
                            TokioSpawn(async move {
                                if let Err(e) =
                                    handle_connection(stream, addr, token, bridge, shutdown).await
                                {
                                    error!("Bridge connection {} failed: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Bridge server accept failed: {}", e);
                            break;
                        }
                    }
                }
            }
        }
    });

    Ok(BridgeServerHandle {
        local_addr,
        auth_token,
        shutdown: shutdown_tx,
        accept_task,
    })
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    expected_token: Arc<str>,
    bridge: Arc<DispatchBridge>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), TransportError> {
    if !addr.ip().is_loopback() {
        warn!("Rejected non-loopback connection from {}", addr);
        return Ok(());
    }

    let ws_stream = accept_async(stream)
        .await
        .map_err(|e| TransportError::Handshake {
            message: format!("WebSocket handshake failed: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

    let (mut write, mut read) = ws_stream.split();
    let mut state = ConnectionState::new(expected_token);

    // First frame MUST be the handshake
    match read.next().await {
        Some(Ok(Message::Text(text))) => match decode_frame::<ClientFrame>(&text) {
            Ok(ClientFrame::Handshake { token }) => {
                if state.validate_token(&token) {
                    info!("Client {} authenticated", addr);
                    send_frame(
                        &mut write,
                        &ServerFrame::HandshakeAck {
                            success: true,
                            error: None,
                        },
                    )
                    .await?;
                } else {
                    warn!("Client {} auth failed: invalid token", addr);
                    send_frame(
                        &mut write,
                        &ServerFrame::HandshakeAck {
                            success: false,
                            error: Some("Invalid authentication token".to_string()),
                        },
                    )
                    .await?;
                    close_sink(&mut write, addr).await;
                    return Ok(());
                }
            }
            Ok(ClientFrame::Call(call)) => {
                warn!("Client {} called '{}' before the handshake", addr, call.name);
                send_frame(
                    &mut write,
                    &ServerFrame::Reply(BridgeReply::rejected(
                        call.request_id,
                        RejectCode::AuthRequired,
                        "Handshake required before calls",
                    )),
                )
                .await?;
                close_sink(&mut write, addr).await;
                return Ok(());
            }
            Err(e) => {
                warn!("Client {} sent an invalid first frame: {}", addr, e);
                close_sink(&mut write, addr).await;
                return Ok(());
            }
        },
        Some(Ok(_)) => {
            warn!("Client {} sent a non-text first frame", addr);
            close_sink(&mut write, addr).await;
            return Ok(());
        }
        Some(Err(e)) => {
            return Err(TransportError::Delivery {
                message: format!("Error reading first frame from {addr}: {e}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
        None => {
            warn!("Client {} disconnected before the handshake", addr);
            return Ok(());
        }
    }

    if !state.is_authenticated() {
        return Ok(());
    }

    // Replies from concurrently running calls share one writer
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
    TokioSpawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if let Err(e) = write.send(message).await {
                debug!("Stopped writing to {}: {}", addr, e);
                return;
            }
        }
        close_sink(&mut write, addr).await;
    });

    let mut result = Ok(());
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                debug!("Closing connection {}: server shutting down", addr);
                break;
            }
            next = read.next() => {
                match next {
                    Some(Ok(Message::Text(text))) => {
                        handle_text_frame(&text, addr, &bridge, &outbound_tx);
                    }
                    Some(Ok(Message::Binary(_))) => {
                        warn!("Client {} sent a binary frame; ignoring", addr);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        result = Err(TransportError::Delivery {
                            message: format!("Error reading from {addr}: {e}"),
                            location: ErrorLocation::from(Location::caller()),
                        });
                        break;
                    }
                }
            }
        }
    }

    info!("Client {} disconnected", addr);
    result
}

/// Decode one post-handshake frame and dispatch it.
///
/// Each call runs on its own task, so a client that disconnects mid-call never
/// aborts the underlying action.
fn handle_text_frame(
    text: &str,
    addr: SocketAddr,
    bridge: &Arc<DispatchBridge>,
    outbound: &mpsc::UnboundedSender<Message>,
) {
    match decode_frame::<ClientFrame>(text) {
        Ok(ClientFrame::Call(call)) => {
            let bridge = Arc::clone(bridge);
            let outbound = outbound.clone();
            TokioSpawn(async move {
                let request_id = call.request_id;
                let reply = bridge.dispatch(call).await;
                queue_reply(&outbound, reply, addr);
                debug!("Reply for call {} queued to {}", request_id, addr);
            });
        }
        Ok(ClientFrame::Handshake { .. }) => {
            warn!("Client {} sent a second handshake", addr);
            queue_reply(
                outbound,
                BridgeReply::rejected(0, RejectCode::InvalidMessage, "Already authenticated"),
                addr,
            );
        }
        Err(e) => {
            let request_id = salvage_request_id(text);
            warn!("Client {} sent an invalid frame ({}): {}", addr, request_id, e);
            queue_reply(
                outbound,
                BridgeReply::rejected(
                    request_id,
                    RejectCode::InvalidMessage,
                    format!("Invalid frame: {e}"),
                ),
                addr,
            );
        }
    }
}

fn queue_reply(outbound: &mpsc::UnboundedSender<Message>, reply: BridgeReply, addr: SocketAddr) {
    let request_id = reply.request_id;
    let message = match encode_frame(&ServerFrame::Reply(reply)) {
        Ok(message) => message,
        Err(e) => {
            error!("Failed to encode reply {} for {}: {}", request_id, addr, e);
            let rejected = BridgeReply::rejected(
                request_id,
                RejectCode::InvalidMessage,
                format!("Reply could not be encoded: {e}"),
            );
            match encode_frame(&ServerFrame::Reply(rejected)) {
                Ok(message) => message,
                Err(e) => {
                    error!("Failed to encode rejection {} for {}: {}", request_id, addr, e);
                    return;
                }
            }
        }
    };

    if outbound.send(message).is_err() {
        debug!("Client {} gone; reply {} dropped", addr, request_id);
    }
}

async fn send_frame(write: &mut WsSink, frame: &ServerFrame) -> Result<(), TransportError> {
    let message = encode_frame(frame)?;
    write
        .send(message)
        .await
        .map_err(|e| TransportError::Delivery {
            message: format!("Failed to send frame: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}

async fn close_sink(write: &mut WsSink, addr: SocketAddr) {
    if let Err(e) = write.close().await {
        debug!("Closing connection {} failed: {}", addr, e);
    }
}
