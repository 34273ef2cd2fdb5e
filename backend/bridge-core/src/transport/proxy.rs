//! Bridge Proxy.
//!
//! The unprivileged-side [`Invoke`] implementation. Every registry name is
//! callable; each call is forwarded to the bridge server unchanged and its
//! reply returned unchanged. Replies are correlated by `request_id`, so many
//! calls may be in flight on one connection.

use crate::config::ProxyConfig;
use crate::error::call::CallError;
use crate::error::transport::TransportError;
use crate::invoke::Invoke;
use crate::registry::OperationRegistry;
use crate::transport::wire::{
    BridgeCall, ClientFrame, RejectCode, ReplyOutcome, ServerFrame, decode_frame, encode_frame,
};

use common::ErrorLocation;

use std::collections::HashMap;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use backoff::{ExponentialBackoff, backoff::Backoff};
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, trace, warn};
use serde_json::Value;
use tokio::spawn as TokioSpawn;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio::time::{sleep as TokioSleep, timeout as TokioTimeout};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

type PendingReplies = Arc<Mutex<HashMap<u64, oneshot::Sender<ReplyOutcome>>>>;

pub struct BridgeProxy {
    registry: Arc<OperationRegistry>,
    config: ProxyConfig,
    connection: RwLock<Option<Arc<Connection>>>,
    next_request_id: AtomicU64,
}

/// One authenticated connection to the bridge server.
struct Connection {
    outbound: mpsc::UnboundedSender<Message>,
    pending: PendingReplies,
    closed: Arc<AtomicBool>,
}

impl Connection {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn register(&self, request_id: u64, reply: oneshot::Sender<ReplyOutcome>) {
        lock_pending(&self.pending).insert(request_id, reply);
    }

    fn forget(&self, request_id: u64) {
        lock_pending(&self.pending).remove(&request_id);
    }
}

fn lock_pending(
    pending: &PendingReplies,
) -> std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<ReplyOutcome>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BridgeProxy {
    pub fn new(registry: impl Into<Arc<OperationRegistry>>, config: ProxyConfig) -> Self {
        Self {
            registry: registry.into(),
            config,
            connection: RwLock::new(None),
            next_request_id: AtomicU64::new(1),
        }
    }

    /// Names callable through this proxy: exactly the registry's names.
    pub fn exposed(&self) -> Vec<&str> {
        self.registry.names().collect()
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub async fn is_ready(&self) -> bool {
        self.connection
            .read()
            .await
            .as_ref()
            .is_some_and(|connection| !connection.is_closed())
    }

    /// Connect to the bridge server at `url` and authenticate with `token`.
    ///
    /// Replaces any previous connection.
    ///
    /// # Errors
    ///
    /// - [`TransportError::NotReady`] if nothing is listening at `url` yet
    /// - [`TransportError::Handshake`] if the upgrade fails or the token is refused
    /// - [`TransportError::Timeout`] if the server does not acknowledge in time
    pub async fn connect(&self, url: &str, token: &str) -> Result<(), TransportError> {
        let (ws_stream, _) = connect_async(url).await.map_err(|e| match e {
            WsError::Io(io) => TransportError::NotReady {
                message: format!("Bridge server at {url} is not reachable: {io}"),
                location: ErrorLocation::from(Location::caller()),
            },
            other => TransportError::Handshake {
                message: format!("WebSocket upgrade to {url} failed: {other}"),
                location: ErrorLocation::from(Location::caller()),
            },
        })?;

        let (mut write, mut read) = ws_stream.split();

        let handshake = encode_frame(&ClientFrame::Handshake {
            token: token.to_string(),
        })?;
        write
            .send(handshake)
            .await
            .map_err(|e| TransportError::Handshake {
                message: format!("Failed to send handshake: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let ack = TokioTimeout(self.config.call_timeout(), read.next())
            .await
            .map_err(|_| TransportError::Timeout {
                message: format!("No handshake acknowledgement from {url}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        match ack {
            Some(Ok(Message::Text(text))) => match decode_frame::<ServerFrame>(&text)? {
                ServerFrame::HandshakeAck { success: true, .. } => {}
                ServerFrame::HandshakeAck { error, .. } => {
                    return Err(TransportError::Handshake {
                        message: error.unwrap_or_else(|| "Handshake refused".to_string()),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
                ServerFrame::Reply(reply) => {
                    return Err(TransportError::Handshake {
                        message: format!("Expected handshake_ack, got reply {}", reply.request_id),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            },
            other => {
                return Err(TransportError::Handshake {
                    message: format!("Connection closed during handshake: {other:?}"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        }

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let pending: PendingReplies = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        // Writer: ends when the connection is dropped
        TokioSpawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = write.send(message).await {
                    debug!("Bridge writer stopped: {e}");
                    return;
                }
            }
            if let Err(e) = write.close().await {
                trace!("Closing bridge connection failed: {e}");
            }
        });

        // Reader: routes replies to their callers
        let reader_pending = Arc::clone(&pending);
        let reader_closed = Arc::clone(&closed);
        TokioSpawn(async move {
            while let Some(next) = read.next().await {
                match next {
                    Ok(Message::Text(text)) => route_reply(&text, &reader_pending),
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        debug!("Bridge connection lost: {e}");
                        break;
                    }
                }
            }

            reader_closed.store(true, Ordering::SeqCst);
            let abandoned = lock_pending(&reader_pending).drain().count();
            info!("Bridge connection closed ({abandoned} calls abandoned)");
        });

        *self.connection.write().await = Some(Arc::new(Connection {
            outbound: outbound_tx,
            pending,
            closed,
        }));

        info!("Connected to bridge server at {url}");
        Ok(())
    }

    /// [`connect`](Self::connect), retrying with exponential backoff while the
    /// server is not reachable yet, up to `connect_max_elapsed`.
    pub async fn connect_with_retry(&self, url: &str, token: &str) -> Result<(), TransportError> {
        let mut backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.config.connect_max_elapsed()),
            ..Default::default()
        };

        loop {
            match self.connect(url, token).await {
                Err(TransportError::NotReady { message, location }) => match backoff.next_backoff() {
                    Some(duration) => {
                        trace!("Bridge not ready ({message}), retrying after {duration:?}");
                        TokioSleep(duration).await;
                    }
                    None => return Err(TransportError::NotReady { message, location }),
                },
                result => return result,
            }
        }
    }

    /// Drop the current connection. Later calls fail with `NotReady`.
    pub async fn disconnect(&self) {
        if self.connection.write().await.take().is_some() {
            info!("Disconnected from bridge server");
        }
    }

    fn next_request_id(&self) -> u64 {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Invoke for BridgeProxy {
    async fn invoke(&self, name: &str, input: Value) -> Result<Value, CallError> {
        if !self.registry.contains(name) {
            return Err(CallError::Transport(TransportError::Rejected {
                code: RejectCode::UnknownOperation,
                message: format!("Unknown operation: {name}"),
                location: ErrorLocation::from(Location::caller()),
            }));
        }

        let connection = self
            .connection
            .read()
            .await
            .clone()
            .filter(|connection| !connection.is_closed())
            .ok_or_else(|| TransportError::NotReady {
                message: format!("Bridge is not connected; cannot call {name}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let request_id = self.next_request_id();
        let message = encode_frame(&ClientFrame::Call(BridgeCall {
            request_id,
            name: name.to_string(),
            input,
        }))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        connection.register(request_id, reply_tx);

        // The reader may have closed between the lookup and the registration
        if connection.is_closed() || connection.outbound.send(message).is_err() {
            connection.forget(request_id);
            return Err(CallError::Transport(TransportError::Delivery {
                message: format!("Bridge connection closed before {name} was sent"),
                location: ErrorLocation::from(Location::caller()),
            }));
        }

        trace!("Call {request_id} to {name} sent");

        match TokioTimeout(self.config.call_timeout(), reply_rx).await {
            Ok(Ok(outcome)) => outcome.into_result(),
            Ok(Err(_)) => Err(CallError::Transport(TransportError::Delivery {
                message: format!("Bridge connection closed before {name} replied"),
                location: ErrorLocation::from(Location::caller()),
            })),
            Err(_) => {
                connection.forget(request_id);
                Err(CallError::Transport(TransportError::Timeout {
                    message: format!(
                        "{name} did not reply within {:?}",
                        self.config.call_timeout()
                    ),
                    location: ErrorLocation::from(Location::caller()),
                }))
            }
        }
    }
}

fn route_reply(text: &str, pending: &PendingReplies) {
    let reply = match decode_frame::<ServerFrame>(text) {
        Ok(ServerFrame::Reply(reply)) => reply,
        Ok(ServerFrame::HandshakeAck { .. }) => {
            warn!("Unexpected handshake_ack after authentication");
            return;
        }
        Err(e) => {
            warn!("Dropping undecodable frame from bridge server: {e}");
            return;
        }
    };

    match lock_pending(pending).remove(&reply.request_id) {
        Some(caller) => {
            if caller.send(reply.outcome).is_err() {
                trace!("Caller for {} went away", reply.request_id);
            }
        }
        None => warn!("Reply {} matches no pending call", reply.request_id),
    }
}
