//! Bridge server handle.

use std::net::SocketAddr;

use log::debug;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Handle to a running bridge server.
///
/// Returned by [`start_bridge_server`](crate::transport::start_bridge_server).
/// The server runs until [`shutdown`](Self::shutdown) is called or the handle
/// is dropped; either way every open connection is closed.
pub struct BridgeServerHandle {
    pub(crate) local_addr: SocketAddr,
    pub(crate) auth_token: String,
    pub(crate) shutdown: watch::Sender<bool>,
    pub(crate) accept_task: JoinHandle<()>,
}

impl BridgeServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Bound port. Differs from the configured one when that was `0`.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    /// `ws://` URL the proxy connects to.
    pub fn url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    /// Token clients must present in their handshake.
    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }

    /// Stop accepting connections and close the open ones.
    pub async fn shutdown(self) {
        if self.shutdown.send(true).is_err() {
            debug!("Bridge server on {} already stopped", self.local_addr);
        }
        if let Err(e) = self.accept_task.await {
            debug!("Bridge accept loop ended abnormally: {e}");
        }
    }
}
