//! Per-connection handshake state.

use std::sync::Arc;

/// Tracks whether a bridge connection has presented the expected token.
pub(crate) struct ConnectionState {
    authenticated: bool,
    expected_token: Arc<str>,
}

impl ConnectionState {
    pub(crate) fn new(expected_token: Arc<str>) -> Self {
        Self {
            authenticated: false,
            expected_token,
        }
    }

    /// Mark the connection authenticated if `token` matches.
    ///
    /// A failed attempt never clears an earlier success.
    pub(crate) fn validate_token(&mut self, token: &str) -> bool {
        let valid = !token.is_empty() && token == &*self.expected_token;
        if valid {
            self.authenticated = true;
        }
        valid
    }

    pub(crate) fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
