//! Where the unprivileged side finds the bridge.
//!
//! The host publishes the bound address and the session token to
//! `{config_dir}/bridge-endpoint.json` once the server is listening. The
//! file is replaced on every start and removed on shutdown.

use crate::error::StudioError;

use bridge_core::BridgeServerHandle;

use common::ErrorLocation;

use std::fs;
use std::net::SocketAddr;
use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub const ENDPOINT_FILE_NAME: &str = "bridge-endpoint.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeEndpoint {
    /// Address the server actually bound, IPv4 or IPv6 loopback.
    pub addr: SocketAddr,
    pub auth_token: String,
}

impl BridgeEndpoint {
    pub fn new(addr: SocketAddr, auth_token: impl Into<String>) -> Self {
        Self {
            addr,
            auth_token: auth_token.into(),
        }
    }

    pub fn from_handle(handle: &BridgeServerHandle) -> Self {
        Self::new(handle.local_addr(), handle.auth_token())
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    pub fn file_path(dir: &Path) -> PathBuf {
        dir.join(ENDPOINT_FILE_NAME)
    }

    /// Write to `{dir}/bridge-endpoint.json` via temp file + rename.
    #[track_caller]
    pub fn publish(&self, dir: &Path) -> Result<PathBuf, StudioError> {
        fs::create_dir_all(dir).map_err(|e| StudioError::Studio {
            message: format!("Failed to create {}: {e}", dir.display()),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let path = Self::file_path(dir);
        let temp_path = dir.join(format!("{ENDPOINT_FILE_NAME}.tmp"));

        let json = serde_json::to_string_pretty(self).map_err(|e| StudioError::Studio {
            message: format!("Failed to serialize bridge endpoint: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        fs::write(&temp_path, json)
            .and_then(|()| fs::rename(&temp_path, &path))
            .map_err(|e| StudioError::Studio {
                message: format!("Failed to write {}: {e}", path.display()),
                location: ErrorLocation::from(Location::caller()),
            })?;

        info!("Bridge endpoint published to {}", path.display());
        Ok(path)
    }

    #[track_caller]
    pub fn read(dir: &Path) -> Result<Self, StudioError> {
        let path = Self::file_path(dir);

        let contents = fs::read_to_string(&path).map_err(|e| StudioError::Studio {
            message: format!("Failed to read {}: {e}", path.display()),
            location: ErrorLocation::from(Location::caller()),
        })?;

        serde_json::from_str(&contents).map_err(|e| StudioError::Studio {
            message: format!("Failed to parse {}: {e}", path.display()),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Remove the published file. A missing file is not an error.
    pub fn retract(dir: &Path) {
        let path = Self::file_path(dir);
        match fs::remove_file(&path) {
            Ok(()) => debug!("Bridge endpoint retracted from {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {e}", path.display()),
        }
    }
}
