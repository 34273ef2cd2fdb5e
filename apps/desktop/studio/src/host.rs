//! The privileged host: a dispatch bridge over the workload API, served on localhost.

use crate::endpoint::BridgeEndpoint;
use crate::error::StudioError;

use bridge_core::dispatch::{Backend, DispatchBridge, HttpBackend};
use bridge_core::registry::OperationRegistry;
use bridge_core::{BridgeConfig, BridgeServerHandle, start_bridge_server};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;

pub struct StudioHost {
    handle: BridgeServerHandle,
    endpoint: BridgeEndpoint,
    published_in: Option<PathBuf>,
}

impl StudioHost {
    /// Serve every registry operation by forwarding it to `config.backend`.
    ///
    /// # Errors
    ///
    /// - [`StudioError::Config`] if `config` is invalid
    /// - [`StudioError::Core`] if the backend URL is unusable or the port cannot be bound
    pub async fn start(config: &BridgeConfig) -> Result<Self, StudioError> {
        config.validate()?;

        let backend = HttpBackend::new(&config.backend.base_url, config.backend.timeout())?;
        info!("Forwarding operations to {}", backend.base_url());

        Self::start_with_backend(config, backend).await
    }

    pub async fn start_with_backend<B: Backend>(
        config: &BridgeConfig,
        backend: B,
    ) -> Result<Self, StudioError> {
        config.validate()?;

        let bridge = DispatchBridge::builder(OperationRegistry::builtin().clone())
            .backend(backend)
            .build()?;

        let handle = start_bridge_server(&config.server, None, Arc::new(bridge)).await?;
        let endpoint = BridgeEndpoint::from_handle(&handle);

        info!("Studio bridge listening on {}", endpoint.url());

        Ok(Self {
            handle,
            endpoint,
            published_in: None,
        })
    }

    pub fn endpoint(&self) -> &BridgeEndpoint {
        &self.endpoint
    }

    /// Publish the endpoint to `dir`; it is retracted again on [`shutdown`](Self::shutdown).
    pub fn publish_endpoint(&mut self, dir: &Path) -> Result<PathBuf, StudioError> {
        let path = self.endpoint.publish(dir)?;
        self.published_in = Some(dir.to_path_buf());
        Ok(path)
    }

    pub async fn shutdown(self) {
        if let Some(dir) = &self.published_in {
            BridgeEndpoint::retract(dir);
        }
        self.handle.shutdown().await;
        info!("Studio bridge stopped");
    }
}
