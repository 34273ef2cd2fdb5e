//! Dispatch Bridge.
//!
//! Installed once in the privileged process. Holds one handler per registry
//! entry, keyed by operation name, and runs the real handler for each
//! [`BridgeCall`]. The handler table is checked against the registry when the
//! bridge is built: a registry name without a handler, or a handler without a
//! registry name, fails startup.

pub mod backend;
pub mod http;

pub use backend::Backend;
pub use http::HttpBackend;

use crate::error::bridge::BridgeError;
use crate::error::call::CallError;
use crate::error::operation::OperationError;
use crate::error::transport::TransportError;
use crate::invoke::Invoke;
use crate::registry::{Operation, OperationDescriptor, OperationRegistry};
use crate::transport::wire::{BridgeCall, BridgeReply, RejectCode};

use common::ErrorLocation;

use std::collections::HashMap;
use std::future::Future;
use std::panic::Location;
use std::pin::Pin;
use std::sync::Arc;

use log::{debug, error, warn};
use serde_json::Value;

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, CallError>> + Send>>;

type ErasedHandler = Arc<dyn Fn(Value) -> HandlerFuture + Send + Sync>;

pub struct DispatchBridge {
    registry: Arc<OperationRegistry>,
    handlers: HashMap<String, ErasedHandler>,
}

impl DispatchBridge {
    pub fn builder(registry: impl Into<Arc<OperationRegistry>>) -> DispatchBridgeBuilder {
        DispatchBridgeBuilder {
            registry: registry.into(),
            handlers: HashMap::new(),
            fallback: None,
            unknown: Vec::new(),
        }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Names with an installed handler. Always equal to the registry's names.
    pub fn exposed(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the handler for `call` and wrap its outcome in a reply.
    ///
    /// Operation failures are forwarded as they are; only an unknown name is
    /// rejected by the bridge itself.
    pub async fn dispatch(&self, call: BridgeCall) -> BridgeReply {
        let BridgeCall {
            request_id,
            name,
            input,
        } = call;

        let Some(handler) = self.handlers.get(&name).cloned() else {
            warn!("Rejected call {request_id} to unknown operation '{name}'");
            return BridgeReply::rejected(
                request_id,
                RejectCode::UnknownOperation,
                format!("Unknown operation: {name}"),
            );
        };

        debug!("Dispatching call {request_id} to '{name}'");
        match handler(input).await {
            Ok(output) => BridgeReply::ok(request_id, output),
            Err(CallError::Operation(error)) => {
                debug!("Operation '{name}' failed for call {request_id}: {error}");
                BridgeReply::failed(request_id, error)
            }
            Err(CallError::Unresolved { operation, .. }) => {
                error!("Call {request_id} to '{name}' was not resolved by any handler");
                BridgeReply::rejected(
                    request_id,
                    RejectCode::Unresolved,
                    format!("Unresolved operation: {operation}"),
                )
            }
            Err(CallError::Transport(TransportError::Rejected { code, message, .. })) => {
                warn!("Handler for '{name}' rejected call {request_id}: {message}");
                BridgeReply::rejected(request_id, code, message)
            }
            Err(CallError::Transport(error)) => {
                warn!("Handler for '{name}' could not deliver call {request_id}: {error}");
                BridgeReply::rejected(request_id, RejectCode::Undeliverable, error.to_string())
            }
        }
    }
}

impl Invoke for DispatchBridge {
    async fn invoke(&self, name: &str, input: Value) -> Result<Value, CallError> {
        let Some(handler) = self.handlers.get(name).cloned() else {
            return Err(CallError::Transport(TransportError::Rejected {
                code: RejectCode::UnknownOperation,
                message: format!("Unknown operation: {name}"),
                location: ErrorLocation::from(Location::caller()),
            }));
        };

        handler(input).await
    }
}

pub struct DispatchBridgeBuilder {
    registry: Arc<OperationRegistry>,
    handlers: HashMap<String, ErasedHandler>,
    fallback: Option<Arc<dyn Fn(&OperationDescriptor) -> ErasedHandler + Send + Sync>>,
    unknown: Vec<String>,
}

impl DispatchBridgeBuilder {
    /// Install a typed handler for operation `O`.
    ///
    /// Input that does not decode into `O::Request` is answered with
    /// [`OperationError::Validation`] without calling `handler`.
    pub fn handle<O, F, Fut>(self, handler: F) -> Self
    where
        O: Operation,
        F: Fn(O::Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O::Response, OperationError>> + Send + 'static,
    {
        let handler = Arc::new(handler);
        self.handle_raw(O::NAME, move |input: Value| {
            let handler = Arc::clone(&handler);
            async move {
                let request: O::Request =
                    serde_json::from_value(input).map_err(|e| OperationError::Validation {
                        message: format!("{}: {e}", O::NAME),
                    })?;

                let response = handler(request).await?;

                serde_json::to_value(response).map_err(|e| OperationError::Internal {
                    message: format!("{}: failed to encode response: {e}", O::NAME),
                })
            }
        })
    }

    /// Install an untyped handler under `name`.
    pub fn handle_raw<F, Fut>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, OperationError>> + Send + 'static,
    {
        if !self.registry.contains(name) {
            self.unknown.push(name.to_string());
            return self;
        }

        let erased: ErasedHandler = Arc::new(move |input: Value| -> HandlerFuture {
            let pending = handler(input);
            Box::pin(async move { pending.await.map_err(CallError::Operation) })
        });
        self.handlers.insert(name.to_string(), erased);
        self
    }

    /// Route every operation without an explicit handler to `backend`.
    pub fn backend<B: Backend>(mut self, backend: B) -> Self {
        let backend = Arc::new(backend);
        self.fallback = Some(Arc::new(move |descriptor: &OperationDescriptor| {
            let backend = Arc::clone(&backend);
            let descriptor = descriptor.clone();
            let erased: ErasedHandler = Arc::new(move |input: Value| -> HandlerFuture {
                let backend = Arc::clone(&backend);
                let descriptor = descriptor.clone();
                Box::pin(async move {
                    backend
                        .execute(&descriptor, input)
                        .await
                        .map_err(CallError::Operation)
                })
            });
            erased
        }));
        self
    }

    /// Route every operation without an explicit handler to another
    /// [`Invoke`] implementation, such as a mock engine.
    ///
    /// Unlike [`backend`](Self::backend), the target may fail with any
    /// [`CallError`]; see [`DispatchBridge::dispatch`] for how each kind is replied.
    pub fn delegate<I: Invoke + 'static>(mut self, target: Arc<I>) -> Self {
        self.fallback = Some(Arc::new(move |descriptor: &OperationDescriptor| {
            let target = Arc::clone(&target);
            let name = descriptor.name.to_string();
            let erased: ErasedHandler = Arc::new(move |input: Value| -> HandlerFuture {
                let target = Arc::clone(&target);
                let name = name.clone();
                Box::pin(async move { target.invoke(&name, input).await })
            });
            erased
        }));
        self
    }

    /// # Errors
    ///
    /// - [`BridgeError::UnknownOperation`] if a handler was installed for a name
    ///   the registry does not contain
    /// - [`BridgeError::MissingHandlers`] listing every registry name left
    ///   without a handler
    #[track_caller]
    pub fn build(mut self) -> Result<DispatchBridge, BridgeError> {
        if let Some(name) = self.unknown.into_iter().next() {
            return Err(BridgeError::UnknownOperation {
                name,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut missing = Vec::new();
        for descriptor in self.registry.iter() {
            if self.handlers.contains_key(descriptor.name.as_ref()) {
                continue;
            }
            match &self.fallback {
                Some(fallback) => {
                    self.handlers
                        .insert(descriptor.name.to_string(), fallback(descriptor));
                }
                None => missing.push(descriptor.name.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(BridgeError::MissingHandlers {
                names: missing,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(DispatchBridge {
            registry: self.registry,
            handlers: self.handlers,
        })
    }
}
