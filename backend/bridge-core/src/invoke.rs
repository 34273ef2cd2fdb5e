//! The caller-facing call trait.
//!
//! UI logic is written once against [`Invoke`]; the bridge proxy, the
//! in-process dispatch bridge and the mock engine all implement it.

use crate::error::call::CallError;
use crate::error::transport::TransportError;
use crate::registry::Operation;

use common::ErrorLocation;

use std::future::Future;
use std::panic::Location;
use std::sync::Arc;

use serde_json::Value;

pub trait Invoke: Send + Sync {
    /// Invoke the operation registered under `name` with a JSON input.
    fn invoke(
        &self,
        name: &str,
        input: Value,
    ) -> impl Future<Output = Result<Value, CallError>> + Send;

    /// Typed call of operation `O`.
    ///
    /// Encoding the request or decoding the response is part of crossing the
    /// boundary, so either failure is a [`TransportError::Serialization`].
    fn call<O: Operation>(
        &self,
        request: O::Request,
    ) -> impl Future<Output = Result<O::Response, CallError>> + Send {
        async move {
            let input = serde_json::to_value(&request).map_err(|e| {
                TransportError::Serialization {
                    message: format!("{}: failed to encode request: {e}", O::NAME),
                    location: ErrorLocation::from(Location::caller()),
                }
            })?;

            let output = self.invoke(O::NAME, input).await?;

            let response = serde_json::from_value(output).map_err(|e| {
                TransportError::Serialization {
                    message: format!("{}: failed to decode response: {e}", O::NAME),
                    location: ErrorLocation::from(Location::caller()),
                }
            })?;

            Ok(response)
        }
    }
}

impl<T: Invoke> Invoke for Arc<T> {
    fn invoke(
        &self,
        name: &str,
        input: Value,
    ) -> impl Future<Output = Result<Value, CallError>> + Send {
        T::invoke(self, name, input)
    }
}
