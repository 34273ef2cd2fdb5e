//! Mock entries: one default behavior plus named scenarios per operation.

use bridge_core::error::{CallError, OperationError, TransportError};
use bridge_core::registry::Operation;

use common::ErrorLocation;

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::panic::Location;
use std::sync::Arc;

use serde_json::Value;

/// Untyped handler stored by the engine; decodes the request and encodes the response.
pub(crate) type ErasedHandler<S> =
    Arc<dyn Fn(Value, &mut S) -> Result<Value, CallError> + Send + Sync>;

/// Registered mock behavior for operation `O` over fixture state `S`.
///
/// The default is either a static fixture or a handler; scenarios are
/// alternative handlers selected by id. A handler sees the decoded request
/// and the engine's mutable fixture state, and may return a simulated failure
/// (see [`simulate`](crate::simulate)).
pub struct MockEntry<O: Operation, S> {
    default: ErasedHandler<S>,
    scenarios: BTreeMap<String, ErasedHandler<S>>,
    _operation: PhantomData<fn() -> O>,
}

impl<O: Operation, S: 'static> MockEntry<O, S> {
    /// Always answer with `response`.
    pub fn fixture(response: O::Response) -> Self
    where
        O::Response: Clone + Sync,
    {
        Self::handler(move |_request: &O::Request, _state: &mut S| Ok(response.clone()))
    }

    pub fn handler<F>(handler: F) -> Self
    where
        F: Fn(&O::Request, &mut S) -> Result<O::Response, CallError> + Send + Sync + 'static,
    {
        Self {
            default: erase::<O, S, F>(handler),
            scenarios: BTreeMap::new(),
            _operation: PhantomData,
        }
    }

    /// Add scenario `id`. Re-using an id replaces the earlier handler.
    pub fn scenario<F>(mut self, id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&O::Request, &mut S) -> Result<O::Response, CallError> + Send + Sync + 'static,
    {
        self.scenarios.insert(id.into(), erase::<O, S, F>(handler));
        self
    }

    /// Scenario `id` answers with `response`.
    pub fn scenario_fixture(self, id: impl Into<String>, response: O::Response) -> Self
    where
        O::Response: Clone + Sync,
    {
        self.scenario(id, move |_request: &O::Request, _state: &mut S| {
            Ok(response.clone())
        })
    }

    /// Scenario `id` fails with whatever `failure` produces.
    pub fn scenario_failure<F>(self, id: impl Into<String>, failure: F) -> Self
    where
        F: Fn() -> CallError + Send + Sync + 'static,
    {
        self.scenario(id, move |_request: &O::Request, _state: &mut S| {
            Err(failure())
        })
    }

    pub fn scenario_ids(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    pub(crate) fn into_erased(self) -> ErasedEntry<S> {
        ErasedEntry {
            default: self.default,
            scenarios: self.scenarios,
        }
    }
}

pub(crate) struct ErasedEntry<S> {
    pub(crate) default: ErasedHandler<S>,
    pub(crate) scenarios: BTreeMap<String, ErasedHandler<S>>,
}

impl<S> ErasedEntry<S> {
    pub(crate) fn scenario_ids(&self) -> Vec<String> {
        self.scenarios.keys().cloned().collect()
    }
}

pub(crate) fn erase<O, S, F>(handler: F) -> ErasedHandler<S>
where
    O: Operation,
    S: 'static,
    F: Fn(&O::Request, &mut S) -> Result<O::Response, CallError> + Send + Sync + 'static,
{
    Arc::new(move |input: Value, state: &mut S| -> Result<Value, CallError> {
        let request: O::Request =
            serde_json::from_value(input).map_err(|e| OperationError::Validation {
                message: format!("{}: {e}", O::NAME),
            })?;

        let response = handler(&request, state)?;

        serde_json::to_value(response).map_err(|e| {
            CallError::Transport(TransportError::Serialization {
                message: format!("{}: failed to encode mocked response: {e}", O::NAME),
                location: ErrorLocation::from(Location::caller()),
            })
        })
    })
}
