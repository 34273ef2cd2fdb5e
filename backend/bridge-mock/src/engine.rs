//! Mock Engine.
//!
//! Stands in for the bridge proxy. Resolution order for a call to `name`:
//!
//! 1. a per-call scenario passed to [`MockEngine::invoke_in_scenario`]
//! 2. the scenario selected with [`MockEngine::activate_scenario`]
//! 3. a per-test override from [`MockEngine::override_default`], or a
//!    layered one from [`MockEngine::override_when`] or
//!    [`MockEngine::override_response`]
//! 4. the registered default
//!
//! Every resolved call is recorded. A call with no entry is never forwarded
//! anywhere; it fails with [`CallError::Unresolved`] and is logged loudly.

use crate::context::{MockContext, RecordedCall};
use crate::entry::{ErasedEntry, ErasedHandler, MockEntry, erase};
use crate::error::MockError;

use bridge_core::Invoke;
use bridge_core::error::{CallError, TransportError};
use bridge_core::registry::{Operation, OperationRegistry};

use common::ErrorLocation;

use std::collections::HashMap;
use std::future::Future;
use std::panic::Location;
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, error, info, warn};
use serde_json::Value;

type Baseline<S> = Arc<dyn Fn() -> S + Send + Sync>;

pub struct MockEngine<S> {
    registry: Arc<OperationRegistry>,
    entries: HashMap<String, ErasedEntry<S>>,
    baseline: Baseline<S>,
    context: Mutex<MockContext<S>>,
}

pub struct MockEngineBuilder<S> {
    registry: Arc<OperationRegistry>,
    entries: HashMap<String, ErasedEntry<S>>,
    baseline: Baseline<S>,
    unknown: Vec<String>,
}

impl<S: Send + 'static> MockEngineBuilder<S> {
    /// Register the mock for `O`. A later registration for the same
    /// operation replaces the earlier one.
    pub fn register<O: Operation>(mut self, entry: MockEntry<O, S>) -> Self {
        if !self.registry.contains(O::NAME) {
            self.unknown.push(O::NAME.to_string());
        }
        self.entries.insert(O::NAME.to_string(), entry.into_erased());
        self
    }

    /// # Errors
    ///
    /// Returns [`MockError::UnknownOperation`] if an entry was registered for
    /// an operation the registry does not contain.
    #[track_caller]
    pub fn build(self) -> Result<MockEngine<S>, MockError> {
        if let Some(operation) = self.unknown.into_iter().next() {
            return Err(MockError::UnknownOperation {
                operation,
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let unmocked = self
            .registry
            .names()
            .filter(|name| !self.entries.contains_key(*name))
            .count();
        if unmocked > 0 {
            warn!("Mock engine built with {unmocked} operation(s) left unmocked");
        }

        Ok(MockEngine {
            registry: self.registry,
            entries: self.entries,
            context: Mutex::new(MockContext::new((self.baseline)())),
            baseline: self.baseline,
        })
    }
}

impl<S: Send + 'static> MockEngine<S> {
    /// `baseline` produces the fixture state at build time and on every [`reset`](Self::reset).
    pub fn builder(
        registry: impl Into<Arc<OperationRegistry>>,
        baseline: impl Fn() -> S + Send + Sync + 'static,
    ) -> MockEngineBuilder<S> {
        MockEngineBuilder {
            registry: registry.into(),
            entries: HashMap::new(),
            baseline: Arc::new(baseline),
            unknown: Vec::new(),
        }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    /// Registered operations without a mock entry, sorted.
    pub fn unmocked(&self) -> Vec<&str> {
        self.registry
            .names()
            .filter(|name| !self.entries.contains_key(*name))
            .collect()
    }

    /// Scenario ids registered for `operation`, sorted. Empty when unregistered.
    pub fn scenarios_for(&self, operation: &str) -> Vec<String> {
        self.entries
            .get(operation)
            .map(ErasedEntry::scenario_ids)
            .unwrap_or_default()
    }

    #[track_caller]
    pub fn activate_scenario<O: Operation>(&self, scenario: &str) -> Result<(), MockError> {
        self.activate_scenario_by_name(O::NAME, scenario)
    }

    /// Select `scenario` for `operation` until it is deactivated or the engine is reset.
    ///
    /// Activating the scenario that is already active changes nothing.
    ///
    /// # Errors
    ///
    /// - [`MockError::UnregisteredOperation`] if `operation` has no entry
    /// - [`MockError::UnknownScenario`] if the entry defines no such scenario;
    ///   the error lists the scenarios it does define
    #[track_caller]
    pub fn activate_scenario_by_name(
        &self,
        operation: &str,
        scenario: &str,
    ) -> Result<(), MockError> {
        let entry = self.entry(operation)?;

        if !entry.scenarios.contains_key(scenario) {
            return Err(MockError::UnknownScenario {
                operation: operation.to_string(),
                scenario: scenario.to_string(),
                available: entry.scenario_ids(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.lock_context().activate(operation, scenario) {
            info!("Mock scenario '{scenario}' activated for {operation}");
        }
        Ok(())
    }

    /// Like [`activate_scenario_by_name`](Self::activate_scenario_by_name),
    /// but an undefined scenario is skipped instead of failing. The operation
    /// keeps whatever it was answering with, as in
    /// [`activate_everywhere`](Self::activate_everywhere).
    ///
    /// Returns whether the scenario was activated.
    pub fn activate_scenario_or_default(&self, operation: &str, scenario: &str) -> bool {
        match self.activate_scenario_by_name(operation, scenario) {
            Ok(()) => true,
            Err(e) => {
                warn!("{e}; {operation} keeps its current behavior");
                false
            }
        }
    }

    /// Activate `scenario` on every operation that defines it.
    ///
    /// Returns the affected operations, sorted.
    pub fn activate_everywhere(&self, scenario: &str) -> Vec<String> {
        let mut affected: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.scenarios.contains_key(scenario))
            .map(|(name, _)| name.clone())
            .collect();
        affected.sort();

        let mut context = self.lock_context();
        for operation in &affected {
            context.activate(operation, scenario);
        }

        info!(
            "Mock scenario '{scenario}' activated for {} operation(s)",
            affected.len()
        );
        affected
    }

    /// Return `operation` to its default. Returns the scenario that was active.
    pub fn deactivate(&self, operation: &str) -> Option<String> {
        let previous = self.lock_context().deactivate(operation);
        if let Some(scenario) = &previous {
            debug!("Mock scenario '{scenario}' deactivated for {operation}");
        }
        previous
    }

    pub fn active_scenario(&self, operation: &str) -> Option<String> {
        self.lock_context()
            .active_scenario(operation)
            .map(str::to_string)
    }

    /// Replace the default behavior of `O` until [`clear_override`](Self::clear_override)
    /// or [`reset`](Self::reset). An active scenario still takes precedence.
    ///
    /// Drops any override layered earlier for `O`.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::UnregisteredOperation`] if `O` has no entry; the
    /// override would never be consulted.
    #[track_caller]
    pub fn override_default<O, F>(&self, handler: F) -> Result<(), MockError>
    where
        O: Operation,
        F: Fn(&O::Request, &mut S) -> Result<O::Response, CallError> + Send + Sync + 'static,
    {
        self.entry(O::NAME)?;
        let handler: ErasedHandler<S> = erase::<O, S, F>(handler);
        self.lock_context()
            .overrides
            .insert(O::NAME.to_string(), handler);
        Ok(())
    }

    #[track_caller]
    pub fn override_fixture<O: Operation>(&self, response: O::Response) -> Result<(), MockError>
    where
        O::Response: Clone + Sync,
    {
        self.override_default::<O, _>(move |_request: &O::Request, _state: &mut S| {
            Ok(response.clone())
        })
    }

    /// Answer with `handler` only for requests matching `predicate`. Every
    /// other request falls through to the current override, or to the default.
    ///
    /// Layers stack: the most recent matching layer answers.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::UnregisteredOperation`] if `O` has no entry.
    #[track_caller]
    pub fn override_when<O, P, F>(&self, predicate: P, handler: F) -> Result<(), MockError>
    where
        O: Operation,
        P: Fn(&O::Request) -> bool + Send + Sync + 'static,
        F: Fn(&O::Request, &mut S) -> Result<O::Response, CallError> + Send + Sync + 'static,
    {
        let matched = erase::<O, S, F>(handler);
        self.layer_override(O::NAME, move |previous| -> ErasedHandler<S> {
            Arc::new(move |input: Value, state: &mut S| -> Result<Value, CallError> {
                // Undecodable input goes to `previous`, which reports the validation error.
                let applies = serde_json::from_value::<O::Request>(input.clone())
                    .is_ok_and(|request| predicate(&request));
                if applies {
                    matched(input, state)
                } else {
                    previous(input, state)
                }
            })
        })
    }

    /// Pass every successful response of the current behavior through `transform`.
    ///
    /// Failures of the underlying behavior are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`MockError::UnregisteredOperation`] if `O` has no entry.
    #[track_caller]
    pub fn override_response<O, F>(&self, transform: F) -> Result<(), MockError>
    where
        O: Operation,
        F: Fn(O::Response) -> O::Response + Send + Sync + 'static,
    {
        self.layer_override(O::NAME, move |previous| -> ErasedHandler<S> {
            Arc::new(move |input: Value, state: &mut S| -> Result<Value, CallError> {
                let output = previous(input, state)?;
                let response: O::Response = serde_json::from_value(output).map_err(|e| {
                    TransportError::Serialization {
                        message: format!("{}: failed to decode mocked response: {e}", O::NAME),
                        location: ErrorLocation::from(Location::caller()),
                    }
                })?;
                let output = serde_json::to_value(transform(response)).map_err(|e| {
                    TransportError::Serialization {
                        message: format!("{}: failed to encode mocked response: {e}", O::NAME),
                        location: ErrorLocation::from(Location::caller()),
                    }
                })?;
                Ok(output)
            })
        })
    }

    pub fn clear_override(&self, operation: &str) -> bool {
        self.lock_context().overrides.remove(operation).is_some()
    }

    /// Back to a fresh context: every operation on `default`, no overrides,
    /// an empty recorder and baseline fixture state.
    pub fn reset(&self) {
        let fresh = MockContext::new((self.baseline)());
        *self.lock_context() = fresh;
        debug!("Mock context reset");
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.lock_context().recorded_calls().to_vec()
    }

    pub fn recorded_calls_for(&self, operation: &str) -> Vec<RecordedCall> {
        self.lock_context()
            .recorded_calls()
            .iter()
            .filter(|call| call.operation == operation)
            .cloned()
            .collect()
    }

    /// Read the fixture state, e.g. to assert on what a handler mutated.
    pub fn inspect_state<R>(&self, inspect: impl FnOnce(&S) -> R) -> R {
        inspect(self.lock_context().state())
    }

    /// Resolve one call against `scenario` without touching the active selection.
    #[track_caller]
    pub fn invoke_in_scenario(
        &self,
        operation: &str,
        scenario: &str,
        input: Value,
    ) -> Result<Value, CallError> {
        self.resolve(operation, input, Some(scenario))
    }

    /// Typed form of [`invoke_in_scenario`](Self::invoke_in_scenario).
    #[track_caller]
    pub fn call_in_scenario<O: Operation>(
        &self,
        scenario: &str,
        request: O::Request,
    ) -> Result<O::Response, CallError> {
        let input = serde_json::to_value(&request).map_err(|e| TransportError::Serialization {
            message: format!("{}: failed to encode request: {e}", O::NAME),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let output = self.resolve(O::NAME, input, Some(scenario))?;

        let response =
            serde_json::from_value(output).map_err(|e| TransportError::Serialization {
                message: format!("{}: failed to decode response: {e}", O::NAME),
                location: ErrorLocation::from(Location::caller()),
            })?;
        Ok(response)
    }

    #[track_caller]
    fn resolve(
        &self,
        operation: &str,
        input: Value,
        one_shot: Option<&str>,
    ) -> Result<Value, CallError> {
        let Some(entry) = self.entries.get(operation) else {
            error!("No mock registered for {operation}; the call was not forwarded anywhere");
            return Err(CallError::Unresolved {
                operation: operation.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let mut context = self.lock_context();

        let scenario = match one_shot {
            Some(id) => Some(id.to_string()),
            None => context.active_scenario(operation).map(str::to_string),
        };

        let handler = match &scenario {
            Some(id) => match entry.scenarios.get(id) {
                Some(handler) => Arc::clone(handler),
                None => {
                    error!("No mock scenario '{id}' registered for {operation}");
                    return Err(CallError::Unresolved {
                        operation: format!("{operation}#{id}"),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            },
            None => context
                .overrides
                .get(operation)
                .cloned()
                .unwrap_or_else(|| Arc::clone(&entry.default)),
        };

        context.recorded.push(RecordedCall {
            operation: operation.to_string(),
            input: input.clone(),
            scenario: scenario.clone(),
        });

        debug!(
            "Mock {operation} answered by {}",
            scenario.as_deref().unwrap_or("default")
        );

        handler(input, &mut context.state)
    }

    #[track_caller]
    fn entry(&self, operation: &str) -> Result<&ErasedEntry<S>, MockError> {
        self.entries
            .get(operation)
            .ok_or_else(|| MockError::UnregisteredOperation {
                operation: operation.to_string(),
                location: ErrorLocation::from(Location::caller()),
            })
    }

    /// Install `layer(previous)` as the override of `operation`, where
    /// `previous` is the current override or the registered default.
    #[track_caller]
    fn layer_override(
        &self,
        operation: &str,
        layer: impl FnOnce(ErasedHandler<S>) -> ErasedHandler<S>,
    ) -> Result<(), MockError> {
        let entry = self.entry(operation)?;
        let mut context = self.lock_context();
        let previous = context
            .overrides
            .get(operation)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&entry.default));
        context
            .overrides
            .insert(operation.to_string(), layer(previous));
        debug!("Mock override layered for {operation}");
        Ok(())
    }

    fn lock_context(&self) -> MutexGuard<'_, MockContext<S>> {
        // A handler that panicked mid-call leaves the context usable.
        self.context
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S: Send + 'static> Invoke for MockEngine<S> {
    #[track_caller]
    fn invoke(
        &self,
        name: &str,
        input: Value,
    ) -> impl Future<Output = Result<Value, CallError>> + Send {
        std::future::ready(self.resolve(name, input, None))
    }
}
