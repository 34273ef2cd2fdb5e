//! Scenario Store.
//!
//! Per-engine mutable state: which scenario is active for each operation,
//! per-test default overrides, the request recorder and the fixture state.
//! Every operation starts in `default`; only explicit activation moves it.

use crate::entry::ErasedHandler;

use std::collections::HashMap;

use serde_json::Value;

/// One intercepted call, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub operation: String,
    pub input: Value,
    /// Scenario that answered the call, `None` for the default.
    pub scenario: Option<String>,
}

pub struct MockContext<S> {
    selection: HashMap<String, String>,
    pub(crate) overrides: HashMap<String, ErasedHandler<S>>,
    pub(crate) recorded: Vec<RecordedCall>,
    pub(crate) state: S,
}

impl<S> MockContext<S> {
    pub fn new(state: S) -> Self {
        Self {
            selection: HashMap::new(),
            overrides: HashMap::new(),
            recorded: Vec::new(),
            state,
        }
    }

    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn active_scenario(&self, operation: &str) -> Option<&str> {
        self.selection.get(operation).map(String::as_str)
    }

    /// Operations currently away from `default`, with their scenario.
    pub fn active_scenarios(&self) -> impl Iterator<Item = (&str, &str)> {
        self.selection
            .iter()
            .map(|(operation, scenario)| (operation.as_str(), scenario.as_str()))
    }

    pub fn recorded_calls(&self) -> &[RecordedCall] {
        &self.recorded
    }

    pub fn has_override(&self, operation: &str) -> bool {
        self.overrides.contains_key(operation)
    }

    /// Select `scenario` for `operation`, replacing any earlier selection.
    ///
    /// Returns `false` when it was already active.
    pub(crate) fn activate(&mut self, operation: &str, scenario: &str) -> bool {
        match self.selection.get(operation) {
            Some(active) if active == scenario => false,
            _ => {
                self.selection
                    .insert(operation.to_string(), scenario.to_string());
                true
            }
        }
    }

    /// Back to `default`. Returns the scenario that was active.
    pub(crate) fn deactivate(&mut self, operation: &str) -> Option<String> {
        self.selection.remove(operation)
    }
}
