use crate::context::MockContext;
use crate::engine::MockEngine;
use crate::entry::MockEntry;
use crate::error::MockError;
use crate::simulate;

use bridge_core::Invoke;
use bridge_core::registry::operations::{GetApiV1BetaGroups, GetApiV1BetaVersion, GetHealth};
use bridge_core::registry::{OperationRegistry, OperationSpec};

use models::{EmptyRequest, Group, GroupList, Version};
use serde_json::{Value, json};

fn registry() -> OperationRegistry {
    OperationRegistry::generate(&[
        OperationSpec::new("get", "/health"),
        OperationSpec::new("get", "/api/v1beta/groups"),
        OperationSpec::new("get", "/api/v1beta/version"),
    ])
    .expect("valid registry")
}

fn engine() -> MockEngine<u32> {
    MockEngine::builder(registry(), || 0)
        .register(
            MockEntry::<GetApiV1BetaGroups, u32>::fixture(GroupList {
                groups: vec![Group::new("default")],
            })
            .scenario_fixture("empty", GroupList::default())
            .scenario_failure("server-error", simulate::server_error),
        )
        .register(
            MockEntry::<GetApiV1BetaVersion, u32>::handler(|_request, calls| {
                *calls += 1;
                Ok(Version {
                    version: format!("v{calls}"),
                })
            })
            .scenario_failure("server-error", simulate::server_error),
        )
        .register(MockEntry::<GetHealth, u32>::fixture(()))
        .build()
        .expect("every entry is in the registry")
}

async fn group_count(engine: &MockEngine<u32>) -> Option<usize> {
    engine
        .call::<GetApiV1BetaGroups>(EmptyRequest::default())
        .await
        .ok()
        .map(|list| list.groups.len())
}

#[test]
fn given_fresh_context_when_querying_selection_then_every_operation_on_default() {
    let context: MockContext<()> = MockContext::new(());

    assert_eq!(context.active_scenario("getApiV1BetaGroups"), None);
    assert_eq!(context.active_scenarios().count(), 0);
    assert!(context.recorded_calls().is_empty());
}

/// **VALUE**: Activating the already-active scenario changes nothing.
///
/// **BUG THIS CATCHES**: Would catch activation that toggles, or that stacks a
/// second copy of the scenario.
#[tokio::test]
async fn given_active_scenario_when_activated_again_then_still_active_and_unchanged() {
    // GIVEN
    let engine = engine();
    engine
        .activate_scenario::<GetApiV1BetaGroups>("empty")
        .expect("scenario exists");

    // WHEN
    engine
        .activate_scenario::<GetApiV1BetaGroups>("empty")
        .expect("scenario exists");

    // THEN
    assert_eq!(
        engine.active_scenario("getApiV1BetaGroups").as_deref(),
        Some("empty")
    );
    assert_eq!(group_count(&engine).await, Some(0));
}

/// **VALUE**: Scenarios are mutually exclusive; the latest activation replaces the earlier one.
///
/// **BUG THIS CATCHES**: Would catch scenarios being merged, where "empty" followed
/// by "server-error" could still answer with an empty list.
#[tokio::test]
async fn given_two_scenarios_when_second_activated_then_only_second_applies() {
    let engine = engine();

    engine
        .activate_scenario::<GetApiV1BetaGroups>("empty")
        .expect("scenario exists");
    engine
        .activate_scenario::<GetApiV1BetaGroups>("server-error")
        .expect("scenario exists");

    assert_eq!(
        engine.active_scenario("getApiV1BetaGroups").as_deref(),
        Some("server-error")
    );
    assert_eq!(group_count(&engine).await, None);
}

/// **VALUE**: Activation for one operation leaves every other operation alone.
///
/// **WHY THIS MATTERS**: Tests often fail exactly one call to drive an error path.
/// If selection leaked across operations, the page around that call would break
/// too and the test would assert on the wrong failure.
///
/// **BUG THIS CATCHES**: Would catch a single global "current scenario" shared by
/// every operation.
#[tokio::test]
async fn given_scenario_on_one_operation_when_other_invoked_then_other_uses_default() {
    // GIVEN
    let engine = engine();
    engine
        .activate_scenario::<GetApiV1BetaGroups>("server-error")
        .expect("scenario exists");

    // WHEN
    let version = engine
        .call::<GetApiV1BetaVersion>(EmptyRequest::default())
        .await;

    // THEN
    assert!(version.is_ok());
    assert_eq!(engine.active_scenario("getApiV1BetaVersion"), None);
}

#[tokio::test]
async fn given_active_scenario_when_deactivated_then_default_answers() {
    let engine = engine();
    engine
        .activate_scenario::<GetApiV1BetaGroups>("empty")
        .expect("scenario exists");

    let previous = engine.deactivate("getApiV1BetaGroups");

    assert_eq!(previous.as_deref(), Some("empty"));
    assert_eq!(group_count(&engine).await, Some(1));
}

#[test]
fn given_undefined_scenario_when_activating_then_error_lists_available() {
    let engine = engine();

    let error = engine
        .activate_scenario::<GetApiV1BetaGroups>("timeout")
        .expect_err("timeout is not defined");

    match error {
        MockError::UnknownScenario {
            operation,
            scenario,
            available,
            ..
        } => {
            assert_eq!(operation, "getApiV1BetaGroups");
            assert_eq!(scenario, "timeout");
            assert_eq!(available, vec!["empty", "server-error"]);
        }
        other => panic!("Expected UnknownScenario, got {other}"),
    }
}

#[test]
fn given_unregistered_operation_when_activating_then_unregistered_error() {
    let engine = engine();

    let result = engine.activate_scenario_by_name("getNothing", "empty");

    assert!(matches!(result, Err(MockError::UnregisteredOperation { .. })));
}

#[tokio::test]
async fn given_undefined_scenario_when_activating_or_default_then_default_answers() {
    let engine = engine();

    let activated = engine.activate_scenario_or_default("getApiV1BetaGroups", "timeout");

    assert!(!activated);
    assert_eq!(engine.active_scenario("getApiV1BetaGroups"), None);
    assert_eq!(group_count(&engine).await, Some(1));
}

/// **VALUE**: Falling back on an undefined scenario leaves the current selection alone.
///
/// **BUG THIS CATCHES**: Would catch the fallback silently deactivating a scenario
/// selected earlier, unlike `activate_everywhere`, which skips non-defining entries.
#[tokio::test]
async fn given_active_scenario_when_activating_undefined_or_default_then_selection_kept() {
    // GIVEN
    let engine = engine();
    engine
        .activate_scenario::<GetApiV1BetaGroups>("empty")
        .expect("scenario exists");

    // WHEN
    let activated = engine.activate_scenario_or_default("getApiV1BetaGroups", "timeout");

    // THEN
    assert!(!activated);
    assert_eq!(
        engine.active_scenario("getApiV1BetaGroups").as_deref(),
        Some("empty")
    );
    assert_eq!(group_count(&engine).await, Some(0));
}

#[test]
fn given_shared_scenario_id_when_activating_everywhere_then_every_definer_switched() {
    let engine = engine();

    let affected = engine.activate_everywhere("server-error");

    assert_eq!(affected, vec!["getApiV1BetaGroups", "getApiV1BetaVersion"]);
    assert_eq!(engine.active_scenario("getHealth"), None);
}

/// **VALUE**: Reset returns selection, overrides, recorder and state to baseline.
///
/// **WHY THIS MATTERS**: Test cases share an engine in some suites. Anything that
/// survives a reset makes the next test's outcome depend on execution order.
///
/// **BUG THIS CATCHES**: Would catch a reset that clears scenarios but keeps the
/// fixture state, or keeps per-test overrides alive.
#[tokio::test]
async fn given_dirty_context_when_reset_then_everything_back_to_baseline() {
    // GIVEN: a scenario, an override, recorded calls and mutated state
    let engine = engine();
    engine
        .activate_scenario::<GetApiV1BetaGroups>("empty")
        .expect("scenario exists");
    engine
        .override_fixture::<GetHealth>(())
        .expect("health is mocked");
    engine
        .call::<GetApiV1BetaVersion>(EmptyRequest::default())
        .await
        .expect("version succeeds");
    assert_eq!(engine.inspect_state(|calls| *calls), 1);

    // WHEN
    engine.reset();

    // THEN
    assert_eq!(engine.active_scenario("getApiV1BetaGroups"), None);
    assert!(engine.recorded_calls().is_empty());
    assert_eq!(engine.inspect_state(|calls| *calls), 0);
    assert!(!engine.clear_override("getHealth"));
    assert_eq!(group_count(&engine).await, Some(1));
}

/// **VALUE**: A one-shot scenario answers a single call without changing the selection.
#[test]
fn given_one_shot_scenario_when_invoking_then_selection_untouched() {
    let engine = engine();

    let result = engine.invoke_in_scenario("getApiV1BetaGroups", "empty", json!({}));

    assert_eq!(
        result.expect("scenario answers")["groups"],
        Value::Array(Vec::new())
    );
    assert_eq!(engine.active_scenario("getApiV1BetaGroups"), None);
    assert_eq!(
        engine.recorded_calls()[0].scenario.as_deref(),
        Some("empty")
    );
}

#[test]
fn given_undefined_one_shot_scenario_when_invoking_then_unresolved() {
    let engine = engine();

    let error = engine
        .call_in_scenario::<GetApiV1BetaGroups>("timeout", EmptyRequest::default())
        .expect_err("timeout is not defined");

    assert!(error.is_unresolved());
}

#[test]
fn given_entry_when_listing_scenarios_then_sorted_ids() {
    let engine = engine();

    assert_eq!(
        engine.scenarios_for("getApiV1BetaGroups"),
        vec!["empty", "server-error"]
    );
    assert!(engine.scenarios_for("getHealth").is_empty());
}
