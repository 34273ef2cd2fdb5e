use crate::fixtures::{DEFAULT_GROUP, StudioFixtures, studio_engine};
use crate::scenarios::{EMPTY, NETWORK_ERROR, NOT_FOUND, SERVER_ERROR};

use bridge_core::Invoke;
use bridge_core::error::OperationError;
use bridge_core::registry::OperationRegistry;
use bridge_core::registry::operations::{
    DeleteApiV1BetaGroupsByName, GetApiV1BetaGroups, GetApiV1BetaVersion, GetApiV1BetaWorkloads,
    GetApiV1BetaWorkloadsByName, GetApiV1BetaWorkloadsByNameStatus, GetHealth, PostApiV1BetaGroups,
    PostApiV1BetaWorkloads, PostApiV1BetaWorkloadsByNameRestart, PostApiV1BetaWorkloadsByNameStop,
};

use common::HttpStatusCode;
use models::{
    ByNameRequest, CreateGroupBody, CreateGroupRequest, CreateWorkloadBody, CreateWorkloadRequest,
    EmptyRequest, ListWorkloadsRequest, NamePath, WorkloadListQuery, WorkloadStatus,
};
use serde_json::json;

fn by_name(name: &str) -> ByNameRequest {
    ByNameRequest::with_path(NamePath::new(name))
}

fn list_in(group: Option<&str>) -> ListWorkloadsRequest {
    ListWorkloadsRequest {
        query: WorkloadListQuery {
            all: None,
            group: group.map(str::to_string),
        },
        ..Default::default()
    }
}

#[test]
fn given_seeded_fixtures_when_inspected_then_groups_and_workloads_present() {
    let fixtures = StudioFixtures::seeded();

    let groups: Vec<&str> = fixtures.groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(groups, vec!["default", "research", "archive"]);
    assert_eq!(fixtures.workloads.len(), 6);

    let osv = fixtures.workload("osv").expect("osv is seeded");
    assert_eq!(osv.port, 41317);
    assert_eq!(osv.url, "http://127.0.0.1:41317/sse#osv");
    assert_eq!(osv.status, WorkloadStatus::Running);
}

/// **VALUE**: The studio engine mocks every operation in the builtin registry.
///
/// **BUG THIS CATCHES**: Would catch a new operation added to `operations.toml`
/// without a studio mock, which would make UI tests for it fail as Unresolved.
#[test]
fn given_studio_engine_when_listing_unmocked_then_none() {
    let engine = studio_engine().expect("studio engine builds");

    assert!(engine.unmocked().is_empty());
    assert_eq!(
        engine.registry().len(),
        OperationRegistry::builtin().len()
    );
}

#[tokio::test]
async fn given_default_query_when_listing_workloads_then_default_group_only() {
    let engine = studio_engine().expect("studio engine builds");

    let list = engine
        .call::<GetApiV1BetaWorkloads>(list_in(None))
        .await
        .expect("list succeeds");

    assert!(!list.workloads.is_empty());
    assert!(list.workloads.iter().all(|w| w.group == DEFAULT_GROUP));
}

#[tokio::test]
async fn given_group_query_when_listing_workloads_then_filtered_to_group() {
    let engine = studio_engine().expect("studio engine builds");

    let list = engine
        .call::<GetApiV1BetaWorkloads>(list_in(Some("research")))
        .await
        .expect("list succeeds");

    let names: Vec<&str> = list.workloads.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, vec!["github", "fetch"]);
}

#[tokio::test]
async fn given_all_flag_when_listing_workloads_then_every_group() {
    let engine = studio_engine().expect("studio engine builds");

    let list = engine
        .invoke("getApiV1BetaWorkloads", json!({ "query": { "all": true } }))
        .await
        .expect("list succeeds");

    assert_eq!(list["workloads"].as_array().map(Vec::len), Some(6));
}

/// **VALUE**: Creating a group through the mock makes it visible to the next list call.
///
/// **WHY THIS MATTERS**: This is the "create group, then the sidebar shows it"
/// flow. If the mock answered from a static list the UI test could never see its
/// own write.
///
/// **BUG THIS CATCHES**: Would catch the create handler returning a group without
/// storing it.
#[tokio::test]
async fn given_create_group_when_listing_groups_then_new_group_listed() {
    // GIVEN
    let engine = studio_engine().expect("studio engine builds");

    // WHEN
    engine
        .call::<PostApiV1BetaGroups>(CreateGroupRequest::with_body(CreateGroupBody {
            name: "staging".to_string(),
        }))
        .await
        .expect("create succeeds");

    // THEN
    let list = engine
        .call::<GetApiV1BetaGroups>(EmptyRequest::default())
        .await
        .expect("list succeeds");
    assert!(list.groups.iter().any(|g| g.name == "staging"));
}

#[tokio::test]
async fn given_existing_group_when_creating_again_then_conflict() {
    let engine = studio_engine().expect("studio engine builds");

    let error = engine
        .call::<PostApiV1BetaGroups>(CreateGroupRequest::with_body(CreateGroupBody {
            name: "research".to_string(),
        }))
        .await
        .expect_err("duplicate group");

    assert_eq!(
        error.as_operation().and_then(OperationError::status_code),
        Some(HttpStatusCode::CONFLICT)
    );
}

#[tokio::test]
async fn given_deleted_group_when_listing_workloads_then_members_moved_to_default() {
    let engine = studio_engine().expect("studio engine builds");

    engine
        .call::<DeleteApiV1BetaGroupsByName>(by_name("research"))
        .await
        .expect("delete succeeds");

    engine.inspect_state(|fixtures| {
        assert!(fixtures.group("research").is_none());
        assert_eq!(
            fixtures.workload("github").map(|w| w.group.as_str()),
            Some(DEFAULT_GROUP)
        );
    });
}

#[tokio::test]
async fn given_new_workload_when_created_then_listed_and_running() {
    let engine = studio_engine().expect("studio engine builds");

    let created = engine
        .call::<PostApiV1BetaWorkloads>(CreateWorkloadRequest::with_body(CreateWorkloadBody {
            name: "time".to_string(),
            image: "mcp/time:latest".to_string(),
            target_port: None,
            group: None,
        }))
        .await
        .expect("create succeeds");

    assert_eq!(created.name, "time");
    let workload = engine
        .call::<GetApiV1BetaWorkloadsByName>(by_name("time"))
        .await
        .expect("get succeeds");
    assert_eq!(workload.status, WorkloadStatus::Running);
    assert_eq!(workload.port, created.port);
    assert_eq!(workload.group, DEFAULT_GROUP);
}

fn create_workload(name: &str, target_port: Option<u16>) -> CreateWorkloadRequest {
    CreateWorkloadRequest::with_body(CreateWorkloadBody {
        name: name.to_string(),
        image: "mcp/time:latest".to_string(),
        target_port,
        group: None,
    })
}

/// **VALUE**: A workload cannot claim a port another workload already holds.
///
/// **BUG THIS CATCHES**: Would catch the mock handing out duplicate ports, either
/// from an explicit `target_port` or from allocation at the top of the port range,
/// which makes two workloads share one URL.
#[tokio::test]
async fn given_taken_or_exhausted_port_when_creating_workload_then_conflict() {
    // GIVEN: osv holds 41317, and a workload sits on the last port
    let engine = studio_engine().expect("studio engine builds");
    engine
        .call::<PostApiV1BetaWorkloads>(create_workload("last", Some(u16::MAX)))
        .await
        .expect("last port is free");

    // WHEN
    let taken = engine
        .call::<PostApiV1BetaWorkloads>(create_workload("copy", Some(41317)))
        .await
        .expect_err("port already used by osv");
    let exhausted = engine
        .call::<PostApiV1BetaWorkloads>(create_workload("overflow", None))
        .await
        .expect_err("no port after the last one");

    // THEN
    assert_eq!(
        taken.as_operation(),
        Some(&OperationError::status(
            HttpStatusCode::CONFLICT,
            "Port 41317 is already in use"
        ))
    );
    assert_eq!(
        exhausted.as_operation(),
        Some(&OperationError::status(
            HttpStatusCode::CONFLICT,
            "No free port available"
        ))
    );
    engine.inspect_state(|fixtures| {
        assert!(fixtures.workload("copy").is_none());
        assert!(fixtures.workload("overflow").is_none());
    });
}

#[tokio::test]
async fn given_allocated_ports_when_creating_without_target_then_next_port_after_highest() {
    let engine = studio_engine().expect("studio engine builds");

    let first = engine
        .call::<PostApiV1BetaWorkloads>(create_workload("time", None))
        .await
        .expect("create succeeds");
    let second = engine
        .call::<PostApiV1BetaWorkloads>(create_workload("everything", None))
        .await
        .expect("create succeeds");

    assert_eq!(first.port, 58767);
    assert_eq!(second.port, 58768);
    assert_eq!(
        engine.inspect_state(|fixtures| fixtures.workload("time").map(|w| w.url.clone())),
        Some("http://127.0.0.1:58767/sse#time".to_string())
    );
}

#[tokio::test]
async fn given_blank_image_when_creating_workload_then_bad_request() {
    let engine = studio_engine().expect("studio engine builds");

    let error = engine
        .call::<PostApiV1BetaWorkloads>(CreateWorkloadRequest::with_body(CreateWorkloadBody {
            name: "time".to_string(),
            image: " ".to_string(),
            target_port: None,
            group: None,
        }))
        .await
        .expect_err("image is required");

    assert_eq!(
        error.as_operation(),
        Some(&OperationError::status(
            HttpStatusCode::BAD_REQUEST,
            "Package cannot be empty"
        ))
    );
}

/// **VALUE**: Stopping then restarting a workload is reflected by its status endpoint.
#[tokio::test]
async fn given_running_workload_when_stopped_then_restarted_then_status_follows() {
    // GIVEN
    let engine = studio_engine().expect("studio engine builds");

    // WHEN
    engine
        .call::<PostApiV1BetaWorkloadsByNameStop>(by_name("osv"))
        .await
        .expect("stop succeeds");
    let stopped = engine
        .call::<GetApiV1BetaWorkloadsByNameStatus>(by_name("osv"))
        .await
        .expect("status succeeds");
    engine
        .call::<PostApiV1BetaWorkloadsByNameRestart>(by_name("osv"))
        .await
        .expect("restart succeeds");
    let restarted = engine
        .call::<GetApiV1BetaWorkloadsByNameStatus>(by_name("osv"))
        .await
        .expect("status succeeds");

    // THEN
    assert_eq!(stopped.status, WorkloadStatus::Stopped);
    assert_eq!(restarted.status, WorkloadStatus::Running);
}

#[tokio::test]
async fn given_unknown_workload_when_fetched_then_not_found() {
    let engine = studio_engine().expect("studio engine builds");

    let error = engine
        .call::<GetApiV1BetaWorkloadsByName>(by_name("ghost"))
        .await
        .expect_err("no such workload");

    assert_eq!(error.as_operation(), Some(&OperationError::not_found()));
}

/// **VALUE**: The `not-found` restart scenario answers exactly like the real API.
///
/// **WHY THIS MATTERS**: The UI shows "Server not found" by reading the status and
/// error body. The mocked failure has to have the same serialized shape the proxy
/// would deliver, or the error toast test asserts on a shape production never sends.
///
/// **BUG THIS CATCHES**: Would catch the scenario producing a transport failure or a
/// different status/body than `{ kind: "status", status: 404, error: "Server not found" }`.
#[tokio::test]
async fn given_not_found_scenario_when_restarting_then_exact_404_shape() {
    // GIVEN
    let engine = studio_engine().expect("studio engine builds");
    engine
        .activate_scenario::<PostApiV1BetaWorkloadsByNameRestart>(NOT_FOUND)
        .expect("scenario exists");

    // WHEN
    let error = engine
        .call::<PostApiV1BetaWorkloadsByNameRestart>(by_name("osv"))
        .await
        .expect_err("scenario fails");

    // THEN
    let operation = error.as_operation().expect("an operation error");
    assert_eq!(
        serde_json::to_value(operation).expect("serializes"),
        json!({ "kind": "status", "status": 404, "error": "Server not found" })
    );
}

#[tokio::test]
async fn given_empty_scenario_when_listing_workloads_then_no_items() {
    let engine = studio_engine().expect("studio engine builds");
    engine
        .activate_scenario::<GetApiV1BetaWorkloads>(EMPTY)
        .expect("scenario exists");

    let list = engine
        .call::<GetApiV1BetaWorkloads>(list_in(None))
        .await
        .expect("list succeeds");

    assert!(list.workloads.is_empty());
}

#[tokio::test]
async fn given_server_error_everywhere_when_reading_version_then_status_500() {
    let engine = studio_engine().expect("studio engine builds");

    let affected = engine.activate_everywhere(SERVER_ERROR);
    let error = engine
        .call::<GetApiV1BetaVersion>(EmptyRequest::default())
        .await
        .expect_err("scenario fails");

    assert_eq!(
        affected,
        vec![
            "getApiV1BetaGroups",
            "getApiV1BetaSecretsDefaultKeys",
            "getApiV1BetaVersion"
        ]
    );
    assert_eq!(
        error.as_operation().and_then(OperationError::status_code),
        Some(HttpStatusCode::INTERNAL_SERVER_ERROR)
    );
}

#[tokio::test]
async fn given_network_error_scenario_when_checking_health_then_network_failure() {
    let engine = studio_engine().expect("studio engine builds");
    engine
        .activate_scenario::<GetHealth>(NETWORK_ERROR)
        .expect("scenario exists");

    let error = engine
        .call::<GetHealth>(EmptyRequest::default())
        .await
        .expect_err("scenario fails");

    assert!(matches!(
        error.as_operation(),
        Some(OperationError::Network { .. })
    ));
}

#[tokio::test]
async fn given_mutated_state_when_reset_then_seeded_fixtures_restored() {
    let engine = studio_engine().expect("studio engine builds");
    engine
        .call::<PostApiV1BetaWorkloadsByNameStop>(by_name("vscode-server"))
        .await
        .expect("stop succeeds");

    engine.reset();

    let restored = engine.inspect_state(|fixtures| fixtures.clone());
    assert_eq!(restored, StudioFixtures::seeded());
}
