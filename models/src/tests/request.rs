use crate::{ByNameRequest, CreateGroupRequest, EmptyRequest, NamePath, WorkloadStatus};

use serde_json::json;

/// **VALUE**: The envelope shape is what the HTTP backend and the mocks both read.
///
/// **BUG THIS CATCHES**: Would catch if a serde attribute renames `path`/`query`/`body`,
/// which would silently drop path parameters on the real backend.
#[test]
fn given_by_name_request_when_serialized_then_uses_path_query_body_envelope() {
    let request = ByNameRequest::with_path(NamePath::new("postgres-db"));

    let json = serde_json::to_value(&request).unwrap();

    assert_eq!(
        json,
        json!({ "path": { "name": "postgres-db" }, "query": {}, "body": {} })
    );
}

#[test]
fn given_partial_envelope_when_deserialized_then_missing_sections_default() {
    let request: CreateGroupRequest =
        serde_json::from_value(json!({ "body": { "name": "research" } })).unwrap();

    assert_eq!(request.body.name, "research");
}

#[test]
fn given_empty_object_when_deserialized_as_empty_request_then_succeeds() {
    let result: Result<EmptyRequest, _> = serde_json::from_value(json!({}));
    assert!(result.is_ok());
}

#[test]
fn given_workload_status_when_serialized_then_is_snake_case() {
    assert_eq!(
        serde_json::to_value(WorkloadStatus::Running).unwrap(),
        json!("running")
    );
}
