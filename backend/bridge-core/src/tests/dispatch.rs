use crate::dispatch::{Backend, DispatchBridge};
use crate::error::bridge::BridgeError;
use crate::error::call::CallError;
use crate::error::operation::OperationError;
use crate::error::transport::TransportError;
use crate::invoke::Invoke;
use crate::registry::operations::{GetApiV1BetaVersion, PostApiV1BetaGroups};
use crate::registry::{OperationDescriptor, OperationRegistry, OperationSpec};
use crate::transport::wire::{BridgeCall, RejectCode, ReplyOutcome};

use common::{ErrorLocation, HttpStatusCode};
use models::{CreateGroupBody, CreateGroupRequest, EmptyRequest, Group, Version};

use std::panic::Location;
use std::sync::Arc;

use serde_json::{Value, json};

/// Answers every operation with its own name and input.
struct EchoBackend;

impl Backend for EchoBackend {
    async fn execute(
        &self,
        descriptor: &OperationDescriptor,
        input: Value,
    ) -> Result<Value, OperationError> {
        Ok(json!({ "operation": descriptor.name, "input": input }))
    }
}

/// Fails each call with the kind its operation selects.
struct KindedFailures;

impl Invoke for KindedFailures {
    async fn invoke(&self, name: &str, _input: Value) -> Result<Value, CallError> {
        match name {
            "getHealth" => Err(CallError::Unresolved {
                operation: name.to_string(),
                location: ErrorLocation::from(Location::caller()),
            }),
            "getApiV1BetaGroups" => Err(CallError::Transport(TransportError::Delivery {
                message: "connection reset".to_string(),
                location: ErrorLocation::from(Location::caller()),
            })),
            _ => Err(CallError::Operation(OperationError::not_found())),
        }
    }
}

fn small_registry() -> OperationRegistry {
    OperationRegistry::generate(&[
        OperationSpec::new("get", "/health"),
        OperationSpec::new("get", "/api/v1beta/groups"),
        OperationSpec::new("post", "/api/v1beta/groups"),
    ])
    .expect("valid registry")
}

/// **VALUE**: Startup fails when any registry name has no handler, naming every one.
///
/// **WHY THIS MATTERS**: Partial coverage means some operations work through the
/// proxy and others fail at call time. Reporting all gaps at once keeps a new
/// operation from being discovered one crash at a time.
///
/// **BUG THIS CATCHES**: Would catch a builder that stops at the first missing
/// handler, or one that builds successfully with gaps.
#[test]
fn given_partial_handlers_when_building_then_every_missing_name_reported() {
    // GIVEN: Only the health handler is installed
    let builder = DispatchBridge::builder(small_registry())
        .handle_raw("getHealth", |_input| async { Ok(Value::Null) });

    // WHEN
    let result = builder.build();

    // THEN
    match result {
        Err(BridgeError::MissingHandlers { names, .. }) => {
            assert_eq!(names, vec!["getApiV1BetaGroups", "postApiV1BetaGroups"]);
        }
        Err(other) => panic!("Expected MissingHandlers, got {other}"),
        Ok(_) => panic!("Expected MissingHandlers, got a bridge"),
    }
}

#[test]
fn given_handler_for_unknown_name_when_building_then_unknown_operation() {
    let result = DispatchBridge::builder(small_registry())
        .backend(EchoBackend)
        .handle_raw("getNothing", |_input| async { Ok(Value::Null) })
        .build();

    assert!(matches!(
        result,
        Err(BridgeError::UnknownOperation { ref name, .. }) if name == "getNothing"
    ));
}

/// **VALUE**: A generic backend covers the whole registry without per-operation code.
///
/// **BUG THIS CATCHES**: Would catch the fallback skipping registry entries, which
/// breaks the "adding an operation needs no bridge change" property.
#[test]
fn given_backend_when_building_then_exposed_equals_registry() {
    // GIVEN
    let registry = OperationRegistry::builtin().clone();

    // WHEN
    let bridge = DispatchBridge::builder(registry.clone())
        .backend(EchoBackend)
        .build()
        .expect("backend covers every operation");

    // THEN
    let registry_names: Vec<&str> = registry.names().collect();
    assert_eq!(bridge.exposed(), registry_names);
}

#[tokio::test]
async fn given_unknown_name_when_dispatching_then_rejected() {
    let bridge = DispatchBridge::builder(small_registry())
        .backend(EchoBackend)
        .build()
        .expect("bridge");

    let reply = bridge
        .dispatch(BridgeCall {
            request_id: 9,
            name: "getNothing".to_string(),
            input: Value::Null,
        })
        .await;

    assert_eq!(reply.request_id, 9);
    assert!(matches!(
        reply.outcome,
        ReplyOutcome::Rejected {
            code: RejectCode::UnknownOperation,
            ..
        }
    ));
}

/// **VALUE**: Typed handlers override the backend for their operation only.
#[tokio::test]
async fn given_typed_handler_and_backend_when_invoked_then_handler_wins() {
    // GIVEN: A typed handler for version, backend for the rest
    let bridge = DispatchBridge::builder(OperationRegistry::builtin().clone())
        .backend(EchoBackend)
        .handle::<GetApiV1BetaVersion, _, _>(|_request: EmptyRequest| async {
            Ok(Version {
                version: "v0.9.1".to_string(),
            })
        })
        .build()
        .expect("bridge");

    // WHEN
    let version = bridge
        .call::<GetApiV1BetaVersion>(EmptyRequest::default())
        .await
        .expect("version");
    let echoed = bridge
        .invoke("getHealth", json!({}))
        .await
        .expect("health");

    // THEN
    assert_eq!(version.version, "v0.9.1");
    assert_eq!(echoed["operation"], "getHealth");
}

#[tokio::test]
async fn given_typed_handler_when_input_does_not_decode_then_validation_error() {
    // GIVEN: A create-group handler that must never be reached
    let bridge = DispatchBridge::builder(OperationRegistry::builtin().clone())
        .backend(EchoBackend)
        .handle::<PostApiV1BetaGroups, _, _>(|request: CreateGroupRequest| async move {
            Ok(Group::new(request.body.name))
        })
        .build()
        .expect("bridge");

    // WHEN: The body's name is a number
    let result = bridge
        .invoke("postApiV1BetaGroups", json!({ "body": { "name": 5 } }))
        .await;

    // THEN
    match result {
        Err(CallError::Operation(OperationError::Validation { message })) => {
            assert!(message.starts_with("postApiV1BetaGroups"), "{message}");
        }
        other => panic!("Expected validation error, got {other:?}"),
    }

    // AND: A valid body reaches the handler
    let group = bridge
        .call::<PostApiV1BetaGroups>(CreateGroupRequest::with_body(CreateGroupBody {
            name: "research".to_string(),
        }))
        .await
        .expect("group");
    assert_eq!(group.name, "research");
}

/// **VALUE**: A handler's domain failure reaches the caller unchanged.
///
/// **BUG THIS CATCHES**: Would catch the bridge converting handler failures into a
/// generic bridge error, hiding the status the UI branches on.
#[tokio::test]
async fn given_failing_handler_when_invoked_then_operation_error_unchanged() {
    let bridge = DispatchBridge::builder(small_registry())
        .backend(EchoBackend)
        .handle_raw("getApiV1BetaGroups", |_input| async {
            Err(OperationError::status(
                HttpStatusCode::SERVICE_UNAVAILABLE,
                json!({ "message": "unavailable" }),
            ))
        })
        .build()
        .expect("bridge");

    let error = bridge
        .invoke("getApiV1BetaGroups", Value::Null)
        .await
        .unwrap_err();

    assert_eq!(
        error.as_operation(),
        Some(&OperationError::status(
            HttpStatusCode::SERVICE_UNAVAILABLE,
            json!({ "message": "unavailable" })
        ))
    );
}

async fn dispatch_outcome(bridge: &DispatchBridge, name: &str) -> ReplyOutcome {
    bridge
        .dispatch(BridgeCall {
            request_id: 1,
            name: name.to_string(),
            input: json!({}),
        })
        .await
        .outcome
}

/// **VALUE**: A delegated target's failures keep their kind in the reply.
///
/// **WHY THIS MATTERS**: Only domain failures may reach the caller as operation
/// errors. An unresolved call or a dropped call is a setup or boundary problem
/// and must stay distinguishable on the other side of the wire.
///
/// **BUG THIS CATCHES**: Would catch `Unresolved` or a transport failure being
/// folded into a failed reply with an `Internal` operation error.
#[tokio::test]
async fn given_delegate_when_target_fails_then_each_kind_replied_distinctly() {
    // GIVEN
    let bridge = DispatchBridge::builder(small_registry())
        .delegate(Arc::new(KindedFailures))
        .build()
        .expect("delegate covers the registry");

    // WHEN
    let unresolved = dispatch_outcome(&bridge, "getHealth").await;
    let undeliverable = dispatch_outcome(&bridge, "getApiV1BetaGroups").await;
    let failed = dispatch_outcome(&bridge, "postApiV1BetaGroups").await;

    // THEN
    assert!(matches!(
        unresolved,
        ReplyOutcome::Rejected { code: RejectCode::Unresolved, ref message } if message.contains("getHealth")
    ));
    assert!(matches!(
        undeliverable,
        ReplyOutcome::Rejected {
            code: RejectCode::Undeliverable,
            ..
        }
    ));
    assert_eq!(
        failed,
        ReplyOutcome::Failed {
            error: OperationError::not_found()
        }
    );
}

#[tokio::test]
async fn given_delegate_when_invoked_in_process_then_unresolved_passes_through() {
    let bridge = DispatchBridge::builder(small_registry())
        .delegate(Arc::new(KindedFailures))
        .build()
        .expect("delegate covers the registry");

    let error = bridge
        .invoke("getHealth", json!({}))
        .await
        .expect_err("target cannot resolve health");

    assert!(error.is_unresolved());
}
