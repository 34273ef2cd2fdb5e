//! The same caller code run against the studio mock and against a real
//! proxy → server → dispatch bridge path must observe the same results.

use bridge_core::config::{ProxyConfig, ServerConfig};
use bridge_core::error::{CallError, OperationError, TransportError};
use bridge_core::registry::OperationRegistry;
use bridge_core::registry::operations::{
    GetApiV1BetaVersion, GetApiV1BetaWorkloads, GetHealth, PostApiV1BetaWorkloadsByNameRestart,
    PostApiV1BetaWorkloadsByNameStop,
};
use bridge_core::transport::RejectCode;
use bridge_core::{BridgeProxy, BridgeServerHandle, Invoke, start_bridge_server};

use bridge_mock::fixtures::studio_engine;
use bridge_mock::scenarios::NOT_FOUND;
use bridge_mock::{MockEngine, MockEntry, mock_bridge, simulate};

use models::{ByNameRequest, EmptyRequest, ListWorkloadsRequest, NamePath, WorkloadStatus};

use std::sync::Arc;

async fn start_proxied<S: Send + 'static>(
    engine: Arc<MockEngine<S>>,
) -> (BridgeServerHandle, BridgeProxy) {
    let bridge = mock_bridge(engine).expect("engine covers its own registry");

    let server_config = ServerConfig {
        port: 0,
        ..ServerConfig::default()
    };
    let handle = start_bridge_server(&server_config, None, Arc::new(bridge))
        .await
        .expect("Failed to start bridge server");

    let proxy = BridgeProxy::new(
        OperationRegistry::builtin().clone(),
        ProxyConfig {
            connect_max_elapsed_ms: 3_000,
            call_timeout_ms: 2_000,
        },
    );
    proxy
        .connect(&handle.url(), handle.auth_token())
        .await
        .expect("Proxy should connect");

    (handle, proxy)
}

fn by_name(name: &str) -> ByNameRequest {
    ByNameRequest::with_path(NamePath::new(name))
}

/// Stop a workload, then report what the default group listing says about it.
async fn stop_and_observe<I: Invoke>(client: &I, name: &str) -> Option<WorkloadStatus> {
    client
        .call::<PostApiV1BetaWorkloadsByNameStop>(by_name(name))
        .await
        .expect("stop succeeds");

    client
        .call::<GetApiV1BetaWorkloads>(ListWorkloadsRequest::default())
        .await
        .expect("list succeeds")
        .workloads
        .into_iter()
        .find(|w| w.name == name)
        .map(|w| w.status)
}

/// **VALUE**: Caller code cannot tell the mock from the real boundary.
///
/// **WHY THIS MATTERS**: UI tests run against the mock and production runs across
/// the proxy. If the two disagreed on a stateful sequence, passing tests would
/// say nothing about the shipped behavior.
///
/// **BUG THIS CATCHES**: Would catch the proxy or the dispatch bridge reshaping
/// payloads, or the mock answering from state the real path never sees.
#[tokio::test]
async fn given_same_caller_when_run_over_mock_and_proxy_then_same_observation() {
    // GIVEN
    let direct = studio_engine().expect("studio engine builds");
    let behind_proxy = Arc::new(studio_engine().expect("studio engine builds"));
    let (handle, proxy) = start_proxied(Arc::clone(&behind_proxy)).await;

    // WHEN
    let from_mock = stop_and_observe(&direct, "osv").await;
    let from_proxy = stop_and_observe(&proxy, "osv").await;

    // THEN
    assert_eq!(from_mock, Some(WorkloadStatus::Stopped));
    assert_eq!(from_mock, from_proxy);

    proxy.disconnect().await;
    handle.shutdown().await;
}

/// **VALUE**: A scenario failure crosses the boundary with its exact shape.
///
/// **BUG THIS CATCHES**: Would catch the proxy turning a mocked 404 into a
/// transport failure or rewriting its body.
#[tokio::test]
async fn given_not_found_scenario_when_restarting_over_proxy_then_same_error_as_mock() {
    // GIVEN
    let direct = studio_engine().expect("studio engine builds");
    let behind_proxy = Arc::new(studio_engine().expect("studio engine builds"));
    direct
        .activate_scenario::<PostApiV1BetaWorkloadsByNameRestart>(NOT_FOUND)
        .expect("scenario exists");
    behind_proxy
        .activate_scenario::<PostApiV1BetaWorkloadsByNameRestart>(NOT_FOUND)
        .expect("scenario exists");
    let (handle, proxy) = start_proxied(Arc::clone(&behind_proxy)).await;

    // WHEN
    let from_mock = direct
        .call::<PostApiV1BetaWorkloadsByNameRestart>(by_name("osv"))
        .await
        .expect_err("scenario fails");
    let from_proxy = proxy
        .call::<PostApiV1BetaWorkloadsByNameRestart>(by_name("osv"))
        .await
        .expect_err("scenario fails");

    // THEN
    assert_eq!(from_mock.as_operation(), Some(&OperationError::not_found()));
    assert_eq!(from_mock.as_operation(), from_proxy.as_operation());
    assert_eq!(behind_proxy.recorded_calls().len(), 1);

    proxy.disconnect().await;
    handle.shutdown().await;
}

/// **VALUE**: A missing mock behind the bridge is rejected, not reported as a domain error.
///
/// **WHY THIS MATTERS**: UI code branches on operation errors. If an unmocked call
/// arrived as an operation failure, a test could pass while exercising an error
/// path the real backend never produced.
///
/// **BUG THIS CATCHES**: Would catch the bridge coercing `Unresolved` or a simulated
/// transport failure into `OperationError::Internal`.
#[tokio::test]
async fn given_partial_engine_behind_proxy_when_calling_then_failure_kinds_preserved() {
    // GIVEN: only health is mocked, and it drops the call
    let engine = MockEngine::builder(OperationRegistry::builtin().clone(), || ())
        .register(MockEntry::<GetHealth, ()>::handler(|_request, _state| {
            Err(simulate::transport_failure("connection reset"))
        }))
        .build()
        .expect("health is in the registry");
    let (handle, proxy) = start_proxied(Arc::new(engine)).await;

    // WHEN
    let unmocked = proxy
        .call::<GetApiV1BetaVersion>(EmptyRequest::default())
        .await
        .expect_err("version has no mock");
    let dropped = proxy
        .call::<GetHealth>(EmptyRequest::default())
        .await
        .expect_err("health drops the call");

    // THEN
    match unmocked {
        CallError::Transport(TransportError::Rejected { code, message, .. }) => {
            assert_eq!(code, RejectCode::Unresolved);
            assert!(message.contains("getApiV1BetaVersion"), "{message}");
        }
        other => panic!("Expected an Unresolved rejection, got {other}"),
    }
    assert!(matches!(
        dropped,
        CallError::Transport(TransportError::Rejected {
            code: RejectCode::Undeliverable,
            ..
        })
    ));

    proxy.disconnect().await;
    handle.shutdown().await;
}
