//! Bridge server protocol, driven by a raw WebSocket client.

use crate::helpers::{
    TEST_AUTH_TOKEN, authenticate, connect_raw, echo_bridge_builder, is_connection_closed,
    receive_frame, send_frame, send_text, start_test_server,
};

use bridge_core::transport::{BridgeCall, ClientFrame, RejectCode, ReplyOutcome, ServerFrame};

use futures_util::SinkExt;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

/// **VALUE**: A client presenting the right token is acknowledged.
#[tokio::test]
async fn given_valid_token_when_handshaking_then_ack_success() {
    // GIVEN
    let handle = start_test_server(echo_bridge_builder().build().expect("bridge")).await;
    let mut ws = connect_raw(&handle).await;

    // WHEN
    let ack = authenticate(&mut ws, TEST_AUTH_TOKEN).await;

    // THEN
    assert_eq!(
        ack,
        ServerFrame::HandshakeAck {
            success: true,
            error: None
        }
    );
}

/// **VALUE**: A wrong token is refused and the connection closed.
///
/// **WHY THIS MATTERS**: The token is the only thing that keeps another local
/// process from driving workloads through the bridge.
///
/// **BUG THIS CATCHES**: Would catch a server that acknowledges failure but keeps
/// the connection open, still accepting calls.
#[tokio::test]
async fn given_wrong_token_when_handshaking_then_refused_and_closed() {
    // GIVEN
    let handle = start_test_server(echo_bridge_builder().build().expect("bridge")).await;
    let mut ws = connect_raw(&handle).await;

    // WHEN
    let ack = authenticate(&mut ws, "wrong-token").await;

    // THEN
    match ack {
        ServerFrame::HandshakeAck { success, error } => {
            assert!(!success);
            assert!(error.is_some());
        }
        other => panic!("Expected handshake_ack, got {other:?}"),
    }
    assert!(is_connection_closed(&mut ws).await, "Connection should close");
}

#[tokio::test]
async fn given_call_before_handshake_when_sent_then_auth_required_and_closed() {
    let handle = start_test_server(echo_bridge_builder().build().expect("bridge")).await;
    let mut ws = connect_raw(&handle).await;

    send_frame(
        &mut ws,
        &ClientFrame::Call(BridgeCall {
            request_id: 5,
            name: "getHealth".to_string(),
            input: json!({}),
        }),
    )
    .await;

    match receive_frame(&mut ws).await {
        ServerFrame::Reply(reply) => {
            assert_eq!(reply.request_id, 5);
            assert!(matches!(
                reply.outcome,
                ReplyOutcome::Rejected {
                    code: RejectCode::AuthRequired,
                    ..
                }
            ));
        }
        other => panic!("Expected reply, got {other:?}"),
    }
    assert!(is_connection_closed(&mut ws).await);
}

/// **VALUE**: A malformed frame is answered with a rejection, not dropped.
///
/// **BUG THIS CATCHES**: Would catch the server silently ignoring undecodable
/// frames, which leaves the caller waiting until its timeout.
#[tokio::test]
async fn given_malformed_frame_when_sent_then_rejected_with_salvaged_request_id() {
    // GIVEN: An authenticated client
    let handle = start_test_server(echo_bridge_builder().build().expect("bridge")).await;
    let mut ws = connect_raw(&handle).await;
    authenticate(&mut ws, TEST_AUTH_TOKEN).await;

    // WHEN: A frame with a known request_id but no name
    send_text(&mut ws, r#"{"type":"call","request_id":11}"#).await;

    // THEN
    match receive_frame(&mut ws).await {
        ServerFrame::Reply(reply) => {
            assert_eq!(reply.request_id, 11);
            assert!(matches!(
                reply.outcome,
                ReplyOutcome::Rejected {
                    code: RejectCode::InvalidMessage,
                    ..
                }
            ));
        }
        other => panic!("Expected reply, got {other:?}"),
    }
}

#[tokio::test]
async fn given_unknown_operation_when_called_then_rejected_unknown_operation() {
    let handle = start_test_server(echo_bridge_builder().build().expect("bridge")).await;
    let mut ws = connect_raw(&handle).await;
    authenticate(&mut ws, TEST_AUTH_TOKEN).await;

    send_frame(
        &mut ws,
        &ClientFrame::Call(BridgeCall {
            request_id: 2,
            name: "getApiV1BetaNothing".to_string(),
            input: json!({}),
        }),
    )
    .await;

    match receive_frame(&mut ws).await {
        ServerFrame::Reply(reply) => {
            assert_eq!(reply.request_id, 2);
            assert!(matches!(
                reply.outcome,
                ReplyOutcome::Rejected {
                    code: RejectCode::UnknownOperation,
                    ..
                }
            ));
        }
        other => panic!("Expected reply, got {other:?}"),
    }
}

/// **VALUE**: Binary frames are ignored and the connection stays usable.
#[tokio::test]
async fn given_binary_frame_when_sent_then_ignored_and_next_call_answered() {
    // GIVEN
    let handle = start_test_server(echo_bridge_builder().build().expect("bridge")).await;
    let mut ws = connect_raw(&handle).await;
    authenticate(&mut ws, TEST_AUTH_TOKEN).await;

    // WHEN: A binary frame, then a valid call
    ws.send(Message::binary(vec![0u8, 1, 2]))
        .await
        .expect("send binary");
    send_frame(
        &mut ws,
        &ClientFrame::Call(BridgeCall {
            request_id: 3,
            name: "getHealth".to_string(),
            input: json!({ "ping": true }),
        }),
    )
    .await;

    // THEN: Only the call is answered
    match receive_frame(&mut ws).await {
        ServerFrame::Reply(reply) => {
            assert_eq!(reply.request_id, 3);
            assert_eq!(
                reply.outcome,
                ReplyOutcome::Ok {
                    output: json!({ "ping": true })
                }
            );
        }
        other => panic!("Expected reply, got {other:?}"),
    }
}

#[tokio::test]
async fn given_generated_token_when_server_started_without_one_then_handle_reports_it() {
    let handle = bridge_core::start_bridge_server(
        &crate::helpers::test_server_config(),
        None,
        std::sync::Arc::new(echo_bridge_builder().build().expect("bridge")),
    )
    .await
    .expect("server");

    assert!(!handle.auth_token().is_empty());
    assert_ne!(handle.port(), 0);

    let mut ws = connect_raw(&handle).await;
    let token = handle.auth_token().to_string();
    let ack = authenticate(&mut ws, &token).await;
    assert!(matches!(ack, ServerFrame::HandshakeAck { success: true, .. }));
}
