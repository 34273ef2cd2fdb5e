//! The mock engine served through a real dispatch bridge.
//!
//! Code that talks to a [`BridgeProxy`](bridge_core::BridgeProxy) is mocked by
//! putting the engine behind the server instead of in place of the proxy. Call
//! failures keep their kind across the wire: a mocked domain failure arrives
//! as the same [`OperationError`](bridge_core::error::OperationError), an
//! operation without a mock entry is rejected as
//! [`RejectCode::Unresolved`](bridge_core::transport::RejectCode::Unresolved),
//! and a simulated transport failure as `Undeliverable`.

use crate::engine::MockEngine;

use bridge_core::dispatch::DispatchBridge;
use bridge_core::error::BridgeError;

use std::sync::Arc;

/// A dispatch bridge that answers every registry operation from `engine`.
///
/// # Errors
///
/// Never fails for an engine built over the same registry; the bridge is still
/// validated like any other.
#[track_caller]
pub fn mock_bridge<S: Send + 'static>(
    engine: Arc<MockEngine<S>>,
) -> Result<DispatchBridge, BridgeError> {
    DispatchBridge::builder(engine.registry().clone())
        .delegate(engine)
        .build()
}
