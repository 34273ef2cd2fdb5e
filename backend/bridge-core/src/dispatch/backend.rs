use crate::error::operation::OperationError;
use crate::registry::OperationDescriptor;

use std::future::Future;

use serde_json::Value;

/// Real handler for every operation in the registry.
///
/// A backend receives the descriptor of the operation being dispatched and
/// its JSON input (`{ path, query, body }`), so one implementation covers the
/// whole registry without per-operation code.
pub trait Backend: Send + Sync + 'static {
    fn execute(
        &self,
        descriptor: &OperationDescriptor,
        input: Value,
    ) -> impl Future<Output = Result<Value, OperationError>> + Send;
}
