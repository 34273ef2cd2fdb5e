//! Request envelopes.
//!
//! Every operation input has the same outer shape, `{ path, query, body }`,
//! mirroring how the HTTP backend maps an input onto a request: `path`
//! fills `{param}` segments, `query` becomes the query string and `body`
//! is sent as JSON.

use serde::{Deserialize, Serialize};

/// Placeholder for an absent path, query or body section. Serializes as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoParams {}

/// Input envelope shared by all operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiRequest<P = NoParams, Q = NoParams, B = NoParams> {
    #[serde(default)]
    pub path: P,
    #[serde(default)]
    pub query: Q,
    #[serde(default)]
    pub body: B,
}

impl<P: Default, Q: Default> ApiRequest<P, Q, NoParams> {
    pub fn with_path(path: P) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }
}

impl<P: Default, Q: Default, B> ApiRequest<P, Q, B> {
    pub fn with_body(body: B) -> Self {
        Self {
            path: P::default(),
            query: Q::default(),
            body,
        }
    }
}

/// `{name}` path parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamePath {
    pub name: String,
}

impl NamePath {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGroupBody {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWorkloadBody {
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

pub type EmptyRequest = ApiRequest;
pub type ByNameRequest = ApiRequest<NamePath>;
pub type ListWorkloadsRequest = ApiRequest<NoParams, WorkloadListQuery>;
pub type CreateGroupRequest = ApiRequest<NoParams, NoParams, CreateGroupBody>;
pub type CreateWorkloadRequest = ApiRequest<NoParams, NoParams, CreateWorkloadBody>;
