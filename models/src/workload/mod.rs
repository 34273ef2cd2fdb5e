pub mod builder;

use serde::{Deserialize, Serialize};

/// Group a workload joins when none is given.
pub const DEFAULT_GROUP: &str = "default";

const LOCALHOST_URL_PREFIX: &str = "http://127.0.0.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadStatus {
    Running,
    Stopped,
    Starting,
    Stopping,
    Error,
}

/// An MCP server workload managed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    pub name: String,
    pub package: String,
    pub url: String,
    pub port: u16,
    pub status: WorkloadStatus,
    #[serde(default)]
    pub status_context: String,
    pub created_at: String,
    pub group: String,
}

impl Workload {
    /// The backend's proxy URL for a local workload: `http://127.0.0.1:<port>/sse#<name>`.
    pub fn local_url(port: u16, name: &str) -> String {
        format!("{LOCALHOST_URL_PREFIX}:{port}/sse#{name}")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadList {
    #[serde(default)]
    pub workloads: Vec<Workload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadStatusResponse {
    pub status: WorkloadStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateWorkloadResponse {
    pub name: String,
    pub port: u16,
}
