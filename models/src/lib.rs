//! Payload models for the workload API.
//!
//! Pure data: these are the request and response shapes named by the
//! operation registry (`bridge-core/operations.toml`). They carry no
//! behavior beyond validation in [`WorkloadBuilder`].

pub mod client;
pub mod error;
pub mod group;
pub mod request;
pub mod secret;
pub mod system;
pub mod workload;

pub use client::{ClientStatus, ClientStatusList};
pub use common::ErrorLocation;
pub use error::model_error::ModelError;
pub use group::{Group, GroupList};
pub use request::{
    ApiRequest, ByNameRequest, CreateGroupBody, CreateGroupRequest, CreateWorkloadBody,
    CreateWorkloadRequest, EmptyRequest, ListWorkloadsRequest, NamePath, NoParams,
    WorkloadListQuery,
};
pub use secret::{SecretKey, SecretKeyList};
pub use system::Version;
pub use workload::builder::WorkloadBuilder;
pub use workload::{
    CreateWorkloadResponse, DEFAULT_GROUP, Workload, WorkloadList, WorkloadStatus,
    WorkloadStatusResponse,
};

#[cfg(test)]
mod tests;
